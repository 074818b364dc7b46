//! Stages agronómicos del pipeline: ocho expertos encadenados, del suelo al
//! reporte ejecutivo, más el armado del pipeline estándar.

pub mod pipeline;
pub mod stages;

pub use pipeline::standard_pipeline;
pub use stages::{ClimateStage, CropBiologyStage, FertilizerStage, MarketCostStage,
                 PestDiseaseStage, ReportStage, SoilChemistryStage, SoilSeriesStage};
