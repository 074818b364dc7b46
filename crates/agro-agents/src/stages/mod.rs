//! Los ocho stages expertos del pipeline, en su orden de ejecución.

pub mod soil_series;
pub mod soil_chemistry;
pub mod crop_biology;
pub mod pest_disease;
pub mod climate;
pub mod fertilizer;
pub mod market_cost;
pub mod report;

pub use climate::ClimateStage;
pub use crop_biology::CropBiologyStage;
pub use fertilizer::FertilizerStage;
pub use market_cost::MarketCostStage;
pub use pest_disease::PestDiseaseStage;
pub use report::ReportStage;
pub use soil_chemistry::SoilChemistryStage;
pub use soil_series::SoilSeriesStage;
