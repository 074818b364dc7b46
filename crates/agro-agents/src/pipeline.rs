//! Pipeline estándar de ocho stages con su tabla de wiring.
//!
//! El wiring es la única fuente de verdad sobre qué ve cada stage: campos de
//! la petición más proyecciones de salidas anteriores. El stage de reporte
//! recibe los siete análisis completos y el transcript.

use agro_core::{build_pipeline_definition, PipelineDefinition, PipelineError, Stage,
                StageWiring, WHOLE_PAYLOAD};

use crate::stages::{ClimateStage, CropBiologyStage, FertilizerStage, MarketCostStage,
                    PestDiseaseStage, ReportStage, SoilChemistryStage, SoilSeriesStage};

pub fn standard_pipeline() -> Result<PipelineDefinition, PipelineError> {
    let stages: Vec<Box<dyn Stage>> = vec![Box::new(SoilSeriesStage),
                                           Box::new(SoilChemistryStage),
                                           Box::new(CropBiologyStage),
                                           Box::new(PestDiseaseStage),
                                           Box::new(ClimateStage),
                                           Box::new(FertilizerStage),
                                           Box::new(MarketCostStage),
                                           Box::new(ReportStage)];

    let wiring = vec![
        StageWiring::new("soil_series")
            .request_fields(&["location", "lat", "lon", "texture", "target_crop"]),
        StageWiring::new("soil_chemistry")
            .request_fields(&["ph", "nitrogen", "phosphorus", "potassium", "target_crop"])
            .project("soil_series", "observation", "previous_observation"),
        StageWiring::new("crop_biology")
            .request_fields(&["target_crop", "field_size_rai", "planting_date",
                              "irrigation_available"])
            .project("soil_chemistry", "health_score", "soil_health_score")
            .project("soil_chemistry", "observation", "previous_observation"),
        StageWiring::new("pest_disease")
            .request_fields(&["target_crop", "season", "humidity", "irrigation_available"])
            .project("crop_biology", "observation", "previous_observation"),
        StageWiring::new("climate")
            .request_fields(&["location", "lat", "lon", "target_crop", "planting_date"])
            .project("crop_biology", "growth_cycle_days", "growth_cycle_days")
            .project("pest_disease", "observation", "previous_observation"),
        StageWiring::new("fertilizer")
            .request_fields(&["target_crop", "field_size_rai", "nitrogen", "phosphorus",
                              "potassium", "budget_thb", "prefer_organic"])
            .project("climate", "observation", "previous_observation"),
        StageWiring::new("market_cost")
            .request_fields(&["target_crop", "field_size_rai", "prefer_organic"])
            .project("crop_biology", "yield_targets.target_kg_per_rai", "yield_kg_per_rai")
            .project("fertilizer", "cost_analysis.total_cost", "fertilizer_cost_thb")
            .project("fertilizer", "observation", "previous_observation"),
        StageWiring::new("report")
            .request_fields(&["location", "target_crop", "field_size_rai"])
            .project("soil_series", WHOLE_PAYLOAD, "soil_series_analysis")
            .project("soil_chemistry", WHOLE_PAYLOAD, "soil_chemistry_analysis")
            .project("crop_biology", WHOLE_PAYLOAD, "crop_biology_analysis")
            .project("pest_disease", WHOLE_PAYLOAD, "pest_disease_analysis")
            .project("climate", WHOLE_PAYLOAD, "climate_analysis")
            .project("fertilizer", WHOLE_PAYLOAD, "fertilizer_analysis")
            .project("market_cost", WHOLE_PAYLOAD, "market_analysis")
            .with_transcript(),
    ];

    build_pipeline_definition(stages, wiring)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_validates() {
        let def = standard_pipeline().unwrap();
        assert_eq!(def.len(), 8);
        assert_eq!(def.stage_ids(),
                   vec!["soil_series", "soil_chemistry", "crop_biology", "pest_disease",
                        "climate", "fertilizer", "market_cost", "report"]);
    }

    #[test]
    fn definition_hash_is_deterministic() {
        let a = standard_pipeline().unwrap();
        let b = standard_pipeline().unwrap();
        assert_eq!(a.definition_hash, b.definition_hash);
    }
}
