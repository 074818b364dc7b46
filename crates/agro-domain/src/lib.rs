//! agro-domain: conocimiento agronómico tipado (suelos, cultivos,
//! fertilizantes, clima, mercado) para la provincia de Phrae.

pub mod errors;
pub mod knowledge;
pub mod types;

pub use errors::DomainError;
pub use knowledge::{knowledge, KnowledgeBase, ValidationSummary, DEFAULT_CLIMATE_LOCATION,
                    REFERENCE_CROP};
pub use types::{ClimateTable, CostTemplate, CropRequirements, DiseaseEntry, Fertilizer,
                FertilizerKind, GrowthStage, MarketPrice, MonthlyClimate, NutrientRange,
                NutrientRequirements, PestEntry, PestProfile, Range, RiskLevel, Season,
                SoilRequirements, SoilSeries, TextureComposition, TypicalProperties,
                YieldPotential};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_base_loads_and_validates_clean() {
        let kb = knowledge();
        let summary = kb.validate();
        assert!(summary.soil_series >= 3);
        assert!(summary.crops >= 2);
        assert!(summary.fertilizers >= 4);
        // Los avisos por cultivos sin ficha propia son informativos.
        assert!(summary.warnings
                       .iter()
                       .all(|w| w.contains("without requirements entry")),
                "unexpected warnings: {:?}", summary.warnings);
    }

    #[test]
    fn crop_lookup_known_and_unknown() {
        let kb = knowledge();
        let corn = kb.crop("Corn").expect("Corn must exist");
        assert_eq!(corn.growth_cycle_days, 120);
        assert!(!corn.soil_requirements.tolerates_flooding);

        let err = kb.crop("Dragonfruit").unwrap_err();
        assert!(matches!(err, DomainError::UnknownCrop(_)));
    }

    #[test]
    fn fertilizer_formula_lookup() {
        let kb = knowledge();
        let urea = kb.fertilizer_by_formula("46-0-0").expect("urea in catalog");
        assert_eq!(urea.kind, FertilizerKind::Nitrogen);
        assert!(urea.price_thb_per_kg > 0.0);
        assert!(kb.fertilizer_by_formula("99-99-99").is_none());
    }

    #[test]
    fn monthly_climate_covers_full_year() {
        let kb = knowledge();
        for m in 1..=12 {
            let month = kb.monthly_climate(m).expect("month present");
            assert!(month.temp_max > month.temp_min);
        }
        assert!(kb.monthly_climate(13).is_none());
        // Agosto es el pico de lluvias en la tabla de Phrae.
        assert!(kb.monthly_climate(8).unwrap().season.is_rainy());
    }

    #[test]
    fn pest_profile_falls_back_to_reference_crop() {
        let kb = knowledge();
        let direct = kb.pest_profile("Riceberry Rice").expect("rice profile");
        assert!(direct.pests.iter().any(|p| p.name == "Brown planthopper"));

        let fallback = kb.pest_profile("Dragonfruit").expect("fallback profile");
        assert!(fallback.pests.iter().any(|p| p.name == "Fall armyworm"));
    }

    #[test]
    fn market_and_cost_fallbacks() {
        let kb = knowledge();
        let rice = kb.market_price("Riceberry Rice").expect("rice price");
        assert!(rice.retail > rice.farm_gate);

        let unknown = kb.market_price("Dragonfruit").expect("fallback price");
        assert_eq!(unknown.farm_gate, kb.market_price(REFERENCE_CROP).unwrap().farm_gate);

        let costs = kb.cost_template("Corn").expect("corn costs");
        let total: f64 = costs.items().iter().map(|(_, v)| v).sum();
        assert!(total > 0.0);
    }
}
