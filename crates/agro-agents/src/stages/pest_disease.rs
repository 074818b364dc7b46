//! Stage 4: riesgo de plagas y enfermedades según temporada, humedad y
//! riego, con plan IPM y alternativas orgánicas.

use serde_json::{json, Value};

use agro_core::{StageError, StageInput, StageLogic, StageOutput};
use agro_domain::{knowledge, DiseaseEntry, PestEntry, RiskLevel};

pub struct PestDiseaseStage;

impl StageLogic for PestDiseaseStage {
    fn id(&self) -> &'static str {
        "pest_disease"
    }

    fn display_name(&self) -> &str {
        "Pest & Disease Expert"
    }

    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError> {
        let target_crop = input.text("target_crop", "Corn");
        let season = input.text("season", "rainy");
        let humidity = input.number("humidity", 75.0);
        let irrigation = input.flag("irrigation_available", true);

        // Cultivo sin catálogo propio cae al perfil de referencia.
        let profile = knowledge().pest_profile(&target_crop)
                                 .ok_or_else(|| {
                                     StageError::Internal("pest catalog is empty".to_string())
                                 })?;

        let pest_analysis: Vec<Value> = profile.pests
                                               .iter()
                                               .map(|p| analyze_pest(p, &season))
                                               .collect();
        let disease_analysis: Vec<Value> = profile.diseases
                                                  .iter()
                                                  .map(|d| analyze_disease(d, humidity, irrigation))
                                                  .collect();

        let high_risk_count = count_high(&pest_analysis) + count_high(&disease_analysis);
        let (overall_risk, overall_risk_score) = if high_risk_count >= 3 {
            ("high", 75)
        } else if high_risk_count >= 1 {
            ("medium", 50)
        } else {
            ("low", 25)
        };

        log::debug!(target: "agro::stage",
                    "[pest_disease] {target_crop}: {high_risk_count} high-risk threats, \
                     overall {overall_risk}");

        let top_pests = top_high_names(&pest_analysis);
        let top_diseases = top_high_names(&disease_analysis);

        let mut out = StageOutput::new();
        out.set("crop", json!(target_crop));
        out.set("pest_analysis", json!(pest_analysis));
        out.set("disease_analysis", json!(disease_analysis));
        out.set("overall_risk", json!(overall_risk));
        out.set("overall_risk_score", json!(overall_risk_score));
        out.set("ipm_plan", ipm_plan());
        out.set("prevention_calendar", prevention_calendar());
        out.set("chemical_recommendations", chemical_recommendations());
        out.set("organic_alternatives", organic_alternatives());
        out.set("observation",
                json!(format!("Pest & Disease Expert: overall risk {overall_risk}, \
                               pests to watch: {}, diseases to watch: {}, \
                               integrated pest management recommended",
                              summarize(&top_pests),
                              summarize(&top_diseases))));
        Ok(out)
    }
}

/// Fuera de su temporada el riesgo baja un escalón (high queda en medium).
fn analyze_pest(pest: &PestEntry, season: &str) -> Value {
    let risk_level = if pest.season == "all" || pest.season == season {
        pest.risk
    } else if pest.risk == RiskLevel::High {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    json!({
        "name": pest.name,
        "risk_level": risk_level.as_str(),
        "prevention": pest.prevention,
        "monitoring": "scout the field every 3-5 days",
    })
}

/// La humedad alta dispara enfermedades de condición húmeda; el riego
/// promueve las de condición de agua estancada.
fn analyze_disease(disease: &DiseaseEntry, humidity: f64, irrigation: bool) -> Value {
    let mut risk_level = disease.risk;
    if disease.condition == "humid" && humidity > 80.0 {
        risk_level = RiskLevel::High;
    } else if disease.condition == "wet" && irrigation && disease.risk == RiskLevel::Medium {
        risk_level = RiskLevel::High;
    }

    json!({
        "name": disease.name,
        "risk_level": risk_level.as_str(),
        "favorable_condition": disease.condition,
        "prevention": disease.prevention,
    })
}

fn count_high(analysis: &[Value]) -> usize {
    analysis.iter()
            .filter(|a| a["risk_level"] == json!("high"))
            .count()
}

fn top_high_names(analysis: &[Value]) -> Vec<String> {
    analysis.iter()
            .filter(|a| a["risk_level"] == json!("high"))
            .take(2)
            .filter_map(|a| a["name"].as_str().map(str::to_string))
            .collect()
}

fn summarize(names: &[String]) -> String {
    if names.is_empty() {
        "none at high risk".to_string()
    } else {
        names.join(", ")
    }
}

fn ipm_plan() -> Value {
    json!({
        "cultural_practices": [
            "use pest- and disease-resistant varieties",
            "plant at the right spacing, avoid overcrowding",
            "remove weeds that host pests",
            "rotate crops instead of repeating the same one",
        ],
        "biological_control": [
            "release Trichogramma egg parasitoids",
            "apply Beauveria fungus against insects",
            "apply Bt bacteria against caterpillars",
            "conserve natural enemies",
        ],
        "monitoring": [
            "scout the field every 3-5 days",
            "set up light traps",
            "watch for abnormal plant symptoms",
            "record every observation",
        ],
        "chemical_last_resort": "use chemicals only when necessary and pick safe products",
    })
}

fn prevention_calendar() -> Value {
    json!([
        {"stage": "before planting",
         "activities": ["treat seeds with fungicide", "prepare insect traps"]},
        {"stage": "seedling",
         "activities": ["check the nursery for disease", "protect against rodents and birds"]},
        {"stage": "vegetative",
         "activities": ["scout for insects weekly", "spray preventive biologicals"]},
        {"stage": "flowering",
         "activities": ["watch for humidity-driven diseases", "check for borers"]},
        {"stage": "harvest",
         "activities": ["stop chemical spraying 14 days before harvest"]},
    ])
}

fn chemical_recommendations() -> Value {
    json!([
        {"type": "insecticide", "name": "chlorpyrifos",
         "note": "only during severe outbreaks"},
        {"type": "fungicide", "name": "mancozeb",
         "note": "spray preventively before disease spreads"},
    ])
}

fn organic_alternatives() -> Value {
    json!([
        {"name": "fermented herbal extract", "target": "sucking insects",
         "how": "dilute 1:50 with water and spray"},
        {"name": "Bt culture", "target": "caterpillars",
         "how": "dilute per label and spray in the evening"},
        {"name": "Beauveria fungus", "target": "general insects",
         "how": "mix with water and spray in shade"},
        {"name": "wood vinegar", "target": "broad insect repellent",
         "how": "dilute 1:100 with water and spray"},
    ])
}
