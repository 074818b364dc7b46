//! Stage 1: identificación de la serie de suelo a partir de ubicación,
//! textura y pH.

use serde_json::json;

use agro_core::{StageError, StageInput, StageLogic, StageOutput};
use agro_domain::knowledge;

/// Serie asumida cuando ningún candidato puntúa.
const FALLBACK_SERIES: &str = "Long";

pub struct SoilSeriesStage;

impl StageLogic for SoilSeriesStage {
    fn id(&self) -> &'static str {
        "soil_series"
    }

    fn display_name(&self) -> &str {
        "Soil Series Expert"
    }

    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError> {
        let location = input.text("location", "");
        let texture = input.text("texture", "");
        let ph = input.number("ph", 6.5);

        let (series_name, confidence) = match_soil_series(&location, &texture, ph);
        let series = knowledge().soil_series(&series_name)
                                .map_err(StageError::domain)?;

        log::debug!(target: "agro::stage",
                    "[soil_series] matched '{series_name}' (confidence {confidence:.2})");

        let mut out = StageOutput::new();
        out.set("identified_series", json!(series_name));
        out.set("confidence", json!(confidence));
        out.set("description", json!(series.description));
        out.set("texture", json!(series.texture));
        out.set("texture_composition", serde_json::to_value(&series.texture_composition)?);
        out.set("drainage", json!(series.drainage));
        out.set("water_holding_capacity", json!(series.water_holding_capacity));
        out.set("cec", json!(series.cec_meq_100g));
        out.set("suitable_crops", json!(series.suitable_crops));
        out.set("limitations", json!(series.limitations));
        out.set("typical_properties", serde_json::to_value(&series.typical_properties)?);
        out.set("observation",
                json!(format!("Soil Series Expert: identified the {} series (confidence {:.0}%), \
                               {} texture with {} drainage, suited for: {}",
                              series_name,
                              confidence * 100.0,
                              series.texture,
                              series.drainage,
                              series.suitable_crops
                                    .iter()
                                    .take(3)
                                    .cloned()
                                    .collect::<Vec<_>>()
                                    .join(", "))));
        Ok(out)
    }
}

/// Puntaje por serie: nombre en la ubicación (+0.5), área conocida (+0.3),
/// textura exacta (+0.3), pH dentro del rango típico (+0.2).
fn match_soil_series(location: &str, texture: &str, ph: f64) -> (String, f64) {
    let location_lower = location.to_lowercase();
    let texture_lower = texture.to_lowercase();

    let mut best_match = FALLBACK_SERIES.to_string();
    let mut best_score = 0.0_f64;

    for (name, series) in knowledge().soil_series_iter() {
        let mut score = 0.0;

        if location_lower.contains(&name.to_lowercase()) {
            score += 0.5;
        }
        for area in &series.location_areas {
            if location_lower.contains(&area.to_lowercase()) {
                score += 0.3;
            }
        }
        if texture_lower == series.texture.to_lowercase() {
            score += 0.3;
        }
        if series.typical_properties.ph_range.contains(ph) {
            score += 0.2;
        }

        if score > best_score {
            best_score = score;
            best_match = name.clone();
        }
    }

    let confidence = if best_score > 0.0 {
        (best_score + 0.4).min(0.97)
    } else {
        0.6
    };
    (best_match, confidence)
}
