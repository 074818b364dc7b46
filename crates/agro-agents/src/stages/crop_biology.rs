//! Stage 3: biología del cultivo. Calendario de crecimiento, requerimiento
//! hídrico, metas de rendimiento ajustadas por salud del suelo y demanda de
//! nutrientes.
//!
//! Cultivo desconocido es un fallo de dominio: sin requerimientos no hay
//! análisis que hacer aguas abajo.

use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;

use agro_core::{StageError, StageInput, StageLogic, StageOutput};
use agro_domain::{knowledge, CropRequirements};

/// Días asumidos hasta la siembra cuando no se indica fecha.
const DEFAULT_PLANTING_OFFSET_DAYS: i64 = 14;

pub struct CropBiologyStage;

impl StageLogic for CropBiologyStage {
    fn id(&self) -> &'static str {
        "crop_biology"
    }

    fn display_name(&self) -> &str {
        "Crop Biology Expert"
    }

    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError> {
        let target_crop = input.text("target_crop", "Corn");
        let field_size_rai = input.number("field_size_rai", 1.0);
        let soil_health_score = input.number("soil_health_score", 70.0);

        let crop = knowledge().crop(&target_crop).map_err(StageError::domain)?;

        let planting_date = resolve_planting_date(input.opt_text("planting_date"))?;
        let growth_cycle = crop.growth_cycle_days;
        let harvest_date = planting_date + Duration::days(growth_cycle as i64);

        let calendar = build_growth_calendar(crop, planting_date);
        let water = water_requirements(crop, field_size_rai);
        let yields = yield_targets(crop, soil_health_score, field_size_rai);
        let nutrients = nutrient_requirements(crop, field_size_rai);
        let critical = critical_periods(crop);

        log::debug!(target: "agro::stage",
                    "[crop_biology] {target_crop}: {growth_cycle} days, target {:.0} kg/rai",
                    yields.target);

        let mut out = StageOutput::new();
        out.set("crop_name", json!(target_crop));
        out.set("growth_cycle_days", json!(growth_cycle));
        out.set("planting_date", json!(planting_date.to_string()));
        out.set("harvest_date", json!(harvest_date.to_string()));
        out.set("growth_calendar", json!(calendar));
        out.set("water_requirements", json!({
            "total_mm": crop.water_requirement_mm,
            "per_rai_liters": water.per_rai_liters,
            "total_liters": water.per_rai_liters * field_size_rai,
            "daily_avg_mm": water.daily_avg_mm,
            "irrigation_needed": water.irrigation_needed,
        }));
        out.set("yield_targets", json!({
            "target_kg_per_rai": yields.target,
            "total_kg": yields.target * field_size_rai,
            "level": yields.level,
            "potential_range": serde_json::to_value(crop.yield_potential_kg_per_rai)?,
            "field_size_rai": field_size_rai,
        }));
        out.set("nutrient_requirements", json!(nutrients));
        out.set("critical_periods", json!(critical));
        out.set("soil_requirements", serde_json::to_value(&crop.soil_requirements)?);
        out.set("special_notes", json!(crop.special_notes));
        out.set("observation",
                json!(format!("Crop Biology Expert: {target_crop} takes {growth_cycle} days, \
                               needs {:.0} mm of water, yield target {:.0} kg/rai \
                               ({:.0} kg total from {field_size_rai} rai), critical periods: {}",
                              crop.water_requirement_mm,
                              yields.target,
                              yields.target * field_size_rai,
                              critical.iter()
                                      .take(2)
                                      .map(|p| p["name"].as_str().unwrap_or(""))
                                      .collect::<Vec<_>>()
                                      .join(", "))));
        Ok(out)
    }
}

fn resolve_planting_date(raw: Option<&str>) -> Result<NaiveDate, StageError> {
    match raw {
        Some(s) => s.parse::<NaiveDate>().map_err(|e| {
                       StageError::InvalidInput(format!("bad planting_date '{s}': {e}"))
                   }),
        None => Ok(Utc::now().date_naive() + Duration::days(DEFAULT_PLANTING_OFFSET_DAYS)),
    }
}

fn build_growth_calendar(crop: &CropRequirements, planting_date: NaiveDate) -> Vec<serde_json::Value> {
    let mut calendar = Vec::new();
    let mut current = planting_date;

    for (stage_name, stage) in &crop.growth_stages {
        let end = current + Duration::days(stage.days as i64);
        calendar.push(json!({
            "stage": stage_name,
            "description": stage.description,
            "start_date": current.to_string(),
            "end_date": end.to_string(),
            "duration_days": stage.days,
            "key_activities": stage_activities(stage_name),
        }));
        current = end;
    }
    calendar
}

fn stage_activities(stage: &str) -> Vec<&'static str> {
    match stage {
        "seedling" => vec!["prepare the nursery bed", "keep the soil moist",
                           "watch for seedling diseases"],
        "emergence" => vec!["water regularly", "protect against birds and insects"],
        "vegetative" => vec!["apply growth fertilizer", "control weeds",
                             "scout for pests and diseases"],
        "reproductive" => vec!["apply flowering fertilizer", "keep water supply steady",
                               "watch for diseases"],
        "ripening" => vec!["reduce watering", "prepare for harvest"],
        "maturity" => vec!["harvest at full maturity", "dry and store properly"],
        _ => vec!["general care"],
    }
}

struct WaterRequirements {
    per_rai_liters: f64,
    daily_avg_mm: f64,
    irrigation_needed: bool,
}

fn water_requirements(crop: &CropRequirements, _field_size: f64) -> WaterRequirements {
    // 1 rai = 1600 m2; 1 mm de lluvia = 1 litro/m2.
    WaterRequirements { per_rai_liters: crop.water_requirement_mm * 1600.0,
                        daily_avg_mm: crop.water_requirement_mm
                                      / crop.growth_cycle_days as f64,
                        irrigation_needed: crop.water_requirement_mm > 600.0 }
}

struct YieldTargets {
    target: f64,
    level: &'static str,
}

fn yield_targets(crop: &CropRequirements, soil_score: f64, _field_size: f64) -> YieldTargets {
    let potential = crop.yield_potential_kg_per_rai;
    let (target, level) = if soil_score >= 80.0 {
        (potential.high, "high")
    } else if soil_score >= 60.0 {
        (potential.average, "average")
    } else {
        (potential.low, "low")
    };
    YieldTargets { target, level }
}

fn nutrient_requirements(crop: &CropRequirements, field_size: f64) -> serde_json::Value {
    let req = &crop.nutrient_requirements_kg_per_rai;
    json!({
        "nitrogen": {
            "per_rai": req.nitrogen.optimal,
            "total": req.nitrogen.optimal * field_size,
            "unit": "kg N",
        },
        "phosphorus": {
            "per_rai": req.phosphorus_p2o5.optimal,
            "total": req.phosphorus_p2o5.optimal * field_size,
            "unit": "kg P2O5",
        },
        "potassium": {
            "per_rai": req.potassium_k2o.optimal,
            "total": req.potassium_k2o.optimal * field_size,
            "unit": "kg K2O",
        },
    })
}

fn critical_periods(crop: &CropRequirements) -> Vec<serde_json::Value> {
    if crop.scientific_name.to_lowercase().contains("oryza") {
        vec![json!({"name": "tillering", "timing": "20-40 days after planting", "priority": "high"}),
             json!({"name": "heading", "timing": "60-80 days after planting", "priority": "critical"}),
             json!({"name": "grain filling", "timing": "90-110 days after planting", "priority": "high"})]
    } else {
        vec![json!({"name": "emergence", "timing": "7-14 days after planting", "priority": "high"}),
             json!({"name": "flowering", "timing": "45-60 days after planting", "priority": "critical"}),
             json!({"name": "grain setting", "timing": "60-80 days after planting", "priority": "high"})]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::{Stage, StageResult};

    fn run(crop: &str, soil_score: f64, planting: Option<&str>) -> StageResult {
        let mut input = StageInput::new();
        input.set("target_crop", json!(crop));
        input.set("field_size_rai", json!(2.0));
        input.set("soil_health_score", json!(soil_score));
        if let Some(date) = planting {
            input.set("planting_date", json!(date));
        }
        Stage::process(&CropBiologyStage, &input)
    }

    #[test]
    fn unknown_crop_fails_the_stage() {
        let result = run("Durian", 70.0, None);
        assert!(!result.success());
        assert!(result.error_message().unwrap().contains("Durian"));
    }

    #[test]
    fn calendar_spans_the_growth_cycle() {
        let out = run("Corn", 70.0, Some("2026-06-15")).into_payload();
        assert_eq!(out.get("planting_date").unwrap(), &json!("2026-06-15"));
        assert_eq!(out.get("harvest_date").unwrap(), &json!("2026-10-13"));
        let calendar = out.get("growth_calendar").unwrap().as_array().unwrap();
        assert_eq!(calendar.len(), 4);
        assert_eq!(calendar[0]["start_date"], json!("2026-06-15"));
        let total: u64 = calendar.iter().map(|s| s["duration_days"].as_u64().unwrap()).sum();
        assert_eq!(total, 120);
    }

    #[test]
    fn yield_level_tracks_soil_health() {
        let high = run("Corn", 85.0, Some("2026-06-15")).into_payload();
        assert_eq!(high.path("yield_targets.level").unwrap(), &json!("high"));
        assert_eq!(high.path("yield_targets.target_kg_per_rai").unwrap(), &json!(1200.0));

        let low = run("Corn", 50.0, Some("2026-06-15")).into_payload();
        assert_eq!(low.path("yield_targets.level").unwrap(), &json!("low"));
        assert_eq!(low.path("yield_targets.total_kg").unwrap(), &json!(1200.0));
    }

    #[test]
    fn rice_gets_rice_specific_critical_periods() {
        let out = run("Riceberry Rice", 70.0, Some("2026-05-20")).into_payload();
        let periods = out.get("critical_periods").unwrap().as_array().unwrap();
        assert_eq!(periods[0]["name"], json!("tillering"));
        let water = out.get("water_requirements").unwrap();
        assert_eq!(water["irrigation_needed"], json!(true));
    }

    #[test]
    fn malformed_planting_date_is_rejected() {
        let result = run("Corn", 70.0, Some("next tuesday"));
        assert!(!result.success());
        assert!(result.error_message().unwrap().contains("planting_date"));
    }
}
