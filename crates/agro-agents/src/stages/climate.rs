//! Stage 5: clima de la temporada de cultivo. Agrega las normales mensuales
//! sobre la ventana de crecimiento, califica la idoneidad, identifica riesgos
//! meteorológicos y acumula grados-día.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde_json::{json, Value};

use agro_core::{StageError, StageInput, StageLogic, StageOutput};
use agro_domain::knowledge;

/// Temperatura base para la acumulación de grados-día.
const GDD_BASE_TEMP: f64 = 10.0;

pub struct ClimateStage;

impl StageLogic for ClimateStage {
    fn id(&self) -> &'static str {
        "climate"
    }

    fn display_name(&self) -> &str {
        "Climate Expert"
    }

    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError> {
        let location = input.text("location", "Phrae");
        let target_crop = input.text("target_crop", "Corn");
        let growth_cycle = input.number("growth_cycle_days", 120.0) as u32;

        let planting_date = match input.opt_text("planting_date") {
            Some(s) => s.parse::<NaiveDate>().map_err(|e| {
                           StageError::InvalidInput(format!("bad planting_date '{s}': {e}"))
                       })?,
            None => Utc::now().date_naive() + Duration::days(14),
        };

        let season = growing_season_climate(planting_date, growth_cycle);
        let suitability = assess_suitability(&target_crop, &season);
        let risks = identify_risks(&target_crop, &season);
        let window = planting_window(&target_crop);
        let gdd = growing_degree_days(&season, &target_crop);

        log::debug!(target: "agro::stage",
                    "[climate] {location}: {:.0} mm over the season, suitability {}",
                    season.total_rainfall_mm, suitability.score);

        let high_risks: Vec<&str> = risks.iter()
                                         .filter(|r| r["severity"] == json!("high"))
                                         .take(2)
                                         .filter_map(|r| r["risk"].as_str())
                                         .collect();
        let risk_summary = if high_risks.is_empty() {
            "no high risks".to_string()
        } else {
            high_risks.join(", ")
        };

        let mut out = StageOutput::new();
        out.set("location", json!(location));
        out.set("climate_data", json!({
            "monthly_data": season.monthly_data,
            "total_rainfall_mm": season.total_rainfall_mm,
            "avg_temp": season.avg_temp,
            "avg_humidity": season.avg_humidity,
            "min_temp": season.min_temp,
            "max_temp": season.max_temp,
            "planting_season": season.planting_season,
        }));
        out.set("suitability", json!({
            "score": suitability.score,
            "rating": suitability.rating,
            "factors": suitability.factors,
        }));
        out.set("weather_risks", json!(risks));
        out.set("planting_window", window);
        out.set("growing_degree_days", gdd);
        out.set("recommendations", json!(recommendations(&suitability, &risks)));
        out.set("observation",
                json!(format!("Climate Expert: suitability {} (score {}/100), \
                               {:.0} mm of rain over the season, average temperature {:.1} C, \
                               risks: {risk_summary}",
                              suitability.rating, suitability.score,
                              season.total_rainfall_mm, season.avg_temp)));
        Ok(out)
    }
}

struct SeasonClimate {
    monthly_data: Vec<Value>,
    total_rainfall_mm: f64,
    avg_temp: f64,
    avg_humidity: f64,
    min_temp: f64,
    max_temp: f64,
    planting_season: String,
}

/// Ventana de meses = ciclo/30 + 2, con vuelta de año.
fn growing_season_climate(planting_date: NaiveDate, growth_days: u32) -> SeasonClimate {
    let kb = knowledge();
    let start_month = planting_date.month();
    let months_needed = (growth_days / 30) + 2;

    let mut monthly_data = Vec::new();
    let mut total_rainfall = 0.0;
    let mut temps = Vec::new();
    let mut humidities = Vec::new();
    let mut min_temp = f64::INFINITY;
    let mut max_temp = f64::NEG_INFINITY;

    for i in 0..months_needed {
        let month = ((start_month - 1 + i) % 12) + 1;
        let Some(normals) = kb.monthly_climate(month) else {
            continue;
        };
        monthly_data.push(json!({
            "month": month,
            "temp_min": normals.temp_min,
            "temp_max": normals.temp_max,
            "rainfall_mm": normals.rainfall_mm,
            "humidity": normals.humidity,
            "season": normals.season.label(),
        }));
        total_rainfall += normals.rainfall_mm;
        temps.push(normals.mean_temp());
        humidities.push(normals.humidity);
        min_temp = min_temp.min(normals.temp_min);
        max_temp = max_temp.max(normals.temp_max);
    }

    let planting_season = kb.monthly_climate(start_month)
                            .map(|m| m.season.label().to_string())
                            .unwrap_or_default();

    SeasonClimate { monthly_data,
                    total_rainfall_mm: total_rainfall,
                    avg_temp: mean(&temps),
                    avg_humidity: mean(&humidities),
                    min_temp,
                    max_temp,
                    planting_season }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

struct Suitability {
    score: u32,
    rating: &'static str,
    factors: Vec<Value>,
}

fn crop_needs(crop: &str) -> (f64, (f64, f64)) {
    // (lluvia mínima mm, rango de temperatura media).
    match crop {
        "Riceberry Rice" => (1000.0, (20.0, 35.0)),
        _ => (400.0, (18.0, 35.0)),
    }
}

/// Lluvia 40 pts, temperatura 35 pts, temporada de siembra 25 pts.
fn assess_suitability(crop: &str, season: &SeasonClimate) -> Suitability {
    let (min_rain, temp_range) = crop_needs(crop);
    let mut factors = Vec::new();
    let mut score = 0;

    let (rain_score, rain_status) = if season.total_rainfall_mm >= min_rain {
        (40, "sufficient")
    } else if season.total_rainfall_mm >= min_rain * 0.7 {
        (25, "marginal")
    } else {
        (10, "insufficient")
    };
    score += rain_score;
    factors.push(json!({"factor": "rainfall", "status": rain_status, "score": rain_score}));

    let (temp_score, temp_status) =
        if temp_range.0 <= season.avg_temp && season.avg_temp <= temp_range.1 {
            (35, "suitable")
        } else {
            (15, "unsuitable")
        };
    score += temp_score;
    factors.push(json!({"factor": "temperature", "status": temp_status, "score": temp_score}));

    let (season_score, season_status) = if season.planting_season.contains("rainy") {
        (25, "rainy season, well timed")
    } else {
        (15, "dry season, irrigation required")
    };
    score += season_score;
    factors.push(json!({"factor": "season", "status": season_status, "score": season_score}));

    let rating = if score >= 85 {
        "excellent"
    } else if score >= 70 {
        "good"
    } else if score >= 55 {
        "fair"
    } else {
        "caution"
    };

    Suitability { score, rating, factors }
}

fn identify_risks(crop: &str, season: &SeasonClimate) -> Vec<Value> {
    let mut risks = Vec::new();

    if season.total_rainfall_mm < 500.0 {
        risks.push(json!({"risk": "drought", "severity": "high",
                          "mitigation": "set up backup water and plan supplemental irrigation"}));
    } else if season.total_rainfall_mm < 800.0 {
        risks.push(json!({"risk": "low rainfall", "severity": "medium",
                          "mitigation": "prepare backup water"}));
    }

    let flood_months = season.monthly_data
                             .iter()
                             .filter(|m| m["rainfall_mm"].as_f64().unwrap_or(0.0) > 200.0)
                             .count();
    let tolerates_flooding = knowledge().crop(crop)
                                        .map(|c| c.soil_requirements.tolerates_flooding)
                                        .unwrap_or(false);
    if flood_months > 0 && !tolerates_flooding {
        let severity = if flood_months > 2 { "high" } else { "medium" };
        risks.push(json!({"risk": "flooding or waterlogging", "severity": severity,
                          "mitigation": "dig drainage furrows and raise the beds"}));
    }

    if season.max_temp > 38.0 {
        risks.push(json!({"risk": "heat stress", "severity": "medium",
                          "mitigation": "irrigate to cool the crop, avoid midday field work"}));
    }

    risks.push(json!({"risk": "storms and strong wind", "severity": "low",
                      "mitigation": "choose varieties with sturdy stems"}));

    risks
}

fn planting_window(crop: &str) -> Value {
    match crop {
        "Riceberry Rice" => json!({
            "optimal": "May - July",
            "acceptable": "April - August",
            "note": "planting at the start of the rainy season works best",
        }),
        _ => json!({
            "optimal": "June - July",
            "acceptable": "May - August",
            "note": "plant once the rains have become steady",
        }),
    }
}

fn growing_degree_days(season: &SeasonClimate, crop: &str) -> Value {
    let total_gdd: f64 = season.monthly_data
                               .iter()
                               .map(|m| {
                                   let avg = (m["temp_min"].as_f64().unwrap_or(0.0)
                                              + m["temp_max"].as_f64().unwrap_or(0.0))
                                             / 2.0;
                                   (avg - GDD_BASE_TEMP).max(0.0) * 30.0
                               })
                               .sum();
    let required = match crop {
        "Corn" => 2700.0,
        _ => 2500.0,
    };

    json!({
        "total_gdd": total_gdd,
        "required_gdd": required,
        "adequate": total_gdd >= required,
    })
}

fn recommendations(suitability: &Suitability, risks: &[Value]) -> Vec<String> {
    let mut recs = Vec::new();

    if suitability.score < 70 {
        recs.push("have the irrigation system ready".to_string());
    }
    for risk in risks {
        if risk["severity"] == json!("high") {
            recs.push(format!("prepare for {}: {}",
                              risk["risk"].as_str().unwrap_or(""),
                              risk["mitigation"].as_str().unwrap_or("")));
        }
    }
    recs.push("follow the weather forecast every week".to_string());
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::Stage;

    fn run(crop: &str, planting: &str, growth_days: u32) -> StageOutput {
        let mut input = StageInput::new();
        input.set("location", json!("Phrae Province"));
        input.set("target_crop", json!(crop));
        input.set("planting_date", json!(planting));
        input.set("growth_cycle_days", json!(growth_days));
        Stage::process(&ClimateStage, &input).into_payload()
    }

    #[test]
    fn rainy_season_rice_scores_excellent() {
        // May planting, 130-day cycle: 6 months May-Oct, 1100 mm total.
        let out = run("Riceberry Rice", "2026-05-15", 130);
        let rainfall = out.path("climate_data.total_rainfall_mm").unwrap().as_f64().unwrap();
        assert!((rainfall - 1100.0).abs() < 1e-9);
        assert_eq!(out.path("suitability.score").unwrap(), &json!(100));
        assert_eq!(out.path("suitability.rating").unwrap(), &json!("excellent"));
    }

    #[test]
    fn dry_season_corn_flags_drought() {
        // December planting, 120-day window Dec-May: 293 mm total.
        let out = run("Corn", "2026-12-01", 120);
        let rainfall = out.path("climate_data.total_rainfall_mm").unwrap().as_f64().unwrap();
        assert!(rainfall < 500.0);
        let risks = out.get("weather_risks").unwrap().as_array().unwrap();
        assert_eq!(risks[0]["risk"], json!("drought"));
        assert_eq!(risks[0]["severity"], json!("high"));
    }

    #[test]
    fn window_wraps_across_year_end() {
        let out = run("Corn", "2026-11-10", 120);
        let months = out.path("climate_data.monthly_data").unwrap().as_array().unwrap();
        assert_eq!(months.len(), 6);
        assert_eq!(months[0]["month"], json!(11));
        assert_eq!(months[2]["month"], json!(1), "wraps into January");
    }

    #[test]
    fn corn_in_rainy_months_gets_flood_risk() {
        let out = run("Corn", "2026-06-01", 120);
        let risks = out.get("weather_risks").unwrap().as_array().unwrap();
        assert!(risks.iter()
                     .any(|r| r["risk"] == json!("flooding or waterlogging")),
                "corn does not tolerate flooding in the wet months");
    }

    #[test]
    fn gdd_accumulates_over_the_window() {
        let out = run("Corn", "2026-06-01", 120);
        let gdd = out.get("growing_degree_days").unwrap();
        // Jun-Nov means: 28.5, 28, 28, 27.5, 27, 24.5 -> 3105 GDD.
        assert!((gdd["total_gdd"].as_f64().unwrap() - 3105.0).abs() < 1e-6);
        assert_eq!(gdd["adequate"], json!(true));
    }
}
