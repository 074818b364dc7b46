//! Stage 8: reporte ejecutivo. Consolida los siete análisis anteriores en
//! resumen, dashboard, plan de acción, matriz de riesgos y recomendaciones.
//!
//! Este stage nunca falla: análisis ausentes se reemplazan por valores
//! neutrales para que el reporte siempre se emita.

use chrono::Utc;
use serde_json::{json, Map, Value};

use agro_core::{StageError, StageInput, StageLogic, StageOutput};

// Valores neutrales cuando falta el análisis correspondiente.
const DEFAULT_SOIL_SCORE: f64 = 60.0;
const DEFAULT_CLIMATE_SCORE: f64 = 70.0;
const DEFAULT_PEST_RISK: f64 = 50.0;
const DEFAULT_ROI: f64 = 30.0;

pub struct ReportStage;

impl StageLogic for ReportStage {
    fn id(&self) -> &'static str {
        "report"
    }

    fn display_name(&self) -> &str {
        "Chief Reporter"
    }

    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError> {
        let session_id = input.text("session_id", "N/A");
        let sample_id = input.text("sample_id", "N/A");
        let location = input.text("location", "unspecified");
        let target_crop = input.text("target_crop", "Corn");
        let field_size_rai = input.number("field_size_rai", 1.0);

        let soil_series = section(input, "soil_series_analysis");
        let soil_chemistry = section(input, "soil_chemistry_analysis");
        let crop_biology = section(input, "crop_biology_analysis");
        let pest_disease = section(input, "pest_disease_analysis");
        let climate = section(input, "climate_analysis");
        let fertilizer = section(input, "fertilizer_analysis");
        let market = section(input, "market_analysis");

        let observations = input.value("all_observations")
                                .and_then(Value::as_array)
                                .cloned()
                                .unwrap_or_default();

        let summary = executive_summary(&soil_chemistry, &climate, &pest_disease, &market,
                                        &crop_biology, &target_crop, field_size_rai);
        let dashboard = compile_dashboard(&soil_chemistry, &crop_biology, &market);
        let action_plan = build_action_plan(&soil_chemistry, &climate, &fertilizer, &pest_disease);
        let risk_matrix = compile_risk_matrix(&soil_chemistry, &pest_disease, &climate, &market);
        let recommendations = compile_recommendations(&soil_chemistry, &climate, &fertilizer,
                                                      &market);

        log::debug!(target: "agro::stage",
                    "[report] overall score {:.0}, {} actions",
                    summary["overall_score"].as_f64().unwrap_or(0.0),
                    action_plan.len());

        let now = Utc::now();
        let mut out = StageOutput::new();
        out.set("report_metadata", json!({
            "title": "Farm Advisory Report",
            "report_id": format!("SOILER-{}", now.format("%Y%m%d-%H%M%S")),
            "session_id": session_id,
            "sample_id": sample_id,
            "generated_at": now.to_rfc3339(),
        }));
        out.set("project_info", json!({
            "location": location,
            "target_crop": target_crop,
            "field_size_rai": field_size_rai,
            "analysis_date": now.date_naive().to_string(),
        }));
        out.set("executive_summary", summary.clone());
        out.set("dashboard", dashboard);
        out.set("agent_observations", json!(observations));
        out.set("sections", json!({
            "soil_series": soil_series,
            "soil_chemistry": json!({
                "ph_analysis": soil_chemistry.get("ph_analysis").cloned().unwrap_or_default(),
                "nutrient_analysis": soil_chemistry.get("nutrient_analysis")
                                                   .cloned()
                                                   .unwrap_or_default(),
                "health_score": soil_chemistry.get("health_score").cloned().unwrap_or_default(),
                "issues": soil_chemistry.get("issues").cloned().unwrap_or_default(),
            }),
            "crop_planning": json!({
                "growth_cycle_days": crop_biology.get("growth_cycle_days")
                                                 .cloned()
                                                 .unwrap_or_default(),
                "planting_date": crop_biology.get("planting_date").cloned().unwrap_or_default(),
                "harvest_date": crop_biology.get("harvest_date").cloned().unwrap_or_default(),
                "yield_targets": crop_biology.get("yield_targets").cloned().unwrap_or_default(),
                "water_requirements": crop_biology.get("water_requirements")
                                                  .cloned()
                                                  .unwrap_or_default(),
                "critical_periods": crop_biology.get("critical_periods")
                                                .cloned()
                                                .unwrap_or_default(),
            }),
            "pest_disease": json!({
                "overall_risk": pest_disease.get("overall_risk").cloned().unwrap_or_default(),
                "pest_analysis": pest_disease.get("pest_analysis").cloned().unwrap_or_default(),
                "disease_analysis": pest_disease.get("disease_analysis")
                                                .cloned()
                                                .unwrap_or_default(),
                "ipm_plan": pest_disease.get("ipm_plan").cloned().unwrap_or_default(),
            }),
            "climate": json!({
                "suitability": climate.get("suitability").cloned().unwrap_or_default(),
                "weather_risks": climate.get("weather_risks").cloned().unwrap_or_default(),
                "planting_window": climate.get("planting_window").cloned().unwrap_or_default(),
            }),
            "fertilizer": json!({
                "schedule": fertilizer.get("application_schedule").cloned().unwrap_or_default(),
                "cost_analysis": fertilizer.get("cost_analysis").cloned().unwrap_or_default(),
                "within_budget": fertilizer.get("within_budget").cloned().unwrap_or(json!(true)),
            }),
            "financial": financial_summary(&market),
            "risks": risk_matrix,
        }));
        out.set("action_plan", json!(action_plan));
        out.set("crop_calendar", crop_biology.get("growth_calendar")
                                             .cloned()
                                             .unwrap_or_else(|| json!([])));
        out.set("recommendations", recommendations);
        out.set("observation",
                json!(format!("Chief Reporter: report complete, overall status {} \
                               (score {:.0}/100), {} action items",
                              summary["overall_status"].as_str().unwrap_or(""),
                              summary["overall_score"].as_f64().unwrap_or(0.0),
                              action_plan.len())));
        Ok(out)
    }
}

fn section(input: &StageInput, key: &str) -> Map<String, Value> {
    input.value(key)
         .and_then(Value::as_object)
         .cloned()
         .unwrap_or_default()
}

fn path<'a>(map: &'a Map<String, Value>, dotted: &str) -> Option<&'a Value> {
    let mut parts = dotted.split('.');
    let mut current = map.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn number(map: &Map<String, Value>, dotted: &str, default: f64) -> f64 {
    path(map, dotted).and_then(Value::as_f64).unwrap_or(default)
}

/// Puntaje global: suelo, clima, ROI (acotado a 0..100) y la inversa del
/// riesgo de plagas, a partes iguales.
fn executive_summary(soil_chemistry: &Map<String, Value>, climate: &Map<String, Value>,
                     pest_disease: &Map<String, Value>, market: &Map<String, Value>,
                     crop_biology: &Map<String, Value>, target_crop: &str, field_size: f64)
                     -> Value {
    let soil_score = number(soil_chemistry, "health_score", DEFAULT_SOIL_SCORE);
    let climate_score = number(climate, "suitability.score", DEFAULT_CLIMATE_SCORE);
    let roi = number(market, "profit_analysis.roi_percent", DEFAULT_ROI);
    let pest_risk = number(pest_disease, "overall_risk_score", DEFAULT_PEST_RISK);

    let overall_score = soil_score * 0.25
                        + climate_score * 0.25
                        + roi.clamp(0.0, 100.0) * 0.25
                        + (100.0 - pest_risk) * 0.25;

    let overall_status = if overall_score >= 75.0 {
        "excellent"
    } else if overall_score >= 55.0 {
        "good"
    } else if overall_score >= 40.0 {
        "fair"
    } else {
        "caution"
    };

    let mut highlights = Vec::new();
    if soil_score >= 70.0 {
        highlights.push(format!("soil health is good ({soil_score:.0}/100)"));
    } else {
        highlights.push(format!("soil needs improvement ({soil_score:.0}/100)"));
    }
    if climate_score >= 70.0 {
        highlights.push("climate is favorable".to_string());
    } else {
        highlights.push("climate poses challenges".to_string());
    }
    if roi >= 50.0 {
        highlights.push(format!("ROI is very good ({roi:.0}%)"));
    } else if roi >= 0.0 {
        highlights.push(format!("ROI is moderate ({roi:.0}%)"));
    } else {
        highlights.push(format!("ROI is negative ({roi:.0}%)"));
    }

    let yield_target = number(crop_biology, "yield_targets.target_kg_per_rai", 500.0);
    let profit = number(market, "profit_analysis.net_profit", 0.0);
    let bottom_line = format!("{field_size} rai of {target_crop} should yield \
                               {:.0} kg with an expected {} of {:.0} THB",
                              yield_target * field_size,
                              if profit >= 0.0 { "profit" } else { "loss" },
                              profit.abs());

    json!({
        "overall_status": overall_status,
        "overall_score": overall_score,
        "target_crop": target_crop,
        "field_size_rai": field_size,
        "highlights": highlights,
        "bottom_line": bottom_line,
        "confidence": if overall_score >= 60.0 { "high" } else { "moderate" },
    })
}

fn compile_dashboard(soil_chemistry: &Map<String, Value>, crop_biology: &Map<String, Value>,
                     market: &Map<String, Value>)
                     -> Value {
    json!({
        "soil_health": {
            "score": number(soil_chemistry, "health_score", 0.0),
            "max": 100,
        },
        "yield_target": {
            "value": number(crop_biology, "yield_targets.target_kg_per_rai", 0.0),
            "unit": "kg/rai",
            "total": number(crop_biology, "yield_targets.total_kg", 0.0),
        },
        "investment": {
            "total_cost": number(market, "cost_analysis.total_cost", 0.0),
            "cost_per_rai": number(market, "cost_analysis.cost_per_rai", 0.0),
            "unit": "THB",
        },
        "returns": {
            "revenue": number(market, "profit_analysis.total_revenue", 0.0),
            "profit": number(market, "profit_analysis.net_profit", 0.0),
            "roi_percent": number(market, "profit_analysis.roi_percent", 0.0),
        },
    })
}

fn array<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    map.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn build_action_plan(soil_chemistry: &Map<String, Value>, climate: &Map<String, Value>,
                     fertilizer: &Map<String, Value>, pest_disease: &Map<String, Value>)
                     -> Vec<Value> {
    let mut actions = Vec::new();
    let mut priority = 1;

    for issue in array(soil_chemistry, "issues") {
        actions.push(json!({
            "priority": priority,
            "urgency": "critical",
            "action": format!("fix soil issue: {}", issue.as_str().unwrap_or("")),
            "category": "soil management",
            "timeline": "before planting",
        }));
        priority += 1;
    }

    for risk in array(climate, "weather_risks") {
        if risk["severity"] == json!("high") {
            actions.push(json!({
                "priority": priority,
                "urgency": "high",
                "action": format!("prepare for {}", risk["risk"].as_str().unwrap_or("")),
                "category": "risk management",
                "timeline": "immediately",
                "mitigation": risk["mitigation"].clone(),
            }));
            priority += 1;
        }
    }

    for app in array(fertilizer, "application_schedule").iter().take(3) {
        actions.push(json!({
            "priority": priority,
            "urgency": "high",
            "action": format!("apply {} at {:.1} kg/rai",
                              app["name"].as_str().unwrap_or(""),
                              app["rate_kg_per_rai"].as_f64().unwrap_or(0.0)),
            "category": "fertilization",
            "timeline": app["stage"].clone(),
        }));
        priority += 1;
    }

    for pest in array(pest_disease, "pest_analysis").iter().take(2) {
        if pest["risk_level"] == json!("high") {
            actions.push(json!({
                "priority": priority,
                "urgency": "high",
                "action": format!("protect against {}", pest["name"].as_str().unwrap_or("")),
                "category": "pest prevention",
                "timeline": "all season",
                "method": pest["prevention"].clone(),
            }));
            priority += 1;
        }
    }

    actions
}

fn compile_risk_matrix(soil_chemistry: &Map<String, Value>, pest_disease: &Map<String, Value>,
                       climate: &Map<String, Value>, market: &Map<String, Value>)
                       -> Value {
    let mut all_risks = Vec::new();

    for issue in array(soil_chemistry, "issues") {
        all_risks.push(json!({"risk": issue, "category": "soil", "severity": "high"}));
    }
    for pest in array(pest_disease, "pest_analysis") {
        if pest["risk_level"] == json!("high") || pest["risk_level"] == json!("medium") {
            all_risks.push(json!({"risk": pest["name"], "category": "pests",
                                  "severity": pest["risk_level"]}));
        }
    }
    for risk in array(climate, "weather_risks") {
        all_risks.push(json!({"risk": risk["risk"], "category": "climate",
                              "severity": risk["severity"],
                              "mitigation": risk["mitigation"]}));
    }
    for risk in array(market, "market_risks") {
        all_risks.push(json!({"risk": risk["risk"], "category": "market",
                              "severity": risk["severity"]}));
    }

    let count = |sev: &str| {
        all_risks.iter().filter(|r| r["severity"] == json!(sev)).count()
    };
    let high = count("high");
    let medium = count("medium");
    let low = count("low");

    json!({
        "risks": all_risks,
        "summary": {
            "total_risks": high + medium + low,
            "high_severity": high,
            "medium_severity": medium,
            "low_severity": low,
        },
        "overall_rating": if high >= 2 { "high" } else if high >= 1 { "medium" } else { "low" },
    })
}

fn financial_summary(market: &Map<String, Value>) -> Value {
    json!({
        "investment": {
            "total_cost": number(market, "cost_analysis.total_cost", 0.0),
            "cost_per_rai": number(market, "cost_analysis.cost_per_rai", 0.0),
            "breakdown": path(market, "cost_analysis.breakdown").cloned()
                                                               .unwrap_or_else(|| json!([])),
        },
        "revenue": {
            "total_revenue": number(market, "profit_analysis.total_revenue", 0.0),
            "price_per_kg": number(market, "market_analysis.farm_gate_price", 0.0),
        },
        "profit": {
            "net_profit": number(market, "profit_analysis.net_profit", 0.0),
            "profit_per_rai": number(market, "profit_analysis.profit_per_rai", 0.0),
            "roi_percent": number(market, "profit_analysis.roi_percent", 0.0),
        },
        "breakeven": {
            "yield_required_kg_per_rai": number(market, "profit_analysis.break_even_per_rai", 0.0),
        },
    })
}

fn strings(values: &[Value], limit: usize) -> Vec<String> {
    values.iter()
          .take(limit)
          .filter_map(|v| v.as_str().map(str::to_string))
          .collect()
}

fn compile_recommendations(soil_chemistry: &Map<String, Value>, climate: &Map<String, Value>,
                           fertilizer: &Map<String, Value>, market: &Map<String, Value>)
                           -> Value {
    let immediate: Vec<String> = array(soil_chemistry, "issues").iter()
                                                                .filter_map(Value::as_str)
                                                                .map(|i| format!("address: {i}"))
                                                                .collect();

    let mut during_growth = strings(array(fertilizer, "recommendations"), 3);
    during_growth.extend(strings(array(climate, "recommendations"), 2));

    json!({
        "immediate": immediate,
        "pre_planting": strings(array(soil_chemistry, "recommendations"), 3),
        "during_growth": during_growth,
        "financial": strings(array(market, "recommendations"), 3),
        "long_term": [
            "build soil organic matter with compost or green manure",
            "rotate crops to break pest cycles",
            "test the soil yearly to track changes",
            "consider certified organic production for added value",
        ],
    })
}
