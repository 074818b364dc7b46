//! Pruebas de integración del pipeline estándar de ocho stages.

use chrono::{Duration, NaiveDate, Utc};
use serde_json::json;

use agro_agents::standard_pipeline;
use agro_core::{AnalysisRequest, InMemoryRunHistory, Orchestrator, RunHistory};

fn orchestrator() -> Orchestrator<InMemoryRunHistory> {
    Orchestrator::new(standard_pipeline().expect("standard pipeline must validate"),
                      InMemoryRunHistory::new())
}

fn corn_request() -> AnalysisRequest {
    AnalysisRequest { location: "Mueang Phrae, Phrae Province".to_string(),
                      target_crop: "Corn".to_string(),
                      ph: 6.2,
                      nitrogen: 10.0,
                      phosphorus: 8.0,
                      potassium: 40.0,
                      field_size_rai: 2.0,
                      texture: "silty clay loam".to_string(),
                      planting_date: Some("2026-06-15".to_string()),
                      ..AnalysisRequest::default() }
}

#[test]
fn full_corn_run_produces_a_complete_report() {
    let mut orch = orchestrator();
    let report = orch.run(&corn_request()).expect("corn scenario must complete");

    assert_eq!(report.stages_executed, 8);
    assert_eq!(report.observations.len(), 8);
    assert_eq!(report.detailed_analyses.len(), 7);
    assert!(report.session_id.starts_with("SESSION-"));
    assert!(report.sample_id.starts_with("SOIL-"));
    assert!(!report.pipeline_hash.is_empty());

    // Las observaciones llegan en orden de ejecución.
    let ids: Vec<&str> = report.observations.iter().map(|o| o.stage_id.as_str()).collect();
    assert_eq!(ids,
               vec!["soil_series", "soil_chemistry", "crop_biology", "pest_disease",
                    "climate", "fertilizer", "market_cost", "report"]);
    assert!(report.observations.iter().all(|o| !o.observation.is_empty()));

    // El reporte terminal lleva resumen y plan de acción.
    let summary = report.report.path("executive_summary.overall_score").unwrap();
    let score = summary.as_f64().unwrap();
    assert!((0.0..=100.0).contains(&score));
    assert!(!report.report
                   .get("action_plan")
                   .unwrap()
                   .as_array()
                   .unwrap()
                   .is_empty());
    let report_obs = report.report
                           .get("agent_observations")
                           .unwrap()
                           .as_array()
                           .unwrap();
    assert_eq!(report_obs.len(), 7, "report sees the transcript up to market_cost");
}

#[test]
fn depleted_soil_plan_reaches_the_market_stage() {
    let mut orch = orchestrator();
    let report = orch.run(&corn_request()).unwrap();

    // Suelo pobre en N: el plan incluye urea y el costo real fluye al mercado.
    let fertilizer = &report.detailed_analyses["fertilizer"];
    let selected = fertilizer.get("selected_fertilizers").unwrap().as_array().unwrap();
    assert!(selected.iter().any(|f| f["formula"] == json!("46-0-0")));
    let plan_cost = fertilizer.path("cost_analysis.total_cost").unwrap().as_f64().unwrap();
    assert!(plan_cost > 0.0);

    let market = &report.detailed_analyses["market_cost"];
    let fert_breakdown = market.path("cost_analysis.breakdown").unwrap().as_array().unwrap();
    let fert_item = fert_breakdown.iter()
                                  .find(|i| i["item"] == json!("fertilizer"))
                                  .unwrap();
    let market_fert_per_rai = fert_item["cost_per_rai"].as_f64().unwrap();
    assert!((market_fert_per_rai - plan_cost / 2.0).abs() < 1e-6,
            "market stage uses the actual plan cost, not the template");

    let roi = market.path("profit_analysis.roi_percent").unwrap().as_f64().unwrap();
    assert!(roi.is_finite());
}

#[test]
fn soil_health_drives_the_yield_target() {
    let mut orch = orchestrator();
    let report = orch.run(&corn_request()).unwrap();

    let health = report.detailed_analyses["soil_chemistry"].number("health_score").unwrap();
    let target = report.detailed_analyses["crop_biology"].path("yield_targets.target_kg_per_rai")
                                                         .unwrap()
                                                         .as_f64()
                                                         .unwrap();
    // pH 6.2 y N-P-K bajos: salud < 60, meta en el nivel bajo del potencial.
    assert!(health < 60.0);
    assert_eq!(target, 600.0);
}

#[test]
fn zero_budget_is_flagged_not_defaulted() {
    let mut orch = orchestrator();
    let request = AnalysisRequest { budget_thb: Some(0.0),
                                    ..corn_request() };
    let report = orch.run(&request).unwrap();

    let fertilizer = &report.detailed_analyses["fertilizer"];
    assert_eq!(fertilizer.number("budget_thb").unwrap(), 0.0);
    assert_eq!(fertilizer.get("within_budget").unwrap(), &json!(false));
}

#[test]
fn unknown_crop_halts_after_two_stages() {
    let mut orch = orchestrator();
    let request = AnalysisRequest { target_crop: "Durian".to_string(),
                                    ..corn_request() };
    let err = orch.run(&request).unwrap_err();

    assert!(err.error_title.contains("Crop Biology Expert"));
    assert!(err.message.contains("Durian"));
    let ids: Vec<&str> = err.observations_collected
                            .iter()
                            .map(|o| o.stage_id.as_str())
                            .collect();
    assert_eq!(ids, vec!["soil_series", "soil_chemistry"]);
    assert!(orch.history().is_empty());
}

#[test]
fn missing_planting_date_defaults_to_two_weeks_out() {
    let mut orch = orchestrator();
    let request = AnalysisRequest { planting_date: None,
                                    ..corn_request() };

    // La fecha esperada se toma antes y después por si el día cambia en medio.
    let before = Utc::now().date_naive() + Duration::days(14);
    let report = orch.run(&request).unwrap();
    let after = Utc::now().date_naive() + Duration::days(14);

    let planted = report.detailed_analyses["crop_biology"].get("planting_date")
                                                          .unwrap()
                                                          .as_str()
                                                          .unwrap()
                                                          .parse::<NaiveDate>()
                                                          .unwrap();
    assert!(planted == before || planted == after,
            "planting date defaults to fourteen days from today");
}

#[test]
fn quick_run_report_has_the_same_shape_as_a_full_run() {
    let mut orch = orchestrator();
    let quick = orch.quick_run(6.5, 25.0, 20.0, 120.0, Some("Corn"), 2.0)
                    .expect("quick run must complete");

    let request = AnalysisRequest { target_crop: "Corn".to_string(),
                                    ph: 6.5,
                                    nitrogen: 25.0,
                                    phosphorus: 20.0,
                                    potassium: 120.0,
                                    field_size_rai: 2.0,
                                    ..AnalysisRequest::default() };
    let full = orch.run(&request).expect("full run must complete");

    // El atajo pasa por el mismo pipeline: mismas claves en el reporte y los
    // mismos análisis detallados.
    let quick_keys: Vec<&String> = quick.report.fields.keys().collect();
    let full_keys: Vec<&String> = full.report.fields.keys().collect();
    assert_eq!(quick_keys, full_keys);
    assert_eq!(quick.detailed_analyses.keys().collect::<Vec<_>>(),
               full.detailed_analyses.keys().collect::<Vec<_>>());
    assert_eq!(quick.stages_executed, full.stages_executed);
}

#[test]
fn quick_run_uses_defaults_for_the_rest() {
    let mut orch = orchestrator();
    let report = orch.quick_run(6.5, 25.0, 20.0, 120.0, Some("Riceberry Rice"), 3.0)
                     .expect("quick run must complete");

    assert_eq!(report.stages_executed, 8);
    assert_eq!(report.report.path("project_info.target_crop").unwrap(),
               &json!("Riceberry Rice"));
    assert_eq!(report.report.path("project_info.field_size_rai").unwrap(), &json!(3.0));
    assert_eq!(orch.history().len(), 1);
    assert_eq!(orch.history().recent(1)[0].crop, "Riceberry Rice");
}

#[test]
fn organic_preference_flows_into_prices() {
    let mut orch = orchestrator();
    let request = AnalysisRequest { target_crop: "Riceberry Rice".to_string(),
                                    prefer_organic: true,
                                    planting_date: Some("2026-05-15".to_string()),
                                    ..corn_request() };
    let report = orch.run(&request).unwrap();

    let market = &report.detailed_analyses["market_cost"];
    assert_eq!(market.path("market_analysis.is_organic").unwrap(), &json!(true));
    assert_eq!(market.path("market_analysis.farm_gate_price").unwrap(), &json!(32.5));
}

#[test]
fn repeated_runs_agree_on_stable_fields() {
    let mut orch = orchestrator();
    let request = corn_request();
    let a = orch.run(&request).unwrap();
    let b = orch.run(&request).unwrap();

    assert_ne!(a.session_id, b.session_id);
    assert_eq!(a.pipeline_hash, b.pipeline_hash);
    assert_eq!(a.detailed_analyses["soil_chemistry"].number("health_score"),
               b.detailed_analyses["soil_chemistry"].number("health_score"));
    assert_eq!(a.report.path("executive_summary.overall_score"),
               b.report.path("executive_summary.overall_score"));
    assert_eq!(orch.history().len(), 2);
}
