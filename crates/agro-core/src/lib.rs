//! Núcleo del pipeline agronómico: contrato de stage, wiring declarativo,
//! orquestador stop-on-failure, identidad de run e historial.
//!
//! Este crate no conoce agronomía: los payloads son JSON abierto y los
//! stages concretos viven en `agro-agents`.

pub mod config;
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod history;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod session;
pub mod stage;
pub mod wiring;

pub use config::{init_dotenv, PipelineConfig, CONFIG};
pub use errors::{PipelineError, StageError};
pub use history::{HistoryEntry, InMemoryRunHistory, RunHistory};
pub use model::{AnalysisRequest, ErrorEnvelope, FinalReport, ObservationRecord, StageInput,
                StageOutput, StageResult, OBSERVATION_FIELD};
pub use orchestrator::Orchestrator;
pub use pipeline::{build_pipeline_definition, PipelineDefinition};
pub use session::RunSession;
pub use stage::{Stage, StageLogic};
pub use wiring::{build_stage_input, FieldProjection, StageWiring, WHOLE_PAYLOAD};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    // Stage de prueba: emite un payload fijo y cuenta invocaciones.
    struct EmitStage {
        id: &'static str,
        payload: serde_json::Value,
        calls: Rc<Cell<u32>>,
    }

    impl Stage for EmitStage {
        fn id(&self) -> &str {
            self.id
        }

        fn process(&self, _input: &StageInput) -> StageResult {
            self.calls.set(self.calls.get() + 1);
            let mut payload = StageOutput::new();
            if let Some(map) = self.payload.as_object() {
                for (k, v) in map {
                    payload.set(k.clone(), v.clone());
                }
            }
            payload.set(OBSERVATION_FIELD, json!(format!("{} done", self.id)));
            StageResult::Completed { payload }
        }
    }

    struct FailStage {
        id: &'static str,
        calls: Rc<Cell<u32>>,
    }

    impl Stage for FailStage {
        fn id(&self) -> &str {
            self.id
        }

        fn process(&self, _input: &StageInput) -> StageResult {
            self.calls.set(self.calls.get() + 1);
            StageResult::Failed { payload: StageOutput::new(),
                                  error_message: "boom".to_string() }
        }
    }

    fn emit(id: &'static str, payload: serde_json::Value) -> (Box<dyn Stage>, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        (Box::new(EmitStage { id, payload, calls: calls.clone() }), calls)
    }

    #[test]
    fn definition_rejects_empty_pipeline() {
        let err = build_pipeline_definition(vec![], vec![]).unwrap_err();
        assert_eq!(err, PipelineError::EmptyPipeline);
    }

    #[test]
    fn definition_rejects_duplicate_ids() {
        let (a, _) = emit("dup", json!({}));
        let (b, _) = emit("dup", json!({}));
        let wiring = vec![StageWiring::new("dup"), StageWiring::new("dup")];
        let err = build_pipeline_definition(vec![a, b], wiring).unwrap_err();
        assert_eq!(err, PipelineError::DuplicateStageId("dup".to_string()));
    }

    #[test]
    fn definition_rejects_wiring_count_mismatch() {
        let (a, _) = emit("one", json!({}));
        let err = build_pipeline_definition(vec![a], vec![]).unwrap_err();
        assert_eq!(err, PipelineError::WiringMismatch { stages: 1, wirings: 0 });
    }

    #[test]
    fn definition_rejects_forward_projection() {
        let (a, _) = emit("first", json!({}));
        let (b, _) = emit("second", json!({}));
        let wiring = vec![StageWiring::new("first").project("second", "x", "x"),
                          StageWiring::new("second")];
        let err = build_pipeline_definition(vec![a, b], wiring).unwrap_err();
        assert!(matches!(err, PipelineError::ForwardProjection { .. }));
    }

    #[test]
    fn definition_hash_is_stable_for_same_shape() {
        let build = || {
            let (a, _) = emit("first", json!({}));
            let (b, _) = emit("second", json!({}));
            let wiring = vec![StageWiring::new("first").request_fields(&["ph"]),
                              StageWiring::new("second").project("first", "x", "y")];
            build_pipeline_definition(vec![a, b], wiring).unwrap()
        };
        assert_eq!(build().definition_hash, build().definition_hash);
    }

    #[test]
    fn run_halts_on_first_failure() {
        let (first, first_calls) = emit("first", json!({"x": 1}));
        let fail_calls = Rc::new(Cell::new(0));
        let failing: Box<dyn Stage> = Box::new(FailStage { id: "second",
                                                           calls: fail_calls.clone() });
        let (third, third_calls) = emit("third", json!({}));
        let wiring = vec![StageWiring::new("first"),
                          StageWiring::new("second"),
                          StageWiring::new("third")];
        let def = build_pipeline_definition(vec![first, failing, third], wiring).unwrap();
        let mut orch = Orchestrator::new(def, InMemoryRunHistory::new());

        let err = orch.run(&AnalysisRequest::default()).unwrap_err();

        assert_eq!(first_calls.get(), 1);
        assert_eq!(fail_calls.get(), 1);
        assert_eq!(third_calls.get(), 0, "downstream stage must not run");
        assert_eq!(err.message, "boom");
        // El transcript parcial trae solo los stages completados.
        assert_eq!(err.observations_collected.len(), 1);
        assert_eq!(err.observations_collected[0].stage_id, "first");
        assert!(orch.history().is_empty(), "failed runs are not persisted");
    }

    #[test]
    fn run_collects_transcript_in_order_and_saves_history() {
        let (a, _) = emit("alpha", json!({"score": 10}));
        let (b, _) = emit("beta", json!({"score": 20}));
        let (c, _) = emit("gamma", json!({"verdict": "ok"}));
        let wiring = vec![StageWiring::new("alpha"),
                          StageWiring::new("beta"),
                          StageWiring::new("gamma")];
        let def = build_pipeline_definition(vec![a, b, c], wiring).unwrap();
        let mut orch = Orchestrator::new(def, InMemoryRunHistory::new());

        let report = orch.run(&AnalysisRequest::default()).unwrap();

        assert_eq!(report.stages_executed, 3);
        let ids: Vec<&str> = report.observations.iter().map(|o| o.stage_id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "beta", "gamma"]);
        // El payload terminal sale como reporte, no como análisis detallado.
        assert_eq!(report.report.get("verdict"), Some(&json!("ok")));
        assert_eq!(report.detailed_analyses.len(), 2);
        assert!(report.detailed_analyses.contains_key("alpha"));
        assert!(!report.detailed_analyses.contains_key("gamma"));
        assert!(report.session_id.starts_with("SESSION-"));
        assert!(!report.pipeline_hash.is_empty());
        assert_eq!(orch.history().len(), 1);
    }

    #[test]
    fn wiring_projects_dotted_paths_and_whole_payload() {
        let mut outputs = indexmap::IndexMap::new();
        let mut upstream = StageOutput::new();
        upstream.set("nested", json!({"inner": {"value": 42}}));
        upstream.set("plain", json!("hello"));
        outputs.insert("up".to_string(), upstream);

        let wiring = StageWiring::new("down").project("up", "nested.inner.value", "picked")
                                             .project("up", WHOLE_PAYLOAD, "full")
                                             .project("up", "missing.path", "absent");
        let request = serde_json::Map::new();
        let input = build_stage_input(&wiring, &request, &outputs, &[]);

        assert_eq!(input.value("picked"), Some(&json!(42)));
        assert!(input.value("full").and_then(|v| v.get("plain")).is_some());
        assert!(!input.contains("absent"), "missing paths are omitted");
    }

    #[test]
    fn wiring_skips_null_request_fields() {
        let wiring = StageWiring::new("s").request_fields(&["ph", "budget_thb", "ghost"]);
        let mut request = serde_json::Map::new();
        request.insert("ph".to_string(), json!(6.2));
        request.insert("budget_thb".to_string(), serde_json::Value::Null);
        let input = build_stage_input(&wiring, &request, &indexmap::IndexMap::new(), &[]);

        assert_eq!(input.number("ph", 0.0), 6.2);
        assert!(!input.contains("budget_thb"), "null counts as absent");
        assert!(!input.contains("ghost"));
    }

    #[test]
    fn wiring_includes_transcript_when_requested() {
        let wiring = StageWiring::new("s").with_transcript();
        let transcript = vec![ObservationRecord { stage_id: "a".to_string(),
                                                  stage_name: "a".to_string(),
                                                  observation: "first note".to_string(),
                                                  ts: chrono::Utc::now() }];
        let input = build_stage_input(&wiring,
                                      &serde_json::Map::new(),
                                      &indexmap::IndexMap::new(),
                                      &transcript);
        let obs = input.value("all_observations").unwrap();
        assert_eq!(obs.as_array().unwrap().len(), 1);
        assert_eq!(obs[0]["observation"], json!("first note"));
    }

    // StageLogic: la observación por defecto se sintetiza cuando falta.
    struct BareLogic;

    impl StageLogic for BareLogic {
        fn id(&self) -> &'static str {
            "bare"
        }

        fn display_name(&self) -> &str {
            "Bare Analysis"
        }

        fn execute(&self, _input: &StageInput) -> Result<StageOutput, StageError> {
            let mut out = StageOutput::new();
            out.set("value", json!(7));
            Ok(out)
        }
    }

    struct ErrLogic;

    impl StageLogic for ErrLogic {
        fn id(&self) -> &'static str {
            "err"
        }

        fn execute(&self, _input: &StageInput) -> Result<StageOutput, StageError> {
            Err(StageError::InvalidInput("missing sample".to_string()))
        }
    }

    #[test]
    fn stage_logic_synthesizes_default_observation() {
        let result = Stage::process(&BareLogic, &StageInput::new());
        assert!(result.success());
        let payload = result.payload();
        assert_eq!(payload.observation(), Some("Bare Analysis: analysis complete"));
        assert_eq!(payload.get("stage_name"), Some(&json!("bare")));
        assert!(payload.number("processing_time_sec").is_some());
    }

    #[test]
    fn stage_logic_captures_error_into_failed_result() {
        let result = Stage::process(&ErrLogic, &StageInput::new());
        assert!(!result.success());
        assert_eq!(result.error_message(), Some("invalid input: missing sample"));
        assert!(result.payload().observation().unwrap().contains("analysis failed"));
    }

    #[test]
    fn stage_input_accessors_apply_defaults() {
        let mut input = StageInput::new();
        input.set("ph", json!(5.8));
        input.set("label", json!("clay"));
        input.set("flagged", json!(true));
        input.set("nil", serde_json::Value::Null);

        assert_eq!(input.number("ph", 6.5), 5.8);
        assert_eq!(input.number("missing", 6.5), 6.5);
        assert_eq!(input.text("label", "loam"), "clay");
        assert_eq!(input.text("nil", "loam"), "loam");
        assert!(input.flag("flagged", false));
        assert_eq!(input.opt_number("missing"), None);
    }

    #[test]
    fn quick_run_routes_through_full_pipeline() {
        let (a, a_calls) = emit("only", json!({"verdict": "fine"}));
        let def = build_pipeline_definition(vec![a], vec![StageWiring::new("only")]).unwrap();
        let mut orch = Orchestrator::new(def, InMemoryRunHistory::new());

        let report = orch.quick_run(6.0, 25.0, 12.0, 80.0, Some("Corn"), 2.5).unwrap();

        assert_eq!(a_calls.get(), 1);
        assert_eq!(report.stages_executed, 1);
        assert_eq!(orch.history().len(), 1);
        assert_eq!(orch.history().recent(1)[0].crop, "Corn");
        assert_eq!(orch.history().recent(1)[0].field_size_rai, 2.5);
    }
}
