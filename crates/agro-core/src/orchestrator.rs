//! Orquestador secuencial: ejecuta los stages en orden, arma inputs vía
//! wiring, acumula el transcript y se detiene en el primer fallo.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use chrono::Utc;

use crate::config::CONFIG;
use crate::history::RunHistory;
use crate::model::{AnalysisRequest, ErrorEnvelope, FinalReport, ObservationRecord, StageOutput,
                   StageResult};
use crate::pipeline::PipelineDefinition;
use crate::session::RunSession;
use crate::wiring::build_stage_input;

pub struct Orchestrator<H: RunHistory> {
    definition: PipelineDefinition,
    history: H,
}

impl<H: RunHistory> Orchestrator<H> {
    pub fn new(definition: PipelineDefinition, history: H) -> Self {
        Self { definition, history }
    }

    pub fn definition(&self) -> &PipelineDefinition {
        &self.definition
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Corre el pipeline completo para una petición.
    ///
    /// Stop-on-failure: el primer stage fallido corta la corrida y devuelve
    /// un `ErrorEnvelope` con el transcript parcial (sin el stage fallido).
    /// El payload del último stage es el reporte; el resto queda como
    /// análisis detallado.
    pub fn run(&mut self, request: &AnalysisRequest) -> Result<FinalReport, ErrorEnvelope> {
        let session = RunSession::begin();
        let total = self.definition.len();

        log::info!(target: "agro::pipeline",
                   "run {} started: crop='{}' location='{}' ({} stages)",
                   session.session_id, request.target_crop, request.location, total);

        let request_map = request_to_map(request);
        let mut outputs: IndexMap<String, StageOutput> = IndexMap::new();
        let mut transcript: Vec<ObservationRecord> = Vec::new();

        for (idx, stage) in self.definition.stages.iter().enumerate() {
            let wiring = &self.definition.wiring[idx];
            let mut input = build_stage_input(wiring, &request_map, &outputs, &transcript);
            input.set("request_id",
                      json!(format!("{}-{}", session.session_id, stage.id().to_uppercase())));
            input.set("session_id", json!(session.session_id));
            input.set("sample_id", json!(session.sample_id));

            log::info!(target: "agro::pipeline",
                       "[OK {}] -> [>> {}] -> [-- {}]",
                       idx, stage.display_name(), total - idx - 1);

            match stage.process(&input) {
                StageResult::Completed { payload } => {
                    let observation = payload.observation().unwrap_or_default().to_string();
                    transcript.push(ObservationRecord { stage_id: stage.id().to_string(),
                                                        stage_name: stage.display_name()
                                                                         .to_string(),
                                                        observation,
                                                        ts: Utc::now() });
                    outputs.insert(stage.id().to_string(), payload);
                }
                StageResult::Failed { error_message, .. } => {
                    log::warn!(target: "agro::pipeline",
                               "run {} halted at '{}': {}",
                               session.session_id, stage.id(), error_message);
                    return Err(ErrorEnvelope { error_title: format!("{} failed",
                                                                    stage.display_name()),
                                               message: error_message,
                                               session_id: session.session_id,
                                               timestamp: Utc::now(),
                                               observations_collected: transcript });
                }
            }
        }

        // Último stage = reporte; los demás quedan como análisis detallado.
        let (_, report) = outputs.shift_remove_index(outputs.len() - 1)
                                 .unwrap_or_default();
        let final_report = FinalReport { report,
                                         session_id: session.session_id.clone(),
                                         sample_id: session.sample_id,
                                         pipeline_hash: self.definition
                                                            .definition_hash
                                                            .clone(),
                                         stages_executed: total,
                                         observations: transcript,
                                         detailed_analyses: outputs };

        if let Ok(serialized) = serde_json::to_value(&final_report) {
            self.history.save(&request.location,
                              &request.target_crop,
                              request.field_size_rai,
                              serialized);
        }

        log::info!(target: "agro::pipeline",
                   "run {} completed ({} stages)", session.session_id, total);
        Ok(final_report)
    }

    /// Atajo con datos mínimos de suelo: el resto sale de los defaults
    /// del sistema (`CONFIG` incluido).
    pub fn quick_run(&mut self,
                     ph: f64,
                     nitrogen: f64,
                     phosphorus: f64,
                     potassium: f64,
                     crop: Option<&str>,
                     field_size_rai: f64)
                     -> Result<FinalReport, ErrorEnvelope> {
        let request = AnalysisRequest { ph,
                                        nitrogen,
                                        phosphorus,
                                        potassium,
                                        target_crop: crop.map(str::to_string)
                                                         .unwrap_or_else(|| {
                                                             CONFIG.default_crop.clone()
                                                         }),
                                        field_size_rai,
                                        ..AnalysisRequest::default() };
        self.run(&request)
    }
}

fn request_to_map(request: &AnalysisRequest) -> Map<String, Value> {
    match serde_json::to_value(request) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
