//! Contrato de stage y capa tipada `StageLogic`.
//!
//! `Stage` es la interfaz neutra que consume el orquestador. `StageLogic` es
//! la interfaz de alto nivel para implementar stages: se escribe `execute`
//! devolviendo `Result`, y el adaptador blanket de abajo aporta la mecánica
//! común (cronometraje, observación por defecto, captura del error).

use serde_json::json;
use std::time::Instant;

use crate::errors::StageError;
use crate::model::{StageInput, StageOutput, StageResult, OBSERVATION_FIELD};

/// Interfaz neutra de un stage del pipeline.
pub trait Stage {
    /// Identificador estable y único dentro del pipeline.
    fn id(&self) -> &str;

    /// Nombre amigable para logs y mensajes de error.
    fn display_name(&self) -> &str {
        self.id()
    }

    /// Ejecuta el stage. Nunca debe panicar: todo fallo se reporta como
    /// `StageResult::Failed`.
    fn process(&self, input: &StageInput) -> StageResult;
}

/// Interfaz de alto nivel: lógica pura del stage, sin mecánica común.
pub trait StageLogic {
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &str {
        self.id()
    }

    /// Lógica del stage. Campos ausentes en el input se toleran con defaults;
    /// un `Err` detiene el pipeline (stop-on-failure).
    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError>;
}

// -------------------------------------------------------------
// Adaptador: cualquier `StageLogic` implementa `Stage` neutro.
// -------------------------------------------------------------
impl<T> Stage for T where T: StageLogic
{
    fn id(&self) -> &str {
        StageLogic::id(self)
    }

    fn display_name(&self) -> &str {
        StageLogic::display_name(self)
    }

    fn process(&self, input: &StageInput) -> StageResult {
        let started = Instant::now();

        match self.execute(input) {
            Ok(mut payload) => {
                // Garantiza observación no vacía en toda salida exitosa.
                if payload.observation().map_or(true, |o| o.trim().is_empty()) {
                    payload.set(OBSERVATION_FIELD,
                                json!(format!("{}: analysis complete", self.display_name())));
                }
                payload.set("stage_name", json!(StageLogic::id(self)));
                payload.set("processing_time_sec", json!(started.elapsed().as_secs_f64()));
                StageResult::Completed { payload }
            }
            Err(e) => {
                log::error!(target: "agro::stage", "[{}] failed: {e}", StageLogic::id(self));
                let mut payload = StageOutput::new();
                payload.set("error", json!(e.to_string()));
                payload.set("stage_name", json!(StageLogic::id(self)));
                payload.set(OBSERVATION_FIELD,
                            json!(format!("{}: analysis failed: {e}", self.display_name())));
                payload.set("processing_time_sec", json!(started.elapsed().as_secs_f64()));
                StageResult::Failed { payload, error_message: e.to_string() }
            }
        }
    }
}
