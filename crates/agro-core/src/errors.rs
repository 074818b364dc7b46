//! Errores específicos del core (simples por ahora).

use thiserror::Error;

/// Fallo terminal de un stage. El wrapper `process` lo captura y lo convierte
/// en `StageResult::Failed`; nunca escapa como panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("domain: {0}")] Domain(String),
    #[error("invalid input: {0}")] InvalidInput(String),
    #[error("internal: {0}")] Internal(String),
}

impl StageError {
    /// Adaptador para errores de dominio de otros crates.
    pub fn domain(e: impl std::fmt::Display) -> Self {
        StageError::Domain(e.to_string())
    }
}

impl From<serde_json::Error> for StageError {
    fn from(e: serde_json::Error) -> Self {
        StageError::Internal(e.to_string())
    }
}

/// Errores al construir una definición de pipeline.
///
/// `Display`/`Error` se implementan a mano porque thiserror trataría el campo
/// `source` de `ForwardProjection` como fuente de error, y es un `String`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    EmptyPipeline,
    DuplicateStageId(String),
    WiringMismatch { stages: usize, wirings: usize },
    WiringOutOfOrder { index: usize, wiring: String, stage: String },
    ForwardProjection { stage: String, source: String },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::EmptyPipeline => write!(f, "pipeline has no stages"),
            PipelineError::DuplicateStageId(id) => write!(f, "duplicate stage id: {id}"),
            PipelineError::WiringMismatch { stages, wirings } => {
                write!(f, "wiring count {wirings} does not match stage count {stages}")
            }
            PipelineError::WiringOutOfOrder { index, wiring, stage } => {
                write!(f, "wiring at position {index} is for '{wiring}' but stage is '{stage}'")
            }
            PipelineError::ForwardProjection { stage, source } => {
                write!(f, "stage '{stage}' projects from '{source}', which does not run earlier")
            }
        }
    }
}

impl std::error::Error for PipelineError {}
