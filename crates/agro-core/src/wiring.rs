//! Tabla de wiring declarativa: qué campos de la petición y qué proyecciones
//! de stages anteriores recibe cada stage.
//!
//! Reemplaza la construcción manual de inputs por stage: una proyección es
//! `(stage origen, campo origen, campo destino)`, donde el campo origen
//! admite rutas con puntos y `"*"` significa el payload completo. Campos
//! ausentes en el origen simplemente se omiten (los stages tienen defaults).

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::{ObservationRecord, StageInput, StageOutput};

/// Proyección del campo origen completo.
pub const WHOLE_PAYLOAD: &str = "*";

#[derive(Debug, Clone, Serialize)]
pub struct FieldProjection {
    pub source_stage: String,
    pub source_field: String,
    pub target_field: String,
}

impl FieldProjection {
    pub fn new(source_stage: &str, source_field: &str, target_field: &str) -> Self {
        Self { source_stage: source_stage.to_string(),
               source_field: source_field.to_string(),
               target_field: target_field.to_string() }
    }
}

/// Wiring de un stage: campos copiados de la petición, proyecciones de
/// salidas anteriores y si recibe el transcript acumulado.
#[derive(Debug, Clone, Serialize)]
pub struct StageWiring {
    pub stage_id: String,
    pub request_fields: Vec<String>,
    pub projections: Vec<FieldProjection>,
    pub include_transcript: bool,
}

impl StageWiring {
    pub fn new(stage_id: &str) -> Self {
        Self { stage_id: stage_id.to_string(),
               request_fields: Vec::new(),
               projections: Vec::new(),
               include_transcript: false }
    }

    pub fn request_fields(mut self, fields: &[&str]) -> Self {
        self.request_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn project(mut self, source_stage: &str, source_field: &str, target_field: &str) -> Self {
        self.projections
            .push(FieldProjection::new(source_stage, source_field, target_field));
        self
    }

    pub fn with_transcript(mut self) -> Self {
        self.include_transcript = true;
        self
    }
}

/// Arma el input de un stage a partir de su wiring.
/// `null` en la petición cuenta como ausente (el stage usará su default).
pub fn build_stage_input(wiring: &StageWiring,
                         request: &Map<String, Value>,
                         outputs: &IndexMap<String, StageOutput>,
                         transcript: &[ObservationRecord])
                         -> StageInput {
    let mut input = StageInput::new();

    for field in &wiring.request_fields {
        if let Some(v) = request.get(field) {
            if !v.is_null() {
                input.set(field.clone(), v.clone());
            }
        }
    }

    for proj in &wiring.projections {
        let Some(source) = outputs.get(proj.source_stage.as_str()) else {
            continue;
        };
        if proj.source_field == WHOLE_PAYLOAD {
            if let Ok(v) = serde_json::to_value(source) {
                input.set(proj.target_field.clone(), v);
            }
        } else if let Some(v) = source.path(&proj.source_field) {
            input.set(proj.target_field.clone(), v.clone());
        }
    }

    if wiring.include_transcript {
        if let Ok(v) = serde_json::to_value(transcript) {
            input.set("all_observations", v);
        }
    }

    input
}
