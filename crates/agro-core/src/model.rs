//! Registros abiertos del pipeline: entrada y salida de stage, resultado,
//! transcript de observaciones, sobre de error y reporte final.
//!
//! Los payloads son JSON abierto (el core no conoce agronomía); `StageOutput`
//! usa `IndexMap` para conservar el orden de inserción en la serialización.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::CONFIG;

/// Clave reservada: todo `StageOutput` exitoso la lleva no vacía.
pub const OBSERVATION_FIELD: &str = "observation";

/// Entrada de un stage: registro JSON plano armado por el wiring.
/// Los stages toleran campos ausentes usando los accesores con default.
#[derive(Debug, Clone, Default)]
pub struct StageInput {
    fields: Map<String, Value>,
}

impl StageInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Texto con default; `null` cuenta como ausente.
    pub fn text(&self, key: &str, default: &str) -> String {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn number(&self, key: &str, default: f64) -> f64 {
        self.fields.get(key).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.fields.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    pub fn opt_number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn opt_text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Salida de un stage: registro abierto con orden de inserción estable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageOutput {
    pub fields: IndexMap<String, Value>,
}

impl StageOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Acceso por ruta con puntos (p. ej. `"yield_targets.target_kg_per_rai"`).
    pub fn path(&self, dotted: &str) -> Option<&Value> {
        let mut parts = dotted.split('.');
        let first = parts.next()?;
        let mut current = self.fields.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn observation(&self) -> Option<&str> {
        self.fields.get(OBSERVATION_FIELD).and_then(Value::as_str)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Resultado de ejecutar un stage.
#[derive(Debug, Clone)]
pub enum StageResult {
    Completed { payload: StageOutput },
    Failed { payload: StageOutput, error_message: String },
}

impl StageResult {
    pub fn success(&self) -> bool {
        matches!(self, StageResult::Completed { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            StageResult::Completed { .. } => None,
            StageResult::Failed { error_message, .. } => Some(error_message),
        }
    }

    pub fn payload(&self) -> &StageOutput {
        match self {
            StageResult::Completed { payload } => payload,
            StageResult::Failed { payload, .. } => payload,
        }
    }

    pub fn into_payload(self) -> StageOutput {
        match self {
            StageResult::Completed { payload } => payload,
            StageResult::Failed { payload, .. } => payload,
        }
    }
}

/// Observación registrada al terminar un stage con éxito.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub stage_id: String,
    pub stage_name: String,
    pub observation: String,
    pub ts: DateTime<Utc>,
}

/// Petición de análisis completa. `Default` toma los valores del entorno
/// (`CONFIG`) y los defaults de campo del sistema original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub location: String,
    pub target_crop: String,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorus: f64,
    pub potassium: f64,
    pub field_size_rai: f64,
    pub texture: String,
    pub lat: f64,
    pub lon: f64,
    pub planting_date: Option<String>,
    pub budget_thb: Option<f64>,
    pub prefer_organic: bool,
    pub irrigation_available: bool,
    pub season: String,
    pub humidity: f64,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self { location: CONFIG.default_location.clone(),
               target_crop: CONFIG.default_crop.clone(),
               ph: 6.5,
               nitrogen: 20.0,
               phosphorus: 15.0,
               potassium: 100.0,
               field_size_rai: 1.0,
               texture: "loam".to_string(),
               lat: 18.0,
               lon: 99.8,
               planting_date: None,
               budget_thb: None,
               prefer_organic: false,
               irrigation_available: true,
               season: "rainy".to_string(),
               humidity: 75.0 }
    }
}

/// Respuesta cuando el pipeline se detiene en el primer fallo.
/// Lleva el transcript parcial acumulado hasta ese stage (sin incluirlo).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error_title: String,
    pub message: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub observations_collected: Vec<ObservationRecord>,
}

impl std::fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_title, self.message)
    }
}

impl std::error::Error for ErrorEnvelope {}

/// Reporte final de un run exitoso: payload del stage terminal enriquecido
/// con metadatos del orquestador y los análisis intermedios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalReport {
    pub report: StageOutput,
    pub session_id: String,
    pub sample_id: String,
    pub pipeline_hash: String,
    pub stages_executed: usize,
    pub observations: Vec<ObservationRecord>,
    pub detailed_analyses: IndexMap<String, StageOutput>,
}
