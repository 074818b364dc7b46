//! Historial de corridas: trait de persistencia mínima + impl en memoria.
//! La frontera queda en el trait; un backend real es responsabilidad de otro
//! crate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    pub location: String,
    pub crop: String,
    pub field_size_rai: f64,
    pub report: Value,
    pub created_at: DateTime<Utc>,
}

/// Almacenamiento append-only de reportes finales.
pub trait RunHistory {
    /// Guarda un reporte y devuelve el id asignado.
    fn save(&mut self, location: &str, crop: &str, field_size_rai: f64, report: Value) -> u64;

    /// Últimas `limit` entradas, de la más reciente a la más antigua.
    fn recent(&self, limit: usize) -> Vec<&HistoryEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
pub struct InMemoryRunHistory {
    entries: Vec<HistoryEntry>,
    next_id: u64,
}

impl InMemoryRunHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunHistory for InMemoryRunHistory {
    fn save(&mut self, location: &str, crop: &str, field_size_rai: f64, report: Value) -> u64 {
        self.next_id += 1;
        let entry = HistoryEntry { id: self.next_id,
                                   location: location.to_string(),
                                   crop: crop.to_string(),
                                   field_size_rai,
                                   report,
                                   created_at: Utc::now() };
        self.entries.push(entry);
        self.next_id
    }

    fn recent(&self, limit: usize) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(limit).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
