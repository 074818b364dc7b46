//! Identidad de un run: session id y sample id acuñados al iniciar.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identificadores de una corrida del pipeline.
/// Formatos: `SESSION-<yyyymmddHHMMSS>-<6 hex>` y `SOIL-<yyyymmdd>-<4 hex>`.
#[derive(Debug, Clone)]
pub struct RunSession {
    pub session_id: String,
    pub sample_id: String,
    pub started_at: DateTime<Utc>,
}

impl RunSession {
    pub fn begin() -> Self {
        let now = Utc::now();
        let session_id = format!("SESSION-{}-{}", now.format("%Y%m%d%H%M%S"), short_hex(6));
        let sample_id = format!("SOIL-{}-{}", now.format("%Y%m%d"), short_hex(4));
        Self { session_id,
               sample_id,
               started_at: now }
    }
}

fn short_hex(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_format() {
        let s = RunSession::begin();
        assert!(s.session_id.starts_with("SESSION-"));
        let parts: Vec<&str> = s.session_id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[2], parts[2].to_uppercase());
    }

    #[test]
    fn sample_id_format() {
        let s = RunSession::begin();
        let parts: Vec<&str> = s.sample_id.split('-').collect();
        assert_eq!(parts[0], "SOIL");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 4);
    }

    #[test]
    fn ids_are_unique_across_runs() {
        let a = RunSession::begin();
        let b = RunSession::begin();
        assert_ne!(a.session_id, b.session_id);
        assert_ne!(a.sample_id, b.sample_id);
    }
}
