//! Errores del dominio agronómico.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown crop: {0}")]
    UnknownCrop(String),

    #[error("unknown soil series: {0}")]
    UnknownSoilSeries(String),
}
