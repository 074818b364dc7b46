//! Constantes globales del motor.

/// Versión lógica del motor: entra en el fingerprint de la definición.
pub const ENGINE_VERSION: u32 = 1;
