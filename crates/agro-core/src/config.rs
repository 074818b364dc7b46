//! Carga de configuración desde variables de entorno.
//! Defaults del sistema: techo de presupuesto 15000 THB, localización y
//! cultivo por defecto para `quick_run`.

use std::env;
use once_cell::sync::Lazy;
use dotenvy::dotenv;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Presupuesto de fertilizante asumido cuando la petición no trae uno.
    pub default_budget_thb: f64,
    pub default_location: String,
    pub default_crop: String,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Lazy::force(&DOTENV_LOADED);
        let default_budget_thb = env::var("AGRO_DEFAULT_BUDGET_THB").ok()
            .and_then(|v| v.parse().ok()).unwrap_or(15_000.0);
        let default_location = env::var("AGRO_DEFAULT_LOCATION").ok()
            .unwrap_or_else(|| "Phrae Province".to_string());
        let default_crop = env::var("AGRO_DEFAULT_CROP").ok()
            .unwrap_or_else(|| "Riceberry Rice".to_string());
        Self { default_budget_thb, default_location, default_crop }
    }
}

/// Instancia global perezosa de configuración, evaluada una sola vez.
pub static CONFIG: Lazy<PipelineConfig> = Lazy::new(PipelineConfig::from_env);

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
