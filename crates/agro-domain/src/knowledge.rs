//! Base de conocimiento embebida: se parsea una sola vez (`Lazy`) desde
//! `data/master_data.json` y se expone como referencia estática.
//!
//! Invariante: el cultivo de referencia (`REFERENCE_CROP`) siempre existe en
//! el JSON; los catálogos con fallback (plagas, mercado, costos) dependen de
//! él.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::errors::DomainError;
use crate::types::{ClimateTable, CostTemplate, CropRequirements, Fertilizer, FertilizerKind,
                   MarketPrice, MonthlyClimate, PestProfile, SoilSeries};

const MASTER_DATA: &str = include_str!("../data/master_data.json");

/// Cultivo usado como fallback por los catálogos de plagas/mercado/costos.
pub const REFERENCE_CROP: &str = "Corn";

/// Localidad climática por defecto.
pub const DEFAULT_CLIMATE_LOCATION: &str = "phrae_province";

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub version: String,
    pub last_updated: String,
    pub coverage: String,
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeBase {
    pub metadata: Metadata,
    pub soil_series: IndexMap<String, SoilSeries>,
    pub crop_requirements: IndexMap<String, CropRequirements>,
    pub fertilizers: Vec<Fertilizer>,
    pub climate: IndexMap<String, ClimateTable>,
    pub market_prices: IndexMap<String, MarketPrice>,
    pub cost_templates: IndexMap<String, CostTemplate>,
    pub pest_catalog: IndexMap<String, PestProfile>,
}

static KNOWLEDGE: Lazy<KnowledgeBase> = Lazy::new(|| {
    let kb: KnowledgeBase =
        serde_json::from_str(MASTER_DATA).expect("embedded master_data.json must parse");
    let summary = kb.validate();
    log::info!(target: "agro::knowledge",
               "knowledge base v{} loaded: {} soil series, {} crops, {} fertilizers",
               kb.metadata.version, summary.soil_series, summary.crops, summary.fertilizers);
    for w in &summary.warnings {
        log::warn!(target: "agro::knowledge", "{w}");
    }
    kb
});

/// Acceso global a la base de conocimiento (carga perezosa).
pub fn knowledge() -> &'static KnowledgeBase {
    &KNOWLEDGE
}

/// Resumen de validación calculado al cargar.
#[derive(Debug, Clone)]
pub struct ValidationSummary {
    pub soil_series: usize,
    pub crops: usize,
    pub fertilizers: usize,
    pub warnings: Vec<String>,
}

impl KnowledgeBase {
    pub fn crop(&self, name: &str) -> Result<&CropRequirements, DomainError> {
        self.crop_requirements
            .get(name)
            .ok_or_else(|| DomainError::UnknownCrop(name.to_string()))
    }

    pub fn soil_series(&self, name: &str) -> Result<&SoilSeries, DomainError> {
        self.soil_series
            .get(name)
            .ok_or_else(|| DomainError::UnknownSoilSeries(name.to_string()))
    }

    pub fn soil_series_iter(&self) -> impl Iterator<Item = (&String, &SoilSeries)> {
        self.soil_series.iter()
    }

    pub fn fertilizer_by_formula(&self, formula: &str) -> Option<&Fertilizer> {
        self.fertilizers.iter().find(|f| f.formula == formula)
    }

    pub fn fertilizers_of_kind(&self, kind: FertilizerKind) -> impl Iterator<Item = &Fertilizer> {
        self.fertilizers.iter().filter(move |f| f.kind == kind)
    }

    pub fn organic_fertilizers(&self) -> impl Iterator<Item = &Fertilizer> {
        self.fertilizers.iter().filter(|f| f.is_organic())
    }

    pub fn chemical_fertilizers(&self) -> impl Iterator<Item = &Fertilizer> {
        self.fertilizers.iter().filter(|f| !f.is_organic())
    }

    /// Normales del mes 1..=12 para la localidad por defecto.
    pub fn monthly_climate(&self, month: u32) -> Option<&MonthlyClimate> {
        self.climate
            .get(DEFAULT_CLIMATE_LOCATION)
            .and_then(|t| t.month(month))
    }

    /// Precio de mercado con fallback al cultivo de referencia.
    pub fn market_price(&self, crop: &str) -> Option<&MarketPrice> {
        self.market_prices
            .get(crop)
            .or_else(|| self.market_prices.get(REFERENCE_CROP))
    }

    /// Plantilla de costos con fallback al cultivo de referencia.
    pub fn cost_template(&self, crop: &str) -> Option<&CostTemplate> {
        self.cost_templates
            .get(crop)
            .or_else(|| self.cost_templates.get(REFERENCE_CROP))
    }

    /// Catálogo de plagas/enfermedades con fallback al cultivo de referencia.
    pub fn pest_profile(&self, crop: &str) -> Option<&PestProfile> {
        self.pest_catalog
            .get(crop)
            .or_else(|| self.pest_catalog.get(REFERENCE_CROP))
    }

    pub fn validate(&self) -> ValidationSummary {
        let mut warnings = Vec::new();

        if !self.crop_requirements.contains_key(REFERENCE_CROP) {
            warnings.push(format!("reference crop '{REFERENCE_CROP}' missing from crop_requirements"));
        }
        for formula in ["16-20-0", "15-15-15", "46-0-0", "0-0-60"] {
            if self.fertilizer_by_formula(formula).is_none() {
                warnings.push(format!("fertilizer formula '{formula}' missing from catalog"));
            }
        }
        for (name, series) in &self.soil_series {
            for crop in &series.suitable_crops {
                if !self.crop_requirements.contains_key(crop) && crop != REFERENCE_CROP {
                    // Cultivos citados sin ficha propia: informativo, no fatal.
                    warnings.push(format!("soil series '{name}' lists crop '{crop}' without requirements entry"));
                }
            }
        }
        if let Some(table) = self.climate.get(DEFAULT_CLIMATE_LOCATION) {
            for m in 1..=12u32 {
                if table.month(m).is_none() {
                    warnings.push(format!("climate table missing month {m}"));
                }
            }
        } else {
            warnings.push(format!("climate location '{DEFAULT_CLIMATE_LOCATION}' missing"));
        }

        ValidationSummary { soil_series: self.soil_series.len(),
                            crops: self.crop_requirements.len(),
                            fertilizers: self.fertilizers.len(),
                            warnings }
    }
}
