//! Tipos del conocimiento agronómico: series de suelo, requerimientos de
//! cultivo, fertilizantes, clima mensual, precios y plantillas de costos.
//!
//! Todos se deserializan desde `master_data.json` embebido; los structs son
//! el contrato estable que consumen los stages.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Rango numérico cerrado (min..=max).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureComposition {
    pub sand: f64,
    pub silt: f64,
    pub clay: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypicalProperties {
    pub ph_range: Range,
    pub organic_matter_percent: f64,
}

/// Serie de suelo reconocida en la provincia.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilSeries {
    pub series_code: String,
    pub description: String,
    pub texture: String,
    pub texture_composition: TextureComposition,
    pub drainage: String,
    pub water_holding_capacity: String,
    pub cec_meq_100g: f64,
    pub suitable_crops: Vec<String>,
    pub limitations: Vec<String>,
    pub location_areas: Vec<String>,
    pub typical_properties: TypicalProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthStage {
    pub days: u32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct YieldPotential {
    pub low: f64,
    pub average: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NutrientRange {
    pub minimum: f64,
    pub optimal: f64,
    pub maximum: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutrientRequirements {
    pub nitrogen: NutrientRange,
    pub phosphorus_p2o5: NutrientRange,
    pub potassium_k2o: NutrientRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilRequirements {
    pub ph_optimal: Range,
    pub preferred_textures: Vec<String>,
    pub tolerates_flooding: bool,
}

/// Requerimientos completos de un cultivo.
/// `growth_stages` conserva el orden del JSON (orden fenológico).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropRequirements {
    pub scientific_name: String,
    pub growth_cycle_days: u32,
    pub growth_stages: IndexMap<String, GrowthStage>,
    pub water_requirement_mm: f64,
    pub yield_potential_kg_per_rai: YieldPotential,
    pub nutrient_requirements_kg_per_rai: NutrientRequirements,
    pub soil_requirements: SoilRequirements,
    pub special_notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FertilizerKind {
    Compound,
    Nitrogen,
    Phosphorus,
    Potassium,
    Organic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fertilizer {
    pub id: String,
    pub name: String,
    pub formula: String,
    pub kind: FertilizerKind,
    pub price_thb_per_kg: f64,
    pub notes: String,
}

impl Fertilizer {
    pub fn is_organic(&self) -> bool {
        self.kind == FertilizerKind::Organic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    CoolDry,
    HotDry,
    Rainy,
}

impl Season {
    pub fn is_rainy(&self) -> bool {
        matches!(self, Season::Rainy)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::CoolDry => "cool dry season",
            Season::HotDry => "hot dry season",
            Season::Rainy => "rainy season",
        }
    }
}

/// Normales climáticas de un mes calendario.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonthlyClimate {
    pub temp_min: f64,
    pub temp_max: f64,
    pub rainfall_mm: f64,
    pub humidity: f64,
    pub season: Season,
}

impl MonthlyClimate {
    pub fn mean_temp(&self) -> f64 {
        (self.temp_min + self.temp_max) / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimateTable {
    pub station: String,
    pub monthly: IndexMap<String, MonthlyClimate>,
}

impl ClimateTable {
    /// Mes calendario 1..=12; fuera de rango devuelve None.
    pub fn month(&self, month: u32) -> Option<&MonthlyClimate> {
        self.monthly.get(month.to_string().as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPrice {
    pub farm_gate: f64,
    pub wholesale: f64,
    pub retail: f64,
    pub organic_premium: f64,
    pub trend: String,
}

/// Costos de producción de referencia en THB por rai.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostTemplate {
    pub land_prep: f64,
    pub seeds: f64,
    pub fertilizer: f64,
    pub pesticide: f64,
    pub water: f64,
    pub labor: f64,
    pub harvest: f64,
    pub transport: f64,
}

impl CostTemplate {
    /// Partidas en orden estable para el desglose de costos.
    pub fn items(&self) -> [(&'static str, f64); 8] {
        [("land_prep", self.land_prep),
         ("seeds", self.seeds),
         ("fertilizer", self.fertilizer),
         ("pesticide", self.pesticide),
         ("water", self.water),
         ("labor", self.labor),
         ("harvest", self.harvest),
         ("transport", self.transport)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PestEntry {
    pub name: String,
    pub risk: RiskLevel,
    pub season: String,
    pub prevention: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseEntry {
    pub name: String,
    pub risk: RiskLevel,
    pub condition: String,
    pub prevention: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PestProfile {
    pub pests: Vec<PestEntry>,
    pub diseases: Vec<DiseaseEntry>,
}
