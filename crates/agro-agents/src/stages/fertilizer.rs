//! Stage 6: fórmula de fertilización. Calcula brechas de nutrientes contra el
//! óptimo del cultivo, selecciona productos del catálogo, arma el calendario
//! de aplicación y chequea el presupuesto.

use serde_json::{json, Value};

use agro_core::{StageError, StageInput, StageLogic, StageOutput, CONFIG};
use agro_domain::{knowledge, Fertilizer};

// Disponibilidad asumida del nutriente del suelo para el cultivo.
const N_AVAILABILITY: f64 = 0.30;
const P_AVAILABILITY: f64 = 0.20;
const K_AVAILABILITY: f64 = 0.50;

pub struct FertilizerStage;

impl StageLogic for FertilizerStage {
    fn id(&self) -> &'static str {
        "fertilizer"
    }

    fn display_name(&self) -> &str {
        "Fertilizer Formula Expert"
    }

    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError> {
        let target_crop = input.text("target_crop", "Corn");
        let field_size_rai = input.number("field_size_rai", 1.0);
        let soil_n = input.number("nitrogen", 20.0);
        let soil_p = input.number("phosphorus", 15.0);
        let soil_k = input.number("potassium", 100.0);
        let prefer_organic = input.flag("prefer_organic", false);
        // Presupuesto explícito se respeta tal cual, incluido 0.
        let budget = input.opt_number("budget_thb")
                          .unwrap_or(CONFIG.default_budget_thb);

        let crop = knowledge().crop(&target_crop).map_err(StageError::domain)?;

        let gaps = nutrient_gaps(soil_n, soil_p, soil_k, crop, field_size_rai);
        let selected = select_fertilizers(&gaps, prefer_organic);
        let costs = calculate_costs(&selected, field_size_rai);
        let within_budget = costs.total <= budget;
        let schedule = application_schedule(&selected);
        let organic_alts = if prefer_organic {
            organic_alternatives()
        } else {
            Vec::new()
        };

        if !within_budget {
            log::warn!(target: "agro::stage",
                       "[fertilizer] plan exceeds budget by {:.2} THB",
                       costs.total - budget);
        }

        let budget_status = if within_budget {
            "within budget".to_string()
        } else {
            format!("over budget by {:.0} THB", costs.total - budget)
        };

        let mut out = StageOutput::new();
        out.set("crop_name", json!(target_crop));
        out.set("field_size_rai", json!(field_size_rai));
        out.set("nutrient_gaps", json!({
            "N": gaps.n.to_json(soil_n),
            "P": gaps.p.to_json(soil_p),
            "K": gaps.k.to_json(soil_k),
        }));
        out.set("selected_fertilizers", json!(selected.iter()
                                                      .map(Selection::to_json)
                                                      .collect::<Vec<_>>()));
        out.set("application_schedule", json!(schedule));
        out.set("cost_analysis", json!({
            "total_cost": costs.total,
            "cost_per_rai": costs.per_rai,
            "breakdown": costs.breakdown,
        }));
        out.set("budget_thb", json!(budget));
        out.set("within_budget", json!(within_budget));
        out.set("organic_alternatives", json!(organic_alts));
        out.set("recommendations", json!(recommendations(&gaps, within_budget)));
        out.set("observation",
                json!(format!("Fertilizer Formula Expert: {} products recommended, \
                               total cost {:.0} THB ({:.0} THB/rai), {budget_status}, \
                               split across {} applications",
                              selected.len(), costs.total, costs.per_rai, schedule.len())));
        Ok(out)
    }
}

struct NutrientGap {
    required_kg: f64,
    gap_kg: f64,
    gap_per_rai: f64,
    status: &'static str,
}

impl NutrientGap {
    fn to_json(&self, soil_level: f64) -> Value {
        json!({
            "soil_level_mg_kg": soil_level,
            "required_kg": self.required_kg,
            "gap_kg": self.gap_kg,
            "gap_per_rai": self.gap_per_rai,
            "status": self.status,
        })
    }
}

struct NutrientGaps {
    n: NutrientGap,
    p: NutrientGap,
    k: NutrientGap,
}

/// mg/kg de suelo a kg/rai asumiendo 15 cm de profundidad de arado.
fn soil_stock_kg(mg_per_kg: f64) -> f64 {
    mg_per_kg * 0.0016 * 1600.0 * 0.15
}

fn gap(required: f64, soil_stock: f64, availability: f64, field_size: f64,
       status: &'static str)
       -> NutrientGap {
    let gap_kg = (required - soil_stock * availability).max(0.0);
    NutrientGap { required_kg: required,
                  gap_kg,
                  gap_per_rai: if field_size > 0.0 { gap_kg / field_size } else { 0.0 },
                  status }
}

fn nutrient_gaps(soil_n: f64, soil_p: f64, soil_k: f64,
                 crop: &agro_domain::CropRequirements, field_size: f64)
                 -> NutrientGaps {
    let req = &crop.nutrient_requirements_kg_per_rai;

    let n_status = if soil_n < 20.0 { "low" } else if soil_n < 40.0 { "medium" } else { "high" };
    let p_status = if soil_p < 15.0 { "low" } else if soil_p < 30.0 { "medium" } else { "high" };
    let k_status = if soil_k < 60.0 { "low" } else if soil_k < 120.0 { "medium" } else { "high" };

    NutrientGaps { n: gap(req.nitrogen.optimal * field_size,
                          soil_stock_kg(soil_n), N_AVAILABILITY, field_size, n_status),
                   p: gap(req.phosphorus_p2o5.optimal * field_size,
                          soil_stock_kg(soil_p), P_AVAILABILITY, field_size, p_status),
                   k: gap(req.potassium_k2o.optimal * field_size,
                          soil_stock_kg(soil_k), K_AVAILABILITY, field_size, k_status) }
}

struct Selection {
    name: String,
    formula: String,
    role: &'static str,
    rate_kg_per_rai: f64,
    timing: &'static str,
    stage: &'static str,
    price_per_kg: f64,
}

impl Selection {
    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "formula": self.formula,
            "role": self.role,
            "rate_kg_per_rai": self.rate_kg_per_rai,
            "timing": self.timing,
            "stage": self.stage,
            "price_per_kg": self.price_per_kg,
        })
    }
}

fn pick<'a>(pool: &[&'a Fertilizer], formula: &str) -> Option<&'a Fertilizer> {
    pool.iter().find(|f| f.formula == formula).copied()
}

fn select_fertilizers(gaps: &NutrientGaps, prefer_organic: bool) -> Vec<Selection> {
    let kb = knowledge();
    let pool: Vec<&Fertilizer> = if prefer_organic {
        kb.organic_fertilizers().collect()
    } else {
        kb.chemical_fertilizers().collect()
    };

    let mut selected = Vec::new();

    // Base: compuesto alto en fósforo, o triple 15 como alternativa.
    let basal = pick(&pool, "16-20-0").or_else(|| pick(&pool, "15-15-15"));
    if let Some(fert) = basal {
        let rate = if gaps.p.gap_per_rai > 0.0 {
            (gaps.p.gap_per_rai / 0.20).min(30.0)
        } else {
            20.0
        };
        selected.push(Selection { name: fert.name.clone(),
                                  formula: fert.formula.clone(),
                                  role: "basal",
                                  rate_kg_per_rai: round1(rate),
                                  timing: "broadcast before planting",
                                  stage: "basal",
                                  price_per_kg: fert.price_thb_per_kg });
    }

    // Nitrógeno de cobertura solo cuando la brecha lo justifica.
    if gaps.n.gap_per_rai > 5.0 {
        if let Some(urea) = pick(&pool, "46-0-0") {
            let rate = (gaps.n.gap_per_rai / 0.46).min(20.0);
            selected.push(Selection { name: urea.name.clone(),
                                      formula: urea.formula.clone(),
                                      role: "top dress",
                                      rate_kg_per_rai: round1(rate),
                                      timing: "first top dressing (20-30 days)",
                                      stage: "top_dress_1",
                                      price_per_kg: urea.price_thb_per_kg });
        }
    }

    if gaps.k.gap_per_rai > 3.0 {
        if let Some(mop) = pick(&pool, "0-0-60") {
            let rate = (gaps.k.gap_per_rai / 0.60).min(15.0);
            selected.push(Selection { name: mop.name.clone(),
                                      formula: mop.formula.clone(),
                                      role: "potassium supplement",
                                      rate_kg_per_rai: round1(rate),
                                      timing: "split into two applications",
                                      stage: "split",
                                      price_per_kg: mop.price_thb_per_kg });
        }
    }

    selected
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

struct CostAnalysis {
    total: f64,
    per_rai: f64,
    breakdown: Vec<Value>,
}

fn calculate_costs(selected: &[Selection], field_size: f64) -> CostAnalysis {
    let mut total = 0.0;
    let mut breakdown = Vec::new();

    for fert in selected {
        let total_kg = fert.rate_kg_per_rai * field_size;
        let cost = total_kg * fert.price_per_kg;
        total += cost;
        breakdown.push(json!({
            "name": fert.name,
            "total_kg": round1(total_kg),
            "price_per_kg": fert.price_per_kg,
            "total_cost": round2(cost),
        }));
    }

    CostAnalysis { total: round2(total),
                   per_rai: if field_size > 0.0 { round2(total / field_size) } else { 0.0 },
                   breakdown }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn application_schedule(selected: &[Selection]) -> Vec<Value> {
    let mut schedule: Vec<(i64, Value)> =
        selected.iter()
                .map(|fert| {
                    let (day, label) = match fert.stage {
                        "top_dress_1" => (25, "first top dressing"),
                        "top_dress_2" => (45, "second top dressing"),
                        "split" => (35, "supplemental application"),
                        _ => (0, "basal, before planting"),
                    };
                    (day,
                     json!({
                         "name": fert.name,
                         "formula": fert.formula,
                         "rate_kg_per_rai": fert.rate_kg_per_rai,
                         "timing_day": day,
                         "stage": label,
                         "method": if fert.stage == "basal" { "broadcast" } else { "side dress" },
                     }))
                })
                .collect();
    schedule.sort_by_key(|(day, _)| *day);
    schedule.into_iter().map(|(_, v)| v).collect()
}

fn organic_alternatives() -> Vec<Value> {
    knowledge().organic_fertilizers()
               .take(3)
               .map(|f| {
                   json!({
                       "name": f.name,
                       "formula": f.formula,
                       "rate": "200-500 kg/rai",
                       "benefit": f.notes,
                   })
               })
               .collect()
}

fn recommendations(gaps: &NutrientGaps, within_budget: bool) -> Vec<String> {
    let mut recs = Vec::new();

    if gaps.n.status == "low" {
        recs.push("soil is short on nitrogen, apply urea or ammonium sulfate".to_string());
    }
    if gaps.p.status == "low" {
        recs.push("soil is short on phosphorus, use a high-phosphorus basal fertilizer".to_string());
    }
    if gaps.k.status == "low" {
        recs.push("soil is short on potassium, apply muriate of potash".to_string());
    }
    if !within_budget {
        recs.push("fertilizer plan exceeds the budget, consider substituting organics".to_string());
    }
    recs.push("splitting applications beats a single large one".to_string());
    recs.push("apply fertilizer after rain or irrigation".to_string());
    recs
}
