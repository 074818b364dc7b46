//! Stage 2: química de suelo. Clasifica el pH, evalúa N-P-K contra umbrales
//! de referencia y calcula el puntaje de salud del suelo.

use serde_json::{json, Value};

use agro_core::{StageError, StageInput, StageLogic, StageOutput};

// Umbrales de referencia por nutriente (mg/kg): (low, medium).
const N_THRESHOLDS: (f64, f64) = (20.0, 40.0);
const P_THRESHOLDS: (f64, f64) = (15.0, 30.0);
const K_THRESHOLDS: (f64, f64) = (60.0, 120.0);

pub struct SoilChemistryStage;

impl StageLogic for SoilChemistryStage {
    fn id(&self) -> &'static str {
        "soil_chemistry"
    }

    fn display_name(&self) -> &str {
        "Soil Chemistry Expert"
    }

    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError> {
        let ph = input.number("ph", 6.5);
        let nitrogen = input.number("nitrogen", 20.0);
        let phosphorus = input.number("phosphorus", 15.0);
        let potassium = input.number("potassium", 100.0);

        let ph_analysis = analyze_ph(ph);
        let n = assess_nutrient("N", nitrogen, N_THRESHOLDS);
        let p = assess_nutrient("P", phosphorus, P_THRESHOLDS);
        let k = assess_nutrient("K", potassium, K_THRESHOLDS);

        // pH pesa 30%; nutrientes 70% (N 30, P 20, K 20).
        let health_score = ph_analysis.score * 0.30
                           + n.score * 0.30
                           + p.score * 0.20
                           + k.score * 0.20;

        let issues = identify_issues(&ph_analysis, &[&n, &p, &k]);
        let recommendations = generate_recommendations(&ph_analysis, &[&n, &p, &k]);

        log::debug!(target: "agro::stage",
                    "[soil_chemistry] pH {ph} ({}) health {health_score:.1}", ph_analysis.status);

        let issue_summary = if issues.is_empty() {
            "no critical issues".to_string()
        } else {
            format!("issues: {}", issues[..issues.len().min(2)].join(", "))
        };

        let mut out = StageOutput::new();
        out.set("ph_value", json!(ph));
        out.set("ph_analysis", ph_analysis.to_json());
        out.set("nutrient_analysis", json!({
            "nitrogen": n.to_json(),
            "phosphorus": p.to_json(),
            "potassium": k.to_json(),
        }));
        out.set("health_score", json!(health_score));
        out.set("issues", json!(issues));
        out.set("recommendations", json!(recommendations));
        out.set("observation",
                json!(format!("Soil Chemistry Expert: pH {ph} ({}), nutrients N={}, P={}, K={}, \
                               soil health score {health_score:.0}/100, {issue_summary}",
                              ph_analysis.status, n.status, p.status, k.status)));
        Ok(out)
    }
}

struct PhAnalysis {
    value: f64,
    status: &'static str,
    suitability: &'static str,
    score: f64,
    recommendation: &'static str,
}

impl PhAnalysis {
    fn to_json(&self) -> Value {
        json!({
            "value": self.value,
            "status": self.status,
            "suitability": self.suitability,
            "score": self.score,
            "recommendation": self.recommendation,
        })
    }
}

fn analyze_ph(ph: f64) -> PhAnalysis {
    let (status, suitability, score, recommendation) = if ph < 4.5 {
        ("very_acidic", "unsuitable", 30.0,
         "apply lime or dolomite at 200-400 kg/rai")
    } else if ph < 5.5 {
        ("acidic", "needs improvement", 50.0,
         "apply lime or dolomite at 100-200 kg/rai")
    } else if ph < 6.0 {
        ("slightly_acidic", "acceptable", 70.0,
         "apply lime at 50-100 kg/rai if needed")
    } else if ph < 7.0 {
        ("neutral", "well suited", 90.0, "pH is in the optimal range, no adjustment needed")
    } else if ph < 7.5 {
        ("slightly_alkaline", "acceptable", 75.0,
         "avoid liming, prefer acid-forming fertilizers")
    } else if ph < 8.5 {
        ("alkaline", "needs improvement", 50.0,
         "apply sulfur or acid-forming fertilizers")
    } else {
        ("very_alkaline", "unsuitable", 30.0,
         "urgent soil amendment required, apply sulfur")
    };

    PhAnalysis { value: ph,
                 status,
                 suitability,
                 score,
                 recommendation }
}

struct NutrientAssessment {
    symbol: &'static str,
    value: f64,
    status: &'static str,
    score: f64,
    thresholds: (f64, f64),
}

impl NutrientAssessment {
    fn to_json(&self) -> Value {
        json!({
            "symbol": self.symbol,
            "value": self.value,
            "unit": "mg/kg",
            "status": self.status,
            "score": self.score,
            "thresholds": { "low": self.thresholds.0, "medium": self.thresholds.1 },
        })
    }
}

fn assess_nutrient(symbol: &'static str, value: f64, thresholds: (f64, f64)) -> NutrientAssessment {
    let (status, score) = if value < thresholds.0 {
        ("low", 40.0)
    } else if value < thresholds.1 {
        ("medium", 70.0)
    } else {
        ("high", 95.0)
    };
    NutrientAssessment { symbol,
                         value,
                         status,
                         score,
                         thresholds }
}

fn identify_issues(ph: &PhAnalysis, nutrients: &[&NutrientAssessment]) -> Vec<String> {
    let mut issues = Vec::new();

    match ph.status {
        "very_acidic" | "acidic" => issues.push("soil is strongly acidic, liming required".to_string()),
        "alkaline" | "very_alkaline" => issues.push("soil is strongly alkaline".to_string()),
        _ => {}
    }

    for n in nutrients {
        if n.status == "low" {
            issues.push(format!("{} is low and must be supplemented", nutrient_name(n.symbol)));
        }
    }
    issues
}

fn generate_recommendations(ph: &PhAnalysis, nutrients: &[&NutrientAssessment]) -> Vec<String> {
    let mut recs = vec![ph.recommendation.to_string()];

    for n in nutrients {
        if n.status == "low" {
            let rec = match n.symbol {
                "N" => "raise nitrogen with urea or ammonium sulfate",
                "P" => "raise phosphorus with superphosphate",
                _ => "raise potassium with muriate of potash",
            };
            recs.push(rec.to_string());
        }
    }
    recs
}

fn nutrient_name(symbol: &str) -> &'static str {
    match symbol {
        "N" => "nitrogen",
        "P" => "phosphorus",
        _ => "potassium",
    }
}
