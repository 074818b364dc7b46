//! Stage 7: mercado y rentabilidad. Precios con premium orgánico, costos de
//! producción (con el costo real de fertilizante si viene del stage
//! anterior), ROI y punto de equilibrio.

use serde_json::{json, Value};

use agro_core::{StageError, StageInput, StageLogic, StageOutput};
use agro_domain::knowledge;

pub struct MarketCostStage;

impl StageLogic for MarketCostStage {
    fn id(&self) -> &'static str {
        "market_cost"
    }

    fn display_name(&self) -> &str {
        "Market & Cost Expert"
    }

    fn execute(&self, input: &StageInput) -> Result<StageOutput, StageError> {
        let target_crop = input.text("target_crop", "Corn");
        let field_size_rai = input.number("field_size_rai", 1.0);
        let yield_kg_per_rai = input.number("yield_kg_per_rai", 600.0);
        let fertilizer_cost = input.number("fertilizer_cost_thb", 0.0);
        let is_organic = input.flag("prefer_organic", false);

        let market = analyze_market(&target_crop, is_organic)?;
        let costs = calculate_costs(&target_crop, field_size_rai, fertilizer_cost)?;
        let profit = calculate_profit(&market, &costs, yield_kg_per_rai, field_size_rai);
        let channels = market_channels(is_organic);
        let risks = market_risks(&profit);

        log::debug!(target: "agro::stage",
                    "[market_cost] {target_crop}: revenue {:.0} THB, ROI {:.1}%",
                    profit.total_revenue, profit.roi_percent);

        let profit_word = if profit.net_profit > 0.0 { "profit" } else { "loss" };

        let mut out = StageOutput::new();
        out.set("crop_name", json!(target_crop));
        out.set("field_size_rai", json!(field_size_rai));
        out.set("market_analysis", market.to_json());
        out.set("cost_analysis", json!({
            "breakdown": costs.breakdown,
            "cost_per_rai": costs.per_rai,
            "total_cost": costs.total,
            "field_size_rai": field_size_rai,
        }));
        out.set("profit_analysis", profit.to_json(yield_kg_per_rai));
        out.set("market_channels", json!(channels));
        out.set("market_risks", json!(risks));
        out.set("recommendations", json!(recommendations(&profit, is_organic)));
        out.set("observation",
                json!(format!("Market & Cost Expert: {target_crop} farm gate price \
                               {:.0} THB/kg, cost {:.0} THB/rai, expected revenue {:.0} THB, \
                               {profit_word} {:.0} THB, ROI {:.1}%, trend: {}",
                              market.farm_gate, costs.per_rai, profit.total_revenue,
                              profit.net_profit.abs(), profit.roi_percent, market.trend)));
        Ok(out)
    }
}

struct MarketAnalysis {
    farm_gate: f64,
    wholesale: f64,
    retail: f64,
    is_organic: bool,
    premium_percent: f64,
    trend: String,
}

impl MarketAnalysis {
    fn to_json(&self) -> Value {
        json!({
            "farm_gate_price": self.farm_gate,
            "wholesale_price": self.wholesale,
            "retail_price": self.retail,
            "is_organic": self.is_organic,
            "organic_premium_percent": self.premium_percent,
            "trend": self.trend,
        })
    }
}

fn analyze_market(crop: &str, is_organic: bool) -> Result<MarketAnalysis, StageError> {
    // Cultivo sin ficha de precios cae al de referencia.
    let prices = knowledge().market_price(crop)
                            .ok_or_else(|| {
                                StageError::Internal("market price table is empty".to_string())
                            })?;

    let premium = if is_organic { prices.organic_premium } else { 1.0 };

    Ok(MarketAnalysis { farm_gate: prices.farm_gate * premium,
                        wholesale: prices.wholesale * premium,
                        retail: prices.retail * premium,
                        is_organic,
                        premium_percent: (prices.organic_premium - 1.0) * 100.0,
                        trend: prices.trend.clone() })
}

struct CostBreakdown {
    breakdown: Vec<Value>,
    per_rai: f64,
    total: f64,
}

fn calculate_costs(crop: &str, field_size: f64, fertilizer_cost: f64)
                   -> Result<CostBreakdown, StageError> {
    let template = knowledge().cost_template(crop)
                              .ok_or_else(|| {
                                  StageError::Internal("cost template table is empty".to_string())
                              })?;

    let mut breakdown = Vec::new();
    let mut total_per_rai = 0.0;

    for (item, template_cost) in template.items() {
        // El costo real de fertilizante del plan reemplaza la plantilla.
        let cost_per_rai = if item == "fertilizer" && fertilizer_cost > 0.0 {
            if field_size > 0.0 { fertilizer_cost / field_size } else { fertilizer_cost }
        } else {
            template_cost
        };
        total_per_rai += cost_per_rai;
        breakdown.push(json!({
            "item": item,
            "cost_per_rai": cost_per_rai,
            "total_cost": cost_per_rai * field_size,
        }));
    }

    Ok(CostBreakdown { breakdown,
                       per_rai: total_per_rai,
                       total: total_per_rai * field_size })
}

struct ProfitAnalysis {
    total_yield_kg: f64,
    total_revenue: f64,
    revenue_wholesale: f64,
    revenue_retail: f64,
    total_cost: f64,
    net_profit: f64,
    profit_per_rai: f64,
    roi_percent: f64,
    break_even_yield_kg: f64,
    break_even_per_rai: f64,
}

impl ProfitAnalysis {
    fn to_json(&self, yield_per_rai: f64) -> Value {
        json!({
            "total_yield_kg": self.total_yield_kg,
            "yield_per_rai": yield_per_rai,
            "total_revenue": self.total_revenue,
            "revenue_wholesale": self.revenue_wholesale,
            "revenue_retail": self.revenue_retail,
            "total_cost": self.total_cost,
            "net_profit": self.net_profit,
            "profit_per_rai": self.profit_per_rai,
            "roi_percent": self.roi_percent,
            "break_even_yield_kg": self.break_even_yield_kg,
            "break_even_per_rai": self.break_even_per_rai,
            "is_profitable": self.net_profit > 0.0,
        })
    }
}

/// El precio de referencia para ingresos y equilibrio es el de finca.
fn calculate_profit(market: &MarketAnalysis, costs: &CostBreakdown,
                    yield_per_rai: f64, field_size: f64)
                    -> ProfitAnalysis {
    let total_yield = yield_per_rai * field_size;
    let total_revenue = total_yield * market.farm_gate;
    let net_profit = total_revenue - costs.total;

    let roi = if costs.total > 0.0 { net_profit / costs.total * 100.0 } else { 0.0 };
    let break_even_yield = if market.farm_gate > 0.0 { costs.total / market.farm_gate } else { 0.0 };

    ProfitAnalysis { total_yield_kg: total_yield,
                     total_revenue,
                     revenue_wholesale: total_yield * market.wholesale,
                     revenue_retail: total_yield * market.retail,
                     total_cost: costs.total,
                     net_profit,
                     profit_per_rai: if field_size > 0.0 { net_profit / field_size } else { 0.0 },
                     roi_percent: roi,
                     break_even_yield_kg: break_even_yield,
                     break_even_per_rai: if field_size > 0.0 {
                         break_even_yield / field_size
                     } else {
                         0.0
                     } }
}

fn market_channels(is_organic: bool) -> Vec<Value> {
    let mut channels = vec![
        json!({"channel": "middlemen and rice mills", "price_level": "lowest",
               "pros": "convenient, buys in bulk", "cons": "lowest price",
               "recommended": true}),
        json!({"channel": "agricultural cooperative", "price_level": "fair",
               "pros": "fair price, member benefits", "cons": "membership required",
               "recommended": true}),
        json!({"channel": "farmer markets", "price_level": "high",
               "pros": "good price, direct to consumers",
               "cons": "own transport, limited volume", "recommended": false}),
    ];
    if is_organic {
        channels.push(json!({"channel": "organic and online markets",
                             "price_level": "premium",
                             "pros": "premium price, growing market",
                             "cons": "certification required", "recommended": true}));
    }
    channels
}

fn market_risks(profit: &ProfitAnalysis) -> Vec<Value> {
    let mut risks = vec![json!({
        "risk": "price volatility", "severity": "medium",
        "mitigation": "use forward contracts or sell through the cooperative",
    })];
    if profit.roi_percent < 20.0 {
        risks.push(json!({"risk": "thin margin", "severity": "high",
                          "mitigation": "cut costs, raise yield, find better-priced outlets"}));
    }
    risks.push(json!({"risk": "market access", "severity": "low",
                      "mitigation": "organize farmer groups and use online channels"}));
    risks
}

fn recommendations(profit: &ProfitAnalysis, is_organic: bool) -> Vec<String> {
    let mut recs = Vec::new();

    if profit.net_profit > 0.0 {
        if profit.roi_percent >= 50.0 {
            recs.push("returns are very good, consider expanding the planted area".to_string());
        } else if profit.roi_percent >= 20.0 {
            recs.push("returns are healthy, keep the produce quality up".to_string());
        } else {
            recs.push("returns are thin, look for cost cuts or better prices".to_string());
        }
    } else {
        recs.push("a loss is expected, revisit the production plan".to_string());
    }
    recs.push("compare prices across markets before selling".to_string());
    recs.push("consider adding value through processing if possible".to_string());
    if is_organic {
        recs.push("take advantage of the organic price premium".to_string());
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::Stage;

    fn run(crop: &str, field: f64, yield_per_rai: f64, fert_cost: f64,
           organic: bool)
           -> StageOutput {
        let mut input = StageInput::new();
        input.set("target_crop", json!(crop));
        input.set("field_size_rai", json!(field));
        input.set("yield_kg_per_rai", json!(yield_per_rai));
        input.set("fertilizer_cost_thb", json!(fert_cost));
        input.set("prefer_organic", json!(organic));
        Stage::process(&MarketCostStage, &input).into_payload()
    }

    #[test]
    fn corn_profit_math() {
        // Corn template totals 4500 THB/rai; 2 rai at 900 kg/rai and 8.5 THB/kg.
        let out = run("Corn", 2.0, 900.0, 0.0, false);
        assert_eq!(out.path("cost_analysis.total_cost").unwrap(), &json!(9000.0));
        assert_eq!(out.path("profit_analysis.total_revenue").unwrap(), &json!(15300.0));
        assert_eq!(out.path("profit_analysis.net_profit").unwrap(), &json!(6300.0));
        let roi = out.path("profit_analysis.roi_percent").unwrap().as_f64().unwrap();
        assert!((roi - 70.0).abs() < 1e-9);
    }

    #[test]
    fn actual_fertilizer_cost_replaces_the_template() {
        // Template fertilizer is 1200/rai; the plan cost 3000 THB over 2 rai.
        let out = run("Corn", 2.0, 900.0, 3000.0, false);
        let per_rai = out.path("cost_analysis.cost_per_rai").unwrap().as_f64().unwrap();
        assert!((per_rai - (4500.0 - 1200.0 + 1500.0)).abs() < 1e-9);
    }

    #[test]
    fn organic_premium_raises_all_price_points() {
        let out = run("Riceberry Rice", 1.0, 500.0, 0.0, true);
        assert_eq!(out.path("market_analysis.farm_gate_price").unwrap(), &json!(32.5));
        assert_eq!(out.path("market_analysis.retail_price").unwrap(),
                   &json!(71.5));
        let channels = out.get("market_channels").unwrap().as_array().unwrap();
        assert_eq!(channels.len(), 4, "organic sellers get the premium channel");
    }

    #[test]
    fn unknown_crop_falls_back_to_reference_prices() {
        let out = run("Dragonfruit", 1.0, 600.0, 0.0, false);
        assert_eq!(out.path("market_analysis.farm_gate_price").unwrap(), &json!(8.5));
    }

    #[test]
    fn thin_margin_flags_high_risk() {
        // 300 kg/rai at 8.5 THB barely covers the 4500 THB template.
        let out = run("Corn", 1.0, 300.0, 0.0, false);
        let risks = out.get("market_risks").unwrap().as_array().unwrap();
        assert!(risks.iter().any(|r| r["risk"] == json!("thin margin")));
        assert_eq!(out.path("profit_analysis.is_profitable").unwrap(), &json!(false));
    }
}
