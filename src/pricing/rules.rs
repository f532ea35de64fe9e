use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::knowledge_base::{Component, PricedField};


/// One input value a trade rule replaced before reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAdjustment {
    pub rule: String,
    pub field: PricedField,
    pub from: f64,
    pub to: f64,
}


/// House pricing rules for generated components.
///
/// Rules only touch input fields. Derived prices are left to the
/// reconciler, except for flat-fee services whose quote is the price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeRules {
    /// Trade that never carries subcontractor costs.
    pub in_house_trade: String,
    pub demolition_category: String,
    pub demolition_hourly_rate: f64,
    pub default_hourly_rate: f64,
    pub min_material_markup_pct: f64,
    pub fallback_material_markup_pct: f64,
    pub flat_fee_categories: Vec<String>,
    pub flat_fee_keywords: Vec<String>,
}

impl Default for TradeRules {
    fn default() -> Self {
        Self {
            in_house_trade: "Bnord".to_string(),
            demolition_category: "Nedrivning".to_string(),
            demolition_hourly_rate: 500.0,
            default_hourly_rate: 585.0,
            min_material_markup_pct: 15.0,
            fallback_material_markup_pct: 17.0,
            flat_fee_categories: vec!["Projekt".to_string(), "Service".to_string()],
            flat_fee_keywords: ["afhentning", "affald", "garbage", "big bag"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl TradeRules {
    pub fn hourly_rate_for(&self, category: &str) -> f64 {
        if category == self.demolition_category {
            self.demolition_hourly_rate
        } else {
            self.default_hourly_rate
        }
    }

    pub fn is_flat_fee(&self, category: &str, request: &str) -> bool {
        if !self.flat_fee_categories.iter().any(|c| c == category) {
            return false;
        }
        let request = request.to_lowercase();
        self.flat_fee_keywords.iter().any(|k| request.contains(k.as_str()))
    }

    /// Applies the rules in place. `context_totals` are the quoted totals of
    /// the retrieved components and only feed the flat-fee fallback.
    pub fn apply(
        &self,
        component: &mut Component,
        request: &str,
        context_totals: &[f64],
    ) -> Vec<RuleAdjustment> {
        let mut edit = Adjuster {
            component,
            adjustments: Vec::new(),
        };

        if self.is_flat_fee(&edit.component.category, request) {
            for field in [
                PricedField::LaborHours,
                PricedField::HourlyRate,
                PricedField::LaborCost,
                PricedField::MaterialCost,
                PricedField::MaterialMarkupPct,
                PricedField::MaterialSalePrice,
                PricedField::SubcontractorCost,
                PricedField::SubcontractorMarkupPct,
                PricedField::SubcontractorSalePrice,
                PricedField::AdminCost,
            ] {
                edit.set("flat_fee", field, 0.0);
            }
            if edit.component.total_price <= 0.0 {
                let quotes: Vec<f64> = context_totals.iter().copied().filter(|t| *t > 0.0).collect();
                if !quotes.is_empty() {
                    let mean = quotes.iter().sum::<f64>() / quotes.len() as f64;
                    edit.set("flat_fee", PricedField::TotalPrice, mean.round());
                }
            }
            debug!("Flat-fee rule applied to '{}'", crate::safe_truncate(request, 50));
            return edit.adjustments;
        }

        if edit.component.trade == self.in_house_trade {
            edit.set("in_house_trade", PricedField::SubcontractorCost, 0.0);
            edit.set("in_house_trade", PricedField::SubcontractorMarkupPct, 0.0);
            edit.set("in_house_trade", PricedField::SubcontractorSalePrice, 0.0);
        }

        if edit.component.labor_hours > 0.0 {
            let rate = self.hourly_rate_for(&edit.component.category);
            edit.set("category_rate", PricedField::HourlyRate, rate);
        }

        if edit.component.material_cost > 0.0 {
            if edit.component.material_markup_pct < self.min_material_markup_pct {
                edit.set(
                    "material_markup",
                    PricedField::MaterialMarkupPct,
                    self.fallback_material_markup_pct,
                );
            }
        } else {
            edit.set("material_markup", PricedField::MaterialMarkupPct, 0.0);
        }

        if self.flat_fee_categories.contains(&edit.component.category) {
            for field in [
                PricedField::LaborHours,
                PricedField::HourlyRate,
                PricedField::LaborCost,
                PricedField::MaterialCost,
                PricedField::MaterialMarkupPct,
                PricedField::SubcontractorCost,
                PricedField::SubcontractorMarkupPct,
            ] {
                edit.set("admin_only", field, 0.0);
            }
        }

        // Totals are always recomputed from the adjusted parts.
        edit.set("recompute_total", PricedField::TotalPrice, 0.0);

        edit.adjustments
    }
}


struct Adjuster<'c> {
    component: &'c mut Component,
    adjustments: Vec<RuleAdjustment>,
}

impl Adjuster<'_> {
    fn set(&mut self, rule: &str, field: PricedField, to: f64) {
        let value = self.component.value_mut(field);
        if *value != to {
            self.adjustments.push(RuleAdjustment {
                rule: rule.to_string(),
                field,
                from: *value,
                to,
            });
            *value = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::reconcile;

    #[test]
    fn test_in_house_trade_drops_subcontractor() {
        let rules = TradeRules::default();
        let mut component = Component {
            trade: "Bnord".to_string(),
            subcontractor_cost: 1200.0,
            subcontractor_markup_pct: 10.0,
            ..Component::new("Tømrer", "Opsætning af skab")
        };

        let adjustments = rules.apply(&mut component, "Opsætning af skab", &[]);
        assert_eq!(component.subcontractor_cost, 0.0);
        assert_eq!(component.subcontractor_markup_pct, 0.0);
        assert!(adjustments.iter().any(|a| a.rule == "in_house_trade"));
    }

    #[test]
    fn test_category_rate_and_markup_floor() {
        let rules = TradeRules::default();
        let mut component = Component {
            labor_hours: 3.0,
            hourly_rate: 450.0,
            material_cost: 200.0,
            material_markup_pct: 5.0,
            total_price: 9999.0,
            ..Component::new("Nedrivning", "Nedrivning af fliser")
        };

        rules.apply(&mut component, "Nedrivning af fliser", &[]);
        assert_eq!(component.hourly_rate, 500.0);
        assert_eq!(component.material_markup_pct, 17.0);
        assert_eq!(component.total_price, 0.0);

        let reconciled = reconcile(&component).component;
        assert_eq!(reconciled.labor_cost, 1500.0);
        assert!((reconciled.total_price - 1734.0).abs() < 1e-6);
    }

    #[test]
    fn test_markup_cleared_without_materials() {
        let rules = TradeRules::default();
        let mut component = Component {
            labor_hours: 1.0,
            hourly_rate: 585.0,
            material_markup_pct: 20.0,
            ..Component::new("VVS", "Nyt afløb")
        };
        rules.apply(&mut component, "Nyt afløb", &[]);
        assert_eq!(component.material_markup_pct, 0.0);
        assert_eq!(component.hourly_rate, 585.0);
    }

    #[test]
    fn test_flat_fee_uses_context_mean() {
        let rules = TradeRules::default();
        let mut component = Component {
            labor_hours: 2.0,
            hourly_rate: 585.0,
            ..Component::new("Projekt", "Afhentning af affald")
        };

        rules.apply(&mut component, "Afhentning af affald med big bag", &[1000.0, 0.0, 2001.0]);
        assert_eq!(component.labor_hours, 0.0);
        assert_eq!(component.total_price, 1501.0);
    }

    #[test]
    fn test_flat_fee_keeps_quote() {
        let rules = TradeRules::default();
        let mut component = Component {
            total_price: 800.0,
            ..Component::new("Service", "Affald")
        };
        rules.apply(&mut component, "bortskaffelse af affald", &[5000.0]);
        assert_eq!(component.total_price, 800.0);
    }

    #[test]
    fn test_admin_only_project_component() {
        let rules = TradeRules::default();
        let mut component = Component {
            labor_hours: 5.0,
            hourly_rate: 585.0,
            admin_cost: 750.0,
            ..Component::new("Projekt", "Projektledelse")
        };
        rules.apply(&mut component, "Projektledelse", &[]);
        let reconciled = reconcile(&component).component;
        assert_eq!(reconciled.labor_cost, 0.0);
        assert_eq!(reconciled.total_price, 750.0);
    }
}
