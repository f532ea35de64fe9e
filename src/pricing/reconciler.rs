use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::{debug, warn};

use crate::knowledge_base::{Component, PricedField};


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingWarningKind {
    /// A negative or non-finite value was replaced by 0.
    ClampedNegative { original: f64 },
    /// The quoted total was kept but disagrees with the sum of the parts.
    TotalDiverges { quoted: f64, computed: f64 },
    /// A derived value is not finite although every input was.
    Overflow,
}

impl PricingWarningKind {
    pub fn is_overflow(&self) -> bool {
        matches!(self, PricingWarningKind::Overflow)
    }
}


/// Non-fatal pricing issue recorded in a record's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingWarning {
    pub field: PricedField,
    #[serde(flatten)]
    pub kind: PricingWarningKind,
}

impl std::fmt::Display for PricingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            PricingWarningKind::ClampedNegative { original } => {
                write!(f, "{} was {} and has been clamped to 0", self.field, original)
            }
            PricingWarningKind::TotalDiverges { quoted, computed } => write!(
                f,
                "{} quoted as {:.2} but parts sum to {:.2}",
                self.field, quoted, computed
            ),
            PricingWarningKind::Overflow => write!(f, "{} overflowed while deriving prices", self.field),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledComponent {
    pub component: Component,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PricingWarning>,
}


/// Recomputes the derived price fields of a component into a new record.
#[derive(Debug, Clone)]
pub struct PricingReconciler {
    /// Relative gap between a kept quote and the sum of parts that is still
    /// considered consistent.
    pub divergence_tolerance: f64,
    /// Absolute gap (currency units) that is always tolerated.
    pub divergence_floor: f64,
}

impl Default for PricingReconciler {
    fn default() -> Self {
        Self {
            divergence_tolerance: 0.01,
            divergence_floor: 1.0,
        }
    }
}

impl PricingReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    
    pub fn reconcile(&self, source: &Component) -> ReconciledComponent {
        let mut component = source.clone();
        let mut warnings = Vec::new();

        for field in PricedField::iter() {
            let value = component.value_mut(field);
            if !value.is_finite() || *value < 0.0 {
                warnings.push(PricingWarning {
                    field,
                    kind: PricingWarningKind::ClampedNegative { original: *value },
                });
                *value = 0.0;
            }
        }

        if component.has_labor() {
            component.labor_cost = component.labor_hours * component.hourly_rate;
        }
        component.material_sale_price =
            component.material_cost * (1.0 + component.material_markup_pct / 100.0);
        component.subcontractor_sale_price =
            component.subcontractor_cost * (1.0 + component.subcontractor_markup_pct / 100.0);

        let computed = component.sum_of_parts();
        if component.total_price > 0.0 {
            let gap = (component.total_price - computed).abs();
            let allowed = f64::max(self.divergence_floor, component.total_price * self.divergence_tolerance);
            if computed > 0.0 && gap > allowed {
                warnings.push(PricingWarning {
                    field: PricedField::TotalPrice,
                    kind: PricingWarningKind::TotalDiverges {
                        quoted: component.total_price,
                        computed,
                    },
                });
            }
        } else {
            component.total_price = computed;
        }

        for field in PricedField::iter() {
            if !component.value(field).is_finite() {
                warnings.push(PricingWarning {
                    field,
                    kind: PricingWarningKind::Overflow,
                });
            }
        }

        for warning in &warnings {
            match warning.kind {
                PricingWarningKind::ClampedNegative { .. } | PricingWarningKind::Overflow => warn!(
                    "Pricing '{}': {}",
                    crate::safe_truncate(&component.task_description, 50),
                    warning
                ),
                PricingWarningKind::TotalDiverges { .. } => debug!(
                    "Pricing '{}': {}",
                    crate::safe_truncate(&component.task_description, 50),
                    warning
                ),
            }
        }

        ReconciledComponent {
            component,
            warnings,
        }
    }
}


/// Shorthand for [`PricingReconciler::reconcile`] with default tolerances.
pub fn reconcile(component: &Component) -> ReconciledComponent {
    PricingReconciler::default().reconcile(component)
}
