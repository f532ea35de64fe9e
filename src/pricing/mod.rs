

pub mod reconciler;
pub mod rules;

pub use reconciler::{
    reconcile, PricingReconciler, PricingWarning, PricingWarningKind, ReconciledComponent,
};
pub use rules::{RuleAdjustment, TradeRules};
