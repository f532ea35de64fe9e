use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::knowledge_base::{Component, FormatTag};

/// Markups outside this range are treated as data-entry artefacts.
pub const MAX_REALISTIC_MARKUP_PCT: f64 = 200.0;


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QualityTier {
    /// Structured breakdown that can be inherited for pricing.
    Complete,
    /// Lump-sum price with missing or zero-filled breakdown.
    Legacy,
}


/// Deterministic quality rule over a component's own fields.
pub fn classify(component: &Component) -> QualityTier {
    match component.format_tag {
        FormatTag::Legacy => QualityTier::Legacy,
        FormatTag::Complete if has_breakdown(component) && has_realistic_markups(component) => {
            QualityTier::Complete
        }
        FormatTag::Complete => QualityTier::Legacy,
    }
}


pub fn is_complete(component: &Component) -> bool {
    classify(component) == QualityTier::Complete
}


fn has_breakdown(component: &Component) -> bool {
    component.has_labor() || component.material_cost > 0.0 || component.subcontractor_cost > 0.0
}


fn has_realistic_markups(component: &Component) -> bool {
    let realistic = 0.0..=MAX_REALISTIC_MARKUP_PCT;
    realistic.contains(&component.material_markup_pct)
        && realistic.contains(&component.subcontractor_markup_pct)
}


/// Graded reliability in `[0, 1]`, shown to the model next to each worked
/// example.
pub fn quality_score(component: &Component) -> f64 {
    if component.format_tag == FormatTag::Legacy || !has_breakdown(component) {
        return 0.3;
    }

    let mut score = 0.4;
    if (component.labor_hours * component.hourly_rate - component.labor_cost).abs() < 1.0 {
        score += 0.3;
    }
    if has_realistic_markups(component) {
        score += 0.2;
    }
    if !component.is_synthetic() {
        score += 0.1;
    }
    f64::min(score, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structured() -> Component {
        Component {
            labor_hours: 4.0,
            hourly_rate: 510.0,
            labor_cost: 2040.0,
            material_cost: 800.0,
            material_markup_pct: 18.0,
            source_id: Some("tilbud_2023.xlsx".to_string()),
            format_tag: FormatTag::Complete,
            ..Component::new("Tømrer", "Montering af dør")
        }
    }

    #[test]
    fn test_structured_record_is_complete() {
        assert_eq!(classify(&structured()), QualityTier::Complete);
        assert!((quality_score(&structured()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_legacy_tag_is_always_legacy() {
        let component = Component {
            format_tag: FormatTag::Legacy,
            ..structured()
        };
        assert_eq!(classify(&component), QualityTier::Legacy);
        assert_eq!(quality_score(&component), 0.3);
    }

    #[test]
    fn test_zero_filled_breakdown_is_legacy() {
        let component = Component {
            format_tag: FormatTag::Complete,
            total_price: 6500.0,
            ..Component::new("Projekt", "Afhentning af affald")
        };
        assert_eq!(classify(&component), QualityTier::Legacy);
    }

    #[test]
    fn test_hours_without_rate_is_not_a_breakdown() {
        let component = Component {
            hourly_rate: 0.0,
            material_cost: 0.0,
            ..structured()
        };
        assert_eq!(classify(&component), QualityTier::Legacy);
    }

    #[test]
    fn test_subcontractor_only_is_complete() {
        let component = Component {
            format_tag: FormatTag::Complete,
            subcontractor_cost: 12000.0,
            subcontractor_markup_pct: 15.0,
            ..Component::new("El", "Ny eltavle")
        };
        assert!(is_complete(&component));
    }

    #[test]
    fn test_unrealistic_markup_is_legacy() {
        let component = Component {
            material_markup_pct: 450.0,
            ..structured()
        };
        assert_eq!(classify(&component), QualityTier::Legacy);
    }

    #[test]
    fn test_score_penalizes_inconsistent_labor_cost() {
        let component = Component {
            labor_cost: 9999.0,
            ..structured()
        };
        assert!((quality_score(&component) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(QualityTier::Complete.to_string(), "complete");
    }
}
