use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};


/// Structural completeness of a record as it came out of the ETL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum FormatTag {
    #[serde(rename = "new")]
    Complete,
    #[default]
    #[serde(rename = "old")]
    Legacy,
}

impl FormatTag {
    /// Anything other than a recognised complete marker is legacy.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "new" | "complete" => FormatTag::Complete,
            _ => FormatTag::Legacy,
        }
    }
}

impl<'de> Deserialize<'de> for FormatTag {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = Option::<Value>::deserialize(deserializer)?;
        Ok(match label {
            Some(Value::String(label)) => FormatTag::from_label(&label),
            _ => FormatTag::Legacy,
        })
    }
}


/// The priced fields of a component, named by their knowledge base keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
    IntoStaticStr,
)]
pub enum PricedField {
    #[strum(serialize = "Admin")]
    #[serde(rename = "Admin")]
    AdminCost,
    #[strum(serialize = "Timer")]
    #[serde(rename = "Timer")]
    LaborHours,
    #[strum(serialize = "Takst")]
    #[serde(rename = "Takst")]
    HourlyRate,
    #[strum(serialize = "Kostpris_EP")]
    #[serde(rename = "Kostpris_EP")]
    LaborCost,
    #[strum(serialize = "Materialer")]
    #[serde(rename = "Materialer")]
    MaterialCost,
    #[strum(serialize = "Påslag_MAT")]
    #[serde(rename = "Påslag_MAT")]
    MaterialMarkupPct,
    #[strum(serialize = "Salgspris_MAT")]
    #[serde(rename = "Salgspris_MAT")]
    MaterialSalePrice,
    #[strum(serialize = "UE")]
    #[serde(rename = "UE")]
    SubcontractorCost,
    #[strum(serialize = "Påslag_UE")]
    #[serde(rename = "Påslag_UE")]
    SubcontractorMarkupPct,
    #[strum(serialize = "Salgspris_UE")]
    #[serde(rename = "Salgspris_UE")]
    SubcontractorSalePrice,
    #[strum(serialize = "Tilbud")]
    #[serde(rename = "Tilbud")]
    TotalPrice,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "kategori")]
    pub category: String,

    #[serde(rename = "Opgave")]
    pub task_description: String,

    #[serde(rename = "Fag", default, deserialize_with = "deserialize_label")]
    pub trade: String,

    #[serde(rename = "Timer", default, deserialize_with = "deserialize_amount")]
    pub labor_hours: f64,

    #[serde(rename = "Takst", default, deserialize_with = "deserialize_amount")]
    pub hourly_rate: f64,

    #[serde(rename = "Kostpris_EP", default, deserialize_with = "deserialize_amount")]
    pub labor_cost: f64,

    #[serde(rename = "Materialer", default, deserialize_with = "deserialize_amount")]
    pub material_cost: f64,

    #[serde(rename = "Påslag_MAT", default, deserialize_with = "deserialize_amount")]
    pub material_markup_pct: f64,

    #[serde(rename = "Salgspris_MAT", default, deserialize_with = "deserialize_amount")]
    pub material_sale_price: f64,

    #[serde(rename = "UE", default, deserialize_with = "deserialize_amount")]
    pub subcontractor_cost: f64,

    #[serde(rename = "Påslag_UE", default, deserialize_with = "deserialize_amount")]
    pub subcontractor_markup_pct: f64,

    #[serde(rename = "Salgspris_UE", default, deserialize_with = "deserialize_amount")]
    pub subcontractor_sale_price: f64,

    #[serde(rename = "Admin", default, deserialize_with = "deserialize_amount")]
    pub admin_cost: f64,

    #[serde(rename = "Tilbud", default, deserialize_with = "deserialize_amount")]
    pub total_price: f64,

    #[serde(rename = "source_file", default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    #[serde(rename = "original_format", default)]
    pub format_tag: FormatTag,

    /// Position in the store. Assigned at load, absent on generated records.
    #[serde(skip)]
    pub index: Option<usize>,

    /// Unknown knowledge base keys, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Component {
    
    pub fn new(category: impl Into<String>, task_description: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            task_description: task_description.into(),
            trade: String::new(),
            labor_hours: 0.0,
            hourly_rate: 0.0,
            labor_cost: 0.0,
            material_cost: 0.0,
            material_markup_pct: 0.0,
            material_sale_price: 0.0,
            subcontractor_cost: 0.0,
            subcontractor_markup_pct: 0.0,
            subcontractor_sale_price: 0.0,
            admin_cost: 0.0,
            total_price: 0.0,
            source_id: None,
            format_tag: FormatTag::Legacy,
            index: None,
            extra: Map::new(),
        }
    }

    
    pub fn value(&self, field: PricedField) -> f64 {
        match field {
            PricedField::AdminCost => self.admin_cost,
            PricedField::LaborHours => self.labor_hours,
            PricedField::HourlyRate => self.hourly_rate,
            PricedField::LaborCost => self.labor_cost,
            PricedField::MaterialCost => self.material_cost,
            PricedField::MaterialMarkupPct => self.material_markup_pct,
            PricedField::MaterialSalePrice => self.material_sale_price,
            PricedField::SubcontractorCost => self.subcontractor_cost,
            PricedField::SubcontractorMarkupPct => self.subcontractor_markup_pct,
            PricedField::SubcontractorSalePrice => self.subcontractor_sale_price,
            PricedField::TotalPrice => self.total_price,
        }
    }

    
    pub fn value_mut(&mut self, field: PricedField) -> &mut f64 {
        match field {
            PricedField::AdminCost => &mut self.admin_cost,
            PricedField::LaborHours => &mut self.labor_hours,
            PricedField::HourlyRate => &mut self.hourly_rate,
            PricedField::LaborCost => &mut self.labor_cost,
            PricedField::MaterialCost => &mut self.material_cost,
            PricedField::MaterialMarkupPct => &mut self.material_markup_pct,
            PricedField::MaterialSalePrice => &mut self.material_sale_price,
            PricedField::SubcontractorCost => &mut self.subcontractor_cost,
            PricedField::SubcontractorMarkupPct => &mut self.subcontractor_markup_pct,
            PricedField::SubcontractorSalePrice => &mut self.subcontractor_sale_price,
            PricedField::TotalPrice => &mut self.total_price,
        }
    }

    
    pub fn has_labor(&self) -> bool {
        self.labor_hours > 0.0 && self.hourly_rate > 0.0
    }

    /// Labor cost, material and subcontractor sale prices plus admin.
    pub fn sum_of_parts(&self) -> f64 {
        self.labor_cost + self.material_sale_price + self.subcontractor_sale_price + self.admin_cost
    }

    
    pub fn is_synthetic(&self) -> bool {
        self.source_id.is_none()
    }
}


fn deserialize_label<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}


fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files_processed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_components: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_breakdown: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}


/// On-disk layout of the merged knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBaseFile {
    #[serde(default)]
    pub metadata: KnowledgeBaseMetadata,
    pub components: Vec<Component>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_component_deserializes_knowledge_base_keys() {
        let json = r#"{
            "kategori": "VVS",
            "Opgave": "Montering af toilet",
            "Fag": "Bnord",
            "Timer": 4,
            "Takst": 585.0,
            "Kostpris_EP": 2340.0,
            "Materialer": null,
            "Tilbud": 2340.0,
            "source_file": "projekt_a.json",
            "original_format": "new",
            "Beskrivelse": "inkl. afløb"
        }"#;

        let component: Component = serde_json::from_str(json).unwrap();
        assert_eq!(component.category, "VVS");
        assert_eq!(component.labor_hours, 4.0);
        assert_eq!(component.material_cost, 0.0);
        assert_eq!(component.format_tag, FormatTag::Complete);
        assert_eq!(component.source_id.as_deref(), Some("projekt_a.json"));
        assert_eq!(component.extra.get("Beskrivelse"), Some(&Value::from("inkl. afløb")));
        assert_eq!(component.index, None);
    }

    #[test]
    fn test_missing_format_defaults_to_legacy() {
        let component: Component =
            serde_json::from_str(r#"{"kategori": "Tømrer", "Opgave": "Ny dør"}"#).unwrap();
        assert_eq!(component.format_tag, FormatTag::Legacy);
        assert_eq!(component.total_price, 0.0);
    }

    #[test]
    fn test_format_tag_accepts_english_aliases() {
        let component: Component = serde_json::from_str(
            r#"{"kategori": "Maler", "Opgave": "Maling af loft", "original_format": "legacy"}"#,
        )
        .unwrap();
        assert_eq!(component.format_tag, FormatTag::Legacy);
    }

    #[test]
    fn test_null_or_unknown_labels_fall_back() {
        let component: Component = serde_json::from_str(
            r#"{"kategori": "VVS", "Opgave": "Nyt toilet", "Fag": null, "original_format": null}"#,
        )
        .unwrap();
        assert_eq!(component.trade, "");
        assert_eq!(component.format_tag, FormatTag::Legacy);

        for label in [r#""""#, r#""mixed""#, "3"] {
            let json = format!(r#"{{"kategori": "VVS", "Opgave": "Rør", "original_format": {label}}}"#);
            let component: Component = serde_json::from_str(&json).unwrap();
            assert_eq!(component.format_tag, FormatTag::Legacy);
        }
        assert_eq!(FormatTag::from_label(" Complete "), FormatTag::Complete);
    }

    #[test]
    fn test_missing_description_is_rejected() {
        let result = serde_json::from_str::<Component>(r#"{"kategori": "VVS"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_serialization_keeps_extra_fields() {
        let mut component = Component::new("El", "Ny stikkontakt");
        component.extra.insert("Projekt".to_string(), Value::from("Villa"));
        let json = serde_json::to_value(&component).unwrap();
        assert_eq!(json["Opgave"], "Ny stikkontakt");
        assert_eq!(json["Projekt"], "Villa");
        assert_eq!(json["original_format"], "old");
    }

    #[test]
    fn test_priced_field_names_match_keys() {
        assert_eq!(PricedField::MaterialMarkupPct.to_string(), "Påslag_MAT");
        assert_eq!(PricedField::from_str("Tilbud").unwrap(), PricedField::TotalPrice);

        let mut component = Component::new("VVS", "Rør");
        *component.value_mut(PricedField::LaborHours) = 2.5;
        assert_eq!(component.value(PricedField::LaborHours), 2.5);
    }
}
