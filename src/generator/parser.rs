use serde_json::{Map, Value};
use strum::IntoEnumIterator;

use crate::core::error::{EstimatorError, Result};
use crate::knowledge_base::{Component, FormatTag, PricedField};


/// Slice of `reply` holding the outermost JSON object, tolerating markdown
/// fences and chatter around it.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}


/// Reads a model reply into a fresh, unreconciled component.
///
/// `request` fills in a missing task description and `default_category` a
/// missing category. Numeric fields that are absent or `null` become 0.
pub fn parse_component(reply: &str, request: &str, default_category: &str) -> Result<Component> {
    let json = extract_json_object(reply)
        .ok_or_else(|| EstimatorError::GenerationParse("no JSON object in reply".to_string()))?;

    let mut object: Map<String, Value> = serde_json::from_str(json)
        .map_err(|e| EstimatorError::GenerationParse(format!("invalid JSON: {e}")))?;

    let task_description = take_text(&mut object, "Opgave")?
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| request.to_string());
    let category = take_text(&mut object, "kategori")?
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default_category.to_string());

    let mut component = Component::new(category, task_description);
    component.trade = take_text(&mut object, "Fag")?.unwrap_or_default();
    component.format_tag = FormatTag::Complete;

    for field in PricedField::iter() {
        let key: &'static str = field.into();
        *component.value_mut(field) = match object.remove(key) {
            None | Some(Value::Null) => 0.0,
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| {
                EstimatorError::GenerationParse(format!("{key} is not a finite number"))
            })?,
            Some(other) => {
                return Err(EstimatorError::GenerationParse(format!(
                    "{key} must be a number, got {other}"
                )));
            }
        };
    }

    // Provenance keys are never taken from the model.
    object.remove("source_file");
    object.remove("original_format");
    component.extra = object;

    Ok(component)
}


fn take_text(object: &mut Map<String, Value>, key: &str) -> Result<Option<String>> {
    match object.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(EstimatorError::GenerationParse(format!(
            "{key} must be text, got {other}"
        ))),
    }
}
