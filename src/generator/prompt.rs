use serde_json::json;

use super::models::GenerationContext;


pub const SYSTEM_PROMPT: &str = r#"You are an experienced Danish construction estimator. You price single work components for renovation offers.

Use the comparable components as patterns to learn realistic hours, rates, material costs and markups from. Do not copy them blindly.

Always respond with one valid JSON object and nothing else."#;


pub fn build_generation_prompt(request: &str, context: &GenerationContext) -> String {
    let comparables = if context.is_empty() {
        "None found. Estimate from general construction knowledge.".to_string()
    } else {
        let entries: Vec<_> = context
            .entries
            .iter()
            .map(|e| {
                let c = &e.component;
                json!({
                    "Opgave": c.task_description,
                    "kategori": c.category,
                    "Fag": c.trade,
                    "Timer": c.labor_hours,
                    "Takst": c.hourly_rate,
                    "Kostpris_EP": c.labor_cost,
                    "Materialer": c.material_cost,
                    "Påslag_MAT": c.material_markup_pct,
                    "Salgspris_MAT": c.material_sale_price,
                    "UE": c.subcontractor_cost,
                    "Påslag_UE": c.subcontractor_markup_pct,
                    "Salgspris_UE": c.subcontractor_sale_price,
                    "Admin": c.admin_cost,
                    "Tilbud": c.total_price,
                    "similarity_score": (e.similarity * 1000.0).round() / 1000.0,
                    "quality_score": e.quality_score,
                })
            })
            .collect();
        serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
    };

    format!(
        r#"Generate a construction component for: "{request}"

**Comparable components** ({source}):
{comparables}

**Arithmetic (always holds):**
- Kostpris_EP = Timer × Takst
- Salgspris_MAT = Materialer × (1 + Påslag_MAT/100)
- Salgspris_UE = UE × (1 + Påslag_UE/100)
- Tilbud = Admin + Kostpris_EP + Salgspris_MAT + Salgspris_UE

**Guidance:**
- Fag "Bnord" is in-house work: UE, Påslag_UE and Salgspris_UE are 0.
- Typical hourly rate (Takst) is 585 DKK, 500 DKK for Nedrivning.
- Material markup (Påslag_MAT) is usually 17-20 %.
- Collection and waste services (afhentning, affald, big bag) are flat fees: only Tilbud is set.

**Response Format (JSON):**
{{
  "Opgave": "{request}",
  "kategori": "category of the work",
  "Fag": "trade",
  "Timer": number,
  "Takst": number,
  "Kostpris_EP": number,
  "Materialer": number,
  "Påslag_MAT": number,
  "Salgspris_MAT": number,
  "UE": number,
  "Påslag_UE": number,
  "Salgspris_UE": number,
  "Admin": number,
  "Tilbud": number
}}"#,
        source = context.describe(),
    )
}


/// Follow-up prompt after a reply that could not be parsed.
pub fn build_corrective_prompt(original_prompt: &str, previous_reply: &str, error: &str) -> String {
    format!(
        r#"{original_prompt}

**Your previous reply could not be used:** {error}

Previous reply:
{previous}

Reply again with exactly one JSON object. Every numeric field must be a JSON number (use 0 when unknown), not text."#,
        previous = crate::safe_truncate(previous_reply, 1000),
    )
}
