//! Prompt assembly for icebreaker generation.
//!
//! One request per lead: a fixed system instruction plus a user message
//! built from the lead's structured fields, selected keys of its raw scrape
//! payload, and the tenant's configuration (description, output format,
//! good/bad examples). Tenant sections are omitted entirely when absent.

use crate::domains::leads::Lead;
use crate::domains::organization::IcebreakerContext;

/// Fixed system instruction for every generation call.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful writing assistant.";

/// Built-in output template used when the tenant has none configured.
pub const DEFAULT_OUTPUT_FORMAT: &str = r#"{"icebreaker": "<the icebreaker text>"}"#;

/// Raw-payload keys worth surfacing to the model, in render order.
const RAW_DATA_KEYS: &[&str] = &[
    "headline",
    "company_description",
    "company_industry",
    "company_site",
    "funding",
    "revenue",
    "seniority",
    "location",
];

/// A fully assembled chat request for one lead.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub system: String,
    pub user: String,
}

/// Build the generation request for a lead under a tenant context.
pub fn build_request(lead: &Lead, context: Option<&IcebreakerContext>) -> PromptRequest {
    let mut sections: Vec<String> = Vec::new();

    if let Some(description) = context.and_then(|c| c.description.as_deref()) {
        if !description.trim().is_empty() {
            sections.push(format!("About the sender:\n{}", description.trim()));
        }
    }

    sections.push(format!("Lead:\n{}", lead_facts(lead)));

    let first_name = if lead.first_name.trim().is_empty() {
        "there"
    } else {
        lead.first_name.trim()
    };
    sections.push(format!(
        "Write a personalized icebreaker for this lead.\n\
         Rules:\n\
         - Be laconic.\n\
         - Open with exactly: \"Hey {},\"\n\
         - 2-3 sentences max.\n\
         - Shorten company names informally (drop Inc, LLC, GmbH and the like).\n\
         - Return only a JSON object of the shape below, with no surrounding prose.",
        first_name
    ));

    let output_format = context
        .and_then(|c| c.output_format.as_deref())
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(DEFAULT_OUTPUT_FORMAT);
    sections.push(format!("Output format:\n{}", output_format.trim()));

    if let Some(context) = context {
        if let Some(examples) = render_examples("Good examples", &context.good_examples) {
            sections.push(examples);
        }
        if let Some(examples) = render_examples("Bad examples (avoid this style)", &context.bad_examples)
        {
            sections.push(examples);
        }
    }

    PromptRequest {
        system: SYSTEM_INSTRUCTION.to_string(),
        user: sections.join("\n\n"),
    }
}

/// Render the lead's structured fields plus selected raw-payload keys as
/// "Key: value" lines. A field is included only if present and non-empty;
/// array values are joined into a comma-separated string.
fn lead_facts(lead: &Lead) -> String {
    let mut lines: Vec<String> = Vec::new();

    let full_name = format!("{} {}", lead.first_name.trim(), lead.last_name.trim());
    push_fact(&mut lines, "Name", full_name.trim());
    push_fact(&mut lines, "Company", &lead.company);
    push_fact(&mut lines, "Title", &lead.title);

    for key in RAW_DATA_KEYS {
        if let Some(value) = render_raw_value(lead.raw_data.get(key)) {
            push_fact(&mut lines, &humanize_key(key), &value);
        }
    }

    lines.join("\n")
}

fn push_fact(lines: &mut Vec<String>, label: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        lines.push(format!("{}: {}", label, value));
    }
}

/// Stringify a raw-payload value: strings pass through, arrays of strings
/// are comma-joined, everything else is skipped.
fn render_raw_value(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Array(items) => {
            let joined: Vec<&str> = items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            if joined.is_empty() {
                None
            } else {
                Some(joined.join(", "))
            }
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn humanize_key(key: &str) -> String {
    let mut out = key.replace('_', " ");
    if let Some(first) = out.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    out
}

/// Render a labeled example list, or None when the list is empty.
fn render_examples(label: &str, examples: &[String]) -> Option<String> {
    let examples: Vec<&str> = examples
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect();
    if examples.is_empty() {
        return None;
    }

    let mut section = format!("{}:", label);
    for example in examples {
        section.push_str("\n- ");
        section.push_str(example);
    }
    Some(section)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn lead_with_raw_data(raw_data: serde_json::Value) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            scrape_job_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            first_name: "Sam".to_string(),
            last_name: "Rivera".to_string(),
            company: "Acme Robotics Inc".to_string(),
            title: "VP Engineering".to_string(),
            raw_data,
            icebreaker_status: "pending".to_string(),
            icebreaker: None,
            icebreaker_generated_at: None,
            created_at: Utc::now(),
        }
    }

    fn context_with(
        description: Option<&str>,
        output_format: Option<&str>,
        good: &[&str],
        bad: &[&str],
    ) -> IcebreakerContext {
        IcebreakerContext {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            description: description.map(String::from),
            output_format: output_format.map(String::from),
            good_examples: good.iter().map(|s| s.to_string()).collect(),
            bad_examples: bad.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_structured_fields_and_opener() {
        let request = build_request(&lead_with_raw_data(json!({})), None);

        assert_eq!(request.system, SYSTEM_INSTRUCTION);
        assert!(request.user.contains("Name: Sam Rivera"));
        assert!(request.user.contains("Company: Acme Robotics Inc"));
        assert!(request.user.contains("Title: VP Engineering"));
        assert!(request.user.contains("\"Hey Sam,\""));
    }

    #[test]
    fn test_raw_data_fields_included_only_when_present() {
        let raw = json!({
            "headline": "Building robots that ship",
            "funding": "",
            "revenue": null,
            "location": "Austin, TX"
        });
        let request = build_request(&lead_with_raw_data(raw), None);

        assert!(request.user.contains("Headline: Building robots that ship"));
        assert!(request.user.contains("Location: Austin, TX"));
        assert!(!request.user.contains("Funding:"));
        assert!(!request.user.contains("Revenue:"));
    }

    #[test]
    fn test_array_values_joined_with_commas() {
        let raw = json!({ "company_industry": ["robotics", "manufacturing"] });
        let request = build_request(&lead_with_raw_data(raw), None);

        assert!(request
            .user
            .contains("Company industry: robotics, manufacturing"));
    }

    #[test]
    fn test_default_output_format_without_context() {
        let request = build_request(&lead_with_raw_data(json!({})), None);
        assert!(request.user.contains(DEFAULT_OUTPUT_FORMAT));
    }

    #[test]
    fn test_tenant_output_format_overrides_default() {
        let context = context_with(None, Some(r#"{"icebreaker": "<one sentence>"}"#), &[], &[]);
        let request = build_request(&lead_with_raw_data(json!({})), Some(&context));

        assert!(request.user.contains(r#"{"icebreaker": "<one sentence>"}"#));
        assert!(!request.user.contains(DEFAULT_OUTPUT_FORMAT));
    }

    #[test]
    fn test_example_sections_omitted_when_empty() {
        let request = build_request(&lead_with_raw_data(json!({})), None);
        assert!(!request.user.contains("Good examples"));
        assert!(!request.user.contains("Bad examples"));

        let context = context_with(
            Some("We sell robot arms to mid-market factories."),
            None,
            &["Hey Ana, saw the new line in Fremont."],
            &[],
        );
        let request = build_request(&lead_with_raw_data(json!({})), Some(&context));
        assert!(request.user.contains("About the sender:"));
        assert!(request
            .user
            .contains("Good examples:\n- Hey Ana, saw the new line in Fremont."));
        assert!(!request.user.contains("Bad examples"));
    }

    #[test]
    fn test_missing_first_name_falls_back() {
        let mut lead = lead_with_raw_data(json!({}));
        lead.first_name = " ".to_string();
        let request = build_request(&lead, None);
        assert!(request.user.contains("\"Hey there,\""));
    }
}
