//! Salvaging the icebreaker text out of a model response.
//!
//! The model is asked to return only `{"icebreaker": "..."}` but is not
//! trusted to: responses routinely arrive wrapped in prose, fenced, or as
//! bare text. The salvage order is: find a parseable JSON object with an
//! `icebreaker` key anywhere in the text; otherwise fall back to the raw
//! text itself. Malformed JSON is never a failure on its own — only an
//! empty result is.

/// Extract the final icebreaker string from a raw completion response.
///
/// Returns None only when nothing usable remains after cleaning.
pub fn salvage(raw: &str) -> Option<String> {
    if let Some(text) = find_icebreaker_object(raw) {
        let cleaned = clean(&text);
        if !cleaned.is_empty() {
            return Some(cleaned);
        }
    }

    let cleaned = clean(raw);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Scan for any balanced JSON object containing an "icebreaker" string key.
fn find_icebreaker_object(raw: &str) -> Option<String> {
    for (start, _) in raw.char_indices().filter(|(_, c)| *c == '{') {
        let Some(end) = matching_brace(raw, start) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw[start..=end]) else {
            continue;
        };
        if let Some(text) = value.get("icebreaker").and_then(|v| v.as_str()) {
            return Some(text.to_string());
        }
    }
    None
}

/// Find the index of the brace closing the object opened at `start`.
/// String-literal and escape aware, so braces inside values don't count.
fn matching_brace(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Unescape literal `\n` sequences and strip wrapping quotes.
fn clean(text: &str) -> String {
    let unescaped = text.replace("\\n", "\n");
    let trimmed = unescaped.trim();
    trimmed
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_surrounded_by_prose() {
        let raw = "Sure! {\"icebreaker\":\"Hey Sam, nice work.\"} Hope that helps!";
        assert_eq!(salvage(raw).unwrap(), "Hey Sam, nice work.");
    }

    #[test]
    fn test_clean_json_only() {
        let raw = r#"{"icebreaker": "Hey Maria, saw the Series B news."}"#;
        assert_eq!(salvage(raw).unwrap(), "Hey Maria, saw the Series B news.");
    }

    #[test]
    fn test_raw_text_fallback() {
        let raw = "Hey Sam, nice work on the launch.";
        assert_eq!(salvage(raw).unwrap(), "Hey Sam, nice work on the launch.");
    }

    #[test]
    fn test_raw_text_fallback_strips_quotes() {
        let raw = "\"Hey Sam, nice work on the launch.\"";
        assert_eq!(salvage(raw).unwrap(), "Hey Sam, nice work on the launch.");
    }

    #[test]
    fn test_escaped_newlines_unescaped() {
        let raw = r#"{"icebreaker": "Hey Sam,\\nGreat launch."}"#;
        assert_eq!(salvage(raw).unwrap(), "Hey Sam,\nGreat launch.");
    }

    #[test]
    fn test_malformed_json_is_not_a_failure() {
        // Unbalanced brace: no parseable object, so the raw text is used.
        let raw = "{\"icebreaker\": \"Hey Sam";
        assert!(salvage(raw).unwrap().contains("Hey Sam"));
    }

    #[test]
    fn test_braces_inside_string_values() {
        let raw = r#"Here: {"icebreaker": "Hey Sam, love the {startup} vibe."}"#;
        assert_eq!(salvage(raw).unwrap(), "Hey Sam, love the {startup} vibe.");
    }

    #[test]
    fn test_object_without_icebreaker_key_falls_back() {
        let raw = r#"{"opening_line": "Hey Sam."}"#;
        // No icebreaker key anywhere, so the raw text survives as-is.
        assert_eq!(salvage(raw).unwrap(), raw);
    }

    #[test]
    fn test_empty_response_is_unusable() {
        assert!(salvage("").is_none());
        assert!(salvage("  \"\"  ").is_none());
    }
}
