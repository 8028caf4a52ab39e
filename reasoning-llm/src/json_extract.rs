//! Strict-then-lenient JSON object extraction from raw LLM text.

/// Try, in order: (1) the whole string as JSON, (2) a fenced ```json code
/// block, (3) the outermost `{...}` slice. Returns `None` if none of the
/// three yield a JSON object.
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    if let Some(value) = try_direct(text) {
        return Some(value);
    }
    if let Some(value) = try_fenced_block(text) {
        return Some(value);
    }
    try_outermost_braces(text)
}

fn try_direct(text: &str) -> Option<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
    value.is_object().then_some(value)
}

fn try_fenced_block(text: &str) -> Option<serde_json::Value> {
    let fence_start = text.find("```json").or_else(|| text.find("```"))?;
    let after_fence = &text[fence_start..];
    let body_start = after_fence.find('\n').map(|i| i + 1)?;
    let body = &after_fence[body_start..];
    let fence_end = body.find("```")?;
    let candidate = &body[..fence_end];
    let value: serde_json::Value = serde_json::from_str(candidate.trim()).ok()?;
    value.is_object().then_some(value)
}

fn try_outermost_braces(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &text[start..=end];
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    value.is_object().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_json_parses() {
        let text = r#"{"keywords": ["a", "b"]}"#;
        assert_eq!(
            extract_json_object(text),
            Some(json!({"keywords": ["a", "b"]}))
        );
    }

    #[test]
    fn fenced_code_block_parses() {
        let text = "Here is the plan:\n```json\n{\"action\": \"execute_capability\"}\n```\nDone.";
        assert_eq!(
            extract_json_object(text),
            Some(json!({"action": "execute_capability"}))
        );
    }

    #[test]
    fn outermost_braces_parse_when_surrounded_by_prose() {
        let text = "Sure, the result is {\"goal_actions\": [\"query\"]} as requested.";
        assert_eq!(
            extract_json_object(text),
            Some(json!({"goal_actions": ["query"]}))
        );
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert_eq!(extract_json_object("[1, 2, 3]"), None);
    }

    #[test]
    fn no_json_anywhere_returns_none() {
        assert_eq!(extract_json_object("no json content here"), None);
    }
}
