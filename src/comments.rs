//! Review record cleanup: raw Tiki review JSON -> plain comment text.

use serde_json::Value;

use crate::error::AnalyzeError;

/// Extract and clean the `content` field of a single raw review record.
///
/// A missing or null `content` becomes the empty string. Newlines and
/// carriage returns are each replaced by a single space (no run collapsing).
/// Fails only when the record itself is not a JSON object.
pub fn parse_comment(comment: &Value) -> Result<String, AnalyzeError> {
    let obj = comment
        .as_object()
        .ok_or_else(|| AnalyzeError::InvalidCommentShape(comment.to_string()))?;

    let content = obj
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    Ok(content.replace('\n', " ").replace('\r', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_replaces_newlines_and_carriage_returns() {
        let raw = json!({"content": "line one\nline two\r\nline three"});
        let cleaned = parse_comment(&raw).unwrap();
        assert_eq!(cleaned, "line one line two  line three");
    }

    #[test]
    fn test_missing_content_yields_empty_string() {
        let raw = json!({"rating": 5});
        assert_eq!(parse_comment(&raw).unwrap(), "");
    }

    #[test]
    fn test_null_content_yields_empty_string() {
        let raw = json!({"content": null});
        assert_eq!(parse_comment(&raw).unwrap(), "");
    }

    #[test]
    fn test_idempotent_on_clean_input() {
        let raw = json!({"content": "already clean text"});
        let once = parse_comment(&raw).unwrap();
        let twice = parse_comment(&json!({ "content": once })).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_object_is_rejected() {
        let raw = json!(["not", "a", "mapping"]);
        assert!(matches!(
            parse_comment(&raw),
            Err(AnalyzeError::InvalidCommentShape(_))
        ));
    }
}
