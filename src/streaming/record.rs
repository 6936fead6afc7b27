//! Stream record parsing
//!
//! One record per line. Only `choices[0].delta.content` carries text;
//! everything else in the record is ignored.

use serde::Deserialize;

/// One streamed completion record
#[derive(Debug, Default, Deserialize)]
struct StreamRecord {
    #[serde(default)]
    choices: Vec<RecordChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordChoice {
    #[serde(default)]
    delta: Option<RecordDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordDelta {
    #[serde(default)]
    content: Option<String>,
}

impl StreamRecord {
    fn into_fragment(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
    }
}

/// Extract the content delta from one complete line
///
/// Returns `None` for blank lines, malformed JSON and records without a
/// non-empty delta. None of these are errors.
pub fn parse_fragment(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamRecord>(line) {
        Ok(record) => record.into_fragment(),
        Err(e) => {
            tracing::trace!(error = %e, "skipping malformed stream record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_delta() {
        let line = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(parse_fragment(line), Some("Hello".to_string()));
    }

    #[test]
    fn test_whitespace_is_preserved_inside_content() {
        let line = r#"  {"choices":[{"delta":{"content":" world\n"}}]}  "#;
        assert_eq!(parse_fragment(line), Some(" world\n".to_string()));
    }

    #[test]
    fn test_empty_and_absent_delta() {
        assert_eq!(parse_fragment(r#"{"choices":[{"delta":{"content":""}}]}"#), None);
        assert_eq!(parse_fragment(r#"{"choices":[{"delta":{}}]}"#), None);
        assert_eq!(parse_fragment(r#"{"choices":[{"delta":{"content":null}}]}"#), None);
        assert_eq!(parse_fragment(r#"{"choices":[{}]}"#), None);
        assert_eq!(parse_fragment(r#"{"choices":[]}"#), None);
        assert_eq!(parse_fragment(r#"{"id":"abc","object":"chat.completion.chunk"}"#), None);
    }

    #[test]
    fn test_malformed_lines() {
        assert_eq!(parse_fragment("not json"), None);
        assert_eq!(parse_fragment(r#"{"choices":[{"delta":{"content":"#), None);
        assert_eq!(parse_fragment(": keep-alive"), None);
        assert_eq!(parse_fragment(r#"{"choices":[{"delta":{"content":42}}]}"#), None);
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_fragment(""), None);
        assert_eq!(parse_fragment("   \r"), None);
    }

    #[test]
    fn test_event_stream_framing_is_malformed() {
        let line = r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#;
        assert_eq!(parse_fragment(line), None);
        assert_eq!(parse_fragment("data: [DONE]"), None);
        assert_eq!(parse_fragment("data:"), None);
    }

    #[test]
    fn test_only_first_choice_is_read() {
        let line = r#"{"choices":[{"delta":{}},{"delta":{"content":"second"}}]}"#;
        assert_eq!(parse_fragment(line), None);
    }
}
