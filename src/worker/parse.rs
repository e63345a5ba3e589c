//! Reply parsing: the model's raw text into `Vec<Article>`.
//!
//! Models routinely wrap JSON in ` ```json … ``` ` fences despite being told
//! not to. Stripping is deterministic and happens before parsing; a reply
//! that still fails to parse becomes a [`PatrikaError::MalformedReply`],
//! which the worker converts into a terminal error envelope — never a crash.

use crate::article::Article;
use crate::error::PatrikaError;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n?```\s*$").unwrap());

/// Remove surrounding code-fence markup, if present.
///
/// Tries a strict outer-fence match first; falls back to deleting any
/// stray fence markers, which also handles replies where the model fenced
/// only the opening.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        return caps[1].trim().to_string();
    }
    trimmed.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse the model reply into the article list.
pub fn parse_articles(raw: &str) -> Result<Vec<Article>, PatrikaError> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(&cleaned).map_err(|e| {
        let head: String = cleaned.chars().take(60).collect();
        PatrikaError::MalformedReply {
            detail: format!("{e} (reply started with: {})", head.escape_debug()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::Category;

    const TWO_ARTICLES: &str = r#"[
      {"headline":"चुनाव परिणाम","category":"राजनीति","summary":"सारांश","full_text":"पूरा","formatted_text":"<p>पूरा</p>"},
      {"headline":"क्रिकेट मैच","category":"खेल","summary":"सारांश","full_text":"पूरा","formatted_text":"<p>पूरा</p>"}
    ]"#;

    #[test]
    fn parses_bare_json_array() {
        let articles = parse_articles(TWO_ARTICLES).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].category, Category::Politics);
        assert_eq!(articles[1].category, Category::Sports);
    }

    #[test]
    fn parses_fenced_reply() {
        let fenced = format!("```json\n{TWO_ARTICLES}\n```");
        assert_eq!(parse_articles(&fenced).unwrap().len(), 2);
    }

    #[test]
    fn parses_fence_without_language_tag() {
        let fenced = format!("```\n{TWO_ARTICLES}\n```");
        assert_eq!(parse_articles(&fenced).unwrap().len(), 2);
    }

    #[test]
    fn strips_stray_fence_markers() {
        let messy = format!("```json{TWO_ARTICLES}");
        assert_eq!(parse_articles(&messy).unwrap().len(), 2);
    }

    #[test]
    fn empty_page_is_an_empty_array() {
        assert!(parse_articles("[]").unwrap().is_empty());
    }

    #[test]
    fn prose_reply_is_malformed() {
        let err = parse_articles("I could not find any articles, sorry.").unwrap_err();
        assert!(matches!(err, PatrikaError::MalformedReply { .. }));
    }

    #[test]
    fn object_instead_of_array_is_malformed() {
        let err = parse_articles(r#"{"articles": []}"#).unwrap_err();
        assert!(matches!(err, PatrikaError::MalformedReply { .. }));
    }

    #[test]
    fn truncated_json_is_malformed() {
        let err = parse_articles(r#"[{"headline": "h", "cat"#).unwrap_err();
        assert!(matches!(err, PatrikaError::MalformedReply { .. }));
    }
}
