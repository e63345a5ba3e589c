//! Article records and the persisted result descriptor.
//!
//! The result file at `results/<job_id>.json` is the *sole* completion
//! signal for a job, and its shape is part of the inter-process protocol:
//! a bare JSON array of articles on success, or `{"error": "..."}` on
//! failure. [`ResultDescriptor`] models both with an untagged enum so the
//! on-disk bytes match what independently deployed pollers expect.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One detected article on a newspaper page.
///
/// All text fields are Hindi, as produced by the vision model. Ordering
/// within a result array follows on-page position: top-to-bottom, then
/// left-to-right, pages in document order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    /// Main headline.
    pub headline: String,
    /// Enumerated category, serialised as a bare Hindi string.
    pub category: Category,
    /// Concise neutral summary, roughly 50-70 words.
    pub summary: String,
    /// Complete article text.
    pub full_text: String,
    /// Complete text wrapped in HTML `<p>` tags for direct rendering.
    #[serde(default)]
    pub formatted_text: String,
}

/// Newspaper section category.
///
/// The six canonical values mirror the instruction template. Models
/// occasionally invent a seventh; [`Category::Other`] preserves such strings
/// verbatim instead of failing the whole parse over one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// राजनीति — politics
    Politics,
    /// खेल — sports
    Sports,
    /// मनोरंजन — entertainment
    Entertainment,
    /// व्यापार — business
    Business,
    /// स्थानीय — local
    Local,
    /// दुनिया — world
    World,
    /// Any other label the model produced, kept as-is.
    Other(String),
}

impl Category {
    /// The canonical Hindi labels, in prompt order.
    pub const KNOWN: [&'static str; 6] = [
        "राजनीति",
        "खेल",
        "मनोरंजन",
        "व्यापार",
        "स्थानीय",
        "दुनिया",
    ];

    /// The Hindi wire label for this category.
    pub fn as_str(&self) -> &str {
        match self {
            Category::Politics => "राजनीति",
            Category::Sports => "खेल",
            Category::Entertainment => "मनोरंजन",
            Category::Business => "व्यापार",
            Category::Local => "स्थानीय",
            Category::World => "दुनिया",
            Category::Other(s) => s,
        }
    }

    /// Whether this is one of the six canonical categories.
    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Other(_))
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match s.trim() {
            "राजनीति" => Category::Politics,
            "खेल" => Category::Sports,
            "मनोरंजन" => Category::Entertainment,
            "व्यापार" => Category::Business,
            "स्थानीय" => Category::Local,
            "दुनिया" => Category::World,
            _ => Category::Other(s),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal error payload, `{"error": "..."}` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

/// The terminal outcome of a job, exactly as persisted and served.
///
/// Untagged: a successful job serialises to a plain article array, a failed
/// one to an error object. Deserialisation tries the array shape first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultDescriptor {
    Articles(Vec<Article>),
    Failure(ErrorEnvelope),
}

impl ResultDescriptor {
    /// Build a failure result from any displayable error.
    pub fn failure(error: impl fmt::Display) -> Self {
        ResultDescriptor::Failure(ErrorEnvelope {
            error: error.to_string(),
        })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ResultDescriptor::Failure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_article() -> Article {
        Article {
            headline: "चुनाव परिणाम घोषित".into(),
            category: Category::Politics,
            summary: "राज्य विधानसभा चुनाव के परिणाम घोषित किए गए।".into(),
            full_text: "राज्य विधानसभा चुनाव के परिणाम आज घोषित किए गए...".into(),
            formatted_text: "<p>राज्य विधानसभा चुनाव के परिणाम आज घोषित किए गए...</p>".into(),
        }
    }

    #[test]
    fn category_serialises_to_bare_hindi_string() {
        let json = serde_json::to_string(&Category::Sports).unwrap();
        assert_eq!(json, "\"खेल\"");
    }

    #[test]
    fn category_unknown_string_preserved() {
        let c: Category = serde_json::from_str("\"शिक्षा\"").unwrap();
        assert_eq!(c, Category::Other("शिक्षा".into()));
        assert!(!c.is_known());
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"शिक्षा\"");
    }

    #[test]
    fn category_all_known_round_trip() {
        for label in Category::KNOWN {
            let c: Category = Category::from(label.to_string());
            assert!(c.is_known(), "label {label} should be canonical");
            assert_eq!(c.as_str(), label);
        }
    }

    #[test]
    fn success_result_is_plain_array_on_the_wire() {
        let r = ResultDescriptor::Articles(vec![sample_article()]);
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.starts_with('['), "got: {json}");
        let back: ResultDescriptor = serde_json::from_str(&json).unwrap();
        match back {
            ResultDescriptor::Articles(a) => assert_eq!(a.len(), 1),
            ResultDescriptor::Failure(_) => panic!("round-tripped into failure"),
        }
    }

    #[test]
    fn failure_result_is_error_object_on_the_wire() {
        let r = ResultDescriptor::failure("model reply unparseable");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "{\"error\":\"model reply unparseable\"}");
        let back: ResultDescriptor = serde_json::from_str(&json).unwrap();
        assert!(back.is_failure());
    }

    #[test]
    fn article_without_formatted_text_still_parses() {
        // The single-image variant of the upstream service omitted
        // formatted_text; tolerate its absence.
        let json = r#"{"headline":"h","category":"खेल","summary":"s","full_text":"t"}"#;
        let a: Article = serde_json::from_str(json).unwrap();
        assert!(a.formatted_text.is_empty());
        assert_eq!(a.category, Category::Sports);
    }
}
