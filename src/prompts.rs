//! Instruction templates for the vision model.
//!
//! Centralising the template here keeps the worker pipeline free of prompt
//! text and lets unit tests inspect it without a live provider. Callers can
//! override it via [`crate::config::AppConfig::instruction_template`]; the
//! constant is used only when no override is provided.

/// Default instruction template for decomposing a newspaper page.
///
/// The model receives this once, followed by every page image of the
/// document in order, and must reply with a single JSON array covering all
/// pages. Article order follows on-page position: top-to-bottom, then
/// left-to-right.
pub const DEFAULT_INSTRUCTION_TEMPLATE: &str = r#"You are an expert newspaper analyst. Analyze the provided image(s) of a Hindi news publication. When multiple images are provided, they are consecutive pages of one document, in order.

Identify all distinct news articles across all pages. For each article, provide the following details in a single JSON array of objects, ordered by the article's position on the page: top-to-bottom, then left-to-right, pages in the order given.

Each object must have these exact keys and nothing else:
1. "headline": The main headline of the article in Hindi.
2. "category": A relevant category for the news (e.g., "राजनीति", "खेल", "मनोरंजन", "व्यापार", "स्थानीय", "दुनिया").
3. "summary": A concise, neutral summary of the article in Hindi, in about 50-70 words.
4. "full_text": The complete text of the article in Hindi.
5. "formatted_text": The complete text of the article formatted nicely with HTML paragraph tags (<p>).

Ensure the JSON is perfectly valid. Output ONLY the JSON array, with no commentary and no surrounding code fences."#;
