/// Curation service: prompts for the generative-language API and tolerant
/// parsing of its replies.
///
/// The endpoint returns a JSON envelope whose interesting payload is a text
/// field that may wrap the requested JSON in markdown fences or prose.
/// Every parse failure collapses to a renderable placeholder so the
/// workflow UI never dies on a malformed reply.
use crate::tab_data::TabInfo;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Tabs rated at or above this make it into the learning plan.
pub const HIGH_RATING_THRESHOLD: f64 = 7.0;

/// Fallback reading time when the model returns none or garbage.
pub const DEFAULT_READ_MINUTES: u32 = 30;

/// Step 1 result: the inferred intent and which tab titles serve it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabIntent {
    pub intent: String,
    #[serde(default)]
    pub relevant_tabs: Vec<String>,
}

/// Step 2 result, one per rated tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRating {
    pub tab_id: i32,
    pub rating: f64,
    pub explanation: String,
}

impl ContentRating {
    /// Placeholder produced when rating a tab fails.
    pub fn failed(tab_id: i32, reason: &str) -> Self {
        ContentRating {
            tab_id,
            rating: 0.0,
            explanation: format!("Error: {}", reason),
        }
    }

    pub fn is_high(&self) -> bool {
        self.rating >= HIGH_RATING_THRESHOLD
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingItem {
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default = "default_read_minutes", deserialize_with = "lenient_minutes")]
    pub estimated_time: u32,
}

fn untitled() -> String {
    "Untitled".to_string()
}

fn default_read_minutes() -> u32 {
    DEFAULT_READ_MINUTES
}

// models return estimatedTime as 30, "30", or worse
fn lenient_minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().map_or(DEFAULT_READ_MINUTES, |f| f.max(0.0) as u32),
        Value::String(s) => s.trim().parse().unwrap_or(DEFAULT_READ_MINUTES),
        _ => DEFAULT_READ_MINUTES,
    })
}

/// Step 3 result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LearningPlan {
    pub reading_sequence: Vec<ReadingItem>,
    pub practical_exercises: Vec<String>,
    pub implementation_steps: Vec<String>,
    pub next_actions: Vec<String>,
}

impl LearningPlan {
    /// Placeholder rendered when plan generation fails.
    pub fn failed() -> Self {
        LearningPlan {
            reading_sequence: Vec::new(),
            practical_exercises: vec!["Failed to generate exercises".to_string()],
            implementation_steps: vec!["Failed to generate steps".to_string()],
            next_actions: vec!["Please try again".to_string()],
        }
    }
}

// ---- prompt builders ----

pub fn intent_prompt(tabs: &[TabInfo]) -> String {
    let tabs_info: Vec<Value> = tabs
        .iter()
        .map(|tab| serde_json::json!({ "title": tab.title, "url": tab.url }))
        .collect();
    let listing = serde_json::to_string_pretty(&tabs_info).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are a JSON output generator. Given these tabs:\n{listing}\n\n\
         Return ONLY a JSON object with two fields:\n\
         1. \"intent\": the single intent common across most tabs. Do not \
         club together multiple topics in a single intent.\n\
         2. \"relevant_tabs\": an array of the tab titles relevant to that \
         intent.\n\n\
         DO NOT include any other text, markdown formatting, or explanation."
    )
}

pub fn rating_prompt(intent: &str, tab: &TabInfo) -> String {
    format!(
        "Rate this article based on its relevance to: \"{intent}\"\n\n\
         Title: {title}\n\
         URL: {url}\n\n\
         Return the rating in this exact JSON format without any additional text:\n\
         {{\n  \"rating\": number between 0 and 10,\n  \"explanation\": \"brief explanation of rating\"\n}}",
        title = tab.title,
        url = tab.url,
    )
}

pub fn plan_prompt(articles: &[(ContentRating, TabInfo)]) -> String {
    let listing: Vec<Value> = articles
        .iter()
        .map(|(rating, tab)| {
            serde_json::json!({
                "title": tab.title,
                "url": tab.url,
                "rating": rating.rating,
            })
        })
        .collect();
    let articles_json = serde_json::to_string(&listing).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Create a structured learning plan from these high-rated articles.\n\
         Return ONLY a JSON object with this exact structure:\n\
         {{\n\
           \"readingSequence\": [{{ \"title\": \"string\", \"estimatedTime\": \"number\" }}],\n\
           \"practicalExercises\": [\"string\"],\n\
           \"implementationSteps\": [\"string\"],\n\
           \"nextActions\": [\"string\"]\n\
         }}\n\n\
         Articles: {articles_json}\n\n\
         DO NOT include any other text, markdown formatting, or explanation."
    )
}

pub fn summary_prompt(content: &str) -> String {
    format!(
        "Please provide a concise summary of the following content in at \
         least 5 bullet points and at most 10 points. Return the output in \
         HTML format: {content}"
    )
}

// ---- response parsing ----

/// Pull the first candidate's text out of a generative-API response body.
pub fn candidate_text(body: &str) -> Option<String> {
    let envelope: Value = serde_json::from_str(body).ok()?;
    envelope["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::to_string)
}

/// Strip one leading and one trailing markdown code fence, if present.
pub fn strip_code_fence(text: &str) -> String {
    static OPEN: OnceLock<Regex> = OnceLock::new();
    static CLOSE: OnceLock<Regex> = OnceLock::new();
    let open = OPEN.get_or_init(|| Regex::new(r"^```[a-zA-Z]*\s*").expect("fence regex"));
    let close = CLOSE.get_or_init(|| Regex::new(r"\s*```$").expect("fence regex"));

    let trimmed = text.trim();
    let without_open = open.replace(trimmed, "");
    close.replace(&without_open, "").to_string()
}

/// First balanced `{...}` object in the text, found by bracket matching so
/// surrounding prose or fences do not confuse the parse.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn candidate_json<T: for<'de> Deserialize<'de>>(body: &str) -> Option<T> {
    let text = candidate_text(body)?;
    let cleaned = strip_code_fence(&text);
    let object = extract_json_object(&cleaned)?;
    serde_json::from_str(object).ok()
}

/// Step 1: parse the intent reply, falling back to an error placeholder.
pub fn parse_intent(body: &str) -> TabIntent {
    if candidate_text(body).is_none() {
        return TabIntent {
            intent: "Error: invalid API response".to_string(),
            relevant_tabs: Vec::new(),
        };
    }
    candidate_json(body).unwrap_or_else(|| TabIntent {
        intent: "Failed to parse intent".to_string(),
        relevant_tabs: Vec::new(),
    })
}

/// Step 2: parse one rating reply; failures become a zero rating.
pub fn parse_rating(body: &str, tab_id: i32) -> ContentRating {
    #[derive(Deserialize)]
    struct RawRating {
        rating: f64,
        explanation: String,
    }

    match candidate_json::<RawRating>(body) {
        Some(raw) => ContentRating {
            tab_id,
            rating: raw.rating.clamp(0.0, 10.0),
            explanation: raw.explanation,
        },
        None => ContentRating::failed(tab_id, "failed to rate content"),
    }
}

/// Step 3: parse the plan reply, falling back to the failure placeholder.
pub fn parse_plan(body: &str) -> LearningPlan {
    candidate_json(body).unwrap_or_else(LearningPlan::failed)
}

/// Summarizer: fence-stripped HTML, or an apology the UI can show as-is.
pub fn parse_summary(body: &str) -> String {
    match candidate_text(body) {
        Some(text) => strip_code_fence(&text),
        None => "Failed to generate summary. Please try again.".to_string(),
    }
}

/// The tabs that survive into step 3, paired with their ratings.
pub fn high_rated(ratings: &[ContentRating], tabs: &[TabInfo]) -> Vec<(ContentRating, TabInfo)> {
    ratings
        .iter()
        .filter(|rating| rating.is_high())
        .filter_map(|rating| {
            tabs.iter()
                .find(|tab| tab.id == rating.tab_id)
                .map(|tab| (rating.clone(), tab.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(text: &str) -> String {
        serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    fn tab(id: i32, title: &str) -> TabInfo {
        TabInfo {
            id,
            url: format!("https://example.com/{id}"),
            title: title.to_string(),
            active: false,
            window_id: None,
        }
    }

    #[test]
    fn test_candidate_text() {
        assert_eq!(candidate_text(&envelope("hello")), Some("hello".to_string()));
        assert_eq!(candidate_text("{}"), None);
        assert_eq!(candidate_text("not json"), None);
        assert_eq!(candidate_text(r#"{"candidates": []}"#), None);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```html\n<ul></ul>\n```"), "<ul></ul>");
        assert_eq!(strip_code_fence("no fences"), "no fences");
        assert_eq!(strip_code_fence("```\nbare\n```"), "bare");
    }

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
        assert_eq!(
            extract_json_object(r#"Sure! Here you go: {"a": {"b": 2}} hope it helps"#),
            Some(r#"{"a": {"b": 2}}"#)
        );
        // braces inside strings must not unbalance the match
        assert_eq!(
            extract_json_object(r#"{"text": "a } inside"}"#),
            Some(r#"{"text": "a } inside"}"#)
        );
        assert_eq!(
            extract_json_object(r#"{"text": "escaped \" quote }"}"#),
            Some(r#"{"text": "escaped \" quote }"}"#)
        );
        assert_eq!(extract_json_object("no object here"), None);
        assert_eq!(extract_json_object("{unclosed"), None);
    }

    #[test]
    fn test_parse_intent_happy_path() {
        let body = envelope(
            "```json\n{\"intent\": \"learn rust\", \"relevant_tabs\": [\"The Book\"]}\n```",
        );
        let intent = parse_intent(&body);
        assert_eq!(intent.intent, "learn rust");
        assert_eq!(intent.relevant_tabs, vec!["The Book".to_string()]);
    }

    #[test]
    fn test_parse_intent_fallbacks() {
        let no_candidate = parse_intent("{}");
        assert_eq!(no_candidate.intent, "Error: invalid API response");

        let garbage = parse_intent(&envelope("I refuse to answer in JSON"));
        assert_eq!(garbage.intent, "Failed to parse intent");
        assert!(garbage.relevant_tabs.is_empty());
    }

    #[test]
    fn test_parse_rating() {
        let body = envelope(r#"{"rating": 8.5, "explanation": "directly on topic"}"#);
        let rating = parse_rating(&body, 3);
        assert_eq!(rating.tab_id, 3);
        assert_eq!(rating.rating, 8.5);
        assert!(rating.is_high());

        let bad = parse_rating(&envelope("oops"), 4);
        assert_eq!(bad.rating, 0.0);
        assert!(bad.explanation.starts_with("Error:"));
        assert!(!bad.is_high());
    }

    #[test]
    fn test_parse_rating_clamps_out_of_range() {
        let body = envelope(r#"{"rating": 14, "explanation": "enthusiastic"}"#);
        assert_eq!(parse_rating(&body, 1).rating, 10.0);
    }

    #[test]
    fn test_parse_plan_lenient_estimated_time() {
        let body = envelope(
            r#"{
                "readingSequence": [
                    {"title": "A", "estimatedTime": 20},
                    {"title": "B", "estimatedTime": "45"},
                    {"title": "C", "estimatedTime": "soonish"},
                    {"estimatedTime": 10}
                ],
                "practicalExercises": ["do a thing"],
                "implementationSteps": [],
                "nextActions": ["read A"]
            }"#,
        );
        let plan = parse_plan(&body);
        let times: Vec<u32> = plan.reading_sequence.iter().map(|item| item.estimated_time).collect();
        assert_eq!(times, vec![20, 45, DEFAULT_READ_MINUTES, 10]);
        assert_eq!(plan.reading_sequence[3].title, "Untitled");
    }

    #[test]
    fn test_parse_plan_fallback() {
        let plan = parse_plan(&envelope("no json at all"));
        assert_eq!(plan, LearningPlan::failed());
        assert!(plan.reading_sequence.is_empty());
    }

    #[test]
    fn test_parse_summary() {
        let body = envelope("```html\n<ul><li>point</li></ul>\n```");
        assert_eq!(parse_summary(&body), "<ul><li>point</li></ul>");
        assert_eq!(
            parse_summary("{}"),
            "Failed to generate summary. Please try again."
        );
    }

    #[test]
    fn test_high_rated_pairs_ratings_with_tabs() {
        let tabs = vec![tab(1, "A"), tab(2, "B"), tab(3, "C")];
        let ratings = vec![
            ContentRating { tab_id: 1, rating: 9.0, explanation: String::new() },
            ContentRating { tab_id: 2, rating: 3.0, explanation: String::new() },
            ContentRating { tab_id: 4, rating: 8.0, explanation: String::new() }, // closed tab
        ];
        let picked = high_rated(&ratings, &tabs);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].1.title, "A");
    }

    #[test]
    fn test_prompts_carry_inputs() {
        let tabs = vec![tab(1, "Rust Book")];
        assert!(intent_prompt(&tabs).contains("Rust Book"));
        assert!(rating_prompt("learn rust", &tabs[0]).contains("learn rust"));
        assert!(summary_prompt("page words").contains("page words"));

        let articles = vec![(
            ContentRating { tab_id: 1, rating: 9.0, explanation: String::new() },
            tabs[0].clone(),
        )];
        let prompt = plan_prompt(&articles);
        assert!(prompt.contains("Rust Book"));
        assert!(prompt.contains("readingSequence"));
    }
}
