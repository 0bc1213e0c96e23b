use schemars::JsonSchema;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::shared::llm::LlmResponse;

/// Summary used when the model omitted one or returned something other than text
pub const NO_SUMMARY_PLACEHOLDER: &str = "No summary available";

/// Suggestion list used when the model's list is missing or malformed
pub const NO_SUGGESTIONS_PLACEHOLDER: &str = "No suggestions available";

/// Summary of the degraded result returned when the reply is not a JSON object
pub const DEGRADED_SUMMARY: &str = "Error analyzing document. Please try again.";

/// Single suggestion of the degraded result
pub const DEGRADED_SUGGESTION: &str =
    "The document could not be analyzed properly. Please ensure it contains readable text.";

const DEFAULT_SCORE: f64 = 0.0;

/// Normalized review of one document
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[schemars(title = "DocumentReview")]
pub struct AnalysisResult {
    #[schemars(
        description = "Overall quality score of the document",
        range(min = 0, max = 100)
    )]
    pub score: f64,

    #[schemars(description = "Short overall assessment of the document")]
    pub summary: String,

    #[schemars(description = "Concrete, actionable improvements, most important first")]
    pub suggestions: Vec<String>,

    /// Whether the model reply could be parsed as a JSON object
    #[serde(skip)]
    #[schemars(skip)]
    is_llm_success: bool,
}

impl AnalysisResult {
    pub fn new(score: f64, summary: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self {
            score,
            summary: summary.into(),
            suggestions,
            is_llm_success: true,
        }
    }

    /// Fixed result for replies that are not a JSON object
    pub fn degraded() -> Self {
        Self {
            score: DEFAULT_SCORE,
            summary: DEGRADED_SUMMARY.to_string(),
            suggestions: vec![DEGRADED_SUGGESTION.to_string()],
            is_llm_success: false,
        }
    }
}

/// Numbers pass through unchanged; anything else scores zero
fn normalize_score(value: Option<&Value>) -> f64 {
    value.and_then(Value::as_f64).unwrap_or(DEFAULT_SCORE)
}

fn normalize_summary(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .filter(|summary| !summary.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| NO_SUMMARY_PLACEHOLDER.to_string())
}

/// An array of strings is kept as is; missing, non-array or mixed lists are replaced
fn normalize_suggestions(value: Option<&Value>) -> Vec<String> {
    let parsed = match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>(),
        _ => None,
    };

    parsed.unwrap_or_else(|| vec![NO_SUGGESTIONS_PLACEHOLDER.to_string()])
}

impl LlmResponse for AnalysisResult {
    fn from_json_object(object: &Map<String, Value>) -> Self {
        Self {
            score: normalize_score(object.get("score")),
            summary: normalize_summary(object.get("summary")),
            suggestions: normalize_suggestions(object.get("suggestions")),
            is_llm_success: true,
        }
    }

    fn fallback(_error_message: &str) -> Self {
        Self::degraded()
    }

    fn is_success(&self) -> bool {
        self.is_llm_success
    }
}
