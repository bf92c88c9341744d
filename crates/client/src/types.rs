use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One retrieved chunk cited by an assistant answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub id: u64,
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub score: f64,
}

/// Trailing JSON blob of a chat stream, carrying the references the answer
/// was generated from. Older deployments name the list `results`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPayload {
    #[serde(default, alias = "results")]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub user_input: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub constraints: HashMap<String, String>,
}

/// Response of `GET /predict` against a token classification deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClassification {
    pub query_text: String,
    pub tokens: Vec<String>,
    /// Top-k tags per token, best first.
    pub predicted_tags: Vec<Vec<String>>,
}

/// Response of `GET /predict` against a text classification deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextClassification {
    pub predicted_classes: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HistorySender {
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "AI")]
    Ai,
    #[serde(other)]
    Unknown,
}

/// One persisted turn returned by history hydration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub sender: HistorySender,
    pub content: String,
    #[serde(default)]
    pub references: Vec<Reference>,
}
