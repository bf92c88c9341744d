use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::ChatBackend;
use crate::controller::SessionEvent;
use crate::message::TagSpan;

/// Tag the token classifier emits for tokens outside any entity.
pub const NO_ENTITY_TAG: &str = "O";

const POLAR_LABELS: [&str; 3] = ["positive", "negative", "neutral"];
const SENTIMENT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Merge a flat token/tag sequence into spans of consecutive same-tag
/// tokens. Spans tagged [`NO_ENTITY_TAG`] are kept so the caller can
/// reconstruct the full text, but they are not entities.
pub fn merge_tag_spans(tokens: &[String], predicted_tags: &[Vec<String>]) -> Vec<TagSpan> {
    let mut spans: Vec<TagSpan> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        let tag = predicted_tags
            .get(i)
            .and_then(|tags| tags.first())
            .map(String::as_str)
            .unwrap_or(NO_ENTITY_TAG);
        match spans.last_mut() {
            Some(span) if span.tag == tag => {
                span.text.push(' ');
                span.text.push_str(token);
            }
            _ => spans.push(TagSpan {
                text: token.clone(),
                tag: tag.to_string(),
            }),
        }
    }
    spans
}

/// Pick the highest-scoring label. Polar labels that win with a score below
/// the confidence threshold are downgraded to `neutral`; any other label is
/// returned as-is.
pub fn resolve_sentiment(predicted_classes: &[(String, f64)]) -> Option<String> {
    let (label, score) = predicted_classes
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    if POLAR_LABELS.contains(&label.as_str())
        && (label == "positive" || label == "negative")
        && *score < SENTIMENT_CONFIDENCE_THRESHOLD
    {
        return Some("neutral".to_string());
    }
    Some(label.clone())
}

/// Fire-and-forget entity tagging for one message. Failures are logged and
/// swallowed; the message renders fine without annotations.
pub(crate) fn spawn_token_annotation(
    backend: Arc<dyn ChatBackend>,
    events: mpsc::Sender<SessionEvent>,
    index: usize,
    text: String,
    top_k: usize,
) {
    tokio::spawn(async move {
        match backend.predict_tokens(&text, top_k).await {
            Ok(result) => {
                let spans = merge_tag_spans(&result.tokens, &result.predicted_tags);
                let _ = events.send(SessionEvent::Annotation { index, spans }).await;
            }
            Err(err) => tracing::warn!(%err, index, "token annotation failed"),
        }
    });
}

/// Fire-and-forget sentiment classification for one human message.
pub(crate) fn spawn_sentiment_classification(
    backend: Arc<dyn ChatBackend>,
    events: mpsc::Sender<SessionEvent>,
    index: usize,
    text: String,
    top_k: usize,
) {
    tokio::spawn(async move {
        match backend.predict_classes(&text, top_k).await {
            Ok(result) => {
                if let Some(label) = resolve_sentiment(&result.predicted_classes) {
                    let _ = events.send(SessionEvent::Sentiment { index, label }).await;
                }
            }
            Err(err) => tracing::warn!(%err, index, "sentiment classification failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn consecutive_tokens_with_one_tag_merge() {
        let tokens = owned(&["John", "Smith", "lives", "in", "Texas"]);
        let tags = vec![
            owned(&["NAME"]),
            owned(&["NAME"]),
            owned(&["O"]),
            owned(&["O"]),
            owned(&["LOCATION"]),
        ];
        let spans = merge_tag_spans(&tokens, &tags);
        assert_eq!(
            spans,
            vec![
                TagSpan { text: "John Smith".into(), tag: "NAME".into() },
                TagSpan { text: "lives in".into(), tag: "O".into() },
                TagSpan { text: "Texas".into(), tag: "LOCATION".into() },
            ]
        );
    }

    #[test]
    fn missing_tags_default_to_no_entity() {
        let tokens = owned(&["a", "b"]);
        let spans = merge_tag_spans(&tokens, &[]);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].tag, NO_ENTITY_TAG);
        assert_eq!(spans[0].text, "a b");
    }

    #[test]
    fn low_confidence_polar_labels_downgrade_to_neutral() {
        let classes = vec![
            ("positive".to_string(), 0.65),
            ("neutral".to_string(), 0.2),
            ("negative".to_string(), 0.15),
        ];
        assert_eq!(resolve_sentiment(&classes).as_deref(), Some("neutral"));
    }

    #[test]
    fn confident_polar_labels_pass_through() {
        let classes = vec![
            ("positive".to_string(), 0.85),
            ("neutral".to_string(), 0.1),
            ("negative".to_string(), 0.05),
        ];
        assert_eq!(resolve_sentiment(&classes).as_deref(), Some("positive"));
    }

    #[test]
    fn non_polar_labels_ignore_the_threshold() {
        let classes = vec![
            ("urgent".to_string(), 0.4),
            ("routine".to_string(), 0.35),
        ];
        assert_eq!(resolve_sentiment(&classes).as_deref(), Some("urgent"));
    }

    #[test]
    fn empty_predictions_yield_nothing() {
        assert_eq!(resolve_sentiment(&[]), None);
    }
}
