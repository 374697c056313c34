//! Intent router: decides which context strategy handles a message.
//!
//! The classifier sees only the intent type names, the last few history
//! messages and the current message, and must answer with one JSON object.
//! Any failure degrades to `others` at 0.5 without retrying: a wrong route
//! only changes which context is assembled, never whether a reply is sent.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use shopbot_core::{
    ClassificationResult, Degradation, GenerationRequest, IntentDefinition, Message, Outcome,
    TextGenerator, recent, transcript,
};
use tracing::{debug, info, warn};

const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Classifies messages with an external text generator.
pub struct IntentRouter {
    generator: Arc<dyn TextGenerator>,
    history_turns: usize,
}

/// The classifier's answer, loosely typed so partial answers still parse.
#[derive(Debug, Deserialize)]
struct RawClassification {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    related_intents: Option<Value>,
}

impl IntentRouter {
    pub fn new(generator: Arc<dyn TextGenerator>, history_turns: usize) -> Self {
        Self {
            generator,
            history_turns,
        }
    }

    /// Classify `message` against the tenant's enabled intents.
    ///
    /// With no intents the classifier is never called.
    pub async fn classify(
        &self,
        message: &str,
        history: &[Message],
        intents: &[IntentDefinition],
    ) -> Outcome<ClassificationResult> {
        if intents.is_empty() {
            debug!("No enabled intents, skipping classifier");
            return Outcome::degraded(ClassificationResult::fallback(), Degradation::NoIntentsConfigured);
        }

        let prompt = self.classification_prompt(message, history, intents);
        let started = Instant::now();
        let response = self.generator.complete(GenerationRequest::new(prompt, 0.0)).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let text = match response {
            Ok(response) => response.text,
            Err(e) => {
                warn!(error = %e, elapsed_ms, "Intent classification failed");
                return Outcome::degraded(ClassificationResult::fallback(), Degradation::Classifier(e.to_string()));
            }
        };

        match parse_classification(&text) {
            Ok(result) => {
                info!(
                    intent = %result.intent_type,
                    confidence = result.confidence,
                    elapsed_ms,
                    "Intent classified"
                );
                Outcome::Ok(result)
            }
            Err(reason) => {
                warn!(reason = %reason, elapsed_ms, "Unusable classifier answer");
                Outcome::degraded(ClassificationResult::fallback(), Degradation::Classifier(reason))
            }
        }
    }

    fn classification_prompt(&self, message: &str, history: &[Message], intents: &[IntentDefinition]) -> String {
        let intent_list = intents
            .iter()
            .map(|i| i.intent_type.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let conversation = transcript(recent(history, self.history_turns));

        format!(
            "You are an intent classifier.\n\n\
             INTENTS:\n{intent_list}\n\n\
             Conversation:\n{conversation}\n\n\
             User message:\n{message}\n\n\
             Return ONLY a valid JSON object in this format:\n\
             {{\"intent\": \"...\", \"confidence\": 0.0-1.0, \"related_intents\": []}}\n\n\
             No markdown. No explanation."
        )
    }
}

/// Parse the classifier answer, coercing confidence and related intents.
fn parse_classification(text: &str) -> Result<ClassificationResult, String> {
    let raw: RawClassification =
        serde_json::from_str(strip_code_fence(text)).map_err(|e| format!("invalid JSON: {e}"))?;

    let intent_type = raw
        .intent
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "missing intent".to_string())?;

    let confidence = raw
        .confidence
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .map(|c| c as f32)
        .filter(|c| (0.0..=1.0).contains(c))
        .unwrap_or(DEFAULT_CONFIDENCE);

    let related_intents = match raw.related_intents {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    };

    Ok(ClassificationResult {
        intent_type,
        confidence,
        related_intents,
    })
}

/// Models sometimes wrap JSON in a ```json fence despite being told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn router(generator: Arc<dyn TextGenerator>) -> IntentRouter {
        IntentRouter::new(generator, 2)
    }

    fn intents() -> Vec<IntentDefinition> {
        vec![intent(1, "greetings", None), intent(2, "store_info", None)]
    }

    #[tokio::test]
    async fn no_intents_skips_classifier() {
        let generator = Arc::new(SequentialMockGenerator::texts(&[]));
        let outcome = router(generator.clone()).classify("Xin chào", &[], &[]).await;

        assert_eq!(outcome.value(), &ClassificationResult::fallback());
        assert_eq!(outcome.reason(), Some(&Degradation::NoIntentsConfigured));
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn classifies_with_deterministic_sampling() {
        let generator = Arc::new(SequentialMockGenerator::texts(&[
            r#"{"intent": "greetings", "confidence": 0.92, "related_intents": ["store_info"]}"#,
        ]));
        let outcome = router(generator.clone()).classify("Xin chào", &[], &intents()).await;

        assert!(!outcome.is_degraded());
        let result = outcome.into_value();
        assert_eq!(result.intent_type, "greetings");
        assert!((result.confidence - 0.92).abs() < 1e-6);
        assert_eq!(result.related_intents, vec!["store_info"]);
        assert_eq!(generator.requests()[0].temperature, 0.0);
    }

    #[tokio::test]
    async fn prompt_lists_type_names_and_last_two_turns() {
        let generator = Arc::new(SequentialMockGenerator::texts(&[r#"{"intent": "store_info"}"#]));
        let history = vec![
            Message::user("tin nhắn cũ nhất"),
            Message::assistant("trả lời cũ"),
            Message::user("shop ở đâu"),
            Message::assistant("Dạ shop ở Quận 1"),
        ];
        let mut defs = intents();
        defs[0].description = Some("mô tả không gửi đi".into());

        router(generator.clone()).classify("mấy giờ mở cửa", &history, &defs).await;

        let prompt = &generator.requests()[0].prompt;
        assert!(prompt.contains("INTENTS:\ngreetings\nstore_info"));
        assert!(prompt.contains("user: shop ở đâu\nassistant: Dạ shop ở Quận 1"));
        assert!(!prompt.contains("tin nhắn cũ nhất"));
        assert!(!prompt.contains("mô tả không gửi đi"));
        assert!(prompt.contains("User message:\nmấy giờ mở cửa"));
    }

    #[tokio::test]
    async fn malformed_json_degrades_without_retry() {
        let generator = Arc::new(SequentialMockGenerator::texts(&["I think it's a greeting"]));
        let outcome = router(generator.clone()).classify("Xin chào", &[], &intents()).await;

        assert_eq!(outcome.value(), &ClassificationResult::fallback());
        assert!(matches!(outcome.reason(), Some(Degradation::Classifier(_))));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn transport_failure_degrades() {
        let generator = Arc::new(FailingGenerator::new(false));
        let outcome = router(generator.clone()).classify("Xin chào", &[], &intents()).await;

        assert_eq!(outcome.value(), &ClassificationResult::fallback());
        assert_eq!(generator.call_count(), 1);
    }

    #[test]
    fn missing_or_empty_intent_is_rejected() {
        assert!(parse_classification(r#"{"confidence": 0.9}"#).is_err());
        assert!(parse_classification(r#"{"intent": "  "}"#).is_err());
    }

    #[test]
    fn invalid_confidence_coerced() {
        let out_of_range = parse_classification(r#"{"intent": "greetings", "confidence": 7}"#).unwrap();
        assert_eq!(out_of_range.confidence, 0.5);

        let missing = parse_classification(r#"{"intent": "greetings"}"#).unwrap();
        assert_eq!(missing.confidence, 0.5);

        let text = parse_classification(r#"{"intent": "greetings", "confidence": "0.8"}"#).unwrap();
        assert!((text.confidence - 0.8).abs() < 1e-6);

        let garbage = parse_classification(r#"{"intent": "greetings", "confidence": [1]}"#).unwrap();
        assert_eq!(garbage.confidence, 0.5);
    }

    #[test]
    fn related_intents_tolerate_bad_shapes() {
        let parsed = parse_classification(r#"{"intent": "a", "related_intents": "b"}"#).unwrap();
        assert!(parsed.related_intents.is_empty());

        let parsed = parse_classification(r#"{"intent": "a", "related_intents": ["b", 3, null]}"#).unwrap();
        assert_eq!(parsed.related_intents, vec!["b"]);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let parsed = parse_classification("```json\n{\"intent\": \"greetings\", \"confidence\": 1}\n```").unwrap();
        assert_eq!(parsed.intent_type, "greetings");
        assert_eq!(parsed.confidence, 1.0);
    }
}
