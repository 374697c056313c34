//! Output language guardrail.
//!
//! A reply passes when it contains at least one character of the expected
//! script (checked case-insensitively). Anything else is replaced by a fixed
//! holding reply.

use shopbot_config::GuardrailConfig;
use shopbot_core::{Degradation, Outcome};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct LanguageGuardrail {
    expected_chars: Vec<char>,
    holding_reply: String,
}

impl LanguageGuardrail {
    pub fn new(expected_chars: &str, holding_reply: impl Into<String>) -> Self {
        Self {
            expected_chars: expected_chars.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect(),
            holding_reply: holding_reply.into(),
        }
    }

    pub fn from_config(config: &GuardrailConfig) -> Self {
        Self::new(&config.expected_chars, config.holding_reply.clone())
    }

    pub fn holding_reply(&self) -> &str {
        &self.holding_reply
    }

    pub fn conforms(&self, reply: &str) -> bool {
        reply
            .to_lowercase()
            .chars()
            .any(|c| self.expected_chars.contains(&c))
    }

    /// Pass a raw reply through, or substitute the holding reply.
    pub fn check(&self, reply: &str) -> Outcome<String> {
        let reply = reply.trim();
        if self.conforms(reply) {
            Outcome::Ok(reply.to_string())
        } else {
            warn!(chars = reply.chars().count(), "Reply failed language check");
            Outcome::degraded(self.holding_reply.clone(), Degradation::Guardrail)
        }
    }
}

impl Default for LanguageGuardrail {
    fn default() -> Self {
        Self::from_config(&GuardrailConfig::default())
    }
}
