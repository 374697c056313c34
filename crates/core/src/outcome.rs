//! `Outcome`: the non-failing result type of every pipeline component.
//!
//! A component either produced its value normally, or it hit a recoverable
//! failure and produced a documented fallback value instead. Both arms carry
//! a usable value; the degraded arm also records why.

use serde::Serialize;
use thiserror::Error;

/// Why a component fell back to its documented default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Degradation {
    /// The tenant has no enabled intent definitions; the classifier was skipped.
    #[error("no intents configured")]
    NoIntentsConfigured,
    /// The classifier call failed or returned an unparseable answer.
    #[error("classifier: {0}")]
    Classifier(String),
    /// A context strategy failed internally.
    #[error("context build: {0}")]
    ContextBuild(String),
    /// A record lookup failed while assembling context.
    #[error("record lookup: {0}")]
    RecordLookup(String),
    /// The text generator failed on every path.
    #[error("generation: {0}")]
    Generation(String),
    /// The generated reply failed the language check.
    #[error("language guardrail")]
    Guardrail,
}

/// A value that is always present, possibly produced by a fallback path.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Degraded { value: T, reason: Degradation },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: Degradation) -> Self {
        Outcome::Degraded { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Ok(v) => v,
            Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Ok(v) => v,
            Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&Degradation> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    /// Transform the carried value, keeping the degradation reason.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ok(v) => Outcome::Ok(f(v)),
            Outcome::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}
