//! Tagged results that separate real answers from degraded ones.
//!
//! Every engine path has a defined degraded output (zero vector, fallback
//! vector, fallback corpus, zero score). [`Outcome`] carries the value either
//! way and records why it was degraded, so callers and tests can tell the
//! difference without inspecting logs.

use serde::Serialize;

/// Why a result was produced by a fallback path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Degradation {
    /// Input text was empty or whitespace; the zero vector was returned.
    EmptyInput,
    /// Every provider attempt failed; a fallback vector was returned.
    ProviderExhausted { attempts: u32, last_error: String },
    /// The corpus store could not be reached.
    StoreUnavailable { message: String },
    /// The corpus holds no embedded records.
    EmptyCorpus,
    /// Ranking failed for another reason.
    SearchFailed { message: String },
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degradation::EmptyInput => write!(f, "empty input"),
            Degradation::ProviderExhausted {
                attempts,
                last_error,
            } => write!(f, "provider failed after {attempts} attempts: {last_error}"),
            Degradation::StoreUnavailable { message } => {
                write!(f, "corpus store unavailable: {message}")
            }
            Degradation::EmptyCorpus => write!(f, "corpus has no embedded sources"),
            Degradation::SearchFailed { message } => write!(f, "search failed: {message}"),
        }
    }
}

/// A value that is either a real result or a well-formed fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Degraded { value: T, reason: Degradation },
}

impl<T> Outcome<T> {
    pub fn degraded(value: T, reason: Degradation) -> Self {
        Outcome::Degraded { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Outcome::Success(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Outcome::Success(value) | Outcome::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&Degradation> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Degraded { reason, .. } => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
        }
    }
}
