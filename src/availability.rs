// src/availability.rs
//! Degradation signals for the optional AI-backed stages.
//!
//! Narrative generation and guardrail scoring are best effort: when they
//! cannot run, the response is assembled without them and the reason is
//! carried alongside for logging and metrics.

use std::fmt;

/// Why an AI-backed stage produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// No API key configured.
    MissingCredentials,
    /// Explicitly switched off by configuration.
    Disabled,
    /// Daily call budget exhausted.
    DailyLimitReached,
    /// Network or provider failure.
    Transport(String),
    /// Provider did not answer in time.
    Timeout,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::MissingCredentials => write!(f, "missing credentials"),
            Unavailable::Disabled => write!(f, "disabled by configuration"),
            Unavailable::DailyLimitReached => write!(f, "daily limit reached"),
            Unavailable::Transport(msg) => write!(f, "transport failure: {msg}"),
            Unavailable::Timeout => write!(f, "timed out"),
        }
    }
}

/// Outcome of a stage that is allowed to degrade.
pub type BestEffort<T> = Result<T, Unavailable>;
