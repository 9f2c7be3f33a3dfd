//! Shared types and fixed reply literals for the Baraza gateway.
//!
//! This crate holds the values that cross crate boundaries: the result union
//! returned by the retrieval+generation backend, the literal notices the
//! gateway sends to clients, and the small configuration enums that select
//! how a gateway deployment behaves.
//!
//! Nothing here performs I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

mod result;
pub use result::BackendResult;

/// Reply sent when a query arrives while the dispatch slot is taken.
pub const BUSY_NOTICE: &str = "System is busy processing another request. Please wait.";

/// Reply sent when the backend call fails for any reason.
pub const FAILURE_NOTICE: &str = "An error occurred while processing your request.";

/// Text substituted for an absent backend result.
pub const NO_RESPONSE_NOTICE: &str = "No response generated.";

/// Whether normalized responses are echoed back over the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    /// Every normalized response is sent to the client and spoken.
    #[default]
    Echo,
    /// Responses are only spoken; the client sees busy/failure notices only.
    SpeakOnly,
}

impl ReplyMode {
    /// Returns `true` if successful responses go back to the client.
    pub fn echoes(self) -> bool {
        matches!(self, Self::Echo)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::SpeakOnly => "speak_only",
        }
    }
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplyMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "echo" => Ok(Self::Echo),
            "speak_only" => Ok(Self::SpeakOnly),
            _ => Err(ParseSettingError {
                setting: "reply_mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Who owns the single-flight dispatch slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyScope {
    /// Each connection has its own slot; connections never starve each other.
    #[default]
    Session,
    /// One admission gate shared by every connection in the process.
    Process,
}

impl BusyScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Process => "process",
        }
    }
}

impl fmt::Display for BusyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusyScope {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(Self::Session),
            "process" => Ok(Self::Process),
            _ => Err(ParseSettingError {
                setting: "busy_scope",
                value: s.to_string(),
            }),
        }
    }
}

/// Error returned when a setting string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {setting}: {value}")]
pub struct ParseSettingError {
    pub setting: &'static str,
    pub value: String,
}

/// Lifecycle of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgrade accepted, socket not yet split.
    Connecting,
    /// Receive loop running.
    Open,
    /// Receive loop exited; outgoing frames are being flushed.
    Closing,
    /// Socket closed. Terminal.
    Closed,
}

impl SessionState {
    /// Returns `true` if the transition `self -> next` is allowed.
    ///
    /// States only move forward, one step at a time, except that any
    /// non-terminal state may jump to `Closing` when the peer vanishes.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Connecting, Open) | (Connecting, Closing) | (Open, Closing) | (Closing, Closed)
        )
    }
}
