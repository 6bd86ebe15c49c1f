//! Core types shared between the stress tester components

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Alert category used when the payload carries no `type` field
pub const UNKNOWN_ALERT_TYPE: &str = "N/A";

/// Component identifier attached to every log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Top-level run lifecycle
    Harness,
    /// Periodic worker spawn loop
    Launcher,
    /// Periodic liveness sweep
    Monitor,
    /// Inbound alert endpoint
    Listener,
    /// Shutdown sequence
    Coordinator,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Harness => write!(f, "harness"),
            Component::Launcher => write!(f, "launcher"),
            Component::Monitor => write!(f, "monitor"),
            Component::Listener => write!(f, "listener"),
            Component::Coordinator => write!(f, "coordinator"),
        }
    }
}

/// One entry of an alert's `messages` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMessage {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// Alert payload posted by the media server's alert callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type", default = "unknown_alert_type")]
    pub alert_type: String,
    #[serde(default)]
    pub messages: Vec<AlertMessage>,
}

fn unknown_alert_type() -> String {
    UNKNOWN_ALERT_TYPE.to_string()
}

impl Alert {
    /// Parse an alert from a raw request body
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

/// Which alert categories and message codes mean the target has degraded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRules {
    pub categories: BTreeSet<String>,
    pub codes: BTreeSet<String>,
}

impl AlertRules {
    pub fn new<C, M>(categories: C, codes: M) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    /// First qualifying code in the alert, if its category is recognized
    pub fn qualifying_code<'a>(&self, alert: &'a Alert) -> Option<&'a str> {
        if !self.categories.contains(&alert.alert_type) {
            return None;
        }

        alert
            .messages
            .iter()
            .map(|message| message.code.as_str())
            .find(|code| self.codes.contains(*code))
    }
}

impl Default for AlertRules {
    fn default() -> Self {
        Self::new(
            ["INTERNAL_QUEUE", "EGRESS"],
            [
                "INTERNAL_QUEUE_CONGESTION",
                "EGRESS_STREAM_CREATION_FAILED_BY_OUTPUT_PROFILE",
                "EGRESS_STREAM_CREATION_FAILED_BY_DECODER",
                "EGRESS_STREAM_CREATION_FAILED_BY_ENCODER",
                "EGRESS_STREAM_CREATION_FAILED_BY_FILTER",
            ],
        )
    }
}
