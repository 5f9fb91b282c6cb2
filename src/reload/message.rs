//! Reload Message Protocol
//!
//! Defines the JSON message format for WebSocket communication between the
//! development server and browser clients.
//!
//! # Message Types
//!
//! - `reload`: trigger full page reload
//! - `css`: refresh stylesheets (optionally a named target) without reload
//! - `builderror`: surface a failed rebuild in the browser console
//! - `connected`: handshake acknowledgement

use serde::{Deserialize, Serialize};

/// Reload message sent over WebSocket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Full page reload
    Reload {
        /// Optional reason for reload
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Stylesheet refresh (fast path - no page reload)
    Css {
        /// Stylesheet file name to refresh; `None` refreshes all
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },

    /// Rebuild failed (client logs it, keeps the last good page)
    BuildError { message: String },

    /// Connection established
    Connected {
        /// Server version for compatibility check
        version: String,
    },
}

impl ReloadMessage {
    /// Create a reload message
    pub fn reload() -> Self {
        Self::Reload { reason: None }
    }

    /// Create a reload message with reason
    pub fn reload_with_reason(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    /// Create a stylesheet refresh message
    pub fn css(target: Option<&str>) -> Self {
        Self::Css {
            target: target.map(str::to_string),
        }
    }

    /// Create a build error message
    pub fn build_error(message: impl Into<String>) -> Self {
        Self::BuildError {
            message: message.into(),
        }
    }

    /// Create a connected message
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}
