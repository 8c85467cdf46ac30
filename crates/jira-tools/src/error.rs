//! Error types.
//!
//! Two families:
//! - [`JiraToolsError`]: startup/wiring failures (bad config, inconsistent catalog, client build).
//! - [`ToolError`]: the failure half of a [`crate::result::ToolResult`], produced per invocation.

use crate::policy::Denial;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JiraToolsError {
    #[error("config error: {0}")]
    Config(String),
    #[error("registry error: {0}")]
    Registry(String),
    #[error("http transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, JiraToolsError>;

/// Stable failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    PolicyDenied,
    InvalidArgument,
    ConfigError,
    AuthFailure,
    NotFoundRemote,
    ValidationFailure,
    TransientFailure,
    ServerFailure,
    Cancelled,
}

impl ToolErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnknownTool => "unknown_tool",
            Self::PolicyDenied => "policy_denied",
            Self::InvalidArgument => "invalid_argument",
            Self::ConfigError => "config_error",
            Self::AuthFailure => "auth_failure",
            Self::NotFoundRemote => "not_found_remote",
            Self::ValidationFailure => "validation_failure",
            Self::TransientFailure => "transient_failure",
            Self::ServerFailure => "server_failure",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    /// Which gate rule fired, for `policy_denied` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial: Option<Denial>,
}

impl ToolError {
    #[must_use]
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            denial: None,
        }
    }

    #[must_use]
    pub fn unknown_tool(tool_id: &str) -> Self {
        Self::new(ToolErrorKind::UnknownTool, format!("unknown tool: {tool_id}"))
    }

    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArgument, message)
    }

    #[must_use]
    pub fn denied(denial: Denial) -> Self {
        Self {
            kind: ToolErrorKind::PolicyDenied,
            message: denial.message().to_string(),
            denial: Some(denial),
        }
    }
}

impl From<JiraToolsError> for ToolError {
    fn from(value: JiraToolsError) -> Self {
        Self::new(ToolErrorKind::ConfigError, value.to_string())
    }
}
