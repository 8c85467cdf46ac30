//! Jira tool catalog + policy gate + resilient HTTP dispatch.
//!
//! This crate is intended to be used by:
//! - `unrelated-jira-gateway` (CLI / protocol framing)
//! - any MCP server that wants to expose Jira as a uniform set of tools
//!
//! It contains **no** environment lookup and **no** transport framing: callers hand
//! in a [`config::JiraConfig`] and receive [`result::ToolResult`] values.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod policy;
pub mod registry;
pub mod render;
pub mod result;
pub mod retry;
pub mod safety;
pub mod semantics;
pub mod shaping;

pub use config::JiraConfig;
pub use dispatcher::{ToolDispatcher, ToolInvocation};
pub use error::{JiraToolsError, ToolError, ToolErrorKind};
pub use result::{Payload, ToolResult};
