//! Policy gate: the read-only switch and the enabled-tools filter.
//!
//! Pure and synchronous. A denied invocation never reaches the network.

use crate::config::JiraConfig;
use crate::descriptor::ToolDescriptor;
use serde::Serialize;
use std::collections::BTreeSet;

/// Which rule rejected the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    /// The tool is not in a non-empty enabled set.
    Filtered,
    /// A write tool under read-only mode.
    ReadOnly,
}

impl Denial {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Filtered => "tool disabled by filter",
            Self::ReadOnly => "write operations disabled in read-only mode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(Denial),
}

#[derive(Debug, Clone, Default)]
pub struct PolicyGate {
    read_only: bool,
    enabled: BTreeSet<String>,
}

impl PolicyGate {
    #[must_use]
    pub fn new(read_only: bool, enabled: BTreeSet<String>) -> Self {
        Self { read_only, enabled }
    }

    #[must_use]
    pub fn from_config(config: &JiraConfig) -> Self {
        Self::new(config.read_only, config.enabled_tools.clone())
    }

    /// The filter is checked first, so a filtered write tool reports `Filtered` even in
    /// read-only mode.
    #[must_use]
    pub fn authorize(&self, tool_id: &str, descriptor: &ToolDescriptor) -> Decision {
        if !self.enabled.is_empty() && !self.enabled.contains(tool_id) {
            return Decision::Denied(Denial::Filtered);
        }
        if self.read_only && descriptor.is_write() {
            return Decision::Denied(Denial::ReadOnly);
        }
        Decision::Allowed
    }

    #[must_use]
    pub fn allows(&self, descriptor: &ToolDescriptor) -> bool {
        self.authorize(descriptor.name, descriptor) == Decision::Allowed
    }
}
