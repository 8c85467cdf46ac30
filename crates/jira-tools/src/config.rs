//! Runtime configuration for the Jira tool dispatcher.
//!
//! The config is plain data (serde-friendly, camelCase). Environment/CLI loading lives in the
//! binary crate; this module only validates and normalizes.

use crate::auth::Credentials;
use crate::error::{JiraToolsError, Result};
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use url::Url;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const TIMEOUT_RANGE: RangeInclusive<u64> = 5..=300;

/// Which Jira flavor the base URL points at. Some tools route differently on Cloud.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    Cloud,
    Server,
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraConfig {
    pub base_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub personal_access_token: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    /// When non-empty, only these tools may be invoked.
    #[serde(default)]
    pub enabled_tools: BTreeSet<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_true() -> bool {
    true
}

impl fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("JiraConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_token", &redacted(&self.api_token))
            .field(
                "personal_access_token",
                &redacted(&self.personal_access_token),
            )
            .field("read_only", &self.read_only)
            .field("enabled_tools", &self.enabled_tools)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("verify_tls", &self.verify_tls)
            .field("retry", &self.retry)
            .finish()
    }
}

impl JiraConfig {
    /// A config with defaults and no credentials.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            api_token: None,
            personal_access_token: None,
            read_only: false,
            enabled_tools: BTreeSet::new(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            verify_tls: true,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_api_token(mut self, username: impl Into<String>, token: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.api_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_personal_access_token(mut self, token: impl Into<String>) -> Self {
        self.personal_access_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    #[must_use]
    pub fn with_enabled_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Validate and normalize.
    ///
    /// # Errors
    ///
    /// Returns [`JiraToolsError::Config`] for a non-http(s) base URL, an out-of-range timeout or
    /// retry policy, or when credentials are ambiguous or missing.
    pub fn validate(mut self) -> Result<Self> {
        let trimmed = self.base_url.trim().trim_end_matches('/').to_string();
        let url = Url::parse(&trimmed)
            .map_err(|e| JiraToolsError::Config(format!("invalid base URL '{trimmed}': {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(JiraToolsError::Config(format!(
                "base URL must start with http:// or https://, got '{trimmed}'"
            )));
        }
        if url.host_str().is_none() {
            return Err(JiraToolsError::Config(format!(
                "base URL has no host: '{trimmed}'"
            )));
        }
        self.base_url = trimmed;

        if !TIMEOUT_RANGE.contains(&self.timeout_seconds) {
            return Err(JiraToolsError::Config(format!(
                "timeout must be between {} and {} seconds, got {}",
                TIMEOUT_RANGE.start(),
                TIMEOUT_RANGE.end(),
                self.timeout_seconds
            )));
        }
        self.retry.check().map_err(JiraToolsError::Config)?;

        self.enabled_tools = self
            .enabled_tools
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Credentials::from_config(&self)?;
        Ok(self)
    }

    /// Cloud when the host is an `atlassian.net` site.
    #[must_use]
    pub fn deployment(&self) -> Deployment {
        let cloud = Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
            .is_some_and(|h| h == "atlassian.net" || h.ends_with(".atlassian.net"));
        if cloud {
            Deployment::Cloud
        } else {
            Deployment::Server
        }
    }
}
