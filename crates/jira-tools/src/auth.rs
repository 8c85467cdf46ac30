//! Credential resolution and request header construction.

use crate::config::JiraConfig;
use crate::error::{JiraToolsError, Result};
use base64::Engine as _;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use std::fmt;

pub const AMBIGUOUS_CREDENTIALS: &str = "ambiguous or missing credentials";

/// Exactly one authentication scheme.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username + API token (Cloud), sent as HTTP Basic.
    Token { username: String, api_token: String },
    /// Personal access token (Server/Data Center), sent as Bearer.
    Pat { token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token { username, .. } => f
                .debug_struct("Token")
                .field("username", username)
                .field("api_token", &"<redacted>")
                .finish(),
            Self::Pat { .. } => f.debug_struct("Pat").field("token", &"<redacted>").finish(),
        }
    }
}

fn present(v: Option<&String>) -> Option<&str> {
    v.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl Credentials {
    /// Pick the scheme from config.
    ///
    /// # Errors
    ///
    /// Fails unless exactly one complete scheme is configured; a lone username or token counts
    /// as incomplete.
    pub fn from_config(config: &JiraConfig) -> Result<Self> {
        let username = present(config.username.as_ref());
        let api_token = present(config.api_token.as_ref());
        let pat = present(config.personal_access_token.as_ref());

        match (username, api_token, pat) {
            (Some(username), Some(api_token), None) => Ok(Self::Token {
                username: username.to_string(),
                api_token: api_token.to_string(),
            }),
            (None, None, Some(token)) => Ok(Self::Pat {
                token: token.to_string(),
            }),
            _ => Err(JiraToolsError::Config(AMBIGUOUS_CREDENTIALS.to_string())),
        }
    }

    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Token { .. } => "basic",
            Self::Pat { .. } => "bearer",
        }
    }

    /// Authorization + JSON accept headers, attached to every upstream request.
    ///
    /// # Errors
    ///
    /// Fails if a secret contains bytes that cannot appear in a header.
    pub fn headers(&self) -> Result<HeaderMap> {
        let raw = match self {
            Self::Token {
                username,
                api_token,
            } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{api_token}"));
                format!("Basic {encoded}")
            }
            Self::Pat { token } => format!("Bearer {token}"),
        };
        let mut auth = HeaderValue::from_str(&raw).map_err(|_| {
            JiraToolsError::Config("credentials contain invalid header characters".to_string())
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> JiraConfig {
        JiraConfig::new("https://jira.example.com")
    }

    #[test]
    fn token_pair_builds_basic_auth() {
        let creds = Credentials::from_config(&cfg().with_api_token("me@example.com", "tok"))
            .expect("resolve");
        assert_eq!(creds.scheme(), "basic");
        let headers = creds.headers().expect("headers");
        let auth = headers.get(AUTHORIZATION).expect("authorization");
        // base64("me@example.com:tok")
        assert_eq!(auth.to_str().unwrap(), "Basic bWVAZXhhbXBsZS5jb206dG9r");
        assert!(auth.is_sensitive());
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn pat_builds_bearer_auth() {
        let creds =
            Credentials::from_config(&cfg().with_personal_access_token("abc")).expect("resolve");
        let headers = creds.headers().expect("headers");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
    }

    #[test]
    fn both_schemes_are_ambiguous() {
        let err = Credentials::from_config(
            &cfg()
                .with_api_token("me", "tok")
                .with_personal_access_token("abc"),
        )
        .expect_err("ambiguous");
        assert_eq!(err, JiraToolsError::Config(AMBIGUOUS_CREDENTIALS.into()));
    }

    #[test]
    fn missing_or_partial_credentials_are_rejected() {
        assert!(Credentials::from_config(&cfg()).is_err());

        let mut only_user = cfg();
        only_user.username = Some("me".into());
        assert!(Credentials::from_config(&only_user).is_err());

        let mut blank_pat = cfg();
        blank_pat.personal_access_token = Some("   ".into());
        assert!(Credentials::from_config(&blank_pat).is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::Token {
            username: "me".into(),
            api_token: "hunter2".into(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("me"));
        assert!(!rendered.contains("hunter2"));
    }
}
