//! Request executor: one rendered request in, one classified [`HttpOutcome`] out.
//!
//! Owns the per-attempt timeout, the retry loop and the mapping from HTTP statuses to outcome
//! kinds. The wire itself sits behind [`HttpTransport`] so tests can script responses.

use crate::descriptor::ResponseShape;
use crate::error::{JiraToolsError, ToolError, ToolErrorKind};
use crate::result::{Payload, ToolResult};
use crate::retry::{RetryPolicy, RetryState, retry_after};
use crate::safety::{redact_url, sanitize_reqwest_error, truncate_detail};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

const MAX_DETAIL_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart {
        field: String,
        file_name: String,
        bytes: Vec<u8>,
        mime_type: String,
    },
}

/// A fully rendered request. Cloned for every attempt.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RawResponse {
    fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    /// The request could not be built; retrying will not help.
    #[error("invalid request: {0}")]
    Invalid(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError>;
}

/// Production transport. No client-wide timeout: the executor bounds each attempt.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`JiraToolsError::Transport`] if the TLS backend cannot be initialized.
    pub fn new(verify_tls: bool) -> crate::error::Result<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| JiraToolsError::Transport(sanitize_reqwest_error(&e)))?;
        Ok(Self { client })
    }
}

fn transport_error(e: &reqwest::Error) -> TransportError {
    let msg = sanitize_reqwest_error(e);
    if e.is_builder() {
        TransportError::Invalid(msg)
    } else {
        TransportError::Connect(msg)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<RawResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
                mime_type,
            } => {
                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(|e| transport_error(&e))?;
                builder.multipart(Form::new().part(field, part))
            }
        };

        let response = builder.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&e))?
            .to_vec();
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Classified result of executing one request.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpOutcome {
    Success(Payload),
    AuthFailure(String),
    NotFoundRemote(String),
    ValidationFailure(String),
    TransientFailure(String),
    ServerFailure(String),
    Cancelled(String),
}

impl HttpOutcome {
    /// One outcome kind maps to exactly one result kind.
    #[must_use]
    pub fn into_tool_result(self) -> ToolResult {
        let (kind, message) = match self {
            Self::Success(payload) => return Ok(payload),
            Self::AuthFailure(m) => (ToolErrorKind::AuthFailure, m),
            Self::NotFoundRemote(m) => (ToolErrorKind::NotFoundRemote, m),
            Self::ValidationFailure(m) => (ToolErrorKind::ValidationFailure, m),
            Self::TransientFailure(m) => (ToolErrorKind::TransientFailure, m),
            Self::ServerFailure(m) => (ToolErrorKind::ServerFailure, m),
            Self::Cancelled(m) => (ToolErrorKind::Cancelled, m),
        };
        Err(ToolError::new(kind, message))
    }
}

/// What to do after one attempt.
enum Step {
    Done(HttpOutcome),
    Retry {
        error: String,
        retry_after: Option<Duration>,
    },
}

#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Executor {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            transport,
            timeout,
            retry,
        }
    }

    /// Execute with retries. Cancellation is observed before each attempt and during backoff,
    /// never mid-attempt.
    pub async fn execute(
        &self,
        request: &PreparedRequest,
        shape: &ResponseShape,
        cancel: &CancellationToken,
    ) -> HttpOutcome {
        let target = redact_url(&request.url);
        let mut state = RetryState::new();

        loop {
            if cancel.is_cancelled() {
                return cancelled(&state);
            }
            state.attempt += 1;
            debug!(
                method = %request.method,
                url = %target,
                attempt = state.attempt,
                "jira request"
            );

            let step = match tokio::time::timeout(self.timeout, self.transport.send(request.clone()))
                .await
            {
                Err(_) => Step::Retry {
                    error: format!("request timed out after {}s", self.timeout.as_secs()),
                    retry_after: None,
                },
                Ok(Err(TransportError::Invalid(msg))) => {
                    return HttpOutcome::ValidationFailure(format!("invalid request: {msg}"));
                }
                Ok(Err(e)) => Step::Retry {
                    error: e.to_string(),
                    retry_after: None,
                },
                Ok(Ok(response)) => classify(&response, shape, &target),
            };

            let (error, hint) = match step {
                Step::Done(outcome) => {
                    debug!(
                        url = %target,
                        attempts = state.attempt,
                        elapsed_ms = state.elapsed().as_millis() as u64,
                        "jira request finished"
                    );
                    return outcome;
                }
                Step::Retry { error, retry_after } => (error, retry_after),
            };
            state.last_error = Some(error);

            if state.exhausted(&self.retry) {
                warn!(
                    url = %target,
                    attempts = state.attempt,
                    error = state.last_error(),
                    "jira request failed, retries exhausted"
                );
                return HttpOutcome::TransientFailure(format!(
                    "gave up after {} attempt(s): {}",
                    state.attempt,
                    state.last_error()
                ));
            }

            let delay = self.retry.delay_with_hint(state.attempt, hint);
            warn!(
                url = %target,
                attempt = state.attempt,
                delay_ms = delay.as_millis() as u64,
                error = state.last_error(),
                "jira request failed, retrying"
            );
            tokio::select! {
                () = cancel.cancelled() => return cancelled(&state),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

fn cancelled(state: &RetryState) -> HttpOutcome {
    match &state.last_error {
        Some(last) => HttpOutcome::Cancelled(format!(
            "cancelled after {} attempt(s); last error: {last}",
            state.attempt
        )),
        None => HttpOutcome::Cancelled("cancelled before the request was sent".to_string()),
    }
}

fn classify(response: &RawResponse, shape: &ResponseShape, target: &str) -> Step {
    let status = response.status;
    if status.is_success() {
        return Step::Done(match decode(response, shape) {
            Ok(payload) => HttpOutcome::Success(payload),
            Err(e) => HttpOutcome::ServerFailure(format!("undecodable response from {target}: {e}")),
        });
    }

    let detail = error_detail(&response.body);
    let described = if detail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {detail}")
    };

    match status.as_u16() {
        401 | 403 => Step::Done(HttpOutcome::AuthFailure(format!(
            "authentication failed ({described})"
        ))),
        404 => Step::Done(HttpOutcome::NotFoundRemote(format!(
            "resource not found: {target} ({described})"
        ))),
        429 => Step::Retry {
            error: format!("rate limited ({described})"),
            retry_after: retry_after(&response.headers),
        },
        501 | 505 => Step::Done(HttpOutcome::ServerFailure(format!(
            "server error ({described})"
        ))),
        400..=499 => Step::Done(HttpOutcome::ValidationFailure(format!(
            "request rejected ({described})"
        ))),
        500..=599 => Step::Retry {
            error: format!("server error ({described})"),
            retry_after: None,
        },
        _ => Step::Done(HttpOutcome::ServerFailure(format!(
            "unexpected status ({described})"
        ))),
    }
}

/// Jira error bodies: `errorMessages` first, then the `errors` map, then `message`.
fn error_detail(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return truncate_detail(&String::from_utf8_lossy(body), MAX_DETAIL_CHARS);
    };

    let messages: Vec<&str> = value
        .get("errorMessages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .collect();
    if !messages.is_empty() {
        return truncate_detail(&messages.join(", "), MAX_DETAIL_CHARS);
    }

    if let Some(errors) = value.get("errors").and_then(Value::as_object)
        && !errors.is_empty()
    {
        let joined = errors
            .iter()
            .map(|(k, v)| match v.as_str() {
                Some(s) => format!("{k}: {s}"),
                None => format!("{k}: {v}"),
            })
            .collect::<Vec<_>>()
            .join(", ");
        return truncate_detail(&joined, MAX_DETAIL_CHARS);
    }

    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return truncate_detail(message, MAX_DETAIL_CHARS);
    }

    truncate_detail(&value.to_string(), MAX_DETAIL_CHARS)
}

fn decode(response: &RawResponse, shape: &ResponseShape) -> Result<Payload, String> {
    match shape {
        ResponseShape::Binary => {
            let mime_type = response
                .content_type()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref())
                .to_string();
            Ok(Payload::Binary {
                bytes: response.body.clone(),
                mime_type,
            })
        }
        ResponseShape::Object => match parse_json(&response.body)? {
            None => Ok(Payload::Object(serde_json::Map::new())),
            Some(Value::Object(map)) => Ok(Payload::Object(map)),
            Some(other) => Err(format!("expected a JSON object, got {}", json_kind(&other))),
        },
        ResponseShape::List { within } => {
            let list = match (parse_json(&response.body)?, within) {
                (None, _) => return Ok(Payload::List(Vec::new())),
                (Some(v), None) => v,
                (Some(Value::Object(mut map)), Some(key)) => map
                    .remove(*key)
                    .ok_or_else(|| format!("missing '{key}' in response"))?,
                (Some(other), Some(_)) => {
                    return Err(format!("expected a JSON object, got {}", json_kind(&other)));
                }
            };
            match list {
                Value::Array(items) => Ok(Payload::List(items)),
                other => Err(format!("expected a JSON array, got {}", json_kind(&other))),
            }
        }
    }
}

/// `None` for an empty (or whitespace-only) body.
fn parse_json(body: &[u8]) -> Result<Option<Value>, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| format!("invalid JSON: {e}"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
