//! Tool dispatcher: the single entry point for every tool call.
//!
//! lookup -> policy gate -> argument validation -> rendering -> execution. Nothing reaches the
//! network before the gate has allowed it.

use crate::auth::Credentials;
use crate::config::{Deployment, JiraConfig};
use crate::descriptor::{NameLookup, ResponseShape, ToolDescriptor};
use crate::error::{Result, ToolError, ToolErrorKind};
use crate::executor::{
    Executor, HttpTransport, PreparedRequest, ReqwestTransport, RequestBody,
};
use crate::policy::{Decision, PolicyGate};
use crate::registry::ToolRegistry;
use crate::render::{
    Arguments, RenderedRequest, build_url, render, render_lookup, resolve_lookup,
    validate_arguments,
};
use crate::result::{Payload, ToolResult};
use crate::semantics::annotations_for;
use crate::shaping::apply_filter;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::{JsonObject, Tool};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One tool call: a tool id plus its (untyped) argument object.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool_id: String,
    pub arguments: Value,
}

impl ToolInvocation {
    #[must_use]
    pub fn new(tool_id: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_id: tool_id.into(),
            arguments,
        }
    }
}

#[derive(Clone)]
pub struct ToolDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    base_url: String,
    deployment: Deployment,
    registry: &'static ToolRegistry,
    gate: PolicyGate,
    headers: HeaderMap,
    executor: Executor,
}

impl ToolDispatcher {
    /// Validate `config` and build a dispatcher backed by a real HTTP client.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration (including ambiguous credentials) or if the HTTP client
    /// cannot be built. No tool call is possible before this succeeds.
    pub fn new(config: JiraConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.verify_tls)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Same as [`ToolDispatcher::new`] with an injected transport.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or an inconsistent built-in registry.
    pub fn with_transport(config: JiraConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let config = config.validate()?;
        let credentials = Credentials::from_config(&config)?;
        let headers = credentials.headers()?;
        let registry = ToolRegistry::builtin()?;

        for name in &config.enabled_tools {
            if registry.lookup(name).is_none() {
                warn!(tool = %name, "enabled tool filter names an unknown tool");
            }
        }

        let deployment = config.deployment();
        info!(
            base_url = %config.base_url,
            deployment = ?deployment,
            auth = credentials.scheme(),
            read_only = config.read_only,
            enabled_tools = config.enabled_tools.len(),
            tools = registry.len(),
            "jira dispatcher ready"
        );

        let executor = Executor::new(
            transport,
            Duration::from_secs(config.timeout_seconds),
            config.retry.clone(),
        );
        Ok(Self {
            inner: Arc::new(DispatcherInner {
                gate: PolicyGate::from_config(&config),
                base_url: config.base_url,
                deployment,
                registry,
                headers,
                executor,
            }),
        })
    }

    /// Descriptors of every tool the gate would allow, in catalog order.
    pub fn allowed_tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.inner
            .registry
            .iter()
            .filter(|d| self.inner.gate.allows(d))
    }

    /// MCP `Tool`s for every allowed tool.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.allowed_tools()
            .map(|d| {
                let schema_obj = d
                    .input_schema()
                    .as_object()
                    .cloned()
                    .unwrap_or_else(JsonObject::new);
                let mut tool = Tool::new(d.name, d.description, Arc::new(schema_obj));
                tool.annotations = Some(annotations_for(d));
                tool
            })
            .collect()
    }

    pub async fn invoke(&self, invocation: ToolInvocation) -> ToolResult {
        self.invoke_with_cancel(invocation, &CancellationToken::new())
            .await
    }

    /// Invoke a tool. Every failure is returned as a [`ToolError`]; this never panics on bad
    /// input or upstream misbehavior.
    pub async fn invoke_with_cancel(
        &self,
        invocation: ToolInvocation,
        cancel: &CancellationToken,
    ) -> ToolResult {
        let ToolInvocation { tool_id, arguments } = invocation;
        let inner = &self.inner;

        let Some(descriptor) = inner.registry.lookup(&tool_id) else {
            debug!(tool = %tool_id, "unknown tool");
            return Err(ToolError::unknown_tool(&tool_id));
        };

        if let Decision::Denied(denial) = inner.gate.authorize(&tool_id, descriptor) {
            info!(tool = %tool_id, denial = ?denial, "tool call denied by policy");
            return Err(ToolError::denied(denial));
        }

        let mut args = validate_arguments(descriptor, &arguments)?;
        if let Some(lookup) = &descriptor.lookup
            && !args.contains(lookup.target)
        {
            args = self
                .resolve_name(descriptor, lookup, &args, cancel)
                .await
                .inspect_err(|e| {
                    warn!(tool = %tool_id, kind = %e.kind, error = %e.message, "name lookup failed");
                })?;
        }
        let requests = render(descriptor, &args, inner.deployment).await?;
        let fanned_out = descriptor.fan_out.is_some();

        let mut payloads = Vec::with_capacity(requests.len());
        for (index, rendered) in requests.into_iter().enumerate() {
            let prepared = self.prepare(
                descriptor.name,
                descriptor.method.clone(),
                &descriptor.headers,
                rendered,
            )?;
            let result = inner
                .executor
                .execute(&prepared, &descriptor.response, cancel)
                .await
                .into_tool_result();
            match result {
                Ok(payload) => payloads.push(payload),
                Err(mut e) => {
                    if fanned_out {
                        e.message = format!("item {index}: {}", e.message);
                    }
                    warn!(tool = %tool_id, kind = %e.kind, error = %e.message, "tool call failed");
                    return Err(e);
                }
            }
        }

        let payload = if fanned_out {
            Payload::List(payloads.iter().map(Payload::to_value).collect())
        } else {
            payloads.pop().ok_or_else(|| {
                ToolError::new(ToolErrorKind::ServerFailure, "no request was rendered")
            })?
        };

        let payload = match &descriptor.filter {
            Some(filter) => apply_filter(filter, &args, payload),
            None => payload,
        };
        debug!(tool = %tool_id, "tool call succeeded");
        Ok(payload)
    }

    /// Fetch the authenticated user (`/rest/api/2/myself`) to check connectivity and
    /// credentials. Bypasses the tool filter and read-only mode; it is not a tool call.
    pub async fn current_user(&self, cancel: &CancellationToken) -> ToolResult {
        let rendered = RenderedRequest {
            path: "/rest/api/2/myself".to_string(),
            query: Vec::new(),
            body: RequestBody::Empty,
        };
        let prepared = self.prepare("connection check", Method::GET, &[], rendered)?;
        self.inner
            .executor
            .execute(&prepared, &ResponseShape::Object, cancel)
            .await
            .into_tool_result()
    }

    /// List the lookup's candidates and put the matching id into the arguments.
    async fn resolve_name(
        &self,
        descriptor: &ToolDescriptor,
        lookup: &NameLookup,
        args: &Arguments,
        cancel: &CancellationToken,
    ) -> std::result::Result<Arguments, ToolError> {
        let rendered = render_lookup(descriptor, lookup, args)?;
        let prepared = self.prepare(descriptor.name, Method::GET, &[], rendered)?;
        let shape = ResponseShape::List {
            within: Some(lookup.within),
        };
        let payload = self
            .inner
            .executor
            .execute(&prepared, &shape, cancel)
            .await
            .into_tool_result()
            .map_err(|mut e| {
                e.message = format!("listing {}s: {}", lookup.noun, e.message);
                e
            })?;
        let Payload::List(candidates) = payload else {
            return Err(ToolError::new(
                ToolErrorKind::ServerFailure,
                format!("expected a list of {}s", lookup.noun),
            ));
        };
        let resolved = resolve_lookup(lookup, args, &candidates)?;
        debug!(tool = descriptor.name, noun = lookup.noun, "resolved name to id");
        Ok(resolved)
    }

    fn prepare(
        &self,
        tool: &str,
        method: Method,
        extra_headers: &[(&'static str, &'static str)],
        rendered: RenderedRequest,
    ) -> std::result::Result<PreparedRequest, ToolError> {
        let url = build_url(&self.inner.base_url, &rendered.path, &rendered.query)?;
        let mut headers = self.inner.headers.clone();
        for (name, value) in extra_headers {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                return Err(ToolError::new(
                    ToolErrorKind::ConfigError,
                    format!("invalid header '{name}' on tool '{tool}'"),
                ));
            };
            headers.insert(name, value);
        }
        Ok(PreparedRequest {
            method,
            url,
            headers,
            body: rendered.body,
        })
    }
}
