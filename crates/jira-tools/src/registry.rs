//! Tool registry: the immutable name -> descriptor table.

use crate::catalog::builtin_descriptors;
use crate::descriptor::{
    ParamKind, ParamLocation, ResponseFilter, ResponseShape, ToolDescriptor, placeholders,
};
use crate::error::{JiraToolsError, Result};
use reqwest::header::{HeaderName, HeaderValue};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

static BUILTIN: LazyLock<Result<ToolRegistry>> =
    LazyLock::new(|| ToolRegistry::new(builtin_descriptors()));

#[derive(Debug)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    /// The process-wide built-in table, checked once.
    ///
    /// # Errors
    ///
    /// Returns [`JiraToolsError::Registry`] if the built-in table is inconsistent.
    pub fn builtin() -> Result<&'static ToolRegistry> {
        BUILTIN.as_ref().map_err(Clone::clone)
    }

    /// Build a registry from descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`JiraToolsError::Registry`] on duplicate names or a malformed descriptor.
    pub fn new(tools: Vec<ToolDescriptor>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(tools.len());
        for (idx, tool) in tools.iter().enumerate() {
            check_descriptor(tool)?;
            if by_name.insert(tool.name, idx).is_some() {
                return Err(JiraToolsError::Registry(format!(
                    "duplicate tool name '{}'",
                    tool.name
                )));
            }
        }
        Ok(Self { tools, by_name })
    }

    #[must_use]
    pub fn lookup(&self, tool_id: &str) -> Option<&ToolDescriptor> {
        self.by_name.get(tool_id).map(|&idx| &self.tools[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn check_descriptor(tool: &ToolDescriptor) -> Result<()> {
    let fail = |msg: String| Err(JiraToolsError::Registry(format!("tool '{}': {msg}", tool.name)));

    let mut seen = HashSet::new();
    for param in &tool.params {
        if !seen.insert(param.name) {
            return fail(format!("duplicate parameter '{}'", param.name));
        }
    }

    let templates = std::iter::once(tool.path).chain(tool.routes.iter().map(|r| r.path));
    for template in templates {
        if !template.starts_with('/') {
            return fail(format!("path '{template}' must start with '/'"));
        }
        for name in placeholders(template) {
            match tool.param(name) {
                Some(p) if p.location == ParamLocation::Path && p.required => {}
                _ => return fail(format!("placeholder '{{{name}}}' has no required path parameter")),
            }
        }
    }
    for param in tool.params.iter().filter(|p| p.location == ParamLocation::Path) {
        if placeholders(tool.path).all(|name| name != param.name) {
            return fail(format!("path parameter '{}' not in path", param.name));
        }
    }

    if let Some(fan) = tool.fan_out {
        match tool.param(fan) {
            Some(p) if p.kind == ParamKind::StringList && p.required => {}
            _ => return fail(format!("fan-out parameter '{fan}' must be a required string list")),
        }
        if tool.response == ResponseShape::Binary {
            return fail("binary responses cannot fan out".to_string());
        }
    }

    if let Some(ResponseFilter::NameContains(name)) = &tool.filter {
        match tool.param(name) {
            Some(p) if p.location == ParamLocation::Local => {}
            _ => return fail(format!("filter parameter '{name}' must be local")),
        }
        if !matches!(tool.response, ResponseShape::List { .. }) {
            return fail("filters apply to list responses only".to_string());
        }
    }

    if let Some(lookup) = &tool.lookup {
        match tool.param(lookup.param) {
            Some(p) if p.location == ParamLocation::Local && !p.required => {}
            _ => {
                return fail(format!(
                    "lookup parameter '{}' must be an optional local parameter",
                    lookup.param
                ));
            }
        }
        match tool.param(lookup.target) {
            Some(p) if !p.required && p.location != ParamLocation::Local => {}
            _ => {
                return fail(format!(
                    "lookup target '{}' must be an optional request parameter",
                    lookup.target
                ));
            }
        }
        if !lookup.path.starts_with('/') {
            return fail(format!("lookup path '{}' must start with '/'", lookup.path));
        }
        for name in placeholders(lookup.path) {
            match tool.param(name) {
                Some(p) if p.location == ParamLocation::Path && p.required => {}
                _ => return fail(format!("lookup placeholder '{{{name}}}' has no required path parameter")),
            }
        }
        if tool.fan_out.is_some() {
            return fail("lookups cannot be combined with fan-out".to_string());
        }
    }

    for (name, value) in &tool.headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err()
            || HeaderValue::from_str(value).is_err()
        {
            return fail(format!("invalid header '{name}'"));
        }
    }

    for param in &tool.params {
        if let Some(default) = param.default_value() {
            let ok = match &param.kind {
                ParamKind::Integer { .. } => default.is_i64(),
                ParamKind::Boolean => default.is_boolean(),
                ParamKind::OneOf(allowed) => default.as_str().is_some_and(|d| allowed.contains(&d)),
                _ => true,
            };
            if !ok {
                return fail(format!("default for '{}' does not match its kind", param.name));
            }
        }
    }

    Ok(())
}
