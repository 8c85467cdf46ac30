//! Declarative tool descriptors.
//!
//! A descriptor is pure data: how arguments map onto a Jira REST request and how the response
//! is shaped. Dispatch logic never branches on a tool's name.

use crate::config::Deployment;
use reqwest::Method;
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    /// Out-of-range values are clamped, not rejected.
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Boolean,
    /// JSON array of strings, or a comma-separated string.
    StringList,
    OneOf(&'static [&'static str]),
    Object,
    ObjectList,
}

impl ParamKind {
    #[must_use]
    pub fn bounded(min: i64, max: i64) -> Self {
        Self::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer { .. } => "an integer",
            Self::Boolean => "a boolean",
            Self::StringList => "a list of strings or a comma-separated string",
            Self::OneOf(_) => "one of the allowed values",
            Self::Object => "an object",
            Self::ObjectList => "a list of objects",
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            Self::String => json!({ "type": "string" }),
            Self::Integer { min, max } => {
                let mut schema = json!({ "type": "integer" });
                if let Some(min) = min {
                    schema["minimum"] = json!(min);
                }
                if let Some(max) = max {
                    schema["maximum"] = json!(max);
                }
                schema
            }
            Self::Boolean => json!({ "type": "boolean" }),
            Self::StringList => json!({ "type": "array", "items": { "type": "string" } }),
            Self::OneOf(values) => json!({ "type": "string", "enum": values }),
            Self::Object => json!({ "type": "object" }),
            Self::ObjectList => json!({ "type": "array", "items": { "type": "object" } }),
        }
    }
}

/// Where an argument lands in the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamLocation {
    /// Replaces `{name}` in the path template.
    Path,
    /// Query parameter with the given wire name. Lists are joined with `,`.
    Query(&'static str),
    /// JSON body location as a JSON pointer. Numeric segments create arrays.
    Body(&'static str),
    /// Like `Body`, but Cloud and Server/Data Center expect the value at different pointers.
    DeploymentBody {
        cloud: &'static str,
        server: &'static str,
    },
    /// A JQL clause; `{}` is replaced with the value. Clauses are AND-ed into the `jql` query
    /// parameter.
    Jql(&'static str),
    /// Local file path, uploaded as the multipart `file` field.
    File,
    /// Overrides the uploaded file name.
    FileName,
    /// Consumed by the response filter, never sent upstream.
    Local,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub location: ParamLocation,
    /// Literal default, parsed according to `kind`.
    pub default: Option<&'static str>,
    pub description: &'static str,
}

impl ParamSpec {
    fn new(name: &'static str, location: ParamLocation, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::String,
            required: false,
            location,
            default: None,
            description,
        }
    }

    #[must_use]
    pub fn path(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamLocation::Path, description).required()
    }

    #[must_use]
    pub fn query(name: &'static str, wire: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamLocation::Query(wire), description)
    }

    #[must_use]
    pub fn body(name: &'static str, pointer: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamLocation::Body(pointer), description)
    }

    #[must_use]
    pub fn body_by_deployment(
        name: &'static str,
        cloud: &'static str,
        server: &'static str,
        description: &'static str,
    ) -> Self {
        Self::new(
            name,
            ParamLocation::DeploymentBody { cloud, server },
            description,
        )
    }

    #[must_use]
    pub fn jql(name: &'static str, clause: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamLocation::Jql(clause), description)
    }

    #[must_use]
    pub fn file(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamLocation::File, description).required()
    }

    #[must_use]
    pub fn file_name(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamLocation::FileName, description)
    }

    #[must_use]
    pub fn local(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamLocation::Local, description)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn default(mut self, value: &'static str) -> Self {
        self.default = Some(value);
        self
    }

    /// The default converted to a JSON value of this parameter's kind.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        let raw = self.default?;
        Some(match &self.kind {
            ParamKind::Integer { .. } => raw.parse::<i64>().map_or_else(|_| json!(raw), |n| json!(n)),
            ParamKind::Boolean => raw.parse::<bool>().map_or_else(|_| json!(raw), |b| json!(b)),
            _ => json!(raw),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteCondition {
    Cloud,
    /// The named argument was not supplied.
    Absent(&'static str),
}

#[derive(Debug, Clone)]
pub struct PathRoute {
    pub when: RouteCondition,
    pub path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// A JSON object; an empty body decodes to `{}`.
    Object,
    /// A JSON array, optionally nested under a top-level key.
    List { within: Option<&'static str> },
    /// Raw bytes with their content type.
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFilter {
    /// Keep list entries whose `name` contains the named argument (case-insensitive).
    NameContains(&'static str),
}

/// Resolves a human-readable name argument into the id another parameter carries, by listing
/// the candidates with a `GET` before the tool's own request.
///
/// Candidates are the objects under `within`; the first whose `name` matches
/// case-insensitively supplies its `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameLookup {
    /// Local parameter holding the name.
    pub param: &'static str,
    /// Parameter that receives the resolved id.
    pub target: &'static str,
    pub path: &'static str,
    pub within: &'static str,
    /// Noun used in error messages, e.g. "transition".
    pub noun: &'static str,
}

#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub method: Method,
    pub path: &'static str,
    pub classification: Classification,
    pub params: Vec<ParamSpec>,
    /// First matching route wins; `path` is the fallback.
    pub routes: Vec<PathRoute>,
    pub fixed_query: Vec<(&'static str, &'static str)>,
    pub headers: Vec<(&'static str, &'static str)>,
    pub response: ResponseShape,
    /// Issue one request per element of this list parameter.
    pub fan_out: Option<&'static str>,
    pub filter: Option<ResponseFilter>,
    pub lookup: Option<NameLookup>,
}

impl ToolDescriptor {
    fn new(
        name: &'static str,
        classification: Classification,
        method: Method,
        path: &'static str,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            method,
            path,
            classification,
            params: Vec::new(),
            routes: Vec::new(),
            fixed_query: Vec::new(),
            headers: Vec::new(),
            response: ResponseShape::Object,
            fan_out: None,
            filter: None,
            lookup: None,
        }
    }

    #[must_use]
    pub fn read(
        name: &'static str,
        method: Method,
        path: &'static str,
        description: &'static str,
    ) -> Self {
        Self::new(name, Classification::Read, method, path, description)
    }

    #[must_use]
    pub fn write(
        name: &'static str,
        method: Method,
        path: &'static str,
        description: &'static str,
    ) -> Self {
        Self::new(name, Classification::Write, method, path, description)
    }

    #[must_use]
    pub fn params(mut self, params: Vec<ParamSpec>) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn route(mut self, when: RouteCondition, path: &'static str) -> Self {
        self.routes.push(PathRoute { when, path });
        self
    }

    #[must_use]
    pub fn fixed_query(mut self, key: &'static str, value: &'static str) -> Self {
        self.fixed_query.push((key, value));
        self
    }

    #[must_use]
    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }

    #[must_use]
    pub fn returns(mut self, shape: ResponseShape) -> Self {
        self.response = shape;
        self
    }

    #[must_use]
    pub fn returns_list(self, within: Option<&'static str>) -> Self {
        self.returns(ResponseShape::List { within })
    }

    #[must_use]
    pub fn fan_out(mut self, param: &'static str) -> Self {
        self.fan_out = Some(param);
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: ResponseFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn lookup(mut self, lookup: NameLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn is_write(&self) -> bool {
        self.classification == Classification::Write
    }

    /// Path template for this deployment and set of supplied arguments.
    pub fn path_for(&self, deployment: Deployment, supplied: impl Fn(&str) -> bool) -> &'static str {
        self.routes
            .iter()
            .find(|r| match r.when {
                RouteCondition::Cloud => deployment == Deployment::Cloud,
                RouteCondition::Absent(name) => !supplied(name),
            })
            .map_or(self.path, |r| r.path)
    }

    /// JSON Schema for the tool's arguments.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = json!({});
        let mut required: Vec<&str> = Vec::new();

        for param in &self.params {
            let mut prop_schema = param.kind.json_schema();
            if !param.description.is_empty() {
                prop_schema["description"] = json!(param.description);
            }
            if let Some(default) = param.default_value() {
                prop_schema["default"] = default;
            }
            properties[param.name] = prop_schema;

            if param.required && param.default.is_none() {
                required.push(param.name);
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

/// `{name}` placeholders in a path template.
pub(crate) fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    template
        .split('{')
        .skip(1)
        .filter_map(|rest| rest.split_once('}').map(|(name, _)| name))
}
