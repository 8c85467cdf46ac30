//! Argument validation and request rendering.
//!
//! Validation turns an untyped argument object into typed [`Arguments`]. Rendering then places
//! each argument where its [`ParamLocation`] says and yields one [`RenderedRequest`] per
//! upstream call (more than one only for fan-out tools).

use crate::config::Deployment;
use crate::descriptor::{NameLookup, ParamKind, ParamLocation, ParamSpec, ToolDescriptor};
use crate::error::{ToolError, ToolErrorKind};
use crate::executor::RequestBody;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

const MULTIPART_FILE_FIELD: &str = "file";

/// Validated, coerced arguments keyed by parameter name. Defaults are already applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: BTreeMap<&'static str, Value>,
}

impl Arguments {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub(crate) fn with(&self, name: &'static str, value: Value) -> Self {
        let mut next = self.clone();
        next.values.insert(name, value);
        next
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct RenderedRequest {
    pub path: String,
    pub query: Vec<QueryPair>,
    pub body: RequestBody,
}

/// Validate `arguments` against the descriptor's parameter specs.
///
/// `null` (or absent) arguments count as an empty object. `null` values and blank strings count
/// as absent, so defaults and absent-argument routes apply to them.
///
/// # Errors
///
/// Returns `invalid_argument` for a non-object, an unknown name, a missing required parameter,
/// or a value of the wrong kind.
pub fn validate_arguments(
    descriptor: &ToolDescriptor,
    arguments: &Value,
) -> Result<Arguments, ToolError> {
    let empty = Map::new();
    let provided = match arguments {
        Value::Null => &empty,
        Value::Object(map) => map,
        other => {
            return Err(ToolError::invalid_argument(format!(
                "arguments must be a JSON object, got {}",
                json_type(other)
            )));
        }
    };

    let known: Vec<&str> = descriptor.params.iter().map(|p| p.name).collect();
    for key in provided.keys() {
        if descriptor.param(key).is_some() {
            continue;
        }
        let mut message = format!("unknown parameter '{key}'");
        if let Some(best) = find_similar_strings(key, &known).first() {
            message.push_str(&format!(" (did you mean '{best}'?)"));
        }
        return Err(ToolError::invalid_argument(message));
    }

    let mut values = BTreeMap::new();
    for param in &descriptor.params {
        let supplied = provided.get(param.name).filter(|v| !is_blank(v)).cloned();
        let Some(raw) = supplied.or_else(|| param.default_value()) else {
            if param.required {
                return Err(ToolError::invalid_argument(format!(
                    "missing required parameter: {}",
                    param.name
                )));
            }
            continue;
        };
        let value = coerce(param, raw)?;
        values.insert(param.name, value);
    }

    if let Some(fan) = descriptor.fan_out
        && values
            .get(fan)
            .and_then(Value::as_array)
            .is_some_and(Vec::is_empty)
    {
        return Err(ToolError::invalid_argument(format!(
            "parameter '{fan}' must not be empty"
        )));
    }

    if let Some(lookup) = &descriptor.lookup {
        match (values.contains_key(lookup.target), values.contains_key(lookup.param)) {
            (false, false) => {
                return Err(ToolError::invalid_argument(format!(
                    "one of '{}' or '{}' is required",
                    lookup.target, lookup.param
                )));
            }
            (true, true) => {
                return Err(ToolError::invalid_argument(format!(
                    "pass either '{}' or '{}', not both",
                    lookup.target, lookup.param
                )));
            }
            _ => {}
        }
    }

    Ok(Arguments { values })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn coerce(param: &ParamSpec, value: Value) -> Result<Value, ToolError> {
    let mismatch = || {
        ToolError::invalid_argument(format!(
            "invalid value for '{}': expected {}",
            param.name,
            param.kind.type_name()
        ))
    };

    match &param.kind {
        ParamKind::String => value.is_string().then_some(value).ok_or_else(mismatch),
        ParamKind::Integer { min, max } => {
            let mut n = value.as_i64().ok_or_else(mismatch)?;
            if let Some(min) = min {
                n = n.max(*min);
            }
            if let Some(max) = max {
                n = n.min(*max);
            }
            Ok(Value::from(n))
        }
        ParamKind::Boolean => value.is_boolean().then_some(value).ok_or_else(mismatch),
        ParamKind::StringList => match value {
            Value::String(s) => Ok(Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            )),
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(Value::Array(items)),
            _ => Err(mismatch()),
        },
        ParamKind::OneOf(allowed) => {
            let s = value.as_str().ok_or_else(mismatch)?;
            if allowed.contains(&s) {
                Ok(Value::String(s.to_string()))
            } else {
                Err(ToolError::invalid_argument(format!(
                    "invalid value for '{}': '{s}' is not one of {}",
                    param.name,
                    allowed.join(", ")
                )))
            }
        }
        ParamKind::Object => value.is_object().then_some(value).ok_or_else(mismatch),
        ParamKind::ObjectList => {
            let all_objects = value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object));
            all_objects.then_some(value).ok_or_else(mismatch)
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn find_similar_strings(unknown: &str, known: &[&str]) -> Vec<String> {
    let mut candidates: Vec<(f64, String)> = Vec::new();
    for k in known {
        let score = strsim::jaro(unknown, k);
        if score > 0.7 {
            candidates.push((score, (*k).to_string()));
        }
    }
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().map(|(_, s)| s).collect()
}

/// Render validated arguments into concrete requests.
///
/// # Errors
///
/// Returns `invalid_argument` if a file parameter cannot be read or a path placeholder stays
/// unresolved.
pub async fn render(
    descriptor: &ToolDescriptor,
    args: &Arguments,
    deployment: Deployment,
) -> Result<Vec<RenderedRequest>, ToolError> {
    let Some(fan) = descriptor.fan_out else {
        return Ok(vec![render_one(descriptor, args, deployment).await?]);
    };

    let items = args
        .get(fan)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut requests = Vec::with_capacity(items.len());
    for item in items {
        let single = args.with(fan, item);
        requests.push(render_one(descriptor, &single, deployment).await?);
    }
    Ok(requests)
}

async fn render_one(
    descriptor: &ToolDescriptor,
    args: &Arguments,
    deployment: Deployment,
) -> Result<RenderedRequest, ToolError> {
    let mut path = descriptor
        .path_for(deployment, |name| args.contains(name))
        .to_string();
    let mut query: Vec<QueryPair> = descriptor
        .fixed_query
        .iter()
        .map(|(k, v)| QueryPair {
            key: (*k).to_string(),
            value: (*v).to_string(),
        })
        .collect();
    let mut jql: Vec<String> = Vec::new();
    let mut body: Option<Value> = None;
    let mut upload: Option<(Vec<u8>, String)> = None;
    let mut upload_name: Option<String> = None;

    for param in &descriptor.params {
        let Some(value) = args.get(param.name) else {
            continue;
        };
        match &param.location {
            ParamLocation::Path => path = fill_placeholder(&path, param.name, value),
            ParamLocation::Query(wire) => query.push(QueryPair {
                key: (*wire).to_string(),
                value: value_to_string(value),
            }),
            ParamLocation::Body(pointer) => {
                let root = body.get_or_insert_with(|| Value::Object(Map::new()));
                set_pointer(root, pointer, value.clone());
            }
            ParamLocation::DeploymentBody { cloud, server } => {
                let pointer = match deployment {
                    Deployment::Cloud => cloud,
                    Deployment::Server => server,
                };
                let root = body.get_or_insert_with(|| Value::Object(Map::new()));
                set_pointer(root, pointer, value.clone());
            }
            ParamLocation::Jql(clause) => jql.push(clause.replace("{}", &value_to_string(value))),
            ParamLocation::File => {
                let file_path = value_to_string(value);
                let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
                    ToolError::invalid_argument(format!("cannot read file '{file_path}': {e}"))
                })?;
                let default_name = Path::new(&file_path)
                    .file_name()
                    .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
                upload = Some((bytes, default_name));
            }
            ParamLocation::FileName => {
                let name = value_to_string(value);
                if !name.trim().is_empty() {
                    upload_name = Some(name);
                }
            }
            ParamLocation::Local => {}
        }
    }

    check_resolved(&path)?;
    if !jql.is_empty() {
        query.push(QueryPair {
            key: "jql".to_string(),
            value: jql.join(" AND "),
        });
    }

    let body = match (upload, body) {
        (Some((bytes, default_name)), _) => RequestBody::Multipart {
            field: MULTIPART_FILE_FIELD.to_string(),
            file_name: upload_name.unwrap_or(default_name),
            bytes,
            mime_type: mime::APPLICATION_OCTET_STREAM.to_string(),
        },
        (None, Some(json)) => RequestBody::Json(json),
        (None, None) => RequestBody::Empty,
    };

    Ok(RenderedRequest { path, query, body })
}

fn fill_placeholder(template: &str, name: &str, value: &Value) -> String {
    let encoded = encode_component(&value_to_string(value));
    template.replace(&format!("{{{name}}}"), &encoded)
}

fn check_resolved(path: &str) -> Result<(), ToolError> {
    if path.contains('{') {
        return Err(ToolError::invalid_argument(format!(
            "unresolved path parameter in '{path}'"
        )));
    }
    Ok(())
}

/// The `GET` that lists the candidates of a [`NameLookup`].
///
/// # Errors
///
/// Returns `invalid_argument` if a path placeholder stays unresolved.
pub fn render_lookup(
    descriptor: &ToolDescriptor,
    lookup: &NameLookup,
    args: &Arguments,
) -> Result<RenderedRequest, ToolError> {
    let mut path = lookup.path.to_string();
    for param in descriptor
        .params
        .iter()
        .filter(|p| p.location == ParamLocation::Path)
    {
        if let Some(value) = args.get(param.name) {
            path = fill_placeholder(&path, param.name, value);
        }
    }
    check_resolved(&path)?;
    Ok(RenderedRequest {
        path,
        query: Vec::new(),
        body: RequestBody::Empty,
    })
}

/// Pick the candidate named by `lookup.param` and store its id under `lookup.target`.
///
/// # Errors
///
/// Returns `invalid_argument` listing the available names when nothing matches.
pub fn resolve_lookup(
    lookup: &NameLookup,
    args: &Arguments,
    candidates: &[Value],
) -> Result<Arguments, ToolError> {
    let wanted = args
        .get(lookup.param)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim();
    let wanted_lower = wanted.to_lowercase();
    let name_of = |c: &Value| c.get("name").and_then(Value::as_str).map(str::to_string);

    let id = candidates
        .iter()
        .find(|c| name_of(c).is_some_and(|n| n.to_lowercase() == wanted_lower))
        .and_then(|c| c.get("id"));
    if let Some(id) = id {
        return Ok(args.with(lookup.target, Value::String(value_to_string(id))));
    }

    let available: Vec<String> = candidates.iter().filter_map(name_of).collect();
    let available = if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    };
    Err(ToolError::invalid_argument(format!(
        "{noun} '{wanted}' not found; available {noun}s: {available}",
        noun = lookup.noun
    )))
}

/// Join `base_url` and a rendered path, then append the encoded query.
///
/// # Errors
///
/// Returns `config_error` if the result is not a valid URL.
pub fn build_url(base_url: &str, path: &str, query: &[QueryPair]) -> Result<Url, ToolError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url = Url::parse(&url).map_err(|e| {
        ToolError::new(ToolErrorKind::ConfigError, format!("invalid request URL: {e}"))
    })?;

    if !query.is_empty() {
        let mut encoded = String::new();
        for (i, p) in query.iter().enumerate() {
            if i > 0 {
                encoded.push('&');
            }
            encoded.push_str(&encode_component(&p.key));
            encoded.push('=');
            encoded.push_str(&encode_component(&p.value));
        }
        url.set_query(Some(&encoded));
    }

    Ok(url)
}

/// Place `value` at a JSON pointer, creating objects (or arrays for numeric segments).
fn set_pointer(root: &mut Value, pointer: &str, value: Value) {
    let mut node = root;
    for segment in pointer.split('/').filter(|s| !s.is_empty()) {
        node = slot(node, segment);
    }
    *node = value;
}

fn slot<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    if let Ok(index) = segment.parse::<usize>() {
        if !node.is_array() {
            *node = Value::Array(Vec::new());
        }
        match node {
            Value::Array(items) => {
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                &mut items[index]
            }
            other => other,
        }
    } else {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        match node {
            Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
            other => other,
        }
    }
}

fn encode_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_descriptors;
    use serde_json::json;

    fn tool(name: &str) -> ToolDescriptor {
        builtin_descriptors()
            .into_iter()
            .find(|t| t.name == name)
            .expect("tool exists")
    }

    async fn render_single(name: &str, args: Value, deployment: Deployment) -> RenderedRequest {
        let d = tool(name);
        let validated = validate_arguments(&d, &args).expect("valid");
        let mut out = render(&d, &validated, deployment).await.expect("render");
        assert_eq!(out.len(), 1);
        out.remove(0)
    }

    fn query_of<'a>(r: &'a RenderedRequest, key: &str) -> Option<&'a str> {
        r.query
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    #[test]
    fn rejects_non_object_arguments() {
        let err = validate_arguments(&tool("jira_get_issue"), &json!([1])).expect_err("array");
        assert_eq!(err.kind, ToolErrorKind::InvalidArgument);
    }

    #[test]
    fn unknown_parameter_suggests_close_name() {
        let err = validate_arguments(&tool("jira_get_issue"), &json!({ "issue_kye": "A-1" }))
            .expect_err("unknown");
        assert_eq!(err.kind, ToolErrorKind::InvalidArgument);
        assert!(err.message.contains("did you mean 'issue_key'"), "{}", err.message);
    }

    #[test]
    fn missing_required_and_type_mismatch_are_invalid() {
        let d = tool("jira_get_issue");
        let err = validate_arguments(&d, &json!({})).expect_err("missing");
        assert_eq!(err.message, "missing required parameter: issue_key");

        let err = validate_arguments(&d, &json!({ "issue_key": 5 })).expect_err("mismatch");
        assert!(err.message.contains("expected a string"));
    }

    #[test]
    fn null_values_count_as_absent() {
        let d = tool("jira_get_issue");
        let args = validate_arguments(&d, &json!({ "issue_key": "A-1", "fields": null }))
            .expect("valid");
        assert!(!args.contains("fields"));
    }

    #[test]
    fn integers_clamp_and_defaults_apply() {
        let d = tool("jira_search_users");
        let args = validate_arguments(&d, &json!({ "query": "ann", "max_results": 500 }))
            .expect("valid");
        assert_eq!(args.get("max_results"), Some(&json!(100)));

        let args = validate_arguments(&d, &json!({ "query": "ann" })).expect("valid");
        assert_eq!(args.get("max_results"), Some(&json!(50)));
    }

    #[test]
    fn one_of_rejects_values_outside_the_set() {
        let d = tool("jira_update_sprint");
        let err = validate_arguments(&d, &json!({ "sprint_id": 3, "state": "future" }))
            .expect_err("not allowed");
        assert!(err.message.contains("active, closed"));
    }

    #[test]
    fn empty_fan_out_list_is_invalid() {
        let d = tool("jira_batch_get_changelogs");
        let err = validate_arguments(&d, &json!({ "issue_keys": [] })).expect_err("empty");
        assert!(err.message.contains("must not be empty"));
    }

    #[tokio::test]
    async fn blank_optional_strings_count_as_absent() {
        let r = render_single(
            "jira_get_project_issues",
            json!({ "project_key": "PROJ", "jql": "" }),
            Deployment::Server,
        )
        .await;
        assert_eq!(query_of(&r, "jql"), Some("project = PROJ"));

        let me = render_single(
            "jira_get_user_profile",
            json!({ "account_id": "  " }),
            Deployment::Cloud,
        )
        .await;
        assert_eq!(me.path, "/rest/api/2/myself");
        assert!(me.query.is_empty());

        let search = render_single(
            "jira_search_users",
            json!({ "query": "ann", "max_results": null }),
            Deployment::Server,
        )
        .await;
        assert_eq!(query_of(&search, "maxResults"), Some("50"));
    }

    #[test]
    fn blank_required_string_is_missing() {
        let err = validate_arguments(&tool("jira_get_issue"), &json!({ "issue_key": "" }))
            .expect_err("blank");
        assert_eq!(err.message, "missing required parameter: issue_key");
    }

    #[tokio::test]
    async fn assignee_pointer_depends_on_deployment() {
        let args = json!({
            "project_key": "PROJ",
            "summary": "s",
            "issue_type": "Task",
            "assignee": "ann"
        });
        let body_of = |r: RenderedRequest| match r.body {
            RequestBody::Json(b) => b,
            other => panic!("expected json body, got {other:?}"),
        };

        let cloud = body_of(render_single("jira_create_issue", args.clone(), Deployment::Cloud).await);
        assert_eq!(cloud["fields"]["assignee"], json!({ "id": "ann" }));

        let server = body_of(render_single("jira_update_issue", json!({ "issue_key": "A-1", "assignee": "ann" }), Deployment::Server).await);
        assert_eq!(server["fields"]["assignee"], json!({ "name": "ann" }));

        let server_create = body_of(render_single("jira_create_issue", args, Deployment::Server).await);
        assert_eq!(server_create["fields"]["assignee"], json!({ "name": "ann" }));
    }

    #[test]
    fn transition_needs_exactly_one_of_id_or_name() {
        let d = tool("jira_transition_issue");
        let err = validate_arguments(&d, &json!({ "issue_key": "A-1" })).expect_err("neither");
        assert_eq!(
            err.message,
            "one of 'transition_id' or 'transition_name' is required"
        );

        let err = validate_arguments(
            &d,
            &json!({ "issue_key": "A-1", "transition_id": "31", "transition_name": "Done" }),
        )
        .expect_err("both");
        assert!(err.message.contains("not both"), "{}", err.message);

        assert!(validate_arguments(&d, &json!({ "issue_key": "A-1", "transition_name": "Done" })).is_ok());
    }

    #[test]
    fn lookup_request_targets_candidate_list() {
        let d = tool("jira_transition_issue");
        let lookup = d.lookup.clone().expect("lookup");
        let args = validate_arguments(&d, &json!({ "issue_key": "A 1", "transition_name": "Done" }))
            .expect("valid");
        let r = render_lookup(&d, &lookup, &args).expect("render");
        assert_eq!(r.path, "/rest/api/2/issue/A%201/transitions");
        assert!(r.query.is_empty());
        assert!(matches!(r.body, RequestBody::Empty));
    }

    #[test]
    fn resolve_lookup_matches_case_insensitively() {
        let d = tool("jira_transition_issue");
        let lookup = d.lookup.clone().expect("lookup");
        let candidates = vec![
            json!({ "id": "11", "name": "Start Progress" }),
            json!({ "id": "31", "name": "Done" }),
        ];

        let args = validate_arguments(&d, &json!({ "issue_key": "A-1", "transition_name": "done" }))
            .expect("valid");
        let resolved = resolve_lookup(&lookup, &args, &candidates).expect("found");
        assert_eq!(resolved.get("transition_id"), Some(&json!("31")));

        let args = validate_arguments(&d, &json!({ "issue_key": "A-1", "transition_name": "Close" }))
            .expect("valid");
        let err = resolve_lookup(&lookup, &args, &candidates).expect_err("missing");
        assert_eq!(err.kind, ToolErrorKind::InvalidArgument);
        assert_eq!(
            err.message,
            "transition 'Close' not found; available transitions: Start Progress, Done"
        );
    }

    #[tokio::test]
    async fn create_issue_renders_nested_body() {
        let r = render_single(
            "jira_create_issue",
            json!({
                "project_key": "PROJ",
                "summary": "Broken login",
                "issue_type": "Bug",
                "priority": "High",
                "labels": "auth, urgent"
            }),
            Deployment::Server,
        )
        .await;
        assert_eq!(r.path, "/rest/api/2/issue");
        let RequestBody::Json(body) = r.body else {
            panic!("expected json body");
        };
        assert_eq!(
            body,
            json!({
                "fields": {
                    "project": { "key": "PROJ" },
                    "summary": "Broken login",
                    "issuetype": { "name": "Bug" },
                    "priority": { "name": "High" },
                    "labels": ["auth", "urgent"]
                }
            })
        );
    }

    #[tokio::test]
    async fn numeric_pointer_segments_create_arrays() {
        let r = render_single(
            "jira_transition_issue",
            json!({ "issue_key": "A-1", "transition_id": "31", "comment": "done" }),
            Deployment::Server,
        )
        .await;
        let RequestBody::Json(body) = r.body else {
            panic!("expected json body");
        };
        assert_eq!(body["transition"]["id"], "31");
        assert_eq!(body["update"]["comment"][0]["add"]["body"], "done");
    }

    #[tokio::test]
    async fn search_routes_by_deployment_and_applies_default_fields() {
        let server = render_single("jira_search", json!({ "jql": "project = X" }), Deployment::Server).await;
        assert_eq!(server.path, "/rest/api/2/search");
        assert_eq!(query_of(&server, "jql"), Some("project = X"));
        assert_eq!(query_of(&server, "maxResults"), Some("50"));
        assert!(query_of(&server, "fields").is_some_and(|f| f.starts_with("summary,status")));

        let cloud = render_single("jira_search", json!({ "jql": "project = X" }), Deployment::Cloud).await;
        assert_eq!(cloud.path, "/rest/api/3/search/jql");
    }

    #[tokio::test]
    async fn jql_clauses_are_joined() {
        let r = render_single(
            "jira_get_project_issues",
            json!({ "project_key": "PROJ", "jql": "status = Open" }),
            Deployment::Server,
        )
        .await;
        assert_eq!(query_of(&r, "jql"), Some("project = PROJ AND (status = Open)"));

        let epic = render_single(
            "jira_get_epic_issues",
            json!({ "epic_key": "PROJ-9" }),
            Deployment::Server,
        )
        .await;
        assert_eq!(query_of(&epic, "jql"), Some("\"Epic Link\" = PROJ-9"));
    }

    #[tokio::test]
    async fn user_profile_falls_back_to_myself() {
        let me = render_single("jira_get_user_profile", json!({}), Deployment::Cloud).await;
        assert_eq!(me.path, "/rest/api/2/myself");
        assert!(me.query.is_empty());

        let other = render_single(
            "jira_get_user_profile",
            json!({ "account_id": "abc" }),
            Deployment::Cloud,
        )
        .await;
        assert_eq!(other.path, "/rest/api/2/user");
        assert_eq!(query_of(&other, "accountId"), Some("abc"));
    }

    #[tokio::test]
    async fn fan_out_renders_one_request_per_item() {
        let d = tool("jira_batch_create_versions");
        let args = validate_arguments(
            &d,
            &json!({ "project_key": "PROJ", "version_names": ["1.0", "1.1"] }),
        )
        .expect("valid");
        let out = render(&d, &args, Deployment::Server).await.expect("render");
        assert_eq!(out.len(), 2);
        let names: Vec<Value> = out
            .iter()
            .map(|r| match &r.body {
                RequestBody::Json(b) => b["name"].clone(),
                other => panic!("unexpected body {other:?}"),
            })
            .collect();
        assert_eq!(names, vec![json!("1.0"), json!("1.1")]);
    }

    #[tokio::test]
    async fn path_values_are_percent_encoded() {
        let r = render_single(
            "jira_get_project_versions",
            json!({ "project_key": "A B/C" }),
            Deployment::Server,
        )
        .await;
        assert_eq!(r.path, "/rest/api/2/project/A%20B%2FC/versions");
    }

    #[tokio::test]
    async fn attachment_reads_file_and_uses_override_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("report.txt");
        std::fs::write(&file, b"contents").expect("write");

        let r = render_single(
            "jira_add_attachment",
            json!({ "issue_key": "A-1", "file_path": file.to_string_lossy(), "filename": "renamed.txt" }),
            Deployment::Server,
        )
        .await;
        match r.body {
            RequestBody::Multipart {
                field,
                file_name,
                bytes,
                ..
            } => {
                assert_eq!(field, "file");
                assert_eq!(file_name, "renamed.txt");
                assert_eq!(bytes, b"contents");
            }
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_file_is_invalid_argument() {
        let d = tool("jira_add_attachment");
        let args = validate_arguments(
            &d,
            &json!({ "issue_key": "A-1", "file_path": "/definitely/not/here.bin" }),
        )
        .expect("valid");
        let err = render(&d, &args, Deployment::Server)
            .await
            .expect_err("unreadable");
        assert_eq!(err.kind, ToolErrorKind::InvalidArgument);
    }

    #[test]
    fn build_url_encodes_query() {
        let url = build_url(
            "https://jira.example.com/",
            "/rest/api/2/search",
            &[QueryPair {
                key: "jql".into(),
                value: "project = X & y".into(),
            }],
        )
        .expect("url");
        assert_eq!(
            url.as_str(),
            "https://jira.example.com/rest/api/2/search?jql=project%20%3D%20X%20%26%20y"
        );
    }
}
