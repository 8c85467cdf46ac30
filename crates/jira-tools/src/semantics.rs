//! MCP tool annotations for Jira tools.
//!
//! Hints follow RFC 9110-style method semantics, with the descriptor's read/write classification
//! taking precedence for `readOnlyHint`.

use crate::descriptor::{Classification, ToolDescriptor};
use reqwest::Method;
use rmcp::model::ToolAnnotations;

/// Annotations based on HTTP method semantics alone.
///
/// `openWorldHint` is always `true`: every tool talks to a remote Jira.
#[must_use]
pub fn annotations_for_method(method: &Method) -> ToolAnnotations {
    let open_world_hint = Some(true);
    let (read_only, destructive, idempotent) = if method == Method::GET {
        (Some(true), Some(false), Some(true))
    } else if method == Method::POST {
        (Some(false), Some(false), Some(false))
    } else if method == Method::PUT || method == Method::DELETE {
        (Some(false), Some(true), Some(true))
    } else {
        (None, None, None)
    };

    ToolAnnotations {
        title: None,
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint,
    }
}

#[must_use]
pub fn annotations_for(descriptor: &ToolDescriptor) -> ToolAnnotations {
    let mut annotations = annotations_for_method(&descriptor.method);
    annotations.read_only_hint = Some(descriptor.classification == Classification::Read);
    if descriptor.classification == Classification::Read {
        annotations.destructive_hint = Some(false);
    }
    annotations
}
