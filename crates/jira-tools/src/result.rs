//! Invocation results and their MCP rendering.

use crate::error::ToolError;
use base64::Engine as _;
use mime::Mime;
use rmcp::model::{CallToolResult, Content};
use serde_json::{Map, Value, json};

/// A decoded success payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Object(Map<String, Value>),
    List(Vec<Value>),
    Binary { bytes: Vec<u8>, mime_type: String },
}

pub type ToolResult = std::result::Result<Payload, ToolError>;

impl Payload {
    /// JSON view of the payload. Binaries become a base64 envelope.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Object(map) => Value::Object(map.clone()),
            Self::List(items) => Value::Array(items.clone()),
            Self::Binary { bytes, mime_type } => json!({
                "encoding": "base64",
                "mimeType": mime_type,
                "size": bytes.len(),
                "data": base64::engine::general_purpose::STANDARD.encode(bytes),
            }),
        }
    }
}

fn is_image_mime(mime_type: &str) -> bool {
    mime_type
        .parse::<Mime>()
        .is_ok_and(|m| m.type_() == mime::IMAGE)
}

/// Render a [`ToolResult`] as an MCP `tools/call` result.
#[must_use]
pub fn into_call_tool_result(result: ToolResult) -> CallToolResult {
    match result {
        Ok(Payload::Binary { bytes, mime_type }) if is_image_mime(&mime_type) => {
            let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
            CallToolResult {
                content: vec![Content::image(b64, mime_type)],
                structured_content: None,
                is_error: Some(false),
                meta: None,
            }
        }
        Ok(payload) => {
            let body = payload.to_value();
            let text = serde_json::to_string(&body).unwrap_or_else(|_| body.to_string());
            CallToolResult::success(vec![Content::text(text)])
        }
        Err(e) => {
            let body = json!({ "kind": e.kind, "message": e.message });
            CallToolResult::error(vec![Content::text(body.to_string())])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolErrorKind;

    fn first_content(result: &CallToolResult) -> Value {
        let v = serde_json::to_value(result).expect("CallToolResult serializes");
        v.get("content")
            .and_then(Value::as_array)
            .and_then(|a| a.first())
            .cloned()
            .expect("content[0]")
    }

    fn text_of(result: &CallToolResult) -> Value {
        let first = first_content(result);
        let text = first
            .get("text")
            .and_then(Value::as_str)
            .expect("content[0].text");
        serde_json::from_str(text).expect("json text")
    }

    #[test]
    fn object_payload_renders_as_json_text() {
        let mut map = Map::new();
        map.insert("key".into(), json!("PROJ-1"));
        let rendered = into_call_tool_result(Ok(Payload::Object(map)));
        assert_eq!(rendered.is_error, Some(false));
        assert_eq!(text_of(&rendered), json!({ "key": "PROJ-1" }));
    }

    #[test]
    fn errors_render_kind_and_message() {
        let err = ToolError::new(ToolErrorKind::NotFoundRemote, "resource not found");
        let rendered = into_call_tool_result(Err(err));
        assert_eq!(rendered.is_error, Some(true));
        assert_eq!(
            text_of(&rendered),
            json!({ "kind": "not_found_remote", "message": "resource not found" })
        );
    }

    #[test]
    fn non_image_binary_renders_base64_envelope() {
        let rendered = into_call_tool_result(Ok(Payload::Binary {
            bytes: b"hello".to_vec(),
            mime_type: "text/plain".into(),
        }));
        let body = text_of(&rendered);
        assert_eq!(body["encoding"], "base64");
        assert_eq!(body["data"], "aGVsbG8=");
        assert_eq!(body["size"], 5);
    }

    #[test]
    fn image_binary_renders_image_content() {
        let rendered = into_call_tool_result(Ok(Payload::Binary {
            bytes: vec![0x89, b'P', b'N', b'G'],
            mime_type: "image/png".into(),
        }));
        let first = first_content(&rendered);
        assert_eq!(first.get("type").and_then(Value::as_str), Some("image"));
        assert_eq!(
            first.get("mimeType").and_then(Value::as_str),
            Some("image/png")
        );
    }
}
