//! Local response filtering applied after a successful call.

use crate::descriptor::ResponseFilter;
use crate::render::Arguments;
use crate::result::Payload;
use serde_json::Value;

/// Apply `filter` to a list payload. Other payloads pass through untouched.
#[must_use]
pub fn apply_filter(filter: &ResponseFilter, args: &Arguments, payload: Payload) -> Payload {
    match (filter, payload) {
        (ResponseFilter::NameContains(param), Payload::List(items)) => {
            let Some(needle) = args
                .get(param)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
            else {
                return Payload::List(items);
            };
            Payload::List(
                items
                    .into_iter()
                    .filter(|item| matches_name_or_id(item, &needle))
                    .collect(),
            )
        }
        (_, other) => other,
    }
}

fn matches_name_or_id(item: &Value, needle: &str) -> bool {
    ["name", "id"].iter().any(|key| {
        item.get(*key)
            .and_then(Value::as_str)
            .is_some_and(|v| v.to_lowercase().contains(needle))
    })
}
