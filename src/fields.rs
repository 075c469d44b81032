//! Field lookup with ordered alias fallbacks.
//!
//! Upstream JSON schemas are heterogeneous: a title may be called `title`,
//! `name` or `headline` depending on who publishes the feed. Each logical
//! field is described by a [`FieldAliases`] table of `(key, extractor)` pairs
//! tried in priority order; the first pair that yields a value wins.

use serde_json::{Map, Value};

/// Turns a raw JSON value into a usable string, or rejects it.
pub type Extractor = fn(&Value) -> Option<String>;

/// Ordered `(key, extractor)` candidates for one logical field.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub field: &'static str,
    pub candidates: &'static [(&'static str, Extractor)],
}

impl FieldAliases {
    pub fn extract(&self, item: &Map<String, Value>) -> Option<String> {
        self.candidates
            .iter()
            .find_map(|(key, extractor)| item.get(*key).and_then(extractor))
    }
}

/// Non-blank string, trimmed.
pub fn text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Non-blank string, or a number rendered as text (epoch timestamps).
pub fn text_or_number(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        other => text(other),
    }
}

pub const TITLE: FieldAliases = FieldAliases {
    field: "title",
    candidates: &[("title", text), ("name", text), ("headline", text)],
};

pub const URL: FieldAliases = FieldAliases {
    field: "url",
    candidates: &[
        ("url", text),
        ("link", text),
        ("href", text),
        ("sourceUrl", text),
    ],
};

pub const SUMMARY: FieldAliases = FieldAliases {
    field: "summary",
    candidates: &[
        ("summary", text),
        ("description", text),
        ("content", text),
        ("abstract", text),
        ("content_text", text),
    ],
};

pub const PUBLISHED: FieldAliases = FieldAliases {
    field: "published",
    candidates: &[
        ("published", text_or_number),
        ("date_published", text_or_number),
        ("publish_time", text_or_number),
        ("created_at", text_or_number),
        ("pubDate", text_or_number),
        ("date", text_or_number),
    ],
};

pub const IMAGE: FieldAliases = FieldAliases {
    field: "image",
    candidates: &[
        ("image", text),
        ("imageUrl", text),
        ("thumbnail", text),
        ("imgUrl", text),
    ],
};

/// Keys under which JSON APIs commonly nest their item list, in priority order.
pub const ITEM_COLLECTIONS: &[&str] = &["data", "items", "results", "articles"];

/// Locate the item list in a JSON API payload.
///
/// A top-level array is used as-is. For an object, the first collection key
/// present decides: if its value is not an array the payload has no items.
pub fn item_list(payload: &Value) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(map) => ITEM_COLLECTIONS
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(Value::as_array),
        _ => None,
    }
}
