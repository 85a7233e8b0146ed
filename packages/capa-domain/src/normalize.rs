//! Plain-text extraction for the serialized list fields of a knowledge record.
//!
//! The store holds several historical shapes for the same logical field. Recognized shapes:
//!
//! - a JSON array of strings;
//! - a JSON array of objects, each exposing a why/cause or question/answer pair, or a single
//!   answer-like or step-like key;
//! - a JSON string whose content is itself one of the above (JSON encoded twice);
//! - a JSON object keyed `why1`..`whyN` plus `root_cause`, as produced by the 5 Whys suggestion;
//! - a single scalar or object, treated as a one-item list.
//!
//! Anything else falls through to best-effort string coercion. Text that is not JSON at all
//! decodes to [`ListField::Empty`].

use serde_json::{Map, Value};

const MAX_DECODE_DEPTH: usize = 3;
const WHY_PAIRS: [(&str, &str); 3] = [("why", "cause"), ("question", "answer"), ("why", "answer")];
const WHY_KEYS: [&str; 6] = ["why_answer", "answer", "why", "cause", "text", "statement"];
const STEP_KEYS: [&str; 7] =
	["step", "description", "action_text", "langkah", "action", "text", "title"];
const ROOT_CAUSE_KEY: &str = "root_cause";

/// Decoded list field. `Empty` covers absent, blank, and unparseable input alike.
#[derive(Debug, Clone, PartialEq)]
pub enum ListField {
	Items(Vec<Value>),
	Empty,
}
impl ListField {
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Items(items) => items.is_empty(),
			Self::Empty => true,
		}
	}

	pub fn into_items(self) -> Vec<Value> {
		match self {
			Self::Items(items) => items,
			Self::Empty => Vec::new(),
		}
	}
}

pub fn decode_list(raw: Option<&str>) -> ListField {
	let Some(raw) = raw else { return ListField::Empty };
	let trimmed = raw.trim();

	if trimmed.is_empty() {
		return ListField::Empty;
	}

	match serde_json::from_str::<Value>(trimmed) {
		Ok(value) => decode_value(value, 0),
		Err(_) => ListField::Empty,
	}
}

pub fn decode_value(value: Value, depth: usize) -> ListField {
	match value {
		Value::Null => ListField::Empty,
		Value::Array(items) if items.is_empty() => ListField::Empty,
		Value::Array(items) => ListField::Items(items),
		Value::String(text) => decode_string(text, depth),
		Value::Object(map) if map.is_empty() => ListField::Empty,
		Value::Object(map) => match numbered_whys(&map) {
			Some(items) => ListField::Items(items),
			None => ListField::Items(vec![Value::Object(map)]),
		},
		other => ListField::Items(vec![other]),
	}
}

/// Why statements in order. Blank entries are skipped; string entries are kept verbatim.
pub fn why_items(raw: Option<&str>) -> Vec<String> {
	decode_list(raw).into_items().iter().filter_map(why_item_text).collect()
}

/// All why statements joined by a single space, ready for embedding.
pub fn why_text(raw: Option<&str>) -> String {
	why_items(raw).join(" ")
}

pub fn action_items(raw: Option<&str>) -> Vec<String> {
	action_items_from_list(decode_list(raw))
}

/// Action items from an already-parsed value, such as one list inside an action-plan payload.
pub fn action_items_from_value(value: &Value) -> Vec<String> {
	action_items_from_list(decode_value(value.clone(), 0))
}

pub fn action_text(raw: Option<&str>) -> String {
	action_items(raw).join(" ")
}

fn action_items_from_list(list: ListField) -> Vec<String> {
	list.into_items().iter().filter_map(action_item_text).collect()
}

fn decode_string(text: String, depth: usize) -> ListField {
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return ListField::Empty;
	}
	if depth < MAX_DECODE_DEPTH
		&& (trimmed.starts_with('[') || trimmed.starts_with('{') || trimmed.starts_with('"'))
		&& let Ok(inner) = serde_json::from_str::<Value>(trimmed)
	{
		return decode_value(inner, depth + 1);
	}

	ListField::Items(vec![Value::String(text)])
}

fn numbered_whys(map: &Map<String, Value>) -> Option<Vec<Value>> {
	let mut numbered: Vec<(u32, &Value)> = map
		.iter()
		.filter_map(|(key, value)| {
			key.strip_prefix("why").and_then(|n| n.parse::<u32>().ok()).map(|n| (n, value))
		})
		.collect();

	if numbered.is_empty() {
		return None;
	}

	numbered.sort_by_key(|(n, _)| *n);

	let mut items: Vec<Value> = numbered.into_iter().map(|(_, value)| value.clone()).collect();

	if let Some(root_cause) = map.get(ROOT_CAUSE_KEY) {
		items.push(root_cause.clone());
	}

	Some(items)
}

fn why_item_text(item: &Value) -> Option<String> {
	let text = match item {
		Value::String(text) => text.clone(),
		Value::Object(map) => why_object_text(map),
		other => coerce_text(other),
	};

	non_blank(text)
}

fn why_object_text(map: &Map<String, Value>) -> String {
	for (left, right) in WHY_PAIRS {
		if let (Some(left), Some(right)) = (string_field(map, left), string_field(map, right)) {
			return format!("{left} {right}");
		}
	}
	for key in WHY_KEYS {
		if let Some(text) = string_field(map, key) {
			return text;
		}
	}

	coerce_text(&Value::Object(map.clone()))
}

fn action_item_text(item: &Value) -> Option<String> {
	let text = match item {
		Value::String(text) => text.clone(),
		Value::Object(map) => STEP_KEYS
			.iter()
			.find_map(|key| text_field(map, key))
			.or_else(|| STEP_KEYS.iter().find_map(|key| string_field(map, key)))
			.unwrap_or_else(|| if map.is_empty() { String::new() } else { item.to_string() }),
		Value::Null => String::new(),
		Value::Array(items) =>
			items.iter().filter_map(action_item_text).collect::<Vec<_>>().join(" "),
		other => other.to_string(),
	};

	non_blank(text)
}

/// Best-effort coercion: scalars print as-is, containers contribute their non-blank leaves in
/// order.
fn coerce_text(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(text) => text.clone(),
		Value::Bool(_) | Value::Number(_) => value.to_string(),
		Value::Array(items) => join_non_blank(items.iter().map(coerce_text)),
		Value::Object(map) => join_non_blank(map.values().map(coerce_text)),
	}
}

fn join_non_blank(parts: impl Iterator<Item = String>) -> String {
	parts.filter(|part| !part.trim().is_empty()).collect::<Vec<_>>().join(" ")
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
	match map.get(key)? {
		Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
		_ => None,
	}
}

/// Like [`text_field`], but numbers count as text too.
fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
	match map.get(key)? {
		Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
		Value::Number(number) => Some(number.to_string()),
		_ => None,
	}
}

fn non_blank(text: String) -> Option<String> {
	if text.trim().is_empty() { None } else { Some(text) }
}
