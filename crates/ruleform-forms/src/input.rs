//! Input normalization
//!
//! The only implicit coercion boundary: JSON input becomes a [`FormValue`]
//! tree of text leaves, uploaded-file records and maps.

use ruleform_validators::{FileValue, FormValue};
use serde_json::Value;

/// Normalize a request body into a map-shaped tree
///
/// A string body is JSON-decoded when possible; anything that does not
/// decode to a collection is wrapped in a one-element list.
///
/// # Examples
///
/// ```
/// use ruleform_forms::input::normalize_input;
/// use ruleform_validators::FormValue;
/// use serde_json::json;
///
/// let tree = normalize_input(&json!({"age": 17, "ok": true, "none": null}));
/// assert_eq!(tree.get("age"), Some(&FormValue::text("17")));
/// assert_eq!(tree.get("ok"), Some(&FormValue::text("true")));
/// assert_eq!(tree.get("none"), Some(&FormValue::text("null")));
///
/// let wrapped = normalize_input(&json!("plain words"));
/// assert_eq!(wrapped.get("0"), Some(&FormValue::text("plain words")));
/// ```
pub fn normalize_input(data: &Value) -> FormValue {
	match data {
		Value::String(body) => match serde_json::from_str::<Value>(body) {
			Ok(decoded @ (Value::Object(_) | Value::Array(_))) => normalize_node(&decoded),
			Ok(decoded) => FormValue::list([normalize_node(&decoded)]),
			Err(_) => FormValue::list([FormValue::text(body.clone())]),
		},
		Value::Object(_) | Value::Array(_) => match normalize_node(data) {
			tree @ FormValue::Map(_) => tree,
			file => FormValue::list([file]),
		},
		scalar => FormValue::list([normalize_node(scalar)]),
	}
}

/// Normalize any JSON node; used for input trees and programmatic callers
pub fn normalize_node(value: &Value) -> FormValue {
	match value {
		Value::Null => FormValue::text("null"),
		Value::Bool(b) => FormValue::text(b.to_string()),
		Value::Number(n) => FormValue::text(n.to_string()),
		Value::String(s) => FormValue::text(s.clone()),
		Value::Array(items) => FormValue::list(items.iter().map(normalize_node)),
		Value::Object(entries) => match FileValue::recognize(entries) {
			Some(file) => FormValue::File(file),
			None => FormValue::Map(
				entries
					.iter()
					.map(|(key, value)| (key.clone(), normalize_node(value)))
					.collect(),
			),
		},
	}
}
