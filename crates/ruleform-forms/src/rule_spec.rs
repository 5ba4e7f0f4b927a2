//! Array-form rules
//!
//! Rules may be given as nested JSON instead of a rule string:
//!
//! ```json
//! {"string": true, "req": "true", "minl": {"c": "12"}, "0": "email"}
//! ```
//!
//! They are flattened to the string grammar before tokenizing so there is a
//! single token grammar downstream.

use serde_json::{Map, Value};

use crate::parser::VALUE_SEPARATOR;

/// Flatten one field's rule value into a rule string
///
/// # Examples
///
/// ```
/// use ruleform_forms::rule_spec::flatten_rule;
/// use serde_json::json;
///
/// let rule = json!({"string": true, "req": "true", "minl": {"c": "12"}, "mx": false});
/// assert_eq!(flatten_rule(&rule), "string;req;minl:c:12");
///
/// assert_eq!(flatten_rule(&json!(["required", {"min": 18}])), "required;min:18");
/// ```
pub fn flatten_rule(rule: &Value) -> String {
	let mut cells = Vec::new();
	collect_cells(rule, &mut cells);
	cells.join(";")
}

fn collect_cells(rule: &Value, cells: &mut Vec<String>) {
	match rule {
		Value::Null => {}
		Value::String(s) => push_cell(cells, s.clone()),
		Value::Bool(_) | Value::Number(_) => push_cell(cells, rule.to_string()),
		Value::Array(items) => {
			for item in items {
				collect_cells(item, cells);
			}
		}
		Value::Object(entries) => {
			for (key, value) in entries {
				if let Some(cell) = entry_cell(key, value) {
					push_cell(cells, cell);
				} else if is_index(key) {
					collect_cells(value, cells);
				}
			}
		}
	}
}

fn push_cell(cells: &mut Vec<String>, cell: String) {
	if !cell.trim().is_empty() {
		cells.push(cell);
	}
}

fn is_index(key: &str) -> bool {
	!key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

fn is_truthy_flag(value: &Value) -> bool {
	match value {
		Value::Bool(b) => *b,
		Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
		_ => false,
	}
}

fn scalar_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

/// The cell of one `key => value` entry; `None` drops the entry or, for
/// index keys holding collections, leaves it to be flattened positionally
fn entry_cell(key: &str, value: &Value) -> Option<String> {
	if is_index(key) {
		return match value {
			Value::String(s) => Some(s.clone()),
			_ => None,
		};
	}
	if is_truthy_flag(value) {
		return Some(key.to_string());
	}
	match value {
		Value::Null | Value::Bool(false) => None,
		Value::String(s) if s.trim().eq_ignore_ascii_case("false") => None,
		Value::String(_) | Value::Number(_) | Value::Bool(true) => {
			scalar_text(value).map(|v| format!("{key}:{v}"))
		}
		Value::Array(items) => {
			let joined = items
				.iter()
				.filter_map(scalar_text)
				.collect::<Vec<_>>()
				.join(&VALUE_SEPARATOR.to_string());
			Some(format!("{key}:{joined}"))
		}
		Value::Object(nested) => Some(nested_cell(key, nested)),
	}
}

/// `{"minl": {"c": "12"}}` reads as modifier `c` with value `12`
fn nested_cell(key: &str, nested: &Map<String, Value>) -> String {
	let mut modifiers = Vec::new();
	let mut values = Vec::new();

	for (inner_key, inner_value) in nested {
		if is_index(inner_key) {
			values.extend(scalar_text(inner_value));
			continue;
		}
		modifiers.push(inner_key.clone());
		match inner_value {
			Value::Array(items) => values.extend(items.iter().filter_map(scalar_text)),
			other if !is_truthy_flag(other) => values.extend(scalar_text(other)),
			_ => {}
		}
	}

	let values = values.join(&VALUE_SEPARATOR.to_string());
	match (modifiers.is_empty(), values.is_empty()) {
		(true, true) => key.to_string(),
		(true, false) => format!("{key}:{values}"),
		(false, true) => format!("{key}:{}", modifiers.join(",")),
		(false, false) => format!("{key}:{}:{values}", modifiers.join(",")),
	}
}
