//! Deferred tokens, `__CONFIG__` handling and grammar equivalence

use proptest::prelude::*;
use ruleform_forms::config::SanitizePolicy;
use ruleform_forms::{FormValue, Sanitizer, Validation};
use ruleform_validators::{Modifier, RuleToken, Test};
use rstest::rstest;
use serde_json::json;

#[rstest]
fn test_null_turns_blank_into_null() {
	let result = Validation::new()
		.validate(&json!({"note": " "}), &json!({"note": "string; null"}))
		.unwrap();

	assert_eq!(result.data().and_then(|d| d.get("note")), Some(&FormValue::Null));
}

#[rstest]
fn test_null_keeps_real_values() {
	let result = Validation::new()
		.validate(&json!({"note": "hello"}), &json!({"note": "nullable"}))
		.unwrap();

	assert_eq!(result.data().and_then(|d| d.get("note")), Some(&FormValue::text("hello")));
}

#[rstest]
#[case(json!({"comment": ""}))]
#[case(json!({"comment": "null"}))]
#[case(json!({}))]
fn test_not_null_yields_empty_string(#[case] data: serde_json::Value) {
	// Act
	let result = Validation::new()
		.validate(&data, &json!({"comment": "notnull"}))
		.unwrap();

	// Assert
	assert_eq!(result.data().and_then(|d| d.get("comment")), Some(&FormValue::text("")));
}

#[rstest]
#[case("number; f:r:2", "2.567", FormValue::Float(2.57))]
#[case("number; format:integer", "42", FormValue::Int(42))]
#[case("number; fmt:float", "7", FormValue::Float(7.0))]
#[case("boolean; format:bool", "on", FormValue::Bool(true))]
#[case("string; format:string", "007", FormValue::text("007"))]
fn test_format_replay(#[case] rule: &str, #[case] input: &str, #[case] expected: FormValue) {
	let result = Validation::new().validate_value(input, rule).unwrap();

	assert_eq!(result.data().and_then(|d| d.get("value")), Some(&expected));
}

#[rstest]
fn test_format_runs_on_the_rewritten_value() {
	let result = Validation::new()
		.validate_value("about 12,75 kg", "number:only; format:round:1")
		.unwrap();

	assert_eq!(
		result.data().and_then(|d| d.get("value")),
		Some(&FormValue::Float(12.8))
	);
}

#[rstest]
fn test_format_applies_per_array_entry() {
	let result = Validation::new()
		.validate(&json!({"qty": ["1", "2.9"]}), &json!({"qty": "number; f:i"}))
		.unwrap();

	assert_eq!(
		result.data().and_then(|d| d.get("qty")),
		Some(&FormValue::list([FormValue::Int(1), FormValue::Int(2)]))
	);
}

#[rstest]
fn test_format_failure_aborts() {
	let result = Validation::new()
		.validate(&json!({"when": "soon"}), &json!({"when": "string; format:datetime"}))
		.unwrap();

	let error = result.error().unwrap();
	assert_eq!(error.id, "vE105");
	assert_eq!(error.field.as_deref(), Some("when"));
}

#[rstest]
fn test_format_without_target_fails_before_walking() {
	let result = Validation::new()
		.validate(&json!({"n": "1"}), &json!({"n": "number; format"}))
		.unwrap();

	assert_eq!(result.error().map(|e| (e.id.as_str(), e.code)), Some(("vE002", 400)));
}

#[rstest]
fn test_ignored_field_is_untouched() {
	let result = Validation::new()
		.validate(
			&json!({"raw": " <b>kept</b> ", "other": " <b>x</b> "}),
			&json!({"raw": "required; ignore", "other": "string"}),
		)
		.unwrap();

	let data = result.data().unwrap();
	assert_eq!(data.get("raw"), Some(&FormValue::text(" <b>kept</b> ")));
	assert_eq!(data.get("other"), Some(&FormValue::text("x")));
}

#[rstest]
#[case("colour:true", "vE010")]
#[case("html", "vE012")]
#[case("strip:sometimes", "vE014")]
fn test_config_errors(#[case] config: &str, #[case] id: &str) {
	let result = Validation::new()
		.validate(&json!({"a": "b"}), &json!({"a": "string", "__CONFIG__": config}))
		.unwrap();

	let error = result.error().unwrap();
	assert_eq!(error.id, id);
	assert_eq!(error.code, 400);
	assert_eq!(error.field.as_deref(), Some("__CONFIG__"));
}

#[rstest]
fn test_config_is_checked_before_fields() {
	let result = Validation::new()
		.validate(&json!({"a": "1b"}), &json!({"a": "number", "__CONFIG__": "html:maybe"}))
		.unwrap();

	assert_eq!(result.error().map(|e| e.id.as_str()), Some("vE014"));
}

#[rstest]
fn test_config_as_object() {
	let result = Validation::new()
		.validate(
			&json!({"a": "<i>x</i> & y"}),
			&json!({"a": "string", "__CONFIG__": {"html": false, "strip": true}}),
		)
		.unwrap();

	assert_eq!(result.data().and_then(|d| d.get("a")), Some(&FormValue::text("x & y")));
}

#[rstest]
fn test_config_key_never_reaches_output() {
	let result = Validation::new()
		.validate(&json!({"__CONFIG__": "x", "a": "b"}), &json!({"a": "string"}))
		.unwrap();

	assert!(result.data().and_then(|d| d.get("__CONFIG__")).is_none());
}

#[rstest]
fn test_synonyms_tokenize_identically() {
	let expected = vec![RuleToken::new(Test::Alpha)];

	for spelling in ["alpha", "al", "a", "ALPHA", " Al "] {
		assert_eq!(Validation::tokenize(spelling), expected, "spelling {spelling:?}");
	}
}

#[rstest]
fn test_modifier_synonyms_tokenize_identically() {
	let expected = Validation::tokenize("number:only,float");

	assert_eq!(Validation::tokenize("n:o,f"), expected);
	assert_eq!(Validation::tokenize("numeric:o,fl"), expected);
	assert_eq!(expected[0].modifiers, vec![Modifier::Only, Modifier::Float]);
}

proptest! {
	#[test]
	fn prop_sanitized_output_is_stable(
		values in proptest::collection::vec(".{0,24}", 1..5),
		html in any::<bool>(),
		strip in any::<bool>(),
	) {
		let data: serde_json::Map<String, serde_json::Value> = values
			.iter()
			.enumerate()
			.map(|(i, v)| (format!("f{i}"), json!(v)))
			.collect();
		let rules: serde_json::Map<String, serde_json::Value> = (0..values.len())
			.map(|i| (format!("f{i}"), json!("string")))
			.collect();
		let mut rules = serde_json::Value::Object(rules);
		rules["__CONFIG__"] = json!(format!("html:{html};strip:{strip}"));

		let result = Validation::new()
			.validate(&serde_json::Value::Object(data), &rules)
			.unwrap();
		let once = result.into_data().unwrap();

		let mut twice = once.clone();
		Sanitizer::new(SanitizePolicy { html, strip }).sanitize(&mut twice);
		prop_assert_eq!(once, twice);
	}
}
