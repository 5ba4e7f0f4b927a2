//! End-to-end validation scenarios

use ruleform_forms::{FormValue, Validation, ValidationResult};
use ruleform_validators::INTERNAL_EMPTY;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn validation() -> Validation {
	Validation::new()
}

fn field<'a>(result: &'a ValidationResult, key: &str) -> Option<&'a FormValue> {
	result.data().and_then(|data| data.get(key))
}

#[rstest]
fn test_alpha_number_accepts_letters_and_digits(validation: Validation) {
	// Act
	let result = validation
		.validate(&json!({"name": "John123"}), &json!({"name": "alphaNumber"}))
		.unwrap();

	// Assert
	assert!(result.is_valid());
	assert_eq!(field(&result, "name"), Some(&FormValue::text("John123")));
}

#[rstest]
fn test_below_minimum_is_a_data_error(validation: Validation) {
	let result = validation
		.validate(&json!({"age": "17"}), &json!({"age": "number;min:18"}))
		.unwrap();

	let error = result.error().unwrap();
	assert_eq!(error.id, "vE079");
	assert_eq!(error.code, 422);
	assert_eq!(error.field.as_deref(), Some("age"));
}

#[rstest]
fn test_enum_array_mode_needs_every_listed_member(validation: Validation) {
	// The submitted set must contain the whole rule list, so a partial
	// selection fails.
	let partial = validation
		.validate(
			&json!({"tags": ["red", "blue"]}),
			&json!({"tags": "enum:a:red,blue,green"}),
		)
		.unwrap();
	let complete = validation
		.validate(
			&json!({"tags": ["green", "red", "blue"]}),
			&json!({"tags": "enum:a:red,blue,green"}),
		)
		.unwrap();

	assert_eq!(partial.error().map(|e| e.id.as_str()), Some("vE051"));
	assert!(complete.is_valid());
	assert_eq!(
		complete.data().and_then(|d| d.get("tags")).and_then(|t| t.get("0")),
		Some(&FormValue::text("green"))
	);
}

#[rstest]
#[case("enum:only:red,blue,green", json!(["red", "blue"]), true)]
#[case("enum:only:red,blue,green", json!(["red", "pink"]), false)]
#[case("enum:any:red,blue", json!(["pink", "blue"]), true)]
#[case("nenum:any:red,blue", json!(["pink", "blue"]), false)]
#[case("enum:red,blue", json!(["red"]), true)]
fn test_enum_modes(
	validation: Validation,
	#[case] rule: &str,
	#[case] tags: Value,
	#[case] valid: bool,
) {
	let result = validation
		.validate(&json!({ "tags": tags }), &json!({ "tags": rule }))
		.unwrap();

	assert_eq!(result.is_valid(), valid);
}

#[rstest]
#[case(json!({"roles": [["admin"]]}), json!({"roles": "nenum:any:admin"}), "vE053")]
#[case(json!({"roles": ["user", ["guest", "admin"]]}), json!({"roles": "nenum:any:admin"}), "vE053")]
#[case(json!({"tags": ["red", ["x1"]]}), json!({"tags": "enum:any:red; alpha"}), "vE031")]
#[case(json!({"tags": [["red"], ["pink"]]}), json!({"tags": "enum:only:red,blue"}), "vE051")]
fn test_nested_arrays_in_whole_array_mode(
	validation: Validation,
	#[case] data: Value,
	#[case] rules: Value,
	#[case] id: &str,
) {
	let result = validation.validate(&data, &rules).unwrap();

	assert_eq!(result.error().map(|e| e.id.as_str()), Some(id));
}

#[rstest]
fn test_nested_arrays_pass_whole_array_mode(validation: Validation) {
	let result = validation
		.validate(
			&json!({"tags": ["red", ["blue", "green"]]}),
			&json!({"tags": "enum:a:red,blue,green; alpha"}),
		)
		.unwrap();

	assert!(result.is_valid());
}

#[rstest]
#[case("age", "   ", "number", "vE089")]
#[case("age", "[empty]", "number", "vE089")]
#[case("mail", "  ", "email", "vE047")]
#[case("d", "\t", "date", "vE037")]
fn test_whitespace_is_validated_not_skipped(
	validation: Validation,
	#[case] key: &str,
	#[case] value: &str,
	#[case] rule: &str,
	#[case] id: &str,
) {
	let result = validation
		.validate(&json!({ key: value }), &json!({ key: rule }))
		.unwrap();

	assert_eq!(result.error().map(|e| e.id.as_str()), Some(id));
}

#[rstest]
fn test_strip_disabled_keeps_escaped_tags(validation: Validation) {
	let result = validation
		.validate(
			&json!({"bio": "<b>hi</b>"}),
			&json!({"bio": "string", "__CONFIG__": "strip:f"}),
		)
		.unwrap();

	assert_eq!(field(&result, "bio"), Some(&FormValue::text("&lt;b&gt;hi&lt;/b&gt;")));
}

#[rstest]
fn test_absent_required_field(validation: Validation) {
	let result = validation
		.validate(&json!({}), &json!({"comment": "required"}))
		.unwrap();

	let error = result.error().unwrap();
	assert_eq!(error.id, "vE112");
	assert_eq!(error.code, 422);
}

#[rstest]
fn test_number_only_float_rewrites(validation: Validation) {
	let result = validation
		.validate(&json!({"amount": "12.5,"}), &json!({"amount": "number:o,f"}))
		.unwrap();

	assert_eq!(field(&result, "amount"), Some(&FormValue::text("12.5")));
}

#[rstest]
#[case("number:o,i", "-7.9 apples", "-7")]
#[case("number:o,i", "12,99", "12")]
#[case("number:i", "3.999", "3")]
#[case("number:o,f", "x42", "42.0")]
fn test_number_integer_truncates_toward_zero(
	validation: Validation,
	#[case] rule: &str,
	#[case] input: &str,
	#[case] expected: &str,
) {
	let result = validation.validate_value(input, rule).unwrap();

	assert_eq!(field(&result, "value"), Some(&FormValue::text(expected)));
}

#[rstest]
fn test_data_without_rules_passes_through(validation: Validation) {
	let result = validation
		.validate(&json!({"a": "1", "b": "<i>x</i>"}), &json!({"a": "number"}))
		.unwrap();

	let data = result.data().unwrap();
	assert_eq!(data.get("a"), Some(&FormValue::text("1")));
	assert_eq!(data.get("b"), Some(&FormValue::text("x")));
}

#[rstest]
fn test_output_keeps_input_order(validation: Validation) {
	let result = validation
		.validate(
			&json!({"z": "1", "a": "2", "m": "3"}),
			&json!({"m": "number", "a": "number", "z": "number"}),
		)
		.unwrap();

	let keys: Vec<&String> = result.data().and_then(FormValue::as_map).unwrap().keys().collect();
	assert_eq!(keys, vec!["z", "a", "m"]);
}

#[rstest]
fn test_nested_failure_reports_path(validation: Validation) {
	let result = validation
		.validate(
			&json!({"address": {"zip": "12345", "lines": ["1", "2b"]}}),
			&json!({"address": "number"}),
		)
		.unwrap();

	assert_eq!(result.error().and_then(|e| e.field.as_deref()), Some("address.lines.1"));
}

#[rstest]
fn test_array_form_rules(validation: Validation) {
	let result = validation
		.validate(
			&json!({"age": "17"}),
			&json!({"age": {"number": true, "min": 18, "format": false}}),
		)
		.unwrap();

	assert_eq!(result.error().map(|e| e.id.as_str()), Some("vE079"));
}

#[rstest]
fn test_string_body_is_decoded(validation: Validation) {
	let result = validation
		.validate_str(r#"{"name": "Ada"}"#, &json!({"name": "alpha"}))
		.unwrap();

	assert_eq!(field(&result, "name"), Some(&FormValue::text("Ada")));
}

#[rstest]
fn test_unknown_test_is_reported_even_for_absent_data(validation: Validation) {
	let result = validation
		.validate(&json!({}), &json!({"colour": "hue:warm"}))
		.unwrap();

	let error = result.error().unwrap();
	assert_eq!(error.id, "vE001");
	assert_eq!(error.code, 400);
}

#[rstest]
fn test_unsupported_modifier_is_a_grammar_error(validation: Validation) {
	let result = validation
		.validate(&json!({"name": "Ada"}), &json!({"name": "alpha:hash"}))
		.unwrap();

	let error = result.error().unwrap();
	assert_eq!(error.id, "vE002");
	assert_eq!(error.code, 400);
}

#[rstest]
fn test_regex_with_delimiters_inside_pattern(validation: Validation) {
	let rules = json!({"code": "regex:/^[a-z]{2};[0-9]|x$/; maxlength:4"});

	let ok = validation.validate(&json!({"code": "ab;1"}), &rules).unwrap();
	let bad = validation.validate(&json!({"code": "ab;12"}), &rules).unwrap();

	assert!(ok.is_valid());
	assert_eq!(bad.error().map(|e| e.id.as_str()), Some("vE081"));
}

#[rstest]
#[case("alpha")]
#[case("number; min:3")]
#[case("email")]
#[case("enum:a,b")]
#[case("date")]
#[case("length:3")]
#[case("regex:/^a$/")]
#[case("url")]
#[case("json")]
#[case("file")]
fn test_blank_optional_values_are_dropped(validation: Validation, #[case] rule: &str) {
	// Arrange
	let data = json!({"x": "", "y": INTERNAL_EMPTY});

	// Act
	let result = validation
		.validate(&data, &json!({ "x": rule, "y": rule }))
		.unwrap();

	// Assert
	let data = result.data().unwrap();
	assert!(data.get("x").is_none());
	assert!(data.get("y").is_none());
}
