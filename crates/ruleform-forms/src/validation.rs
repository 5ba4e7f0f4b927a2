//! Validation façade
//!
//! One call runs the fixed pipeline: normalize input, read `__CONFIG__`,
//! compile every rule, walk the tree, replay deferred tokens, sanitize.

use indexmap::IndexMap;
use ruleform_validators::errors::{CheckResult, Failure, ids};
use ruleform_validators::{Collaborators, FormValue, HttpUrlProber, RuleToken, ValidationContext};
use serde_json::Value;

use crate::config::{
	CONFIG_KEY, QUOTED_CONFIG_KEY, SanitizePolicy, ValidationSettings, flatten_config,
	parse_config_rule,
};
use crate::input::normalize_input;
use crate::parser::tokenize;
use crate::result::ValidationResult;
use crate::rule_spec::flatten_rule;
use crate::sanitizer::{Sanitizer, finalize_not_null};
use crate::special::SpecialMap;
use crate::walker::{RuleSet, Walker, prefill_absent};

/// Builder for [`Validation`]
#[derive(Debug, Default)]
pub struct ValidationBuilder {
	dev_messages: bool,
	raise_on_error: bool,
	collaborators: Option<Collaborators>,
	settings: ValidationSettings,
}

impl ValidationBuilder {
	/// Render failures for developers and hand them to the reporter
	pub fn dev_messages(mut self, enabled: bool) -> Self {
		self.dev_messages = enabled;
		self
	}

	/// Return failures as `Err` instead of an invalid result
	pub fn raise_on_error(mut self, enabled: bool) -> Self {
		self.raise_on_error = enabled;
		self
	}

	pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
		self.collaborators = Some(collaborators);
		self
	}

	pub fn settings(mut self, settings: ValidationSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn build(self) -> Validation {
		let collaborators = self.collaborators.unwrap_or_else(|| {
			Collaborators::default()
				.with_url_prober(HttpUrlProber::new(self.settings.url_probe_timeout()))
		});
		Validation {
			dev_messages: self.dev_messages,
			raise_on_error: self.raise_on_error,
			collaborators,
			settings: self.settings,
		}
	}
}

/// The validation engine
///
/// Holds no per-call state, so one instance can serve concurrent calls.
///
/// # Examples
///
/// ```
/// use ruleform_forms::Validation;
/// use serde_json::json;
///
/// let validation = Validation::new();
/// let result = validation
///     .validate(&json!({"age": "17"}), &json!({"age": "number; min:18"}))
///     .unwrap();
///
/// let error = result.error().unwrap();
/// assert_eq!(error.id, "vE079");
/// assert_eq!(error.code, 422);
/// ```
#[derive(Debug, Clone)]
pub struct Validation {
	dev_messages: bool,
	raise_on_error: bool,
	collaborators: Collaborators,
	settings: ValidationSettings,
}

impl Default for Validation {
	fn default() -> Self {
		Self::new()
	}
}

impl Validation {
	pub fn new() -> Self {
		Self::builder().build()
	}

	pub fn builder() -> ValidationBuilder {
		ValidationBuilder::default()
	}

	pub fn settings(&self) -> &ValidationSettings {
		&self.settings
	}

	/// Tokenize a rule string without validating anything
	pub fn tokenize(rule: &str) -> Vec<RuleToken> {
		tokenize(rule)
	}

	/// Validate a JSON request body against a rule object
	///
	/// `Err` is returned when `raise_on_error` is set, and always when
	/// `rules` is not an object.
	pub fn validate(&self, data: &Value, rules: &Value) -> Result<ValidationResult, Failure> {
		self.validate_tree(normalize_input(data), rules)
	}

	/// Validate a raw string body (JSON or plain text)
	pub fn validate_str(&self, body: &str, rules: &Value) -> Result<ValidationResult, Failure> {
		self.validate(&Value::String(body.to_string()), rules)
	}

	/// Validate one scalar against one rule string
	///
	/// The valid result's data is `{"value": <normalized value>}`.
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_forms::Validation;
	/// use ruleform_validators::FormValue;
	///
	/// let result = Validation::new().validate_value("12.5,", "number:o,f").unwrap();
	/// assert_eq!(result.data().and_then(|d| d.get("value")), Some(&FormValue::text("12.5")));
	/// ```
	pub fn validate_value(&self, value: &str, rule: &str) -> Result<ValidationResult, Failure> {
		let tree = FormValue::map([("value", FormValue::text(value))]);
		let rules = serde_json::json!({ "value": rule });
		self.validate_tree(tree, &rules)
	}

	/// Validate an already normalized tree
	pub fn validate_tree(&self, tree: FormValue, rules: &Value) -> Result<ValidationResult, Failure> {
		let Value::Object(rules) = rules else {
			return Err(Failure::grammar(
				ids::MALFORMED_RULES,
				"Rules must be an object keyed by field name",
			));
		};

		match self.run(tree, rules) {
			Ok(data) => {
				tracing::debug!("validation succeeded");
				Ok(ValidationResult::Valid { data })
			}
			Err(failure) => {
				let failure = if self.dev_messages {
					let detailed = failure.with_dev_details();
					self.collaborators.reporter.report(&detailed);
					detailed
				} else {
					failure
				};
				tracing::debug!(id = failure.id, field = ?failure.field, "validation failed");
				if self.raise_on_error {
					Err(failure)
				} else {
					Ok(ValidationResult::from(&failure))
				}
			}
		}
	}

	fn run(&self, tree: FormValue, rules: &serde_json::Map<String, Value>) -> CheckResult<FormValue> {
		let (config_rule, field_rules) = split_rules(rules);

		let policy = match &config_rule {
			Some(rule) => parse_config_rule(rule, self.settings.policy())
				.map_err(|f| f.at_field(CONFIG_KEY))?,
			None => self.settings.policy(),
		};
		let rule_set = RuleSet::compile(field_rules)?;

		let mut fields = match tree {
			FormValue::Map(fields) => fields,
			other => IndexMap::from([("0".to_string(), other)]),
		};
		prefill_absent(&mut fields, &rule_set);

		let mut ctx = ValidationContext::new(&self.collaborators)
			.with_dev_mode(self.dev_messages)
			.with_tel_regions(self.settings.tel_regions.clone());
		let specials = Walker::new(&mut ctx).walk(&mut fields, &rule_set)?;

		let mut tree = FormValue::Map(fields);
		replay(&specials, &mut tree)?;
		sanitize(policy, &rule_set, &mut tree);
		Ok(tree)
	}
}

/// Separate the `__CONFIG__` pseudo-rule from field rules, flattening
/// array-form rules to strings
fn split_rules(rules: &serde_json::Map<String, Value>) -> (Option<String>, Vec<(String, String)>) {
	let mut config = None;
	let mut fields = Vec::with_capacity(rules.len());
	for (key, rule) in rules {
		if key == CONFIG_KEY || key == QUOTED_CONFIG_KEY {
			config = Some(flatten_config(rule));
		} else {
			fields.push((key.clone(), flatten_rule(rule)));
		}
	}
	(config, fields)
}

fn replay(specials: &SpecialMap, tree: &mut FormValue) -> CheckResult<()> {
	if specials.is_empty() {
		return Ok(());
	}
	tracing::debug!("replaying deferred tokens");
	specials.apply(tree)
}

fn sanitize(policy: SanitizePolicy, rules: &RuleSet, tree: &mut FormValue) {
	let ignored = rules
		.iter()
		.filter(|(_, rule)| rule.ignore)
		.map(|(field, _)| field.clone());
	Sanitizer::new(policy).with_untouched(ignored).sanitize(tree);
	finalize_not_null(tree);
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_rules_must_be_an_object() {
		let validation = Validation::new();

		let failure = validation.validate(&json!({"a": "b"}), &json!("string")).unwrap_err();

		assert_eq!(failure.id, ids::MALFORMED_RULES);
		assert_eq!(failure.code, 400);
	}

	#[rstest]
	fn test_raise_on_error_returns_err() {
		// Arrange
		let validation = Validation::builder().raise_on_error(true).build();

		// Act
		let failure = validation
			.validate(&json!({"name": "x1"}), &json!({"name": "alpha"}))
			.unwrap_err();

		// Assert
		assert_eq!(failure.id, ids::ALPHA);
		assert_eq!(failure.field.as_deref(), Some("name"));
		assert!(failure.file.is_none());
	}

	#[rstest]
	fn test_dev_messages_fill_provenance() {
		let validation = Validation::builder().dev_messages(true).build();

		let result = validation
			.validate(&json!({"name": "x1"}), &json!({"name": "alpha"}))
			.unwrap();

		let error = result.error().unwrap();
		assert!(error.file.is_some());
		assert!(error.line.is_some());
		assert!(error.dev_message.as_deref().unwrap().contains("vE031"));
	}

	#[rstest]
	fn test_quoted_config_alias() {
		let validation = Validation::new();

		let result = validation
			.validate(&json!({"bio": "<b>hi</b>"}), &json!({"bio": "string", "'__CONFIG__'": "html:f"}))
			.unwrap();

		assert_eq!(result.data().and_then(|d| d.get("bio")), Some(&FormValue::text("hi")));
	}

	#[rstest]
	fn test_settings_supply_policy_defaults() {
		let settings = ValidationSettings {
			strip: false,
			..ValidationSettings::default()
		};
		let validation = Validation::builder().settings(settings).build();

		let result = validation
			.validate(&json!({"bio": "<i>x</i>"}), &json!({"bio": "string"}))
			.unwrap();

		assert_eq!(
			result.data().and_then(|d| d.get("bio")),
			Some(&FormValue::text("&lt;i&gt;x&lt;/i&gt;"))
		);
	}
}
