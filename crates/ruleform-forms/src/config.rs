//! Sanitizer policy and engine settings
//!
//! The per-call policy comes from the `__CONFIG__` pseudo-rule
//! (`"html:false|strip:true"`). Defaults for it, and for the network
//! collaborators, come from [`ValidationSettings`].

use std::time::Duration;

use ruleform_validators::ConfigProvider;
use ruleform_validators::errors::{CheckResult, Failure, ids};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved rule key carrying the sanitizer policy
pub const CONFIG_KEY: &str = "__CONFIG__";

/// Quoted spelling of [`CONFIG_KEY`] some form builders emit
pub const QUOTED_CONFIG_KEY: &str = "'__CONFIG__'";

/// What the sanitizer does to text leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizePolicy {
	/// HTML-escape text
	pub html: bool,
	/// Strip tags before escaping
	pub strip: bool,
}

impl Default for SanitizePolicy {
	fn default() -> Self {
		Self {
			html: true,
			strip: true,
		}
	}
}

fn parse_setting_bool(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
		"false" | "f" | "0" | "no" | "n" | "off" => Some(false),
		_ => None,
	}
}

/// Flatten a `__CONFIG__` rule given as JSON into its string form
///
/// Unlike ordinary array-form rules, `false` values are kept.
pub fn flatten_config(rule: &Value) -> String {
	match rule {
		Value::String(s) => s.clone(),
		Value::Array(items) => items
			.iter()
			.map(flatten_config)
			.filter(|cell| !cell.trim().is_empty())
			.collect::<Vec<_>>()
			.join(";"),
		Value::Object(entries) => entries
			.iter()
			.map(|(key, value)| match value {
				Value::Null => key.clone(),
				Value::String(s) => format!("{key}:{s}"),
				other => format!("{key}:{other}"),
			})
			.collect::<Vec<_>>()
			.join(";"),
		Value::Null => String::new(),
		other => other.to_string(),
	}
}

/// Parse a `__CONFIG__` rule string on top of `base`
///
/// Settings are `html` and `strip`; `fhtml` and `fstrip` are synonyms.
///
/// # Examples
///
/// ```
/// use ruleform_forms::config::{SanitizePolicy, parse_config_rule};
///
/// let policy = parse_config_rule("strip:f", SanitizePolicy::default()).unwrap();
/// assert!(policy.html);
/// assert!(!policy.strip);
///
/// assert!(parse_config_rule("colour:true", SanitizePolicy::default()).is_err());
/// ```
#[track_caller]
pub fn parse_config_rule(rule: &str, base: SanitizePolicy) -> CheckResult<SanitizePolicy> {
	let delimiter = if rule.contains(';') { ';' } else { '|' };
	let mut policy = base;

	for cell in rule.split(delimiter).map(str::trim).filter(|c| !c.is_empty()) {
		let (name, value) = match cell.split_once(':') {
			Some((name, value)) => (name.trim(), value.trim()),
			None => (cell, ""),
		};
		let slot = match name.to_ascii_lowercase().as_str() {
			// `f`-prefixed spellings are synonyms
			"html" | "fhtml" => &mut policy.html,
			"strip" | "fstrip" => &mut policy.strip,
			_ => {
				return Err(Failure::grammar(
					ids::UNKNOWN_CONFIG_SETTING,
					format!("Unknown configuration setting '{name}'"),
				));
			}
		};
		if value.is_empty() {
			return Err(Failure::grammar(
				ids::CONFIG_SETTING_WITHOUT_VALUE,
				format!("Configuration setting '{name}' needs a value"),
			));
		}
		*slot = parse_setting_bool(value).ok_or_else(|| {
			Failure::grammar(
				ids::CONFIG_VALUE_NOT_BOOLEAN,
				format!("Configuration setting '{name}' must be a boolean, got '{value}'"),
			)
		})?;
	}
	Ok(policy)
}

/// Error loading [`ValidationSettings`]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("Invalid settings document: {0}")]
	Json(#[from] serde_json::Error),
	#[error("Invalid value '{value}' for setting '{key}'")]
	InvalidValue { key: String, value: String },
}

/// Engine-wide defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
	/// Default for the `html` policy flag
	pub html: bool,
	/// Default for the `strip` policy flag
	pub strip: bool,
	/// Timeout of the `Url:exist` probe, in seconds
	pub url_probe_timeout_secs: u64,
	/// Regions tried by `Tel` when the rule names none
	pub tel_regions: Vec<String>,
}

impl Default for ValidationSettings {
	fn default() -> Self {
		Self {
			html: true,
			strip: true,
			url_probe_timeout_secs: 5,
			tel_regions: Vec::new(),
		}
	}
}

impl ValidationSettings {
	/// Load settings from a JSON document; missing keys keep their defaults
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_forms::config::ValidationSettings;
	///
	/// let settings = ValidationSettings::from_json_str(r#"{"strip": false}"#).unwrap();
	/// assert!(!settings.strip);
	/// assert_eq!(settings.url_probe_timeout_secs, 5);
	/// ```
	pub fn from_json_str(document: &str) -> Result<Self, SettingsError> {
		Ok(serde_json::from_str(document)?)
	}

	/// Load settings from a key/value provider
	///
	/// Reads `HTML`, `STRIP`, `URL_PROBE_TIMEOUT` and `TEL_REGIONS`; an
	/// [`EnvConfigProvider`](ruleform_validators::EnvConfigProvider) with a
	/// `RULEFORM_` prefix maps them to `RULEFORM_HTML` and so on.
	pub fn from_provider(provider: &dyn ConfigProvider) -> Result<Self, SettingsError> {
		let mut settings = Self::default();
		let invalid = |key: &str, value: &str| SettingsError::InvalidValue {
			key: key.to_string(),
			value: value.to_string(),
		};

		if let Some(value) = provider.get("HTML") {
			settings.html = parse_setting_bool(&value).ok_or_else(|| invalid("HTML", &value))?;
		}
		if let Some(value) = provider.get("STRIP") {
			settings.strip = parse_setting_bool(&value).ok_or_else(|| invalid("STRIP", &value))?;
		}
		if let Some(value) = provider.get("URL_PROBE_TIMEOUT") {
			settings.url_probe_timeout_secs = value
				.trim()
				.parse()
				.map_err(|_| invalid("URL_PROBE_TIMEOUT", &value))?;
		}
		if let Some(value) = provider.get("TEL_REGIONS") {
			settings.tel_regions = value
				.split(',')
				.map(|region| region.trim().to_ascii_uppercase())
				.filter(|region| !region.is_empty())
				.collect();
		}
		Ok(settings)
	}

	pub fn policy(&self) -> SanitizePolicy {
		SanitizePolicy {
			html: self.html,
			strip: self.strip,
		}
	}

	pub fn url_probe_timeout(&self) -> Duration {
		Duration::from_secs(self.url_probe_timeout_secs)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use ruleform_validators::MapConfigProvider;
	use serde_json::json;

	#[rstest]
	#[case("html:false", false, true)]
	#[case("html:0;strip:no", false, false)]
	#[case("fhtml:y|fstrip:n", true, false)]
	#[case("", true, true)]
	fn test_parse_config_rule(#[case] rule: &str, #[case] html: bool, #[case] strip: bool) {
		let policy = parse_config_rule(rule, SanitizePolicy::default()).unwrap();
		assert_eq!(policy, SanitizePolicy { html, strip });
	}

	#[rstest]
	#[case("colour:true", ids::UNKNOWN_CONFIG_SETTING)]
	#[case("html", ids::CONFIG_SETTING_WITHOUT_VALUE)]
	#[case("strip:  ", ids::CONFIG_SETTING_WITHOUT_VALUE)]
	#[case("html:maybe", ids::CONFIG_VALUE_NOT_BOOLEAN)]
	fn test_config_rule_errors(#[case] rule: &str, #[case] id: &str) {
		let failure = parse_config_rule(rule, SanitizePolicy::default()).unwrap_err();
		assert_eq!(failure.id, id);
		assert_eq!(failure.code, 400);
	}

	#[rstest]
	fn test_flatten_config_keeps_false() {
		let rule = json!({"html": false, "strip": "t"});
		assert_eq!(flatten_config(&rule), "html:false;strip:t");
	}

	#[rstest]
	fn test_settings_from_provider() {
		// Arrange
		let provider = MapConfigProvider::new()
			.with("STRIP", "off")
			.with("URL_PROBE_TIMEOUT", "2")
			.with("TEL_REGIONS", "de, at");

		// Act
		let settings = ValidationSettings::from_provider(&provider).unwrap();

		// Assert
		assert!(settings.html);
		assert!(!settings.strip);
		assert_eq!(settings.url_probe_timeout(), Duration::from_secs(2));
		assert_eq!(settings.tel_regions, vec!["DE", "AT"]);
	}

	#[rstest]
	fn test_settings_from_provider_rejects_garbage() {
		let provider = MapConfigProvider::new().with("HTML", "sometimes");
		let error = ValidationSettings::from_provider(&provider).unwrap_err();
		assert!(matches!(error, SettingsError::InvalidValue { ref key, .. } if key == "HTML"));
	}
}
