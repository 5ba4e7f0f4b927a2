//! Number and boolean validators

use std::sync::LazyLock;

use regex::Regex;

use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::token::{Modifier, RuleToken};

static NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$")
		.expect("NUMBER_REGEX: invalid regex pattern")
});

/// Largest `f64` strictly below `2^63`; anything at or above overflows `i64`
const I64_UPPER_EXCLUSIVE: f64 = 9_223_372_036_854_775_808.0;

/// Tri-state boolean parsing: `true/false/1/0/yes/no/on/off`, any case
///
/// # Examples
///
/// ```
/// use ruleform_validators::numeric::parse_bool;
///
/// assert_eq!(parse_bool("Yes"), Some(true));
/// assert_eq!(parse_bool("off"), Some(false));
/// assert_eq!(parse_bool("maybe"), None);
/// ```
pub fn parse_bool(value: &str) -> Option<bool> {
	match value.trim().to_ascii_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Some(true),
		"false" | "0" | "no" | "off" => Some(false),
		_ => None,
	}
}

/// Accept one comma as decimal point when no dot is present
pub fn normalize_decimal(value: &str) -> String {
	let trimmed = value.trim();
	if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
		trimmed.replacen(',', ".", 1)
	} else {
		trimmed.to_string()
	}
}

/// Whether a (decimal-normalized) string is a plain number
pub fn is_numeric(value: &str) -> bool {
	NUMBER_REGEX.is_match(value)
}

/// Pull a best-effort number out of arbitrary text
///
/// Keeps a sign only as the first character (or right after the exponent
/// marker), the first `.`/`,` before any exponent as `.`, the first `e`/`E`
/// once a digit was seen, and every digit. Returns `None` when no digit is
/// present.
///
/// # Examples
///
/// ```
/// use ruleform_validators::numeric::extract_number;
///
/// assert_eq!(extract_number("12.5,").as_deref(), Some("12.5"));
/// assert_eq!(extract_number("EUR -1,234.50").as_deref(), Some("1.23450"));
/// assert_eq!(extract_number("-7 apples").as_deref(), Some("-7"));
/// assert_eq!(extract_number("none"), None);
/// ```
pub fn extract_number(value: &str) -> Option<String> {
	let mut out = String::new();
	let mut seen_digit = false;
	let mut seen_separator = false;
	let mut seen_exponent = false;

	for (index, c) in value.chars().enumerate() {
		match c {
			'0'..='9' => {
				out.push(c);
				seen_digit = true;
			}
			'+' | '-' if index == 0 => out.push(c),
			'+' | '-' if out.ends_with('e') => out.push(c),
			'.' | ',' if !seen_separator && !seen_exponent => {
				out.push('.');
				seen_separator = true;
			}
			'e' | 'E' if seen_digit && !seen_exponent => {
				out.push('e');
				seen_exponent = true;
			}
			_ => {}
		}
	}

	if !seen_digit {
		return None;
	}
	while out.ends_with(['.', 'e', '+', '-']) {
		out.pop();
	}
	if out.is_empty() || out == "+" || out == "-" {
		return None;
	}
	Some(out)
}

/// Render a float with at least one fractional digit
pub fn render_float(value: f64) -> String {
	let rendered = value.to_string();
	if rendered.contains(['.', 'e', 'E']) || !value.is_finite() {
		rendered
	} else {
		format!("{rendered}.0")
	}
}

/// Parse and convert to an integer by truncation toward zero
#[track_caller]
pub fn truncate_to_i64(numeric: &str) -> CheckResult<i64> {
	let parsed: f64 = numeric
		.parse()
		.map_err(|_| Failure::data(ids::NUMBER, format!("'{numeric}' is not a number")))?;
	if !parsed.is_finite() || parsed >= I64_UPPER_EXCLUSIVE || parsed < i64::MIN as f64 {
		return Err(Failure::data(
			ids::NUMBER_OVERFLOW,
			format!("'{numeric}' is outside the integer range"),
		));
	}
	Ok(parsed as i64)
}

/// Parse as a finite float
#[track_caller]
pub fn parse_finite_float(numeric: &str) -> CheckResult<f64> {
	let parsed: f64 = numeric
		.parse()
		.map_err(|_| Failure::data(ids::NUMBER, format!("'{numeric}' is not a number")))?;
	if !parsed.is_finite() {
		return Err(Failure::data(
			ids::NUMBER_OVERFLOW,
			format!("'{numeric}' is outside the float range"),
		));
	}
	Ok(parsed)
}

pub struct Number;

impl RuleValidator for Number {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Only, Modifier::Float, Modifier::Integer]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let raw = subject
			.as_text()
			.ok_or_else(|| Failure::data(ids::NUMBER, "Value must be a number"))?;

		let numeric = if token.has_modifier(&Modifier::Only) {
			extract_number(raw)
				.ok_or_else(|| Failure::data(ids::NUMBER, "Value does not contain a number"))?
		} else {
			let normalized = normalize_decimal(raw);
			if !is_numeric(&normalized) {
				return Err(Failure::data(ids::NUMBER, "Value must be a number"));
			}
			normalized
		};

		if token.has_modifier(&Modifier::Integer) {
			let integer = truncate_to_i64(&numeric)?;
			return Ok(Outcome::Rewritten(integer.to_string()));
		}
		if token.has_modifier(&Modifier::Float) {
			let float = parse_finite_float(&numeric)?;
			return Ok(Outcome::Rewritten(render_float(float)));
		}
		if numeric == raw {
			Ok(Outcome::Accepted)
		} else if token.has_modifier(&Modifier::Only) {
			Ok(Outcome::Rewritten(numeric))
		} else {
			Ok(Outcome::Accepted)
		}
	}
}

/// Native booleans, or text the tri-state parser understands
pub struct Boolean;

impl RuleValidator for Boolean {
	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		match subject {
			Subject::Bool(_) => Ok(Outcome::Accepted),
			Subject::Text(text) if parse_bool(text).is_some() => Ok(Outcome::Accepted),
			_ => Err(Failure::data(ids::BOOLEAN, "Value must be a boolean")),
		}
	}
}
