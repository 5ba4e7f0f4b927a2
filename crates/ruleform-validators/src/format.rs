//! Deferred `Format` conversions
//!
//! A `Format` token is recorded during the main pass and applied to the
//! final, normalized leaf once the whole tree has validated.

use chrono::{DateTime as ChronoDateTime, NaiveDateTime, NaiveTime};

use crate::errors::{CheckResult, Failure, ids};
use crate::numeric::{is_numeric, normalize_decimal, parse_bool, parse_finite_float, truncate_to_i64};
use crate::temporal::{COMPARABLE_DATETIME_FORMATS, parse_date, parse_datetime_with};
use crate::text::parse_count;
use crate::token::{Modifier, RuleToken};
use crate::value::{FormValue, is_blank_text};

/// Conversion target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTarget {
	String,
	Integer,
	Float,
	/// Float rounded half away from zero to `precision` decimals
	Round { precision: u32 },
	Boolean,
	DateTime,
}

/// A resolved `Format` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
	pub target: FormatTarget,
}

impl FormatSpec {
	/// Resolve the first modifier of a `Format` token
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_validators::format::{FormatSpec, FormatTarget};
	/// use ruleform_validators::{Modifier, RuleToken, Test};
	///
	/// let token = RuleToken::new(Test::Format)
	///     .with_modifier(Modifier::Round)
	///     .with_values(["2"]);
	/// let spec = FormatSpec::from_token(&token).unwrap();
	/// assert_eq!(spec.target, FormatTarget::Round { precision: 2 });
	/// ```
	#[track_caller]
	pub fn from_token(token: &RuleToken) -> CheckResult<Self> {
		let target = match token.modifiers.first() {
			Some(Modifier::String) => FormatTarget::String,
			Some(Modifier::Integer) => FormatTarget::Integer,
			Some(Modifier::Float) => FormatTarget::Float,
			Some(Modifier::Round) => {
				let precision = match token.values.first() {
					Some(raw) => parse_count("Format", raw)?,
					None => 0,
				};
				FormatTarget::Round {
					precision: u32::try_from(precision).map_err(|_| {
						Failure::grammar(ids::NON_NUMERIC_ARGUMENT, "Format precision is too large")
					})?,
				}
			}
			Some(Modifier::Boolean) => FormatTarget::Boolean,
			Some(Modifier::DateTime) => FormatTarget::DateTime,
			Some(other) => return Err(Failure::unsupported_modifier("Format", other.name())),
			None => {
				return Err(Failure::grammar(
					ids::UNSUPPORTED_MODIFIER,
					"Test 'Format' needs a target (string, integer, float, round, boolean, datetime)",
				));
			}
		};
		Ok(Self { target })
	}
}

fn conversion_failed(value: &str, target: &str) -> Failure {
	Failure::data(ids::FORMAT, format!("'{value}' cannot be converted to {target}"))
}

fn to_datetime(value: &str) -> Option<NaiveDateTime> {
	if let Some(dt) = parse_datetime_with(value, &COMPARABLE_DATETIME_FORMATS) {
		return Some(dt);
	}
	if let Some(date) = parse_date(value) {
		return Some(date.and_time(NaiveTime::MIN));
	}
	value
		.strip_prefix('@')
		.and_then(|secs| secs.parse::<i64>().ok())
		.and_then(|secs| ChronoDateTime::from_timestamp(secs, 0))
		.map(|dt| dt.naive_utc())
}

fn round_to(value: f64, precision: u32) -> f64 {
	let factor = 10f64.powi(precision as i32);
	(value * factor).round() / factor
}

/// Apply a conversion to one normalized leaf
///
/// Blank leaves are returned unchanged so `Null`/`NotNull` can still act on
/// them. Maps and files are never converted.
#[track_caller]
pub fn apply_format(spec: FormatSpec, value: &FormValue) -> CheckResult<FormValue> {
	let text = match value {
		FormValue::Text(text) if is_blank_text(text) => return Ok(value.clone()),
		FormValue::Map(_) | FormValue::File(_) | FormValue::Null => return Ok(value.clone()),
		other => other.to_scalar_string().unwrap_or_default(),
	};
	let trimmed = text.trim();

	let converted = match spec.target {
		FormatTarget::String => FormValue::Text(text.clone()),
		FormatTarget::Integer => {
			let numeric = normalize_decimal(trimmed);
			if !is_numeric(&numeric) {
				return Err(conversion_failed(trimmed, "an integer"));
			}
			FormValue::Int(
				truncate_to_i64(&numeric).map_err(|_| conversion_failed(trimmed, "an integer"))?,
			)
		}
		FormatTarget::Float => FormValue::Float(
			parse_finite_float(&normalize_decimal(trimmed))
				.map_err(|_| conversion_failed(trimmed, "a float"))?,
		),
		FormatTarget::Round { precision } => {
			let float = parse_finite_float(&normalize_decimal(trimmed))
				.map_err(|_| conversion_failed(trimmed, "a rounded float"))?;
			FormValue::Float(round_to(float, precision))
		}
		FormatTarget::Boolean => match value {
			FormValue::Bool(b) => FormValue::Bool(*b),
			_ => FormValue::Bool(
				parse_bool(trimmed).ok_or_else(|| conversion_failed(trimmed, "a boolean"))?,
			),
		},
		FormatTarget::DateTime => FormValue::DateTime(
			to_datetime(trimmed).ok_or_else(|| conversion_failed(trimmed, "a date-time"))?,
		),
	};
	Ok(converted)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::Test;
	use crate::value::INTERNAL_EMPTY;
	use chrono::NaiveDate;
	use rstest::rstest;

	fn spec(modifier: Modifier, values: &[&str]) -> FormatSpec {
		let token = RuleToken::new(Test::Format)
			.with_modifier(modifier)
			.with_values(values.iter().copied());
		FormatSpec::from_token(&token).unwrap()
	}

	#[rstest]
	#[case(Modifier::Integer, &[], "12,9", FormValue::Int(12))]
	#[case(Modifier::Float, &[], "3", FormValue::Float(3.0))]
	#[case(Modifier::Round, &[], "2.5", FormValue::Float(3.0))]
	#[case(Modifier::Round, &["2"], "1.23456", FormValue::Float(1.23))]
	#[case(Modifier::Boolean, &[], "yes", FormValue::Bool(true))]
	#[case(Modifier::String, &[], "007", FormValue::text("007"))]
	fn test_conversions(
		#[case] modifier: Modifier,
		#[case] values: &[&str],
		#[case] input: &str,
		#[case] expected: FormValue,
	) {
		assert_eq!(apply_format(spec(modifier, values), &FormValue::text(input)).unwrap(), expected);
	}

	#[rstest]
	fn test_datetime_conversion() {
		// Arrange
		let spec = spec(Modifier::DateTime, &[]);
		let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
			.unwrap()
			.and_hms_opt(0, 0, 0)
			.unwrap();

		// Act
		let converted = apply_format(spec, &FormValue::text("2024-05-01")).unwrap();

		// Assert
		assert_eq!(converted, FormValue::DateTime(expected));
	}

	#[rstest]
	fn test_blank_is_left_alone() {
		let value = FormValue::text(INTERNAL_EMPTY);
		assert_eq!(apply_format(spec(Modifier::Integer, &[]), &value).unwrap(), value);
	}

	#[rstest]
	#[case(Modifier::Integer, "twelve")]
	#[case(Modifier::Boolean, "perhaps")]
	#[case(Modifier::DateTime, "yesterday")]
	fn test_conversion_failures(#[case] modifier: Modifier, #[case] input: &str) {
		let failure = apply_format(spec(modifier, &[]), &FormValue::text(input)).unwrap_err();
		assert_eq!(failure.id, ids::FORMAT);
		assert_eq!(failure.code, 422);
	}

	#[rstest]
	fn test_missing_target_is_grammar_error() {
		let failure = FormatSpec::from_token(&RuleToken::new(Test::Format)).unwrap_err();
		assert_eq!(failure.id, ids::UNSUPPORTED_MODIFIER);
		assert_eq!(failure.code, 400);
	}
}
