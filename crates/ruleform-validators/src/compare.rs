//! Range comparisons across sniffed value types
//!
//! Both the submitted value and the rule threshold are sniffed
//! independently. A string may match several kinds (`2024` is a number and
//! a year); the first pair whose kinds are comparable decides.

use chrono::{NaiveDate, NaiveTime, Timelike};

use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::numeric::{is_numeric, normalize_decimal};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::temporal::{
	COMPARABLE_DATETIME_FORMATS, parse_date, parse_datetime_with, parse_month, parse_time,
	parse_time_sec, parse_week, parse_year,
};
use crate::token::RuleToken;

/// Kinds a comparable value can be sniffed as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
	Number,
	/// `@<unix seconds>`
	Timestamp,
	Date,
	DateTime,
	Time,
	TimeSec,
	Week,
	YearMonth,
	Year,
}

impl ValueKind {
	/// Whether values of the two kinds may be compared
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_validators::compare::ValueKind;
	///
	/// assert!(ValueKind::Date.comparable_with(ValueKind::Week));
	/// assert!(ValueKind::Time.comparable_with(ValueKind::TimeSec));
	/// assert!(!ValueKind::Number.comparable_with(ValueKind::Date));
	/// ```
	pub fn comparable_with(self, other: Self) -> bool {
		use ValueKind::*;

		if self == other {
			return true;
		}
		let linked = |a: ValueKind, b: ValueKind| match a {
			Number => b == Timestamp,
			Timestamp => matches!(b, Number | Date | DateTime | Week | YearMonth | Year),
			Date => matches!(b, DateTime | Week | YearMonth | Year | Timestamp),
			Time => b == TimeSec,
			_ => false,
		};
		linked(self, other) || linked(other, self)
	}
}

/// A value converted to a comparable scalar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sniffed {
	pub kind: ValueKind,
	/// Numbers as-is, calendar values as UTC unix seconds, clock values as
	/// seconds since midnight
	pub scalar: f64,
}

fn epoch_seconds(date: NaiveDate) -> f64 {
	date.and_time(NaiveTime::MIN).and_utc().timestamp() as f64
}

fn clock_seconds(time: NaiveTime) -> f64 {
	f64::from(time.num_seconds_from_midnight())
}

/// Every kind `value` can be read as, in precedence order
///
/// # Examples
///
/// ```
/// use ruleform_validators::compare::{ValueKind, sniff};
///
/// let kinds: Vec<ValueKind> = sniff("2024").iter().map(|s| s.kind).collect();
/// assert_eq!(kinds, [ValueKind::Number, ValueKind::Year]);
/// ```
pub fn sniff(value: &str) -> Vec<Sniffed> {
	let value = value.trim();
	let mut found = Vec::new();
	let mut push = |kind, scalar: Option<f64>| {
		if let Some(scalar) = scalar {
			found.push(Sniffed { kind, scalar });
		}
	};

	let normalized = normalize_decimal(value);
	push(
		ValueKind::Number,
		is_numeric(&normalized)
			.then(|| normalized.parse::<f64>().ok())
			.flatten()
			.filter(|n| n.is_finite()),
	);
	push(
		ValueKind::Timestamp,
		value
			.strip_prefix('@')
			.and_then(|secs| secs.parse::<i64>().ok())
			.map(|secs| secs as f64),
	);
	push(ValueKind::Date, parse_date(value).map(epoch_seconds));
	push(
		ValueKind::DateTime,
		parse_datetime_with(value, &COMPARABLE_DATETIME_FORMATS)
			.map(|dt| dt.and_utc().timestamp() as f64),
	);
	push(ValueKind::Time, parse_time(value).map(clock_seconds));
	push(ValueKind::TimeSec, parse_time_sec(value).map(clock_seconds));
	push(ValueKind::Week, parse_week(value).map(epoch_seconds));
	push(ValueKind::YearMonth, parse_month(value).map(epoch_seconds));
	push(ValueKind::Year, parse_year(value).map(epoch_seconds));
	found
}

/// Sniff both sides and return the first comparable pair of scalars
#[track_caller]
pub fn comparable_pair(value: &str, threshold: &str) -> CheckResult<(f64, f64)> {
	let thresholds = sniff(threshold);
	if thresholds.is_empty() {
		return Err(Failure::grammar(
			ids::UNKNOWN_THRESHOLD_TYPE,
			format!("Cannot determine the type of threshold '{threshold}'"),
		));
	}
	let values = sniff(value);
	if values.is_empty() {
		return Err(Failure::data(
			ids::UNKNOWN_VALUE_TYPE,
			format!("Cannot determine the type of value '{value}'"),
		));
	}
	values
		.iter()
		.find_map(|v| {
			thresholds
				.iter()
				.find(|t| v.kind.comparable_with(t.kind))
				.map(|t| (v.scalar, t.scalar))
		})
		.ok_or_else(|| {
			Failure::data(
				ids::INCOMPARABLE_TYPES,
				format!("Value '{value}' cannot be compared with '{threshold}'"),
			)
		})
}

fn compared_text<'a>(subject: &Subject<'a>) -> CheckResult<&'a str> {
	subject.as_text().ok_or_else(|| {
		Failure::data(
			ids::UNKNOWN_VALUE_TYPE,
			"Only text values can be compared",
		)
	})
}

/// Upper bound, inclusive
pub struct Max;

impl RuleValidator for Max {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let threshold = token.joined_value()?;
		let value = compared_text(&subject)?;
		let (v, limit) = comparable_pair(value, &threshold)?;
		if v <= limit {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::MAX,
				format!("Value must not be greater than {threshold}"),
			))
		}
	}
}

/// Lower bound, inclusive
pub struct Min;

impl RuleValidator for Min {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let threshold = token.joined_value()?;
		let value = compared_text(&subject)?;
		let (v, limit) = comparable_pair(value, &threshold)?;
		if v >= limit {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::MIN,
				format!("Value must not be less than {threshold}"),
			))
		}
	}
}
