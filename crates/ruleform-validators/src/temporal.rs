//! Calendar and clock validators
//!
//! Every format is checked by round trip: the value is parsed with an
//! explicit format, rendered again with the same format, and must come back
//! byte-for-byte. That rejects `2023-13-01`, `2023-02-30` and unpadded
//! variants such as `2023-1-5`.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::Regex;

use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::token::RuleToken;

static WEEK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(\d{4})-W(\d{2})$").expect("WEEK_REGEX: invalid regex pattern")
});

static MONTH_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^(\d{4})-(\d{2})$").expect("MONTH_REGEX: invalid regex pattern")
});

static YEAR_REGEX: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\d{4}$").expect("YEAR_REGEX: invalid regex pattern"));

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";
pub const TIME_SEC_FORMAT: &str = "%H:%M:%S";

/// Date-time formats a `DateTime` field accepts
pub const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Date-time shapes recognized when comparing values
pub const COMPARABLE_DATETIME_FORMATS: [&str; 4] = [
	"%Y-%m-%dT%H:%M",
	"%Y-%m-%dT%H:%M:%S",
	"%Y-%m-%d %H:%M",
	"%Y-%m-%d %H:%M:%S",
];

/// Strict `Y-m-d`
///
/// # Examples
///
/// ```
/// use ruleform_validators::temporal::parse_date;
///
/// assert!(parse_date("2024-02-29").is_some());
/// assert!(parse_date("2023-02-29").is_none());
/// assert!(parse_date("2023-1-05").is_none());
/// ```
pub fn parse_date(value: &str) -> Option<NaiveDate> {
	let date = NaiveDate::parse_from_str(value, DATE_FORMAT).ok()?;
	(date.format(DATE_FORMAT).to_string() == value).then_some(date)
}

/// Strict date-time in one of `formats`
pub fn parse_datetime_with(value: &str, formats: &[&str]) -> Option<NaiveDateTime> {
	formats.iter().find_map(|format| {
		let parsed = NaiveDateTime::parse_from_str(value, format).ok()?;
		(parsed.format(format).to_string() == value).then_some(parsed)
	})
}

/// Strict date-time in one of [`DATETIME_FORMATS`]
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
	parse_datetime_with(value, &DATETIME_FORMATS)
}

fn parse_clock(value: &str, format: &str) -> Option<NaiveTime> {
	let time = NaiveTime::parse_from_str(value, format).ok()?;
	(time.format(format).to_string() == value).then_some(time)
}

/// Strict `H:i`
pub fn parse_time(value: &str) -> Option<NaiveTime> {
	parse_clock(value, TIME_FORMAT)
}

/// Strict `H:i:s`
pub fn parse_time_sec(value: &str) -> Option<NaiveTime> {
	parse_clock(value, TIME_SEC_FORMAT)
}

/// `Y-\WW`, returning the Monday of that ISO week
///
/// # Examples
///
/// ```
/// use ruleform_validators::temporal::parse_week;
///
/// assert_eq!(parse_week("2024-W01").unwrap().to_string(), "2024-01-01");
/// assert!(parse_week("2023-W53").is_none());
/// ```
pub fn parse_week(value: &str) -> Option<NaiveDate> {
	let captures = WEEK_REGEX.captures(value)?;
	let year: i32 = captures[1].parse().ok()?;
	let week: u32 = captures[2].parse().ok()?;
	let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
	let iso = monday.iso_week();
	(format!("{:04}-W{:02}", iso.year(), iso.week()) == value).then_some(monday)
}

/// `Y-m`, returning the first day of that month
pub fn parse_month(value: &str) -> Option<NaiveDate> {
	let captures = MONTH_REGEX.captures(value)?;
	let year: i32 = captures[1].parse().ok()?;
	let month: u32 = captures[2].parse().ok()?;
	NaiveDate::from_ymd_opt(year, month, 1)
}

/// Four-digit year, returning January 1st
pub fn parse_year(value: &str) -> Option<NaiveDate> {
	if !YEAR_REGEX.is_match(value) {
		return None;
	}
	NaiveDate::from_ymd_opt(value.parse().ok()?, 1, 1)
}

fn temporal_check(
	subject: Subject<'_>,
	id: &'static str,
	message: &str,
	accepts: impl Fn(&str) -> bool,
) -> CheckResult<Outcome> {
	match subject.as_text() {
		Some(text) if accepts(text.trim()) => Ok(Outcome::Accepted),
		_ => Err(Failure::data(id, message)),
	}
}

pub struct Date;

impl RuleValidator for Date {
	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		temporal_check(subject, ids::DATE, "Value must be a date (YYYY-MM-DD)", |v| {
			parse_date(v).is_some()
		})
	}
}

pub struct DateTime;

impl RuleValidator for DateTime {
	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		temporal_check(
			subject,
			ids::DATETIME,
			"Value must be a date and time (YYYY-MM-DDTHH:MM or YYYY-MM-DD HH:MM:SS)",
			|v| parse_datetime(v).is_some(),
		)
	}
}

pub struct Time;

impl RuleValidator for Time {
	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		temporal_check(subject, ids::TIME, "Value must be a time (HH:MM)", |v| {
			parse_time(v).is_some() || parse_time_sec(v).is_some()
		})
	}
}

pub struct Week;

impl RuleValidator for Week {
	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		temporal_check(subject, ids::WEEK, "Value must be a week (YYYY-Www)", |v| {
			parse_week(v).is_some()
		})
	}
}

pub struct Month;

impl RuleValidator for Month {
	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		temporal_check(subject, ids::MONTH, "Value must be a month (YYYY-MM)", |v| {
			parse_month(v).is_some()
		})
	}
}
