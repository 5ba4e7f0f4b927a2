//! Membership and identity checks

use std::collections::HashSet;

use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::token::{Modifier, RuleToken};

/// How the submitted entries relate to the rule's list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipMode {
	/// Entries joined with `,` must equal one list member
	Joined,
	/// Entries must contain every list member
	Superset,
	/// Entries must share at least one member with the list
	Intersects,
	/// Every entry must be a list member
	Subset,
}

impl MembershipMode {
	pub fn from_token(token: &RuleToken) -> Self {
		if token.has_modifier(&Modifier::Array) {
			Self::Superset
		} else if token.has_modifier(&Modifier::Any) {
			Self::Intersects
		} else if token.has_modifier(&Modifier::Only) {
			Self::Subset
		} else {
			Self::Joined
		}
	}

	/// Evaluate the relation
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_validators::choice::MembershipMode;
	///
	/// let list = ["red".to_string(), "blue".to_string(), "green".to_string()];
	/// let input = ["red".to_string(), "blue".to_string()];
	///
	/// assert!(!MembershipMode::Superset.holds(&input, &list));
	/// assert!(MembershipMode::Subset.holds(&input, &list));
	/// assert!(MembershipMode::Intersects.holds(&input, &list));
	/// ```
	pub fn holds(self, entries: &[String], list: &[String]) -> bool {
		let members: HashSet<&str> = list.iter().map(String::as_str).collect();
		let submitted: HashSet<&str> = entries.iter().map(String::as_str).collect();
		match self {
			Self::Joined => members.contains(entries.join(",").as_str()),
			Self::Superset => members.is_subset(&submitted),
			Self::Intersects => !members.is_disjoint(&submitted),
			Self::Subset => !submitted.is_empty() && submitted.is_subset(&members),
		}
	}
}

/// Submitted entries: the stashed array when the field is checked as a
/// whole, else the single value
fn entries(subject: &Subject<'_>, ctx: &ValidationContext<'_>) -> Option<Vec<String>> {
	if subject.is_stashed_array()
		&& let Some(stashed) = ctx.stashed_array()
	{
		return Some(stashed.to_vec());
	}
	subject.to_text().map(|text| vec![text])
}

fn membership(
	subject: Subject<'_>,
	token: &RuleToken,
	ctx: &ValidationContext<'_>,
) -> CheckResult<bool> {
	if token.values.is_empty() {
		return Err(Failure::missing_value(token.test.name()));
	}
	let submitted = entries(&subject, ctx).unwrap_or_default();
	Ok(MembershipMode::from_token(token).holds(&submitted, &token.values))
}

const MEMBERSHIP_MODIFIERS: &[Modifier] = &[Modifier::Array, Modifier::Any, Modifier::Only];

pub struct Enum;

impl RuleValidator for Enum {
	fn modifiers(&self) -> &'static [Modifier] {
		MEMBERSHIP_MODIFIERS
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		if membership(subject, token, ctx)? {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::ENUM,
				format!("Value must be one of: {}", token.values.join(", ")),
			))
		}
	}
}

pub struct Nenum;

impl RuleValidator for Nenum {
	fn modifiers(&self) -> &'static [Modifier] {
		MEMBERSHIP_MODIFIERS
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		if membership(subject, token, ctx)? {
			Err(Failure::data(
				ids::NENUM,
				format!("Value must not be one of: {}", token.values.join(", ")),
			))
		} else {
			Ok(Outcome::Accepted)
		}
	}
}

pub struct Equal;

impl RuleValidator for Equal {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let expected = token.joined_value()?;
		if subject.to_text().as_deref() == Some(expected.as_str()) {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(ids::EQUAL, format!("Value must equal '{expected}'")))
		}
	}
}

pub struct Nequal;

impl RuleValidator for Nequal {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let forbidden = token.joined_value()?;
		if subject.to_text().as_deref() == Some(forbidden.as_str()) {
			Err(Failure::data(
				ids::NEQUAL,
				format!("Value must not equal '{forbidden}'"),
			))
		} else {
			Ok(Outcome::Accepted)
		}
	}
}
