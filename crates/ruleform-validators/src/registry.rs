//! Static validator registry
//!
//! Every canonical [`Test`] maps to exactly one validator. Resolution happens
//! before any data is inspected, so an unknown test fails the whole call
//! without side effects.

use crate::choice::{Enum, Equal, Nenum, Nequal};
use crate::compare::{Max, Min};
use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::file::{Extension, File, Mime, Size};
use crate::json::Json;
use crate::network::{Email, Ip, Tel, Url};
use crate::numeric::{Boolean, Number};
use crate::required::Required;
use crate::temporal::{Date, DateTime, Month, Time, Week};
use crate::text::{
	Alpha, AlphaNumber, Length, MaxLength, MaxWords, MinLength, MinWords, Password, Regex,
	StringTest,
};
use crate::token::{Modifier, RuleToken, Test};
use crate::value::{ARRAY_REPLACE_VALUE, FileValue, is_blank_text, is_unset_text};

/// The value a validator looks at
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Subject<'a> {
	Text(&'a str),
	Bool(bool),
	File(&'a FileValue),
}

impl<'a> Subject<'a> {
	/// Blank text, the empty sentinel, or a "no file uploaded" record
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Text(s) => is_blank_text(s),
			Self::Bool(_) => false,
			Self::File(f) => f.is_missing(),
		}
	}

	/// Nothing submitted at all: `""`, the empty sentinel, or a "no file
	/// uploaded" record. Whitespace-only text is not unset.
	pub fn is_unset(&self) -> bool {
		match self {
			Self::Text(s) => is_unset_text(s),
			Self::Bool(_) => false,
			Self::File(f) => f.is_missing(),
		}
	}

	pub fn as_text(&self) -> Option<&'a str> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_file(&self) -> Option<&'a FileValue> {
		match self {
			Self::File(f) => Some(f),
			_ => None,
		}
	}

	/// Whether this is the stand-in for an array stashed in the context
	pub fn is_stashed_array(&self) -> bool {
		matches!(self, Self::Text(s) if *s == ARRAY_REPLACE_VALUE)
	}

	/// Textual form used by text-oriented validators
	pub fn to_text(&self) -> Option<String> {
		match self {
			Self::Text(s) => Some((*s).to_string()),
			Self::Bool(b) => Some(b.to_string()),
			Self::File(_) => None,
		}
	}
}

/// Result of a successful check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
	/// Value accepted unchanged
	Accepted,
	/// Value accepted and replaced
	Rewritten(String),
	/// Nothing was submitted; the decision is left to Required/Null/NotNull
	Empty,
}

/// One pluggable check
pub trait RuleValidator: Send + Sync {
	/// Modifiers this test understands
	fn modifiers(&self) -> &'static [Modifier] {
		&[]
	}

	/// Whether the validator wants to see empty values itself instead of
	/// short-circuiting to [`Outcome::Empty`]
	fn handles_empty(&self) -> bool {
		false
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome>;
}

/// How a resolved token is executed
#[derive(Clone, Copy)]
pub enum Dispatch {
	/// Runs during the main pass
	Immediate(&'static dyn RuleValidator),
	/// Recorded and replayed after the main pass
	Deferred,
}

impl std::fmt::Debug for Dispatch {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Immediate(_) => f.write_str("Immediate"),
			Self::Deferred => f.write_str("Deferred"),
		}
	}
}

/// Resolve a test to its validator
///
/// # Examples
///
/// ```
/// use ruleform_validators::registry::{Dispatch, resolve};
/// use ruleform_validators::Test;
///
/// assert!(matches!(resolve(&Test::Alpha), Ok(Dispatch::Immediate(_))));
/// assert!(matches!(resolve(&Test::Format), Ok(Dispatch::Deferred)));
/// assert!(resolve(&Test::Unknown("Colour".into())).is_err());
/// ```
#[track_caller]
pub fn resolve(test: &Test) -> CheckResult<Dispatch> {
	let validator: &'static dyn RuleValidator = match test {
		Test::Format | Test::Null | Test::NotNull | Test::Ignore => return Ok(Dispatch::Deferred),
		Test::Alpha => &Alpha,
		Test::AlphaNumber => &AlphaNumber,
		Test::Boolean => &Boolean,
		Test::Date => &Date,
		Test::DateTime => &DateTime,
		Test::Email => &Email,
		Test::Enum => &Enum,
		Test::Equal => &Equal,
		Test::Extension => &Extension,
		Test::File => &File,
		Test::Ip => &Ip,
		Test::Json => &Json,
		Test::Length => &Length,
		Test::Max => &Max,
		Test::MaxLength => &MaxLength,
		Test::MaxWords => &MaxWords,
		Test::Mime => &Mime,
		Test::Min => &Min,
		Test::MinLength => &MinLength,
		Test::MinWords => &MinWords,
		Test::Month => &Month,
		Test::Nenum => &Nenum,
		Test::Nequal => &Nequal,
		Test::Number => &Number,
		Test::Password => &Password,
		Test::Regex => &Regex,
		Test::Required => &Required,
		Test::Size => &Size,
		Test::String => &StringTest,
		Test::Tel => &Tel,
		Test::Time => &Time,
		Test::Url => &Url,
		Test::Week => &Week,
		Test::Unknown(name) => {
			return Err(Failure::grammar(
				ids::UNKNOWN_TEST,
				format!("Test '{name}' does not exist"),
			));
		}
	};
	Ok(Dispatch::Immediate(validator))
}

/// Run one validator with the uniform conventions applied: modifiers are
/// checked first, then empty input short-circuits unless the validator
/// handles it.
pub fn evaluate(
	validator: &dyn RuleValidator,
	subject: Subject<'_>,
	token: &RuleToken,
	ctx: &mut ValidationContext<'_>,
) -> CheckResult<Outcome> {
	token.ensure_modifiers(validator.modifiers())?;
	if !validator.handles_empty() && subject.is_unset() {
		tracing::trace!(test = %token.test, "empty value, deferring decision");
		return Ok(Outcome::Empty);
	}
	tracing::trace!(test = %token.test, "dispatching");
	validator.check(subject, token, ctx)
}

/// Resolve and evaluate in one step; deferred tests accept unchanged
pub fn run(
	token: &RuleToken,
	subject: Subject<'_>,
	ctx: &mut ValidationContext<'_>,
) -> CheckResult<Outcome> {
	match resolve(&token.test)? {
		Dispatch::Immediate(validator) => evaluate(validator, subject, token, ctx),
		Dispatch::Deferred => Ok(Outcome::Accepted),
	}
}
