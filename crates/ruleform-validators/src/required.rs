//! Presence validator
//!
//! `Required` is the only test that sees blank values itself: whitespace,
//! the empty sentinel, an empty array or a missing upload all fail it.

use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::token::RuleToken;

/// Rejects blank text, the empty sentinel, empty arrays and missing uploads
pub struct Required;

impl RuleValidator for Required {
	fn handles_empty(&self) -> bool {
		true
	}

	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		if subject.is_stashed_array() {
			return match ctx.stashed_array() {
				Some(entries) if !entries.is_empty() => Ok(Outcome::Accepted),
				_ => Err(Failure::data(ids::REQUIRED, "Value is required")),
			};
		}
		match subject {
			Subject::File(file) if file.is_missing() => {
				Err(Failure::data(ids::FILE_REQUIRED, "A file upload is required"))
			}
			_ if subject.is_empty() => Err(Failure::data(ids::REQUIRED, "Value is required")),
			_ => Ok(Outcome::Accepted),
		}
	}
}
