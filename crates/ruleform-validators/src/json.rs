//! JSON payload validator

use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::token::{Modifier, RuleToken};

/// Must decode as JSON; `array` also requires an array or object
pub struct Json;

impl RuleValidator for Json {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Array]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let text = subject
			.as_text()
			.ok_or_else(|| Failure::data(ids::JSON, "Value must be JSON text"))?;
		let decoded: serde_json::Value = serde_json::from_str(text)
			.map_err(|e| Failure::data(ids::JSON, format!("Value is not valid JSON: {e}")))?;

		if token.has_modifier(&Modifier::Array) && !(decoded.is_array() || decoded.is_object()) {
			return Err(Failure::data(
				ids::JSON_ARRAY,
				"JSON value must be an array or an object",
			));
		}
		Ok(Outcome::Accepted)
	}
}
