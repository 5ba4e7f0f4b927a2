//! Structured validation failures
//!
//! A [`Failure`] aborts a whole `validate()` call. It always carries a
//! stable id (`vEnnn`), an HTTP-style status code and a human message; in
//! developer mode it additionally records where in the engine it was raised.

use std::panic::Location;

/// Failure catalogue. Grammar/programmer errors use 400, data errors 422.
pub mod ids {
	pub const UNKNOWN_TEST: &str = "vE001";
	pub const UNSUPPORTED_MODIFIER: &str = "vE002";
	pub const MISSING_RULE_VALUE: &str = "vE004";
	pub const MALFORMED_REGEX: &str = "vE006";
	pub const MALFORMED_SIZE: &str = "vE008";
	pub const UNKNOWN_CONFIG_SETTING: &str = "vE010";
	pub const CONFIG_SETTING_WITHOUT_VALUE: &str = "vE012";
	pub const CONFIG_VALUE_NOT_BOOLEAN: &str = "vE014";
	pub const NON_NUMERIC_ARGUMENT: &str = "vE016";
	pub const INCOMPARABLE_TYPES: &str = "vE018";
	pub const UNKNOWN_THRESHOLD_TYPE: &str = "vE020";
	pub const UNKNOWN_VALUE_TYPE: &str = "vE021";
	pub const UNSUPPORTED_TEL_REGION: &str = "vE022";
	pub const PASSWORD_HASH_FAILED: &str = "vE024";
	pub const MALFORMED_RULES: &str = "vE026";

	pub const ALPHA: &str = "vE031";
	pub const ALPHA_NUMBER: &str = "vE033";
	pub const BOOLEAN: &str = "vE035";
	pub const DATE: &str = "vE037";
	pub const DATETIME: &str = "vE039";
	pub const TIME: &str = "vE041";
	pub const WEEK: &str = "vE043";
	pub const MONTH: &str = "vE045";
	pub const EMAIL: &str = "vE047";
	pub const EMAIL_DOMAIN: &str = "vE049";
	pub const ENUM: &str = "vE051";
	pub const NENUM: &str = "vE053";
	pub const EQUAL: &str = "vE055";
	pub const NEQUAL: &str = "vE057";
	pub const EXTENSION: &str = "vE059";
	pub const MIME: &str = "vE061";
	pub const FILE_SHAPE: &str = "vE063";
	pub const FILE_UPLOAD_ERROR: &str = "vE065";
	pub const FILE_NOT_UPLOADED: &str = "vE067";
	pub const IP: &str = "vE069";
	pub const JSON: &str = "vE071";
	pub const JSON_ARRAY: &str = "vE073";
	pub const LENGTH: &str = "vE075";
	pub const MAX: &str = "vE077";
	pub const MIN: &str = "vE079";
	pub const MAX_LENGTH: &str = "vE081";
	pub const MIN_LENGTH: &str = "vE083";
	pub const MAX_WORDS: &str = "vE085";
	pub const MIN_WORDS: &str = "vE087";
	pub const NUMBER: &str = "vE089";
	pub const NUMBER_OVERFLOW: &str = "vE091";
	pub const PASSWORD: &str = "vE093";
	pub const REGEX: &str = "vE095";
	pub const SIZE: &str = "vE097";
	pub const TEL: &str = "vE099";
	pub const URL: &str = "vE101";
	pub const URL_NOT_REACHABLE: &str = "vE103";
	pub const FORMAT: &str = "vE105";
	pub const FILE_REQUIRED: &str = "vE109";
	pub const REQUIRED: &str = "vE112";
	pub const STRING: &str = "vE113";
}

/// Broad class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
	/// The rule set is misconfigured (bad test name, modifier, argument)
	Grammar,
	/// The submitted value failed a semantic check
	Data,
	/// The engine itself could not complete a step
	Internal,
}

impl FailureKind {
	/// Conventional status code for this class
	pub fn status_code(self) -> u16 {
		match self {
			Self::Grammar => 400,
			Self::Data => 422,
			Self::Internal => 500,
		}
	}
}

/// A validation failure
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{id}] {}{message}", field_prefix(.field))]
pub struct Failure {
	/// Stable identifier, e.g. `vE079`
	pub id: &'static str,
	/// HTTP-style status code (400, 422 or 500)
	pub code: u16,
	pub kind: FailureKind,
	/// Human readable message
	pub message: String,
	/// Path of the offending field, e.g. `tags.1`
	pub field: Option<String>,
	/// Developer-facing rendering, only filled in developer mode
	pub dev_message: Option<String>,
	/// Source file of the raising call site, only filled in developer mode
	pub file: Option<&'static str>,
	/// Source line of the raising call site, only filled in developer mode
	pub line: Option<u32>,
	origin: &'static Location<'static>,
}

pub type CheckResult<T> = Result<T, Failure>;

impl Failure {
	#[track_caller]
	fn new(kind: FailureKind, id: &'static str, message: impl Into<String>) -> Self {
		Self {
			id,
			code: kind.status_code(),
			kind,
			message: message.into(),
			field: None,
			dev_message: None,
			file: None,
			line: None,
			origin: Location::caller(),
		}
	}

	/// A rule-set (programmer) error, status 400
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_validators::errors::{ids, Failure, FailureKind};
	///
	/// let failure = Failure::grammar(ids::UNKNOWN_TEST, "Test 'Foo' does not exist");
	/// assert_eq!(failure.code, 400);
	/// assert_eq!(failure.kind, FailureKind::Grammar);
	/// ```
	#[track_caller]
	pub fn grammar(id: &'static str, message: impl Into<String>) -> Self {
		Self::new(FailureKind::Grammar, id, message)
	}

	/// An input-data error, status 422
	#[track_caller]
	pub fn data(id: &'static str, message: impl Into<String>) -> Self {
		Self::new(FailureKind::Data, id, message)
	}

	/// An engine error, status 500
	#[track_caller]
	pub fn internal(id: &'static str, message: impl Into<String>) -> Self {
		Self::new(FailureKind::Internal, id, message)
	}

	/// Shorthand for the "unsupported modifier" grammar error
	#[track_caller]
	pub fn unsupported_modifier(test: &str, modifier: &str) -> Self {
		Self::grammar(
			ids::UNSUPPORTED_MODIFIER,
			format!("Modifier '{modifier}' is not supported by test '{test}'"),
		)
	}

	/// Shorthand for the "missing rule value" grammar error
	#[track_caller]
	pub fn missing_value(test: &str) -> Self {
		Self::grammar(
			ids::MISSING_RULE_VALUE,
			format!("Test '{test}' requires a value"),
		)
	}

	/// Attach the path of the field being validated, keeping an inner path
	/// that was already set.
	pub fn at_field(mut self, path: impl Into<String>) -> Self {
		if self.field.is_none() {
			self.field = Some(path.into());
		}
		self
	}

	/// Fill in provenance and the developer rendering
	pub fn with_dev_details(mut self) -> Self {
		self.file = Some(self.origin.file());
		self.line = Some(self.origin.line());
		self.dev_message = Some(self.render_for_developer());
		self
	}

	/// Render the failure for a developer audience
	pub fn render_for_developer(&self) -> String {
		let field = self
			.field
			.as_deref()
			.map(|f| format!(" on field '{f}'"))
			.unwrap_or_default();
		format!(
			"[{}] ({}) {}{} at {}:{}",
			self.id,
			self.code,
			self.message,
			field,
			self.origin.file(),
			self.origin.line()
		)
	}

	pub fn is_grammar(&self) -> bool {
		self.kind == FailureKind::Grammar
	}
}

fn field_prefix(field: &Option<String>) -> String {
	field.as_deref().map(|f| format!("{f}: ")).unwrap_or_default()
}
