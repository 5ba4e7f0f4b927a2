//! Outcome of one validation call

use ruleform_validators::{Failure, FormValue};
use serde::Serialize;

/// Caller-facing view of a [`Failure`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
	pub message: String,
	pub code: u16,
	pub id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub file: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub line: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dev_message: Option<String>,
}

impl From<&Failure> for ErrorInfo {
	fn from(failure: &Failure) -> Self {
		Self {
			message: failure.message.clone(),
			code: failure.code,
			id: failure.id.to_string(),
			field: failure.field.clone(),
			file: failure.file.map(str::to_string),
			line: failure.line,
			dev_message: failure.dev_message.clone(),
		}
	}
}

/// Either the normalized tree or the first failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ValidationResult {
	Valid { data: FormValue },
	Invalid { error: ErrorInfo },
}

impl ValidationResult {
	pub fn is_valid(&self) -> bool {
		matches!(self, Self::Valid { .. })
	}

	/// The normalized tree, if validation succeeded
	pub fn data(&self) -> Option<&FormValue> {
		match self {
			Self::Valid { data } => Some(data),
			Self::Invalid { .. } => None,
		}
	}

	pub fn into_data(self) -> Option<FormValue> {
		match self {
			Self::Valid { data } => Some(data),
			Self::Invalid { .. } => None,
		}
	}

	pub fn error(&self) -> Option<&ErrorInfo> {
		match self {
			Self::Valid { .. } => None,
			Self::Invalid { error } => Some(error),
		}
	}
}

impl From<&Failure> for ValidationResult {
	fn from(failure: &Failure) -> Self {
		Self::Invalid {
			error: ErrorInfo::from(failure),
		}
	}
}
