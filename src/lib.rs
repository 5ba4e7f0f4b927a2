//! # ruleform
//!
//! Declarative validation for untrusted form and JSON input.
//!
//! Each field gets a compact rule string (`"number; min:18; f:i"`) or an
//! equivalent JSON object. One call checks every field, stops at the first
//! failure and otherwise returns the input tree normalized and sanitized.
//!
//! ## Feature Flags
//!
//! - `validators` - value model, rule tokens and the validator registry
//! - `forms` - rule grammar, structural walker, sanitizer and [`Validation`]
//! - `full` (default) - everything
//!
//! ## Quick Example
//!
//! ```
//! use ruleform::prelude::*;
//! use serde_json::json;
//!
//! let validation = Validation::new();
//! let result = validation
//!     .validate(
//!         &json!({"name": "John123", "age": "17"}),
//!         &json!({"name": "alphaNumber", "age": "number; min:18"}),
//!     )
//!     .unwrap();
//!
//! let error = result.error().unwrap();
//! assert_eq!(error.id, "vE079");
//! assert_eq!(error.field.as_deref(), Some("age"));
//! ```

pub use ruleform_validators as validators;

#[cfg(feature = "forms")]
pub use ruleform_forms as forms;

pub use ruleform_validators::{
	CheckResult, Collaborators, Failure, FailureKind, FileValue, FormValue, Modifier, RuleToken,
	Test,
};

#[cfg(feature = "forms")]
pub use ruleform_forms::{
	ErrorInfo, SanitizePolicy, Validation, ValidationBuilder, ValidationResult, ValidationSettings,
};

/// Re-export commonly used types
pub mod prelude {
	pub use ruleform_validators::prelude::*;

	#[cfg(feature = "forms")]
	pub use ruleform_forms::prelude::*;
}
