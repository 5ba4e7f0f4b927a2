//! Validators for the ruleform engine
//!
//! This crate holds the pieces a single check needs: the value model
//! ([`FormValue`], [`FileValue`]), canonical rule tokens ([`RuleToken`]),
//! structured failures ([`Failure`]), the call-scoped
//! [`ValidationContext`] with its [`Collaborators`], and one
//! [`RuleValidator`] per canonical test, reachable through
//! [`registry::resolve`].
//!
//! Parsing rule strings and walking input trees lives in `ruleform-forms`.
//!
//! ## Example
//!
//! ```
//! use ruleform_validators::registry::{Outcome, Subject, run};
//! use ruleform_validators::{Collaborators, Modifier, RuleToken, Test, ValidationContext};
//!
//! let collaborators = Collaborators::default();
//! let mut ctx = ValidationContext::new(&collaborators);
//! let token = RuleToken::new(Test::Number)
//!     .with_modifier(Modifier::Only)
//!     .with_modifier(Modifier::Float);
//!
//! let outcome = run(&token, Subject::Text("12.5,"), &mut ctx).unwrap();
//! assert_eq!(outcome, Outcome::Rewritten("12.5".to_string()));
//! ```

pub mod choice;
pub mod collaborators;
pub mod compare;
pub mod context;
pub mod errors;
pub mod file;
pub mod format;
pub mod json;
pub mod network;
pub mod numeric;
pub mod registry;
pub mod required;
pub mod temporal;
pub mod text;
pub mod token;
pub mod value;

pub use collaborators::{
	CollaboratorError, Collaborators, ConfigProvider, DnsMxResolver, EnvConfigProvider,
	ErrorReporter, HttpUrlProber, MapConfigProvider, MxResolver, ParsedPhone, PhoneFormat,
	PhoneNumberLibrary, PhonenumberLibrary, ProbeResponse, TempDirUploadVerifier, TracingReporter,
	UploadVerifier, UrlProber,
};
pub use context::ValidationContext;
pub use errors::{CheckResult, Failure, FailureKind};
pub use format::{FormatSpec, FormatTarget, apply_format};
pub use registry::{Dispatch, Outcome, RuleValidator, Subject};
pub use token::{Modifier, RuleToken, Test};
pub use value::{
	ARRAY_REPLACE_VALUE, EMPTY_PLACEHOLDER, FileValue, FormValue, INTERNAL_EMPTY,
	NOTNULL_REPLACE_VALUE, REGEX_REPLACE_VALUE, is_blank_text, is_unset_text,
};

/// Re-export commonly used types
pub mod prelude {
	pub use crate::collaborators::*;
	pub use crate::context::*;
	pub use crate::errors::*;
	pub use crate::registry::*;
	pub use crate::token::*;
	pub use crate::value::*;
}
