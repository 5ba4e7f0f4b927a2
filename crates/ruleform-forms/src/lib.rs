//! Rule grammar and validation pipeline for ruleform
//!
//! This crate turns a rule object such as
//!
//! ```json
//! {"age": "number; min:18; f:i", "tags": "enum:any:red,blue", "__CONFIG__": "strip:false"}
//! ```
//!
//! into compiled rules, walks the submitted data against them and returns
//! either the normalized, sanitized tree or the first failure. The checks
//! themselves live in `ruleform-validators`.
//!
//! ## Pipeline
//!
//! 1. [`input::normalize_input`] builds a [`FormValue`] tree, recognizing
//!    uploaded files once.
//! 2. `__CONFIG__` is parsed into a [`SanitizePolicy`].
//! 3. Every rule is flattened ([`rule_spec`]), tokenized ([`parser`]) and
//!    resolved against the validator registry ([`walker::RuleSet`]). An
//!    unknown test fails here, before any data is inspected.
//! 4. The [`walker::Walker`] runs the immediate tokens per leaf and records
//!    `Format`/`Null`/`NotNull` in a [`SpecialMap`].
//! 5. Deferred tokens are replayed, then the [`Sanitizer`] runs.
//!
//! ## Example
//!
//! ```
//! use ruleform_forms::Validation;
//! use ruleform_validators::FormValue;
//! use serde_json::json;
//!
//! let result = Validation::new()
//!     .validate(
//!         &json!({"bio": "<b>hi</b>", "extra": "kept"}),
//!         &json!({"bio": "string", "__CONFIG__": "strip:f"}),
//!     )
//!     .unwrap();
//!
//! let data = result.data().unwrap();
//! assert_eq!(data.get("bio"), Some(&FormValue::text("&lt;b&gt;hi&lt;/b&gt;")));
//! assert_eq!(data.get("extra"), Some(&FormValue::text("kept")));
//! ```

pub mod config;
pub mod grammar;
pub mod input;
pub mod parser;
pub mod result;
pub mod rule_spec;
pub mod sanitizer;
pub mod special;
pub mod validation;
pub mod walker;

pub use config::{CONFIG_KEY, SanitizePolicy, SettingsError, ValidationSettings};
pub use parser::{RegexStash, parse_one_cell, tokenize};
pub use result::{ErrorInfo, ValidationResult};
pub use ruleform_validators::{FormValue, Failure};
pub use sanitizer::{Sanitizer, escape_html, strip_tags};
pub use special::{Special, SpecialEntry, SpecialMap};
pub use validation::{Validation, ValidationBuilder};

/// Re-export commonly used types
pub mod prelude {
	pub use crate::config::*;
	pub use crate::result::*;
	pub use crate::validation::*;
	pub use ruleform_validators::prelude::*;
}
