//! Canonical rule tokens
//!
//! The grammar in `ruleform-forms` turns rule strings into [`RuleToken`]s;
//! this module only defines their canonical vocabulary.

use std::fmt;

/// Canonical test names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Test {
	Alpha,
	AlphaNumber,
	Boolean,
	Date,
	DateTime,
	Email,
	Enum,
	Equal,
	Extension,
	File,
	Format,
	Ignore,
	Ip,
	Json,
	Length,
	Max,
	MaxLength,
	MaxWords,
	Mime,
	Min,
	MinLength,
	MinWords,
	Month,
	Nenum,
	Nequal,
	NotNull,
	Null,
	Number,
	Password,
	Regex,
	Required,
	Size,
	String,
	Tel,
	Time,
	Url,
	Week,
	/// A name no synonym matched, Titlecased. Dispatching it fails.
	Unknown(std::string::String),
}

impl Test {
	/// Canonical display name
	pub fn name(&self) -> &str {
		match self {
			Self::Alpha => "Alpha",
			Self::AlphaNumber => "AlphaNumber",
			Self::Boolean => "Boolean",
			Self::Date => "Date",
			Self::DateTime => "DateTime",
			Self::Email => "Email",
			Self::Enum => "Enum",
			Self::Equal => "Equal",
			Self::Extension => "Extension",
			Self::File => "File",
			Self::Format => "Format",
			Self::Ignore => "Ignore",
			Self::Ip => "Ip",
			Self::Json => "Json",
			Self::Length => "Length",
			Self::Max => "Max",
			Self::MaxLength => "MaxLength",
			Self::MaxWords => "MaxWords",
			Self::Mime => "Mime",
			Self::Min => "Min",
			Self::MinLength => "MinLength",
			Self::MinWords => "MinWords",
			Self::Month => "Month",
			Self::Nenum => "Nenum",
			Self::Nequal => "Nequal",
			Self::NotNull => "NotNull",
			Self::Null => "Null",
			Self::Number => "Number",
			Self::Password => "Password",
			Self::Regex => "Regex",
			Self::Required => "Required",
			Self::Size => "Size",
			Self::String => "String",
			Self::Tel => "Tel",
			Self::Time => "Time",
			Self::Url => "Url",
			Self::Week => "Week",
			Self::Unknown(name) => name,
		}
	}

	/// Deferred tests never run in the main pass; they are replayed over
	/// the normalized tree once everything else has validated.
	pub fn is_deferred(&self) -> bool {
		matches!(self, Self::Format | Self::Null | Self::NotNull | Self::Ignore)
	}

	/// Tests whose lone argument is a value rather than a modifier
	/// (`min:18` versus `ip:v6`).
	pub fn has_direct_value(&self) -> bool {
		matches!(
			self,
			Self::Enum
				| Self::Equal | Self::Length
				| Self::Min | Self::Max
				| Self::MinLength
				| Self::MaxLength
				| Self::MinWords
				| Self::MaxWords
				| Self::Regex | Self::Size
				| Self::Tel | Self::Extension
				| Self::Mime | Self::Nequal
				| Self::Nenum
		)
	}

	/// Tests that make an absent field take part in validation
	pub fn demands_presence(&self) -> bool {
		matches!(self, Self::Required | Self::Null | Self::NotNull)
	}
}

impl fmt::Display for Test {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Canonical modifier names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Modifier {
	Only,
	Cut,
	Hash,
	Domain,
	Exist,
	Array,
	Any,
	Strict,
	V4,
	V6,
	Float,
	Integer,
	String,
	Round,
	Boolean,
	DateTime,
	/// An abbreviation with no meaning for its test
	Unknown(std::string::String),
}

impl Modifier {
	pub fn name(&self) -> &str {
		match self {
			Self::Only => "only",
			Self::Cut => "cut",
			Self::Hash => "hash",
			Self::Domain => "domain",
			Self::Exist => "exist",
			Self::Array => "array",
			Self::Any => "any",
			Self::Strict => "strict",
			Self::V4 => "v4",
			Self::V6 => "v6",
			Self::Float => "float",
			Self::Integer => "integer",
			Self::String => "string",
			Self::Round => "round",
			Self::Boolean => "boolean",
			Self::DateTime => "datetime",
			Self::Unknown(raw) => raw,
		}
	}
}

impl fmt::Display for Modifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// One parsed, canonicalized unit of validation work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleToken {
	pub test: Test,
	pub modifiers: Vec<Modifier>,
	pub values: Vec<std::string::String>,
}

impl RuleToken {
	/// Token without modifiers or values
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_validators::{RuleToken, Test};
	///
	/// let token = RuleToken::new(Test::Required);
	/// assert!(token.modifiers.is_empty());
	/// assert!(token.test.demands_presence());
	/// ```
	pub fn new(test: Test) -> Self {
		Self {
			test,
			modifiers: Vec::new(),
			values: Vec::new(),
		}
	}

	pub fn with_modifier(mut self, modifier: Modifier) -> Self {
		self.modifiers.push(modifier);
		self
	}

	pub fn with_values<I, S>(mut self, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<std::string::String>,
	{
		self.values.extend(values.into_iter().map(Into::into));
		self
	}

	pub fn has_modifier(&self, modifier: &Modifier) -> bool {
		self.modifiers.contains(modifier)
	}

	/// First value, or the "missing rule value" failure
	#[track_caller]
	pub fn first_value(&self) -> crate::CheckResult<&str> {
		self.values
			.first()
			.map(std::string::String::as_str)
			.ok_or_else(|| crate::Failure::missing_value(self.test.name()))
	}

	/// Values joined back with commas, for tests comparing against a single
	/// literal that may itself contain commas
	#[track_caller]
	pub fn joined_value(&self) -> crate::CheckResult<std::string::String> {
		if self.values.is_empty() {
			return Err(crate::Failure::missing_value(self.test.name()));
		}
		Ok(self.values.join(","))
	}

	/// Reject every modifier not in `allowed`
	#[track_caller]
	pub fn ensure_modifiers(&self, allowed: &[Modifier]) -> crate::CheckResult<()> {
		match self.modifiers.iter().find(|m| !allowed.contains(m)) {
			Some(unsupported) => Err(crate::Failure::unsupported_modifier(
				self.test.name(),
				unsupported.name(),
			)),
			None => Ok(()),
		}
	}
}
