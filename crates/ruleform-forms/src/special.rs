//! Deferred (special) tokens
//!
//! `Format`, `Null` and `NotNull` are recorded per leaf path while the main
//! pass runs and replayed over the normalized tree once every field has
//! validated.

use indexmap::IndexMap;
use ruleform_validators::errors::CheckResult;
use ruleform_validators::{
	FormValue, FormatSpec, NOTNULL_REPLACE_VALUE, RuleToken, Test, apply_format,
};

/// One deferred action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
	Format(FormatSpec),
	Null,
	NotNull,
}

impl Special {
	/// Resolve a deferred token; `Ignore` and immediate tests yield `None`
	#[track_caller]
	pub fn from_token(token: &RuleToken) -> CheckResult<Option<Self>> {
		Ok(match token.test {
			Test::Format => Some(Self::Format(FormatSpec::from_token(token)?)),
			Test::Null => Some(Self::Null),
			Test::NotNull => Some(Self::NotNull),
			_ => None,
		})
	}

	fn apply(self, value: &FormValue) -> CheckResult<FormValue> {
		match self {
			Self::Format(spec) => apply_format(spec, value),
			Self::Null if value.is_blank() => Ok(FormValue::Null),
			Self::NotNull if is_nullish(value) => Ok(FormValue::text(NOTNULL_REPLACE_VALUE)),
			Self::Null | Self::NotNull => Ok(value.clone()),
		}
	}
}

fn is_nullish(value: &FormValue) -> bool {
	match value {
		FormValue::Null => true,
		FormValue::Text(text) => text == "null" || value.is_blank(),
		_ => false,
	}
}

/// Recorded specials, shaped like the tree they apply to
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialEntry {
	Leaf(Vec<Special>),
	Nested(IndexMap<String, SpecialEntry>),
}

/// Specials for a whole call, keyed by top-level field
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SpecialMap {
	entries: IndexMap<String, SpecialEntry>,
}

impl SpecialMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Record the specials of the leaf at `path` (field, then nested keys)
	pub fn insert(&mut self, path: &[String], specials: Vec<Special>) {
		let Some((last, parents)) = path.split_last() else {
			return;
		};
		if specials.is_empty() {
			return;
		}

		let mut level = &mut self.entries;
		for key in parents {
			let entry = level
				.entry(key.clone())
				.or_insert_with(|| SpecialEntry::Nested(IndexMap::new()));
			if let SpecialEntry::Leaf(_) = entry {
				*entry = SpecialEntry::Nested(IndexMap::new());
			}
			level = match entry {
				SpecialEntry::Nested(children) => children,
				SpecialEntry::Leaf(_) => return,
			};
		}
		level.insert(last.clone(), SpecialEntry::Leaf(specials));
	}

	/// Replay every recorded special over `tree`, in token order per leaf
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_forms::special::{Special, SpecialMap};
	/// use ruleform_validators::FormValue;
	///
	/// let mut specials = SpecialMap::new();
	/// specials.insert(&["note".to_string()], vec![Special::Null]);
	///
	/// let mut tree = FormValue::map([("note", FormValue::text(""))]);
	/// specials.apply(&mut tree).unwrap();
	/// assert_eq!(tree.get("note"), Some(&FormValue::Null));
	/// ```
	pub fn apply(&self, tree: &mut FormValue) -> CheckResult<()> {
		if let FormValue::Map(fields) = tree {
			apply_level(&self.entries, fields, "")?;
		}
		Ok(())
	}
}

fn apply_level(
	entries: &IndexMap<String, SpecialEntry>,
	fields: &mut IndexMap<String, FormValue>,
	prefix: &str,
) -> CheckResult<()> {
	for (key, entry) in entries {
		let Some(value) = fields.get_mut(key) else {
			continue;
		};
		let path = if prefix.is_empty() {
			key.clone()
		} else {
			format!("{prefix}.{key}")
		};
		match (entry, value) {
			(SpecialEntry::Nested(children), FormValue::Map(nested)) => {
				apply_level(children, nested, &path)?;
			}
			(SpecialEntry::Nested(_), _) => {}
			(SpecialEntry::Leaf(specials), value) => {
				for special in specials {
					*value = special.apply(value).map_err(|f| f.at_field(path.clone()))?;
				}
			}
		}
	}
	Ok(())
}
