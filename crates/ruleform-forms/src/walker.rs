//! Structural walker
//!
//! Pairs the input tree with the compiled rule set by top-level key.
//! Scalars and uploaded files are leaves; any other map is walked entry by
//! entry with the same rule, except that an array whose first token is an
//! `Enum`/`Nenum` with a modifier is checked as one value. In that mode the
//! membership check sees the scalars of nested arrays too, and the remaining
//! tokens still run on every nested entry.
//!
//! The first failure anywhere aborts the walk.

use indexmap::IndexMap;
use ruleform_validators::errors::CheckResult;
use ruleform_validators::registry::{Dispatch, Outcome, RuleValidator, Subject, evaluate, resolve};
use ruleform_validators::{ARRAY_REPLACE_VALUE, FormValue, RuleToken, Test, ValidationContext};

use crate::parser::tokenize;
use crate::special::{Special, SpecialMap};

/// A token with its resolved validator
pub struct Step {
	pub token: RuleToken,
	validator: &'static dyn RuleValidator,
}

impl std::fmt::Debug for Step {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Step").field("token", &self.token).finish_non_exhaustive()
	}
}

impl Step {
	/// Whether this step sees a whole-array value through the array stash
	fn takes_whole_array(&self) -> bool {
		matches!(self.token.test, Test::Enum | Test::Nenum | Test::Required)
	}
}

/// One field's rule, resolved before any data is touched
#[derive(Debug, Default)]
pub struct CompiledRule {
	pub ignore: bool,
	pub steps: Vec<Step>,
	pub specials: Vec<Special>,
	/// Arrays are validated as a single value
	pub whole_array: bool,
	/// Absent fields are still validated
	pub demands_presence: bool,
}

impl CompiledRule {
	/// Resolve every token; unknown tests and bad `Format` targets fail here
	#[track_caller]
	pub fn compile(tokens: Vec<RuleToken>) -> CheckResult<Self> {
		let mut rule = Self {
			whole_array: tokens.first().is_some_and(|first| {
				matches!(first.test, Test::Enum | Test::Nenum) && !first.modifiers.is_empty()
			}),
			demands_presence: tokens.iter().any(|t| t.test.demands_presence()),
			..Self::default()
		};

		for token in tokens {
			if token.test == Test::Ignore {
				rule.ignore = true;
				continue;
			}
			match resolve(&token.test)? {
				Dispatch::Immediate(validator) => rule.steps.push(Step { token, validator }),
				Dispatch::Deferred => rule.specials.extend(Special::from_token(&token)?),
			}
		}
		Ok(rule)
	}
}

/// Compiled rules of a whole call, in declaration order
#[derive(Debug, Default)]
pub struct RuleSet {
	fields: IndexMap<String, CompiledRule>,
}

impl RuleSet {
	/// Tokenize and compile `(field, rule string)` pairs
	pub fn compile<I, K, R>(rules: I) -> CheckResult<Self>
	where
		I: IntoIterator<Item = (K, R)>,
		K: Into<String>,
		R: AsRef<str>,
	{
		let mut fields = IndexMap::new();
		for (field, rule) in rules {
			let field = field.into();
			let compiled = CompiledRule::compile(tokenize(rule.as_ref()))
				.map_err(|f| f.at_field(field.clone()))?;
			fields.insert(field, compiled);
		}
		Ok(Self { fields })
	}

	pub fn get(&self, field: &str) -> Option<&CompiledRule> {
		self.fields.get(field)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &CompiledRule)> {
		self.fields.iter()
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

/// Give absent fields whose rules demand presence the empty sentinel so
/// `Required` can reject them
pub fn prefill_absent(fields: &mut IndexMap<String, FormValue>, rules: &RuleSet) {
	for (field, rule) in rules.iter() {
		if rule.demands_presence && !rule.ignore && !fields.contains_key(field) {
			tracing::trace!(field = %field, "absent field defaulted to the empty sentinel");
			fields.insert(field.clone(), FormValue::internal_empty());
		}
	}
}

/// Scalar leaves of an array at any depth, in order
fn collect_scalars(entries: &IndexMap<String, FormValue>, into: &mut Vec<String>) {
	for value in entries.values() {
		match value {
			FormValue::Map(nested) => collect_scalars(nested, into),
			FormValue::File(_) => {}
			other => into.extend(other.to_scalar_string()),
		}
	}
}

/// Walks one input tree against one rule set
pub struct Walker<'a, 'c> {
	ctx: &'a mut ValidationContext<'c>,
	specials: SpecialMap,
}

impl<'a, 'c> Walker<'a, 'c> {
	pub fn new(ctx: &'a mut ValidationContext<'c>) -> Self {
		Self {
			ctx,
			specials: SpecialMap::new(),
		}
	}

	/// Validate `fields` in place; returns the recorded specials
	///
	/// Fields are visited in rule declaration order while the map keeps its
	/// input order. Fields without a rule are left untouched.
	pub fn walk(
		mut self,
		fields: &mut IndexMap<String, FormValue>,
		rules: &RuleSet,
	) -> CheckResult<SpecialMap> {
		for (field, rule) in rules.iter() {
			let Some(value) = fields.get_mut(field) else {
				continue;
			};
			if rule.ignore {
				tracing::trace!(field = %field, "ignored");
				continue;
			}
			tracing::debug!(field = %field, steps = rule.steps.len(), "validating field");
			let mut path = vec![field.clone()];
			self.node(value, rule, &mut path)?;
		}
		Ok(self.specials)
	}

	fn node(
		&mut self,
		value: &mut FormValue,
		rule: &CompiledRule,
		path: &mut Vec<String>,
	) -> CheckResult<()> {
		match value {
			FormValue::Map(entries) if entries.is_empty() => {
				let mut probe = FormValue::internal_empty();
				self.leaf(&mut probe, rule.steps.iter(), path)?;
				self.specials.insert(path, rule.specials.clone());
				Ok(())
			}
			FormValue::Map(entries) if rule.whole_array => self.whole_array(entries, rule, path),
			FormValue::Map(entries) => {
				for (key, child) in entries.iter_mut() {
					path.push(key.clone());
					let result = self.node(child, rule, path);
					path.pop();
					result?;
				}
				Ok(())
			}
			_ => {
				self.leaf(value, rule.steps.iter(), path)?;
				self.specials.insert(path, rule.specials.clone());
				Ok(())
			}
		}
	}

	fn whole_array(
		&mut self,
		entries: &mut IndexMap<String, FormValue>,
		rule: &CompiledRule,
		path: &mut Vec<String>,
	) -> CheckResult<()> {
		let mut scalars = Vec::new();
		collect_scalars(entries, &mut scalars);
		self.ctx.stash_array(scalars);
		tracing::trace!(field = %path.join("."), "array stashed for whole-array checks");

		let result = self.whole_array_steps(entries, rule, path);
		self.ctx.take_stashed_array();
		result
	}

	fn whole_array_steps(
		&mut self,
		entries: &mut IndexMap<String, FormValue>,
		rule: &CompiledRule,
		path: &mut Vec<String>,
	) -> CheckResult<()> {
		let (whole, per_entry): (Vec<&Step>, Vec<&Step>) =
			rule.steps.iter().partition(|step| step.takes_whole_array());

		let mut stand_in = FormValue::text(ARRAY_REPLACE_VALUE);
		self.leaf(&mut stand_in, whole.into_iter(), path)?;

		self.entries(entries, &per_entry, &rule.specials, path)
	}

	/// Per-entry pass of whole-array mode; nested arrays recurse
	fn entries(
		&mut self,
		entries: &mut IndexMap<String, FormValue>,
		steps: &[&Step],
		specials: &[Special],
		path: &mut Vec<String>,
	) -> CheckResult<()> {
		for (key, child) in entries.iter_mut() {
			path.push(key.clone());
			let result = match child {
				FormValue::Map(nested) => self.entries(nested, steps, specials, path),
				_ => {
					let result = self.leaf(child, steps.iter().copied(), path);
					if result.is_ok() {
						self.specials.insert(path, specials.to_vec());
					}
					result
				}
			};
			path.pop();
			result?;
		}
		Ok(())
	}

	/// Run `steps` over one leaf, threading rewrites forward
	fn leaf<'s>(
		&mut self,
		value: &mut FormValue,
		steps: impl Iterator<Item = &'s Step>,
		path: &[String],
	) -> CheckResult<()> {
		for step in steps {
			let outcome = {
				let rendered;
				let subject = match &*value {
					FormValue::Text(text) => Subject::Text(text),
					FormValue::Bool(b) => Subject::Bool(*b),
					FormValue::File(file) => Subject::File(file),
					other => {
						rendered = other.to_scalar_string().unwrap_or_default();
						Subject::Text(&rendered)
					}
				};
				evaluate(step.validator, subject, &step.token, self.ctx)
					.map_err(|f| f.at_field(path.join(".")))?
			};

			match outcome {
				Outcome::Accepted => {}
				Outcome::Rewritten(rewritten) => *value = FormValue::Text(rewritten),
				Outcome::Empty => {
					if !matches!(value, FormValue::File(_)) {
						*value = FormValue::internal_empty();
					}
				}
			}
		}
		Ok(())
	}
}
