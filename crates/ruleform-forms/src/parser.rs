//! Rule string tokenizer
//!
//! A rule string is a list of cells separated by `;` (or `|` when no `;` is
//! present). Each cell reads `test[:modifiers][:values]`.
//!
//! Regex cells are pulled out before splitting so a pattern may contain the
//! cell delimiters; the pattern is parked in a per-call [`RegexStash`] and
//! put back into the token's values afterwards.

use ruleform_validators::text::PATTERN_DELIMITERS;
use ruleform_validators::{REGEX_REPLACE_VALUE, RuleToken, Test};

use crate::grammar::{IGNORE_WORD, REGEX_CELL, canonical_modifier, canonical_test, is_known_modifier};

/// Separates value-list entries that came from array-form rules, so
/// entries may contain commas.
pub const VALUE_SEPARATOR: char = '\u{1F}';

/// Regex patterns lifted out of one rule string
#[derive(Debug, Default)]
pub struct RegexStash {
	patterns: Vec<String>,
}

impl RegexStash {
	pub fn new() -> Self {
		Self::default()
	}

	/// Park a pattern and return its sentinel
	pub fn stash(&mut self, pattern: &str) -> String {
		let sentinel = format!("{REGEX_REPLACE_VALUE}{}__", self.patterns.len());
		self.patterns.push(pattern.to_string());
		sentinel
	}

	/// The pattern behind `sentinel`, or `sentinel` itself if it is not one
	pub fn restore(&self, value: &str) -> String {
		value
			.strip_prefix(REGEX_REPLACE_VALUE)
			.and_then(|rest| rest.strip_suffix("__"))
			.and_then(|index| index.parse::<usize>().ok())
			.and_then(|index| self.patterns.get(index))
			.cloned()
			.unwrap_or_else(|| value.to_string())
	}

	pub fn len(&self) -> usize {
		self.patterns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.patterns.is_empty()
	}

	/// Replace every regex cell's pattern in `rule` by a sentinel
	pub fn lift_patterns(&mut self, rule: &str) -> String {
		let mut output = String::with_capacity(rule.len());
		let mut rest = rule;

		loop {
			if let Some(found) = REGEX_CELL.find(rest) {
				output.push_str(found.as_str());
				let after = &rest[found.end()..];
				let value = after.trim_start();
				let end = pattern_end(value);
				output.push_str(&self.stash(value[..end].trim_end()));
				rest = &value[end..];
			}

			match rest.find([';', '|']) {
				Some(pos) => {
					output.push_str(&rest[..=pos]);
					rest = &rest[pos + 1..];
				}
				None => {
					output.push_str(rest);
					return output;
				}
			}
		}
	}
}

/// Byte length of the pattern at the start of `value`
fn pattern_end(value: &str) -> usize {
	let mut chars = value.char_indices();
	let Some((_, close)) = chars.next() else {
		return 0;
	};

	if PATTERN_DELIMITERS.contains(close) {
		let mut escaped = false;
		for (pos, c) in chars.by_ref() {
			if escaped {
				escaped = false;
			} else if c == '\\' {
				escaped = true;
			} else if c == close {
				let flags_start = pos + c.len_utf8();
				let flags = value[flags_start..]
					.find(|c: char| !c.is_ascii_alphabetic())
					.unwrap_or(value.len() - flags_start);
				return flags_start + flags;
			}
		}
		// Unterminated; the whole remainder is handed to the Regex test,
		// which reports it as malformed.
		return value.len();
	}

	value
		.find(';')
		.or_else(|| value.find('|'))
		.unwrap_or(value.len())
}

/// Tokenize a whole rule string
///
/// # Examples
///
/// ```
/// use ruleform_forms::parser::tokenize;
/// use ruleform_validators::{Modifier, Test};
///
/// let tokens = tokenize("number:o,f; min:18");
/// assert_eq!(tokens[0].test, Test::Number);
/// assert_eq!(tokens[0].modifiers, vec![Modifier::Only, Modifier::Float]);
/// assert_eq!(tokens[1].values, vec!["18"]);
///
/// let tokens = tokenize("re:/^a;b|c$/i; required");
/// assert_eq!(tokens[0].values, vec!["/^a;b|c$/i"]);
/// assert_eq!(tokens[1].test, Test::Required);
/// ```
pub fn tokenize(rule: &str) -> Vec<RuleToken> {
	let mut stash = RegexStash::new();
	let lifted = stash.lift_patterns(rule);

	if IGNORE_WORD.is_match(&lifted) {
		return vec![RuleToken::new(Test::Ignore)];
	}

	let delimiter = if lifted.contains(';') { ';' } else { '|' };
	lifted
		.split(delimiter)
		.filter(|cell| !cell.trim().is_empty())
		.map(|cell| parse_cell(cell, &stash))
		.collect()
}

/// Parse one cell such as `minl:c:12` or `enum:a:red,blue`
///
/// # Examples
///
/// ```
/// use ruleform_forms::parser::parse_one_cell;
/// use ruleform_validators::{Modifier, Test};
///
/// let token = parse_one_cell("minl:c:12");
/// assert_eq!(token.test, Test::MinLength);
/// assert_eq!(token.modifiers, vec![Modifier::Cut]);
/// assert_eq!(token.values, vec!["12"]);
///
/// // `12:30` is not a modifier of Max, so it stays a value
/// assert_eq!(parse_one_cell("max:12:30").values, vec!["12:30"]);
/// ```
pub fn parse_one_cell(cell: &str) -> RuleToken {
	parse_cell(cell, &RegexStash::default())
}

fn parse_cell(cell: &str, stash: &RegexStash) -> RuleToken {
	let cell = cell.trim();
	let (name, rest) = match cell.split_once(':') {
		Some((name, rest)) => (name, Some(rest)),
		None => (cell, None),
	};
	let test = canonical_test(name);
	let mut token = RuleToken::new(test.clone());
	let Some(rest) = rest else {
		return token;
	};

	let (modifiers, values) = if test.has_direct_value() {
		match rest.split_once(':') {
			Some((head, tail)) if names_modifiers(&test, head) => (Some(head), Some(tail)),
			_ => (None, Some(rest)),
		}
	} else {
		match rest.split_once(':') {
			Some((head, tail)) => (Some(head), Some(tail)),
			None => (Some(rest), None),
		}
	};

	if let Some(modifiers) = modifiers {
		token.modifiers = modifiers
			.split(',')
			.map(str::trim)
			.filter(|m| !m.is_empty())
			.map(|m| canonical_modifier(&test, m))
			.collect();
	}
	if let Some(values) = values {
		token.values = split_values(values)
			.into_iter()
			.map(|value| stash.restore(&value))
			.collect();
	}
	token
}

fn names_modifiers(test: &Test, head: &str) -> bool {
	let mut parts = head.split(',').map(str::trim).peekable();
	parts.peek().is_some_and(|first| !first.is_empty())
		&& parts.all(|part| is_known_modifier(test, part))
}

fn split_values(values: &str) -> Vec<String> {
	let separator = if values.contains(VALUE_SEPARATOR) {
		VALUE_SEPARATOR
	} else {
		','
	};
	values
		.split(separator)
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use ruleform_validators::Modifier;
	use rstest::rstest;

	#[rstest]
	fn test_synonyms_are_equivalent() {
		let long = tokenize("alpha");
		assert_eq!(tokenize("al"), long);
		assert_eq!(tokenize("a"), long);
		assert_eq!(long, vec![RuleToken::new(Test::Alpha)]);
	}

	#[rstest]
	#[case("number; min:18; f:r", 3)]
	#[case("number|min:18|f:r", 3)]
	#[case("required;;  ; string", 2)]
	#[case("", 0)]
	fn test_cell_splitting(#[case] rule: &str, #[case] count: usize) {
		assert_eq!(tokenize(rule).len(), count);
	}

	#[rstest]
	fn test_ignore_wins_over_everything() {
		// Arrange
		let rule = "required; IG; email";

		// Act
		let tokens = tokenize(rule);

		// Assert
		assert_eq!(tokens, vec![RuleToken::new(Test::Ignore)]);
	}

	#[rstest]
	fn test_ignore_inside_regex_is_not_a_flag() {
		let tokens = tokenize("regex:/ignore|ig/; required");
		assert_eq!(tokens.len(), 2);
		assert_eq!(tokens[0].values, vec!["/ignore|ig/"]);
	}

	#[rstest]
	fn test_ignore_cell_next_to_regex_still_ignores() {
		assert_eq!(
			tokenize("regex:/ignore/; ignore"),
			vec![RuleToken::new(Test::Ignore)]
		);
	}

	#[rstest]
	fn test_several_regex_cells() {
		let tokens = tokenize("re:/a;b/|string|pattern:^x,y$");

		assert_eq!(tokens[0].values, vec!["/a;b/"]);
		assert_eq!(tokens[1].test, Test::String);
		assert_eq!(tokens[2].test, Test::Regex);
		assert_eq!(tokens[2].values, vec!["^x,y$"]);
	}

	#[rstest]
	fn test_undelimited_regex_stops_at_semicolon() {
		let tokens = tokenize("re:^a|b$; required");
		assert_eq!(tokens[0].values, vec!["^a|b$"]);
		assert_eq!(tokens[1].test, Test::Required);
	}

	#[rstest]
	#[case("re:<b>; string", "<b>")]
	#[case("re:{2,}x; string", "{2,}x")]
	fn test_bare_pattern_with_bracket_start(#[case] rule: &str, #[case] pattern: &str) {
		let tokens = tokenize(rule);
		assert_eq!(tokens[0].values, vec![pattern]);
		assert_eq!(tokens[1].test, Test::String);
	}

	#[rstest]
	fn test_escaped_delimiter_inside_pattern() {
		let tokens = tokenize(r"re:/a\/b;c/; string");
		assert_eq!(tokens[0].values, vec![r"/a\/b;c/"]);
		assert_eq!(tokens.len(), 2);
	}

	#[rstest]
	#[case("enum:a:red,blue", vec![Modifier::Array], vec!["red", "blue"])]
	#[case("enum:red,blue", vec![], vec!["red", "blue"])]
	#[case("min:2024-01-01 10:00", vec![], vec!["2024-01-01 10:00"])]
	#[case("length:c:3,5", vec![Modifier::Cut], vec!["3", "5"])]
	#[case("tel:DE, AT", vec![], vec!["DE", "AT"])]
	#[case("ip:v6", vec![Modifier::V6], vec![])]
	#[case("number:o,i", vec![Modifier::Only, Modifier::Integer], vec![])]
	#[case("f:r:2", vec![Modifier::Round], vec!["2"])]
	fn test_modifier_value_split(
		#[case] cell: &str,
		#[case] modifiers: Vec<Modifier>,
		#[case] values: Vec<&str>,
	) {
		let token = parse_one_cell(cell);
		assert_eq!(token.modifiers, modifiers);
		assert_eq!(token.values, values);
	}

	#[rstest]
	fn test_private_separator_keeps_commas() {
		let cell = format!("enum:a,b{VALUE_SEPARATOR}c");
		assert_eq!(parse_one_cell(&cell).values, vec!["a,b", "c"]);
	}

	#[rstest]
	fn test_unknown_names_pass_through_titlecased() {
		let token = parse_one_cell("colour:x");
		assert_eq!(token.test, Test::Unknown("Colour".to_string()));
	}

	#[rstest]
	fn test_unknown_modifier_is_kept_for_the_validator() {
		let token = parse_one_cell("alpha:zz");
		assert_eq!(token.modifiers, vec![Modifier::Unknown("zz".to_string())]);
	}
}
