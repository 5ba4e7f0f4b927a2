//! Text validators: character classes, lengths, word counts, passwords and
//! user-supplied patterns

use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::{PasswordHasher as _, SaltString};
use rand::RngCore;
use regex::Regex as Pattern;

use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::token::{Modifier, RuleToken};

static ALPHA_REGEX: LazyLock<Pattern> = LazyLock::new(|| {
	Pattern::new(r"^[\p{L}\s]+$").expect("ALPHA_REGEX: invalid regex pattern")
});

static ALPHA_NUMBER_REGEX: LazyLock<Pattern> = LazyLock::new(|| {
	Pattern::new(r"^[\p{L}\p{Nd}\s]+$").expect("ALPHA_NUMBER_REGEX: invalid regex pattern")
});

static WORD_REGEX: LazyLock<Pattern> =
	LazyLock::new(|| Pattern::new(r"\p{L}+").expect("WORD_REGEX: invalid regex pattern"));

/// Minimum password length in characters
const PASSWORD_MIN_CHARS: usize = 8;

fn text_of(subject: &Subject<'_>, test: &str, id: &'static str) -> CheckResult<String> {
	subject
		.to_text()
		.ok_or_else(|| Failure::data(id, format!("{test} expects a text value, got a file")))
}

/// Parse a non-negative count argument (length, word count)
#[track_caller]
pub(crate) fn parse_count(test: &str, raw: &str) -> CheckResult<usize> {
	raw.trim().parse::<usize>().map_err(|_| {
		Failure::grammar(
			ids::NON_NUMERIC_ARGUMENT,
			format!("Test '{test}' expects a whole number, got '{raw}'"),
		)
	})
}

/// Number of Unicode scalar values
pub fn char_len(value: &str) -> usize {
	value.chars().count()
}

/// Truncate or right-pad with spaces to exactly `length` characters
///
/// # Examples
///
/// ```
/// use ruleform_validators::text::cut_to_length;
///
/// assert_eq!(cut_to_length("héllo", 3), "hél");
/// assert_eq!(cut_to_length("ab", 4), "ab  ");
/// ```
pub fn cut_to_length(value: &str, length: usize) -> String {
	let mut out: String = value.chars().take(length).collect();
	let missing = length.saturating_sub(char_len(&out));
	out.extend(std::iter::repeat_n(' ', missing));
	out
}

/// Count runs of Unicode letters
pub fn word_count(value: &str) -> usize {
	WORD_REGEX.find_iter(value).count()
}

fn filter_class(value: &str, keep: impl Fn(char) -> bool) -> Outcome {
	let filtered: String = value.chars().filter(|c| keep(*c)).collect();
	if filtered == value {
		Outcome::Accepted
	} else {
		Outcome::Rewritten(filtered)
	}
}

/// Letters and whitespace only
pub struct Alpha;

impl RuleValidator for Alpha {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Only]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let value = text_of(&subject, "Alpha", ids::ALPHA)?;
		if token.has_modifier(&Modifier::Only) {
			return Ok(filter_class(&value, |c| c.is_alphabetic() || c.is_whitespace()));
		}
		if ALPHA_REGEX.is_match(&value) {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(ids::ALPHA, "Value may only contain letters"))
		}
	}
}

/// Letters, decimal digits and whitespace only
pub struct AlphaNumber;

impl RuleValidator for AlphaNumber {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Only]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let value = text_of(&subject, "AlphaNumber", ids::ALPHA_NUMBER)?;
		if token.has_modifier(&Modifier::Only) {
			return Ok(filter_class(&value, |c| {
				c.is_alphabetic() || c.is_numeric() || c.is_whitespace()
			}));
		}
		if ALPHA_NUMBER_REGEX.is_match(&value) {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::ALPHA_NUMBER,
				"Value may only contain letters and numbers",
			))
		}
	}
}

/// Any scalar text; uploads are rejected
pub struct StringTest;

impl RuleValidator for StringTest {
	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		match subject {
			Subject::File(_) => Err(Failure::data(
				ids::STRING,
				"Value must be text, not an uploaded file",
			)),
			_ => Ok(Outcome::Accepted),
		}
	}
}

/// Password policy, optionally replacing the plaintext with an Argon2id hash
pub struct Password;

impl Password {
	/// At least eight characters with an uppercase letter, a lowercase
	/// letter and a digit
	pub fn meets_policy(value: &str) -> bool {
		char_len(value) >= PASSWORD_MIN_CHARS
			&& value.chars().any(char::is_uppercase)
			&& value.chars().any(char::is_lowercase)
			&& value.chars().any(|c| c.is_ascii_digit())
	}

	fn hash(value: &str) -> CheckResult<String> {
		let mut salt_bytes = [0u8; 16];
		rand::thread_rng().fill_bytes(&mut salt_bytes);
		let salt = SaltString::encode_b64(&salt_bytes)
			.map_err(|e| Failure::internal(ids::PASSWORD_HASH_FAILED, e.to_string()))?;

		Argon2::default()
			.hash_password(value.as_bytes(), &salt)
			.map(|hash| hash.to_string())
			.map_err(|e| Failure::internal(ids::PASSWORD_HASH_FAILED, e.to_string()))
	}
}

impl RuleValidator for Password {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Hash]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let value = text_of(&subject, "Password", ids::PASSWORD)?;
		if !Self::meets_policy(&value) {
			return Err(Failure::data(
				ids::PASSWORD,
				"Password needs at least 8 characters, an uppercase letter, a lowercase letter and a digit",
			));
		}
		if token.has_modifier(&Modifier::Hash) {
			return Self::hash(&value).map(Outcome::Rewritten);
		}
		Ok(Outcome::Accepted)
	}
}

/// Characters accepted as the delimiter of a delimited pattern; the same
/// character opens and closes it. Anything else starts a bare pattern.
pub const PATTERN_DELIMITERS: &str = "/#~!@%`";

/// Compile a user pattern, delimited (`/^a+$/i`) or bare (`^a+$`)
///
/// # Examples
///
/// ```
/// use ruleform_validators::text::compile_pattern;
///
/// assert!(compile_pattern("/^ab+$/i").unwrap().is_match("ABB"));
/// assert!(compile_pattern(r"^\d{3}$").unwrap().is_match("123"));
/// assert!(compile_pattern("/^a(/").is_err());
/// ```
#[track_caller]
pub fn compile_pattern(raw: &str) -> CheckResult<Pattern> {
	let malformed =
		|detail: String| Failure::grammar(ids::MALFORMED_REGEX, format!("Malformed regex: {detail}"));

	let (body, flags) = match raw.chars().next() {
		Some(close) if PATTERN_DELIMITERS.contains(close) => {
			let rest = &raw[close.len_utf8()..];
			match rest.rfind(close) {
				Some(end)
					if rest[end + close.len_utf8()..]
						.chars()
						.all(|c| c.is_ascii_alphabetic()) =>
				{
					(&rest[..end], &rest[end + close.len_utf8()..])
				}
				_ => return Err(malformed(format!("unbalanced delimiter in '{raw}'"))),
			}
		}
		_ => (raw, ""),
	};

	let mut inline = String::new();
	for flag in flags.chars() {
		match flag {
			'i' | 'm' | 's' | 'x' | 'U' => inline.push(flag),
			'u' => {}
			other => return Err(malformed(format!("unsupported flag '{other}'"))),
		}
	}
	let source = if inline.is_empty() {
		body.to_string()
	} else {
		format!("(?{inline}){body}")
	};
	Pattern::new(&source).map_err(|e| malformed(e.to_string()))
}

/// User-supplied pattern match
pub struct Regex;

impl RuleValidator for Regex {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let pattern = compile_pattern(&token.joined_value()?)?;
		let value = text_of(&subject, "Regex", ids::REGEX)?;
		if pattern.is_match(&value) {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::REGEX,
				"Value does not match the required pattern",
			))
		}
	}
}

/// Exact length (one value) or inclusive length range (two values)
pub struct Length;

impl RuleValidator for Length {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Cut]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let (min, max) = match token.values.as_slice() {
			[] => return Err(Failure::missing_value("Length")),
			[exact] => {
				let n = parse_count("Length", exact)?;
				(n, n)
			}
			[low, high, ..] => {
				let (a, b) = (parse_count("Length", low)?, parse_count("Length", high)?);
				(a.min(b), a.max(b))
			}
		};
		let value = text_of(&subject, "Length", ids::LENGTH)?;
		let len = char_len(&value);
		if (min..=max).contains(&len) {
			return Ok(Outcome::Accepted);
		}
		if token.has_modifier(&Modifier::Cut) {
			let target = if len < min { min } else { max };
			return Ok(Outcome::Rewritten(cut_to_length(&value, target)));
		}
		let expected = if min == max {
			format!("exactly {min}")
		} else {
			format!("between {min} and {max}")
		};
		Err(Failure::data(
			ids::LENGTH,
			format!("Value must be {expected} characters long"),
		))
	}
}

/// Upper character bound; `cut` truncates
pub struct MaxLength;

impl RuleValidator for MaxLength {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Cut]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let max = parse_count("MaxLength", token.first_value()?)?;
		let value = text_of(&subject, "MaxLength", ids::MAX_LENGTH)?;
		if char_len(&value) <= max {
			Ok(Outcome::Accepted)
		} else if token.has_modifier(&Modifier::Cut) {
			Ok(Outcome::Rewritten(cut_to_length(&value, max)))
		} else {
			Err(Failure::data(
				ids::MAX_LENGTH,
				format!("Value may be at most {max} characters long"),
			))
		}
	}
}

/// Lower character bound; `cut` truncates or pads to exactly the bound
pub struct MinLength;

impl RuleValidator for MinLength {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Cut]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let min = parse_count("MinLength", token.first_value()?)?;
		let value = text_of(&subject, "MinLength", ids::MIN_LENGTH)?;
		let len = char_len(&value);
		if token.has_modifier(&Modifier::Cut) {
			return Ok(if len == min {
				Outcome::Accepted
			} else {
				Outcome::Rewritten(cut_to_length(&value, min))
			});
		}
		if len >= min {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::MIN_LENGTH,
				format!("Value must be at least {min} characters long"),
			))
		}
	}
}

pub struct MaxWords;

impl RuleValidator for MaxWords {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let max = parse_count("MaxWords", token.first_value()?)?;
		let value = text_of(&subject, "MaxWords", ids::MAX_WORDS)?;
		if word_count(&value) <= max {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::MAX_WORDS,
				format!("Value may contain at most {max} words"),
			))
		}
	}
}

pub struct MinWords;

impl RuleValidator for MinWords {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let min = parse_count("MinWords", token.first_value()?)?;
		let value = text_of(&subject, "MinWords", ids::MIN_WORDS)?;
		if word_count(&value) >= min {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::MIN_WORDS,
				format!("Value must contain at least {min} words"),
			))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::collaborators::Collaborators;
	use crate::registry::run;
	use crate::token::Test;
	use proptest::prelude::*;
	use rstest::rstest;

	fn check(token: RuleToken, value: &str) -> CheckResult<Outcome> {
		let collaborators = Collaborators::default();
		let mut ctx = ValidationContext::new(&collaborators);
		run(&token, Subject::Text(value), &mut ctx)
	}

	#[rstest]
	#[case("José Ñúñez", true)]
	#[case("Ada Lovelace", true)]
	#[case("R2D2", false)]
	#[case("semi;colon", false)]
	fn test_alpha(#[case] value: &str, #[case] ok: bool) {
		assert_eq!(check(RuleToken::new(Test::Alpha), value).is_ok(), ok);
	}

	#[rstest]
	fn test_alpha_only_filters_characters() {
		// Arrange
		let token = RuleToken::new(Test::Alpha).with_modifier(Modifier::Only);

		// Act
		let outcome = check(token, "J0hn-Doe!").unwrap();

		// Assert
		assert_eq!(outcome, Outcome::Rewritten("JhnDoe".to_string()));
	}

	#[rstest]
	fn test_alpha_number_accepts_digits() {
		assert_eq!(
			check(RuleToken::new(Test::AlphaNumber), "John123").unwrap(),
			Outcome::Accepted
		);
		let failure = check(RuleToken::new(Test::AlphaNumber), "John_123").unwrap_err();
		assert_eq!(failure.id, ids::ALPHA_NUMBER);
	}

	#[rstest]
	#[case("Passw0rdX", true)]
	#[case("password1", false)]
	#[case("PASSWORD1", false)]
	#[case("Password", false)]
	#[case("Pa1", false)]
	fn test_password_policy(#[case] value: &str, #[case] ok: bool) {
		assert_eq!(Password::meets_policy(value), ok);
	}

	#[rstest]
	fn test_password_hash_rewrites_to_argon2() {
		let token = RuleToken::new(Test::Password).with_modifier(Modifier::Hash);

		let outcome = check(token, "Sup3rSecret").unwrap();

		let Outcome::Rewritten(hash) = outcome else {
			panic!("expected a hash");
		};
		assert!(hash.starts_with("$argon2id$"));
	}

	#[rstest]
	#[case("/^[a-z]+;[0-9]+$/", "abc;123", true)]
	#[case("/^abc$/i", "ABC", true)]
	#[case("#^a|b$#", "b", true)]
	#[case(r"^\d+$", "42", true)]
	#[case(r"^\d+$", "4x2", false)]
	#[case("<b>", "<b>", true)]
	#[case("<b>", "b", false)]
	#[case(",a,", "x,a,y", true)]
	#[case(",a,", "a", false)]
	#[case(r"\+\d", "+1", true)]
	fn test_regex_match(#[case] pattern: &str, #[case] value: &str, #[case] ok: bool) {
		let token = RuleToken::new(Test::Regex).with_values([pattern]);
		assert_eq!(check(token, value).is_ok(), ok);
	}

	#[rstest]
	#[case("/abc/q")]
	#[case("/ab(c/")]
	#[case("~abc")]
	fn test_malformed_regex_is_grammar_error(#[case] pattern: &str) {
		let token = RuleToken::new(Test::Regex).with_values([pattern]);
		let failure = check(token, "abc").unwrap_err();
		assert_eq!(failure.id, ids::MALFORMED_REGEX);
		assert_eq!(failure.code, 400);
	}

	#[rstest]
	#[case(&["3"], "abc", true)]
	#[case(&["3"], "abcd", false)]
	#[case(&["2", "4"], "abc", true)]
	#[case(&["2", "4"], "a", false)]
	#[case(&["3"], "äöü", true)]
	fn test_length(#[case] values: &[&str], #[case] value: &str, #[case] ok: bool) {
		let token = RuleToken::new(Test::Length).with_values(values.iter().copied());
		assert_eq!(check(token, value).is_ok(), ok);
	}

	#[rstest]
	fn test_length_rejects_non_numeric_argument() {
		let token = RuleToken::new(Test::Length).with_values(["ten"]);
		let failure = check(token, "abc").unwrap_err();
		assert_eq!(failure.id, ids::NON_NUMERIC_ARGUMENT);
	}

	#[rstest]
	#[case(Test::MaxLength, "abcdef", "abc")]
	#[case(Test::MinLength, "ab", "ab ")]
	#[case(Test::MinLength, "abcdef", "abc")]
	#[case(Test::Length, "a", "a  ")]
	fn test_cut_rewrites(#[case] test: Test, #[case] value: &str, #[case] expected: &str) {
		let token = RuleToken::new(test)
			.with_modifier(Modifier::Cut)
			.with_values(["3"]);

		let outcome = check(token, value).unwrap();

		assert_eq!(outcome, Outcome::Rewritten(expected.to_string()));
	}

	#[rstest]
	#[case("Hello, wörld! 42 times", 3)]
	#[case("one-two", 2)]
	#[case("   ", 0)]
	fn test_word_count(#[case] value: &str, #[case] expected: usize) {
		assert_eq!(word_count(value), expected);
	}

	#[rstest]
	fn test_word_bounds() {
		let max = RuleToken::new(Test::MaxWords).with_values(["2"]);
		let min = RuleToken::new(Test::MinWords).with_values(["2"]);

		assert_eq!(check(max, "a b c").unwrap_err().id, ids::MAX_WORDS);
		assert_eq!(check(min, "alone").unwrap_err().id, ids::MIN_WORDS);
	}

	proptest! {
		#[test]
		fn prop_cut_yields_exact_length(value in "\\PC{0,40}", length in 0usize..30) {
			let cut = cut_to_length(&value, length);
			prop_assert_eq!(char_len(&cut), length);
			if char_len(&value) == length {
				prop_assert_eq!(cut, value);
			}
		}
	}
}
