//! Synonym tables of the rule grammar
//!
//! Test names are matched case-insensitively against anchored patterns in
//! the order listed; the first match wins. Names that match nothing become
//! [`Test::Unknown`] (first letter uppercased) and fail when dispatched.
//!
//! | Canonical test | Accepted spellings |
//! |---|---|
//! | Ignore | `ig`, `ignore` |
//! | AlphaNumber | `an`, `alnum`, `alphanum`, `alphanumber`, `alphanumeric`, `alpha_num…` |
//! | Alpha | `a`, `al`, `alpha`, `alphabetic` |
//! | Boolean | `b`, `bool`, `boolean` |
//! | DateTime | `dt`, `datetime`, `date_time`, `datetime-local` |
//! | Date | `d`, `date` |
//! | Email | `e`, `em`, `mail`, `email` |
//! | Nenum | `ne`, `nen`, `nenum`, `nin`, `notin`, `not_in` |
//! | Enum | `en`, `enum`, `in` |
//! | Nequal | `neq`, `nequal`, `notequal`, `not_equal`, `different` |
//! | Equal | `eq`, `equal`, `equals`, `same` |
//! | Extension | `ext`, `extension` |
//! | File | `fi`, `file`, `upload` |
//! | Format | `f`, `fo`, `fmt`, `format` |
//! | Ip | `ip`, `ipaddr`, `ip_address` |
//! | Json | `j`, `js`, `json` |
//! | Length | `l`, `len`, `length` |
//! | MaxLength | `mal…`, `maxl…` |
//! | MinLength | `mil…`, `minl…` |
//! | MaxWords | `maw…`, `maxw…` |
//! | MinWords | `miw…`, `minw…` |
//! | Max | `mx`, `max`, `maximum`, `lte` |
//! | Min | `mn`, `min`, `minimum`, `gte` |
//! | Mime | `mi`, `mime`, `mimetype`, `mime_type` |
//! | Month | `mo`, `month` |
//! | NotNull | `nn`, `notnull`, `not_null`, `nonnull` |
//! | Null | `nu`, `null`, `nullable` |
//! | Number | `n`, `num`, `number`, `numeric` |
//! | Password | `p`, `pw`, `pass`, `password` |
//! | Regex | `re`, `reg`, `regex`, `regexp`, `pattern` |
//! | Required | `r`, `req`, `required` |
//! | Size | `si`, `size`, `filesize` |
//! | String | `s`, `str`, `string`, `text` |
//! | Tel | `t`, `tel`, `phone`, `telephone` |
//! | Time | `ti`, `time` |
//! | Url | `u`, `url`, `uri`, `link` |
//! | Week | `w`, `week` |

use std::sync::LazyLock;

use regex::Regex;
use ruleform_validators::{Modifier, Test};

static TEST_SYNONYMS: LazyLock<Vec<(Regex, Test)>> = LazyLock::new(|| {
	[
		(r"^ig(nore)?$", Test::Ignore),
		(
			r"^(an|alnum|alphanum(ber|eric)?|alpha_num(ber|eric)?)$",
			Test::AlphaNumber,
		),
		(r"^(a|al|alpha|alphabetic)$", Test::Alpha),
		(r"^(b|bool|boolean)$", Test::Boolean),
		(r"^(dt|datetime|date_time|datetime-local)$", Test::DateTime),
		(r"^(d|date)$", Test::Date),
		(r"^(e|em|mail|email)$", Test::Email),
		(r"^(ne|nen|nenum|nin|notin|not_in)$", Test::Nenum),
		(r"^(en|enum|in)$", Test::Enum),
		(r"^(neq|nequal|notequal|not_equal|different)$", Test::Nequal),
		(r"^(eq|equal|equals|same)$", Test::Equal),
		(r"^(ext|extension)$", Test::Extension),
		(r"^(fi|file|upload)$", Test::File),
		(r"^(f|fo|fmt|format)$", Test::Format),
		(r"^(ip|ipaddr|ip_address)$", Test::Ip),
		(r"^(j|js|json)$", Test::Json),
		(r"^(l|len|length)$", Test::Length),
		(r"^(mal|maxl)\w*$", Test::MaxLength),
		(r"^(mil|minl)\w*$", Test::MinLength),
		(r"^(maw|maxw)\w*$", Test::MaxWords),
		(r"^(miw|minw)\w*$", Test::MinWords),
		(r"^(mx|max|maximum|lte)$", Test::Max),
		(r"^(mn|min|minimum|gte)$", Test::Min),
		(r"^(mi|mime|mimetype|mime_type)$", Test::Mime),
		(r"^(mo|month)$", Test::Month),
		(r"^(nn|notnull|not_null|nonnull)$", Test::NotNull),
		(r"^(nu|null|nullable)$", Test::Null),
		(r"^(n|num|number|numeric)$", Test::Number),
		(r"^(p|pw|pass|password)$", Test::Password),
		(r"^(re|reg|regex|regexp|pattern)$", Test::Regex),
		(r"^(r|req|required)$", Test::Required),
		(r"^(si|size|filesize)$", Test::Size),
		(r"^(s|str|string|text)$", Test::String),
		(r"^(t|tel|phone|telephone)$", Test::Tel),
		(r"^(ti|time)$", Test::Time),
		(r"^(u|url|uri|link)$", Test::Url),
		(r"^(w|week)$", Test::Week),
	]
	.into_iter()
	.map(|(pattern, test)| {
		let regex = Regex::new(&format!("(?i){pattern}"))
			.expect("TEST_SYNONYMS: invalid regex pattern");
		(regex, test)
	})
	.collect()
});

/// Matches a regex cell's test name followed by its colon
pub(crate) static REGEX_CELL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^\s*(regexp|regex|reg|re|pattern)\s*:")
		.expect("REGEX_CELL: invalid regex pattern")
});

/// Whole-word `ignore`/`ig` anywhere in a rule string
pub(crate) static IGNORE_WORD: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\b(ignore|ig)\b").expect("IGNORE_WORD: invalid regex pattern")
});

/// Canonicalize a test name
///
/// # Examples
///
/// ```
/// use ruleform_forms::grammar::canonical_test;
/// use ruleform_validators::Test;
///
/// assert_eq!(canonical_test("al"), Test::Alpha);
/// assert_eq!(canonical_test("maxlen"), Test::MaxLength);
/// assert_eq!(canonical_test("colour"), Test::Unknown("Colour".to_string()));
/// ```
pub fn canonical_test(name: &str) -> Test {
	let name = name.trim();
	TEST_SYNONYMS
		.iter()
		.find(|(pattern, _)| pattern.is_match(name))
		.map(|(_, test)| test.clone())
		.unwrap_or_else(|| Test::Unknown(titlecase(name)))
}

fn titlecase(name: &str) -> String {
	let mut chars = name.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Canonicalize one modifier abbreviation for `test`
///
/// The same abbreviation can mean different things for different tests:
/// `f` is `Float` for Number and Format, `s` is `Strict` for Extension and
/// `String` for Format.
pub fn canonical_modifier(test: &Test, raw: &str) -> Modifier {
	let key = raw.trim().to_ascii_lowercase();
	let known = match test {
		Test::Number => match key.as_str() {
			"o" | "only" => Some(Modifier::Only),
			"f" | "fl" | "float" => Some(Modifier::Float),
			"i" | "int" | "integer" => Some(Modifier::Integer),
			_ => None,
		},
		Test::Alpha | Test::AlphaNumber => match key.as_str() {
			"o" | "only" => Some(Modifier::Only),
			_ => None,
		},
		Test::Length | Test::MaxLength | Test::MinLength => match key.as_str() {
			"c" | "cut" => Some(Modifier::Cut),
			_ => None,
		},
		Test::Password => match key.as_str() {
			"h" | "hash" => Some(Modifier::Hash),
			_ => None,
		},
		Test::Email => match key.as_str() {
			"d" | "domain" | "dns" | "mx" => Some(Modifier::Domain),
			_ => None,
		},
		Test::Url => match key.as_str() {
			"e" | "exist" | "exists" | "check" => Some(Modifier::Exist),
			_ => None,
		},
		Test::Enum | Test::Nenum => match key.as_str() {
			"a" | "arr" | "array" => Some(Modifier::Array),
			"an" | "any" => Some(Modifier::Any),
			"o" | "only" => Some(Modifier::Only),
			_ => None,
		},
		Test::Json => match key.as_str() {
			"a" | "arr" | "array" => Some(Modifier::Array),
			_ => None,
		},
		Test::Extension => match key.as_str() {
			"s" | "strict" => Some(Modifier::Strict),
			_ => None,
		},
		Test::Ip => match key.as_str() {
			"4" | "v4" | "ipv4" => Some(Modifier::V4),
			"6" | "v6" | "ipv6" => Some(Modifier::V6),
			_ => None,
		},
		Test::Format => match key.as_str() {
			"s" | "str" | "string" => Some(Modifier::String),
			"i" | "int" | "integer" => Some(Modifier::Integer),
			"f" | "float" => Some(Modifier::Float),
			"r" | "round" => Some(Modifier::Round),
			"b" | "bool" | "boolean" => Some(Modifier::Boolean),
			"d" | "dt" | "date" | "datetime" => Some(Modifier::DateTime),
			_ => None,
		},
		_ => None,
	};
	known.unwrap_or(Modifier::Unknown(key))
}

/// Whether `raw` names a modifier of `test`
pub fn is_known_modifier(test: &Test, raw: &str) -> bool {
	!matches!(canonical_modifier(test, raw), Modifier::Unknown(_))
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("a", Test::Alpha)]
	#[case("AL", Test::Alpha)]
	#[case("alphaNumber", Test::AlphaNumber)]
	#[case("an", Test::AlphaNumber)]
	#[case("mal", Test::MaxLength)]
	#[case("maxlength", Test::MaxLength)]
	#[case("minl", Test::MinLength)]
	#[case("maxwords", Test::MaxWords)]
	#[case("max", Test::Max)]
	#[case("mi", Test::Mime)]
	#[case("min", Test::Min)]
	#[case("nenum", Test::Nenum)]
	#[case("enum", Test::Enum)]
	#[case("req", Test::Required)]
	#[case("re", Test::Regex)]
	#[case("dt", Test::DateTime)]
	#[case("fmt", Test::Format)]
	#[case("f", Test::Format)]
	#[case("upload", Test::File)]
	fn test_canonical_test(#[case] raw: &str, #[case] expected: Test) {
		assert_eq!(canonical_test(raw), expected);
	}

	#[rstest]
	#[case(Test::Number, "f", Modifier::Float)]
	#[case(Test::Format, "f", Modifier::Float)]
	#[case(Test::Extension, "s", Modifier::Strict)]
	#[case(Test::Format, "s", Modifier::String)]
	#[case(Test::Enum, "a", Modifier::Array)]
	#[case(Test::Ip, "v6", Modifier::V6)]
	#[case(Test::Alpha, "c", Modifier::Unknown("c".to_string()))]
	fn test_modifier_depends_on_test(
		#[case] test: Test,
		#[case] raw: &str,
		#[case] expected: Modifier,
	) {
		assert_eq!(canonical_modifier(&test, raw), expected);
	}
}
