//! Output sanitizer
//!
//! Runs over the validated tree: text leaves are trimmed, tag-stripped and
//! HTML-escaped according to the [`SanitizePolicy`], then blank leaves are
//! dropped. Uploaded files, date-times and typed leaves produced by
//! `Format` are left alone.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use ruleform_validators::{FormValue, NOTNULL_REPLACE_VALUE};

use crate::config::{CONFIG_KEY, SanitizePolicy};

static ENTITY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
		.expect("ENTITY_REGEX: invalid regex pattern")
});

/// Escape HTML special characters, leaving existing entities intact
///
/// # Examples
///
/// ```
/// use ruleform_forms::sanitizer::escape_html;
///
/// assert_eq!(escape_html("<b>Tom & 'Jerry'</b>"), "&lt;b&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/b&gt;");
/// assert_eq!(escape_html("&lt;kept&gt; &amp; R&D"), "&lt;kept&gt; &amp; R&amp;D");
/// ```
pub fn escape_html(input: &str) -> String {
	let mut output = String::with_capacity(input.len());
	for (pos, c) in input.char_indices() {
		match c {
			'&' if ENTITY_REGEX.is_match(&input[pos..]) => output.push('&'),
			'&' => output.push_str("&amp;"),
			'<' => output.push_str("&lt;"),
			'>' => output.push_str("&gt;"),
			'"' => output.push_str("&quot;"),
			'\'' => output.push_str("&#x27;"),
			other => output.push(other),
		}
	}
	output
}

fn opens_markup(next: Option<&char>) -> bool {
	next.is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

fn strip_tags_once(html: &str) -> String {
	let mut result = String::with_capacity(html.len());
	let chars: Vec<char> = html.chars().collect();
	let len = chars.len();
	let mut i = 0;

	while i < len {
		if chars[i] != '<' || !opens_markup(chars.get(i + 1)) {
			result.push(chars[i]);
			i += 1;
			continue;
		}

		if chars[i + 1..].starts_with(&['!', '-', '-']) {
			i += 4;
			while i < len && !chars[i..].starts_with(&['-', '-', '>']) {
				i += 1;
			}
			i = (i + 3).min(len);
			continue;
		}

		// Skip to the closing `>`, ignoring any inside quoted attributes
		i += 1;
		let mut in_single_quote = false;
		let mut in_double_quote = false;
		while i < len {
			match chars[i] {
				'"' if !in_single_quote => in_double_quote = !in_double_quote,
				'\'' if !in_double_quote => in_single_quote = !in_single_quote,
				'>' if !in_single_quote && !in_double_quote => {
					i += 1;
					break;
				}
				_ => {}
			}
			i += 1;
		}
	}
	result
}

/// Remove tags and comments
///
/// A `<` only opens markup when followed by a letter, `/`, `!` or `?`, so
/// `a < b` survives. Stripping repeats until nothing changes.
///
/// # Examples
///
/// ```
/// use ruleform_forms::sanitizer::strip_tags;
///
/// assert_eq!(strip_tags("<p>Hello <b>World</b></p>"), "Hello World");
/// assert_eq!(strip_tags(r#"<a title="x>y">Link</a>"#), "Link");
/// assert_eq!(strip_tags("1 < 2<!-- note -->"), "1 < 2");
/// assert_eq!(strip_tags("<<b>i>x"), "x");
/// ```
pub fn strip_tags(html: &str) -> String {
	let mut current = html.to_string();
	loop {
		let next = strip_tags_once(&current);
		if next == current {
			return next;
		}
		current = next;
	}
}

/// Applies a [`SanitizePolicy`] to a validated tree
#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
	policy: SanitizePolicy,
	untouched: HashSet<String>,
}

impl Sanitizer {
	pub fn new(policy: SanitizePolicy) -> Self {
		Self {
			policy,
			untouched: HashSet::new(),
		}
	}

	/// Top-level fields passed through exactly as submitted
	pub fn with_untouched<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.untouched.extend(fields.into_iter().map(Into::into));
		self
	}

	pub fn policy(&self) -> SanitizePolicy {
		self.policy
	}

	/// Sanitize one text leaf
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_forms::config::SanitizePolicy;
	/// use ruleform_forms::sanitizer::Sanitizer;
	///
	/// let keep_tags = Sanitizer::new(SanitizePolicy { html: true, strip: false });
	/// assert_eq!(keep_tags.clean_text(" <b>hi</b> "), "&lt;b&gt;hi&lt;/b&gt;");
	///
	/// let default = Sanitizer::new(SanitizePolicy::default());
	/// assert_eq!(default.clean_text("<b>hi</b> & bye"), "hi &amp; bye");
	/// ```
	pub fn clean_text(&self, text: &str) -> String {
		if text == NOTNULL_REPLACE_VALUE {
			return text.to_string();
		}
		let mut cleaned = text.trim().to_string();
		if self.policy.strip {
			cleaned = strip_tags(&cleaned).trim().to_string();
		}
		if self.policy.html {
			cleaned = escape_html(&cleaned);
		}
		cleaned
	}

	/// Sanitize a whole tree in place
	///
	/// The `__CONFIG__` key is removed, then blank leaves are dropped at
	/// every level. Running it twice changes nothing.
	pub fn sanitize(&self, tree: &mut FormValue) {
		if let FormValue::Map(fields) = tree {
			fields.shift_remove(CONFIG_KEY);
			self.sanitize_level(fields, true);
		}
	}

	fn sanitize_level(&self, fields: &mut IndexMap<String, FormValue>, top: bool) {
		for (key, value) in fields.iter_mut() {
			if top && self.untouched.contains(key) {
				continue;
			}
			match value {
				FormValue::Map(nested) => self.sanitize_level(nested, false),
				FormValue::Text(text) => *text = self.clean_text(text),
				FormValue::File(_)
				| FormValue::DateTime(_)
				| FormValue::Null
				| FormValue::Bool(_)
				| FormValue::Int(_)
				| FormValue::Float(_) => {}
			}
		}
		fields.retain(|key, value| (top && self.untouched.contains(key)) || !value.is_blank());
	}
}

/// Rewrite the `NotNull` sentinel to an empty string, once sanitizing is done
pub fn finalize_not_null(tree: &mut FormValue) {
	match tree {
		FormValue::Text(text) if text == NOTNULL_REPLACE_VALUE => text.clear(),
		FormValue::Map(fields) => fields.values_mut().for_each(finalize_not_null),
		_ => {}
	}
}
