//! Address validators: email, IP, telephone and URL
//!
//! `Email:domain` and `Url:exist` reach out through the collaborators in the
//! validation context. Lookups fail closed: any resolver or network error
//! rejects the value.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use regex::Regex;

use crate::collaborators::PhoneFormat;
use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::token::{Modifier, RuleToken};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
	)
	.expect("EMAIL_REGEX: invalid regex pattern")
});

/// Configuration keys holding the fallback telephone regions
pub const TEL_REGION_KEYS: [&str; 3] = ["RULEFORM_TEL_REGIONS", "TEL_REGIONS", "DEFAULT_REGION"];

/// Maximum length of an email address
const EMAIL_MAX_LEN: usize = 254;

fn text_subject<'a>(subject: &Subject<'a>, id: &'static str, what: &str) -> CheckResult<&'a str> {
	subject
		.as_text()
		.map(str::trim)
		.ok_or_else(|| Failure::data(id, format!("Value must be {what}")))
}

/// Syntactic email check
///
/// # Examples
///
/// ```
/// use ruleform_validators::network::is_email;
///
/// assert!(is_email("ada@example.org"));
/// assert!(!is_email("ada@localhost"));
/// assert!(!is_email("ada..lovelace@example.org"));
/// ```
pub fn is_email(value: &str) -> bool {
	value.len() <= EMAIL_MAX_LEN && EMAIL_REGEX.is_match(value)
}

pub struct Email;

impl RuleValidator for Email {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Domain]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let value = text_subject(&subject, ids::EMAIL, "an email address")?;
		if !is_email(value) {
			return Err(Failure::data(ids::EMAIL, "Value must be an email address"));
		}
		if !token.has_modifier(&Modifier::Domain) {
			return Ok(Outcome::Accepted);
		}

		let domain = value.rsplit_once('@').map(|(_, d)| d).unwrap_or_default();
		match ctx.collaborators().mx_resolver.has_mx(domain) {
			Ok(true) => Ok(Outcome::Accepted),
			Ok(false) => Err(Failure::data(
				ids::EMAIL_DOMAIN,
				format!("Domain '{domain}' does not accept email"),
			)),
			Err(error) => {
				tracing::warn!(domain, %error, "MX lookup failed");
				Err(Failure::data(
					ids::EMAIL_DOMAIN,
					format!("Domain '{domain}' could not be verified"),
				))
			}
		}
	}
}

/// IPv4 by default, IPv6 with `v6`
pub struct Ip;

impl RuleValidator for Ip {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::V4, Modifier::V6]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let value = text_subject(&subject, ids::IP, "an IP address")?;
		let (valid, family) = if token.has_modifier(&Modifier::V6) {
			(value.parse::<Ipv6Addr>().is_ok(), "IPv6")
		} else {
			(value.parse::<Ipv4Addr>().is_ok(), "IPv4")
		};
		if valid {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(ids::IP, format!("Value must be an {family} address")))
		}
	}
}

/// Telephone numbers, rewritten to international format
pub struct Tel;

impl Tel {
	/// Regions to try, in order: rule values, context regions, configured
	/// regions, then everything the library supports
	fn regions(token: &RuleToken, ctx: &ValidationContext<'_>) -> CheckResult<Vec<String>> {
		let phone = &ctx.collaborators().phone;
		let supported = phone.supported_regions();

		if !token.values.is_empty() {
			let requested: Vec<String> = token.values.iter().map(|r| r.to_ascii_uppercase()).collect();
			if let Some(unknown) = requested.iter().find(|r| !supported.contains(*r)) {
				return Err(Failure::grammar(
					ids::UNSUPPORTED_TEL_REGION,
					format!("Telephone region '{unknown}' is not supported"),
				));
			}
			return Ok(requested);
		}

		let configured: Vec<String> = if ctx.tel_regions().is_empty() {
			ctx.collaborators()
				.config
				.first_of(&TEL_REGION_KEYS)
				.map(|list| {
					list.split(',')
						.map(|r| r.trim().to_ascii_uppercase())
						.filter(|r| !r.is_empty())
						.collect()
				})
				.unwrap_or_default()
		} else {
			ctx.tel_regions()
				.iter()
				.map(|r| r.to_ascii_uppercase())
				.collect()
		};
		let usable: Vec<String> = configured
			.into_iter()
			.filter(|r| supported.contains(r))
			.collect();

		if usable.is_empty() {
			Ok(supported.into_iter().collect())
		} else {
			Ok(usable)
		}
	}
}

impl RuleValidator for Tel {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let regions = Self::regions(token, ctx)?;
		let value = text_subject(&subject, ids::TEL, "a telephone number")?;
		let phone = &ctx.collaborators().phone;

		let international = value
			.starts_with('+')
			.then(|| phone.parse(value, None).ok())
			.flatten()
			.filter(|parsed| parsed.is_valid())
			.or_else(|| {
				regions.iter().find_map(|region| {
					phone
						.parse(value, Some(region))
						.ok()
						.filter(|parsed| parsed.is_valid())
				})
			})
			.map(|parsed| parsed.format(PhoneFormat::International).to_string());

		match international {
			Some(formatted) if formatted == value => Ok(Outcome::Accepted),
			Some(formatted) => Ok(Outcome::Rewritten(formatted)),
			None => Err(Failure::data(ids::TEL, "Value must be a telephone number")),
		}
	}
}

/// Absolute URL; `exist` also probes it
pub struct Url;

impl Url {
	/// Parse an absolute URL; hierarchical URLs need a host
	pub fn parse(value: &str) -> Option<url::Url> {
		if value.chars().any(char::is_whitespace) {
			return None;
		}
		let parsed = url::Url::parse(value).ok()?;
		let has_authority = parsed.has_host() && parsed.host_str().is_some_and(|h| !h.is_empty());
		(parsed.cannot_be_a_base() || has_authority || parsed.scheme() == "file").then_some(parsed)
	}
}

impl RuleValidator for Url {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Exist]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let value = text_subject(&subject, ids::URL, "a URL")?;
		let parsed = Self::parse(value).ok_or_else(|| Failure::data(ids::URL, "Value must be a URL"))?;
		if !token.has_modifier(&Modifier::Exist) {
			return Ok(Outcome::Accepted);
		}

		match ctx.collaborators().url_prober.probe(&parsed) {
			Ok(response) if response.is_live_html() => Ok(Outcome::Accepted),
			Ok(response) => {
				tracing::debug!(url = %parsed, status = response.status, "URL probe rejected");
				Err(Failure::data(
					ids::URL_NOT_REACHABLE,
					format!("URL '{value}' does not serve a page"),
				))
			}
			Err(error) => {
				tracing::warn!(url = %parsed, %error, "URL probe failed");
				Err(Failure::data(
					ids::URL_NOT_REACHABLE,
					format!("URL '{value}' is not reachable"),
				))
			}
		}
	}
}
