//! External collaborators consumed by the validators
//!
//! Network lookups, phone number handling, configuration and upload
//! verification sit behind small traits so hosts (and tests) can swap them.
//! [`Collaborators::default`] wires the production implementations.

use std::collections::{BTreeSet, HashMap};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::Failure;

/// Errors raised by collaborator implementations
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
	#[error("DNS lookup failed: {0}")]
	Dns(String),
	#[error("HTTP probe failed: {0}")]
	Http(String),
	#[error("Phone number could not be parsed: {0}")]
	Phone(String),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Resolves mail exchanger records for a domain
pub trait MxResolver: Send + Sync {
	/// Whether the domain publishes at least one MX record
	fn has_mx(&self, domain: &str) -> Result<bool, CollaboratorError>;
}

/// What a URL probe observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
	pub status: u16,
	pub content_type: Option<String>,
	pub body_len: usize,
}

impl ProbeResponse {
	/// A 2xx answer carrying a non-empty HTML body
	pub fn is_live_html(&self) -> bool {
		(200..300).contains(&self.status)
			&& self.body_len > 0
			&& self
				.content_type
				.as_deref()
				.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"))
	}
}

/// Issues a short ranged request against a URL
pub trait UrlProber: Send + Sync {
	fn probe(&self, url: &url::Url) -> Result<ProbeResponse, CollaboratorError>;
}

/// Output styles of a parsed phone number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneFormat {
	E164,
	International,
	National,
}

/// A phone number as understood by the phone library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPhone {
	pub valid: bool,
	pub e164: String,
	pub international: String,
	pub national: String,
}

impl ParsedPhone {
	pub fn is_valid(&self) -> bool {
		self.valid
	}

	pub fn format(&self, style: PhoneFormat) -> &str {
		match style {
			PhoneFormat::E164 => &self.e164,
			PhoneFormat::International => &self.international,
			PhoneFormat::National => &self.national,
		}
	}
}

/// Phone number parsing and formatting
pub trait PhoneNumberLibrary: Send + Sync {
	/// Parse `value`, interpreting national numbers in `region`
	fn parse(&self, value: &str, region: Option<&str>) -> Result<ParsedPhone, CollaboratorError>;

	/// Upper-case ISO region codes the library has metadata for
	fn supported_regions(&self) -> BTreeSet<String>;
}

/// Key/value configuration source
pub trait ConfigProvider: Send + Sync {
	fn get(&self, key: &str) -> Option<String>;

	/// First non-blank value among `keys`, in order
	fn first_of(&self, keys: &[&str]) -> Option<String> {
		keys.iter()
			.filter_map(|key| self.get(key))
			.find(|value| !value.trim().is_empty())
	}
}

/// Decides whether a path is a genuine upload rather than an arbitrary file
pub trait UploadVerifier: Send + Sync {
	fn is_uploaded_file(&self, path: &Path) -> bool;
}

/// Receives failures for developer-facing rendering
pub trait ErrorReporter: Send + Sync {
	fn report(&self, failure: &Failure);
}

/// MX lookups through the system resolver configuration
#[derive(Debug, Default, Clone)]
pub struct DnsMxResolver;

impl MxResolver for DnsMxResolver {
	fn has_mx(&self, domain: &str) -> Result<bool, CollaboratorError> {
		let resolver = hickory_resolver::Resolver::from_system_conf()
			.map_err(|e| CollaboratorError::Dns(e.to_string()))?;
		let lookup = resolver
			.mx_lookup(domain)
			.map_err(|e| CollaboratorError::Dns(e.to_string()))?;
		Ok(lookup.iter().next().is_some())
	}
}

/// Blocking HTTP prober
///
/// Uses the blocking `reqwest` client, so it must not be called from inside
/// an async runtime worker.
#[derive(Debug, Clone)]
pub struct HttpUrlProber {
	timeout: Duration,
}

/// Bytes requested by a probe
const PROBE_RANGE: &str = "bytes=0-1023";

impl HttpUrlProber {
	pub fn new(timeout: Duration) -> Self {
		Self { timeout }
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}
}

impl Default for HttpUrlProber {
	fn default() -> Self {
		Self::new(Duration::from_secs(5))
	}
}

impl UrlProber for HttpUrlProber {
	fn probe(&self, url: &url::Url) -> Result<ProbeResponse, CollaboratorError> {
		let client = reqwest::blocking::Client::builder()
			.timeout(self.timeout)
			.build()
			.map_err(|e| CollaboratorError::Http(e.to_string()))?;
		let response = client
			.get(url.as_str())
			.header(reqwest::header::RANGE, PROBE_RANGE)
			.send()
			.map_err(|e| CollaboratorError::Http(e.to_string()))?;

		let status = response.status().as_u16();
		let content_type = response
			.headers()
			.get(reqwest::header::CONTENT_TYPE)
			.and_then(|v| v.to_str().ok())
			.map(str::to_string);
		let body = response
			.bytes()
			.map_err(|e| CollaboratorError::Http(e.to_string()))?;

		Ok(ProbeResponse {
			status,
			content_type,
			body_len: body.len(),
		})
	}
}

/// ISO 3166-1 alpha-2 codes offered to the phone library
const REGION_CODES: &[&str] = &[
	"AC", "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AR", "AS", "AT", "AU", "AW", "AX", "AZ",
	"BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ", "BR", "BS",
	"BT", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK", "CL", "CM", "CN", "CO",
	"CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM", "DO", "DZ", "EC", "EE", "EG",
	"EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR", "GA", "GB", "GD", "GE", "GF", "GG",
	"GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GT", "GU", "GW", "GY", "HK", "HN", "HR", "HT",
	"HU", "ID", "IE", "IL", "IM", "IN", "IO", "IQ", "IR", "IS", "IT", "JE", "JM", "JO", "JP", "KE",
	"KG", "KH", "KI", "KM", "KN", "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC", "LI", "LK", "LR",
	"LS", "LT", "LU", "LV", "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK", "ML", "MM", "MN",
	"MO", "MP", "MQ", "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA", "NC", "NE", "NF",
	"NG", "NI", "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG", "PH", "PK", "PL",
	"PM", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW", "SA", "SB", "SC", "SD",
	"SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS", "ST", "SV", "SX", "SY",
	"SZ", "TA", "TC", "TD", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO", "TR", "TT", "TV", "TW",
	"TZ", "UA", "UG", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI", "VN", "VU", "WF", "WS", "XK",
	"YE", "YT", "ZA", "ZM", "ZW",
];

/// Phone handling backed by the `phonenumber` crate
#[derive(Debug, Default, Clone)]
pub struct PhonenumberLibrary;

impl PhonenumberLibrary {
	fn country(region: &str) -> Option<phonenumber::country::Id> {
		region.to_ascii_uppercase().parse().ok()
	}
}

impl PhoneNumberLibrary for PhonenumberLibrary {
	fn parse(&self, value: &str, region: Option<&str>) -> Result<ParsedPhone, CollaboratorError> {
		let country = match region {
			Some(code) => Some(
				Self::country(code)
					.ok_or_else(|| CollaboratorError::Phone(format!("unknown region {code}")))?,
			),
			None => None,
		};
		let number = phonenumber::parse(country, value)
			.map_err(|e| CollaboratorError::Phone(e.to_string()))?;

		Ok(ParsedPhone {
			valid: phonenumber::is_valid(&number),
			e164: number.format().mode(phonenumber::Mode::E164).to_string(),
			international: number
				.format()
				.mode(phonenumber::Mode::International)
				.to_string(),
			national: number.format().mode(phonenumber::Mode::National).to_string(),
		})
	}

	fn supported_regions(&self) -> BTreeSet<String> {
		REGION_CODES
			.iter()
			.filter(|code| Self::country(code).is_some())
			.map(|code| (*code).to_string())
			.collect()
	}
}

/// Environment variable configuration
///
/// With prefix `"APP_"` the key `tel_regions` reads `APP_TEL_REGIONS`.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
	prefix: String,
}

impl EnvConfigProvider {
	pub fn new(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
		}
	}

	pub fn without_prefix() -> Self {
		Self::default()
	}

	fn env_var_name(&self, key: &str) -> String {
		format!("{}{}", self.prefix, key.to_uppercase())
	}
}

impl ConfigProvider for EnvConfigProvider {
	fn get(&self, key: &str) -> Option<String> {
		env::var(self.env_var_name(key)).ok()
	}
}

/// In-memory configuration
#[derive(Debug, Clone, Default)]
pub struct MapConfigProvider {
	values: HashMap<String, String>,
}

impl MapConfigProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.values.insert(key.into(), value.into());
		self
	}
}

impl ConfigProvider for MapConfigProvider {
	fn get(&self, key: &str) -> Option<String> {
		self.values.get(key).cloned()
	}
}

/// Accepts regular files located under one of the upload roots
///
/// The system temporary directory is always a root.
#[derive(Debug, Clone)]
pub struct TempDirUploadVerifier {
	roots: Vec<PathBuf>,
}

impl TempDirUploadVerifier {
	pub fn new() -> Self {
		Self {
			roots: vec![env::temp_dir()],
		}
	}

	/// Register an additional directory uploads are written to
	pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.roots.push(root.into());
		self
	}
}

impl Default for TempDirUploadVerifier {
	fn default() -> Self {
		Self::new()
	}
}

impl UploadVerifier for TempDirUploadVerifier {
	fn is_uploaded_file(&self, path: &Path) -> bool {
		let Ok(resolved) = path.canonicalize() else {
			return false;
		};
		if !resolved.is_file() {
			return false;
		}
		self.roots
			.iter()
			.filter_map(|root| root.canonicalize().ok())
			.any(|root| resolved.starts_with(root))
	}
}

/// Emits failures as `tracing` warnings
#[derive(Debug, Default, Clone)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
	fn report(&self, failure: &Failure) {
		tracing::warn!(
			id = failure.id,
			code = failure.code,
			field = failure.field.as_deref().unwrap_or(""),
			file = failure.file.unwrap_or(""),
			line = failure.line.unwrap_or(0),
			"{}",
			failure.dev_message.as_deref().unwrap_or(&failure.message)
		);
	}
}

/// The collaborator set one validation run uses
#[derive(Clone)]
pub struct Collaborators {
	pub mx_resolver: Arc<dyn MxResolver>,
	pub url_prober: Arc<dyn UrlProber>,
	pub phone: Arc<dyn PhoneNumberLibrary>,
	pub config: Arc<dyn ConfigProvider>,
	pub uploads: Arc<dyn UploadVerifier>,
	pub reporter: Arc<dyn ErrorReporter>,
}

impl Collaborators {
	pub fn with_mx_resolver(mut self, resolver: impl MxResolver + 'static) -> Self {
		self.mx_resolver = Arc::new(resolver);
		self
	}

	pub fn with_url_prober(mut self, prober: impl UrlProber + 'static) -> Self {
		self.url_prober = Arc::new(prober);
		self
	}

	pub fn with_phone_library(mut self, phone: impl PhoneNumberLibrary + 'static) -> Self {
		self.phone = Arc::new(phone);
		self
	}

	pub fn with_config(mut self, config: impl ConfigProvider + 'static) -> Self {
		self.config = Arc::new(config);
		self
	}

	pub fn with_upload_verifier(mut self, uploads: impl UploadVerifier + 'static) -> Self {
		self.uploads = Arc::new(uploads);
		self
	}

	pub fn with_reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
		self.reporter = Arc::new(reporter);
		self
	}
}

impl Default for Collaborators {
	fn default() -> Self {
		Self {
			mx_resolver: Arc::new(DnsMxResolver),
			url_prober: Arc::new(HttpUrlProber::default()),
			phone: Arc::new(PhonenumberLibrary),
			config: Arc::new(EnvConfigProvider::without_prefix()),
			uploads: Arc::new(TempDirUploadVerifier::new()),
			reporter: Arc::new(TracingReporter),
		}
	}
}

impl std::fmt::Debug for Collaborators {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Collaborators").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_map_config_first_of_skips_blank() {
		// Arrange
		let config = MapConfigProvider::new()
			.with("TEL_REGIONS", "  ")
			.with("DEFAULT_REGION", "DE");

		// Act
		let found = config.first_of(&["RULEFORM_TEL_REGIONS", "TEL_REGIONS", "DEFAULT_REGION"]);

		// Assert
		assert_eq!(found.as_deref(), Some("DE"));
	}

	#[rstest]
	fn test_env_config_name_uses_prefix() {
		let provider = EnvConfigProvider::new("RULEFORM_");
		assert_eq!(provider.env_var_name("tel_regions"), "RULEFORM_TEL_REGIONS");
	}

	#[rstest]
	#[case(200, Some("text/html; charset=utf-8"), 10, true)]
	#[case(206, Some("TEXT/HTML"), 1, true)]
	#[case(200, Some("application/json"), 10, false)]
	#[case(404, Some("text/html"), 10, false)]
	#[case(200, Some("text/html"), 0, false)]
	#[case(200, None, 10, false)]
	fn test_probe_response_live_html(
		#[case] status: u16,
		#[case] content_type: Option<&str>,
		#[case] body_len: usize,
		#[case] expected: bool,
	) {
		let response = ProbeResponse {
			status,
			content_type: content_type.map(str::to_string),
			body_len,
		};
		assert_eq!(response.is_live_html(), expected);
	}

	#[rstest]
	fn test_upload_verifier_accepts_registered_root_only() {
		// Arrange
		let root = tempfile::tempdir().unwrap();
		let path = root.path().join("upload.bin");
		std::fs::File::create(&path)
			.unwrap()
			.write_all(b"data")
			.unwrap();
		let verifier = TempDirUploadVerifier {
			roots: vec![root.path().to_path_buf()],
		};

		// Act & Assert
		assert!(verifier.is_uploaded_file(&path));
		assert!(!verifier.is_uploaded_file(root.path()));
		assert!(!verifier.is_uploaded_file(Path::new("/etc/passwd")));
	}

	#[rstest]
	fn test_phonenumber_library_formats_international() {
		let library = PhonenumberLibrary;

		let parsed = library.parse("+1 650-253-0000", None).unwrap();

		assert!(parsed.is_valid());
		assert_eq!(parsed.format(PhoneFormat::E164), "+16502530000");
		assert!(library.supported_regions().contains("US"));
	}
}
