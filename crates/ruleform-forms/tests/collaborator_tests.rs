//! Validation runs with fake collaborators

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ruleform_forms::{FormValue, Validation, ValidationSettings};
use ruleform_validators::{
	CollaboratorError, Collaborators, ErrorReporter, Failure, MxResolver, ParsedPhone,
	PhoneNumberLibrary, ProbeResponse, UploadVerifier, UrlProber,
};
use rstest::rstest;
use serde_json::json;

#[derive(Clone, Default)]
struct CountingMx {
	calls: Arc<AtomicUsize>,
}

impl MxResolver for CountingMx {
	fn has_mx(&self, domain: &str) -> Result<bool, CollaboratorError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(domain == "example.com")
	}
}

struct FixedProbe(ProbeResponse);

impl UrlProber for FixedProbe {
	fn probe(&self, _url: &url::Url) -> Result<ProbeResponse, CollaboratorError> {
		Ok(self.0.clone())
	}
}

struct UnreachableProbe;

impl UrlProber for UnreachableProbe {
	fn probe(&self, url: &url::Url) -> Result<ProbeResponse, CollaboratorError> {
		Err(CollaboratorError::Http(format!("{url}: connection refused")))
	}
}

/// Treats every number as valid only for Austria
struct AustriaOnly;

impl PhoneNumberLibrary for AustriaOnly {
	fn parse(&self, value: &str, region: Option<&str>) -> Result<ParsedPhone, CollaboratorError> {
		let digits: String = value.chars().filter(char::is_ascii_digit).collect();
		Ok(ParsedPhone {
			valid: region == Some("AT"),
			e164: format!("+43{digits}"),
			international: format!("+43 {}", digits.trim_start_matches('0')),
			national: digits,
		})
	}

	fn supported_regions(&self) -> BTreeSet<String> {
		["AT", "CH"].into_iter().map(str::to_string).collect()
	}
}

struct NoUploads;

impl UploadVerifier for NoUploads {
	fn is_uploaded_file(&self, _path: &Path) -> bool {
		false
	}
}

#[derive(Clone, Default)]
struct CollectingReporter {
	seen: Arc<Mutex<Vec<String>>>,
}

impl ErrorReporter for CollectingReporter {
	fn report(&self, failure: &Failure) {
		if let Ok(mut seen) = self.seen.lock() {
			seen.push(failure.id.to_string());
		}
	}
}

fn with(collaborators: Collaborators) -> Validation {
	Validation::builder().collaborators(collaborators).build()
}

#[rstest]
fn test_first_failure_aborts_the_whole_request() {
	// Arrange
	let mx = CountingMx::default();
	let validation = with(Collaborators::default().with_mx_resolver(mx.clone()));
	let data = json!({"email": "ada@example.com", "name": "Ada 2"});
	let rules = json!({"name": "alpha", "email": "email:domain"});

	// Act
	let result = validation.validate(&data, &rules).unwrap();

	// Assert
	assert_eq!(result.error().map(|e| e.id.as_str()), Some("vE031"));
	assert_eq!(mx.calls.load(Ordering::SeqCst), 0);
}

#[rstest]
fn test_email_domain_lookup_runs_once_per_value() {
	let mx = CountingMx::default();
	let validation = with(Collaborators::default().with_mx_resolver(mx.clone()));

	let ok = validation
		.validate(&json!({"email": "ada@example.com"}), &json!({"email": "e:d"}))
		.unwrap();
	let missing = validation
		.validate(&json!({"email": "ada@nowhere.test"}), &json!({"email": "e:d"}))
		.unwrap();

	assert!(ok.is_valid());
	assert_eq!(missing.error().map(|e| e.id.as_str()), Some("vE049"));
	assert_eq!(mx.calls.load(Ordering::SeqCst), 2);
}

#[rstest]
#[case(200, "text/html; charset=utf-8", 120, true)]
#[case(206, "application/json", 120, false)]
#[case(404, "text/html", 120, false)]
#[case(200, "text/html", 0, false)]
fn test_url_exist_uses_the_prober(
	#[case] status: u16,
	#[case] content_type: &str,
	#[case] body_len: usize,
	#[case] valid: bool,
) {
	let probe = FixedProbe(ProbeResponse {
		status,
		content_type: Some(content_type.to_string()),
		body_len,
	});
	let validation = with(Collaborators::default().with_url_prober(probe));

	let result = validation
		.validate_value("https://example.com/page", "url:exist")
		.unwrap();

	assert_eq!(result.is_valid(), valid);
}

#[rstest]
fn test_url_probe_errors_fail_closed() {
	let validation = with(Collaborators::default().with_url_prober(UnreachableProbe));

	let result = validation.validate_value("https://example.com", "u:e").unwrap();

	assert_eq!(result.error().map(|e| e.id.as_str()), Some("vE103"));
}

#[rstest]
fn test_tel_regions_from_settings() {
	// Arrange
	let settings = ValidationSettings {
		tel_regions: vec!["CH".to_string(), "AT".to_string()],
		..ValidationSettings::default()
	};
	let validation = Validation::builder()
		.settings(settings)
		.collaborators(Collaborators::default().with_phone_library(AustriaOnly))
		.build();

	// Act
	let result = validation.validate_value("0664 123456", "tel").unwrap();

	// Assert
	assert_eq!(
		result.data().and_then(|d| d.get("value")),
		Some(&FormValue::text("+43 664123456"))
	);
}

#[rstest]
fn test_tel_rule_regions_are_checked_against_the_library() {
	let validation = with(Collaborators::default().with_phone_library(AustriaOnly));

	let result = validation.validate_value("0664 123456", "tel:DE").unwrap();

	assert_eq!(result.error().map(|e| (e.id.as_str(), e.code)), Some(("vE022", 400)));
}

fn png_upload() -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").unwrap();
	file
}

fn upload_json(name: &str, path: &Path, size: u64) -> serde_json::Value {
	json!({
		"name": name,
		"type": "image/png",
		"tmp_name": path.to_string_lossy(),
		"error": 0,
		"size": size
	})
}

#[rstest]
fn test_upload_passes_file_checks_and_stays_a_file() {
	// Arrange
	let upload = png_upload();
	let data = json!({"avatar": upload_json("me.PNG", upload.path(), 16)});
	let rules = json!({"avatar": "required; file; ext:png; mime:image/*; size:1KB"});

	// Act
	let result = Validation::new().validate(&data, &rules).unwrap();

	// Assert
	assert!(result.is_valid(), "{:?}", result.error());
	assert!(matches!(
		result.data().and_then(|d| d.get("avatar")),
		Some(FormValue::File(file)) if file.name == "me.PNG"
	));
}

#[rstest]
#[case("file; ext:s:jpeg", "vE059")]
#[case("file; mime:application/pdf", "vE061")]
#[case("file; size:10B", "vE097")]
fn test_upload_rejections(#[case] rule: &str, #[case] id: &str) {
	let upload = png_upload();
	let data = json!({"avatar": upload_json("me.png", upload.path(), 16)});

	let result = Validation::new()
		.validate(&data, &json!({ "avatar": rule }))
		.unwrap();

	assert_eq!(result.error().map(|e| e.id.as_str()), Some(id));
}

#[rstest]
fn test_upload_must_come_from_the_verifier() {
	let upload = png_upload();
	let validation = with(Collaborators::default().with_upload_verifier(NoUploads));

	let result = validation
		.validate(
			&json!({"avatar": upload_json("me.png", upload.path(), 16)}),
			&json!({"avatar": "file"}),
		)
		.unwrap();

	assert_eq!(result.error().map(|e| e.id.as_str()), Some("vE067"));
}

#[rstest]
fn test_missing_upload_is_required() {
	let data = json!({"avatar": {"name": "", "type": "", "tmp_name": "", "error": 4, "size": 0}});

	let optional = Validation::new()
		.validate(&data, &json!({"avatar": "file"}))
		.unwrap();
	let required = Validation::new()
		.validate(&data, &json!({"avatar": "file; required"}))
		.unwrap();

	assert!(optional.is_valid());
	assert_eq!(required.error().map(|e| e.id.as_str()), Some("vE109"));
}

#[rstest]
fn test_dev_messages_go_to_the_reporter() {
	let reporter = CollectingReporter::default();
	let validation = Validation::builder()
		.dev_messages(true)
		.collaborators(Collaborators::default().with_reporter(reporter.clone()))
		.build();

	let result = validation
		.validate(&json!({"age": "x"}), &json!({"age": "number"}))
		.unwrap();

	assert!(!result.is_valid());
	assert_eq!(*reporter.seen.lock().unwrap(), vec!["vE089".to_string()]);
}

#[rstest]
fn test_reporter_is_silent_without_dev_messages() {
	let reporter = CollectingReporter::default();
	let validation = with(Collaborators::default().with_reporter(reporter.clone()));

	let _ = validation
		.validate(&json!({"age": "x"}), &json!({"age": "number"}))
		.unwrap();

	assert!(reporter.seen.lock().unwrap().is_empty());
}
