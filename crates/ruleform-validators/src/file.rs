//! Upload validators
//!
//! These only ever trust the server side of an upload: the temp file's
//! bytes and size. The client-supplied MIME type is ignored.

use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::context::ValidationContext;
use crate::errors::{CheckResult, Failure, ids};
use crate::registry::{Outcome, RuleValidator, Subject};
use crate::token::{Modifier, RuleToken};
use crate::value::{FileValue, upload_error};

static SIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^\s*(\d+(?:[.,]\d+)?)\s*([KMGT]?B)?\s*$")
		.expect("SIZE_REGEX: invalid regex pattern")
});

/// Bytes read from an upload to sniff its type
pub const SNIFF_LEN: u64 = 512;

/// Extensions that are treated as interchangeable unless `strict` is set
const EXTENSION_SIBLINGS: &[&[&str]] = &[
	&["jpg", "jpeg", "jpe", "jfif"],
	&["tif", "tiff"],
	&["htm", "html"],
	&["mpg", "mpeg", "mpe"],
	&["mid", "midi"],
	&["aif", "aiff", "aifc"],
	&["ogg", "oga"],
	&["yml", "yaml"],
	&["gz", "gzip"],
	&["txt", "text"],
];

fn require_file<'a>(subject: &Subject<'a>, id: &'static str, test: &str) -> CheckResult<&'a FileValue> {
	subject
		.as_file()
		.ok_or_else(|| Failure::data(id, format!("{test} requires an uploaded file")))
}

fn upload_error_message(code: i64) -> &'static str {
	match code {
		upload_error::INI_SIZE | upload_error::FORM_SIZE => "The uploaded file is too large",
		upload_error::PARTIAL => "The file was only partially uploaded",
		upload_error::NO_TMP_DIR => "The server has no temporary folder for uploads",
		upload_error::CANT_WRITE => "The uploaded file could not be written to disk",
		upload_error::EXTENSION => "The upload was stopped by a server extension",
		_ => "The file upload failed",
	}
}

/// A genuine, successfully completed upload
pub struct File;

impl RuleValidator for File {
	fn handles_empty(&self) -> bool {
		true
	}

	fn check(
		&self,
		subject: Subject<'_>,
		_token: &RuleToken,
		ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let file = match subject {
			Subject::File(file) => file,
			Subject::Text(_) if subject.is_unset() => return Ok(Outcome::Empty),
			_ => {
				return Err(Failure::data(
					ids::FILE_SHAPE,
					"Value is not an uploaded file",
				));
			}
		};
		if file.is_missing() {
			return Ok(Outcome::Empty);
		}
		if file.error != upload_error::OK {
			return Err(Failure::data(
				ids::FILE_UPLOAD_ERROR,
				upload_error_message(file.error),
			));
		}
		if !ctx.collaborators().uploads.is_uploaded_file(&file.tmp_path) {
			return Err(Failure::data(
				ids::FILE_NOT_UPLOADED,
				format!("'{}' was not uploaded through this request", file.name),
			));
		}
		Ok(Outcome::Accepted)
	}
}

/// Allow-list with sibling extensions added, e.g. `jpg` also allows `jpeg`
///
/// # Examples
///
/// ```
/// use ruleform_validators::file::expand_extensions;
///
/// let allowed = expand_extensions(&["JPG".to_string()]);
/// assert!(allowed.contains(&"jpeg".to_string()));
/// ```
pub fn expand_extensions(allowed: &[String]) -> Vec<String> {
	let mut expanded: Vec<String> = Vec::new();
	for ext in allowed.iter().map(|e| e.trim_start_matches('.').to_lowercase()) {
		let group = EXTENSION_SIBLINGS
			.iter()
			.find(|group| group.contains(&ext.as_str()));
		match group {
			Some(group) => expanded.extend(group.iter().map(|e| (*e).to_string())),
			None => expanded.push(ext),
		}
	}
	expanded.sort();
	expanded.dedup();
	expanded
}

pub struct Extension;

impl RuleValidator for Extension {
	fn modifiers(&self) -> &'static [Modifier] {
		&[Modifier::Strict]
	}

	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		if token.values.is_empty() {
			return Err(Failure::missing_value("Extension"));
		}
		let file = require_file(&subject, ids::EXTENSION, "Extension")?;
		let allowed = if token.has_modifier(&Modifier::Strict) {
			token
				.values
				.iter()
				.map(|e| e.trim_start_matches('.').to_lowercase())
				.collect()
		} else {
			expand_extensions(&token.values)
		};

		match file.extension() {
			Some(ext) if allowed.contains(&ext) => Ok(Outcome::Accepted),
			_ => Err(Failure::data(
				ids::EXTENSION,
				format!("File extension must be one of: {}", token.values.join(", ")),
			)),
		}
	}
}

/// Content-derived MIME type from leading bytes
///
/// # Examples
///
/// ```
/// use ruleform_validators::file::sniff_mime;
///
/// assert_eq!(sniff_mime(b"%PDF-1.7"), "application/pdf");
/// assert_eq!(sniff_mime(b"hello"), "text/plain");
/// assert_eq!(sniff_mime(&[0x00, 0xFF, 0x10]), "application/octet-stream");
/// ```
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
	let starts = |magic: &[u8]| bytes.starts_with(magic);
	let riff = |kind: &[u8]| bytes.len() >= 12 && starts(b"RIFF") && &bytes[8..12] == kind;

	if starts(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
		"image/png"
	} else if starts(&[0xFF, 0xD8, 0xFF]) {
		"image/jpeg"
	} else if starts(b"GIF87a") || starts(b"GIF89a") {
		"image/gif"
	} else if riff(b"WEBP") {
		"image/webp"
	} else if starts(b"BM") && bytes.len() >= 14 {
		"image/bmp"
	} else if starts(&[0x00, 0x00, 0x01, 0x00]) {
		"image/x-icon"
	} else if starts(b"II*\0") || starts(b"MM\0*") {
		"image/tiff"
	} else if starts(b"%PDF-") {
		"application/pdf"
	} else if starts(&[0x50, 0x4B, 0x03, 0x04]) || starts(&[0x50, 0x4B, 0x05, 0x06]) {
		"application/zip"
	} else if starts(&[0x1F, 0x8B]) {
		"application/gzip"
	} else if starts(&[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C]) {
		"application/x-7z-compressed"
	} else if starts(b"Rar!\x1A\x07") {
		"application/vnd.rar"
	} else if riff(b"WAVE") {
		"audio/wav"
	} else if riff(b"AVI ") {
		"video/x-msvideo"
	} else if starts(b"ID3") || starts(&[0xFF, 0xFB]) || starts(&[0xFF, 0xF3]) {
		"audio/mpeg"
	} else if starts(b"OggS") {
		"audio/ogg"
	} else if starts(b"fLaC") {
		"audio/flac"
	} else if bytes.len() >= 8 && &bytes[4..8] == b"ftyp" {
		"video/mp4"
	} else if starts(&[0x1A, 0x45, 0xDF, 0xA3]) {
		"video/webm"
	} else {
		sniff_text(bytes)
	}
}

fn sniff_text(bytes: &[u8]) -> &'static str {
	if bytes.contains(&0) {
		return "application/octet-stream";
	}
	// A multi-byte sequence may be cut at the sniff boundary
	let text = match std::str::from_utf8(bytes) {
		Ok(text) => text,
		Err(e) if e.error_len().is_none() => {
			std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default()
		}
		Err(_) => return "application/octet-stream",
	};
	let head = text.trim_start().to_ascii_lowercase();
	if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
		"image/svg+xml"
	} else if head.starts_with("<!doctype html") || head.starts_with("<html") {
		"text/html"
	} else if head.starts_with("<?xml") {
		"application/xml"
	} else {
		"text/plain"
	}
}

/// Read the sniffing prefix of a file
pub fn read_prefix(path: &Path) -> std::io::Result<Vec<u8>> {
	let mut buffer = Vec::with_capacity(SNIFF_LEN as usize);
	std::fs::File::open(path)?
		.take(SNIFF_LEN)
		.read_to_end(&mut buffer)?;
	Ok(buffer)
}

/// Match a MIME type against an allow-list entry, `type/*` included
pub fn mime_matches(detected: &str, allowed: &str) -> bool {
	let allowed = allowed.trim().to_ascii_lowercase();
	match allowed.strip_suffix("/*") {
		Some(family) => detected.split('/').next() == Some(family),
		None => detected == allowed,
	}
}

pub struct Mime;

impl RuleValidator for Mime {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		if token.values.is_empty() {
			return Err(Failure::missing_value("Mime"));
		}
		let file = require_file(&subject, ids::MIME, "Mime")?;
		let prefix = read_prefix(&file.tmp_path).map_err(|e| {
			tracing::warn!(path = %file.tmp_path.display(), error = %e, "cannot read upload");
			Failure::data(ids::MIME, format!("Cannot read '{}'", file.name))
		})?;

		let detected = sniff_mime(&prefix);
		if token.values.iter().any(|allowed| mime_matches(detected, allowed)) {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::MIME,
				format!(
					"File type {detected} is not allowed, expected one of: {}",
					token.values.join(", ")
				),
			))
		}
	}
}

/// Parse a human size (`2MB`, `500 KB`, `1,5 GB`) into bytes; a bare
/// number means megabytes
///
/// # Examples
///
/// ```
/// use ruleform_validators::file::parse_size;
///
/// assert_eq!(parse_size("500 KB").unwrap(), 512_000);
/// assert_eq!(parse_size("2").unwrap(), 2 * 1024 * 1024);
/// assert!(parse_size("big").is_err());
/// ```
#[track_caller]
pub fn parse_size(raw: &str) -> CheckResult<u64> {
	let malformed = || Failure::grammar(ids::MALFORMED_SIZE, format!("Malformed size '{raw}'"));
	let captures = SIZE_REGEX.captures(raw).ok_or_else(malformed)?;
	let amount: f64 = captures[1].replace(',', ".").parse().map_err(|_| malformed())?;
	let exponent = match captures
		.get(2)
		.map(|unit| unit.as_str().to_ascii_uppercase())
		.as_deref()
	{
		Some("B") => 0,
		Some("KB") => 1,
		None | Some("MB") => 2,
		Some("GB") => 3,
		Some("TB") => 4,
		Some(_) => return Err(malformed()),
	};
	Ok((amount * 1024f64.powi(exponent)).round() as u64)
}

pub struct Size;

impl RuleValidator for Size {
	fn check(
		&self,
		subject: Subject<'_>,
		token: &RuleToken,
		_ctx: &mut ValidationContext<'_>,
	) -> CheckResult<Outcome> {
		let raw = token.joined_value()?;
		let limit = parse_size(&raw)?;
		let file = require_file(&subject, ids::SIZE, "Size")?;
		if file.size <= limit {
			Ok(Outcome::Accepted)
		} else {
			Err(Failure::data(
				ids::SIZE,
				format!("File must not be larger than {}", raw.trim()),
			))
		}
	}
}
