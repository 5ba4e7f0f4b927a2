//! Value model shared by the validators and the structural walker
//!
//! Input trees are built once at ingestion time: every mapping is classified
//! as either an uploaded file ([`FileValue`]) or ordinary nested data
//! ([`FormValue::Map`]), so nothing downstream has to re-sniff shapes.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::PathBuf;

/// Marks a field that was absent from the input but whose rules demand it
/// be considered (Required/Null/NotNull). Also stored as the value of a
/// field whose validators short-circuited on an empty input.
pub const INTERNAL_EMPTY: &str = "__RULEFORM_INTERNAL_EMPTY__";

/// Marks a field forced non-null by `NotNull`; rewritten to an empty string
/// by the sanitizer instead of being dropped.
pub const NOTNULL_REPLACE_VALUE: &str = "__RULEFORM_NOTNULL_VALUE__";

/// Stands in for an array value that is validated as a whole. The real
/// entries sit in the validation context's array stash.
pub const ARRAY_REPLACE_VALUE: &str = "__RULEFORM_ARRAY_VALUE__";

/// Stands in for a regex pattern pulled out of a rule string. Suffixed with
/// the stash index, e.g. `__RULEFORM_REGEX_VALUE_0__`.
pub const REGEX_REPLACE_VALUE: &str = "__RULEFORM_REGEX_VALUE_";

/// Literal placeholder some clients submit for "no value".
pub const EMPTY_PLACEHOLDER: &str = "[empty]";

/// Key set of an uploaded file record.
const FILE_KEYS: [&str; 5] = ["name", "type", "tmp_name", "error", "size"];

/// Optional extra key sent by newer multipart parsers.
const FILE_OPTIONAL_KEY: &str = "full_path";

/// Upload error codes of a multipart upload record.
pub mod upload_error {
	pub const OK: i64 = 0;
	pub const INI_SIZE: i64 = 1;
	pub const FORM_SIZE: i64 = 2;
	pub const PARTIAL: i64 = 3;
	pub const NO_FILE: i64 = 4;
	pub const NO_TMP_DIR: i64 = 6;
	pub const CANT_WRITE: i64 = 7;
	pub const EXTENSION: i64 = 8;
}

/// One uploaded file as described by the multipart layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValue {
	/// Client-supplied file name
	pub name: String,
	/// Client-supplied MIME type; never trusted for validation
	pub mime_hint: String,
	/// Location of the uploaded bytes on the server
	pub tmp_path: PathBuf,
	/// Upload error code, see [`upload_error`]
	pub error: i64,
	/// Size in bytes
	pub size: u64,
}

impl FileValue {
	/// Create a successfully uploaded file record
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_validators::FileValue;
	///
	/// let file = FileValue::new("cv.pdf", "application/pdf", "/tmp/php123", 2048);
	/// assert_eq!(file.extension().as_deref(), Some("pdf"));
	/// assert!(!file.is_missing());
	/// ```
	pub fn new(
		name: impl Into<String>,
		mime_hint: impl Into<String>,
		tmp_path: impl Into<PathBuf>,
		size: u64,
	) -> Self {
		Self {
			name: name.into(),
			mime_hint: mime_hint.into(),
			tmp_path: tmp_path.into(),
			error: upload_error::OK,
			size,
		}
	}

	/// Set the upload error code
	pub fn with_error(mut self, error: i64) -> Self {
		self.error = error;
		self
	}

	/// Recognize a file record by its exact key set.
	///
	/// Returns `None` for any other mapping, including mappings that carry
	/// the file keys plus unrelated data.
	pub fn recognize(object: &serde_json::Map<String, serde_json::Value>) -> Option<Self> {
		let has_optional = object.contains_key(FILE_OPTIONAL_KEY);
		let expected = FILE_KEYS.len() + usize::from(has_optional);
		if object.len() != expected || !FILE_KEYS.iter().all(|k| object.contains_key(*k)) {
			return None;
		}

		let text = |key: &str| match object.get(key) {
			Some(serde_json::Value::String(s)) => Some(s.clone()),
			Some(serde_json::Value::Null) => Some(String::new()),
			Some(other) if !other.is_object() && !other.is_array() => Some(other.to_string()),
			_ => None,
		};
		let integer = |key: &str| match object.get(key) {
			Some(serde_json::Value::Number(n)) => n.as_i64(),
			Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
			_ => None,
		};

		Some(Self {
			name: text("name")?,
			mime_hint: text("type")?,
			tmp_path: PathBuf::from(text("tmp_name")?),
			error: integer("error")?,
			size: u64::try_from(integer("size")?).ok()?,
		})
	}

	/// Lowercased extension of the client file name, if any
	pub fn extension(&self) -> Option<String> {
		let (_, ext) = self.name.rsplit_once('.')?;
		if ext.is_empty() {
			return None;
		}
		Some(ext.to_lowercase())
	}

	/// Whether the record describes "no file was uploaded"
	pub fn is_missing(&self) -> bool {
		self.error == upload_error::NO_FILE
	}
}

/// A node of an input or output tree
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
	DateTime(NaiveDateTime),
	File(FileValue),
	Map(IndexMap<String, FormValue>),
}

impl FormValue {
	/// Shorthand for a text leaf
	pub fn text(value: impl Into<String>) -> Self {
		Self::Text(value.into())
	}

	/// Text leaf holding [`INTERNAL_EMPTY`]
	pub fn internal_empty() -> Self {
		Self::Text(INTERNAL_EMPTY.to_string())
	}

	/// Build a map from key/value pairs, keeping their order
	///
	/// # Examples
	///
	/// ```
	/// use ruleform_validators::FormValue;
	///
	/// let tree = FormValue::map([("name", FormValue::text("Ada"))]);
	/// assert_eq!(tree.get("name").and_then(FormValue::as_text), Some("Ada"));
	/// ```
	pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, FormValue)>) -> Self {
		Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}

	/// Build a list-shaped map keyed `"0"`, `"1"`, ...
	pub fn list(items: impl IntoIterator<Item = FormValue>) -> Self {
		Self::Map(
			items
				.into_iter()
				.enumerate()
				.map(|(i, v)| (i.to_string(), v))
				.collect(),
		)
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_map(&self) -> Option<&IndexMap<String, FormValue>> {
		match self {
			Self::Map(m) => Some(m),
			_ => None,
		}
	}

	pub fn as_file(&self) -> Option<&FileValue> {
		match self {
			Self::File(f) => Some(f),
			_ => None,
		}
	}

	/// Look up a direct child of a map node
	pub fn get(&self, key: &str) -> Option<&FormValue> {
		self.as_map().and_then(|m| m.get(key))
	}

	/// Whether this leaf counts as "nothing submitted": blank text, the
	/// internal-empty sentinel or the `[empty]` placeholder.
	pub fn is_blank(&self) -> bool {
		match self {
			Self::Text(s) => is_blank_text(s),
			_ => false,
		}
	}

	/// Render a scalar the way the input normalizer would
	pub fn to_scalar_string(&self) -> Option<String> {
		match self {
			Self::Null => Some("null".to_string()),
			Self::Bool(b) => Some(b.to_string()),
			Self::Int(i) => Some(i.to_string()),
			Self::Float(f) => Some(f.to_string()),
			Self::Text(s) => Some(s.clone()),
			Self::DateTime(dt) => Some(dt.format(DATETIME_RENDER_FORMAT).to_string()),
			Self::File(_) | Self::Map(_) => None,
		}
	}
}

/// Format used when a date-time leaf is rendered as text
pub const DATETIME_RENDER_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Nothing was submitted: the empty string or the empty sentinel
///
/// Only this short-circuits validators; whitespace is still checked.
pub fn is_unset_text(value: &str) -> bool {
	value.is_empty() || value == INTERNAL_EMPTY
}

/// Blank test shared by `Required` and the sanitizer
pub fn is_blank_text(value: &str) -> bool {
	value.trim().is_empty() || value == INTERNAL_EMPTY || value == EMPTY_PLACEHOLDER
}

impl From<&str> for FormValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for FormValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<FileValue> for FormValue {
	fn from(value: FileValue) -> Self {
		Self::File(value)
	}
}

impl Serialize for FileValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(FILE_KEYS.len()))?;
		map.serialize_entry("name", &self.name)?;
		map.serialize_entry("type", &self.mime_hint)?;
		map.serialize_entry("tmp_name", &self.tmp_path.to_string_lossy())?;
		map.serialize_entry("error", &self.error)?;
		map.serialize_entry("size", &self.size)?;
		map.end()
	}
}

impl Serialize for FormValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Self::Null => serializer.serialize_unit(),
			Self::Bool(b) => serializer.serialize_bool(*b),
			Self::Int(i) => serializer.serialize_i64(*i),
			Self::Float(f) => serializer.serialize_f64(*f),
			Self::Text(s) => serializer.serialize_str(s),
			Self::DateTime(dt) => {
				serializer.serialize_str(&dt.format(DATETIME_RENDER_FORMAT).to_string())
			}
			Self::File(file) => file.serialize(serializer),
			Self::Map(entries) => {
				let mut map = serializer.serialize_map(Some(entries.len()))?;
				for (key, value) in entries {
					map.serialize_entry(key, value)?;
				}
				map.end()
			}
		}
	}
}
