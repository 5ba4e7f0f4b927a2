//! Call-scoped validation state

use crate::collaborators::Collaborators;

/// State shared by the validators during one `validate()` call
///
/// Holds the collaborator set, the developer-mode flag and the array stash
/// used when an array field is checked as a whole. A context is never
/// shared between calls.
#[derive(Debug)]
pub struct ValidationContext<'c> {
	collaborators: &'c Collaborators,
	dev_mode: bool,
	tel_regions: Vec<String>,
	stashed_array: Option<Vec<String>>,
}

impl<'c> ValidationContext<'c> {
	pub fn new(collaborators: &'c Collaborators) -> Self {
		Self {
			collaborators,
			dev_mode: false,
			tel_regions: Vec::new(),
			stashed_array: None,
		}
	}

	pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
		self.dev_mode = dev_mode;
		self
	}

	/// Telephone regions tried before the configuration provider is asked
	pub fn with_tel_regions(mut self, regions: Vec<String>) -> Self {
		self.tel_regions = regions;
		self
	}

	pub fn collaborators(&self) -> &Collaborators {
		self.collaborators
	}

	pub fn dev_mode(&self) -> bool {
		self.dev_mode
	}

	pub fn tel_regions(&self) -> &[String] {
		&self.tel_regions
	}

	/// Stash the entries of an array validated as one value
	pub fn stash_array(&mut self, entries: Vec<String>) {
		self.stashed_array = Some(entries);
	}

	pub fn stashed_array(&self) -> Option<&[String]> {
		self.stashed_array.as_deref()
	}

	pub fn take_stashed_array(&mut self) -> Option<Vec<String>> {
		self.stashed_array.take()
	}
}
