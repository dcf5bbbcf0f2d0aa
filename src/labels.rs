use crate::error::RecognizerError;
use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

/// One class of the taxonomy: the position in the classifier's output vector,
/// the canonical identifier (e.g. `apple_pie`) and the human-readable label
/// (e.g. `Apple Pie`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabel {
	pub index: usize,
	pub id: String,
	pub label: String,
}

/// Bidirectional lookup between class indices, identifiers and labels.
///
/// Built from two line-oriented text sources that are positionally aligned by
/// class index. Construction validates what the lookups later rely on: both
/// sources have the same length, no line is empty after trimming, and no
/// identifier or label repeats. Whitespace (including the trailing newline
/// every line-based source carries) is stripped from every entry.
#[derive(Debug, Clone)]
pub struct LabelRegistry {
	classes: Vec<ClassLabel>,
	id_to_index: HashMap<String, usize>,
	label_to_index: HashMap<String, usize>,
}

impl LabelRegistry {
	pub fn from_files<A: AsRef<Path>>(classes_path: A, labels_path: A) -> Result<Self, RecognizerError> {
		let ids = read_to_string(classes_path)?;
		let labels = read_to_string(labels_path)?;
		Self::from_sources(&ids, &labels)
	}

	pub fn from_sources(ids: &str, labels: &str) -> Result<Self, RecognizerError> {
		let ids = parse_lines(ids, "classes")?;
		let labels = parse_lines(labels, "labels")?;

		if ids.len() != labels.len() {
			return Err(RecognizerError::LabelMismatch {
				classes: ids.len(),
				labels: labels.len(),
			});
		}

		let mut classes = Vec::with_capacity(ids.len());
		let mut id_to_index = HashMap::with_capacity(ids.len());
		let mut label_to_index = HashMap::with_capacity(ids.len());

		for (index, (id, label)) in ids.into_iter().zip(labels).enumerate() {
			if id_to_index.insert(id.clone(), index).is_some() {
				return Err(RecognizerError::DuplicateLabel {
					file: "classes".to_string(),
					entry: id,
				});
			}
			if label_to_index.insert(label.clone(), index).is_some() {
				return Err(RecognizerError::DuplicateLabel {
					file: "labels".to_string(),
					entry: label,
				});
			}
			classes.push(ClassLabel { index, id, label });
		}

		Ok(Self {
			classes,
			id_to_index,
			label_to_index,
		})
	}

	pub fn len(&self) -> usize {
		self.classes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}

	/// The class at an output-vector position. Indices are exactly `[0, len)`.
	pub fn class(&self, index: usize) -> Option<&ClassLabel> {
		self.classes.get(index)
	}

	pub fn identifier(&self, index: usize) -> Option<&str> {
		self.class(index).map(|c| c.id.as_str())
	}

	pub fn label(&self, index: usize) -> Option<&str> {
		self.class(index).map(|c| c.label.as_str())
	}

	pub fn label_for_id(&self, id: &str) -> Option<&str> {
		self.id_to_index.get(id).map(|&i| self.classes[i].label.as_str())
	}

	pub fn id_for_label(&self, label: &str) -> Option<&str> {
		self.label_to_index.get(label).map(|&i| self.classes[i].id.as_str())
	}
}

fn parse_lines(text: &str, file: &str) -> Result<Vec<String>, RecognizerError> {
	let mut entries = Vec::new();
	for (i, line) in text.lines().enumerate() {
		let entry = line.trim();
		if entry.is_empty() {
			return Err(RecognizerError::EmptyLabelLine {
				file: file.to_string(),
				line: i + 1,
			});
		}
		entries.push(entry.to_string());
	}
	Ok(entries)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mappings_are_mutual_inverses() {
		let registry =
			LabelRegistry::from_sources("apple_pie\npizza\nsushi\n", "Apple Pie\nPizza\nSushi\n").unwrap();

		assert_eq!(registry.len(), 3);
		for index in 0..registry.len() {
			let id = registry.identifier(index).unwrap();
			let label = registry.label(index).unwrap();
			// index -> id -> label matches index -> label directly
			assert_eq!(registry.label_for_id(id), Some(label));
			assert_eq!(registry.id_for_label(label), Some(id));
		}
	}

	#[test]
	fn strips_line_endings_and_whitespace() {
		let ids: String = (0..101).map(|i| format!("class_{i}\n")).collect();
		let labels: String = (0..101)
			.map(|i| if i == 42 { "pizza\n".to_string() } else { format!("label {i}\n") })
			.collect();

		let registry = LabelRegistry::from_sources(&ids, &labels).unwrap();
		assert_eq!(registry.len(), 101);
		assert_eq!(registry.label(42), Some("pizza"));
		assert_eq!(registry.id_for_label("pizza"), Some("class_42"));
	}

	#[test]
	fn rejects_misaligned_sources() {
		let err = LabelRegistry::from_sources("a\nb\nc\n", "A\nB\n").unwrap_err();
		assert!(matches!(
			err,
			RecognizerError::LabelMismatch { classes: 3, labels: 2 }
		));
	}

	#[test]
	fn rejects_empty_lines() {
		let err = LabelRegistry::from_sources("a\n\nc\n", "A\nB\nC\n").unwrap_err();
		assert!(matches!(err, RecognizerError::EmptyLabelLine { line: 2, .. }));
	}

	#[test]
	fn rejects_duplicates() {
		let err = LabelRegistry::from_sources("a\na\n", "A\nB\n").unwrap_err();
		assert!(matches!(err, RecognizerError::DuplicateLabel { .. }));
	}

	#[test]
	fn out_of_range_index_is_none() {
		let registry = LabelRegistry::from_sources("a\n", "A\n").unwrap();
		assert!(registry.class(1).is_none());
	}
}
