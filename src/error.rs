use burn::record::RecorderError;
use thiserror::Error;

/// Failure taxonomy. Everything except [`RecognizerError::InvalidImage`] is a
/// configuration error: fatal at startup, never retried. An invalid image
/// aborts one interaction and the process keeps serving the next one.
#[derive(Debug, Error)]
pub enum RecognizerError {
	#[error("label sources misaligned: {classes} class identifiers vs {labels} labels")]
	LabelMismatch { classes: usize, labels: usize },
	#[error("empty entry at line {line} of {file}")]
	EmptyLabelLine { file: String, line: usize },
	#[error("duplicate entry {entry:?} in {file}")]
	DuplicateLabel { file: String, entry: String },
	#[error("classifier head emits {model} classes but the registry defines {registry}")]
	ClassCountMismatch { model: usize, registry: usize },
	#[error("could not decode image to RGB: {0}")]
	InvalidImage(#[from] image::ImageError),
	#[error("weights artifact error: {0}")]
	Record(#[from] RecorderError),
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl RecognizerError {
	/// True for the one per-request error; callers may resubmit.
	/// Everything else aborts startup.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, RecognizerError::InvalidImage(_))
	}
}
