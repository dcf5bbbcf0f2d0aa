pub mod block;
pub mod config;
pub mod effnet;
pub mod error;
pub mod feedback;
pub mod infer;
pub mod labels;
pub mod transform;
pub mod weights;

pub use effnet::EfficientNet;
pub use error::RecognizerError;
pub use feedback::{record_feedback, Acknowledgment, FeedbackEntry};
pub use infer::{Prediction, Recognizer};
pub use labels::LabelRegistry;
pub use transform::{ImageTransform, TransformConfig};
