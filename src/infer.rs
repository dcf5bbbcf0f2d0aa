use crate::effnet::EfficientNet;
use crate::error::RecognizerError;
use crate::labels::LabelRegistry;
use crate::transform::ImageTransform;
use burn::prelude::{Backend, Device};
use burn::tensor::activation::softmax;
use burn::tensor::ElementConversion;
use image::DynamicImage;
use log::info;

/// The top-1 answer for one image. Created per inference call, immutable,
/// not persisted anywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
	pub index: usize,
	pub class_id: String,
	pub label: String,
	pub confidence: f32,
}

/// Everything one inference call needs: the loaded model, the preprocessing
/// transform, the label registry and the device. Built once by an explicit
/// construction step and immutable afterwards; `predict` takes `&self` and
/// mutates nothing, so calls are independent by construction.
#[derive(Debug)]
pub struct Recognizer<B: Backend> {
	model: EfficientNet<B>,
	transform: ImageTransform,
	registry: LabelRegistry,
	device: Device<B>,
}

impl<B: Backend> Recognizer<B> {
	/// Ties the pieces together, rejecting a head whose width disagrees with
	/// the registry before any image is accepted.
	pub fn new(
		model: EfficientNet<B>,
		transform: ImageTransform,
		registry: LabelRegistry,
		device: Device<B>,
	) -> Result<Self, RecognizerError> {
		if model.num_classes() != registry.len() {
			return Err(RecognizerError::ClassCountMismatch {
				model: model.num_classes(),
				registry: registry.len(),
			});
		}

		info!("recognizer ready: {} classes", registry.len());
		Ok(Self {
			model,
			transform,
			registry,
			device,
		})
	}

	pub fn registry(&self) -> &LabelRegistry {
		&self.registry
	}

	/// Decode raw upload bytes and predict. Undecodable bytes fail before
	/// the classifier is ever invoked.
	pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction, RecognizerError> {
		let image = ImageTransform::decode(bytes)?;
		self.predict(&image)
	}

	/// Preprocess, run a single-item batch through the classifier, softmax
	/// the logits and resolve the argmax (ties go to the lowest index) to a
	/// label. A pure function of (loaded model, input image).
	pub fn predict(&self, image: &DynamicImage) -> Result<Prediction, RecognizerError> {
		let input = self.transform.apply::<B>(image, &self.device).unsqueeze::<4>();

		let logits = self.model.forward(input);
		let probabilities = softmax(logits, 1);
		let (score, index) = probabilities.max_dim_with_indices(1);

		let index = index.into_scalar().elem::<i64>() as usize;
		let confidence = score.into_scalar().elem::<f32>();
		// the head width was validated against the registry at construction
		let class = self
			.registry
			.class(index)
			.unwrap_or_else(|| panic!("class index {index} outside validated registry"));

		let prediction = Prediction {
			index,
			class_id: class.id.clone(),
			label: class.label.clone(),
			confidence,
		};
		info!(
			"predicted class = {} ({:.1}%)",
			prediction.class_id,
			prediction.confidence * 100.0
		);
		Ok(prediction)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transform::TransformConfig;
	use burn::tensor::{Tensor, TensorData};
	use image::RgbImage;

	type TestBackend = burn::backend::NdArray;

	fn recognizer(num_classes: usize) -> Recognizer<TestBackend> {
		let device = Default::default();
		let ids: String = (0..num_classes).map(|i| format!("class_{i}\n")).collect();
		let labels: String = (0..num_classes).map(|i| format!("Class {i}\n")).collect();

		Recognizer::new(
			EfficientNet::b0(num_classes, &device),
			TransformConfig::new().init(),
			LabelRegistry::from_sources(&ids, &labels).unwrap(),
			device,
		)
		.unwrap()
	}

	fn test_image() -> DynamicImage {
		DynamicImage::ImageRgb8(RgbImage::from_fn(320, 240, |x, y| {
			image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
		}))
	}

	#[test]
	fn predicts_a_registered_class() {
		let recognizer = recognizer(3);
		let prediction = recognizer.predict(&test_image()).unwrap();

		assert!(prediction.index < 3);
		assert_eq!(prediction.class_id, format!("class_{}", prediction.index));
		assert_eq!(prediction.label, format!("Class {}", prediction.index));
		assert!(prediction.confidence >= 0.0 && prediction.confidence <= 1.0);
	}

	#[test]
	fn prediction_is_deterministic() {
		let recognizer = recognizer(3);
		let image = test_image();

		let first = recognizer.predict(&image).unwrap();
		let second = recognizer.predict(&image).unwrap();
		assert_eq!(first, second);
	}

	#[test]
	fn probabilities_sum_to_one() {
		let device = Default::default();
		let logits = Tensor::<TestBackend, 2>::from_data(
			TensorData::from([[3.0_f32, -1.0, 0.5, 2.0, -4.0]]),
			&device,
		);

		let total = softmax(logits, 1).sum().into_scalar();
		assert!((total - 1.0).abs() < 1e-6);
	}

	#[test]
	fn argmax_ties_break_to_lowest_index() {
		let device = Default::default();
		let probabilities = Tensor::<TestBackend, 2>::from_data(
			TensorData::from([[0.2_f32, 0.4, 0.4]]),
			&device,
		);

		let (_, index) = probabilities.max_dim_with_indices(1);
		assert_eq!(index.into_scalar(), 1);
	}

	#[test]
	fn rejects_head_registry_width_mismatch() {
		let device: <TestBackend as Backend>::Device = Default::default();
		let err = Recognizer::new(
			EfficientNet::<TestBackend>::b0(3, &device),
			TransformConfig::new().init(),
			LabelRegistry::from_sources("a\nb\nc\nd\n", "A\nB\nC\nD\n").unwrap(),
			device,
		)
		.unwrap_err();

		assert!(matches!(
			err,
			RecognizerError::ClassCountMismatch { model: 3, registry: 4 }
		));
	}

	#[test]
	fn undecodable_bytes_fail_before_inference() {
		let recognizer = recognizer(3);
		let err = recognizer.predict_bytes(b"not an image at all").unwrap_err();
		assert!(matches!(err, RecognizerError::InvalidImage(_)));
	}
}
