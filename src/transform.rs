use crate::error::RecognizerError;
use burn::prelude::{Backend, Config, Device};
use burn::tensor::{Tensor, TensorData};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView};

/// Preprocessing constants pinned explicitly rather than inherited from a
/// library default, so the pipeline stays reproducible across versions.
/// The defaults are the EfficientNet-B0 training-time values: shorter side
/// resized to 256 (bilinear), center-cropped to 224, ImageNet mean/std.
#[derive(Config, Debug)]
pub struct TransformConfig {
	#[config(default = 256)]
	pub resize: u32,
	#[config(default = 224)]
	pub crop: u32,
	#[config(default = "[0.485, 0.456, 0.406]")]
	pub mean: [f32; 3],
	#[config(default = "[0.229, 0.224, 0.225]")]
	pub std: [f32; 3],
}

impl TransformConfig {
	pub fn init(&self) -> ImageTransform {
		ImageTransform {
			config: self.clone(),
		}
	}
}

/// Normalizes channel-first image tensors with fixed per-channel statistics.
pub struct Normalizer<B: Backend> {
	pub mean: Tensor<B, 3>,
	pub std: Tensor<B, 3>,
}

impl<B: Backend> Normalizer<B> {
	pub fn new(mean: [f32; 3], std: [f32; 3], device: &Device<B>) -> Self {
		Self {
			mean: Tensor::<B, 1>::from_floats(mean, device).reshape([3, 1, 1]),
			std: Tensor::<B, 1>::from_floats(std, device).reshape([3, 1, 1]),
		}
	}

	pub fn normalize(&self, input: Tensor<B, 3>) -> Tensor<B, 3> {
		(input - self.mean.clone()) / self.std.clone()
	}
}

/// Deterministic, side-effect-free image-to-tensor transform.
///
/// Identical input bytes always produce the identical tensor: decode to RGB,
/// resize the shorter side, center-crop, scale to `[0, 1]` and normalize.
#[derive(Debug, Clone)]
pub struct ImageTransform {
	config: TransformConfig,
}

impl ImageTransform {
	/// Decode raw upload bytes. A corrupt or unsupported file surfaces as
	/// [`RecognizerError::InvalidImage`] before any tensor work happens.
	pub fn decode(bytes: &[u8]) -> Result<DynamicImage, RecognizerError> {
		Ok(image::load_from_memory(bytes)?)
	}

	pub fn apply<B: Backend>(&self, image: &DynamicImage, device: &Device<B>) -> Tensor<B, 3> {
		let crop = self.config.crop;

		let (width, height) = image.dimensions();
		let (new_width, new_height) = self.resize_dims(width, height);
		let resized = image
			.resize_exact(new_width, new_height, FilterType::Triangle)
			.to_rgb8();

		let x = (new_width - crop) / 2;
		let y = (new_height - crop) / 2;
		let cropped = imageops::crop_imm(&resized, x, y, crop, crop).to_image();

		let side = crop as usize;
		let data = TensorData::new(
			cropped
				.into_raw()
				.into_iter()
				.map(|p| (p as f32) / 255.0)
				.collect::<Vec<_>>(),
			[side, side, 3],
		);
		// [H, W, C] -> [C, H, W]
		let tensor = Tensor::<B, 3>::from_data(data.convert::<B::FloatElem>(), device).permute([2, 0, 1]);

		Normalizer::new(self.config.mean, self.config.std, device).normalize(tensor)
	}

	/// Scale so the shorter side matches the configured resize target, never
	/// below the crop size.
	fn resize_dims(&self, width: u32, height: u32) -> (u32, u32) {
		let target = self.config.resize.max(self.config.crop);
		let scale = target as f64 / width.min(height) as f64;
		let scaled = |side: u32| ((side as f64 * scale).round() as u32).max(target);
		if width <= height {
			(target, scaled(height))
		} else {
			(scaled(width), target)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::RgbImage;

	type TestBackend = burn::backend::NdArray;

	fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
		DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
	}

	#[test]
	fn output_shape_is_fixed() {
		let transform = TransformConfig::new().init();
		let device = Default::default();
		for (w, h) in [(640, 480), (480, 640), (100, 100), (224, 224)] {
			let tensor = transform.apply::<TestBackend>(&solid_image(w, h, [10, 20, 30]), &device);
			assert_eq!(tensor.dims(), [3, 224, 224]);
		}
	}

	#[test]
	fn applies_declared_normalization() {
		let transform = TransformConfig::new().init();
		let device = Default::default();
		let tensor = transform.apply::<TestBackend>(&solid_image(300, 300, [128, 0, 255]), &device);

		let data = tensor.into_data();
		let values = data.as_slice::<f32>().unwrap();
		let expected_r = (128.0 / 255.0 - 0.485) / 0.229;
		let expected_g = (0.0 - 0.456) / 0.224;
		let expected_b = (1.0 - 0.406) / 0.225;
		assert!((values[0] - expected_r).abs() < 1e-5);
		assert!((values[224 * 224] - expected_g).abs() < 1e-5);
		assert!((values[2 * 224 * 224] - expected_b).abs() < 1e-5);
	}

	#[test]
	fn is_deterministic() {
		let transform = TransformConfig::new().init();
		let device = Default::default();
		let image = solid_image(500, 300, [7, 77, 177]);
		let a = transform.apply::<TestBackend>(&image, &device).into_data();
		let b = transform.apply::<TestBackend>(&image, &device).into_data();
		assert_eq!(a, b);
	}

	#[test]
	fn rejects_undecodable_bytes() {
		let err = ImageTransform::decode(b"definitely not an image").unwrap_err();
		assert!(err.is_recoverable());
		assert!(matches!(err, RecognizerError::InvalidImage(_)));
	}
}
