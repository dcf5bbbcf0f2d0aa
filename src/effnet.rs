use crate::block::{ConvBnSilu, Stage};
use crate::config::{EfficientNetConfig, FEATURE_DIM};
use crate::error::RecognizerError;
use crate::weights::{EfficientNetB0, Weights, WeightsMeta};
use burn::module::Module;
use burn::nn::pool::AdaptiveAvgPool2d;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::prelude::{Backend, Device};
use burn::record::{FullPrecisionSettings, Recorder, RecorderError};
use burn::tensor::Tensor;
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use std::path::Path;

/// EfficientNet-B0: a frozen feature-extraction backbone (stem through the
/// 1x1 head convolution) and a small classification head (dropout + linear).
/// Loaded once at startup and immutable for the process lifetime; `forward`
/// is read-only, so concurrent calls cannot interfere through model state.
#[derive(Debug, Module)]
pub struct EfficientNet<B: Backend> {
	pub(crate) stem: ConvBnSilu<B>,
	pub(crate) stage1: Stage<B>,
	pub(crate) stage2: Stage<B>,
	pub(crate) stage3: Stage<B>,
	pub(crate) stage4: Stage<B>,
	pub(crate) stage5: Stage<B>,
	pub(crate) stage6: Stage<B>,
	pub(crate) stage7: Stage<B>,
	pub(crate) head: ConvBnSilu<B>,
	pub(crate) avgpool: AdaptiveAvgPool2d,
	pub(crate) dropout: Dropout,
	pub(crate) fc: Linear<B>,
}

impl<B: Backend> EfficientNet<B> {
	/// Map a preprocessed image batch to raw per-class logits.
	/// Input `[batch, 3, H, W]`, output `[batch, num_classes]`.
	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
		let x = self.stem.forward(input);

		let x = self.stage1.forward(x);
		let x = self.stage2.forward(x);
		let x = self.stage3.forward(x);
		let x = self.stage4.forward(x);
		let x = self.stage5.forward(x);
		let x = self.stage6.forward(x);
		let x = self.stage7.forward(x);

		let x = self.head.forward(x);
		let x = self.avgpool.forward(x);
		let x = x.flatten(1, 3);

		self.fc.forward(self.dropout.forward(x))
	}

	/// Width of the classification head, i.e. the number of classes the
	/// logit vector covers.
	pub fn num_classes(&self) -> usize {
		self.fc.weight.val().dims()[1]
	}

	pub fn b0(num_classes: usize, device: &Device<B>) -> Self {
		EfficientNetConfig::b0(num_classes).init(device)
	}

	/// The construction path used for fine-tuning: download the ImageNet
	/// checkpoint, freeze every backbone parameter, then swap in a fresh
	/// head sized for the target taxonomy.
	pub fn b0_pretrained(
		weights: EfficientNetB0,
		num_classes: usize,
		device: &Device<B>,
	) -> Result<Self, RecognizerError> {
		let weights = weights.weights();
		let record = Self::load_weights_record(&weights, device)?;
		let model = EfficientNetConfig::b0(weights.num_classes)
			.init(device)
			.load_record(record)
			.no_grad();

		Ok(model.with_head(num_classes, 0.2, device))
	}

	/// Load a fine-tuned model from a serialized weights artifact, the
	/// startup input of the recognizer.
	pub fn from_file<A: AsRef<Path>>(
		path: A,
		num_classes: usize,
		device: &Device<B>,
	) -> Result<Self, RecognizerError> {
		let recorder = burn::record::NamedMpkFileRecorder::<FullPrecisionSettings>::new();
		let model = EfficientNetConfig::b0(num_classes)
			.init(device)
			.load_file(path.as_ref().to_path_buf(), &recorder, device)?;
		Ok(model.no_grad())
	}

	/// Replace the classification head, leaving the (frozen) backbone as is.
	pub fn with_head(mut self, num_classes: usize, dropout: f64, device: &Device<B>) -> Self {
		self.dropout = DropoutConfig::new(dropout).init();
		self.fc = LinearConfig::new(FEATURE_DIM, num_classes).init(device);
		self
	}

	fn load_weights_record(
		weights: &Weights,
		device: &Device<B>,
	) -> Result<EfficientNetRecord<B>, RecorderError> {
		let torch_weights = weights.download().map_err(|err| {
			RecorderError::Unknown(format!("Could not download weights.\nError: {err}"))
		})?;

		// Map the torchvision state dict onto this module tree. torchvision
		// numbers the feature stages 0 (stem) through 8 (head conv); inside a
		// block the children shift down by one when there is no expansion
		// convolution (stage 1 only).
		let load_args = LoadArgs::new(torch_weights)
			.with_key_remap("^features\\.0\\.0\\.(.+)", "stem.conv.$1")
			.with_key_remap("^features\\.0\\.1\\.(.+)", "stem.bn.$1")
			.with_key_remap("^features\\.8\\.0\\.(.+)", "head.conv.$1")
			.with_key_remap("^features\\.8\\.1\\.(.+)", "head.bn.$1")
			.with_key_remap("^features\\.([1-7])\\.([0-9]+)\\.block\\.(.+)", "stage$1.blocks.$2.$3")
			// stage 1: depthwise, se, project at block indices 0, 1, 2
			.with_key_remap("^(stage1\\.blocks\\.[0-9]+)\\.0\\.0\\.(.+)", "$1.depthwise.conv.$2")
			.with_key_remap("^(stage1\\.blocks\\.[0-9]+)\\.0\\.1\\.(.+)", "$1.depthwise.bn.$2")
			.with_key_remap("^(stage1\\.blocks\\.[0-9]+)\\.1\\.(fc[12]\\..+)", "$1.se.$2")
			.with_key_remap("^(stage1\\.blocks\\.[0-9]+)\\.2\\.0\\.(.+)", "$1.project.$2")
			.with_key_remap("^(stage1\\.blocks\\.[0-9]+)\\.2\\.1\\.(.+)", "$1.project_bn.$2")
			// stages 2-7: expand, depthwise, se, project at indices 0, 1, 2, 3
			.with_key_remap("^(stage[2-7]\\.blocks\\.[0-9]+)\\.0\\.0\\.(.+)", "$1.expand.conv.$2")
			.with_key_remap("^(stage[2-7]\\.blocks\\.[0-9]+)\\.0\\.1\\.(.+)", "$1.expand.bn.$2")
			.with_key_remap("^(stage[2-7]\\.blocks\\.[0-9]+)\\.1\\.0\\.(.+)", "$1.depthwise.conv.$2")
			.with_key_remap("^(stage[2-7]\\.blocks\\.[0-9]+)\\.1\\.1\\.(.+)", "$1.depthwise.bn.$2")
			.with_key_remap("^(stage[2-7]\\.blocks\\.[0-9]+)\\.2\\.(fc[12]\\..+)", "$1.se.$2")
			.with_key_remap("^(stage[2-7]\\.blocks\\.[0-9]+)\\.3\\.0\\.(.+)", "$1.project.$2")
			.with_key_remap("^(stage[2-7]\\.blocks\\.[0-9]+)\\.3\\.1\\.(.+)", "$1.project_bn.$2")
			.with_key_remap("^classifier\\.1\\.(.+)", "fc.$1");
		let record = PyTorchFileRecorder::<FullPrecisionSettings>::new().load(load_args, device)?;

		Ok(record)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	type TestBackend = burn::backend::NdArray;

	#[test]
	fn forward_emits_one_logit_per_class() {
		let device = Default::default();
		let model: EfficientNet<TestBackend> = EfficientNet::b0(5, &device);

		let input = Tensor::zeros([1, 3, 64, 64], &device);
		let logits = model.forward(input);
		assert_eq!(logits.dims(), [1, 5]);
	}

	#[test]
	fn head_width_is_reported() {
		let device = Default::default();
		let model: EfficientNet<TestBackend> = EfficientNet::b0(101, &device);
		assert_eq!(model.num_classes(), 101);
	}

	#[test]
	fn head_replacement_resizes_logits() {
		let device = Default::default();
		let model: EfficientNet<TestBackend> = EfficientNet::b0(1000, &device);
		let model = model.with_head(3, 0.2, &device);

		assert_eq!(model.num_classes(), 3);
		let input = Tensor::zeros([2, 3, 64, 64], &device);
		assert_eq!(model.forward(input).dims(), [2, 3]);
	}
}
