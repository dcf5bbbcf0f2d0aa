use crate::block::{ConvBnSilu, MbConv, SqueezeExcitation, Stage};
use crate::effnet::EfficientNet;
use burn::nn::conv::Conv2dConfig;
use burn::nn::pool::AdaptiveAvgPool2dConfig;
use burn::nn::{BatchNormConfig, DropoutConfig, Initializer, LinearConfig, PaddingConfig2d};
use burn::prelude::{Backend, Config, Device};
use std::f64::consts::SQRT_2;

/// Features produced by the B0 backbone, the input width of the head.
pub const FEATURE_DIM: usize = 1280;

/// B0 stage table: (expand ratio, kernel, stride, in channels, out channels, repeats).
const B0_STAGES: [(usize, usize, usize, usize, usize, usize); 7] = [
	(1, 3, 1, 32, 16, 1),
	(6, 3, 2, 16, 24, 2),
	(6, 5, 2, 24, 40, 2),
	(6, 3, 2, 40, 80, 3),
	(6, 5, 1, 80, 112, 3),
	(6, 5, 2, 112, 192, 4),
	(6, 3, 1, 192, 320, 1),
];

#[derive(Config)]
pub struct ConvBnSiluConfig {
	in_channels: usize,
	out_channels: usize,
	kernel: usize,
	#[config(default = 1)]
	stride: usize,
	#[config(default = 1)]
	groups: usize,
}

impl ConvBnSiluConfig {
	pub fn init<B: Backend>(&self, device: &Device<B>) -> ConvBnSilu<B> {
		let initializer = Initializer::KaimingNormal {
			gain: SQRT_2, // recommended value for ReLU-family activations
			fan_out_only: true,
		};
		let padding = (self.kernel - 1) / 2;

		let conv = Conv2dConfig::new([self.in_channels, self.out_channels], [self.kernel, self.kernel])
			.with_stride([self.stride, self.stride])
			.with_padding(PaddingConfig2d::Explicit(padding, padding))
			.with_groups(self.groups)
			.with_bias(false)
			.with_initializer(initializer)
			.init(device);

		ConvBnSilu {
			conv,
			bn: BatchNormConfig::new(self.out_channels).init(device),
		}
	}
}

#[derive(Config)]
pub struct MbConvConfig {
	in_channels: usize,
	out_channels: usize,
	expand_ratio: usize,
	kernel: usize,
	stride: usize,
}

impl MbConvConfig {
	pub fn init<B: Backend>(&self, device: &Device<B>) -> MbConv<B> {
		let expanded = self.in_channels * self.expand_ratio;

		// 1x1 expansion, skipped when the ratio is 1
		let expand = (self.expand_ratio != 1)
			.then(|| ConvBnSiluConfig::new(self.in_channels, expanded, 1).init(device));

		let depthwise = ConvBnSiluConfig::new(expanded, expanded, self.kernel)
			.with_stride(self.stride)
			.with_groups(expanded)
			.init(device);

		// squeeze width follows the block input, not the expanded width
		let squeeze = (self.in_channels / 4).max(1);
		let se = SqueezeExcitation {
			fc1: Conv2dConfig::new([expanded, squeeze], [1, 1]).init(device),
			fc2: Conv2dConfig::new([squeeze, expanded], [1, 1]).init(device),
		};

		// linear 1x1 projection
		let project = Conv2dConfig::new([expanded, self.out_channels], [1, 1])
			.with_bias(false)
			.init(device);

		MbConv {
			expand,
			depthwise,
			se,
			project,
			project_bn: BatchNormConfig::new(self.out_channels).init(device),
		}
	}
}

#[derive(Config)]
pub struct StageConfig {
	expand_ratio: usize,
	kernel: usize,
	stride: usize,
	in_channels: usize,
	out_channels: usize,
	repeats: usize,
}

impl StageConfig {
	pub fn init<B: Backend>(&self, device: &Device<B>) -> Stage<B> {
		let blocks = (0..self.repeats)
			.map(|b| {
				if b == 0 {
					// first block carries the stride and the channel change
					MbConvConfig::new(
						self.in_channels,
						self.out_channels,
						self.expand_ratio,
						self.kernel,
						self.stride,
					)
					.init(device)
				} else {
					MbConvConfig::new(
						self.out_channels,
						self.out_channels,
						self.expand_ratio,
						self.kernel,
						1,
					)
					.init(device)
				}
			})
			.collect();

		Stage { blocks }
	}
}

#[derive(Config)]
pub struct EfficientNetConfig {
	pub num_classes: usize,
	#[config(default = 0.2)]
	pub dropout: f64,
}

impl EfficientNetConfig {
	/// The B0 variant, the only scaling this crate ships.
	pub fn b0(num_classes: usize) -> Self {
		Self::new(num_classes)
	}

	pub fn init<B: Backend>(&self, device: &Device<B>) -> EfficientNet<B> {
		let stage = |i: usize| {
			let (expand, kernel, stride, input, out, repeats) = B0_STAGES[i];
			StageConfig::new(expand, kernel, stride, input, out, repeats).init(device)
		};

		EfficientNet {
			stem: ConvBnSiluConfig::new(3, 32, 3).with_stride(2).init(device),
			stage1: stage(0),
			stage2: stage(1),
			stage3: stage(2),
			stage4: stage(3),
			stage5: stage(4),
			stage6: stage(5),
			stage7: stage(6),
			head: ConvBnSiluConfig::new(320, FEATURE_DIM, 1).init(device),
			avgpool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
			dropout: DropoutConfig::new(self.dropout).init(),
			fc: LinearConfig::new(FEATURE_DIM, self.num_classes).init(device),
		}
	}
}
