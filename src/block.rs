use burn::module::Module;
use burn::nn::conv::Conv2d;
use burn::nn::BatchNorm;
use burn::prelude::{Backend, Tensor};
use burn::tensor::activation::{sigmoid, silu};

/// Convolution + batch norm + SiLU, the basic unit EfficientNet is built from.
#[derive(Debug, Module)]
pub struct ConvBnSilu<B: Backend> {
	pub(crate) conv: Conv2d<B>,
	pub(crate) bn: BatchNorm<B, 2>,
}

impl<B: Backend> ConvBnSilu<B> {
	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		silu(self.bn.forward(self.conv.forward(input)))
	}
}

/// Squeeze-and-excitation: global-average-pool the spatial dims, run the
/// result through a two-layer bottleneck and rescale every channel by the
/// resulting [0, 1] gate.
#[derive(Debug, Module)]
pub struct SqueezeExcitation<B: Backend> {
	pub(crate) fc1: Conv2d<B>,
	pub(crate) fc2: Conv2d<B>,
}

impl<B: Backend> SqueezeExcitation<B> {
	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		// [B, C, H, W] -> [B, C, 1, 1]
		let squeezed = input.clone().mean_dim(2).mean_dim(3);
		let scale = sigmoid(self.fc2.forward(silu(self.fc1.forward(squeezed))));
		input * scale
	}
}

/// Mobile inverted bottleneck block: optional 1x1 expansion, depthwise
/// convolution, squeeze-excitation, then a linear 1x1 projection. The input
/// is added back whenever the block preserves shape (stride 1, equal channel
/// counts).
#[derive(Debug, Module)]
pub struct MbConv<B: Backend> {
	pub(crate) expand: Option<ConvBnSilu<B>>,
	pub(crate) depthwise: ConvBnSilu<B>,
	pub(crate) se: SqueezeExcitation<B>,
	pub(crate) project: Conv2d<B>,
	pub(crate) project_bn: BatchNorm<B, 2>,
}

impl<B: Backend> MbConv<B> {
	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		let identity = input.clone();

		let x = match &self.expand {
			Some(expand) => expand.forward(input),
			None => input,
		};
		let x = self.depthwise.forward(x);
		let x = self.se.forward(x);
		// no activation after the projection
		let x = self.project_bn.forward(self.project.forward(x));

		// skip
		if x.dims() == identity.dims() {
			x + identity
		} else {
			x
		}
	}
}

/// A run of [MbConv] blocks sharing one stage configuration; only the first
/// block of a stage strides or changes the channel count.
#[derive(Debug, Module)]
pub struct Stage<B: Backend> {
	pub(crate) blocks: Vec<MbConv<B>>,
}

impl<B: Backend> Stage<B> {
	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		self.blocks
			.iter()
			.fold(input, |x, block| block.forward(x))
	}
}
