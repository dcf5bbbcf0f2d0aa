use burn::data::network::downloader;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::PathBuf;

/// A published checkpoint: where to fetch it and how many classes its
/// classification head covers.
pub struct Weights {
	pub url: &'static str,
	pub num_classes: usize,
}

impl Weights {
	/// Fetch the checkpoint into the local cache, skipping the download when
	/// a cached copy already exists.
	pub fn download(&self) -> Result<PathBuf, std::io::Error> {
		let model_dir = dirs::home_dir()
			.ok_or_else(|| {
				std::io::Error::new(std::io::ErrorKind::NotFound, "Could not determine home directory")
			})?
			.join(".cache")
			.join("food-recognizer");

		if !model_dir.exists() {
			create_dir_all(&model_dir)?;
		}

		let file_base_name = self.url.rsplit_once('/').unwrap().1;
		let file_name = model_dir.join(file_base_name);
		if !file_name.exists() {
			let bytes = downloader::download_file_as_bytes(self.url, file_base_name);

			let mut output_file = File::create(&file_name)?;
			let bytes_written = output_file.write(&bytes)?;

			if bytes_written != bytes.len() {
				return Err(std::io::Error::new(
					std::io::ErrorKind::InvalidData,
					"Failed to write the whole model weights file.",
				));
			}
		}

		Ok(file_name)
	}
}

pub trait WeightsMeta {
	fn weights(&self) -> Weights;
}

/// Published EfficientNet-B0 checkpoints usable as the frozen backbone.
pub enum EfficientNetB0 {
	/// Original torchvision port of the TF weights.
	/// Top-1 accuracy: 77.692%.
	/// Top-5 accuracy: 93.532%.
	ImageNet1kV1,
}

impl WeightsMeta for EfficientNetB0 {
	fn weights(&self) -> Weights {
		Weights {
			url: "https://download.pytorch.org/models/efficientnet_b0_rwightman-7f5810bc.pth",
			num_classes: 1000,
		}
	}
}
