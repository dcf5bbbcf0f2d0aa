use food_recognizer::weights::EfficientNetB0;
use food_recognizer::{record_feedback, EfficientNet, LabelRegistry, Recognizer, RecognizerError, TransformConfig};
use log::warn;
use simple_logger::SimpleLogger;
use std::io::BufRead;

type Backend = burn::backend::NdArray;

const CLASSES_FILE: &str = "text_files/classes.txt";
const LABELS_FILE: &str = "text_files/labels.txt";

fn main() -> Result<(), RecognizerError> {
	SimpleLogger::new().init().unwrap();

	let mut args = std::env::args().skip(1);
	let Some(image_path) = args.next() else {
		eprintln!("Usage: food-recognizer <image> [weights-artifact]");
		std::process::exit(2);
	};
	let artifact = args.next();

	let registry = LabelRegistry::from_files(CLASSES_FILE, LABELS_FILE)?;
	let device = Default::default();

	let model: EfficientNet<Backend> = match &artifact {
		Some(path) => EfficientNet::from_file(path, registry.len(), &device)?,
		None => {
			warn!("no fine-tuned artifact supplied, falling back to the ImageNet backbone with an untrained head");
			EfficientNet::b0_pretrained(EfficientNetB0::ImageNet1kV1, registry.len(), &device)?
		}
	};

	let recognizer = Recognizer::new(model, TransformConfig::new().init(), registry, device)?;

	let bytes = std::fs::read(&image_path)?;
	let prediction = recognizer.predict_bytes(&bytes)?;
	println!(
		"Predicted Food : {} ({:.1}% confidence)",
		prediction.label,
		prediction.confidence * 100.0
	);

	println!("Was this prediction correct? [y/n]");
	let answer = read_line()?;
	let is_correct = match answer.trim() {
		"y" | "Y" | "yes" => true,
		"n" | "N" | "no" => false,
		_ => {
			println!("No feedback recorded.");
			return Ok(());
		}
	};

	let correction = if is_correct {
		None
	} else {
		println!("What food does your image actually show?");
		let text = read_line()?;
		let text = text.trim();
		(!text.is_empty()).then(|| text.to_string())
	};

	let ack = record_feedback(&prediction, is_correct, correction);
	println!("{}", ack.message());

	Ok(())
}

fn read_line() -> Result<String, std::io::Error> {
	let mut line = String::new();
	std::io::stdin().lock().read_line(&mut line)?;
	Ok(line)
}
