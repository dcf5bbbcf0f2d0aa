use crate::infer::Prediction;
use log::info;

/// One user reaction to a prediction. Terminal in this crate: acknowledged
/// and logged, never stored durably.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEntry {
	pub prediction: Prediction,
	pub is_correct: bool,
	pub corrected_label: Option<String>,
}

/// Receipt returned to the caller; the only obligation of the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgment {
	pub entry: FeedbackEntry,
}

impl Acknowledgment {
	pub fn message(&self) -> &'static str {
		"Thank you for your feedback!"
	}
}

/// Record a correctness signal for a prediction.
///
/// A correct prediction carries no correction; any supplied text is ignored.
/// An incorrect prediction may carry optional free text naming the right
/// label, kept verbatim with no normalization and no check against the
/// registry. A missing correction just means none was supplied yet; the
/// caller may record again once it has one.
pub fn record_feedback(
	prediction: &Prediction,
	is_correct: bool,
	corrected_label: Option<String>,
) -> Acknowledgment {
	let corrected_label = if is_correct { None } else { corrected_label };

	match (is_correct, &corrected_label) {
		(true, _) => info!("correct prediction: predicted class = {}", prediction.class_id),
		(false, Some(correction)) => info!(
			"incorrect prediction: predicted class = {}, reported class = {}",
			prediction.class_id, correction
		),
		(false, None) => info!(
			"incorrect prediction: predicted class = {}, no correction supplied",
			prediction.class_id
		),
	}

	Acknowledgment {
		entry: FeedbackEntry {
			prediction: prediction.clone(),
			is_correct,
			corrected_label,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn prediction() -> Prediction {
		Prediction {
			index: 42,
			class_id: "pizza".to_string(),
			label: "Pizza".to_string(),
			confidence: 0.87,
		}
	}

	#[test]
	fn correct_feedback_needs_no_correction() {
		let ack = record_feedback(&prediction(), true, None);
		assert!(ack.entry.is_correct);
		assert_eq!(ack.entry.corrected_label, None);
		assert_eq!(ack.message(), "Thank you for your feedback!");
	}

	#[test]
	fn correct_feedback_ignores_a_supplied_correction() {
		let ack = record_feedback(&prediction(), true, Some("sushi".to_string()));
		assert_eq!(ack.entry.corrected_label, None);
	}

	#[test]
	fn incorrect_feedback_keeps_free_text_verbatim() {
		let ack = record_feedback(&prediction(), false, Some("  Deep-Dish PIZZA ".to_string()));
		assert!(!ack.entry.is_correct);
		assert_eq!(ack.entry.corrected_label.as_deref(), Some("  Deep-Dish PIZZA "));
	}

	#[test]
	fn incorrect_feedback_without_correction_still_succeeds() {
		let ack = record_feedback(&prediction(), false, None);
		assert!(!ack.entry.is_correct);
		assert_eq!(ack.entry.corrected_label, None);
		assert_eq!(ack.entry.prediction, prediction());
	}
}
