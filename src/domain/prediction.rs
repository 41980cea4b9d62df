//! Prediction result types.
//!
//! Represents the output of the calibrated cardiovascular risk classifier.

use serde::{Deserialize, Serialize};

/// Lower bound of the probability band shown as [`DISPLAY_CLAMP_VALUE`].
pub const DISPLAY_CLAMP_LOW: f64 = 0.3;
/// Upper bound of the probability band shown as [`DISPLAY_CLAMP_VALUE`].
pub const DISPLAY_CLAMP_HIGH: f64 = 0.5;
/// Probability shown for borderline cases.
pub const DISPLAY_CLAMP_VALUE: f64 = 0.51;

/// Binary risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    /// Probability at or below the calibrated threshold
    Low,
    /// Probability above the calibrated threshold
    High,
}

impl RiskLabel {
    /// Apply the calibrated threshold (strict comparison).
    #[must_use]
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability > threshold {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk of heart disease. Keep up your regular medical check-ups.",
            Self::High => "High risk of heart disease. Consult your general practitioner for a cardiology referral.",
        }
    }

    /// Classifier label encoding (0 = low, 1 = high).
    #[must_use]
    pub fn as_code(&self) -> i64 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Probability shown to the user.
///
/// Borderline probabilities in `[0.3, 0.5]` are displayed as `0.51` so a
/// flagged case never shows a number that reads as "unlikely". This is a
/// presentation rule only: the label and the stored probability are
/// computed from the raw value.
#[must_use]
pub fn display_probability(probability: f64) -> f64 {
    if (DISPLAY_CLAMP_LOW..=DISPLAY_CLAMP_HIGH).contains(&probability) {
        DISPLAY_CLAMP_VALUE
    } else {
        probability
    }
}

/// Outcome of one prediction. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Positive-class probability from the classifier (0.0 to 1.0)
    pub probability: f64,

    /// Label derived from the calibrated threshold
    pub risk_label: RiskLabel,

    /// Probability intended for display
    pub display_probability: f64,
}

impl PredictionResult {
    /// Derive label and display value from a raw probability.
    #[must_use]
    pub fn new(probability: f64, threshold: f64) -> Self {
        Self {
            probability,
            risk_label: RiskLabel::from_probability(probability, threshold),
            display_probability: display_probability(probability),
        }
    }

    /// Serializable view for the UI layer. `features_used` is the
    /// classifier's column order.
    #[must_use]
    pub fn to_response(&self, features_used: &[String]) -> PredictionResponse {
        PredictionResponse {
            probability: self.probability,
            risk_label: self.risk_label,
            display_probability: (self.display_probability * 1000.0).round() / 1000.0,
            message: self.risk_label.description().to_string(),
            features_used: features_used.to_vec(),
        }
    }
}

/// Response returned to the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub probability: f64,
    pub risk_label: RiskLabel,
    /// Rounded to three decimals
    pub display_probability: f64,
    pub message: String,
    pub features_used: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(RiskLabel::from_probability(0.27, 0.27), RiskLabel::Low);
        assert_eq!(RiskLabel::from_probability(0.2700001, 0.27), RiskLabel::High);
        assert_eq!(RiskLabel::from_probability(0.1, 0.27), RiskLabel::Low);
    }

    #[test]
    fn test_display_clamp() {
        assert_eq!(display_probability(0.35), 0.51);
        assert_eq!(display_probability(0.3), 0.51);
        assert_eq!(display_probability(0.5), 0.51);
        assert_eq!(display_probability(0.6), 0.6);
        assert_eq!(display_probability(0.2), 0.2);
    }

    #[test]
    fn test_result_keeps_raw_probability() {
        let result = PredictionResult::new(0.35, 0.25);
        assert_eq!(result.probability, 0.35);
        assert_eq!(result.display_probability, 0.51);
        assert_eq!(result.risk_label, RiskLabel::High);
        assert_eq!(result.risk_label.as_code(), 1);
    }

    #[test]
    fn test_response_serialization() {
        let columns = vec!["BMI".to_string(), "AgeCategory_18-24".to_string()];
        let response = PredictionResult::new(0.123456, 0.4).to_response(&columns);
        assert_eq!(response.display_probability, 0.123);
        let json = serde_json::to_value(&response).expect("Should serialize");
        assert_eq!(json["risk_label"], "low");
        assert_eq!(json["probability"], 0.123456);
        assert_eq!(json["features_used"], serde_json::json!(["BMI", "AgeCategory_18-24"]));
    }
}
