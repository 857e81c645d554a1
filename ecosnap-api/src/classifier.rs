//! Waste detection service client
//!
//! The detection service accepts an image upload and answers with a waste
//! label, a float confidence and a risk level. [`Classifier`] is the seam the
//! submission workflow depends on; [`HttpClassifier`] is the production
//! implementation.

use async_trait::async_trait;
use ecosnap_common::{Classification, Confidence, WasteCategory};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("EcoSnap/", env!("CARGO_PKG_VERSION"));
const UPLOAD_PATH: &str = "/api/detect/upload";
const HEALTH_PATH: &str = "/health";
/// Label the service uses when nothing recognizable was found
const UNKNOWN_LABEL: &str = "Unknown";

/// Classification failures; none of them award anything
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Detection service timed out")]
    Timeout,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Detection rejected: {0}")]
    Rejected(String),

    #[error("Unrecognized waste category: {0}")]
    InvalidCategory(String),
}

impl From<reqwest::Error> for ClassifierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClassifierError::Timeout
        } else if err.is_decode() {
            ClassifierError::Parse(err.to_string())
        } else {
            ClassifierError::Network(err.to_string())
        }
    }
}

/// Turns image bytes into a validated classification
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError>;

    /// Whether the backing service answers its health check
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// Detection service response body
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionResponse {
    #[serde(rename = "wasteType")]
    pub waste_type: Option<String>,
    pub confidence: Option<f64>,
    #[serde(rename = "riskLevel")]
    pub risk_level: Option<String>,
    pub error: Option<String>,
}

impl DetectionResponse {
    /// Validate a response into a classification
    ///
    /// An `error` field fails the detection even when the service also sent a
    /// label and its placeholder confidence.
    pub fn into_classification(self) -> Result<Classification, ClassifierError> {
        if let Some(error) = self.error {
            return Err(ClassifierError::Rejected(error));
        }

        let label = self
            .waste_type
            .ok_or_else(|| ClassifierError::Parse("missing wasteType".to_string()))?;
        if label == UNKNOWN_LABEL {
            return Err(ClassifierError::Rejected(
                "no recognizable waste in image".to_string(),
            ));
        }
        let category = WasteCategory::from_service_label(&label)
            .ok_or(ClassifierError::InvalidCategory(label))?;

        let raw = self
            .confidence
            .ok_or_else(|| ClassifierError::Parse("missing confidence".to_string()))?;
        let confidence =
            Confidence::from_percent(raw).map_err(|e| ClassifierError::Rejected(e.to_string()))?;

        Ok(Classification::new(category, confidence))
    }
}

/// `reqwest` client for the detection service
pub struct HttpClassifier {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, image: &[u8]) -> Result<Classification, ClassifierError> {
        let form = Form::new().part("image", Part::bytes(image.to_vec()).file_name("upload.jpg"));

        tracing::debug!(bytes = image.len(), "Sending image to detection service");

        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api(status.as_u16(), error_text));
        }

        let detection: DetectionResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        if let Some(risk) = &detection.risk_level {
            tracing::debug!(risk_level = %risk, "Detection service risk level");
        }

        let classification = detection.into_classification()?;
        tracing::info!(
            category = %classification.category,
            confidence = classification.confidence.value(),
            "Detection successful"
        );
        Ok(classification)
    }

    async fn is_healthy(&self) -> bool {
        match self
            .http_client
            .get(format!("{}{}", self.base_url, HEALTH_PATH))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Detection service health check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Classification, ClassifierError> {
        serde_json::from_str::<DetectionResponse>(json)
            .unwrap()
            .into_classification()
    }

    #[test]
    fn test_successful_detection() {
        let c = parse(r#"{"wasteType":"Oil","confidence":87.6,"riskLevel":"High"}"#).unwrap();
        assert_eq!(c.category, WasteCategory::Oil);
        assert_eq!(c.confidence.value(), 88);
    }

    #[test]
    fn test_mixed_waste_label() {
        let c = parse(r#"{"wasteType":"Mixed Waste","confidence":40.0,"riskLevel":"Medium"}"#)
            .unwrap();
        assert_eq!(c.category, WasteCategory::MixedWaste);
    }

    #[test]
    fn test_error_field_fails_even_with_placeholder() {
        let result = parse(
            r#"{"wasteType":"Unknown","confidence":50.0,"riskLevel":"Medium",
                "error":"model not loaded"}"#,
        );
        assert!(matches!(result, Err(ClassifierError::Rejected(msg)) if msg == "model not loaded"));
    }

    #[test]
    fn test_unknown_label_rejected() {
        let result = parse(r#"{"wasteType":"Unknown","confidence":12.0}"#);
        assert!(matches!(result, Err(ClassifierError::Rejected(_))));
    }

    #[test]
    fn test_unexpected_label() {
        let result = parse(r#"{"wasteType":"Glass","confidence":70.0}"#);
        assert!(matches!(result, Err(ClassifierError::InvalidCategory(label)) if label == "Glass"));
    }

    #[test]
    fn test_out_of_range_confidence() {
        let result = parse(r#"{"wasteType":"Plastic","confidence":140.0}"#);
        assert!(matches!(result, Err(ClassifierError::Rejected(_))));
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            parse(r#"{"confidence":70.0}"#),
            Err(ClassifierError::Parse(_))
        ));
        assert!(matches!(
            parse(r#"{"wasteType":"Plastic"}"#),
            Err(ClassifierError::Parse(_))
        ));
    }

    #[test]
    fn test_client_creation_trims_base_url() {
        let client = HttpClassifier::new("http://localhost:5001/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5001");
    }
}
