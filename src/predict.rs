//! Client for the hosted try-on model. Sends the person image and the product
//! images to the model's `:predict` method and hands back the composite as a
//! base 64 string.

use crate::auth::AccessToken;
use crate::config::Settings;
use crate::constants::SAMPLE_COUNT;
use crate::normalize::NormalizedImage;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum PredictError {
    /// The provider answered with something other than 200
    #[error("API request failed: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("No predictions in API response")]
    NoPredictions,

    #[error("No image data in API response")]
    NoImageData,

    /// Connection failures and unparseable responses
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// An image inlined as base 64
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub bytes_base64_encoded: String,
}

#[derive(Debug, Serialize)]
pub struct ImageSlot {
    pub image: InlineImage,
}

impl From<&NormalizedImage> for ImageSlot {
    fn from(image: &NormalizedImage) -> Self {
        ImageSlot {
            image: InlineImage {
                bytes_base64_encoded: image.to_base64(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub person_image: ImageSlot,
    pub product_images: Vec<ImageSlot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    pub sample_count: u32,
}

/// Body of a `:predict` call
#[derive(Debug, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<Instance>,
    pub parameters: Parameters,
}

impl PredictRequest {
    /// A single instance dressing `person` in each of `products`
    pub fn new(person: &NormalizedImage, products: &[NormalizedImage]) -> Self {
        PredictRequest {
            instances: vec![Instance {
                person_image: person.into(),
                product_images: products.iter().map(ImageSlot::from).collect(),
            }],
            parameters: Parameters {
                sample_count: SAMPLE_COUNT,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub bytes_base64_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub predictions: Option<Vec<Prediction>>,
}

impl PredictResponse {
    /// The base 64 payload of the first prediction
    pub fn into_image(self) -> Result<String, PredictError> {
        let first = self
            .predictions
            .and_then(|predictions| predictions.into_iter().next())
            .ok_or(PredictError::NoPredictions)?;
        first.bytes_base64_encoded.ok_or(PredictError::NoImageData)
    }
}

/// Sends prediction requests to one model endpoint
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl PredictionClient {
    pub fn new(settings: &Settings) -> Self {
        Self::with_endpoint(settings.predict_url())
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        PredictionClient {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Dress `person` in `clothing`. One request, no retries
    pub async fn predict(
        &self,
        person: &NormalizedImage,
        clothing: &NormalizedImage,
        token: &AccessToken,
    ) -> Result<String, PredictError> {
        let body = PredictRequest::new(person, std::slice::from_ref(clothing));

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            let err = PredictError::Status {
                status: status.as_u16(),
                body,
            };
            error!("{err}");
            return Err(err);
        }

        let image = response.json::<PredictResponse>().await?.into_image()?;
        info!("received try-on result ({} base64 chars)", image.len());
        Ok(image)
    }
}
