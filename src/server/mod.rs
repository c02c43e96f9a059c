use crate::auth::TokenSource;
use crate::predict::{PredictError, PredictionClient};
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use std::sync::Arc;

mod protocol;
pub mod routes;

/// Everything a request handler needs. Shared read-only between workers
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<dyn TokenSource>,
    pub predictor: PredictionClient,
}

impl AppState {
    pub fn new(tokens: Arc<dyn TokenSource>, predictor: PredictionClient) -> Self {
        AppState { tokens, predictor }
    }
}

/// The outcome of a failed try-on, already tied to an HTTP status
#[derive(Debug)]
pub enum WebError {
    /// Missing or unnamed uploads
    Validation(&'static str),

    /// One of the uploads could not be decoded or re-encoded
    ImageProcessing,

    /// No bearer token could be obtained
    Auth,

    /// The prediction provider failed or answered with no image
    Upstream(PredictError),

    /// Anything else
    Unhandled(anyhow::Error),
}

pub(crate) const MISSING_IMAGES: &str = "Both person and clothing images are required";
pub(crate) const NO_FILES_SELECTED: &str = "No files selected";

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebError::Validation(msg) => write!(f, "{msg}"),
            WebError::ImageProcessing => write!(f, "Failed to process images"),
            WebError::Auth => write!(f, "Failed to get authentication token"),
            WebError::Upstream(err) => write!(f, "{err}"),
            WebError::Unhandled(err) => write!(f, "Virtual try-on failed: {err}"),
        }
    }
}

impl actix_web::error::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(protocol::ErrorResponse {
                error: self.to_string(),
            })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            WebError::Validation(_) | WebError::ImageProcessing => StatusCode::BAD_REQUEST,
            WebError::Auth | WebError::Upstream(_) | WebError::Unhandled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> WebError {
        WebError::Unhandled(err)
    }
}

impl From<PredictError> for WebError {
    fn from(err: PredictError) -> Self {
        match err {
            // Transport failures were never answered by the provider
            PredictError::Transport(err) => WebError::Unhandled(err.into()),
            other => WebError::Upstream(other),
        }
    }
}

impl From<actix_multipart::MultipartError> for WebError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        WebError::Unhandled(anyhow::anyhow!("{err}"))
    }
}
