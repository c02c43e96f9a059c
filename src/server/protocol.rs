use serde::Serialize;

/// Body of every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A finished try-on. `result_image` is a `data:` URL ready for an `<img>`
#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub success: bool,
    pub result_image: String,
}

impl TryOnResponse {
    pub fn from_base64(b64: &str) -> Self {
        TryOnResponse {
            success: true,
            result_image: format!("data:image/png;base64,{b64}"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}
