pub mod auth;
pub mod config;
pub mod normalize;
pub mod predict;
pub mod server;

/// Fixed values of the try-on flow that are not worth exposing as settings
pub mod constants {
    /// Largest width or height an image may have when sent upstream
    pub const MAX_DIMENSION: u32 = 2048;

    /// Number of composites requested per prediction
    pub const SAMPLE_COUNT: u32 = 1;

    /// OAuth scope requested for the service account
    pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

    /// Name reported by the health check
    pub const SERVICE_NAME: &str = "Virtual Try-On API";
}
