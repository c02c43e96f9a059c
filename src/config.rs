//! Runtime settings for the try-on service. Values are layered from built-in
//! defaults, an optional `tryon.toml` next to the binary's working directory,
//! and `TRYON_*` environment variables (highest priority).

use anyhow::{anyhow, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Base name of the optional settings file
const CONFIG_FILE: &str = "tryon";

/// Environment variable prefix, e.g. `TRYON_PROJECT_ID`
const ENV_PREFIX: &str = "TRYON";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Cloud project that owns the prediction endpoint
    pub project_id: String,

    /// Region of the endpoint, e.g. `us-central1`
    pub location: String,

    /// Publisher model used for the try-on
    pub model_name: String,

    /// Service-account key file
    pub credentials_path: PathBuf,

    pub host: String,
    pub port: u16,

    /// Verbose logging
    pub debug: bool,

    /// Overrides the regional API host. Used against emulators and in tests
    pub api_base: Option<String>,
}

impl Settings {
    /// Load settings from the config file and the environment
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        Self::finish(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("location", "us-central1")?
            .set_default("model_name", "virtual-try-on-preview-08-04")?
            .set_default("credentials_path", "service-account.json")?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 5000_i64)?
            .set_default("debug", false)?)
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let settings: Settings = builder
            .build()
            .context("failed to read settings")?
            .try_deserialize()
            .context("invalid settings")?;

        if settings.project_id.trim().is_empty() {
            return Err(anyhow!("project_id must not be empty"));
        }
        Ok(settings)
    }

    /// Root of the prediction API, without a trailing slash
    pub fn api_base(&self) -> String {
        match &self.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        }
    }

    /// Full URL of the model's `:predict` method
    pub fn predict_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            self.api_base(),
            self.project_id,
            self.location,
            self.model_name
        )
    }

    /// Address the HTTP server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> Result<Settings> {
        let builder = Settings::defaults()?.add_source(File::from_str(toml, FileFormat::Toml));
        Settings::finish(builder)
    }

    #[test]
    fn test_defaults() {
        let settings = from_toml(r#"project_id = "demo-project""#).unwrap();
        assert_eq!(settings.location, "us-central1");
        assert_eq!(settings.model_name, "virtual-try-on-preview-08-04");
        assert_eq!(settings.port, 5000);
        assert!(!settings.debug);
        assert_eq!(settings.bind_addr(), "0.0.0.0:5000");
    }

    #[test]
    fn test_predict_url() {
        let settings = from_toml(
            r#"
            project_id = "demo-project"
            location = "europe-west4"
            model_name = "virtual-try-on-001"
            "#,
        )
        .unwrap();
        assert_eq!(
            settings.predict_url(),
            "https://europe-west4-aiplatform.googleapis.com/v1/projects/demo-project/locations/europe-west4/publishers/google/models/virtual-try-on-001:predict"
        );
    }

    #[test]
    fn test_api_base_override() {
        let settings = from_toml(
            r#"
            project_id = "p"
            api_base = "http://127.0.0.1:9000/"
            "#,
        )
        .unwrap();
        assert_eq!(
            settings.predict_url(),
            "http://127.0.0.1:9000/v1/projects/p/locations/us-central1/publishers/google/models/virtual-try-on-preview-08-04:predict"
        );
    }

    #[test]
    fn test_project_required() {
        assert!(from_toml("").is_err());
        assert!(from_toml(r#"project_id = " ""#).is_err());
    }
}
