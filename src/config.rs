use anyhow::Result;
use serde::Deserialize;

/// Demo application configuration, loaded from a config file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionConfig {
    /// Full wss:// endpoint, including any API version query parameter
    pub endpoint: String,
    /// One or two recognition locales, e.g. ["ENGLISH_US", "SPANISH_ES"]
    pub speech_locales: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    pub access_token: String,
    pub refresh_token: String,
    /// Token refresh endpoint (https)
    pub refresh_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
