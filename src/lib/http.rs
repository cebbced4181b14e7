//! Blocking HTTP helpers shared by the extractor, translator and image loader.

use crate::config::HttpSettings;
use reqwest::blocking::Client;
use std::time::Duration;

/// Builds the client used for every request of a report run.
pub fn build_client(settings: &HttpSettings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
}

/// GETs `url` and returns the body as text. Non-success statuses are errors.
pub fn get_text(client: &Client, url: &str) -> Result<String, reqwest::Error> {
    client.get(url).send()?.error_for_status()?.text()
}

/// GETs `url` and returns the raw body. Non-success statuses are errors.
pub fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = client.get(url).send()?.error_for_status()?;
    Ok(response.bytes()?.to_vec())
}
