//! Text translation with total failure tolerance.
//!
//! [`Translator`] never fails: when the provider errors for any reason the input text is
//! returned unchanged. Providers implement [`TranslationProvider`]; the default one talks
//! to the public Google Translate JSON endpoint. [`CachedProvider`] memoizes successful
//! answers so repeated units cost a single provider call.

use crate::http;
use crate::model::ContentBlock;
use log::{debug, warn};
use reqwest::blocking::Client;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use url::Url;

/// Why a provider could not translate.
#[derive(Debug)]
pub enum TranslationError {
    Network(String),
    Provider(String),
    Parse(String),
}

impl fmt::Display for TranslationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationError::Network(msg) => write!(f, "Network error: {msg}"),
            TranslationError::Provider(msg) => write!(f, "Provider error: {msg}"),
            TranslationError::Parse(msg) => write!(f, "Unexpected provider reply: {msg}"),
        }
    }
}

impl std::error::Error for TranslationError {}

/// A translation backend.
pub trait TranslationProvider: Send + Sync {
    fn translate(&self, text: &str, target: &str, source: &str)
        -> Result<String, TranslationError>;
}

/// Google Translate `translate_a/single` endpoint (`client=gtx`).
pub struct GoogleTranslateProvider {
    client: Client,
    endpoint: String,
}

impl GoogleTranslateProvider {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        GoogleTranslateProvider {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl TranslationProvider for GoogleTranslateProvider {
    fn translate(
        &self,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<String, TranslationError> {
        let url = Url::parse_with_params(
            &self.endpoint,
            &[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ],
        )
        .map_err(|e| TranslationError::Provider(format!("bad endpoint: {e}")))?;

        let body = http::get_text(&self.client, url.as_str()).map_err(|e| {
            if e.is_status() {
                TranslationError::Provider(e.to_string())
            } else {
                TranslationError::Network(e.to_string())
            }
        })?;
        parse_google_response(&body)
    }
}

/// Joins the translated segments of a `translate_a/single` reply.
///
/// The reply is a nested array whose first element lists
/// `[translated, original, ...]` segments.
pub fn parse_google_response(body: &str) -> Result<String, TranslationError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| TranslationError::Parse(e.to_string()))?;
    let segments = value
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslationError::Parse("missing segment list".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(|s| s.as_str()))
        .collect();
    if translated.is_empty() {
        return Err(TranslationError::Parse("no translated text".to_string()));
    }
    Ok(translated)
}

/// Memoizes successful translations of another provider.
pub struct CachedProvider<P> {
    inner: P,
    cache: Mutex<HashMap<(String, String, String), String>>,
}

impl<P: TranslationProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        CachedProvider {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<P: TranslationProvider> TranslationProvider for CachedProvider<P> {
    fn translate(
        &self,
        text: &str,
        target: &str,
        source: &str,
    ) -> Result<String, TranslationError> {
        let key = (text.to_string(), target.to_string(), source.to_string());
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return Ok(hit);
        }
        let translated = self.inner.translate(text, target, source)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, translated.clone());
        }
        Ok(translated)
    }
}

/// Failure-tolerant front end over a provider.
pub struct Translator {
    provider: Box<dyn TranslationProvider>,
}

impl Translator {
    pub fn new(provider: impl TranslationProvider + 'static) -> Self {
        Translator {
            provider: Box::new(provider),
        }
    }

    /// Translates `text`, returning it unchanged on any failure.
    ///
    /// Blank text and same-language requests never reach the provider.
    pub fn translate(&self, text: &str, target: &str, source: &str) -> String {
        if text.trim().is_empty() || same_language(target, source) {
            return text.to_string();
        }
        match self.provider.translate(text, target, source) {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Translation to '{}' failed, keeping original: {}", target, e);
                text.to_string()
            }
        }
    }

    /// Returns a new block with every text field translated.
    pub fn translate_block(&self, block: &ContentBlock, target: &str, source: &str) -> ContentBlock {
        block.map_text(|t| self.translate(t, target, source))
    }

    pub fn translate_blocks(
        &self,
        blocks: &[ContentBlock],
        target: &str,
        source: &str,
    ) -> Vec<ContentBlock> {
        debug!("Translating {} blocks to '{}'", blocks.len(), target);
        blocks
            .iter()
            .map(|b| self.translate_block(b, target, source))
            .collect()
    }
}

fn same_language(target: &str, source: &str) -> bool {
    !source.eq_ignore_ascii_case("auto") && target.eq_ignore_ascii_case(source)
}
