//! The listing2pdf library turns a real-estate listing page into a branded PDF brochure.
//!
//! A report run fetches the listing once, extracts its overview, description and detail
//! panels as typed [`model::ContentBlock`]s, translates them, and lays them out on
//! content pages that leave room at the bottom for the agent footer. The footer (logo,
//! contact details and clickable links) is rendered as a separate one-page document and
//! stamped onto every content page.
//!
//! Basic usage builds a [`ReportRequest`] from a configuration and writes the result:
//! ```rust,no_run
//! use listing2pdf::config::{load_config_from_source, ConfigSource};
//! use listing2pdf::ReportRequest;
//! use std::error::Error;
//!
//! fn example() -> Result<(), Box<dyn Error>> {
//!     let config = load_config_from_source(ConfigSource::Default);
//!     let mut request = ReportRequest::new("https://example.com/listing/sea-view-flat/", &config);
//!     request.target_language = "de".to_string();
//!     listing2pdf::generate_report_to_file(&request, &config, "sea-view-flat.pdf")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//! ```text
//! +-----------+     +-------------+     +--------------+
//! | Listing   |     | Blocks +    |     | Translated   |
//! | URL       | --> | image URLs  | --> | blocks       |
//! +-----------+     +-------------+     +--------------+
//!                                              |
//! +-----------+     +-------------+     +--------------+
//! | Contact   |     | Footer page |     | Content doc  |
//! | + logo    | --> | (1 page)    |     | (N pages)    |
//! +-----------+     +-------------+     +--------------+
//!                          \                 /
//!                           +--> merge <----+
//!                                  |
//!                             final PDF
//! ```
//!
//! Only fetching the listing and writing PDFs can fail. Missing sections, failed
//! translations, broken gallery images and unreadable logos are logged and skipped.

pub mod config;
pub mod content;
pub mod extract;
pub mod fonts;
pub mod footer;
pub mod http;
pub mod images;
pub mod layout;
pub mod merge;
pub mod model;
pub mod pdf;
pub mod translate;

use config::ReportConfig;
use content::ContentRenderer;
use extract::ListingExtractor;
use images::ImageLoader;
use log::info;
use model::{ContactInfo, ContentBlock, ImageReference};
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use translate::{CachedProvider, GoogleTranslateProvider, Translator};

/// File name used when the listing URL has no usable last path segment.
pub const DEFAULT_REPORT_NAME: &str = "final_document.pdf";

/// Errors that abort a report run.
#[derive(Debug)]
pub enum ReportError {
    /// The listing page could not be fetched
    FetchError {
        url: String,
        message: String,
        suggestion: String,
    },
    /// An intermediate document could not be merged
    MergeError { message: String, suggestion: String },
    /// A document could not be serialised
    PdfError { message: String, suggestion: String },
    /// Reading or writing a file failed
    IoError {
        message: String,
        path: String,
        suggestion: String,
    },
}

impl Error for ReportError {}
impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ReportError::FetchError {
                url,
                message,
                suggestion,
            } => {
                write!(f, "Fetch Error: {}", message)?;
                write!(f, "\nURL: {}", url)?;
                write!(f, "\nSuggestion: {}", suggestion)
            }
            ReportError::MergeError {
                message,
                suggestion,
            } => {
                write!(f, "Merge Error: {}", message)?;
                write!(f, "\nSuggestion: {}", suggestion)
            }
            ReportError::PdfError {
                message,
                suggestion,
            } => {
                write!(f, "PDF Generation Error: {}", message)?;
                write!(f, "\nSuggestion: {}", suggestion)
            }
            ReportError::IoError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "File Error: {}", message)?;
                write!(f, "\nPath: {}", path)?;
                write!(f, "\nSuggestion: {}", suggestion)
            }
        }
    }
}

impl ReportError {
    /// Creates a fetch error with a generic network suggestion
    pub fn fetch_error(url: impl Into<String>, message: impl Into<String>) -> Self {
        ReportError::FetchError {
            url: url.into(),
            message: message.into(),
            suggestion: "Check your network connection and the listing URL".to_string(),
        }
    }

    /// Creates a merge error with just a message
    pub fn merge_error(message: impl Into<String>) -> Self {
        ReportError::MergeError {
            message: message.into(),
            suggestion: "This is an internal error; please report it with the listing URL"
                .to_string(),
        }
    }

    /// Creates a PDF error with just a message
    pub fn pdf_error(message: impl Into<String>) -> Self {
        ReportError::PdfError {
            message: message.into(),
            suggestion: "Try a different font with font.path or report the listing URL"
                .to_string(),
        }
    }
}

/// Everything one report run needs besides the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub url: String,
    pub target_language: String,
    pub source_language: String,
    pub contact: ContactInfo,
    /// Uploaded logo image, any format the `image` crate decodes.
    pub logo: Option<PathBuf>,
    pub translate: bool,
}

impl ReportRequest {
    /// A request for `url` with languages, contact details and translation taken from
    /// `config`.
    pub fn new(url: impl Into<String>, config: &ReportConfig) -> Self {
        ReportRequest {
            url: url.into(),
            target_language: config.translation.target_language.clone(),
            source_language: config.translation.source_language.clone(),
            contact: config.contact.clone(),
            logo: None,
            translate: config.translation.enabled,
        }
    }
}

/// Derives the output file name from the listing URL: `<last path segment>.pdf`.
///
/// # Example
/// ```rust
/// assert_eq!(
///     listing2pdf::report_file_name("https://example.com/ilan/sea-view-flat/"),
///     "sea-view-flat.pdf"
/// );
/// assert_eq!(listing2pdf::report_file_name("not a url"), "final_document.pdf");
/// ```
pub fn report_file_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(String::from))
        })
        .map(|slug| slug.trim_end_matches(".html").to_string())
        .filter(|slug| {
            !slug.is_empty()
                && slug
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        })
        .map(|slug| format!("{}.pdf", slug))
        .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string())
}

fn http_client(config: &ReportConfig, url: &str) -> Result<reqwest::blocking::Client, ReportError> {
    http::build_client(&config.http)
        .map_err(|e| ReportError::fetch_error(url, format!("Cannot build HTTP client: {}", e)))
}

/// Fetches the listing and extracts its blocks and gallery images, without rendering.
pub fn extract_listing(
    url: &str,
    config: &ReportConfig,
) -> Result<(Vec<ContentBlock>, Vec<ImageReference>), ReportError> {
    let client = http_client(config, url)?;
    ListingExtractor::new(client, config.selectors.clone()).extract(url)
}

/// Builds the translator configured for this run.
pub fn build_translator(client: reqwest::blocking::Client, config: &ReportConfig) -> Translator {
    let provider = GoogleTranslateProvider::new(client, config.translation.endpoint.clone());
    if config.translation.memoize {
        Translator::new(CachedProvider::new(provider))
    } else {
        Translator::new(provider)
    }
}

/// Runs the whole pipeline and returns the final PDF bytes.
pub fn generate_report(
    request: &ReportRequest,
    config: &ReportConfig,
) -> Result<Vec<u8>, ReportError> {
    let font = fonts::register_report_font(&config.font)?;
    let client = http_client(config, &request.url)?;

    let started = Instant::now();
    let (blocks, gallery) =
        ListingExtractor::new(client.clone(), config.selectors.clone()).extract(&request.url)?;
    info!(
        "Extracted {} blocks and {} images in {:?}",
        blocks.len(),
        gallery.len(),
        started.elapsed()
    );

    let blocks = if request.translate {
        let started = Instant::now();
        let translator = build_translator(client.clone(), config);
        let translated =
            translator.translate_blocks(&blocks, &request.target_language, &request.source_language);
        info!(
            "Translated to '{}' in {:?}",
            request.target_language,
            started.elapsed()
        );
        translated
    } else {
        blocks
    };

    let footer_height = footer::footer_height(&request.contact, font);

    let started = Instant::now();
    let loader = ImageLoader::new(client);
    let content = ContentRenderer::new(config, font, &loader).render_content(
        &blocks,
        &gallery,
        footer_height,
    )?;
    info!("Rendered content in {:?}", started.elapsed());

    let started = Instant::now();
    let logo = request.logo.as_deref().and_then(|source| {
        images::prepare_logo(source, &config.logo.upload_dir, config.logo.max_size)
    });
    let footer_pdf =
        footer::render_footer(&request.contact, logo.as_deref(), font, &config.page)?;
    info!("Rendered footer in {:?}", started.elapsed());

    let started = Instant::now();
    let merged = merge::merge(&footer_pdf, &content)?;
    info!("Merged footer in {:?}", started.elapsed());
    Ok(merged)
}

/// Runs the pipeline and writes the PDF to `path`. Nothing is written on failure.
pub fn generate_report_to_file(
    request: &ReportRequest,
    config: &ReportConfig,
    path: impl AsRef<Path>,
) -> Result<(), ReportError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(ReportError::IoError {
                message: "Output directory does not exist".to_string(),
                path: parent.display().to_string(),
                suggestion: format!("Create the directory first: mkdir -p {}", parent.display()),
            });
        }
    }

    let bytes = generate_report(request, config)?;
    std::fs::write(path, bytes).map_err(|e| ReportError::IoError {
        message: e.to_string(),
        path: path.display().to_string(),
        suggestion: if e.kind() == std::io::ErrorKind::PermissionDenied {
            "Check that you have write permissions for this location".to_string()
        } else {
            "Try a different output path or check available disk space".to_string()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name("https://example.com/ilan/villa-42"),
            "villa-42.pdf"
        );
        assert_eq!(
            report_file_name("https://example.com/ilan/villa-42.html?ref=x"),
            "villa-42.pdf"
        );
        assert_eq!(report_file_name("https://example.com/"), DEFAULT_REPORT_NAME);
        assert_eq!(
            report_file_name("https://example.com/%2E%2E%2Fetc"),
            DEFAULT_REPORT_NAME
        );
    }

    #[test]
    fn test_request_defaults_from_config() {
        let mut config = ReportConfig::default();
        config.translation.target_language = "tr".to_string();
        config.translation.enabled = false;
        config.contact.phone = Some("555".to_string());
        let request = ReportRequest::new("https://example.com/a", &config);
        assert_eq!(request.target_language, "tr");
        assert!(!request.translate);
        assert_eq!(request.contact.phone.as_deref(), Some("555"));
        assert!(request.logo.is_none());
    }

    #[test]
    fn test_error_display_has_suggestion() {
        let err = ReportError::fetch_error("http://x.test", "connection refused");
        let text = err.to_string();
        assert!(text.contains("connection refused"));
        assert!(text.contains("http://x.test"));
        assert!(text.contains("Suggestion:"));
    }

    #[test]
    fn test_unreachable_listing_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.pdf");
        let mut config = ReportConfig::default();
        config.http.timeout_secs = 2;
        let request = ReportRequest::new("http://127.0.0.1:9/listing", &config);
        let err = generate_report_to_file(&request, &config, &out).unwrap_err();
        assert!(matches!(err, ReportError::FetchError { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_output_directory() {
        let config = ReportConfig::default();
        let request = ReportRequest::new("http://127.0.0.1:9/listing", &config);
        let err =
            generate_report_to_file(&request, &config, "/nonexistent/dir/out.pdf").unwrap_err();
        assert!(matches!(err, ReportError::IoError { .. }));
    }
}
