//! Gallery image loading and agent logo preparation.
//!
//! Gallery images are downloaded, normalised to RGB, shrunk into the configured
//! thumbnail envelope and re-encoded as JPEG so they can be embedded directly. A failed
//! image is skipped; it never fails the report.
//!
//! The uploaded logo is stored as a small PNG in the upload folder and later read back
//! by the footer renderer, keeping its transparency.
//!
//! # Example
//!
//! ```rust
//! use listing2pdf::images::ImageSource;
//!
//! assert_eq!(
//!     ImageSource::parse("https://example.com/a.jpg"),
//!     ImageSource::Remote("https://example.com/a.jpg".to_string())
//! );
//! assert!(matches!(ImageSource::parse("./logo.png"), ImageSource::Local(_)));
//! ```

use crate::config::GallerySettings;
use crate::http;
use crate::model::ImageReference;
use crate::pdf::{ImageData, PdfImage};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use log::{debug, warn};
use rayon::prelude::*;
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the normalised logo inside the upload folder.
pub const LOGO_FILE_NAME: &str = "logo.png";

/// Error types for image operations.
#[derive(Debug)]
pub enum ImageError {
    /// Failed to load image from local filesystem
    LoadError(String),
    /// Failed to download image from remote URL
    DownloadError(String),
    /// The bytes are not a decodable image
    DecodeError(String),
    /// Re-encoding or saving the processed image failed
    EncodeError(String),
}

impl std::fmt::Display for ImageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageError::LoadError(e) => write!(f, "Failed to load image: {}", e),
            ImageError::DownloadError(e) => write!(f, "Failed to download image: {}", e),
            ImageError::DecodeError(e) => write!(f, "Failed to decode image: {}", e),
            ImageError::EncodeError(e) => write!(f, "Failed to encode image: {}", e),
        }
    }
}

impl std::error::Error for ImageError {}

/// Where image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(String),
    Local(PathBuf),
}

impl ImageSource {
    pub fn parse(url_or_path: &str) -> ImageSource {
        if url_or_path.starts_with("http://") || url_or_path.starts_with("https://") {
            ImageSource::Remote(url_or_path.to_string())
        } else {
            ImageSource::Local(PathBuf::from(url_or_path))
        }
    }
}

/// Loads image bytes from URLs or local paths with a shared HTTP client.
pub struct ImageLoader {
    client: Client,
}

impl ImageLoader {
    pub fn new(client: Client) -> Self {
        ImageLoader { client }
    }

    /// Reads the raw bytes of an image.
    pub fn load(&self, url_or_path: &str) -> Result<Vec<u8>, ImageError> {
        match ImageSource::parse(url_or_path) {
            ImageSource::Remote(url) => {
                debug!("[ImageLoader] Downloading {}", url);
                http::get_bytes(&self.client, &url)
                    .map_err(|e| ImageError::DownloadError(format!("{}: {}", url, e)))
            }
            ImageSource::Local(path) => fs::read(&path).map_err(|e| {
                ImageError::LoadError(format!("Failed to read file {}: {}", path.display(), e))
            }),
        }
    }

    /// Downloads and normalises one gallery image.
    pub fn load_gallery_image(
        &self,
        url: &str,
        settings: &GallerySettings,
    ) -> Result<PdfImage, ImageError> {
        let bytes = self.load(url)?;
        normalize_gallery_image(&bytes, settings)
    }

    /// Loads every gallery image, dropping the ones that fail. Order is preserved.
    pub fn load_gallery(
        &self,
        images: &[ImageReference],
        settings: &GallerySettings,
        parallel: bool,
    ) -> Vec<PdfImage> {
        let load = |image: &ImageReference| match self.load_gallery_image(&image.url, settings) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("Skipping gallery image {}: {}", image.url, e);
                None
            }
        };
        let loaded: Vec<Option<PdfImage>> = if parallel {
            images.par_iter().map(load).collect()
        } else {
            images.iter().map(load).collect()
        };
        loaded.into_iter().flatten().collect()
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(bytes).map_err(|e| ImageError::DecodeError(e.to_string()))
}

/// Shrinks an image into `max_w` x `max_h`, keeping the aspect ratio. Never enlarges.
fn fit_within(img: DynamicImage, max_w: u32, max_h: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w > max_w || h > max_h {
        img.thumbnail(max_w.max(1), max_h.max(1))
    } else {
        img
    }
}

/// Converts arbitrary image bytes into an RGB JPEG inside the thumbnail envelope.
pub fn normalize_gallery_image(
    bytes: &[u8],
    settings: &GallerySettings,
) -> Result<PdfImage, ImageError> {
    let img = fit_within(
        decode(bytes)?,
        settings.thumbnail_width,
        settings.thumbnail_height,
    );
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, settings.jpeg_quality)
        .encode_image(&rgb)
        .map_err(|e| ImageError::EncodeError(e.to_string()))?;

    Ok(PdfImage {
        width,
        height,
        data: ImageData::Jpeg(jpeg),
    })
}

/// Stores the uploaded logo as `logo.png` in `upload_dir`, shrunk to `max_size`.
///
/// Returns `None` when the upload cannot be decoded or written; the report is then
/// produced without a logo.
pub fn prepare_logo(source: &Path, upload_dir: &Path, max_size: u32) -> Option<PathBuf> {
    match store_logo(source, upload_dir, max_size) {
        Ok(path) => {
            debug!("Logo stored at {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Logo processing failed for {}: {}", source.display(), e);
            None
        }
    }
}

fn store_logo(source: &Path, upload_dir: &Path, max_size: u32) -> Result<PathBuf, ImageError> {
    let bytes = fs::read(source).map_err(|e| {
        ImageError::LoadError(format!("Failed to read file {}: {}", source.display(), e))
    })?;
    let logo = fit_within(decode(&bytes)?, max_size, max_size);
    fs::create_dir_all(upload_dir).map_err(|e| {
        ImageError::EncodeError(format!(
            "Cannot create upload folder {}: {}",
            upload_dir.display(),
            e
        ))
    })?;
    let target = upload_dir.join(LOGO_FILE_NAME);
    logo.save_with_format(&target, image::ImageFormat::Png)
        .map_err(|e| ImageError::EncodeError(e.to_string()))?;
    Ok(target)
}

/// Reads a logo for embedding, keeping an alpha channel when it has transparency.
pub fn load_logo(path: &Path) -> Option<PdfImage> {
    let img = fs::read(path)
        .map_err(|e| ImageError::LoadError(e.to_string()))
        .and_then(|bytes| decode(&bytes));
    let img = match img {
        Ok(img) => img,
        Err(e) => {
            warn!("Cannot use logo {}: {}", path.display(), e);
            return None;
        }
    };

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        pixels.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }
    let alpha = if alpha.iter().any(|a| *a < 255) {
        Some(alpha)
    } else {
        None
    };

    Some(PdfImage {
        width,
        height,
        data: ImageData::Rgb { pixels, alpha },
    })
}
