//! Configuration module for report layout, network access and site selectors.
//!
//! This module handles loading and parsing of the report configuration from TOML files.
//! Every key is optional: a missing or mistyped key keeps its built-in default, and a
//! file that is not valid TOML at all yields the complete default configuration.
//!
//! # Configuration Structure
//!
//! - `page` sets the page size in points (US Letter by default)
//! - `margin` controls the top, left and right margins of content pages
//! - `text` holds font sizes, leading and spacing for body text and headings
//! - `font` overrides the bundled DejaVu Sans with a TrueType file or system families
//! - `http` sets the timeout, user agent and whether gallery downloads run in parallel
//! - `translation` configures the target/source language and the provider endpoint
//! - `gallery` bounds the image thumbnails and the slot each image occupies on a page
//! - `logo` sets the upload folder and thumbnail size of the agent logo
//! - `selectors` lists the CSS selectors used to find listing sections
//! - `contact` provides default footer contact details
//!
//! # Configuration Example
//!
//! ```toml
//! [text]
//! body_size = 11
//! heading_size = 14
//!
//! [translation]
//! target = "en"
//!
//! [contact]
//! company_name = "Acme Realty"
//! phone = "+90 555 000 00 00"
//! ```
//!
//! The full default file is available through [`default_config_toml`].

use crate::model::{ContactField, ContactInfo};
use std::fs;
use std::path::{Path, PathBuf};
use toml::Value;

/// File name looked up in the working directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "listing2pdfrc.toml";

/// Configuration source for the report configuration.
/// Determines where the TOML configuration should be loaded from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    /// Use the built-in defaults
    Default,
    /// Load configuration from a file path
    File(&'a str),
    /// Use an in-memory TOML string
    Embedded(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for PageSettings {
    fn default() -> Self {
        PageSettings {
            width: 612.0,
            height: 792.0,
        }
    }
}

/// Content page margins. The bottom of a content page is reserved for the footer.
#[derive(Debug, Clone, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Margins {
            top: 72.0,
            left: 72.0,
            right: 72.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSettings {
    pub body_size: f32,
    pub body_leading: f32,
    pub heading_size: f32,
    pub heading_leading: f32,
    pub heading_after: f32,
    pub paragraph_after: f32,
    pub bullet_indent: f32,
}

impl Default for TextSettings {
    fn default() -> Self {
        TextSettings {
            body_size: 11.0,
            body_leading: 14.0,
            heading_size: 14.0,
            heading_leading: 16.0,
            heading_after: 8.0,
            paragraph_after: 6.0,
            bullet_indent: 12.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSettings {
    /// Explicit TrueType file, tried before any system family.
    pub path: Option<PathBuf>,
    /// System families tried in order. The bundled DejaVu Sans is used when none is
    /// set or found.
    pub families: Vec<String>,
}

impl Default for FontSettings {
    fn default() -> Self {
        FontSettings {
            path: None,
            families: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub parallel_downloads: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        HttpSettings {
            timeout_secs: 15,
            user_agent: concat!("listing2pdf/", env!("CARGO_PKG_VERSION")).to_string(),
            parallel_downloads: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranslationSettings {
    pub enabled: bool,
    pub target_language: String,
    pub source_language: String,
    pub endpoint: String,
    pub memoize: bool,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        TranslationSettings {
            enabled: true,
            target_language: "en".to_string(),
            source_language: "auto".to_string(),
            endpoint: "https://translate.googleapis.com/translate_a/single".to_string(),
            memoize: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GallerySettings {
    /// Thumbnail envelope in pixels.
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// Box an image is fitted into on the page, in points.
    pub slot_width: f32,
    pub slot_height: f32,
    pub spacing: f32,
    pub jpeg_quality: u8,
}

impl Default for GallerySettings {
    fn default() -> Self {
        GallerySettings {
            thumbnail_width: 400,
            thumbnail_height: 300,
            slot_width: 400.0,
            slot_height: 250.0,
            spacing: 12.0,
            jpeg_quality: 85,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogoSettings {
    pub upload_dir: PathBuf,
    pub max_size: u32,
}

impl Default for LogoSettings {
    fn default() -> Self {
        LogoSettings {
            upload_dir: PathBuf::from("static/uploads"),
            max_size: 100,
        }
    }
}

/// CSS selectors locating the listing sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Selectors {
    pub overview: String,
    pub overview_item: String,
    pub description: String,
    pub panel: String,
    pub panel_title: String,
    pub panel_body: String,
    pub detail_row: String,
    /// Gallery list items; the first image of each item is used.
    pub gallery_item: String,
    /// Panels whose title contains one of these (case-insensitive) are skipped.
    pub map_tokens: Vec<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        Selectors {
            overview: "div.single-overview-section.panel-group.property-panel".to_string(),
            overview_item: "ul.overview_element li".to_string(),
            description: "div.wpestate_property_description.property-panel".to_string(),
            panel: "div[class=\"panel panel-default\"]".to_string(),
            panel_title: "h4.panel-title".to_string(),
            panel_body: "div.panel-body".to_string(),
            detail_row: "div.listing_detail".to_string(),
            gallery_item: "li[data-target=\"#carousel-listing\"]".to_string(),
            map_tokens: vec!["harita".to_string(), "map".to_string()],
        }
    }
}

/// Complete configuration of one report run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportConfig {
    pub page: PageSettings,
    pub margin: Margins,
    pub text: TextSettings,
    pub font: FontSettings,
    pub http: HttpSettings,
    pub translation: TranslationSettings,
    pub gallery: GallerySettings,
    pub logo: LogoSettings,
    pub selectors: Selectors,
    pub contact: ContactInfo,
}

/// Reads a number that may be written as an integer or a float.
fn get_f32(section: Option<&Value>, key: &str, default: f32) -> f32 {
    section
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
        .map(|v| v as f32)
        .unwrap_or(default)
}

fn get_u32(section: Option<&Value>, key: &str, default: u32) -> u32 {
    section
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_integer())
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(default)
}

fn get_bool(section: Option<&Value>, key: &str, default: bool) -> bool {
    section
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

fn get_string(section: Option<&Value>, key: &str, default: &str) -> String {
    section
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| default.to_string())
}

fn get_string_list(section: Option<&Value>, key: &str, default: &[String]) -> Vec<String> {
    section
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_else(|| default.to_vec())
}

fn parse_contact(section: Option<&Value>) -> ContactInfo {
    let mut contact = ContactInfo::default();
    if let Some(table) = section.and_then(|s| s.as_table()) {
        for (key, value) in table {
            match (ContactField::from_key(key), value.as_str()) {
                (Some(field), Some(v)) => contact.set(field, v),
                _ => log::warn!("Ignoring unknown or non-string contact key '{}'", key),
            }
        }
    }
    contact
}

/// Parses the report configuration from a TOML string.
///
/// Unknown keys are ignored and known keys with the wrong type keep their default.
/// If the string is not valid TOML the default configuration is returned.
///
/// # Examples
/// ```rust
/// use listing2pdf::config::parse_config_string;
///
/// let config = parse_config_string(r#"
/// [text]
/// body_size = 12
///
/// [translation]
/// target = "de"
/// "#);
/// assert_eq!(config.text.body_size, 12.0);
/// assert_eq!(config.translation.target_language, "de");
/// assert_eq!(config.text.heading_size, 14.0);
/// ```
pub fn parse_config_string(config_str: &str) -> ReportConfig {
    let config: Value = match toml::from_str(config_str) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Invalid configuration, using defaults: {}", e);
            return ReportConfig::default();
        }
    };

    let defaults = ReportConfig::default();

    let page = config.get("page");
    let margin = config.get("margin");
    let text = config.get("text");
    let font = config.get("font");
    let http = config.get("http");
    let translation = config.get("translation");
    let gallery = config.get("gallery");
    let logo = config.get("logo");
    let selectors = config.get("selectors");

    ReportConfig {
        page: PageSettings {
            width: get_f32(page, "width", defaults.page.width),
            height: get_f32(page, "height", defaults.page.height),
        },
        margin: Margins {
            top: get_f32(margin, "top", defaults.margin.top),
            left: get_f32(margin, "left", defaults.margin.left),
            right: get_f32(margin, "right", defaults.margin.right),
        },
        text: TextSettings {
            body_size: get_f32(text, "body_size", defaults.text.body_size),
            body_leading: get_f32(text, "body_leading", defaults.text.body_leading),
            heading_size: get_f32(text, "heading_size", defaults.text.heading_size),
            heading_leading: get_f32(text, "heading_leading", defaults.text.heading_leading),
            heading_after: get_f32(text, "heading_after", defaults.text.heading_after),
            paragraph_after: get_f32(text, "paragraph_after", defaults.text.paragraph_after),
            bullet_indent: get_f32(text, "bullet_indent", defaults.text.bullet_indent),
        },
        font: FontSettings {
            path: font
                .and_then(|f| f.get("path"))
                .and_then(|v| v.as_str())
                .map(PathBuf::from),
            families: get_string_list(font, "families", &defaults.font.families),
        },
        http: HttpSettings {
            timeout_secs: get_timeout(http, defaults.http.timeout_secs),
            user_agent: get_string(http, "user_agent", &defaults.http.user_agent),
            parallel_downloads: get_bool(
                http,
                "parallel_downloads",
                defaults.http.parallel_downloads,
            ),
        },
        translation: TranslationSettings {
            enabled: get_bool(translation, "enabled", defaults.translation.enabled),
            target_language: get_string(
                translation,
                "target",
                &defaults.translation.target_language,
            ),
            source_language: get_string(
                translation,
                "source",
                &defaults.translation.source_language,
            ),
            endpoint: get_string(translation, "endpoint", &defaults.translation.endpoint),
            memoize: get_bool(translation, "memoize", defaults.translation.memoize),
        },
        gallery: GallerySettings {
            thumbnail_width: get_u32(
                gallery,
                "thumbnail_width",
                defaults.gallery.thumbnail_width,
            ),
            thumbnail_height: get_u32(
                gallery,
                "thumbnail_height",
                defaults.gallery.thumbnail_height,
            ),
            slot_width: get_f32(gallery, "slot_width", defaults.gallery.slot_width),
            slot_height: get_f32(gallery, "slot_height", defaults.gallery.slot_height),
            spacing: get_f32(gallery, "spacing", defaults.gallery.spacing),
            jpeg_quality: get_u32(
                gallery,
                "jpeg_quality",
                defaults.gallery.jpeg_quality as u32,
            )
            .clamp(1, 100) as u8,
        },
        logo: LogoSettings {
            upload_dir: logo
                .and_then(|l| l.get("upload_dir"))
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(defaults.logo.upload_dir),
            max_size: get_u32(logo, "max_size", defaults.logo.max_size),
        },
        selectors: Selectors {
            overview: get_string(selectors, "overview", &defaults.selectors.overview),
            overview_item: get_string(
                selectors,
                "overview_item",
                &defaults.selectors.overview_item,
            ),
            description: get_string(selectors, "description", &defaults.selectors.description),
            panel: get_string(selectors, "panel", &defaults.selectors.panel),
            panel_title: get_string(selectors, "panel_title", &defaults.selectors.panel_title),
            panel_body: get_string(selectors, "panel_body", &defaults.selectors.panel_body),
            detail_row: get_string(selectors, "detail_row", &defaults.selectors.detail_row),
            gallery_item: get_string(
                selectors,
                "gallery_item",
                &defaults.selectors.gallery_item,
            ),
            map_tokens: get_string_list(selectors, "map_tokens", &defaults.selectors.map_tokens),
        },
        contact: parse_contact(config.get("contact")),
    }
}

fn get_timeout(http: Option<&Value>, default: u64) -> u64 {
    http.and_then(|h| h.get("timeout_secs"))
        .and_then(|v| v.as_integer())
        .and_then(|i| u64::try_from(i).ok())
        .filter(|t| *t > 0)
        .unwrap_or(default)
}

/// Loads the report configuration from the given source.
///
/// An unreadable file falls back to the defaults, the same as invalid TOML.
///
/// # Examples
/// ```rust
/// use listing2pdf::config::{load_config_from_source, ConfigSource};
///
/// let config = load_config_from_source(ConfigSource::Default);
/// assert_eq!(config.page.height, 792.0);
///
/// let config = load_config_from_source(ConfigSource::Embedded("[margin]\ntop = 36"));
/// assert_eq!(config.margin.top, 36.0);
/// ```
pub fn load_config_from_source(source: ConfigSource) -> ReportConfig {
    match source {
        ConfigSource::Default => ReportConfig::default(),
        ConfigSource::File(path) => match fs::read_to_string(Path::new(path)) {
            Ok(s) => parse_config_string(&s),
            Err(e) => {
                log::warn!("Cannot read configuration '{}': {}", path, e);
                ReportConfig::default()
            }
        },
        ConfigSource::Embedded(content) => parse_config_string(content),
    }
}

/// Candidate configuration files in lookup order: working directory first, then the
/// per-user config directory.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("listing2pdf").join(CONFIG_FILE_NAME));
    }
    paths
}

/// Default configuration file with every key documented.
pub fn default_config_toml() -> String {
    let defaults = ReportConfig::default();
    let tokens = defaults
        .selectors
        .map_tokens
        .iter()
        .map(|f| format!("\"{}\"", f))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r##"# listing2pdf configuration
# Every key is optional. Remove a key to use its default.

[page]
# Page size in points (US Letter)
width = {page_w:.1}
height = {page_h:.1}

[margin]
# The bottom of each content page is reserved for the footer
top = {m_top:.1}
left = {m_left:.1}
right = {m_right:.1}

[text]
body_size = {body_size:.1}
body_leading = {body_leading:.1}
heading_size = {heading_size:.1}
heading_leading = {heading_leading:.1}
heading_after = {heading_after:.1}
paragraph_after = {paragraph_after:.1}
bullet_indent = {bullet_indent:.1}

[font]
# The bundled DejaVu Sans is used unless a file or an installed family is given
# path = "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf"
# families = ["Noto Sans", "Liberation Sans"]

[http]
timeout_secs = {timeout}
user_agent = "{user_agent}"
parallel_downloads = {parallel}

[translation]
enabled = {tr_enabled}
target = "{tr_target}"
source = "{tr_source}"
endpoint = "{tr_endpoint}"
memoize = {tr_memoize}

[gallery]
thumbnail_width = {thumb_w}
thumbnail_height = {thumb_h}
slot_width = {slot_w:.1}
slot_height = {slot_h:.1}
spacing = {spacing:.1}
jpeg_quality = {quality}

[logo]
upload_dir = "{upload_dir}"
max_size = {logo_size}

[selectors]
overview = "{sel_overview}"
overview_item = "{sel_overview_item}"
description = "{sel_description}"
panel = '{sel_panel}'
panel_title = "{sel_panel_title}"
panel_body = "{sel_panel_body}"
detail_row = "{sel_detail_row}"
gallery_item = '{sel_gallery}'
map_tokens = [{tokens}]

[contact]
# company_name = "Acme Realty"
# agent_name = "Jane Doe"
# address = "1 Main Street\nIstanbul"
# phone = "+90 555 000 00 00"
# email = "agent@example.com"
# map_link = "https://maps.google.com/?q=..."
# whatsapp_link = "https://wa.me/905550000000"
# website_link = "https://example.com"
# telegram_link = "https://t.me/example"
# instagram_link = "https://instagram.com/example"
"##,
        page_w = defaults.page.width,
        page_h = defaults.page.height,
        m_top = defaults.margin.top,
        m_left = defaults.margin.left,
        m_right = defaults.margin.right,
        body_size = defaults.text.body_size,
        body_leading = defaults.text.body_leading,
        heading_size = defaults.text.heading_size,
        heading_leading = defaults.text.heading_leading,
        heading_after = defaults.text.heading_after,
        paragraph_after = defaults.text.paragraph_after,
        bullet_indent = defaults.text.bullet_indent,
        timeout = defaults.http.timeout_secs,
        user_agent = defaults.http.user_agent,
        parallel = defaults.http.parallel_downloads,
        tr_enabled = defaults.translation.enabled,
        tr_target = defaults.translation.target_language,
        tr_source = defaults.translation.source_language,
        tr_endpoint = defaults.translation.endpoint,
        tr_memoize = defaults.translation.memoize,
        thumb_w = defaults.gallery.thumbnail_width,
        thumb_h = defaults.gallery.thumbnail_height,
        slot_w = defaults.gallery.slot_width,
        slot_h = defaults.gallery.slot_height,
        spacing = defaults.gallery.spacing,
        quality = defaults.gallery.jpeg_quality,
        upload_dir = defaults.logo.upload_dir.display(),
        logo_size = defaults.logo.max_size,
        sel_overview = defaults.selectors.overview,
        sel_overview_item = defaults.selectors.overview_item,
        sel_description = defaults.selectors.description,
        sel_panel = defaults.selectors.panel,
        sel_panel_title = defaults.selectors.panel_title,
        sel_panel_body = defaults.selectors.panel_body,
        sel_detail_row = defaults.selectors.detail_row,
        sel_gallery = defaults.selectors.gallery_item,
        tokens = tokens,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_toml_yields_defaults() {
        let config = parse_config_string("this is [not toml");
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn test_integer_and_float_numbers() {
        let config = parse_config_string(
            r#"
            [margin]
            top = 36
            left = 50.5
        "#,
        );
        assert_eq!(config.margin.top, 36.0);
        assert_eq!(config.margin.left, 50.5);
        assert_eq!(config.margin.right, 72.0);
    }

    #[test]
    fn test_wrong_type_keeps_default() {
        let config = parse_config_string(
            r#"
            [text]
            body_size = "large"
            [http]
            timeout_secs = -3
        "#,
        );
        assert_eq!(config.text.body_size, 11.0);
        assert_eq!(config.http.timeout_secs, 15);
    }

    #[test]
    fn test_contact_section() {
        let config = parse_config_string(
            r#"
            [contact]
            company_name = "Acme"
            whatsapp_link = "https://wa.me/1"
            fax = "ignored"
        "#,
        );
        assert_eq!(config.contact.get(ContactField::CompanyName), Some("Acme"));
        assert_eq!(
            config.contact.get(ContactField::WhatsappLink),
            Some("https://wa.me/1")
        );
        assert_eq!(config.contact.populated().count(), 2);
    }

    #[test]
    fn test_selectors_and_tokens() {
        let config = parse_config_string(
            r#"
            [selectors]
            panel = "section.panel"
            map_tokens = ["Karte"]
        "#,
        );
        assert_eq!(config.selectors.panel, "section.panel");
        assert_eq!(config.selectors.map_tokens, vec!["Karte".to_string()]);
        assert_eq!(config.selectors.detail_row, "div.listing_detail");
    }

    #[test]
    fn test_memoization_is_opt_in() {
        assert!(!ReportConfig::default().translation.memoize);
        let config = parse_config_string("[translation]\nmemoize = true");
        assert!(config.translation.memoize);
    }

    #[test]
    fn test_default_font_is_bundled() {
        let font = ReportConfig::default().font;
        assert!(font.path.is_none());
        assert!(font.families.is_empty());
    }

    #[test]
    fn test_jpeg_quality_is_clamped() {
        let config = parse_config_string("[gallery]\njpeg_quality = 500");
        assert_eq!(config.gallery.jpeg_quality, 100);
    }

    #[test]
    fn test_default_config_toml_round_trips() {
        let config = parse_config_string(&default_config_toml());
        assert_eq!(config, ReportConfig::default());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config_from_source(ConfigSource::File("/nonexistent/listing2pdfrc.toml"));
        assert_eq!(config, ReportConfig::default());
    }
}
