//! Listing page extraction.
//!
//! Turns one listing page into ordered [`ContentBlock`]s and gallery
//! [`ImageReference`]s. Sections are read in a fixed order (overview, description,
//! detail panels) using the CSS selectors from [`Selectors`]. Every lookup is
//! best-effort: a missing section or a selector that does not parse contributes
//! nothing. Only fetching the page can fail.

use crate::config::Selectors;
use crate::http;
use crate::model::{ContentBlock, ImageReference};
use crate::ReportError;
use log::{debug, warn};
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Space after each heading, in points.
pub const HEADING_SPACING: f32 = 6.0;
/// Space after each bullet or detail row, in points.
pub const LINE_SPACING: f32 = 4.0;

/// Fetches and extracts listing pages.
pub struct ListingExtractor {
    client: Client,
    selectors: Selectors,
}

impl ListingExtractor {
    pub fn new(client: Client, selectors: Selectors) -> Self {
        ListingExtractor { client, selectors }
    }

    /// Downloads the page once and extracts both text blocks and gallery images.
    pub fn extract(
        &self,
        url: &str,
    ) -> Result<(Vec<ContentBlock>, Vec<ImageReference>), ReportError> {
        let html = http::get_text(&self.client, url).map_err(|e| ReportError::FetchError {
            url: url.to_string(),
            message: e.to_string(),
            suggestion: if e.is_timeout() {
                "The site did not answer in time; raise http.timeout_secs or retry later"
                    .to_string()
            } else if e.is_status() {
                "Check that the listing URL is correct and still online".to_string()
            } else {
                "Check your network connection and the listing URL".to_string()
            },
        })?;
        debug!("Fetched {} bytes from {}", html.len(), url);

        let blocks = extract_blocks(&html, &self.selectors);
        let images = extract_images(&html, url, &self.selectors);
        if blocks.is_empty() {
            warn!("No listing content found at {}", url);
        }
        Ok((blocks, images))
    }
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(_) => {
            warn!("Ignoring invalid selector '{}'", css);
            None
        }
    }
}

/// Visible text of an element with whitespace collapsed.
fn element_text(el: &ElementRef) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_heading(blocks: &mut Vec<ContentBlock>, text: String) {
    blocks.push(ContentBlock::heading(text));
    blocks.push(ContentBlock::spacing(HEADING_SPACING));
}

fn push_line(blocks: &mut Vec<ContentBlock>, block: ContentBlock) {
    blocks.push(block);
    blocks.push(ContentBlock::spacing(LINE_SPACING));
}

/// Extracts text blocks in section order: overview, description, then detail panels.
pub fn extract_blocks(html: &str, selectors: &Selectors) -> Vec<ContentBlock> {
    let document = Html::parse_document(html);
    let mut blocks = Vec::new();
    extract_overview(&document, selectors, &mut blocks);
    extract_description(&document, selectors, &mut blocks);
    extract_panels(&document, selectors, &mut blocks);
    blocks
}

fn extract_overview(document: &Html, selectors: &Selectors, blocks: &mut Vec<ContentBlock>) {
    let (Some(section), Some(title), Some(item)) = (
        selector(&selectors.overview),
        selector(&selectors.panel_title),
        selector(&selectors.overview_item),
    ) else {
        return;
    };
    let Some(overview) = document.select(&section).next() else {
        debug!("No overview section");
        return;
    };

    if let Some(heading) = overview.select(&title).next() {
        let text = element_text(&heading);
        if !text.is_empty() {
            push_heading(blocks, text);
        }
    }
    for li in overview.select(&item) {
        let text = element_text(&li);
        if !text.is_empty() {
            push_line(blocks, ContentBlock::bullet(text));
        }
    }
}

const DESCRIPTION_ELEMENTS: &str = "h1, h2, h3, h4, h5, h6, p, ul, ol, hr";

fn extract_description(document: &Html, selectors: &Selectors, blocks: &mut Vec<ContentBlock>) {
    let (Some(section), Some(elements)) = (
        selector(&selectors.description),
        selector(DESCRIPTION_ELEMENTS),
    ) else {
        return;
    };
    let Some(description) = document.select(&section).next() else {
        debug!("No description section");
        return;
    };

    for el in description.select(&elements) {
        // Nested matches are rendered by their enclosing element.
        let nested = el
            .ancestors()
            .take_while(|node| node.id() != description.id())
            .filter_map(ElementRef::wrap)
            .any(|a| matches!(a.value().name(), "p" | "ul" | "ol" | "li"));
        if nested {
            continue;
        }

        match el.value().name() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let text = element_text(&el);
                if !text.is_empty() {
                    push_heading(blocks, text);
                }
            }
            "p" => {
                let text = element_text(&el);
                if !text.is_empty() {
                    blocks.push(ContentBlock::paragraph(text));
                }
            }
            "ul" | "ol" => {
                for li in el
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| c.value().name() == "li")
                {
                    let text = element_text(&li);
                    if !text.is_empty() {
                        push_line(blocks, ContentBlock::bullet(text));
                    }
                }
            }
            "hr" => blocks.push(ContentBlock::spacing(HEADING_SPACING * 2.0)),
            _ => {}
        }
    }
}

/// True when a panel title names a map panel.
pub fn is_map_panel(title: &str, tokens: &[String]) -> bool {
    let title = title.to_lowercase();
    tokens
        .iter()
        .filter(|t| !t.trim().is_empty())
        .any(|t| title.contains(&t.trim().to_lowercase()))
}

fn extract_panels(document: &Html, selectors: &Selectors, blocks: &mut Vec<ContentBlock>) {
    let (Some(panel), Some(title), Some(body), Some(row), Some(strong)) = (
        selector(&selectors.panel),
        selector(&selectors.panel_title),
        selector(&selectors.panel_body),
        selector(&selectors.detail_row),
        selector("strong"),
    ) else {
        return;
    };

    let panels: Vec<ElementRef> = document.select(&panel).collect();
    // The structurally last panel is never part of the listing details.
    let eligible = panels.len().saturating_sub(1);

    for p in panels.iter().take(eligible) {
        let Some(heading) = p.select(&title).next().map(|h| element_text(&h)) else {
            continue;
        };
        if heading.is_empty() {
            continue;
        }
        if is_map_panel(&heading, &selectors.map_tokens) {
            debug!("Skipping map panel '{}'", heading);
            continue;
        }

        push_heading(blocks, heading);
        for body in p.select(&body) {
            for detail in body.select(&row) {
                if let Some(line) = detail_line(&detail, &strong) {
                    push_line(blocks, line);
                }
            }
        }
    }
}

/// One detail row: the `<strong>` lead is the label, the remaining text the value.
fn detail_line(row: &ElementRef, strong: &Selector) -> Option<ContentBlock> {
    let full = element_text(row);
    if full.is_empty() {
        return None;
    }
    let Some(lead) = row.select(strong).next() else {
        return Some(ContentBlock::labeled("", full));
    };

    let label_raw = element_text(&lead);
    let label = label_raw.trim().trim_end_matches(':').trim().to_string();
    let rest = full.replacen(label_raw.as_str(), "", 1);
    let value = rest
        .trim()
        .trim_start_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    Some(ContentBlock::labeled(label, value))
}

/// Maps a thumbnail URL to its full-size original.
///
/// `.../photo-300x200.jpg` becomes `.../photo.jpg`. Returns `None` when the file name
/// does not follow the `<base>-<suffix>.<ext>` pattern.
pub fn full_size_image_src(src: &str) -> Option<String> {
    let path_end = src.find(['?', '#']).unwrap_or(src.len());
    let path = &src[..path_end];
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let (dir, file) = path.split_at(name_start);

    let (base, suffix) = file.rsplit_once('-')?;
    let (_, ext) = suffix.rsplit_once('.')?;
    if base.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!("{}{}.{}", dir, base, ext))
}

/// Extracts gallery image URLs in document order, resolved against `page_url`.
pub fn extract_images(html: &str, page_url: &str, selectors: &Selectors) -> Vec<ImageReference> {
    let (Some(item), Some(img)) = (selector(&selectors.gallery_item), selector("img")) else {
        return Vec::new();
    };
    let base = match Url::parse(page_url) {
        Ok(u) => u,
        Err(e) => {
            warn!("Cannot resolve images against '{}': {}", page_url, e);
            return Vec::new();
        }
    };

    let document = Html::parse_document(html);
    document
        .select(&item)
        .filter_map(|li| li.select(&img).next())
        .filter_map(|el| el.value().attr("src"))
        .filter_map(|src| {
            let rewritten = full_size_image_src(src.trim());
            if rewritten.is_none() {
                debug!("Skipping gallery image without size suffix: {}", src);
            }
            rewritten
        })
        .filter_map(|src| base.join(&src).ok())
        .map(|u| ImageReference::new(u.to_string()))
        .collect()
}
