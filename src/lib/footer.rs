//! The single-page footer overlay.
//!
//! The footer is laid out at fixed coordinates: a logo cell in the bottom-left corner,
//! an information column with `Label: value` lines and a links column whose entries are
//! clickable. A divider line closes the band at the top. The band height depends on how
//! many lines the columns need, see [`FooterLayout::compute`].

use crate::config::PageSettings;
use crate::fonts::ReportFont;
use crate::images;
use crate::layout::wrap_text;
use crate::model::{ContactField, ContactInfo};
use crate::pdf::PdfWriter;
use crate::ReportError;
use log::debug;
use std::path::Path;

pub const FONT_SIZE: f32 = 8.0;
pub const LINE_STEP: f32 = 10.8;
pub const BOTTOM: f32 = 36.0;
pub const LOGO_X: f32 = 36.0;
pub const LOGO_SIZE: f32 = 57.6;
pub const INFO_X: f32 = 129.6;
pub const LINKS_X: f32 = 324.0;
pub const DIVIDER_LEFT: f32 = 36.0;
pub const DIVIDER_RIGHT: f32 = 540.0;
const DIVIDER_GAP: f32 = 21.6;
const TOP_PADDING: f32 = 10.8;
const COLUMN_GAP: f32 = 14.4;
const ADDRESS_INDENT: f32 = 7.2;
const LINK_HALF_HEIGHT: f32 = 5.0;
const UNDERLINE_OFFSET: f32 = 1.0;
const LINK_BLUE: (f32, f32, f32) = (0.0, 0.0, 1.0);

/// One wrapped line of the information column.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoLine {
    pub text: String,
    pub indent: f32,
}

/// One entry of the links column.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterLink {
    pub label: &'static str,
    pub url: String,
    pub width: f32,
}

/// Measured footer content and the band geometry derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct FooterLayout {
    pub info_lines: Vec<InfoLine>,
    pub links: Vec<FooterLink>,
    pub body_height: f32,
    /// Baseline of the first line in both columns.
    pub base_y: f32,
    pub divider_y: f32,
    /// Space the content pages must leave free at the bottom.
    pub height: f32,
}

impl FooterLayout {
    pub fn compute(contact: &ContactInfo, font: &ReportFont) -> Self {
        let info_width = LINKS_X - INFO_X - COLUMN_GAP;
        let mut info_lines = Vec::new();
        let mut links = Vec::new();

        for (field, value) in contact.populated() {
            if let Some(label) = field.link_label() {
                links.push(FooterLink {
                    label,
                    url: value.to_string(),
                    width: font.text_width(label, FONT_SIZE),
                });
                continue;
            }
            if field == ContactField::Address {
                info_lines.push(InfoLine {
                    text: format!("{}:", field.display_label()),
                    indent: 0.0,
                });
                for part in value.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    for line in wrap_text(font, part, FONT_SIZE, info_width - ADDRESS_INDENT, 0.0)
                    {
                        info_lines.push(InfoLine {
                            text: line,
                            indent: ADDRESS_INDENT,
                        });
                    }
                }
                continue;
            }
            let text = format!("{}: {}", field.display_label(), value);
            for line in wrap_text(font, &text, FONT_SIZE, info_width, 0.0) {
                info_lines.push(InfoLine { text: line, indent: 0.0 });
            }
        }

        let lines = info_lines.len().max(links.len());
        let body_height = LOGO_SIZE.max(lines as f32 * LINE_STEP);
        let base_y = BOTTOM + body_height;
        let divider_y = base_y + DIVIDER_GAP;
        FooterLayout {
            info_lines,
            links,
            body_height,
            base_y,
            divider_y,
            height: divider_y + TOP_PADDING,
        }
    }
}

/// Height of the footer band for `contact`.
pub fn footer_height(contact: &ContactInfo, font: &ReportFont) -> f32 {
    FooterLayout::compute(contact, font).height
}

/// Renders the footer as a one-page PDF.
///
/// A logo that cannot be read is left out; the rest of the footer is still drawn.
pub fn render_footer(
    contact: &ContactInfo,
    logo_path: Option<&Path>,
    font: &ReportFont,
    page: &PageSettings,
) -> Result<Vec<u8>, ReportError> {
    let layout = FooterLayout::compute(contact, font);
    debug!(
        "Footer: {} info lines, {} links, height {:.1}pt",
        layout.info_lines.len(),
        layout.links.len(),
        layout.height
    );

    let mut writer = PdfWriter::new(font, page.width, page.height);
    let logo = logo_path
        .and_then(images::load_logo)
        .map(|img| (img.width, img.height, writer.add_image(&img)));

    let mut canvas = writer.begin_page();

    if let Some((w, h, id)) = logo {
        let scale = (LOGO_SIZE / w.max(1) as f32).min(LOGO_SIZE / h.max(1) as f32);
        canvas.image(id, LOGO_X, BOTTOM, w as f32 * scale, h as f32 * scale);
    }

    let mut y = layout.base_y;
    for line in &layout.info_lines {
        canvas.text(INFO_X + line.indent, y, FONT_SIZE, &line.text, false);
        y -= LINE_STEP;
    }

    if !layout.links.is_empty() {
        let (r, g, b) = LINK_BLUE;
        canvas.set_color(r, g, b);
        let mut y = layout.base_y;
        for link in &layout.links {
            canvas.text(LINKS_X, y, FONT_SIZE, link.label, false);
            canvas.line(
                LINKS_X,
                y - UNDERLINE_OFFSET,
                LINKS_X + link.width,
                y - UNDERLINE_OFFSET,
                0.5,
            );
            canvas.link(
                [
                    LINKS_X,
                    y - LINK_HALF_HEIGHT,
                    LINKS_X + link.width,
                    y + LINK_HALF_HEIGHT,
                ],
                &link.url,
            );
            y -= LINE_STEP;
        }
        canvas.set_color(0.0, 0.0, 0.0);
    }

    canvas.line(
        DIVIDER_LEFT,
        layout.divider_y,
        DIVIDER_RIGHT,
        layout.divider_y,
        1.0,
    );
    canvas
        .finish()
        .map_err(|e| ReportError::pdf_error(format!("Failed to draw the footer page: {}", e)))?;

    writer
        .finish()
        .map_err(|e| ReportError::pdf_error(format!("Failed to write the footer document: {}", e)))
}
