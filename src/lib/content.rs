//! Content document rendering.
//!
//! Blocks are planned into pages by [`crate::layout::plan_pages`] with the footer band
//! reserved at the bottom of every page, then drawn with the report font. Gallery images
//! follow the text on their own pages. The output carries no footer; the merge step
//! adds it afterwards.

use crate::config::ReportConfig;
use crate::fonts::ReportFont;
use crate::images::ImageLoader;
use crate::layout::{plan_pages, Fragment, ImageSize, Marker, PageGeometry, Placed, TextRole};
use crate::model::{ContentBlock, ImageReference};
use crate::pdf::{PageCanvas, PdfImage, PdfWriter};
use crate::ReportError;
use log::{debug, info};

const BULLET: &str = "\u{2022}";

/// Renders listing content into the body document.
pub struct ContentRenderer<'a> {
    config: &'a ReportConfig,
    font: &'a ReportFont,
    loader: &'a ImageLoader,
}

impl<'a> ContentRenderer<'a> {
    pub fn new(config: &'a ReportConfig, font: &'a ReportFont, loader: &'a ImageLoader) -> Self {
        ContentRenderer {
            config,
            font,
            loader,
        }
    }

    /// Downloads the gallery and renders every page.
    ///
    /// Images that cannot be fetched or decoded are left out.
    pub fn render_content(
        &self,
        blocks: &[ContentBlock],
        images: &[ImageReference],
        footer_height: f32,
    ) -> Result<Vec<u8>, ReportError> {
        let gallery = self.loader.load_gallery(
            images,
            &self.config.gallery,
            self.config.http.parallel_downloads,
        );
        info!(
            "Gallery: {} of {} images loaded",
            gallery.len(),
            images.len()
        );
        render_pages(blocks, &gallery, footer_height, self.config, self.font)
    }
}

/// Lays out and draws already-loaded content.
pub fn render_pages(
    blocks: &[ContentBlock],
    gallery: &[PdfImage],
    footer_height: f32,
    config: &ReportConfig,
    font: &ReportFont,
) -> Result<Vec<u8>, ReportError> {
    let geometry = PageGeometry::new(&config.page, &config.margin);
    let sizes: Vec<ImageSize> = gallery
        .iter()
        .map(|img| ImageSize {
            width: img.width,
            height: img.height,
        })
        .collect();
    let plan = plan_pages(
        blocks,
        &sizes,
        footer_height,
        &geometry,
        &config.text,
        &config.gallery,
        font,
    );
    debug!(
        "Content budget {:.1}pt per page, {} pages planned",
        geometry.max_content_height(footer_height),
        plan.page_count()
    );

    let mut writer = PdfWriter::new(font, geometry.width, geometry.height);
    let image_ids: Vec<_> = gallery.iter().map(|img| writer.add_image(img)).collect();

    for page in &plan.pages {
        let mut canvas = writer.begin_page();
        for placed in page {
            let painter = FragmentPainter {
                geometry: &geometry,
                config,
            };
            match &placed.fragment {
                Fragment::Text { .. } => painter.text(&mut canvas, placed),
                Fragment::Image {
                    index,
                    width,
                    height,
                } => {
                    if let Some(id) = image_ids.get(*index) {
                        let top = geometry.content_top() - placed.top;
                        let x = geometry.margin_left + (geometry.content_width() - width) / 2.0;
                        let y = top - (config.gallery.slot_height + height) / 2.0;
                        canvas.image(*id, x, y, *width, *height);
                    }
                }
            }
        }
        canvas
            .finish()
            .map_err(|e| ReportError::pdf_error(format!("Failed to draw a content page: {}", e)))?;
    }

    writer
        .finish()
        .map_err(|e| ReportError::pdf_error(format!("Failed to write the content document: {}", e)))
}

struct FragmentPainter<'a> {
    geometry: &'a PageGeometry,
    config: &'a ReportConfig,
}

impl FragmentPainter<'_> {
    fn text(&self, canvas: &mut PageCanvas<'_, '_>, placed: &Placed) {
        let Fragment::Text {
            role,
            marker,
            hanging,
            lines,
        } = &placed.fragment
        else {
            return;
        };
        let t = &self.config.text;
        let (size, leading, bold) = match role {
            TextRole::Heading => (t.heading_size, t.heading_leading, true),
            TextRole::Body => (t.body_size, t.body_leading, false),
        };
        let left = self.geometry.margin_left;
        let top = self.geometry.content_top() - placed.top;

        let indent = if *hanging || *marker == Marker::Bullet {
            t.bullet_indent
        } else {
            0.0
        };

        for (i, line) in lines.iter().enumerate() {
            let baseline = top - size - i as f32 * leading;
            let mut x = left + indent;
            if i == 0 {
                match marker {
                    Marker::Bullet => canvas.text(left, baseline, size, BULLET, false),
                    Marker::Label(label) => {
                        canvas.text(left, baseline, size, label, true);
                        let font = canvas.font();
                        x += font.text_width(label, size) + font.text_width(" ", size);
                    }
                    Marker::None => {}
                }
            }
            canvas.text(x, baseline, size, line, bold);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::ImageData;
    use lopdf::content::Content;
    use lopdf::Document;

    fn operators(doc: &Document, page_no: u32) -> Vec<String> {
        let page_id = *doc.get_pages().get(&page_no).unwrap();
        Content::decode(&doc.get_page_content(page_id).unwrap())
            .unwrap()
            .operations
            .into_iter()
            .map(|o| o.operator)
            .collect()
    }

    fn jpeg(width: u32, height: u32) -> PdfImage {
        let rgb = image::RgbImage::from_pixel(width, height, image::Rgb([200, 10, 10]));
        let mut bytes = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut bytes)
            .encode_image(&rgb)
            .unwrap();
        PdfImage {
            width,
            height,
            data: ImageData::Jpeg(bytes),
        }
    }

    #[test]
    fn test_empty_content_has_one_blank_page() {
        let config = ReportConfig::default();
        let bytes = render_pages(&[], &[], 126.0, &config, &ReportFont::embedded().unwrap()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert!(!operators(&doc, 1).iter().any(|o| o == "Tj"));
    }

    #[test]
    fn test_labeled_line_draws_bold_label() {
        let config = ReportConfig::default();
        let blocks = vec![
            ContentBlock::heading("Details"),
            ContentBlock::spacing(6.0),
            ContentBlock::labeled("Price", "250,000"),
            ContentBlock::bullet("Sea view"),
        ];
        let bytes = render_pages(&blocks, &[], 126.0, &config, &ReportFont::embedded().unwrap()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let ops = operators(&doc, 1);
        // Heading, label, value, bullet marker, bullet text.
        assert_eq!(ops.iter().filter(|o| *o == "Tj").count(), 5);
        assert_eq!(ops.iter().filter(|o| *o == "Tr").count(), 2);
    }

    #[test]
    fn test_gallery_follows_text_on_new_page() {
        let config = ReportConfig::default();
        let blocks = vec![ContentBlock::paragraph("A bright flat near the coast.")];
        let gallery = vec![jpeg(40, 30), jpeg(30, 40), jpeg(20, 20)];
        let bytes =
            render_pages(&blocks, &gallery, 126.0, &config, &ReportFont::embedded().unwrap()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        assert!(!operators(&doc, 1).iter().any(|o| o == "Do"));
        assert_eq!(operators(&doc, 2).iter().filter(|o| *o == "Do").count(), 2);
        assert_eq!(operators(&doc, 3).iter().filter(|o| *o == "Do").count(), 1);
    }

    #[test]
    fn test_long_content_respects_footer_budget() {
        let config = ReportConfig::default();
        let blocks: Vec<ContentBlock> = (0..120)
            .map(|i| ContentBlock::bullet(format!("Feature number {}", i)))
            .collect();
        let font = ReportFont::embedded().unwrap();
        let small_footer = render_pages(&blocks, &[], 126.0, &config, &font).unwrap();
        let tall_footer = render_pages(&blocks, &[], 300.0, &config, &font).unwrap();
        let small = Document::load_mem(&small_footer).unwrap().get_pages().len();
        let tall = Document::load_mem(&tall_footer).unwrap().get_pages().len();
        assert!(tall > small);
    }
}
