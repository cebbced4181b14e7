//! Text measurement and the footer-aware page budget.
//!
//! Blocks are word-wrapped with real font metrics and stacked top-down. The usable height
//! of a content page is `page height - footer height - top margin`; whenever the next
//! piece would overflow it a page break is taken and the running height resets.

use crate::config::{GallerySettings, Margins, PageSettings, TextSettings};
use crate::fonts::ReportFont;
use crate::model::ContentBlock;

/// Overflow tolerance absorbing float noise when heights sum to exactly the budget.
const HEIGHT_EPSILON: f32 = 0.01;

/// Wraps `text` into lines no wider than `max_width`.
///
/// Breaks at whitespace; a single word wider than the line is split between characters.
/// `first_line_offset` shortens only the first line (used for inline labels).
pub fn wrap_text(
    font: &ReportFont,
    text: &str,
    size: f32,
    max_width: f32,
    first_line_offset: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let space = font.text_width(" ", size);

    let available = |lines: &Vec<String>| {
        if lines.is_empty() {
            (max_width - first_line_offset).max(0.0)
        } else {
            max_width
        }
    };

    for word in text.split_whitespace() {
        let word_width = font.text_width(word, size);
        let current_width = font.text_width(&current, size);

        if !current.is_empty() && current_width + space + word_width <= available(&lines) {
            current.push(' ');
            current.push_str(word);
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if word_width <= available(&lines) {
            current.push_str(word);
            continue;
        }

        // Hard-break an overlong word.
        for ch in word.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            if !current.is_empty() && font.text_width(&candidate, size) > available(&lines) {
                lines.push(std::mem::take(&mut current));
                current.push(ch);
            } else {
                current = candidate;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Page geometry shared by the content renderer and the paginator.
#[derive(Debug, Clone)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

impl PageGeometry {
    pub fn new(page: &PageSettings, margin: &Margins) -> Self {
        PageGeometry {
            width: page.width,
            height: page.height,
            margin_top: margin.top,
            margin_left: margin.left,
            margin_right: margin.right,
        }
    }

    pub fn content_width(&self) -> f32 {
        (self.width - self.margin_left - self.margin_right).max(1.0)
    }

    /// Vertical budget of one content page once the footer band is reserved.
    pub fn max_content_height(&self, footer_height: f32) -> f32 {
        self.height - footer_height - self.margin_top
    }

    /// Y coordinate of the top of the content area.
    pub fn content_top(&self) -> f32 {
        self.height - self.margin_top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Heading,
    Body,
}

/// What precedes the first line of a text fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    None,
    Bullet,
    /// Bold inline label; the first line starts after it.
    Label(String),
}

/// A laid-out piece of one page.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text {
        role: TextRole,
        marker: Marker,
        /// Continuation chunk of a bullet split across pages.
        hanging: bool,
        lines: Vec<String>,
    },
    Image {
        index: usize,
        width: f32,
        height: f32,
    },
}

/// A fragment and its offset from the top of the content area.
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub top: f32,
    pub height: f32,
    pub fragment: Fragment,
}

/// Pages of placed fragments, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub pages: Vec<Vec<Placed>>,
}

impl PagePlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// A text block after wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredText {
    pub role: TextRole,
    pub marker: Marker,
    pub lines: Vec<String>,
    pub size: f32,
    pub leading: f32,
    pub space_after: f32,
}

impl MeasuredText {
    pub fn height(&self) -> f32 {
        self.lines.len() as f32 * self.leading + self.space_after
    }
}

/// Height estimate of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum Measured {
    Text(MeasuredText),
    Spacing(f32),
}

impl Measured {
    pub fn height(&self) -> f32 {
        match self {
            Measured::Text(t) => t.height(),
            Measured::Spacing(size) => *size,
        }
    }
}

/// Wraps blocks into measured text using the configured styles.
pub struct TextMeasurer<'a> {
    pub font: &'a ReportFont,
    pub text: &'a TextSettings,
    pub width: f32,
}

impl<'a> TextMeasurer<'a> {
    pub fn measure(&self, block: &ContentBlock) -> Measured {
        let t = self.text;
        match block {
            ContentBlock::SpacingHint { size } => Measured::Spacing(size.max(0.0)),
            ContentBlock::Heading { text } => Measured::Text(MeasuredText {
                role: TextRole::Heading,
                marker: Marker::None,
                lines: wrap_text(self.font, text, t.heading_size, self.width, 0.0),
                size: t.heading_size,
                leading: t.heading_leading,
                space_after: t.heading_after,
            }),
            ContentBlock::Paragraph { text } => Measured::Text(MeasuredText {
                role: TextRole::Body,
                marker: Marker::None,
                lines: wrap_text(self.font, text, t.body_size, self.width, 0.0),
                size: t.body_size,
                leading: t.body_leading,
                space_after: t.paragraph_after,
            }),
            ContentBlock::BulletLine { text } => Measured::Text(MeasuredText {
                role: TextRole::Body,
                marker: Marker::Bullet,
                lines: wrap_text(
                    self.font,
                    text,
                    t.body_size,
                    self.width - t.bullet_indent,
                    0.0,
                ),
                size: t.body_size,
                leading: t.body_leading,
                space_after: 0.0,
            }),
            ContentBlock::LabeledLine { label, value } => {
                let label = label.trim();
                let (marker, offset) = if label.is_empty() {
                    (Marker::None, 0.0)
                } else {
                    let label_text = format!("{}:", label);
                    let offset = self.font.text_width(&label_text, t.body_size)
                        + self.font.text_width(" ", t.body_size);
                    (Marker::Label(label_text), offset)
                };
                let mut lines = wrap_text(self.font, value, t.body_size, self.width, offset);
                if lines.is_empty() && marker != Marker::None {
                    lines.push(String::new());
                }
                Measured::Text(MeasuredText {
                    role: TextRole::Body,
                    marker,
                    lines,
                    size: t.body_size,
                    leading: t.body_leading,
                    space_after: 0.0,
                })
            }
        }
    }
}

/// Accumulates fragments into pages against a fixed height budget.
///
/// A page only materialises once something is placed on it, so breaks never leave
/// blank pages behind.
pub struct Paginator {
    max_height: f32,
    current: f32,
    pages: Vec<Vec<Placed>>,
    needs_page: bool,
}

impl Paginator {
    pub fn new(max_height: f32) -> Self {
        Paginator {
            max_height,
            current: 0.0,
            pages: Vec::new(),
            needs_page: true,
        }
    }

    fn fits(&self, height: f32) -> bool {
        self.current + height <= self.max_height + HEIGHT_EPSILON
    }

    /// Starts a new page before the next placement.
    pub fn page_break(&mut self) {
        if !self.needs_page {
            log::debug!("Page break after {:.1}pt on page {}", self.current, self.pages.len());
        }
        self.needs_page = true;
        self.current = 0.0;
    }

    fn place(&mut self, height: f32, fragment: Fragment) {
        if self.needs_page {
            self.pages.push(Vec::new());
            self.needs_page = false;
            self.current = 0.0;
        }
        let top = self.current;
        self.current += height;
        if let Some(page) = self.pages.last_mut() {
            page.push(Placed {
                top,
                height,
                fragment,
            });
        }
    }

    /// Places a fragment of known height, breaking first when it overflows.
    pub fn place_block(&mut self, height: f32, fragment: Fragment) {
        if !self.fits(height) && !self.needs_page {
            self.page_break();
        }
        self.place(height, fragment);
    }

    /// Vertical space. Spacing that would overflow ends the page and is dropped.
    pub fn space(&mut self, size: f32) {
        if self.needs_page {
            return;
        }
        if self.fits(size) {
            self.current += size;
        } else {
            self.page_break();
        }
    }

    /// Places measured text, splitting it line by line when it is taller than a page.
    pub fn place_text(&mut self, text: MeasuredText) {
        let height = text.height();
        if height <= self.max_height + HEIGHT_EPSILON || text.lines.len() <= 1 {
            let fragment = Fragment::Text {
                role: text.role,
                marker: text.marker,
                hanging: false,
                lines: text.lines,
            };
            self.place_block(height, fragment);
            return;
        }

        let mut remaining = text.lines;
        let mut first = true;
        while !remaining.is_empty() {
            if !self.needs_page && !self.fits(text.leading) {
                self.page_break();
            }
            let room = if self.needs_page {
                self.max_height
            } else {
                self.max_height - self.current
            };
            let mut take = ((room + HEIGHT_EPSILON) / text.leading).floor() as usize;
            take = take.clamp(1, remaining.len());
            let last_chunk = take == remaining.len();
            if last_chunk
                && take as f32 * text.leading + text.space_after > room + HEIGHT_EPSILON
                && take > 1
            {
                take -= 1;
            }
            let chunk: Vec<String> = remaining.drain(..take).collect();
            let done = remaining.is_empty();
            let chunk_height = chunk.len() as f32 * text.leading
                + if done { text.space_after } else { 0.0 };
            let marker = if first {
                text.marker.clone()
            } else {
                Marker::None
            };
            let hanging = !first && text.marker == Marker::Bullet;
            self.place(
                chunk_height,
                Fragment::Text {
                    role: text.role,
                    marker,
                    hanging,
                    lines: chunk,
                },
            );
            first = false;
            if !done {
                self.page_break();
            }
        }
    }

    pub fn place_measured(&mut self, measured: Measured) {
        match measured {
            Measured::Spacing(size) => self.space(size),
            Measured::Text(text) => self.place_text(text),
        }
    }

    /// Finishes the plan. An empty plan still gets one blank page.
    pub fn finish(mut self) -> PagePlan {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        PagePlan { pages: self.pages }
    }
}

/// Pixel size of a gallery image ready for placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Fits an image into the gallery slot, preserving its aspect ratio.
pub fn fit_image(size: ImageSize, gallery: &GallerySettings, content_width: f32) -> (f32, f32) {
    let max_w = gallery.slot_width.min(content_width);
    let max_h = gallery.slot_height;
    if size.width == 0 || size.height == 0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / size.width as f32).min(max_h / size.height as f32);
    (size.width as f32 * scale, size.height as f32 * scale)
}

/// Builds the page plan: text blocks first, then an explicit break and the gallery.
pub fn plan_pages(
    blocks: &[ContentBlock],
    gallery_images: &[ImageSize],
    footer_height: f32,
    geometry: &PageGeometry,
    text: &TextSettings,
    gallery: &GallerySettings,
    font: &ReportFont,
) -> PagePlan {
    let max_height = geometry.max_content_height(footer_height);
    let measurer = TextMeasurer {
        font,
        text,
        width: geometry.content_width(),
    };
    let mut paginator = Paginator::new(max_height);

    for block in blocks {
        paginator.place_measured(measurer.measure(block));
    }

    paginator.page_break();

    let slot = gallery.slot_height + gallery.spacing;
    for (index, size) in gallery_images.iter().enumerate() {
        let (width, height) = fit_image(*size, gallery, geometry.content_width());
        paginator.place_block(
            slot,
            Fragment::Image {
                index,
                width,
                height,
            },
        );
    }

    paginator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> ReportFont {
        ReportFont::embedded().unwrap()
    }

    #[test]
    fn test_wrap_respects_width() {
        let font = font();
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap_text(&font, &text, 11.0, 200.0, 0.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(font.text_width(line, 11.0) <= 200.0);
        }
        assert_eq!(lines.join(" "), text.trim());
    }

    #[test]
    fn test_wrap_breaks_long_word() {
        let font = font();
        let word = "x".repeat(200);
        let lines = wrap_text(&font, &word, 11.0, 100.0, 0.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_empty_text() {
        assert!(wrap_text(&font(), "   ", 11.0, 100.0, 0.0).is_empty());
    }

    #[test]
    fn test_first_line_offset() {
        let font = font();
        let text = "word ".repeat(30);
        let plain = wrap_text(&font, &text, 11.0, 150.0, 0.0);
        let offset = wrap_text(&font, &text, 11.0, 150.0, 60.0);
        assert!(offset[0].len() < plain[0].len());
        assert!(font.text_width(&offset[0], 11.0) <= 90.0);
    }

    #[test]
    fn test_exact_budget_fits_one_page() {
        let mut p = Paginator::new(100.0);
        for _ in 0..4 {
            p.place_block(25.0, Fragment::Image { index: 0, width: 1.0, height: 1.0 });
        }
        assert_eq!(p.finish().page_count(), 1);
    }

    #[test]
    fn test_overflow_breaks_page() {
        let mut p = Paginator::new(100.0);
        for _ in 0..5 {
            p.place_block(25.0, Fragment::Image { index: 0, width: 1.0, height: 1.0 });
        }
        let plan = p.finish();
        assert_eq!(plan.page_count(), 2);
        assert_eq!(plan.pages[1][0].top, 0.0);
    }

    #[test]
    fn test_overflowing_spacing_is_dropped() {
        let mut p = Paginator::new(100.0);
        p.place_block(90.0, Fragment::Image { index: 0, width: 1.0, height: 1.0 });
        p.space(20.0);
        p.place_block(10.0, Fragment::Image { index: 1, width: 1.0, height: 1.0 });
        let plan = p.finish();
        assert_eq!(plan.page_count(), 2);
        assert_eq!(plan.pages[1][0].top, 0.0);
    }

    #[test]
    fn test_break_does_not_create_blank_pages() {
        let mut p = Paginator::new(100.0);
        p.page_break();
        p.page_break();
        p.place_block(10.0, Fragment::Image { index: 0, width: 1.0, height: 1.0 });
        p.page_break();
        assert_eq!(p.finish().page_count(), 1);
    }

    #[test]
    fn test_empty_plan_has_one_page() {
        assert_eq!(Paginator::new(100.0).finish().page_count(), 1);
    }

    #[test]
    fn test_tall_text_is_split() {
        let mut p = Paginator::new(100.0);
        p.place_text(MeasuredText {
            role: TextRole::Body,
            marker: Marker::Bullet,
            lines: (0..25).map(|i| format!("line {}", i)).collect(),
            size: 11.0,
            leading: 10.0,
            space_after: 0.0,
        });
        let plan = p.finish();
        assert_eq!(plan.page_count(), 3);
        let total: usize = plan
            .pages
            .iter()
            .flatten()
            .map(|placed| match &placed.fragment {
                Fragment::Text { lines, .. } => lines.len(),
                _ => 0,
            })
            .sum();
        assert_eq!(total, 25);
        match &plan.pages[1][0].fragment {
            Fragment::Text { marker, hanging, .. } => {
                assert_eq!(*marker, Marker::None);
                assert!(*hanging);
            }
            other => panic!("unexpected fragment {:?}", other),
        }
    }

    #[test]
    fn test_fit_image_preserves_aspect() {
        let gallery = GallerySettings::default();
        let (w, h) = fit_image(ImageSize { width: 400, height: 300 }, &gallery, 468.0);
        assert!((w / h - 4.0 / 3.0).abs() < 0.001);
        assert!(w <= 400.0 && h <= 250.0);
        assert_eq!(fit_image(ImageSize { width: 0, height: 5 }, &gallery, 468.0), (0.0, 0.0));
    }

    #[test]
    fn test_gallery_starts_on_new_page() {
        let font = font();
        let geometry = PageGeometry::new(&PageSettings::default(), &Margins::default());
        let blocks = vec![ContentBlock::heading("Overview"), ContentBlock::bullet("3 rooms")];
        let images = vec![ImageSize { width: 400, height: 300 }; 3];
        let plan = plan_pages(
            &blocks,
            &images,
            126.0,
            &geometry,
            &TextSettings::default(),
            &GallerySettings::default(),
            &font,
        );
        // 594pt budget holds two 262pt slots per page.
        assert_eq!(plan.page_count(), 3);
        assert!(plan.pages[0]
            .iter()
            .all(|p| matches!(p.fragment, Fragment::Text { .. })));
        assert!(plan.pages[1]
            .iter()
            .all(|p| matches!(p.fragment, Fragment::Image { .. })));
    }

    #[test]
    fn test_no_images_no_gallery_page() {
        let font = font();
        let geometry = PageGeometry::new(&PageSettings::default(), &Margins::default());
        let plan = plan_pages(
            &[ContentBlock::paragraph("Short text")],
            &[],
            126.0,
            &geometry,
            &TextSettings::default(),
            &GallerySettings::default(),
            &font,
        );
        assert_eq!(plan.page_count(), 1);
    }
}
