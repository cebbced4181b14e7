//! Minimal page-oriented PDF writer on top of `lopdf`.
//!
//! [`PdfWriter`] owns the document under construction and the glyph usage of the report
//! font. Pages are drawn through a [`PageCanvas`], which records content operations,
//! image XObjects and link annotations, and commits them when finished.

use crate::fonts::{GlyphUsage, ReportFont};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Resource name of the report font on every page.
const FONT_RESOURCE: &str = "F1";

/// Stroke width used to embolden text drawn with the regular face.
const FAUX_BOLD_STROKE: f32 = 0.35;

pub(crate) fn real(v: f32) -> Object {
    Object::Real(v)
}

/// Pixel data of an image to embed.
#[derive(Debug, Clone)]
pub enum ImageData {
    /// Baseline JPEG, embedded as-is with `DCTDecode`.
    Jpeg(Vec<u8>),
    /// 8-bit RGB samples with an optional 8-bit alpha channel.
    Rgb {
        pixels: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
}

/// An image ready to be placed on a page.
#[derive(Debug, Clone)]
pub struct PdfImage {
    pub width: u32,
    pub height: u32,
    pub data: ImageData,
}

/// A document being written page by page.
pub struct PdfWriter<'f> {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    font: &'f ReportFont,
    usage: GlyphUsage,
    page_ids: Vec<ObjectId>,
    width: f32,
    height: f32,
}

impl<'f> PdfWriter<'f> {
    pub fn new(font: &'f ReportFont, width: f32, height: f32) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.new_object_id();
        PdfWriter {
            doc,
            pages_id,
            font_id,
            font,
            usage: GlyphUsage::default(),
            page_ids: Vec::new(),
            width,
            height,
        }
    }

    pub fn font(&self) -> &'f ReportFont {
        self.font
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Adds an image XObject and returns its id for [`PageCanvas::image`].
    pub fn add_image(&mut self, image: &PdfImage) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        match &image.data {
            ImageData::Jpeg(bytes) => {
                dict.set("Filter", "DCTDecode");
                let mut stream = Stream::new(dict, bytes.clone());
                stream.allows_compression = false;
                self.doc.add_object(stream)
            }
            ImageData::Rgb { pixels, alpha } => {
                if let Some(alpha) = alpha {
                    let mask = self.doc.add_object(Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Image",
                            "Width" => image.width as i64,
                            "Height" => image.height as i64,
                            "ColorSpace" => "DeviceGray",
                            "BitsPerComponent" => 8,
                        },
                        alpha.clone(),
                    ));
                    dict.set("SMask", mask);
                }
                self.doc.add_object(Stream::new(dict, pixels.clone()))
            }
        }
    }

    /// Starts a new page; it is appended when the canvas is finished.
    pub fn begin_page(&mut self) -> PageCanvas<'_, 'f> {
        PageCanvas {
            writer: self,
            ops: Vec::new(),
            xobjects: Dictionary::new(),
            annots: Vec::new(),
        }
    }

    /// Writes the font, page tree and catalog and serialises the document.
    pub fn finish(mut self) -> Result<Vec<u8>, lopdf::Error> {
        self.font
            .write_font_object(&mut self.doc, self.font_id, &self.usage)?;

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.page_ids.len() as i64,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut bytes = Vec::new();
        self.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Drawing surface of one page. Coordinates are PDF points, origin bottom-left.
pub struct PageCanvas<'w, 'f> {
    writer: &'w mut PdfWriter<'f>,
    ops: Vec<Operation>,
    xobjects: Dictionary,
    annots: Vec<Object>,
}

impl<'w, 'f> PageCanvas<'w, 'f> {
    pub fn font(&self) -> &'f ReportFont {
        self.writer.font
    }

    /// Sets both fill and stroke colour.
    pub fn set_color(&mut self, r: f32, g: f32, b: f32) {
        self.ops
            .push(Operation::new("rg", vec![real(r), real(g), real(b)]));
        self.ops
            .push(Operation::new("RG", vec![real(r), real(g), real(b)]));
    }

    /// Draws a single line of text with its baseline at `y`.
    pub fn text(&mut self, x: f32, y: f32, size: f32, text: &str, bold: bool) {
        if text.is_empty() {
            return;
        }
        let encoded = self.writer.font.encode_text(text, &mut self.writer.usage);
        self.ops.push(Operation::new("q", vec![]));
        if bold {
            self.ops
                .push(Operation::new("w", vec![real(FAUX_BOLD_STROKE)]));
        }
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), real(size)],
        ));
        if bold {
            self.ops.push(Operation::new("Tr", vec![2.into()]));
        }
        self.ops
            .push(Operation::new("Td", vec![real(x), real(y)]));
        self.ops.push(Operation::new("Tj", vec![encoded]));
        self.ops.push(Operation::new("ET", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        self.ops.push(Operation::new("w", vec![real(width)]));
        self.ops.push(Operation::new("m", vec![real(x1), real(y1)]));
        self.ops.push(Operation::new("l", vec![real(x2), real(y2)]));
        self.ops.push(Operation::new("S", vec![]));
    }

    /// Paints an image XObject into the box with lower-left corner `(x, y)`.
    pub fn image(&mut self, image_id: ObjectId, x: f32, y: f32, width: f32, height: f32) {
        let name = format!("Im{}", self.xobjects.len() + 1);
        self.xobjects.set(name.as_bytes().to_vec(), image_id);
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                real(width),
                real(0.0),
                real(0.0),
                real(height),
                real(x),
                real(y),
            ],
        ));
        self.ops.push(Operation::new(
            "Do",
            vec![Object::Name(name.into_bytes())],
        ));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// Adds a clickable URI region `[x1, y1, x2, y2]`.
    pub fn link(&mut self, rect: [f32; 4], uri: &str) {
        let annot = self.writer.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => rect.iter().map(|v| real(*v)).collect::<Vec<_>>(),
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "A" => dictionary! {
                "Type" => "Action",
                "S" => "URI",
                "URI" => Object::string_literal(uri),
            },
        });
        self.annots.push(annot.into());
    }

    /// Commits the page to the document and returns its object id.
    pub fn finish(self) -> Result<ObjectId, lopdf::Error> {
        let PageCanvas {
            writer,
            ops,
            xobjects,
            annots,
        } = self;

        let content = Content { operations: ops }.encode()?;
        let content_id = writer.doc.add_object(Stream::new(dictionary! {}, content));

        let mut resources = dictionary! {
            "Font" => dictionary! { FONT_RESOURCE => writer.font_id },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => writer.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), real(writer.width), real(writer.height)],
            "Contents" => content_id,
            "Resources" => resources,
        };
        if !annots.is_empty() {
            page.set("Annots", annots);
        }

        let page_id = writer.doc.add_object(page);
        writer.page_ids.push(page_id);
        Ok(page_id)
    }
}
