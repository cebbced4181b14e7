//! Font registration and text metrics for report rendering.
//!
//! A single font is registered per process through [`register_report_font`]. The first
//! call resolves the face (an explicit file, then the configured system families through
//! `fontdb`, then the bundled DejaVu Sans) and later calls return the same instance
//! without touching the filesystem.
//!
//! The font is embedded as a Type0/CIDFontType2 composite with Identity-H encoding,
//! subsetted to the glyphs a document actually uses, so listing text in any script the
//! face covers survives intact.

use crate::config::FontSettings;
use crate::ReportError;
use fontdb::Database;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use ttf_parser::Face;

/// DejaVu Sans, used whenever no other face is configured or found.
static DEJAVU_SANS: &[u8] = include_bytes!("../../fonts/DejaVuSans.ttf");

static REPORT_FONT: OnceCell<ReportFont> = OnceCell::new();

/// Registers the report font, loading it on the first call only.
///
/// The settings of the first call win; subsequent calls ignore their argument and
/// return the already registered instance.
///
/// # Example
/// ```rust
/// use listing2pdf::config::FontSettings;
/// use listing2pdf::fonts::register_report_font;
///
/// let first = register_report_font(&FontSettings::default()).unwrap();
/// let second = register_report_font(&FontSettings::default()).unwrap();
/// assert!(std::ptr::eq(first, second));
/// ```
pub fn register_report_font(settings: &FontSettings) -> Result<&'static ReportFont, ReportError> {
    REPORT_FONT.get_or_try_init(|| {
        let font = load_report_font(settings)?;
        log::info!("Registered report font '{}'", font.name());
        Ok(font)
    })
}

/// The registered font, if [`register_report_font`] has run.
pub fn registered_font() -> Option<&'static ReportFont> {
    REPORT_FONT.get()
}

fn load_report_font(settings: &FontSettings) -> Result<ReportFont, ReportError> {
    if let Some(path) = &settings.path {
        match TrueTypeFont::from_file(path) {
            Some(font) => return Ok(ReportFont { font }),
            None => log::warn!(
                "Font file '{}' is not a usable TrueType font, trying the next candidate",
                path.display()
            ),
        }
    }

    if let Some(font) = find_system_font(&settings.families) {
        return Ok(ReportFont { font });
    }
    if !settings.families.is_empty() {
        log::warn!(
            "None of the font families {} is installed, using DejaVu Sans",
            settings.families.join(", ")
        );
    }
    ReportFont::embedded()
}

/// Looks the candidate families up in the system font database, regular faces first.
fn find_system_font(families: &[String]) -> Option<TrueTypeFont> {
    if families.is_empty() {
        return None;
    }
    let mut db = Database::new();
    db.load_system_fonts();

    for family in families {
        let mut candidates: Vec<_> = db
            .faces()
            .filter(|face| {
                face.families
                    .iter()
                    .any(|(name, _)| name.eq_ignore_ascii_case(family))
            })
            .collect();
        candidates.sort_by_key(|face| {
            (
                face.style != fontdb::Style::Normal,
                face.weight.0.abs_diff(fontdb::Weight::NORMAL.0),
            )
        });

        for face in candidates {
            let path = match &face.source {
                fontdb::Source::File(p) => p,
                _ => continue,
            };
            // Collections cannot be embedded as a single FontFile2
            if face.index != 0 || is_collection(path) {
                continue;
            }
            if let Some(font) = TrueTypeFont::from_file(path) {
                log::debug!("Using system font '{}' from {}", family, path.display());
                return Some(font);
            }
        }
        log::debug!("System font '{}' not found", family);
    }
    None
}

fn is_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map_or(false, |ext| {
            ext.eq_ignore_ascii_case("ttc") || ext.eq_ignore_ascii_case("otc")
        })
}

/// A parsed TrueType font kept for the whole process lifetime.
pub struct TrueTypeFont {
    postscript_name: String,
    data: &'static [u8],
    face: Face<'static>,
    units_per_em: f32,
}

impl TrueTypeFont {
    fn from_file(path: &Path) -> Option<TrueTypeFont> {
        let data = fs::read(path).ok()?;
        TrueTypeFont::from_bytes(data)
    }

    /// Parses standalone TrueType (glyf-based) font data.
    pub fn from_bytes(data: Vec<u8>) -> Option<TrueTypeFont> {
        if ttf_parser::fonts_in_collection(&data).is_some() {
            return None;
        }
        // Registered fonts live until the process exits.
        TrueTypeFont::from_static(Box::leak(data.into_boxed_slice()))
    }

    fn from_static(data: &'static [u8]) -> Option<TrueTypeFont> {
        let face = Face::parse(data, 0).ok()?;
        if face.tables().glyf.is_none() || face.glyph_index('A').is_none() {
            return None;
        }
        let postscript_name = name_record(&face, ttf_parser::name_id::POST_SCRIPT_NAME)
            .or_else(|| name_record(&face, ttf_parser::name_id::FAMILY))
            .unwrap_or_else(|| "ReportFont".to_string())
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();
        let units_per_em = face.units_per_em() as f32;
        Some(TrueTypeFont {
            postscript_name,
            data,
            face,
            units_per_em,
        })
    }

    fn glyph(&self, ch: char) -> u16 {
        self.face.glyph_index(ch).map(|g| g.0).unwrap_or(0)
    }

    /// Advance of a glyph in 1000-unit text space.
    fn advance_1000(&self, gid: u16) -> f32 {
        self.face
            .glyph_hor_advance(ttf_parser::GlyphId(gid))
            .map(|adv| adv as f32 * 1000.0 / self.units_per_em)
            .unwrap_or(0.0)
    }

    fn scaled(&self, v: i16) -> f32 {
        v as f32 * 1000.0 / self.units_per_em
    }
}

/// First decodable name record with `name_id`. Mac Roman records come first in many
/// fonts and do not decode, so every record is tried.
fn name_record(face: &Face<'_>, name_id: u16) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == name_id)
        .find_map(|n| n.to_string())
}

/// The process-wide report font.
pub struct ReportFont {
    font: TrueTypeFont,
}

impl ReportFont {
    /// The bundled DejaVu Sans face.
    pub fn embedded() -> Result<Self, ReportError> {
        TrueTypeFont::from_static(DEJAVU_SANS)
            .map(|font| ReportFont { font })
            .ok_or_else(|| ReportError::pdf_error("The bundled DejaVu Sans font cannot be parsed"))
    }

    pub fn name(&self) -> &str {
        &self.font.postscript_name
    }

    /// True when `ch` has a glyph in the face.
    pub fn covers(&self, ch: char) -> bool {
        self.font.glyph(ch) != 0
    }

    /// Width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let f = &self.font;
        let units: f32 = text.chars().map(|c| f.advance_1000(f.glyph(c))).sum();
        units * size / 1000.0
    }

    /// Encodes `text` as a PDF string operand for this font, recording glyph usage.
    pub fn encode_text(&self, text: &str, usage: &mut GlyphUsage) -> Object {
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            if !self.covers(ch) {
                log::debug!("'{}' has no glyph in {}", ch, self.name());
            }
            let gid = self.font.glyph(ch);
            let new_gid = usage.remapper.remap(gid);
            usage.glyphs.entry(new_gid).or_insert((gid, ch));
            bytes.extend_from_slice(&new_gid.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    /// Writes the font dictionary and its descendants under the reserved `font_id`.
    pub fn write_font_object(
        &self,
        doc: &mut Document,
        font_id: ObjectId,
        usage: &GlyphUsage,
    ) -> Result<(), lopdf::Error> {
        let dict = embed_truetype(doc, &self.font, usage)?;
        doc.objects.insert(font_id, Object::Dictionary(dict));
        Ok(())
    }
}

/// Glyphs used by one document, keyed by their subset glyph id.
pub struct GlyphUsage {
    remapper: subsetter::GlyphRemapper,
    /// subset gid -> (original gid, first char drawn with it)
    glyphs: BTreeMap<u16, (u16, char)>,
}

impl Default for GlyphUsage {
    fn default() -> Self {
        GlyphUsage {
            remapper: subsetter::GlyphRemapper::new(),
            glyphs: BTreeMap::new(),
        }
    }
}

impl GlyphUsage {
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

fn embed_truetype(
    doc: &mut Document,
    font: &TrueTypeFont,
    usage: &GlyphUsage,
) -> Result<Dictionary, lopdf::Error> {
    let ps_name = format!("{}+{}", subset_tag(usage), font.postscript_name);

    // Content strings carry subset gids as CIDs. When subsetting fails the full font is
    // embedded and an explicit CIDToGIDMap routes them back to the original glyphs.
    let (subset, cid_to_gid) = match subsetter::subset(font.data, 0, &usage.remapper) {
        Ok(data) => (data, Object::from("Identity")),
        Err(e) => {
            log::warn!(
                "Font subsetting failed for {}: {:?}, embedding full font",
                font.postscript_name,
                e
            );
            let map_id = doc.add_object(Stream::new(dictionary! {}, cid_to_gid_map(usage)));
            (font.data.to_vec(), Object::Reference(map_id))
        }
    };

    let file_len = subset.len() as i64;
    let font_file = doc.add_object(Stream::new(
        dictionary! { "Length1" => file_len },
        subset,
    ));

    let face = &font.face;
    let bb = face.global_bounding_box();
    let descriptor = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => Object::Name(ps_name.clone().into_bytes()),
        "Flags" => 32,
        "FontBBox" => vec![
            Object::Real(font.scaled(bb.x_min)),
            Object::Real(font.scaled(bb.y_min)),
            Object::Real(font.scaled(bb.x_max)),
            Object::Real(font.scaled(bb.y_max)),
        ],
        "ItalicAngle" => 0,
        "Ascent" => Object::Real(font.scaled(face.ascender())),
        "Descent" => Object::Real(font.scaled(face.descender())),
        "CapHeight" => Object::Real(
            face.capital_height()
                .map(|h| font.scaled(h))
                .unwrap_or(700.0)
        ),
        "StemV" => 80,
        "FontFile2" => font_file,
    });

    let mut widths = Vec::with_capacity(usage.glyphs.len() * 2);
    for (&new_gid, &(old_gid, _)) in &usage.glyphs {
        widths.push(Object::Integer(new_gid as i64));
        widths.push(Object::Array(vec![Object::Real(font.advance_1000(old_gid))]));
    }

    let cid_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => Object::Name(ps_name.clone().into_bytes()),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "FontDescriptor" => descriptor,
        "DW" => 0,
        "W" => widths,
        "CIDToGIDMap" => cid_to_gid,
    });

    let to_unicode = doc.add_object(Stream::new(
        dictionary! {},
        to_unicode_cmap(usage).into_bytes(),
    ));

    Ok(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => Object::Name(ps_name.into_bytes()),
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![cid_font.into()],
        "ToUnicode" => to_unicode,
    })
}

/// Two bytes per CID giving the original glyph id.
fn cid_to_gid_map(usage: &GlyphUsage) -> Vec<u8> {
    let len = usage.glyphs.keys().next_back().map_or(1, |&max| max as usize + 1);
    let mut map = vec![0u8; len * 2];
    for (&new_gid, &(old_gid, _)) in &usage.glyphs {
        let at = new_gid as usize * 2;
        map[at..at + 2].copy_from_slice(&old_gid.to_be_bytes());
    }
    map
}

/// Six-letter subset prefix derived from the glyph set.
fn subset_tag(usage: &GlyphUsage) -> String {
    let mut hash: u32 = 2166136261;
    for &new_gid in usage.glyphs.keys() {
        for b in new_gid.to_be_bytes() {
            hash = (hash ^ b as u32).wrapping_mul(16777619);
        }
    }
    (0..6)
        .map(|i| (b'A' + ((hash >> (i * 5)) % 26) as u8) as char)
        .collect()
}

fn to_unicode_cmap(usage: &GlyphUsage) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );
    let entries: Vec<(u16, char)> = usage
        .glyphs
        .iter()
        .filter(|(_, &(old, _))| old != 0)
        .map(|(&new, &(_, ch))| (new, ch))
        .collect();
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (cid, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{:04X}", u))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", cid, utf16));
        }
        cmap.push_str("endbfchar\n");
    }
    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}


#[cfg(test)]
mod tests {
    use super::*;

    fn decode_cids(obj: &Object) -> Vec<u16> {
        match obj {
            Object::String(bytes, StringFormat::Hexadecimal) => bytes
                .chunks(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect(),
            other => panic!("unexpected operand {:?}", other),
        }
    }

    #[test]
    fn test_embedded_font_uses_postscript_name() {
        let font = ReportFont::embedded().unwrap();
        assert_eq!(font.name(), "DejaVuSans");
    }

    #[test]
    fn test_embedded_font_covers_turkish() {
        let font = ReportFont::embedded().unwrap();
        for ch in "ıİşŞğĞüÜöÖçÇ₺•".chars() {
            assert!(font.covers(ch), "no glyph for {}", ch);
        }
        assert!(font.text_width("güneşli", 10.0) > 0.0);
        assert_eq!(font.text_width("", 12.0), 0.0);
    }

    #[test]
    fn test_encoding_keeps_non_latin_text() {
        let font = ReportFont::embedded().unwrap();
        let mut usage = GlyphUsage::default();
        let cids = decode_cids(&font.encode_text("manzaralı ş", &mut usage));
        assert_eq!(cids.len(), 11);
        assert!(cids.iter().all(|&cid| cid != 0));
        // Repeated characters share one subset glyph.
        assert_eq!(cids[1], cids[4]);
        let chars: Vec<char> = usage.glyphs.values().map(|&(_, ch)| ch).collect();
        assert!(chars.contains(&'ı'));
        assert!(chars.contains(&'ş'));
    }

    #[test]
    fn test_font_object_is_subset_type0() {
        let font = ReportFont::embedded().unwrap();
        let mut usage = GlyphUsage::default();
        font.encode_text("Deniz manzaralı", &mut usage);
        let mut doc = Document::with_version("1.5");
        let id = doc.new_object_id();
        font.write_font_object(&mut doc, id, &usage).unwrap();

        let dict = doc.get_object(id).unwrap().as_dict().unwrap();
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        let base = dict.get(b"BaseFont").unwrap().as_name().unwrap();
        assert_eq!(base.len(), "XXXXXX+DejaVuSans".len());
        assert!(base.ends_with(b"+DejaVuSans"));

        let to_unicode = dict.get(b"ToUnicode").unwrap().as_reference().unwrap();
        let cmap = doc.get_object(to_unicode).unwrap().as_stream().unwrap();
        let cmap = String::from_utf8(cmap.content.clone()).unwrap();
        assert!(cmap.contains("<0131>"));
    }

    #[test]
    fn test_missing_file_and_family_fall_back_to_bundled_face() {
        let font = load_report_font(&FontSettings {
            path: Some("/nonexistent/font.ttf".into()),
            families: vec!["No Such Family".to_string()],
        })
        .unwrap();
        assert_eq!(font.name(), "DejaVuSans");
        assert!(font.covers('ğ'));
    }

    #[test]
    fn test_explicit_font_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.ttf");
        fs::write(&path, DEJAVU_SANS).unwrap();
        let font = load_report_font(&FontSettings {
            path: Some(path),
            families: Vec::new(),
        })
        .unwrap();
        assert_eq!(font.name(), "DejaVuSans");
    }

    #[test]
    fn test_rejects_non_font_bytes() {
        assert!(TrueTypeFont::from_bytes(b"not a font".to_vec()).is_none());
    }

    #[test]
    fn test_collection_extension() {
        assert!(is_collection(Path::new("/fonts/NotoSansCJK.ttc")));
        assert!(!is_collection(Path::new("/fonts/DejaVuSans.ttf")));
    }
}
