//! Overlays the footer page onto every content page.
//!
//! The footer document is imported into the content document with renumbered objects,
//! its first page becomes a Form XObject and each content page draws that form after
//! its own, isolated content. Link annotations of the footer are copied onto every page.

use crate::ReportError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use log::debug;

const FOOTER_FORM: &str = "Footer1";

fn load(bytes: &[u8], what: &str) -> Result<Document, ReportError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ReportError::merge_error(format!("Cannot parse the {} document: {}", what, e)))?;
    if doc.is_encrypted() {
        return Err(ReportError::merge_error(format!("The {} document is encrypted", what)));
    }
    if doc.get_pages().is_empty() {
        return Err(ReportError::merge_error(format!("The {} document has no pages", what)));
    }
    Ok(doc)
}

fn page_box(page: &Dictionary) -> Vec<Object> {
    if let Ok(arr) = page.get(b"MediaBox").and_then(Object::as_array) {
        return arr.clone();
    }
    vec![0.into(), 0.into(), 612.into(), 792.into()]
}

/// Resolves an entry that may be inline or an indirect dictionary.
fn dict_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Dictionary {
    match dict.get(key) {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

fn array_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Vec<Object> {
    match dict.get(key) {
        Ok(Object::Array(a)) => a.clone(),
        Ok(Object::Reference(id)) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_array().ok())
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Merges `footer` onto every page of `content`, keeping page order and count.
pub fn merge(footer: &[u8], content: &[u8]) -> Result<Vec<u8>, ReportError> {
    let mut doc = load(content, "content")?;
    let mut overlay = load(footer, "footer")?;
    let lopdf_err = |e: lopdf::Error| ReportError::merge_error(e.to_string());

    overlay.renumber_objects_with(doc.max_id + 1);
    let footer_page_id = overlay
        .get_pages()
        .values()
        .next()
        .copied()
        .ok_or_else(|| ReportError::merge_error("The footer document has no pages"))?;
    if overlay.max_id > doc.max_id {
        doc.max_id = overlay.max_id;
    }
    doc.objects.extend(overlay.objects);

    let footer_page = doc
        .get_object(footer_page_id)
        .and_then(Object::as_dict)
        .map_err(lopdf_err)?
        .clone();
    let footer_content = doc.get_page_content(footer_page_id).map_err(lopdf_err)?;
    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "FormType" => 1,
            "BBox" => page_box(&footer_page),
            "Resources" => dict_entry(&doc, &footer_page, b"Resources"),
        },
        footer_content,
    ));

    let footer_annots: Vec<Dictionary> = array_entry(&doc, &footer_page, b"Annots")
        .iter()
        .filter_map(|a| match a {
            Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict).ok().cloned(),
            Object::Dictionary(d) => Some(d.clone()),
            _ => None,
        })
        .collect();

    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    for page_id in &page_ids {
        let page = doc
            .get_object(*page_id)
            .and_then(Object::as_dict)
            .map_err(lopdf_err)?
            .clone();

        let mut contents: Vec<Object> = vec![doc
            .add_object(Stream::new(dictionary! {}, b"q\n".to_vec()))
            .into()];
        contents.extend(doc.get_page_contents(*page_id).into_iter().map(Object::from));
        contents.push(
            doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()))
                .into(),
        );

        let mut resources = dict_entry(&doc, &page, b"Resources");
        let mut xobjects = dict_entry(&doc, &resources, b"XObject");
        xobjects.set(FOOTER_FORM, form_id);
        resources.set("XObject", xobjects);

        let mut annots = array_entry(&doc, &page, b"Annots");
        for annot in &footer_annots {
            let mut copy = annot.clone();
            copy.set("P", *page_id);
            annots.push(doc.add_object(copy).into());
        }

        {
            let page_mut = doc
                .get_object_mut(*page_id)
                .and_then(Object::as_dict_mut)
                .map_err(lopdf_err)?;
            page_mut.set("Contents", contents);
            page_mut.set("Resources", resources);
            if !annots.is_empty() {
                page_mut.set("Annots", annots);
            }
        }

        doc.add_page_contents(*page_id, format!("q /{} Do Q\n", FOOTER_FORM).into_bytes())
            .map_err(lopdf_err)?;
    }
    debug!(
        "Footer merged onto {} pages with {} links each",
        page_ids.len(),
        footer_annots.len()
    );

    doc.prune_objects();
    doc.renumber_objects();
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| ReportError::merge_error(format!("Cannot write the merged document: {}", e)))?;
    Ok(bytes)
}
