mod common;

use listing2pdf::config::PageSettings;
use listing2pdf::fonts::ReportFont;
use listing2pdf::footer::{footer_height, render_footer, FooterLayout, LINKS_X, LINE_STEP};
use listing2pdf::images::{prepare_logo, LOGO_FILE_NAME};
use listing2pdf::model::ContactInfo;
use lopdf::content::Content;
use lopdf::{Document, Object};
use std::fs;

fn page_ops(doc: &Document) -> Vec<String> {
    let page_id = *doc.get_pages().get(&1).unwrap();
    Content::decode(&doc.get_page_content(page_id).unwrap())
        .unwrap()
        .operations
        .into_iter()
        .map(|o| o.operator)
        .collect()
}

fn full_contact() -> ContactInfo {
    ContactInfo {
        company_name: Some("Acme Realty".into()),
        agent_name: Some("Jo Doe".into()),
        address: Some("Marina Street 12\nKas, Antalya".into()),
        phone: Some("+90 555 000 00 00".into()),
        email: Some("jo@acme.example".into()),
        map_link: Some("https://maps.google.com/?q=acme".into()),
        whatsapp_link: Some("https://wa.me/905550000000".into()),
        website_link: Some("https://acme.example".into()),
        telegram_link: Some("https://t.me/acme".into()),
        instagram_link: Some("https://instagram.com/acme".into()),
    }
}

#[test]
fn test_empty_contact_without_logo_is_divider_only() {
    let bytes = render_footer(
        &ContactInfo::default(),
        None,
        &ReportFont::embedded().unwrap(),
        &PageSettings::default(),
    )
    .unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    let ops = page_ops(&doc);
    assert!(!ops.iter().any(|o| o == "Tj" || o == "Do"));
    assert_eq!(ops, vec!["w", "m", "l", "S"]);

    let page_id = *doc.get_pages().get(&1).unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    assert!(page.get(b"Annots").is_err());
}

#[test]
fn test_blank_fields_take_no_space() {
    let font = ReportFont::embedded().unwrap();
    let blank = ContactInfo {
        phone: Some("   ".into()),
        email: Some(String::new()),
        ..Default::default()
    };
    assert_eq!(
        footer_height(&blank, &font),
        footer_height(&ContactInfo::default(), &font)
    );
}

#[test]
fn test_full_footer_with_logo() {
    let dir = tempfile::tempdir().unwrap();
    let upload = dir.path().join("upload.png");
    fs::write(&upload, common::png(400, 200)).unwrap();
    let stored = prepare_logo(&upload, &dir.path().join("uploads"), 100).unwrap();
    assert!(stored.ends_with(LOGO_FILE_NAME));

    let font = ReportFont::embedded().unwrap();
    let contact = full_contact();
    let bytes = render_footer(&contact, Some(&stored), &font, &PageSettings::default()).unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    let ops = page_ops(&doc);
    assert_eq!(ops.iter().filter(|o| *o == "Do").count(), 1);

    let layout = FooterLayout::compute(&contact, &font);
    let expected_text = layout.info_lines.len() + layout.links.len();
    assert_eq!(ops.iter().filter(|o| *o == "Tj").count(), expected_text);

    let page_id = *doc.get_pages().get(&1).unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let annots = page.get(b"Annots").unwrap().as_array().unwrap();
    assert_eq!(annots.len(), 5);

    let uris: Vec<Vec<u8>> = annots
        .iter()
        .map(|a| {
            let annot = doc
                .get_object(a.as_reference().unwrap())
                .unwrap()
                .as_dict()
                .unwrap();
            let action = annot.get(b"A").unwrap().as_dict().unwrap();
            match action.get(b"URI").unwrap() {
                Object::String(s, _) => s.clone(),
                other => panic!("unexpected URI {:?}", other),
            }
        })
        .collect();
    assert_eq!(uris[0], b"https://maps.google.com/?q=acme".to_vec());
    assert_eq!(uris[4], b"https://instagram.com/acme".to_vec());
}

#[test]
fn test_link_rects_follow_baselines() {
    let font = ReportFont::embedded().unwrap();
    let contact = full_contact();
    let layout = FooterLayout::compute(&contact, &font);
    let bytes = render_footer(&contact, None, &font, &PageSettings::default()).unwrap();
    let doc = Document::load_mem(&bytes).unwrap();
    let page_id = *doc.get_pages().get(&1).unwrap();
    let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
    let annots = page.get(b"Annots").unwrap().as_array().unwrap();

    for (i, annot) in annots.iter().enumerate() {
        let dict = doc
            .get_object(annot.as_reference().unwrap())
            .unwrap()
            .as_dict()
            .unwrap();
        let rect: Vec<f32> = dict
            .get(b"Rect")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect();
        let baseline = layout.base_y - i as f32 * LINE_STEP;
        assert!((rect[0] - LINKS_X).abs() < 0.01);
        assert!((rect[1] - (baseline - 5.0)).abs() < 0.01);
        assert!((rect[2] - (LINKS_X + layout.links[i].width)).abs() < 0.01);
        assert!((rect[3] - (baseline + 5.0)).abs() < 0.01);
    }
}

#[test]
fn test_footer_height_formula() {
    let font = ReportFont::embedded().unwrap();
    let contact = full_contact();
    let layout = FooterLayout::compute(&contact, &font);
    let lines = layout.info_lines.len().max(layout.links.len()) as f32;
    let body = (lines * 10.8_f32).max(57.6);
    assert!((layout.divider_y - (36.0 + body + 21.6)).abs() < 0.001);
    assert!((layout.height - (layout.divider_y + 10.8)).abs() < 0.001);
    assert!((layout.base_y - (36.0 + body)).abs() < 0.001);
}
