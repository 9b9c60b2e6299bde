use base64::Engine;
use lopdf::{Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap};

use super::ExtractionError;
use crate::models::ExtractedImage;

/// Per-page text via pdf-extract, numbered from 1
pub(super) fn extract_pages(bytes: &[u8]) -> Result<BTreeMap<u32, String>, ExtractionError> {
    let page_texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    Ok(page_texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| (i as u32 + 1, text))
        .collect())
}

/// Embedded JPEG (DCTDecode) image streams
///
/// Best effort: a document lopdf cannot load simply yields no images.
pub(super) fn extract_images(bytes: &[u8]) -> Vec<ExtractedImage> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping image extraction");
            return Vec::new();
        }
    };

    let pages = image_pages(&doc);
    let engine = base64::engine::general_purpose::STANDARD;
    let mut images = Vec::new();

    for (id, object) in &doc.objects {
        let Object::Stream(stream) = object else {
            continue;
        };
        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(|o| o.as_name())
            .map(|name| name == b"Image")
            .unwrap_or(false);
        if !is_image || !has_dct_filter(stream.dict.get(b"Filter").ok()) {
            continue;
        }

        images.push(ExtractedImage {
            page: pages.get(id).copied(),
            index: images.len(),
            data: engine.encode(&stream.content),
            ext: "jpg".to_string(),
            size: stream.content.len(),
        });
    }
    images
}

fn has_dct_filter(filter: Option<&Object>) -> bool {
    match filter {
        Some(Object::Name(name)) => name == b"DCTDecode",
        Some(Object::Array(filters)) => filters
            .iter()
            .any(|f| matches!(f, Object::Name(name) if name == b"DCTDecode")),
        _ => false,
    }
}

/// Map image object ids to the first page whose XObject resources reference them
fn image_pages(doc: &Document) -> HashMap<ObjectId, u32> {
    let mut map = HashMap::new();
    for (page_no, page_id) in doc.get_pages() {
        let Ok(page) = doc.get_dictionary(page_id) else {
            continue;
        };
        let Some(resources) = page
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            continue;
        };
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            continue;
        };
        for (_, value) in xobjects.iter() {
            if let Ok(id) = value.as_reference() {
                map.entry(id).or_insert(page_no);
            }
        }
    }
    map
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}
