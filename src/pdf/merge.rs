//! Appends the pages of receipt PDFs to a generated form PDF.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::Error;

fn merge_error(error: impl std::fmt::Display) -> Error {
    tracing::error!("could not merge PDFs: {error}");
    Error::PdfError(error.to_string())
}

fn type_name(object: &Object) -> Option<&[u8]> {
    object
        .as_dict()
        .ok()
        .and_then(|dictionary| dictionary.get(b"Type").ok())
        .and_then(|name| name.as_name().ok())
}

/// Attributes a page may inherit from the page tree above it.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Copy attributes `page` inherits from its ancestors onto the page itself, since only the pages
/// of attached documents are kept.
fn with_inherited_attributes(document: &Document, page: &Dictionary) -> Dictionary {
    let mut page = page.clone();
    let mut parent_id = page.get(b"Parent").and_then(Object::as_reference).ok();

    while let Some(id) = parent_id {
        let Ok(parent) = document.get_object(id).and_then(Object::as_dict) else {
            break;
        };

        for key in INHERITABLE_KEYS {
            if !page.has(key)
                && let Ok(value) = parent.get(key)
            {
                page.set(key, value.clone());
            }
        }

        parent_id = parent.get(b"Parent").and_then(Object::as_reference).ok();
    }

    page
}

/// Append every page of each document in `attachments` to the end of `base`.
///
/// Attachments that cannot be parsed are skipped with a warning so that one bad receipt does not
/// stop the form from being exported.
///
/// # Errors
/// Returns [Error::PdfError] if `base` is not a valid PDF or the merged document cannot be
/// written.
pub fn append_pdf_pages(base: &[u8], attachments: &[Vec<u8>]) -> Result<Vec<u8>, Error> {
    if attachments.is_empty() {
        return Ok(base.to_vec());
    }

    let mut documents = vec![Document::load_mem(base).map_err(merge_error)?];
    for (index, attachment) in attachments.iter().enumerate() {
        match Document::load_mem(attachment) {
            Ok(document) => documents.push(document),
            Err(error) => tracing::warn!("skipping PDF receipt {index}, it could not be read: {error}"),
        }
    }

    let mut merged = Document::with_version("1.5");
    let mut max_id = 1;
    // Pages in reading order, across every document.
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut catalog: Option<(ObjectId, Dictionary)> = None;
    let mut pages_root: Option<(ObjectId, Dictionary)> = None;

    for mut document in documents {
        document.renumber_objects_with(max_id);
        max_id = document.max_id + 1;

        for page_id in document.get_pages().into_values() {
            if let Ok(page) = document.get_object(page_id).and_then(Object::as_dict) {
                pages.push((page_id, with_inherited_attributes(&document, page)));
            }
        }

        for (object_id, object) in document.objects {
            match type_name(&object) {
                // The first document's catalog and page tree become the merged document's.
                Some(b"Catalog") => {
                    if catalog.is_none()
                        && let Ok(dictionary) = object.as_dict()
                    {
                        catalog = Some((object_id, dictionary.clone()));
                    }
                }
                Some(b"Pages") => {
                    if pages_root.is_none()
                        && let Ok(dictionary) = object.as_dict()
                    {
                        pages_root = Some((object_id, dictionary.clone()));
                    }
                }
                Some(b"Page" | b"Outlines" | b"Outline") => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }
    }

    let (catalog_id, mut catalog) =
        catalog.ok_or_else(|| merge_error("the form PDF has no catalog"))?;
    let (pages_root_id, mut pages_root) =
        pages_root.ok_or_else(|| merge_error("the form PDF has no page tree"))?;

    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, mut page) in pages {
        page.set("Parent", pages_root_id);
        merged.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    pages_root.set("Count", Object::Integer(kids.len() as i64));
    pages_root.set("Kids", Object::Array(kids));
    merged
        .objects
        .insert(pages_root_id, Object::Dictionary(pages_root));

    catalog.set("Pages", pages_root_id);
    catalog.remove(b"Outlines");
    merged.objects.insert(catalog_id, Object::Dictionary(catalog));

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.compress();

    let mut bytes = Vec::new();
    merged.save_to(&mut bytes).map_err(merge_error)?;

    Ok(bytes)
}
