use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::model::Boundary;

use super::document::media_box;
use super::PdfError;

/// Materialize one session: reload the source bytes, keep only the
/// boundary's page span, crop the first and last page, stamp the session
/// label into the document keywords and save. Interior pages of a span
/// keep their full height.
pub fn write_session(
    source_bytes: &[u8],
    boundary: &Boundary,
    label: &str,
    output_path: &Path,
) -> Result<(), PdfError> {
    let mut doc = Document::load_mem(source_bytes)?;
    let page_count = doc.get_pages().len();

    if boundary.end_page >= page_count || boundary.start_page > boundary.end_page {
        return Err(PdfError::PageOutOfRange {
            page: boundary.end_page,
            page_count,
        });
    }

    // lopdf page numbers are 1-based.
    let delete: Vec<u32> = (1..=page_count as u32)
        .filter(|number| {
            let index = (*number as usize) - 1;
            index < boundary.start_page || index > boundary.end_page
        })
        .collect();
    if !delete.is_empty() {
        doc.delete_pages(&delete);
    }

    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    let (Some(&first), Some(&last)) = (pages.first(), pages.last()) else {
        return Err(PdfError::Malformed(
            "no pages left after copying the session span".into(),
        ));
    };

    if pages.len() == 1 {
        let media = media_box(&doc, first)?;
        set_crop_box(
            &mut doc,
            first,
            media.left,
            boundary.bottom_crop_y,
            media.right,
            boundary.top_crop_y,
        )?;
    } else {
        let media_first = media_box(&doc, first)?;
        set_crop_box(
            &mut doc,
            first,
            media_first.left,
            media_first.bottom,
            media_first.right,
            boundary.top_crop_y,
        )?;

        let media_last = media_box(&doc, last)?;
        set_crop_box(
            &mut doc,
            last,
            media_last.left,
            boundary.bottom_crop_y,
            media_last.right,
            media_last.top,
        )?;
    }

    set_keywords(&mut doc, label)?;

    doc.compress();
    doc.save(output_path)?;

    Ok(())
}

fn set_crop_box(
    doc: &mut Document,
    page_id: ObjectId,
    left: f32,
    bottom: f32,
    right: f32,
    top: f32,
) -> Result<(), PdfError> {
    let dict = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(PdfError::Parse)?;

    dict.set(
        "CropBox",
        Object::Array(vec![
            left.into(),
            bottom.into(),
            right.into(),
            top.into(),
        ]),
    );

    Ok(())
}

/// Record the session label in the document information dictionary, under
/// /Keywords, creating the dictionary when the source has none.
fn set_keywords(doc: &mut Document, value: &str) -> Result<(), PdfError> {
    let info_id = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|object| object.as_reference().ok());

    match info_id {
        Some(id) => {
            let dict = doc
                .get_object_mut(id)
                .and_then(Object::as_dict_mut)
                .map_err(PdfError::Parse)?;
            dict.set("Keywords", Object::string_literal(value));
        }
        None => {
            let mut dict = Dictionary::new();
            dict.set("Keywords", Object::string_literal(value));
            let id = doc.add_object(Object::Dictionary(dict));
            doc.trailer.set("Info", Object::Reference(id));
        }
    }

    Ok(())
}
