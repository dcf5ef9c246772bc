use std::fs;
use std::path::Path;

use lopdf::{Document, Object, ObjectId};

use crate::model::{Rect, TextFragment};

use super::text::fragments_from_content;
use super::PdfError;

/// The input PDF plus its raw bytes. The bytes are kept so each session
/// output can start from a fresh copy of the document.
pub struct SourceDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
    bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn load(path: &Path) -> Result<Self, PdfError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PdfError> {
        let doc = Document::load_mem(&bytes)?;
        let page_ids = doc.get_pages().values().copied().collect();

        Ok(Self {
            doc,
            page_ids,
            bytes,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, page: usize) -> Result<ObjectId, PdfError> {
        self.page_ids
            .get(page)
            .copied()
            .ok_or(PdfError::PageOutOfRange {
                page,
                page_count: self.page_ids.len(),
            })
    }

    /// MediaBox of the page, walking up the page tree for inherited values.
    pub fn page_size(&self, page: usize) -> Result<Rect, PdfError> {
        let page_id = self.page_id(page)?;
        media_box(&self.doc, page_id)
    }

    /// Positioned text fragments for one page, in visual order (top to
    /// bottom, then left to right).
    pub fn page_fragments(&self, page: usize) -> Result<Vec<TextFragment>, PdfError> {
        let page_id = self.page_id(page)?;
        let content = self.doc.get_page_content(page_id)?;
        fragments_from_content(&content)
    }

    /// Plain text of one page: the positioned fragments joined line by
    /// line. Using the same extraction for both views keeps the segmenter
    /// and the locator consistent with each other.
    pub fn page_text(&self, page: usize) -> Result<String, PdfError> {
        let fragments = self.page_fragments(page)?;
        let mut text = String::new();
        for fragment in &fragments {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&fragment.text);
        }

        Ok(text)
    }
}

/// Look up a key in the page dictionary, following /Parent links when the
/// key is inherited from the page tree. The walk tracks visited nodes so a
/// malformed document with a parent cycle fails instead of looping.
pub(crate) fn resolve_inherited<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>, PdfError> {
    let mut visited: Vec<ObjectId> = Vec::new();
    let mut current_id = page_id;
    loop {
        if visited.contains(&current_id) {
            return Err(PdfError::Malformed(format!(
                "page tree parent cycle at object {current_id:?}"
            )));
        }
        visited.push(current_id);

        let dict = doc
            .get_object(current_id)
            .and_then(|object| object.as_dict())
            .map_err(PdfError::Parse)?;

        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }

        match dict.get(b"Parent") {
            Ok(parent) => {
                current_id = parent.as_reference().map_err(PdfError::Parse)?;
            }
            Err(_) => return Ok(None),
        }
    }
}

pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> Result<Rect, PdfError> {
    let object = resolve_inherited(doc, page_id, b"MediaBox")?
        .ok_or_else(|| PdfError::Malformed("MediaBox not found on page or ancestors".into()))?;

    let array = object.as_array().map_err(PdfError::Parse)?;
    rect_from_array(array)
}

pub(crate) fn rect_from_array(array: &[Object]) -> Result<Rect, PdfError> {
    if array.len() != 4 {
        return Err(PdfError::Malformed(format!(
            "expected 4-element box array, got {}",
            array.len()
        )));
    }

    Ok(Rect::new(
        object_to_f32(&array[0])?,
        object_to_f32(&array[1])?,
        object_to_f32(&array[2])?,
        object_to_f32(&array[3])?,
    ))
}

pub(crate) fn object_to_f32(object: &Object) -> Result<f32, PdfError> {
    match object {
        Object::Integer(value) => Ok(*value as f32),
        Object::Real(value) => Ok(*value),
        _ => Err(PdfError::Malformed(format!(
            "expected number, got {object:?}"
        ))),
    }
}
