//! Page geometry read from the source PDF

use crate::balloon::DocPoint;
use crate::coords::{normalize_rotation, rotated_size};
use crate::error::BalloonError;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// US Letter, used when a page carries no MediaBox at all
const LETTER: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// `[x0, y0, x1, y1]` in PDF user space
    pub media_box: [f64; 4],
    /// Intrinsic `/Rotate` of the page, normalized
    pub rotation: u32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            media_box: LETTER,
            rotation: 0,
        }
    }
}

impl PageGeometry {
    pub fn width(&self) -> f64 {
        (self.media_box[2] - self.media_box[0]).abs()
    }

    pub fn height(&self) -> f64 {
        (self.media_box[3] - self.media_box[1]).abs()
    }

    /// Size as a viewer shows it once `extra` user rotation is applied.
    pub fn displayed_size(&self, extra: u32) -> (f64, f64) {
        rotated_size(self.width(), self.height(), self.displayed_rotation(extra))
    }

    pub fn displayed_rotation(&self, extra: u32) -> u32 {
        (self.rotation + extra) % 360
    }

    /// Document space is relative to the MediaBox lower-left corner.
    pub fn to_user_space(&self, p: DocPoint) -> DocPoint {
        p.offset(
            self.media_box[0].min(self.media_box[2]),
            self.media_box[1].min(self.media_box[3]),
        )
    }
}

/// Number of pages in a PDF
pub fn page_count(bytes: &[u8]) -> Result<u32, BalloonError> {
    let doc = Document::load_mem(bytes).map_err(|e| BalloonError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Geometry of every page, in page order
pub fn inspect(bytes: &[u8]) -> Result<Vec<PageGeometry>, BalloonError> {
    let doc = Document::load_mem(bytes).map_err(|e| BalloonError::ParseError(e.to_string()))?;
    Ok(document_geometry(&doc))
}

pub(crate) fn document_geometry(doc: &Document) -> Vec<PageGeometry> {
    doc.get_pages()
        .values()
        .map(|&page_id| page_geometry(doc, page_id))
        .collect()
}

pub(crate) fn page_geometry(doc: &Document, page_id: ObjectId) -> PageGeometry {
    let media_box = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| rect_from(doc, obj))
        .unwrap_or(LETTER);
    let rotation = inherited(doc, page_id, b"Rotate")
        .and_then(|obj| number(resolve(doc, obj)))
        .and_then(|deg| normalize_rotation(deg as i32).ok())
        .unwrap_or(0);
    PageGeometry {
        media_box,
        rotation,
    }
}

/// Look up a page attribute, walking up the page tree for inheritable keys.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok();
    // Page trees are shallow; the bound only guards against Parent cycles.
    for _ in 0..64 {
        let dict: &Dictionary = current?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    None
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(*v as f64),
        _ => None,
    }
}

fn rect_from(doc: &Document, obj: &Object) -> Option<[f64; 4]> {
    let arr = resolve(doc, obj).as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, item) in out.iter_mut().zip(arr) {
        *slot = number(resolve(doc, item))?;
    }
    Some(out)
}
