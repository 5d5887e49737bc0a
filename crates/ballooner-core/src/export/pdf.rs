//! Vector overlay export
//!
//! Balloons are drawn as new content streams appended to each page. The
//! original streams are wrapped in `q`/`Q` so whatever graphics state they
//! leave behind cannot leak into the overlay, and they are never rewritten.

use crate::balloon::{Balloon, DocPoint, Rgb};
use crate::coords::normalize_rotation;
use crate::error::BalloonError;
use crate::pdf::{inherited, page_geometry, resolve, PageGeometry};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Bézier control distance for a quarter circle, as a fraction of the radius
const KAPPA: f64 = 0.5523;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    /// Stroke width for leaders and circles, in points
    pub line_width: f64,
    /// Arrowhead length, in points
    pub arrow_size: f64,
    /// Base font for the numbers; must be one of the standard 14
    pub font: String,
    pub compress: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            line_width: 1.5,
            arrow_size: 5.0,
            font: "Helvetica-Bold".to_string(),
            compress: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages_annotated: u32,
    pub pages_rotated: u32,
    pub balloons_drawn: u32,
}

/// Export `src` with balloons burned in to `dst`.
///
/// # Errors
///
/// Refuses to write over `src` or to apply a rotation that is not a
/// multiple of 90. Fails if the source cannot be read or parsed, or the
/// output cannot be written.
pub fn export_pdf<'a, I>(
    src: &Path,
    dst: &Path,
    balloons: I,
    rotations: &BTreeMap<u32, u32>,
    options: &OverlayOptions,
) -> Result<ExportSummary, BalloonError>
where
    I: IntoIterator<Item = &'a Balloon>,
{
    if same_file(src, dst) {
        return Err(BalloonError::OverwriteSource(dst.to_path_buf()));
    }
    let bytes = std::fs::read(src)?;
    let (output, summary) = render(&bytes, balloons, rotations, options)?;
    std::fs::write(dst, output)?;
    tracing::info!(
        src = %src.display(),
        dst = %dst.display(),
        pages = summary.pages_annotated,
        balloons = summary.balloons_drawn,
        "exported annotated PDF"
    );
    Ok(summary)
}

/// In-memory variant of [`export_pdf`].
pub fn export_pdf_bytes<'a, I>(
    bytes: &[u8],
    balloons: I,
    rotations: &BTreeMap<u32, u32>,
    options: &OverlayOptions,
) -> Result<Vec<u8>, BalloonError>
where
    I: IntoIterator<Item = &'a Balloon>,
{
    render(bytes, balloons, rotations, options).map(|(output, _)| output)
}

fn render<'a, I>(
    bytes: &[u8],
    balloons: I,
    rotations: &BTreeMap<u32, u32>,
    options: &OverlayOptions,
) -> Result<(Vec<u8>, ExportSummary), BalloonError>
where
    I: IntoIterator<Item = &'a Balloon>,
{
    let rotations = rotations
        .iter()
        .map(|(&page, &deg)| {
            let deg = i32::try_from(deg).map_err(|_| BalloonError::InvalidRotation(i32::MAX))?;
            Ok((page, normalize_rotation(deg)?))
        })
        .collect::<Result<BTreeMap<u32, u32>, BalloonError>>()?;

    let mut doc =
        Document::load_mem(bytes).map_err(|e| BalloonError::ParseError(e.to_string()))?;
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let mut by_page: BTreeMap<u32, Vec<&Balloon>> = BTreeMap::new();
    for balloon in balloons {
        by_page.entry(balloon.page).or_default().push(balloon);
    }
    for (&page, list) in by_page.range(pages.len() as u32..) {
        tracing::warn!(page, count = list.len(), "skipping balloons on a page the PDF does not have");
    }

    let mut summary = ExportSummary::default();
    for (index, &page_id) in pages.iter().enumerate() {
        let index = index as u32;
        let geometry = page_geometry(&doc, page_id);

        if let Some(&extra) = rotations.get(&index).filter(|&&r| r != 0) {
            let rotate = geometry.displayed_rotation(extra);
            doc.get_dictionary_mut(page_id)?
                .set("Rotate", Object::Integer(rotate as i64));
            summary.pages_rotated += 1;
            tracing::debug!(page = index, rotate, "set page rotation");
        }

        let Some(list) = by_page.get(&index) else {
            continue;
        };
        let font_name = register_font(&mut doc, page_id, &options.font)?;
        let content = overlay_content(list, &geometry, &font_name, options);
        append_overlay(&mut doc, page_id, content)?;
        summary.pages_annotated += 1;
        summary.balloons_drawn += list.len() as u32;
        tracing::debug!(page = index, balloons = list.len(), "drew overlay");
    }

    if options.compress {
        doc.compress();
    }
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| BalloonError::OperationError(e.to_string()))?;
    Ok((output, summary))
}

/// Leaders and arrowheads first, then circles, then numbers, so every
/// number sits on top of any fill drawn after its own leader.
pub(crate) fn overlay_content(
    balloons: &[&Balloon],
    geometry: &PageGeometry,
    font_name: &str,
    options: &OverlayOptions,
) -> Content {
    let to_user = |p: DocPoint| geometry.to_user_space(p);
    let mut ops = Vec::new();

    for balloon in balloons {
        let Some(leader) = balloon.leader() else {
            continue;
        };
        let colour = balloon.style.palette().leader;
        let start = to_user(leader.start);
        let end = to_user(leader.end);
        ops.push(Operation::new("q", vec![]));
        ops.push(colour_op("RG", colour));
        ops.push(Operation::new("w", vec![real(options.line_width)]));
        ops.push(Operation::new("m", point(start)));
        ops.push(Operation::new("l", point(end)));
        ops.push(Operation::new("S", vec![]));
        if let Some([tip, left, right]) = leader.arrowhead(options.arrow_size) {
            ops.push(colour_op("rg", colour));
            ops.push(Operation::new("m", point(to_user(tip))));
            ops.push(Operation::new("l", point(to_user(left))));
            ops.push(Operation::new("l", point(to_user(right))));
            ops.push(Operation::new("h", vec![]));
            ops.push(Operation::new("f", vec![]));
        }
        ops.push(Operation::new("Q", vec![]));
    }

    for balloon in balloons {
        let palette = balloon.style.palette();
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("w", vec![real(options.line_width)]));
        ops.push(colour_op("RG", palette.circle_stroke));
        if let Some(fill) = palette.circle_fill {
            ops.push(colour_op("rg", fill));
        }
        circle_path(&mut ops, to_user(balloon.balloon_center), balloon.radius());
        let paint = if palette.circle_fill.is_some() { "B" } else { "S" };
        ops.push(Operation::new(paint, vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    for balloon in balloons {
        let origin = to_user(balloon.label_origin());
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(font_name.as_bytes().to_vec()), real(balloon.font_size())],
        ));
        ops.push(colour_op("rg", balloon.style.palette().text));
        ops.push(Operation::new("Td", point(origin)));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(balloon.label())],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    Content { operations: ops }
}

fn circle_path(ops: &mut Vec<Operation>, c: DocPoint, r: f64) {
    let k = KAPPA * r;
    let (x, y) = (c.x, c.y);
    ops.push(Operation::new("m", vec![real(x + r), real(y)]));
    let curves = [
        [x + r, y + k, x + k, y + r, x, y + r],
        [x - k, y + r, x - r, y + k, x - r, y],
        [x - r, y - k, x - k, y - r, x, y - r],
        [x + k, y - r, x + r, y - k, x + r, y],
    ];
    for curve in curves {
        ops.push(Operation::new("c", curve.iter().copied().map(real).collect()));
    }
    ops.push(Operation::new("h", vec![]));
}

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn point(p: DocPoint) -> Vec<Object> {
    vec![real(p.x), real(p.y)]
}

fn colour_op(operator: &str, (r, g, b): Rgb) -> Operation {
    Operation::new(
        operator,
        vec![Object::Real(r), Object::Real(g), Object::Real(b)],
    )
}

/// Add the label font to the page resources under an unused name.
///
/// Inherited resources are copied onto the page first, and an indirect
/// `/Font` dictionary is replaced by a page-local copy, so other pages
/// sharing those objects are unaffected.
fn register_font(doc: &mut Document, page_id: ObjectId, base_font: &str) -> Result<String, BalloonError> {
    let mut resources = inherited(doc, page_id, b"Resources")
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();
    let mut fonts = resources
        .get(b"Font")
        .ok()
        .map(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    let name = unused_name(&fonts);
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
        "Encoding" => "WinAnsiEncoding",
    });
    fonts.set(name.as_bytes().to_vec(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));
    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(resources));
    Ok(name)
}

fn unused_name(fonts: &Dictionary) -> String {
    let mut n = 1;
    loop {
        let name = format!("FBln{}", n);
        if !fonts.has(name.as_bytes()) {
            return name;
        }
        n += 1;
    }
}

fn append_overlay(doc: &mut Document, page_id: ObjectId, content: Content) -> Result<(), BalloonError> {
    let encoded = content
        .encode()
        .map_err(|e| BalloonError::OperationError(e.to_string()))?;
    let existing = content_refs(doc, page_id)?;

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let restore = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.push(Object::Reference(save));
        contents.extend(existing);
        contents.push(Object::Reference(restore));
    }
    let overlay = doc.add_object(Stream::new(Dictionary::new(), encoded));
    contents.push(Object::Reference(overlay));

    doc.get_dictionary_mut(page_id)?
        .set("Contents", Object::Array(contents));
    Ok(())
}

/// Page content streams as a flat list of references
fn content_refs(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>, BalloonError> {
    let page = doc.get_dictionary(page_id)?;
    let refs = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(*id)],
        },
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    Ok(refs)
}

/// True when writing `dst` would replace `src`, following symlinks and
/// relative paths.
fn same_file(src: &Path, dst: &Path) -> bool {
    let canonical = |p: &Path| -> Option<PathBuf> {
        if let Ok(c) = p.canonicalize() {
            return Some(c);
        }
        let parent = match p.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.canonicalize().ok()?,
            _ => std::env::current_dir().ok()?,
        };
        Some(parent.join(p.file_name()?))
    };
    match (canonical(src), canonical(dst)) {
        (Some(a), Some(b)) => a == b,
        _ => src == dst,
    }
}
