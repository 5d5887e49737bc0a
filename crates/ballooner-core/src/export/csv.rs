//! Flat CSV listing of balloons

use crate::balloon::Balloon;
use crate::error::BalloonError;
use crate::sheet::by_page_and_number;
use std::io::Write;
use std::path::Path;

pub const HEADER: [&str; 5] = ["Number", "Page", "X (pts)", "Y (pts)", "Description"];

/// Coordinates are rounded to 2 decimals and written without trailing
/// zeros, keeping one decimal place: `5.0`, `20.5`, `0.33`.
fn coordinate(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        rounded.to_string()
    }
}

/// Write balloons sorted by page and number. Pages are 1-based and the
/// coordinates are the circle centre in document space.
pub fn write_csv<'a, W, I>(writer: W, balloons: I) -> Result<usize, BalloonError>
where
    W: Write,
    I: IntoIterator<Item = &'a Balloon>,
{
    let mut sorted: Vec<&Balloon> = balloons.into_iter().collect();
    sorted.sort_by(|a, b| by_page_and_number(a, b));

    let mut out = ::csv::Writer::from_writer(writer);
    out.write_record(HEADER)?;
    for b in &sorted {
        out.write_record([
            b.number.to_string(),
            (b.page + 1).to_string(),
            coordinate(b.balloon_center.x),
            coordinate(b.balloon_center.y),
            b.description.clone(),
        ])?;
    }
    out.flush()?;
    Ok(sorted.len())
}

pub fn export_csv<'a, I>(path: &Path, balloons: I) -> Result<usize, BalloonError>
where
    I: IntoIterator<Item = &'a Balloon>,
{
    let file = std::fs::File::create(path)?;
    let rows = write_csv(std::io::BufWriter::new(file), balloons)?;
    tracing::info!(path = %path.display(), rows, "exported CSV");
    Ok(rows)
}
