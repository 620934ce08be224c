//! Blend job descriptions.
//!
//! A job lists one input grid per line:
//!
//! ```text
//! # file          inner region    weight
//! north.grd       -R0/10/5/10     1
//! south.grd       0/10/0/5        -0.5
//! patch.grd=bs    -
//! base.grd        2
//! ```
//!
//! The inner region may be `-` (the whole grid), `w/e/s/n` or
//! `-Rw/e/s/n`. Weight defaults to 1; a negative weight inverts the
//! sense of the taper. Blank lines and lines starting with `#` are
//! ignored.

use crate::BlendError;
use gmtgrid::{GridLocation, Region};
use std::io::BufRead;

/// One input grid of a blend job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub grid: GridLocation,

    /// Region receiving full weight, `None` meaning the grid's own
    /// region.
    pub inner: Option<Region>,

    /// Signed weight, negative to invert the taper.
    pub weight: f64,
}

impl JobRecord {
    /// Returns a record for `grid` with full weight over its whole
    /// region.
    pub fn new(grid: GridLocation) -> Self {
        Self {
            grid,
            inner: None,
            weight: 1.0,
        }
    }

    #[must_use]
    pub fn inner(mut self, inner: Region) -> Self {
        self.inner = Some(inner);
        self
    }

    #[must_use]
    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

/// Parses every record of a job description.
pub fn parse_job<R: BufRead>(rdr: R) -> Result<Vec<JobRecord>, BlendError> {
    let mut records = Vec::new();
    for (idx, line) in rdr.lines().enumerate() {
        if let Some(record) = parse_line(&line?, idx + 1)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Parses line number `line_no` of a job description, returning
/// `None` for blank and comment lines.
pub fn parse_line(line: &str, line_no: usize) -> Result<Option<JobRecord>, BlendError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mk_err = |reason: String| BlendError::JobLine {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    let (file, inner, weight) = match fields[..] {
        [file] => (file, None, None),
        [file, second] if is_region_field(second) => (file, Some(second), None),
        [file, weight] => (file, None, Some(weight)),
        [file, inner, weight] => (file, Some(inner), Some(weight)),
        _ => return Err(mk_err(format!("expected 1 to 3 fields, got {}", fields.len()))),
    };

    let grid = GridLocation::file(file).map_err(|e| mk_err(e.to_string()))?;
    let mut record = JobRecord::new(grid);
    match inner {
        None | Some("-") => (),
        Some(inner) => {
            let region = inner.parse::<Region>().map_err(|e| mk_err(e.to_string()))?;
            record = record.inner(region);
        }
    }
    if let Some(weight) = weight {
        let weight = weight
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite())
            .ok_or_else(|| mk_err(format!("invalid weight '{weight}'")))?;
        record = record.weight(weight);
    }
    Ok(Some(record))
}

fn is_region_field(field: &str) -> bool {
    field == "-" || field.starts_with("-R") || field.contains('/')
}
