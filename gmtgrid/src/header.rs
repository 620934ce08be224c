//! Grid geometry and the native binary grid header.
//!
//! # Layout
//!
//! The header is 892 bytes, little endian:
//!
//! | field                   | type      |
//! |-------------------------|-----------|
//! | columns, rows           | `i32` × 2 |
//! | registration            | `i32`     |
//! | west, east, south, north| `f64` × 4 |
//! | z min, z max            | `f64` × 2 |
//! | x inc, y inc            | `f64` × 2 |
//! | z scale, z offset       | `f64` × 2 |
//! | x, y, z units; title    | 80 bytes each |
//! | command                 | 320 bytes |
//! | remark                  | 160 bytes |
//!
//! Samples follow, one row at a time starting with the northernmost.

use crate::{GridError, Region, Registration, C};
use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use geo::geometry::Coord;
use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

/// Size of the native binary header in bytes.
pub const HEADER_LEN: u64 = 892;

const UNITS_LEN: usize = 80;
const TITLE_LEN: usize = 80;
const COMMAND_LEN: usize = 320;
const REMARK_LEN: usize = 160;

/// Fraction of a cell by which a region may miss a whole number of
/// increments.
const CELL_SLOP: C = 1e-6;

/// The node layout of a grid: region, increment, registration and
/// the derived dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    region: Region,
    inc: Coord<C>,
    registration: Registration,
    n_columns: usize,
    n_rows: usize,
}

impl GridSpec {
    /// Returns a spec for `region` sampled every `inc`, failing
    /// unless the region spans a whole number of increments.
    pub fn new(region: Region, inc: Coord<C>, registration: Registration) -> Result<Self, GridError> {
        if !(inc.x > 0.0 && inc.y > 0.0 && inc.x.is_finite() && inc.y.is_finite()) {
            return Err(GridError::Increment(inc.x, inc.y));
        }
        let mk_err = || GridError::Inconsistent {
            region: region.to_string(),
            dx: inc.x,
            dy: inc.y,
        };
        let cells_x = region.width() / inc.x;
        let cells_y = region.height() / inc.y;
        if (cells_x - cells_x.round()).abs() > CELL_SLOP
            || (cells_y - cells_y.round()).abs() > CELL_SLOP
        {
            return Err(mk_err());
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (cells_x, cells_y) = (cells_x.round() as usize, cells_y.round() as usize);
        let (n_columns, n_rows) = match registration {
            Registration::Gridline => (cells_x + 1, cells_y + 1),
            Registration::Pixel => (cells_x, cells_y),
        };
        if n_columns == 0 || n_rows == 0 {
            return Err(mk_err());
        }
        Ok(Self {
            region,
            inc,
            registration,
            n_columns,
            n_rows,
        })
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Returns the (x, y) node spacing.
    pub fn inc(&self) -> Coord<C> {
        self.inc
    }

    pub fn registration(&self) -> Registration {
        self.registration
    }

    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the number of nodes in the grid.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.n_columns * self.n_rows
    }

    /// Returns the x coordinate of column `col`.
    #[allow(clippy::cast_precision_loss)]
    pub fn col_to_x(&self, col: usize) -> C {
        self.region.west() + (col as C + self.registration.offset()) * self.inc.x
    }

    /// Returns the y coordinate of row `row`, row 0 being the
    /// northernmost.
    #[allow(clippy::cast_precision_loss)]
    pub fn row_to_y(&self, row: usize) -> C {
        self.region.north() - (row as C + self.registration.offset()) * self.inc.y
    }
}

/// Native binary grid header.
#[derive(Debug, Clone, PartialEq)]
pub struct GridHeader {
    pub spec: GridSpec,
    pub z_min: C,
    pub z_max: C,
    pub z_scale: C,
    pub z_offset: C,
    pub x_units: String,
    pub y_units: String,
    pub z_units: String,
    pub title: String,
    pub command: String,
    pub remark: String,
}

impl GridHeader {
    /// Returns a header with empty statistics and text fields.
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            z_min: C::NAN,
            z_max: C::NAN,
            z_scale: 1.0,
            z_offset: 0.0,
            x_units: String::new(),
            y_units: String::new(),
            z_units: String::new(),
            title: String::new(),
            command: String::new(),
            remark: String::new(),
        }
    }

    /// Reads only the header of the grid file at `path`.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let mut rdr = BufReader::new(File::open(&path)?);
        Self::from_reader(&mut rdr).map_err(|e| match e {
            GridError::Io(e) => GridError::Header(path.as_ref().to_owned(), e.to_string()),
            other => other,
        })
    }

    pub fn from_reader<R: Read>(rdr: &mut R) -> Result<Self, GridError> {
        let n_columns = rdr.read_i32::<LE>()?;
        let n_rows = rdr.read_i32::<LE>()?;
        let registration = Registration::from_code(rdr.read_i32::<LE>()?)?;
        let mut wesn = [0.0; 4];
        rdr.read_f64_into::<LE>(&mut wesn)?;
        let z_min = rdr.read_f64::<LE>()?;
        let z_max = rdr.read_f64::<LE>()?;
        let inc = Coord {
            x: rdr.read_f64::<LE>()?,
            y: rdr.read_f64::<LE>()?,
        };
        let z_scale = rdr.read_f64::<LE>()?;
        let z_offset = rdr.read_f64::<LE>()?;
        let x_units = read_text(rdr, UNITS_LEN)?;
        let y_units = read_text(rdr, UNITS_LEN)?;
        let z_units = read_text(rdr, UNITS_LEN)?;
        let title = read_text(rdr, TITLE_LEN)?;
        let command = read_text(rdr, COMMAND_LEN)?;
        let remark = read_text(rdr, REMARK_LEN)?;

        let [west, east, south, north] = wesn;
        let spec = GridSpec::new(Region::new(west, east, south, north)?, inc, registration)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let dims = (spec.n_columns as i32, spec.n_rows as i32);
        if dims != (n_columns, n_rows) {
            return Err(GridError::Inconsistent {
                region: spec.region.to_string(),
                dx: inc.x,
                dy: inc.y,
            });
        }
        Ok(Self {
            spec,
            z_min,
            z_max,
            z_scale: if z_scale == 0.0 { 1.0 } else { z_scale },
            z_offset,
            x_units,
            y_units,
            z_units,
            title,
            command,
            remark,
        })
    }

    pub fn write_to<W: Write>(&self, wtr: &mut W) -> Result<(), GridError> {
        let spec = &self.spec;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let dims = [spec.n_columns as i32, spec.n_rows as i32];
        for dim in dims {
            wtr.write_i32::<LE>(dim)?;
        }
        wtr.write_i32::<LE>(spec.registration.code())?;
        for bound in [
            spec.region.west(),
            spec.region.east(),
            spec.region.south(),
            spec.region.north(),
            self.z_min,
            self.z_max,
            spec.inc.x,
            spec.inc.y,
            self.z_scale,
            self.z_offset,
        ] {
            wtr.write_f64::<LE>(bound)?;
        }
        write_text(wtr, &self.x_units, UNITS_LEN)?;
        write_text(wtr, &self.y_units, UNITS_LEN)?;
        write_text(wtr, &self.z_units, UNITS_LEN)?;
        write_text(wtr, &self.title, TITLE_LEN)?;
        write_text(wtr, &self.command, COMMAND_LEN)?;
        write_text(wtr, &self.remark, REMARK_LEN)?;
        Ok(())
    }
}

/// Reads a NUL padded text field of `len` bytes.
fn read_text<R: Read>(rdr: &mut R, len: usize) -> Result<String, GridError> {
    let mut buf = vec![0_u8; len];
    rdr.read_exact(&mut buf)?;
    let end = buf.iter().position(|&b| b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
}

/// Writes `text` as a NUL padded field of `len` bytes, truncating so
/// at least one NUL remains.
fn write_text<W: Write>(wtr: &mut W, text: &str, len: usize) -> Result<(), GridError> {
    let mut buf = vec![0_u8; len];
    let mut end = text.len().min(len - 1);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    buf[..end].copy_from_slice(&text.as_bytes()[..end]);
    wtr.write_all(&buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{GridHeader, GridSpec, HEADER_LEN};
    use crate::{Region, Registration};
    use approx::assert_relative_eq;
    use geo::geometry::Coord;

    fn spec(registration: Registration) -> GridSpec {
        GridSpec::new(
            Region::new(0.0, 4.0, 0.0, 4.0).unwrap(),
            Coord { x: 1.0, y: 0.5 },
            registration,
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions() {
        let gridline = spec(Registration::Gridline);
        assert_eq!((gridline.n_columns(), gridline.n_rows()), (5, 9));
        let pixel = spec(Registration::Pixel);
        assert_eq!((pixel.n_columns(), pixel.n_rows()), (4, 8));
    }

    #[test]
    fn test_node_coordinates() {
        let gridline = spec(Registration::Gridline);
        assert_relative_eq!(gridline.col_to_x(0), 0.0);
        assert_relative_eq!(gridline.col_to_x(4), 4.0);
        assert_relative_eq!(gridline.row_to_y(0), 4.0);
        assert_relative_eq!(gridline.row_to_y(8), 0.0);
        let pixel = spec(Registration::Pixel);
        assert_relative_eq!(pixel.col_to_x(0), 0.5);
        assert_relative_eq!(pixel.row_to_y(7), 0.25);
    }

    #[test]
    fn test_inconsistent_increment() {
        let region = Region::new(0.0, 4.0, 0.0, 4.0).unwrap();
        assert!(GridSpec::new(region, Coord { x: 0.3, y: 1.0 }, Registration::Gridline).is_err());
        assert!(GridSpec::new(region, Coord { x: 0.0, y: 1.0 }, Registration::Gridline).is_err());
        assert!(GridSpec::new(region, Coord { x: 0.1, y: 0.1 }, Registration::Pixel).is_ok());
    }

    #[test]
    fn test_header_round_trip() {
        let mut header = GridHeader::new(spec(Registration::Pixel));
        header.z_min = -3.5;
        header.z_max = 12.0;
        header.title = "blended".to_string();
        header.command = "x".repeat(400);

        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len() as u64, HEADER_LEN);

        let parsed = GridHeader::from_reader(&mut &bytes[..]).unwrap();
        assert_eq!(parsed.spec, header.spec);
        assert_eq!(parsed.z_min, -3.5);
        assert_eq!(parsed.z_max, 12.0);
        assert_eq!(parsed.title, "blended");
        assert_eq!(parsed.command.len(), 319);
    }

    #[test]
    fn test_header_dimension_mismatch() {
        let header = GridHeader::new(spec(Registration::Gridline));
        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        // Claim one extra column.
        bytes[0] = 6;
        assert!(GridHeader::from_reader(&mut &bytes[..]).is_err());
    }
}
