//! Row-by-row grid output.

use crate::{GridError, GridFormat, GridHeader};
use byteorder::{ByteOrder, LittleEndian as LE};
use log::debug;
use std::{
    fs::File,
    io::{BufWriter, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

/// Destination for a grid written one row at a time, northernmost row
/// first.
pub trait GridSink {
    /// Returns a human readable name for log and error messages.
    fn name(&self) -> String;

    /// Writes row `row`; rows must arrive in strictly increasing order.
    fn write_row(&mut self, row: usize, data: &[f32]) -> Result<(), GridError>;

    /// Records the final value range once every row is written.
    fn finish(&mut self, z_min: f64, z_max: f64) -> Result<(), GridError>;
}

/// Creates the sink for `path`, picking the format once up front.
///
/// `headerless` selects a bare stream of little-endian floats, which
/// is only meaningful for the native float format.
pub fn create_sink<P: AsRef<Path>>(
    path: P,
    header: &GridHeader,
    headerless: bool,
) -> Result<Box<dyn GridSink>, GridError> {
    let (file, format) = match GridFormat::split_path(&path) {
        Err(GridError::NetCdf(_)) if headerless => {
            return Err(GridError::Headerless(path.as_ref().to_owned()))
        }
        other => other?,
    };
    let format = format.unwrap_or(GridFormat::Float);
    if headerless {
        if format != GridFormat::Float {
            return Err(GridError::Headerless(file));
        }
        Ok(Box::new(RawWriter::create(file, header)?))
    } else {
        Ok(Box::new(NativeWriter::create(file, header.clone(), format)?))
    }
}

/// Writes a native binary grid: header, then rows.
///
/// The header is written twice: first with placeholder statistics so
/// rows land at their final offsets, then again by
/// [`GridSink::finish`].
pub struct NativeWriter {
    path: PathBuf,
    header: GridHeader,
    format: GridFormat,
    wtr: BufWriter<File>,
    raw: Vec<u8>,
    next_row: usize,
}

impl NativeWriter {
    pub fn create<P: AsRef<Path>>(
        path: P,
        header: GridHeader,
        format: GridFormat,
    ) -> Result<Self, GridError> {
        let path = path.as_ref().to_owned();
        debug!("creating {path:?} as {}", format.id());
        let mut wtr = BufWriter::new(File::create(&path)?);
        header.write_to(&mut wtr)?;
        Ok(Self {
            path,
            header,
            format,
            wtr,
            raw: Vec::new(),
            next_row: 0,
        })
    }
}

impl GridSink for NativeWriter {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn write_row(&mut self, row: usize, data: &[f32]) -> Result<(), GridError> {
        check_row(self.next_row, row, self.header.spec.n_rows())?;
        debug_assert_eq!(data.len(), self.header.spec.n_columns());
        self.format
            .encode_row(data, self.header.z_scale, self.header.z_offset, &mut self.raw);
        self.wtr.write_all(&self.raw)?;
        self.next_row += 1;
        Ok(())
    }

    fn finish(&mut self, z_min: f64, z_max: f64) -> Result<(), GridError> {
        let n_rows = self.header.spec.n_rows();
        if self.next_row != n_rows {
            return Err(GridError::Incomplete(self.next_row, n_rows));
        }
        self.header.z_min = z_min;
        self.header.z_max = z_max;
        self.wtr.seek(SeekFrom::Start(0))?;
        self.header.write_to(&mut self.wtr)?;
        self.wtr.flush()?;
        Ok(())
    }
}

/// Writes rows as bare little-endian floats with no header.
pub struct RawWriter {
    path: PathBuf,
    n_columns: usize,
    n_rows: usize,
    wtr: BufWriter<File>,
    raw: Vec<u8>,
    next_row: usize,
}

impl RawWriter {
    pub fn create<P: AsRef<Path>>(path: P, header: &GridHeader) -> Result<Self, GridError> {
        let path = path.as_ref().to_owned();
        debug!("creating headerless {path:?}");
        let wtr = BufWriter::new(File::create(&path)?);
        Ok(Self {
            path,
            n_columns: header.spec.n_columns(),
            n_rows: header.spec.n_rows(),
            wtr,
            raw: Vec::new(),
            next_row: 0,
        })
    }
}

impl GridSink for RawWriter {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn write_row(&mut self, row: usize, data: &[f32]) -> Result<(), GridError> {
        check_row(self.next_row, row, self.n_rows)?;
        debug_assert_eq!(data.len(), self.n_columns);
        self.raw.resize(GridFormat::Float.row_len(data.len()), 0);
        LE::write_f32_into(data, &mut self.raw);
        self.wtr.write_all(&self.raw)?;
        self.next_row += 1;
        Ok(())
    }

    fn finish(&mut self, _z_min: f64, _z_max: f64) -> Result<(), GridError> {
        if self.next_row != self.n_rows {
            return Err(GridError::Incomplete(self.next_row, self.n_rows));
        }
        self.wtr.flush()?;
        Ok(())
    }
}

fn check_row(expected: usize, got: usize, n_rows: usize) -> Result<(), GridError> {
    if got != expected || got >= n_rows {
        Err(GridError::RowOrder { expected, got })
    } else {
        Ok(())
    }
}
