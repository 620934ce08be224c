//! Row-by-row grid input.

use crate::{GridError, GridFormat, GridHeader, MemoryGrid, HEADER_LEN};
use log::debug;
use memmap2::Mmap;
use std::{
    fmt,
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};

/// A grid that yields its rows in order, northernmost first.
pub trait RowSource {
    fn header(&self) -> &GridHeader;

    /// Skips the next `n` rows without decoding them.
    fn skip_rows(&mut self, n: usize) -> Result<(), GridError>;

    /// Decodes the next row into `buf`, which must hold exactly one
    /// row.
    fn read_row(&mut self, buf: &mut [f32]) -> Result<(), GridError>;
}

/// How to read file-backed grids.
///
/// The trade off between streaming rows through a buffered reader
/// versus memory mapping is not obvious, and you should measure both
/// before deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Buffered sequential reads with a single forward seek.
    #[default]
    Stream,

    /// Memory map file contents.
    MemMap,
}

/// Where a grid's header and samples live.
#[derive(Clone)]
pub enum GridLocation {
    File {
        path: PathBuf,
        format: Option<GridFormat>,
    },
    Memory(Arc<MemoryGrid>),
}

impl GridLocation {
    /// Returns a file location, honouring an optional `=id` format
    /// suffix on `path`.
    pub fn file<P: AsRef<Path>>(path: P) -> Result<Self, GridError> {
        let (path, format) = GridFormat::split_path(path)?;
        Ok(Self::File { path, format })
    }

    pub fn memory(grid: MemoryGrid) -> Self {
        Self::Memory(Arc::new(grid))
    }

    /// Returns a human readable name for log and error messages.
    pub fn name(&self) -> String {
        match self {
            Self::File { path, .. } => path.display().to_string(),
            Self::Memory(_) => String::from("<memory>"),
        }
    }

    /// Reads the grid's header without touching its samples.
    pub fn header(&self) -> Result<GridHeader, GridError> {
        match self {
            Self::File { path, .. } => GridHeader::read(path),
            Self::Memory(grid) => Ok(grid.header().clone()),
        }
    }

    /// Opens the grid for row-by-row reading.
    pub fn open(&self, mode: ReadMode) -> Result<Box<dyn RowSource>, GridError> {
        match self {
            Self::File { path, format } => {
                debug!("opening {path:?} ({mode:?})");
                let header = GridHeader::read(path)?;
                let format = match format {
                    Some(format) => *format,
                    None => GridFormat::infer(path, &header.spec)?,
                };
                match mode {
                    ReadMode::Stream => Ok(Box::new(StreamReader::open(path, header, format)?)),
                    ReadMode::MemMap => Ok(Box::new(MappedReader::open(path, header, format)?)),
                }
            }
            Self::Memory(grid) => Ok(Box::new(MemoryReader {
                grid: Arc::clone(grid),
                row: 0,
            })),
        }
    }
}

impl fmt::Debug for GridLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, format } => f
                .debug_struct("File")
                .field("path", path)
                .field("format", format)
                .finish(),
            Self::Memory(grid) => f.debug_tuple("Memory").field(grid.spec()).finish(),
        }
    }
}

/// Reads rows through a buffered file handle.
struct StreamReader {
    header: GridHeader,
    format: GridFormat,
    rdr: BufReader<File>,
    raw: Vec<u8>,
    row: usize,
}

impl StreamReader {
    fn open(path: &Path, header: GridHeader, format: GridFormat) -> Result<Self, GridError> {
        let mut rdr = BufReader::new(File::open(path)?);
        rdr.seek(SeekFrom::Start(HEADER_LEN))?;
        let raw = vec![0_u8; format.row_len(header.spec.n_columns())];
        Ok(Self {
            header,
            format,
            rdr,
            raw,
            row: 0,
        })
    }
}

impl RowSource for StreamReader {
    fn header(&self) -> &GridHeader {
        &self.header
    }

    fn skip_rows(&mut self, n: usize) -> Result<(), GridError> {
        let row = self.row + n;
        if row > self.header.spec.n_rows() {
            return Err(GridError::EndOfGrid(row));
        }
        #[allow(clippy::cast_possible_wrap)]
        self.rdr.seek_relative((n * self.raw.len()) as i64)?;
        self.row = row;
        Ok(())
    }

    fn read_row(&mut self, buf: &mut [f32]) -> Result<(), GridError> {
        if self.row >= self.header.spec.n_rows() {
            return Err(GridError::EndOfGrid(self.row));
        }
        self.rdr.read_exact(&mut self.raw)?;
        self.format
            .decode_row(&self.raw, self.header.z_scale, self.header.z_offset, buf);
        self.row += 1;
        Ok(())
    }
}

/// Reads rows out of a memory-mapped file.
struct MappedReader {
    header: GridHeader,
    format: GridFormat,
    map: Mmap,
    row: usize,
}

impl MappedReader {
    fn open(path: &Path, header: GridHeader, format: GridFormat) -> Result<Self, GridError> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self {
            header,
            format,
            map,
            row: 0,
        })
    }
}

impl RowSource for MappedReader {
    fn header(&self) -> &GridHeader {
        &self.header
    }

    fn skip_rows(&mut self, n: usize) -> Result<(), GridError> {
        let row = self.row + n;
        if row > self.header.spec.n_rows() {
            return Err(GridError::EndOfGrid(row));
        }
        self.row = row;
        Ok(())
    }

    fn read_row(&mut self, buf: &mut [f32]) -> Result<(), GridError> {
        let row_len = self.format.row_len(self.header.spec.n_columns());
        #[allow(clippy::cast_possible_truncation)]
        let start = HEADER_LEN as usize + self.row * row_len;
        let raw = self
            .map
            .get(start..start + row_len)
            .ok_or(GridError::EndOfGrid(self.row))?;
        self.format
            .decode_row(raw, self.header.z_scale, self.header.z_offset, buf);
        self.row += 1;
        Ok(())
    }
}

/// Copies rows out of a shared in-memory grid.
struct MemoryReader {
    grid: Arc<MemoryGrid>,
    row: usize,
}

impl RowSource for MemoryReader {
    fn header(&self) -> &GridHeader {
        self.grid.header()
    }

    fn skip_rows(&mut self, n: usize) -> Result<(), GridError> {
        let row = self.row + n;
        if row > self.grid.spec().n_rows() {
            return Err(GridError::EndOfGrid(row));
        }
        self.row = row;
        Ok(())
    }

    fn read_row(&mut self, buf: &mut [f32]) -> Result<(), GridError> {
        let samples = self.grid.row(self.row).ok_or(GridError::EndOfGrid(self.row))?;
        buf.copy_from_slice(samples);
        self.row += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{GridLocation, ReadMode};
    use crate::{GridFormat, GridHeader, GridSink, GridSpec, MemoryGrid, NativeWriter, Region, Registration};
    use geo::geometry::Coord;

    fn spec() -> GridSpec {
        GridSpec::new(
            Region::new(0.0, 3.0, 0.0, 3.0).unwrap(),
            Coord { x: 1.0, y: 1.0 },
            Registration::Gridline,
        )
        .unwrap()
    }

    #[allow(clippy::cast_precision_loss)]
    fn value(col: usize, row: usize) -> f32 {
        (100 * row + col) as f32
    }

    fn write_grid(path: &std::path::Path, format: GridFormat) {
        let spec = spec();
        let mut wtr = NativeWriter::create(path, GridHeader::new(spec), format).unwrap();
        for row in 0..spec.n_rows() {
            let data: Vec<f32> = (0..spec.n_columns()).map(|col| value(col, row)).collect();
            wtr.write_row(row, &data).unwrap();
        }
        wtr.finish(0.0, 303.0).unwrap();
    }

    #[test]
    fn test_read_modes_agree() {
        let dir = tempfile::tempdir().unwrap();
        for format in [GridFormat::Float, GridFormat::Short] {
            let path = dir.path().join(format!("grid_{}.grd", format.id()));
            write_grid(&path, format);
            // Format is inferred from the file length.
            let location = GridLocation::file(&path).unwrap();
            assert_eq!(location.header().unwrap().z_max, 303.0);
            for mode in [ReadMode::Stream, ReadMode::MemMap] {
                let mut rows = location.open(mode).unwrap();
                let mut buf = vec![0.0; 4];
                rows.skip_rows(2).unwrap();
                rows.read_row(&mut buf).unwrap();
                assert_eq!(buf, [200.0, 201.0, 202.0, 203.0]);
                rows.read_row(&mut buf).unwrap();
                assert_eq!(buf, [300.0, 301.0, 302.0, 303.0]);
                assert!(rows.read_row(&mut buf).is_err());
            }
        }
    }

    #[test]
    fn test_memory_location() {
        let location = GridLocation::memory(MemoryGrid::from_fn(spec(), value));
        let mut rows = location.open(ReadMode::Stream).unwrap();
        let mut buf = vec![0.0; 4];
        rows.read_row(&mut buf).unwrap();
        assert_eq!(buf, [0.0, 1.0, 2.0, 3.0]);
        assert!(rows.skip_rows(4).is_err());
    }

    #[test]
    fn test_missing_file() {
        let location = GridLocation::file("/definitely/not/here.grd").unwrap();
        assert!(location.header().unwrap_err().is_io());
    }
}
