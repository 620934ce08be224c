use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid region '{0}'")]
    Region(String),

    #[error("invalid increment {0}/{1}")]
    Increment(f64, f64),

    #[error("region {region} is not a whole multiple of increment {dx}/{dy}")]
    Inconsistent { region: String, dx: f64, dy: f64 },

    #[error("invalid registration code {0}")]
    Registration(i32),

    #[error("invalid grid header in {0}: {1}")]
    Header(PathBuf, String),

    #[error("unknown grid format id '{0}'")]
    FormatId(String),

    #[error("{0}: netCDF grids are not supported")]
    NetCdf(PathBuf),

    #[error("{0}: headerless output requires a native float grid")]
    Headerless(PathBuf),

    #[error("invalid grid file len {0} for {1}")]
    Len(u64, PathBuf),

    #[error("row {got} written out of order, expected row {expected}")]
    RowOrder { expected: usize, got: usize },

    #[error("row {0} is past the last row of the grid")]
    EndOfGrid(usize),

    #[error("grid closed after {0} of {1} rows")]
    Incomplete(usize, usize),
}

impl GridError {
    /// Returns `true` for failures of the underlying file system
    /// rather than of the grid's description.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::EndOfGrid(_) | Self::RowOrder { .. } | Self::Incomplete(..)
        )
    }
}
