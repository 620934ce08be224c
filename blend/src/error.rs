use gmtgrid::{GridError, Registration};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlendError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("job line {line}: {reason}")]
    JobLine { line: usize, reason: String },

    #[error("invalid clobber mode '{0}', expected f|l|o|u[+n|+p]")]
    ClobberMode(String),

    #[error("no input grids")]
    NoInput,

    #[error("input grids have different increments, output increment must be given")]
    MixedIncrements,

    #[error("{name}: {got} registration differs from {expected} output registration")]
    Registration {
        name: String,
        got: Registration,
        expected: Registration,
    },

    #[error("{name}: increment {dx}/{dy} differs from output increment {out_dx}/{out_dy}")]
    Spacing {
        name: String,
        dx: f64,
        dy: f64,
        out_dx: f64,
        out_dy: f64,
    },

    #[error("{0}: nodes are phase-shifted with respect to the output grid")]
    Phase(String),

    #[error("{name}: inner region {inner} is not inside grid region {outer}")]
    InnerRegion {
        name: String,
        inner: String,
        outer: String,
    },

    #[error("{0}: entirely outside the output region")]
    OutOfBounds(String),

    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("{name}: open failed at output row {row}: {source}")]
    Open {
        name: String,
        row: usize,
        source: GridError,
    },

    #[error("{name}: read failed at output row {row}: {source}")]
    Read {
        name: String,
        row: usize,
        source: GridError,
    },

    #[error("{name}: write failed at row {row}: {source}")]
    Write {
        name: String,
        row: usize,
        source: GridError,
    },

    #[error("cancelled before row {0}")]
    Cancelled(usize),
}

impl BlendError {
    /// Returns `true` for problems with the job's description, all of
    /// which are detected before the first output row.
    pub fn is_config(&self) -> bool {
        match self {
            Self::JobLine { .. }
            | Self::ClobberMode(_)
            | Self::NoInput
            | Self::MixedIncrements
            | Self::Registration { .. }
            | Self::Spacing { .. }
            | Self::Phase(_)
            | Self::InnerRegion { .. } => true,
            Self::Grid(e) => !e.is_io(),
            _ => false,
        }
    }

    /// Returns `true` for file system failures.
    pub fn is_io(&self) -> bool {
        match self {
            Self::Io(_) | Self::Open { .. } | Self::Read { .. } | Self::Write { .. } => true,
            Self::Grid(e) => e.is_io(),
            _ => false,
        }
    }
}
