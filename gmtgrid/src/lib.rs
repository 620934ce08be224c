//! GMT-style native binary grids.
//!
//! A grid is a header describing its node layout (region, increment,
//! registration) followed by rows of samples, northernmost first. This
//! crate reads and writes such grids one row at a time so that callers
//! never need a whole grid in memory.

mod error;
mod format;
mod header;
mod memory;
mod reader;
mod region;
mod sink;

pub use crate::{
    error::GridError,
    format::{is_netcdf_name, GridFormat, SHORT_NODATA},
    header::{GridHeader, GridSpec, HEADER_LEN},
    memory::MemoryGrid,
    reader::{GridLocation, ReadMode, RowSource},
    region::{Region, Registration},
    sink::{create_sink, GridSink, NativeWriter, RawWriter},
};

/// Base floating point type used for all coordinates and calculations.
///
/// Samples are stored as `f32`; everything describing where they sit
/// is `f64`.
pub type C = f64;
