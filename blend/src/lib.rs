//! Streaming blend of partially overlapping grids.
//!
//! Each source grid contributes to the output through a weight that is
//! one over its inner region and falls to zero along a cosine taper
//! towards its outer edge. Output rows are produced one at a time, and
//! only the current row of each overlapping source is held in memory.

mod accumulate;
mod builder;
mod cancel;
mod error;
mod footprint;
mod job;
mod registry;
mod sync;
mod taper;
mod writer;

pub use crate::{
    accumulate::{Accumulator, Clobber, ClobberRule, NodeStats, OutputMode, SignFilter},
    builder::{BlendBuilder, BlendJob, BlendSummary},
    cancel::CancelToken,
    error::BlendError,
    footprint::{AxisFootprint, Footprint, Span},
    job::{parse_job, parse_line, JobRecord},
    registry::BlendSource,
    sync::{ActiveRow, RowSynchronizer, SourceState},
    taper::{taper_rate, Taper},
    writer::StreamingWriter,
};
pub use gmtgrid;
