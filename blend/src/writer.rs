use crate::{accumulate::NodeStats, BlendError};
use gmtgrid::GridSink;
use log::debug;

/// Hands finished output rows to a [`GridSink`], tagging failures with
/// the sink's name and the row being written.
pub struct StreamingWriter<'a> {
    sink: &'a mut dyn GridSink,
    name: String,
    rows: usize,
}

impl<'a> StreamingWriter<'a> {
    pub fn new(sink: &'a mut dyn GridSink) -> Self {
        let name = sink.name();
        Self { sink, name, rows: 0 }
    }

    pub fn emit(&mut self, row: usize, data: &[f32]) -> Result<(), BlendError> {
        self.sink
            .write_row(row, data)
            .map_err(|source| BlendError::Write {
                name: self.name.clone(),
                row,
                source,
            })?;
        self.rows += 1;
        Ok(())
    }

    /// Records the final value range in the sink.
    pub fn finish(self, stats: &NodeStats) -> Result<(), BlendError> {
        let (z_min, z_max) = stats.range();
        debug!("{}: {} rows written, range {z_min}/{z_max}", self.name, self.rows);
        self.sink
            .finish(z_min, z_max)
            .map_err(|source| BlendError::Write {
                name: self.name,
                row: self.rows,
                source,
            })
    }
}
