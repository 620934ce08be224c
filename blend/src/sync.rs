use crate::{BlendError, BlendSource};
use gmtgrid::{ReadMode, RowSource, C};
use log::debug;

/// Lifecycle of one source during a pass over the output rows.
///
/// States only move forward: rows are visited in increasing order and
/// every footprint is a contiguous row span, so a source that has been
/// left behind is never needed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// The scan has not reached the source yet.
    Pending,

    /// The source is open and holds the current row.
    Active,

    /// The scan has passed the source; its handle is closed.
    Done,
}

enum Slot {
    Pending,
    Active(OpenSource),
    Done,
}

struct OpenSource {
    rows: Box<dyn RowSource>,
    buf: Vec<f32>,
}

/// The current row of one active source.
pub struct ActiveRow<'a> {
    pub source: &'a BlendSource,

    /// Row weight, already scaled by the source weight.
    pub wt_y: C,

    samples: &'a [f32],
}

impl ActiveRow<'_> {
    /// Returns the sample at `local` column, or `None` for missing
    /// nodes.
    pub fn value_at(&self, local: usize) -> Option<f32> {
        self.samples.get(local).copied().filter(|z| !z.is_nan())
    }
}

/// Keeps every source positioned on the row matching the current
/// output row, opening sources as the scan reaches them and closing
/// them once it has passed.
///
/// Handles are owned here; dropping the synchronizer closes any still
/// open.
pub struct RowSynchronizer<'a> {
    sources: &'a [BlendSource],
    slots: Vec<Slot>,
    wt_y: Vec<C>,
    mode: ReadMode,
    half: C,
}

impl<'a> RowSynchronizer<'a> {
    /// `half` is the output registration's half-cell offset.
    pub fn new(sources: &'a [BlendSource], mode: ReadMode, half: C) -> Self {
        Self {
            sources,
            slots: sources.iter().map(|_| Slot::Pending).collect(),
            wt_y: vec![0.0; sources.len()],
            mode,
            half,
        }
    }

    /// Advances every source to output row `row`.
    ///
    /// Rows must be visited in increasing order.
    pub fn sync(&mut self, row: usize) -> Result<(), BlendError> {
        let sources = self.sources;
        for (idx, source) in sources.iter().enumerate() {
            let slot = &mut self.slots[idx];
            if !source.footprint().contains_row(row) {
                if let Slot::Active(_) = slot {
                    debug!("{}: done after output row {}", source.name(), row - 1);
                    *slot = Slot::Done;
                }
                continue;
            }

            let mut current = match std::mem::replace(slot, Slot::Done) {
                Slot::Pending => open_source(source, self.mode, row)?,
                Slot::Active(current) => current,
                Slot::Done => {
                    debug_assert!(false, "{} revisited at row {row}", source.name());
                    continue;
                }
            };
            current
                .rows
                .read_row(&mut current.buf)
                .map_err(|source_err| BlendError::Read {
                    name: source.name().to_owned(),
                    row,
                    source: source_err,
                })?;
            *slot = Slot::Active(current);
            self.wt_y[idx] = source.y_weight(row, self.half);
        }
        Ok(())
    }

    pub fn state(&self, source: usize) -> SourceState {
        match self.slots[source] {
            Slot::Pending => SourceState::Pending,
            Slot::Active(_) => SourceState::Active,
            Slot::Done => SourceState::Done,
        }
    }

    /// Returns the current row of every active source, in job order.
    pub fn active(&self) -> impl Iterator<Item = ActiveRow<'_>> {
        self.sources
            .iter()
            .zip(&self.slots)
            .zip(&self.wt_y)
            .filter_map(|((source, slot), wt_y)| match slot {
                Slot::Active(open) => Some(ActiveRow {
                    source,
                    wt_y: *wt_y,
                    samples: &open.buf,
                }),
                _ => None,
            })
    }

    /// Returns the sample of `source` at `local` column of its current
    /// row, or `None` if the source is inactive or the node missing.
    pub fn value_at(&self, source: usize, local: usize) -> Option<f32> {
        match &self.slots[source] {
            Slot::Active(open) => open.buf.get(local).copied().filter(|z| !z.is_nan()),
            _ => None,
        }
    }
}

fn open_source(source: &BlendSource, mode: ReadMode, row: usize) -> Result<OpenSource, BlendError> {
    let mk_err = |e| BlendError::Open {
        name: source.name().to_owned(),
        row,
        source: e,
    };
    let mut rows = source.grid().open(mode).map_err(mk_err)?;
    let skip = source.footprint().source_row(row).unwrap_or_default();
    rows.skip_rows(skip).map_err(mk_err)?;
    debug!("{}: opened at output row {row}, skipped {skip} rows", source.name());
    let buf = vec![f32::NAN; rows.header().spec.n_columns()];
    Ok(OpenSource { rows, buf })
}

#[cfg(test)]
mod tests {
    use super::{RowSynchronizer, SourceState};
    use crate::{BlendError, BlendSource, JobRecord};
    use geo::geometry::Coord;
    use gmtgrid::{GridLocation, GridSink, GridSpec, MemoryGrid, ReadMode, Registration};

    fn spec(region: &str) -> GridSpec {
        GridSpec::new(
            region.parse().unwrap(),
            Coord { x: 1.0, y: 1.0 },
            Registration::Gridline,
        )
        .unwrap()
    }

    fn source(region: &str, output: &GridSpec) -> BlendSource {
        // Each sample holds its source row.
        #[allow(clippy::cast_precision_loss)]
        let grid = MemoryGrid::from_fn(spec(region), |_, row| row as f32);
        BlendSource::register(JobRecord::new(GridLocation::memory(grid)), output, false).unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let output = spec("0/4/0/4");
        let sources = [source("0/4/2/6", &output), source("0/4/0/2", &output)];
        let mut sync = RowSynchronizer::new(&sources, ReadMode::Stream, 0.0);
        assert_eq!(sync.state(0), SourceState::Pending);

        sync.sync(0).unwrap();
        assert_eq!(sync.state(0), SourceState::Active);
        assert_eq!(sync.state(1), SourceState::Pending);
        // Two source rows lie north of the output.
        assert_eq!(sync.value_at(0, 0), Some(2.0));
        assert_eq!(sync.active().count(), 1);

        sync.sync(1).unwrap();
        sync.sync(2).unwrap();
        assert_eq!(sync.value_at(0, 3), Some(4.0));
        assert_eq!(sync.value_at(1, 3), Some(0.0));
        assert_eq!(sync.active().count(), 2);

        sync.sync(3).unwrap();
        assert_eq!(sync.state(0), SourceState::Done);
        assert_eq!(sync.value_at(0, 0), None);
        assert_eq!(sync.value_at(1, 0), Some(1.0));

        sync.sync(4).unwrap();
        let active: Vec<_> = sync.active().collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].value_at(0), Some(2.0));
        assert_eq!(active[0].value_at(99), None);
    }

    #[test]
    fn test_open_failure_names_file_and_row() {
        let output = spec("0/4/0/4");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.grd");
        let grid = MemoryGrid::from_fn(spec("0/4/0/4"), |_, _| 1.0);
        let mut wtr = gmtgrid::create_sink(&path, grid.header(), false).unwrap();
        for row in 0..5 {
            wtr.write_row(row, grid.row(row).unwrap()).unwrap();
        }
        wtr.finish(1.0, 1.0).unwrap();
        drop(wtr);

        let sources =
            [BlendSource::register(JobRecord::new(GridLocation::file(&path).unwrap()), &output, false).unwrap()];
        std::fs::remove_file(&path).unwrap();
        let mut sync = RowSynchronizer::new(&sources, ReadMode::Stream, 0.0);
        match sync.sync(0) {
            Err(err @ BlendError::Open { row: 0, .. }) => {
                assert!(err.is_io());
                assert!(err.to_string().contains("gone.grd"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
