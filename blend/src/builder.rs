use crate::{
    accumulate::{Accumulator, ClobberRule, OutputMode},
    sync::RowSynchronizer,
    writer::StreamingWriter,
    BlendError, BlendSource, CancelToken, JobRecord,
};
use geo::geometry::Coord;
use gmtgrid::{GridHeader, GridSink, GridSpec, ReadMode, Region, Registration, C};
use log::{debug, info, warn};

/// Relative tolerance when deciding whether inputs share an increment.
const COMMON_INC_TOLERANCE: C = 1e-6;

/// Outcome of a completed blend.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendSummary {
    pub n_columns: usize,
    pub n_rows: usize,

    /// Sources that contributed to the output.
    pub n_sources: usize,

    /// Nodes covered by at least one source.
    pub filled: u64,

    pub total: u64,
    pub z_min: C,
    pub z_max: C,

    /// Names of sources dropped for lying outside the output region.
    pub skipped: Vec<String>,
}

/// Collects the settings of a blend job.
///
/// Output region, increment and registration are optional; whatever
/// is missing is derived from the inputs.
#[derive(Debug, Clone, Default)]
pub struct BlendBuilder {
    records: Vec<JobRecord>,
    region: Option<Region>,
    inc: Option<Coord<C>>,
    registration: Option<Registration>,
    nodata: Option<f32>,
    scale: Option<(C, C)>,
    mode: OutputMode,
    clobber: Option<ClobberRule>,
    geographic: bool,
    read_mode: ReadMode,
    command: Option<String>,
}

impl BlendBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, record: JobRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn sources<I: IntoIterator<Item = JobRecord>>(mut self, records: I) -> Self {
        self.records.extend(records);
        self
    }

    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn increment(mut self, inc: Coord<C>) -> Self {
        self.inc = Some(inc);
        self
    }

    pub fn registration(mut self, registration: Registration) -> Self {
        self.registration = Some(registration);
        self
    }

    /// Value of nodes no source covers, NaN by default.
    pub fn nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Scales, then shifts, blended values.
    pub fn scale(mut self, scale: C, shift: C) -> Self {
        self.scale = Some((scale, shift));
        self
    }

    pub fn output_mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Pastes sources by `rule` instead of blending them.
    pub fn clobber(mut self, rule: ClobberRule) -> Self {
        self.clobber = Some(rule);
        self
    }

    /// Treats x as longitude, periodic every 360°.
    pub fn geographic(mut self, geographic: bool) -> Self {
        self.geographic = geographic;
        self
    }

    pub fn read_mode(mut self, read_mode: ReadMode) -> Self {
        self.read_mode = read_mode;
        self
    }

    /// Command line recorded in the output header.
    pub fn command(mut self, command: String) -> Self {
        self.command = Some(command);
        self
    }

    /// Reads every input header, settles the output grid and registers
    /// the sources against it.
    pub fn build(self) -> Result<BlendJob, BlendError> {
        let first = self.records.first().ok_or(BlendError::NoInput)?;
        let headers = self
            .records
            .iter()
            .map(|record| record.grid.header())
            .collect::<Result<Vec<GridHeader>, _>>()?;
        let first_spec = headers[0].spec;
        debug!("first input {} is {:?}", first.grid.name(), first_spec);

        let region = match self.region {
            Some(region) => region,
            None => headers
                .iter()
                .skip(1)
                .fold(*first_spec.region(), |region, header| {
                    region.union(header.spec.region())
                }),
        };
        let inc = match self.inc {
            Some(inc) => inc,
            None if headers.iter().all(|h| same_inc(h.spec.inc(), first_spec.inc())) => {
                first_spec.inc()
            }
            None => return Err(BlendError::MixedIncrements),
        };
        let registration = self.registration.unwrap_or(first_spec.registration());
        let spec = GridSpec::new(region, inc, registration)?;
        info!(
            "output {region} every {}/{} ({registration}), {} x {}",
            inc.x,
            inc.y,
            spec.n_columns(),
            spec.n_rows()
        );

        let mut sources = Vec::with_capacity(self.records.len());
        let mut skipped = Vec::new();
        for (record, header) in self.records.into_iter().zip(&headers) {
            match BlendSource::with_header(record, header, &spec, self.geographic) {
                Ok(source) => sources.push(source),
                Err(BlendError::OutOfBounds(name)) => {
                    warn!("{name}: entirely outside the output region, skipped");
                    skipped.push(name);
                }
                Err(e) => return Err(e),
            }
        }
        if sources.is_empty() {
            warn!("no input grid overlaps the output region, every node will be empty");
        } else if sources.len() == 1 && self.mode != OutputMode::Weights {
            warn!("only 1 grid found, no blending will take place");
        }

        Ok(BlendJob {
            spec,
            sources,
            skipped,
            nodata: self.nodata.unwrap_or(f32::NAN),
            scale: self.scale.unwrap_or((1.0, 0.0)),
            mode: self.mode,
            clobber: self.clobber,
            geographic: self.geographic,
            read_mode: self.read_mode,
            command: self.command.unwrap_or_default(),
        })
    }
}

fn same_inc(a: Coord<C>, b: Coord<C>) -> bool {
    ((a.x - b.x) / b.x).abs() <= COMMON_INC_TOLERANCE && ((a.y - b.y) / b.y).abs() <= COMMON_INC_TOLERANCE
}

/// A validated blend job, ready to run.
#[derive(Debug, Clone)]
pub struct BlendJob {
    spec: GridSpec,
    sources: Vec<BlendSource>,
    skipped: Vec<String>,
    nodata: f32,
    scale: (C, C),
    mode: OutputMode,
    clobber: Option<ClobberRule>,
    geographic: bool,
    read_mode: ReadMode,
    command: String,
}

impl BlendJob {
    pub fn builder() -> BlendBuilder {
        BlendBuilder::new()
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn sources(&self) -> &[BlendSource] {
        &self.sources
    }

    /// Names of sources dropped for lying outside the output region.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Returns the header to create the output sink with.
    pub fn output_header(&self) -> GridHeader {
        let mut header = GridHeader::new(self.spec);
        header.title = String::from("blended grid");
        header.command.clone_from(&self.command);
        header.remark = match self.mode {
            OutputMode::Blend => String::new(),
            OutputMode::Weights => String::from("weight sum"),
            OutputMode::WeightedSum => String::from("weighted value sum"),
        };
        header
    }

    /// Output columns per 360° of longitude, for geographic output.
    #[allow(clippy::cast_possible_truncation)]
    fn nx_360(&self) -> Option<i64> {
        if self.geographic {
            Some((360.0 / self.spec.inc().x).round() as i64).filter(|n| *n > 0)
        } else {
            None
        }
    }

    /// Blends every output row into `sink`, calling `on_row` after each
    /// row is written.
    ///
    /// `cancel` is checked before each row; a cancelled run leaves the
    /// rows already written in place.
    pub fn run<F>(
        &self,
        sink: &mut dyn GridSink,
        cancel: &CancelToken,
        mut on_row: F,
    ) -> Result<BlendSummary, BlendError>
    where
        F: FnMut(usize),
    {
        let (n_columns, n_rows) = (self.spec.n_columns(), self.spec.n_rows());
        let half = self.spec.registration().offset();
        let (scale, shift) = self.scale;
        if scale != 1.0 || shift != 0.0 {
            info!("output values scaled by {scale} and shifted by {shift}");
        }

        let mut sync = RowSynchronizer::new(&self.sources, self.read_mode, half);
        let mut acc = Accumulator::new(self.mode, self.nodata, half)
            .clobber(self.clobber)
            .scale(scale, shift)
            .periodic(self.nx_360());
        let mut writer = StreamingWriter::new(sink);
        let mut out = vec![self.nodata; n_columns];

        let now = std::time::Instant::now();
        for row in 0..n_rows {
            if cancel.is_cancelled() {
                warn!("cancelled before row {row} of {n_rows}");
                return Err(BlendError::Cancelled(row));
            }
            sync.sync(row)?;
            acc.accumulate_row(&sync, &mut out);
            writer.emit(row, &out)?;
            on_row(row);
        }
        let stats = *acc.stats();
        writer.finish(&stats)?;
        debug!("{n_rows} rows blended in {:?}", now.elapsed());

        if stats.filled == stats.total {
            info!("all {} nodes assigned values", stats.total);
        } else {
            info!(
                "{} nodes assigned values, {} set to {}",
                stats.filled,
                stats.total - stats.filled,
                self.nodata
            );
        }
        let (z_min, z_max) = stats.range();
        Ok(BlendSummary {
            n_columns,
            n_rows,
            n_sources: self.sources.len(),
            filled: stats.filled,
            total: stats.total,
            z_min,
            z_max,
            skipped: self.skipped.clone(),
        })
    }
}
