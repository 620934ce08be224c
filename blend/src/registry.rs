use crate::{
    footprint::Footprint,
    taper::{taper_rate, Taper},
    BlendError, JobRecord,
};
use gmtgrid::{GridHeader, GridLocation, GridSpec, Region, C};
use log::{debug, info};

/// Relative tolerance when comparing increments.
const INC_TOLERANCE: C = 1e-6;

/// Fraction of a cell by which node positions may disagree.
const PHASE_TOLERANCE: C = 1e-8;

/// An input grid registered against the output grid.
#[derive(Debug, Clone)]
pub struct BlendSource {
    grid: GridLocation,
    name: String,

    /// Outer region, shifted by a multiple of 360° when that was
    /// needed to overlap a geographic output.
    outer: Region,
    inner: Region,

    /// Columns in each source row.
    n_columns: usize,

    weight: C,
    invert: bool,
    footprint: Footprint,
    taper_x: Taper,
    taper_y: Taper,
}

impl BlendSource {
    /// Registers `record` against the `output` grid, reading only the
    /// grid's header.
    ///
    /// Returns [`BlendError::OutOfBounds`] for sources that miss the
    /// output entirely; callers may drop those and carry on.
    pub fn register(record: JobRecord, output: &GridSpec, geographic: bool) -> Result<Self, BlendError> {
        let header = record.grid.header()?;
        Self::with_header(record, &header, output, geographic)
    }

    /// Registers `record` using an already read `header`.
    pub fn with_header(
        record: JobRecord,
        header: &GridHeader,
        output: &GridSpec,
        geographic: bool,
    ) -> Result<Self, BlendError> {
        let name = record.grid.name();
        let spec = &header.spec;
        let h = output.region();
        let mut outer = *spec.region();
        let mut inner = record.inner.unwrap_or(outer);

        if !outer.intersects_y(h) {
            return Err(BlendError::OutOfBounds(name));
        }
        if geographic {
            if !h.is_global() && !outer.is_global() {
                match outer.periodic_shift(h) {
                    None => return Err(BlendError::OutOfBounds(name)),
                    Some(shift) if shift != 0.0 => {
                        info!("{name}: longitudes shifted by {shift} to fit the output region");
                        outer = outer.shift_x(shift);
                    }
                    Some(_) => (),
                }
            }
            // The inner region may be given in either longitude frame.
            if let Some(shift) = inner.periodic_shift(&outer) {
                inner = inner.shift_x(shift);
            }
        } else if !outer.intersects(h) {
            return Err(BlendError::OutOfBounds(name));
        }

        let slop = INC_TOLERANCE * spec.inc().x.min(spec.inc().y);
        if !outer.contains(&inner, slop) {
            return Err(BlendError::InnerRegion {
                name,
                inner: inner.to_string(),
                outer: outer.to_string(),
            });
        }

        if spec.registration() != output.registration() {
            return Err(BlendError::Registration {
                name,
                got: spec.registration(),
                expected: output.registration(),
            });
        }
        let (inc, out_inc) = (spec.inc(), output.inc());
        if !same_inc(inc.x, out_inc.x) || !same_inc(inc.y, out_inc.y) {
            return Err(BlendError::Spacing {
                name,
                dx: inc.x,
                dy: inc.y,
                out_dx: out_inc.x,
                out_dy: out_inc.y,
            });
        }
        if out_of_phase(&outer, spec, output) {
            return Err(BlendError::Phase(name));
        }

        let footprint = Footprint::new(&outer, &inner, spec.registration(), output);
        let taper_x = Taper::new(
            footprint.cols,
            taper_rate(out_inc.x, inner.west() - outer.west()),
            taper_rate(out_inc.x, outer.east() - inner.east()),
        );
        let taper_y = Taper::new(
            footprint.rows,
            taper_rate(out_inc.y, outer.north() - inner.north()),
            taper_rate(out_inc.y, inner.south() - outer.south()),
        );
        debug!(
            "{name}: out {}/{}/{}/{} in {}/{}/{}/{} skip {}",
            footprint.cols.outer.lo,
            footprint.cols.outer.hi,
            footprint.rows.outer.hi,
            footprint.rows.outer.lo,
            footprint.cols.inner.lo,
            footprint.cols.inner.hi,
            footprint.rows.inner.hi,
            footprint.rows.inner.lo,
            footprint.skip_rows(),
        );

        let invert = record.weight < 0.0;
        let weight = record.weight.abs();
        info!(
            "blend {name} in {inner} with {} weight {weight} [rows {}-{}]",
            if invert { "inverse" } else { "normal" },
            footprint.rows.outer.lo,
            footprint.rows.outer.hi,
        );

        Ok(Self {
            grid: record.grid,
            name,
            outer,
            inner,
            n_columns: spec.n_columns(),
            weight,
            invert,
            footprint,
            taper_x,
            taper_y,
        })
    }

    pub fn grid(&self) -> &GridLocation {
        &self.grid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outer(&self) -> &Region {
        &self.outer
    }

    pub fn inner(&self) -> &Region {
        &self.inner
    }

    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// Absolute weight.
    pub fn weight(&self) -> C {
        self.weight
    }

    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// Returns the row weight at output row `row`, scaled by this
    /// source's weight.
    #[allow(clippy::cast_possible_wrap)]
    pub fn y_weight(&self, row: usize, half: C) -> C {
        self.taper_y.weight(row as i64, half) * self.weight
    }

    /// Returns the column weight at `pcol`, a column from
    /// [`Footprint::window_column`].
    pub fn x_weight(&self, pcol: i64, half: C) -> C {
        self.taper_x.weight(pcol, half)
    }

    /// Combines column and row weights into the weight of one node.
    pub fn node_weight(&self, x_weight: C, y_weight: C) -> C {
        let w = x_weight * y_weight;
        if self.invert {
            self.weight - w
        } else {
            w
        }
    }
}

fn same_inc(inc: C, out_inc: C) -> bool {
    ((inc - out_inc) / out_inc).abs() <= INC_TOLERANCE
}

/// Returns `true` if the nodes of a `source` grid covering `outer` do
/// not line up with the `output` nodes.
fn out_of_phase(outer: &Region, source: &GridSpec, output: &GridSpec) -> bool {
    let h = output.region();
    let (inc, out_inc) = (source.inc(), output.inc());
    let (off, out_off) = (source.registration().offset(), output.registration().offset());
    let edges = [
        (outer.west(), h.west(), inc.x, out_inc.x),
        (outer.east(), h.east(), inc.x, out_inc.x),
        (outer.south(), h.south(), inc.y, out_inc.y),
        (outer.north(), h.north(), inc.y, out_inc.y),
    ];
    edges.into_iter().any(|(edge, out_edge, inc, out_inc)| {
        let cells = (((edge + off * inc) - (out_edge + out_off * out_inc)) / out_inc).abs() % 1.0;
        cells >= PHASE_TOLERANCE && 1.0 - cells >= PHASE_TOLERANCE
    })
}
