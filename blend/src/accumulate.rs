use crate::{sync::RowSynchronizer, BlendError};
use gmtgrid::C;
use std::str::FromStr;

/// What to write at each covered output node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Weighted average of the contributing values.
    #[default]
    Blend,

    /// Sum of the contributing weights.
    Weights,

    /// Sum of weight times value, the weighted average scaled back up
    /// by the weight sum.
    WeightedSum,
}

/// Which contributing value a node keeps when sources are pasted
/// rather than blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clobber {
    /// The first source in job order.
    First,

    /// The lowest value.
    Lower,

    /// The last source in job order.
    Last,

    /// The highest value.
    Upper,
}

/// Restricts which values may clobber a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignFilter {
    #[default]
    Any,

    /// Only values `>= 0`.
    Positive,

    /// Only values `<= 0`.
    Negative,
}

impl SignFilter {
    fn accepts(self, z: C) -> bool {
        match self {
            Self::Any => true,
            Self::Positive => z >= 0.0,
            Self::Negative => z <= 0.0,
        }
    }
}

/// How overlapping values are pasted instead of blended.
///
/// The sign filter applies to every value, the first included: `f+n`
/// over `-1, -3` keeps -1 rather than letting -3 replace an unfiltered
/// seed. Only when no value passes does the first one fill the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClobberRule {
    pub clobber: Clobber,
    pub sign: SignFilter,
}

impl ClobberRule {
    /// Picks between the node's current value and a new candidate.
    fn pick(self, current: Option<C>, z: C) -> Option<C> {
        if !self.sign.accepts(z) {
            return current;
        }
        match (self.clobber, current) {
            (_, None) | (Clobber::Last, _) => Some(z),
            (Clobber::First, current) => current,
            (Clobber::Lower, Some(cur)) => Some(cur.min(z)),
            (Clobber::Upper, Some(cur)) => Some(cur.max(z)),
        }
    }
}

impl FromStr for ClobberRule {
    type Err = BlendError;

    /// Parses `f|l|o|u`, optionally followed by `+p` or `+n`.
    fn from_str(s: &str) -> Result<Self, BlendError> {
        let mk_err = || BlendError::ClobberMode(s.to_owned());
        let (mode, sign) = s.split_once('+').unwrap_or((s, ""));
        let clobber = match mode {
            "f" => Clobber::First,
            "l" => Clobber::Lower,
            "o" => Clobber::Last,
            "u" => Clobber::Upper,
            _ => return Err(mk_err()),
        };
        let sign = match sign {
            "" => SignFilter::Any,
            "p" => SignFilter::Positive,
            "n" => SignFilter::Negative,
            _ => return Err(mk_err()),
        };
        Ok(Self { clobber, sign })
    }
}

/// Running statistics over every node written so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeStats {
    /// Nodes covered by at least one source.
    pub filled: u64,

    /// All nodes.
    pub total: u64,

    z_min: C,
    z_max: C,
}

impl NodeStats {
    fn new() -> Self {
        Self {
            filled: 0,
            total: 0,
            z_min: C::INFINITY,
            z_max: C::NEG_INFINITY,
        }
    }

    fn add(&mut self, z: C) {
        self.filled += 1;
        self.z_min = self.z_min.min(z);
        self.z_max = self.z_max.max(z);
    }

    /// Returns `(min, max)` of filled nodes, both NaN when none were.
    pub fn range(&self) -> (C, C) {
        if self.filled == 0 {
            (C::NAN, C::NAN)
        } else {
            (self.z_min, self.z_max)
        }
    }
}

/// Combines the active sources' rows into output rows.
#[derive(Debug, Clone)]
pub struct Accumulator {
    mode: OutputMode,
    clobber: Option<ClobberRule>,
    nodata: f32,
    scale: C,
    shift: C,

    /// Output columns per 360° for longitude-periodic output.
    nx_360: Option<i64>,

    /// Output registration's half-cell offset.
    half: C,

    stats: NodeStats,
}

impl Accumulator {
    pub fn new(mode: OutputMode, nodata: f32, half: C) -> Self {
        Self {
            mode,
            clobber: None,
            nodata,
            scale: 1.0,
            shift: 0.0,
            nx_360: None,
            half,
            stats: NodeStats::new(),
        }
    }

    #[must_use]
    pub fn clobber(mut self, rule: Option<ClobberRule>) -> Self {
        self.clobber = rule;
        self
    }

    /// Scales then shifts blended values.
    #[must_use]
    pub fn scale(mut self, scale: C, shift: C) -> Self {
        self.scale = scale;
        self.shift = shift;
        self
    }

    #[must_use]
    pub fn periodic(mut self, nx_360: Option<i64>) -> Self {
        self.nx_360 = nx_360;
        self
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    /// Fills `out` from the synchronizer's current rows.
    #[allow(clippy::cast_possible_truncation)]
    pub fn accumulate_row(&mut self, sync: &RowSynchronizer<'_>, out: &mut [f32]) {
        for (col, node) in out.iter_mut().enumerate() {
            let sums = match self.clobber {
                None => self.blend_node(sync, col),
                Some(rule) => Self::clobber_node(rule, sync, col, self.nx_360),
            };
            self.stats.total += 1;
            *node = match sums {
                Some((sum_wz, sum_w)) => {
                    let z = self.output_value(sum_wz, sum_w);
                    self.stats.add(z);
                    z as f32
                }
                None => self.nodata,
            };
        }
    }

    /// Returns `(Σw·z, Σw)` over the sources covering column `col`,
    /// or `None` if no source has a value there.
    fn blend_node(&self, sync: &RowSynchronizer<'_>, col: usize) -> Option<(C, C)> {
        let mut sums = None;
        for active in sync.active() {
            let footprint = active.source.footprint();
            let Some(pcol) = footprint.window_column(col, self.nx_360) else {
                continue;
            };
            let Some(z) = active.value_at(footprint.local_column(pcol)) else {
                continue;
            };
            let w = active
                .source
                .node_weight(active.source.x_weight(pcol, self.half), active.wt_y);
            let (sum_wz, sum_w) = sums.get_or_insert((0.0, 0.0));
            *sum_wz += w * C::from(z);
            *sum_w += w;
        }
        sums
    }

    /// Returns the value picked by `rule` at column `col` with unit
    /// weight.
    ///
    /// With a sign filter the first contributing value seeds the node,
    /// so a covered node is never left empty.
    fn clobber_node(
        rule: ClobberRule,
        sync: &RowSynchronizer<'_>,
        col: usize,
        nx_360: Option<i64>,
    ) -> Option<(C, C)> {
        let mut seed = None;
        let mut picked = None;
        for active in sync.active() {
            let footprint = active.source.footprint();
            let Some(pcol) = footprint.window_column(col, nx_360) else {
                continue;
            };
            let Some(z) = active.value_at(footprint.local_column(pcol)) else {
                continue;
            };
            let z = C::from(z);
            seed.get_or_insert(z);
            picked = rule.pick(picked, z);
        }
        picked.or(seed).map(|z| (z, 1.0))
    }

    fn output_value(&self, sum_wz: C, sum_w: C) -> C {
        match self.mode {
            OutputMode::Blend => {
                let z = if sum_w == 0.0 { 0.0 } else { sum_wz / sum_w };
                z * self.scale + self.shift
            }
            OutputMode::Weights => sum_w,
            OutputMode::WeightedSum => sum_wz,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Accumulator, Clobber, ClobberRule, OutputMode, SignFilter};
    use crate::{sync::RowSynchronizer, BlendSource, JobRecord};
    use approx::assert_relative_eq;
    use geo::geometry::Coord;
    use gmtgrid::{GridLocation, GridSpec, MemoryGrid, ReadMode, Registration};

    fn spec(region: &str) -> GridSpec {
        GridSpec::new(
            region.parse().unwrap(),
            Coord { x: 1.0, y: 1.0 },
            Registration::Gridline,
        )
        .unwrap()
    }

    fn constant(region: &str, z: f32, weight: f64, output: &GridSpec) -> BlendSource {
        let grid = MemoryGrid::from_fn(spec(region), |_, _| z);
        let record = JobRecord::new(GridLocation::memory(grid)).weight(weight);
        BlendSource::register(record, output, false).unwrap()
    }

    fn first_row(acc: &mut Accumulator, sources: &[BlendSource], n_columns: usize) -> Vec<f32> {
        let mut sync = RowSynchronizer::new(sources, ReadMode::Stream, 0.0);
        sync.sync(0).unwrap();
        let mut out = vec![0.0; n_columns];
        acc.accumulate_row(&sync, &mut out);
        out
    }

    #[test]
    fn test_parse_clobber() {
        let rule: ClobberRule = "u+p".parse().unwrap();
        assert_eq!(rule.clobber, Clobber::Upper);
        assert_eq!(rule.sign, SignFilter::Positive);
        let rule: ClobberRule = "f".parse().unwrap();
        assert_eq!(rule.clobber, Clobber::First);
        assert_eq!(rule.sign, SignFilter::Any);
        assert!("x".parse::<ClobberRule>().is_err());
        assert!("l+z".parse::<ClobberRule>().is_err());
    }

    #[test]
    fn test_weighted_average_and_modes() {
        let output = spec("0/2/0/2");
        let sources = [
            constant("0/2/0/2", 1.0, 1.0, &output),
            constant("0/2/0/2", 4.0, 3.0, &output),
        ];

        let mut acc = Accumulator::new(OutputMode::Blend, f32::NAN, 0.0);
        let row = first_row(&mut acc, &sources, 3);
        assert_relative_eq!(row[1], 3.25);
        assert_eq!(acc.stats().filled, 3);
        assert_eq!(acc.stats().range(), (3.25, 3.25));

        let mut acc = Accumulator::new(OutputMode::Weights, f32::NAN, 0.0);
        assert_relative_eq!(first_row(&mut acc, &sources, 3)[0], 4.0);

        let mut acc = Accumulator::new(OutputMode::WeightedSum, f32::NAN, 0.0);
        assert_relative_eq!(first_row(&mut acc, &sources, 3)[2], 13.0);

        let mut acc = Accumulator::new(OutputMode::Blend, f32::NAN, 0.0).scale(2.0, 1.0);
        assert_relative_eq!(first_row(&mut acc, &sources, 3)[0], 7.5);
    }

    #[test]
    fn test_uncovered_nodes_get_nodata() {
        let output = spec("0/4/0/2");
        let sources = [constant("0/1/0/2", 5.0, 1.0, &output)];
        let mut acc = Accumulator::new(OutputMode::Blend, -9999.0, 0.0);
        let row = first_row(&mut acc, &sources, 5);
        assert_eq!(row, [5.0, 5.0, -9999.0, -9999.0, -9999.0]);
        assert_eq!(acc.stats().filled, 2);
        assert_eq!(acc.stats().total, 5);

        let mut acc = Accumulator::new(OutputMode::Blend, f32::NAN, 0.0);
        let row = first_row(&mut acc, &[], 5);
        assert!(row.iter().all(|z| z.is_nan()));
        let (z_min, z_max) = acc.stats().range();
        assert!(z_min.is_nan() && z_max.is_nan());
    }

    #[test]
    fn test_clobber_modes() {
        let output = spec("0/2/0/2");
        let sources = [
            constant("0/2/0/2", 3.0, 1.0, &output),
            constant("0/2/0/2", -2.0, 1.0, &output),
            constant("0/2/0/2", 5.0, 1.0, &output),
        ];
        let run = |s: &str| {
            let mut acc = Accumulator::new(OutputMode::Blend, f32::NAN, 0.0).clobber(Some(s.parse().unwrap()));
            first_row(&mut acc, &sources, 3)[0]
        };
        assert_eq!(run("f"), 3.0);
        assert_eq!(run("l"), -2.0);
        assert_eq!(run("o"), 5.0);
        assert_eq!(run("u"), 5.0);
        assert_eq!(run("f+n"), -2.0);
        assert_eq!(run("u+n"), -2.0);
        assert_eq!(run("l+p"), 3.0);

        // The filter also applies to the first value.
        let negative = [
            constant("0/2/0/2", -1.0, 1.0, &output),
            constant("0/2/0/2", -3.0, 1.0, &output),
        ];
        let mut acc = Accumulator::new(OutputMode::Blend, f32::NAN, 0.0).clobber(Some("f+n".parse().unwrap()));
        assert_eq!(first_row(&mut acc, &negative, 3)[0], -1.0);

        // Nothing passes the filter, so the first value seeds the node.
        let positive = [
            constant("0/2/0/2", 3.0, 1.0, &output),
            constant("0/2/0/2", 5.0, 1.0, &output),
        ];
        let mut acc = Accumulator::new(OutputMode::Blend, f32::NAN, 0.0).clobber(Some("l+n".parse().unwrap()));
        assert_eq!(first_row(&mut acc, &positive, 3)[0], 3.0);
    }
}
