//! Where a source grid lands in output-grid index space.

use gmtgrid::{GridSpec, Region, Registration, C};

/// An inclusive range of output-grid indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub lo: i64,
    pub hi: i64,
}

impl Span {
    pub fn contains(&self, idx: i64) -> bool {
        self.lo <= idx && idx <= self.hi
    }
}

/// Outer and inner index spans along one axis.
///
/// `outer` covers every source node. The inner span is widened by one
/// index on each side, so indices strictly between `inner.lo` and
/// `inner.hi` receive full weight while indices at or beyond them are
/// tapered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisFootprint {
    pub outer: Span,
    pub inner: Span,
}

/// A source grid's column and row spans in output-grid index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    pub cols: AxisFootprint,
    pub rows: AxisFootprint,
}

#[allow(clippy::cast_possible_truncation)]
fn rint(v: C) -> i64 {
    v.round() as i64
}

impl Footprint {
    /// Computes the footprint of a source covering `outer`, with full
    /// weight inside `inner`, on the `output` grid.
    ///
    /// The two grids must already share increment and registration.
    pub fn new(outer: &Region, inner: &Region, registration: Registration, output: &GridSpec) -> Self {
        let inc = output.inc();
        let h = output.region();
        let one_or_zero = match output.registration() {
            Registration::Gridline => 1,
            Registration::Pixel => 0,
        };
        let reg = i64::from(registration.code());
        let cols = AxisFootprint {
            outer: Span {
                lo: rint((outer.west() - h.west()) / inc.x),
                hi: rint((outer.east() - h.west()) / inc.x) - reg,
            },
            inner: Span {
                lo: rint((inner.west() - h.west()) / inc.x) - 1,
                hi: rint((inner.east() - h.west()) / inc.x) + one_or_zero,
            },
        };
        let rows = AxisFootprint {
            outer: Span {
                lo: rint((h.north() - outer.north()) / inc.y),
                hi: rint((h.north() - outer.south()) / inc.y) - reg,
            },
            inner: Span {
                lo: rint((h.north() - inner.north()) / inc.y) - 1,
                hi: rint((h.north() - inner.south()) / inc.y) + one_or_zero,
            },
        };
        Self { cols, rows }
    }

    /// Returns `true` if output row `row` falls inside the source.
    #[allow(clippy::cast_possible_wrap)]
    pub fn contains_row(&self, row: usize) -> bool {
        self.rows.outer.contains(row as i64)
    }

    /// Returns the source row read for output row `row`.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn source_row(&self, row: usize) -> Option<usize> {
        self.contains_row(row)
            .then(|| (row as i64 - self.rows.outer.lo) as usize)
    }

    /// Number of leading source rows lying north of the output grid.
    #[allow(clippy::cast_sign_loss)]
    pub fn skip_rows(&self) -> usize {
        (-self.rows.outer.lo).max(0) as usize
    }

    /// Maps output column `col` into this source's column window.
    ///
    /// With `nx_360` set, the output is longitude-periodic with that
    /// many columns per turn, and the column is tried at every
    /// equivalent longitude. Returns the matching column in output
    /// index space, if any.
    #[allow(clippy::cast_possible_wrap)]
    pub fn window_column(&self, col: usize, nx_360: Option<i64>) -> Option<i64> {
        let outer = self.cols.outer;
        let pcol = match nx_360 {
            Some(nx_360) if nx_360 > 0 => {
                let mut pcol = col as i64 + nx_360;
                while pcol > outer.hi {
                    pcol -= nx_360;
                }
                pcol
            }
            _ => col as i64,
        };
        outer.contains(pcol).then_some(pcol)
    }

    /// Converts a column from [`Footprint::window_column`] into an
    /// index into the source's row buffer.
    #[allow(clippy::cast_sign_loss)]
    pub fn local_column(&self, pcol: i64) -> usize {
        debug_assert!(self.cols.outer.contains(pcol));
        (pcol - self.cols.outer.lo) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{Footprint, Span};
    use gmtgrid::{GridSpec, Region, Registration};
    use geo::geometry::Coord;

    fn output(region: &str, inc: f64, registration: Registration) -> GridSpec {
        GridSpec::new(region.parse().unwrap(), Coord { x: inc, y: inc }, registration).unwrap()
    }

    fn region(s: &str) -> Region {
        s.parse().unwrap()
    }

    #[test]
    fn test_gridline_footprint() {
        let out = output("0/10/0/10", 1.0, Registration::Gridline);
        let fp = Footprint::new(&region("2/8/1/9"), &region("4/6/3/7"), Registration::Gridline, &out);
        assert_eq!(fp.cols.outer, Span { lo: 2, hi: 8 });
        assert_eq!(fp.cols.inner, Span { lo: 3, hi: 7 });
        assert_eq!(fp.rows.outer, Span { lo: 1, hi: 9 });
        assert_eq!(fp.rows.inner, Span { lo: 2, hi: 8 });
        assert_eq!(fp.skip_rows(), 0);
        assert_eq!(fp.source_row(0), None);
        assert_eq!(fp.source_row(1), Some(0));
        assert_eq!(fp.source_row(9), Some(8));
        assert_eq!(fp.source_row(10), None);
    }

    #[test]
    fn test_pixel_footprint() {
        let out = output("0/10/0/10", 1.0, Registration::Pixel);
        let outer = region("2/8/1/9");
        let fp = Footprint::new(&outer, &outer, Registration::Pixel, &out);
        // 6 pixel columns starting at output column 2.
        assert_eq!(fp.cols.outer, Span { lo: 2, hi: 7 });
        // Inner equal to outer puts the taper spans beyond the outer
        // ones, so no node is tapered.
        assert_eq!(fp.cols.inner, Span { lo: 1, hi: 8 });
        assert_eq!(fp.rows.outer, Span { lo: 1, hi: 8 });
    }

    #[test]
    fn test_skip_rows_for_sources_north_of_output() {
        let out = output("0/10/0/10", 1.0, Registration::Gridline);
        let outer = region("0/10/5/14");
        let fp = Footprint::new(&outer, &outer, Registration::Gridline, &out);
        assert_eq!(fp.rows.outer.lo, -4);
        assert_eq!(fp.skip_rows(), 4);
        assert_eq!(fp.source_row(0), Some(4));
    }

    #[test]
    fn test_window_column_wraps() {
        // Output is 0..360 every 10 degrees, source covers 350..380.
        let out = output("0/360/-10/10", 10.0, Registration::Gridline);
        let outer = region("350/380/-10/10");
        let fp = Footprint::new(&outer, &outer, Registration::Gridline, &out);
        assert_eq!(fp.cols.outer, Span { lo: 35, hi: 38 });

        let nx_360 = Some(36);
        assert_eq!(fp.window_column(35, nx_360), Some(35));
        assert_eq!(fp.window_column(36, nx_360), Some(36));
        assert_eq!(fp.window_column(0, nx_360), Some(36));
        assert_eq!(fp.window_column(2, nx_360), Some(38));
        assert_eq!(fp.window_column(3, nx_360), None);
        assert_eq!(fp.local_column(38), 3);

        assert_eq!(fp.window_column(0, None), None);
        assert_eq!(fp.window_column(36, None), Some(36));
    }
}
