use crate::footprint::AxisFootprint;
use gmtgrid::C;
use std::f64::consts::PI;

/// Cosine taper along one axis of a source grid.
///
/// Weight rises from 0 at the outer edge to 1 at the inner edge on
/// both ends of the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Taper {
    axis: AxisFootprint,

    /// Radians per output cell on the low-index edge, `None` when the
    /// inner region touches the outer edge.
    rate_lo: Option<C>,

    /// Radians per output cell on the high-index edge.
    rate_hi: Option<C>,
}

/// Returns the taper rate across a `gap` between outer and inner
/// edges sampled every `inc`.
pub fn taper_rate(inc: C, gap: C) -> Option<C> {
    (gap > 0.0).then(|| PI * inc / gap)
}

impl Taper {
    pub fn new(axis: AxisFootprint, rate_lo: Option<C>, rate_hi: Option<C>) -> Self {
        Self {
            axis,
            rate_lo,
            rate_hi,
        }
    }

    /// Returns the weight at output index `idx`, where `half` is the
    /// output registration's half-cell offset.
    #[allow(clippy::cast_precision_loss)]
    pub fn weight(&self, idx: i64, half: C) -> C {
        let AxisFootprint { outer, inner } = self.axis;
        match (self.rate_lo, self.rate_hi) {
            (Some(rate), _) if idx <= inner.lo => {
                0.5 * (1.0 - (((idx - outer.lo) as C + half) * rate).cos())
            }
            (_, Some(rate)) if idx >= inner.hi => {
                0.5 * (1.0 - (((outer.hi - idx) as C + half) * rate).cos())
            }
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{taper_rate, Taper};
    use crate::footprint::{AxisFootprint, Span};
    use approx::assert_relative_eq;

    // Outer 0..=10, inner 4..=6 widened to 3..=7.
    fn taper() -> Taper {
        let axis = AxisFootprint {
            outer: Span { lo: 0, hi: 10 },
            inner: Span { lo: 3, hi: 7 },
        };
        Taper::new(axis, taper_rate(1.0, 4.0), taper_rate(1.0, 3.0))
    }

    #[test]
    fn test_zero_gap_has_no_rate() {
        assert_eq!(taper_rate(1.0, 0.0), None);
        assert_relative_eq!(taper_rate(0.5, 2.0).unwrap(), std::f64::consts::FRAC_PI_4);
    }

    #[test]
    fn test_edges_and_plateau() {
        let taper = taper();
        assert_relative_eq!(taper.weight(0, 0.0), 0.0);
        assert_relative_eq!(taper.weight(10, 0.0), 0.0);
        assert_relative_eq!(taper.weight(2, 0.0), 0.5);
        for idx in 4..=6 {
            assert_relative_eq!(taper.weight(idx, 0.0), 1.0);
        }
    }

    #[test]
    fn test_monotonic_and_continuous() {
        let taper = taper();
        let weights: Vec<f64> = (0..=10).map(|idx| taper.weight(idx, 0.0)).collect();
        for pair in weights[..=4].windows(2) {
            assert!(pair[0] < pair[1], "{weights:?}");
        }
        for pair in weights[6..].windows(2) {
            assert!(pair[0] >= pair[1], "{weights:?}");
        }
        // The last tapered node on each side reaches full weight.
        assert_relative_eq!(weights[4], 1.0);
        assert_relative_eq!(taper.weight(3, 0.0), 0.5 * (1.0 - (0.75 * std::f64::consts::PI).cos()));
        assert!(weights.iter().all(|w| (0.0..=1.0).contains(w)));
    }

    #[test]
    fn test_untapered_edge_is_full_weight() {
        let axis = AxisFootprint {
            outer: Span { lo: 0, hi: 10 },
            inner: Span { lo: -1, hi: 11 },
        };
        let taper = Taper::new(axis, None, None);
        assert_relative_eq!(taper.weight(0, 0.0), 1.0);
        assert_relative_eq!(taper.weight(10, 0.5), 1.0);
    }
}
