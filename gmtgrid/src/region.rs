use crate::{GridError, C};
use geo::{geometry::Coord, Intersects, Rect};
use std::{fmt, str::FromStr};

/// Longitude span at or beyond which a region wraps the globe.
const FULL_CIRCLE: C = 360.0;

/// A west/east/south/north rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region(Rect<C>);

impl Region {
    pub fn new(west: C, east: C, south: C, north: C) -> Result<Self, GridError> {
        if !(west.is_finite() && east.is_finite() && south.is_finite() && north.is_finite())
            || west >= east
            || south >= north
        {
            return Err(GridError::Region(format!("{west}/{east}/{south}/{north}")));
        }
        Ok(Self(Rect::new(
            Coord { x: west, y: south },
            Coord { x: east, y: north },
        )))
    }

    pub fn west(&self) -> C {
        self.0.min().x
    }

    pub fn east(&self) -> C {
        self.0.max().x
    }

    pub fn south(&self) -> C {
        self.0.min().y
    }

    pub fn north(&self) -> C {
        self.0.max().y
    }

    pub fn width(&self) -> C {
        self.0.width()
    }

    pub fn height(&self) -> C {
        self.0.height()
    }

    /// Returns `true` if this region spans all longitudes.
    pub fn is_global(&self) -> bool {
        self.width() >= FULL_CIRCLE - 1e-8
    }

    /// Returns `true` if the two regions share at least an edge.
    pub fn intersects(&self, other: &Self) -> bool {
        self.0.intersects(&other.0)
    }

    /// Returns `true` if the two regions share at least a latitude.
    pub fn intersects_y(&self, other: &Self) -> bool {
        self.south() <= other.north() && other.south() <= self.north()
    }

    /// Returns `true` if `other` lies within `self`, allowing `slop`
    /// on every edge.
    pub fn contains(&self, other: &Self, slop: C) -> bool {
        other.west() >= self.west() - slop
            && other.east() <= self.east() + slop
            && other.south() >= self.south() - slop
            && other.north() <= self.north() + slop
    }

    /// Returns a copy moved `dx` along the x axis.
    #[must_use]
    pub fn shift_x(&self, dx: C) -> Self {
        Self(Rect::new(
            Coord {
                x: self.west() + dx,
                y: self.south(),
            },
            Coord {
                x: self.east() + dx,
                y: self.north(),
            },
        ))
    }

    /// Returns the smallest region covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(Rect::new(
            Coord {
                x: self.west().min(other.west()),
                y: self.south().min(other.south()),
            },
            Coord {
                x: self.east().max(other.east()),
                y: self.north().max(other.north()),
            },
        ))
    }

    /// Returns the 360°-multiple shift that places this longitude
    /// range over `target`, or `None` if no shift makes them overlap.
    ///
    /// The search starts two full turns west and steps east until the
    /// east edge reaches `target`'s west edge.
    pub fn periodic_shift(&self, target: &Self) -> Option<C> {
        let mut shift = -2.0 * FULL_CIRCLE;
        while self.east() + shift < target.west() {
            shift += FULL_CIRCLE;
        }
        if self.west() + shift > target.east() {
            None
        } else {
            Some(shift)
        }
    }
}

impl FromStr for Region {
    type Err = GridError;

    /// Parses `w/e/s/n`, optionally prefixed with `-R`.
    fn from_str(s: &str) -> Result<Self, GridError> {
        let mk_err = || GridError::Region(s.to_owned());
        let body = s.strip_prefix("-R").unwrap_or(s);
        let bounds = body
            .split('/')
            .map(|field| field.trim().parse::<C>().map_err(|_| mk_err()))
            .collect::<Result<Vec<C>, GridError>>()?;
        match bounds[..] {
            [w, e, s, n] => Self::new(w, e, s, n),
            _ => Err(mk_err()),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.west(),
            self.east(),
            self.south(),
            self.north()
        )
    }
}

/// Where grid nodes sit relative to the region's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Nodes lie on grid-line intersections, including the region's
    /// edges.
    Gridline,

    /// Nodes lie at cell centres, half a cell inside the region's
    /// edges.
    Pixel,
}

impl Registration {
    /// Returns the header code for this registration.
    pub fn code(self) -> i32 {
        match self {
            Self::Gridline => 0,
            Self::Pixel => 1,
        }
    }

    pub fn from_code(code: i32) -> Result<Self, GridError> {
        match code {
            0 => Ok(Self::Gridline),
            1 => Ok(Self::Pixel),
            other => Err(GridError::Registration(other)),
        }
    }

    /// Distance, in cells, from a region edge to the nearest node.
    pub fn offset(self) -> C {
        match self {
            Self::Gridline => 0.0,
            Self::Pixel => 0.5,
        }
    }
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gridline => f.write_str("gridline"),
            Self::Pixel => f.write_str("pixel"),
        }
    }
}
