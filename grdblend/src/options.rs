use anyhow::{anyhow, Error as AnyError};
use blend::{gmtgrid::Region, ClobberRule};
use clap::{ArgAction, Parser, ValueEnum};
use geo::geometry::Coord;
use std::{path::PathBuf, str::FromStr};

/// Blend partially overlapping grids into one, feathering the overlaps
/// with cosine tapers.
///
/// Inputs are either a blend job (one "file [inner-region] [weight]"
/// per line, read from stdin when no input is given) or two or more
/// grid files.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output grid, optionally suffixed "=bf" or "=bs".
    #[arg(short = 'G', long)]
    pub outgrid: PathBuf,

    /// Output increment "dx[/dy]", taken from the inputs when absent.
    #[arg(short = 'I', long)]
    pub increment: Option<Increment>,

    /// Output region "w/e/s/n", the union of the inputs when absent.
    #[arg(short = 'R', long, allow_hyphen_values = true)]
    pub region: Option<Region>,

    /// Pixel registered output.
    #[arg(short = 'r', long, default_value_t = false)]
    pub pixel: bool,

    /// Value of nodes no input covers.
    #[arg(short = 'N', long, default_value_t = f32::NAN, allow_hyphen_values = true)]
    pub nodata: f32,

    /// Write a bare stream of little-endian floats with no header.
    #[arg(short = 'Q', long, default_value_t = false)]
    pub headerless: bool,

    /// Write the weight sum ("-W" or "-W=w") or the weighted value sum
    /// ("-W=z") instead of blended values.
    #[arg(
        short = 'W',
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "w"
    )]
    pub weights: Option<WeightOutput>,

    /// Scale, then shift, blended values: "scale[/shift]".
    #[arg(short = 'Z', long, allow_hyphen_values = true)]
    pub scale: Option<ZScale>,

    /// Paste inputs instead of blending them, keeping the first (f),
    /// lowest (l), last (o) or highest (u) value, optionally only
    /// positive (+p) or negative (+n) ones.
    #[arg(short = 'C', long, conflicts_with = "weights")]
    pub clobber: Option<ClobberRule>,

    /// Longitudes wrap every 360 degrees.
    #[arg(short = 'f', long, default_value_t = false)]
    pub geographic: bool,

    /// Memory map input grids instead of streaming them.
    #[arg(long, default_value_t = false)]
    pub mmap: bool,

    /// Print a JSON summary to stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// More log output, repeat for more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// A blend job file ("-" for stdin) or two or more grids.
    pub input: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WeightOutput {
    /// Sum of weights.
    W,

    /// Sum of weight times value.
    Z,
}

#[derive(Clone, Debug, Copy)]
pub struct Increment(pub Coord<f64>);

impl FromStr for Increment {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (dx, dy) = match s.split_once('/') {
            Some((dx, dy)) => (f64::from_str(dx)?, f64::from_str(dy)?),
            None => {
                let d = f64::from_str(s)?;
                (d, d)
            }
        };
        if !(dx > 0.0 && dy > 0.0) {
            return Err(anyhow!("increment must be positive"));
        }
        Ok(Self(Coord { x: dx, y: dy }))
    }
}

#[derive(Clone, Debug, Copy)]
pub struct ZScale {
    pub scale: f64,
    pub shift: f64,
}

impl FromStr for ZScale {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (scale, shift) = match s.split_once('/') {
            Some((scale, shift)) => (f64::from_str(scale)?, f64::from_str(shift)?),
            None => (f64::from_str(s)?, 0.0),
        };
        if !scale.is_finite() || !shift.is_finite() {
            return Err(anyhow!("not a valid scale[/shift]"));
        }
        Ok(Self { scale, shift })
    }
}
