use crate::{GridError, GridSpec, HEADER_LEN};
use byteorder::{ByteOrder, LittleEndian as LE};
use std::{
    mem::size_of,
    path::{Path, PathBuf},
};

/// Sample encodings for native binary grids.
///
/// Formats are named by their short id, which may be appended to a
/// file name as `name=id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFormat {
    /// `bf`: 4-byte floats, NaN marks missing nodes.
    Float,

    /// `bs`: 2-byte integers scaled by the header's z scale and
    /// offset, `i16::MIN` marks missing nodes.
    Short,
}

/// Stored value of a missing node in [`GridFormat::Short`] grids.
pub const SHORT_NODATA: i16 = i16::MIN;

impl GridFormat {
    pub fn id(self) -> &'static str {
        match self {
            Self::Float => "bf",
            Self::Short => "bs",
        }
    }

    pub fn from_id(id: &str) -> Result<Self, GridError> {
        match id {
            "bf" => Ok(Self::Float),
            "bs" => Ok(Self::Short),
            "nf" | "cf" | "nb" | "ns" | "ni" | "nd" => Err(GridError::NetCdf(PathBuf::from(id))),
            other => Err(GridError::FormatId(other.to_owned())),
        }
    }

    /// Bytes per sample.
    pub fn sample_size(self) -> usize {
        match self {
            Self::Float => size_of::<f32>(),
            Self::Short => size_of::<i16>(),
        }
    }

    /// Bytes per row of `n_columns` samples.
    pub fn row_len(self, n_columns: usize) -> usize {
        self.sample_size() * n_columns
    }

    /// Splits an optional `=id` suffix off `path`.
    ///
    /// netCDF names (by extension or id) are recognised and rejected.
    pub fn split_path<P: AsRef<Path>>(path: P) -> Result<(PathBuf, Option<Self>), GridError> {
        let path = path.as_ref();
        let text = path.to_string_lossy();
        let (file, format) = match text.rsplit_once('=') {
            Some((file, id)) if !file.is_empty() && !id.contains(|c: char| c == '/' || c == '\\') => {
                let format = Self::from_id(id).map_err(|e| match e {
                    GridError::NetCdf(_) => GridError::NetCdf(path.to_owned()),
                    other => other,
                })?;
                (PathBuf::from(file), Some(format))
            }
            _ => (path.to_owned(), None),
        };
        if format.is_none() && is_netcdf_name(&file) {
            return Err(GridError::NetCdf(file));
        }
        Ok((file, format))
    }

    /// Infers the format of the grid at `path` from its length.
    pub fn infer<P: AsRef<Path>>(path: P, spec: &GridSpec) -> Result<Self, GridError> {
        let len = path.as_ref().metadata()?.len();
        [Self::Float, Self::Short]
            .into_iter()
            .find(|format| HEADER_LEN + (format.row_len(spec.n_columns()) * spec.n_rows()) as u64 == len)
            .ok_or_else(|| GridError::Len(len, path.as_ref().to_owned()))
    }

    /// Decodes one row of raw samples into `out`, applying the
    /// header's `scale` and `offset`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode_row(self, raw: &[u8], scale: f64, offset: f64, out: &mut [f32]) {
        debug_assert_eq!(raw.len(), self.row_len(out.len()));
        match self {
            Self::Float => {
                LE::read_f32_into(raw, out);
                if scale != 1.0 || offset != 0.0 {
                    for z in out.iter_mut() {
                        *z = (f64::from(*z) * scale + offset) as f32;
                    }
                }
            }
            Self::Short => {
                for (z, bytes) in out.iter_mut().zip(raw.chunks_exact(size_of::<i16>())) {
                    let stored = LE::read_i16(bytes);
                    *z = if stored == SHORT_NODATA {
                        f32::NAN
                    } else {
                        (f64::from(stored) * scale + offset) as f32
                    };
                }
            }
        }
    }

    /// Encodes one row of samples into `raw`, inverting the header's
    /// `scale` and `offset`.
    pub fn encode_row(self, row: &[f32], scale: f64, offset: f64, raw: &mut Vec<u8>) {
        raw.clear();
        raw.resize(self.row_len(row.len()), 0);
        match self {
            Self::Float => {
                if scale == 1.0 && offset == 0.0 {
                    LE::write_f32_into(row, raw);
                } else {
                    for (z, bytes) in row.iter().zip(raw.chunks_exact_mut(size_of::<f32>())) {
                        #[allow(clippy::cast_possible_truncation)]
                        LE::write_f32(bytes, ((f64::from(*z) - offset) / scale) as f32);
                    }
                }
            }
            Self::Short => {
                for (z, bytes) in row.iter().zip(raw.chunks_exact_mut(size_of::<i16>())) {
                    LE::write_i16(bytes, encode_short(*z, scale, offset));
                }
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn encode_short(z: f32, scale: f64, offset: f64) -> i16 {
    if z.is_nan() {
        return SHORT_NODATA;
    }
    let stored = ((f64::from(z) - offset) / scale).round();
    stored.clamp(f64::from(SHORT_NODATA) + 1.0, f64::from(i16::MAX)) as i16
}

/// Returns `true` if `path` names a netCDF file.
pub fn is_netcdf_name<P: AsRef<Path>>(path: P) -> bool {
    matches!(
        path.as_ref()
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .as_deref(),
        Some("nc" | "cdf" | "nc4")
    )
}
