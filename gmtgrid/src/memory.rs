use crate::{GridError, GridHeader, GridSink, GridSpec};

/// A grid held entirely in memory, row-major with the northernmost
/// row first.
///
/// Used both as an input for in-process callers and as an output sink
/// when the consumer wants a grid object rather than a file.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryGrid {
    header: GridHeader,
    samples: Vec<f32>,
    next_row: usize,
}

impl MemoryGrid {
    /// Returns a grid with every node missing.
    pub fn new(header: GridHeader) -> Self {
        let samples = vec![f32::NAN; header.spec.len()];
        Self {
            header,
            samples,
            next_row: 0,
        }
    }

    /// Returns a grid whose node at (`col`, `row`) holds `f(col, row)`.
    pub fn from_fn<F>(spec: GridSpec, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut samples = Vec::with_capacity(spec.len());
        for row in 0..spec.n_rows() {
            for col in 0..spec.n_columns() {
                samples.push(f(col, row));
            }
        }
        let next_row = spec.n_rows();
        Self {
            header: GridHeader::new(spec),
            samples,
            next_row,
        }
    }

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    pub fn spec(&self) -> &GridSpec {
        &self.header.spec
    }

    /// Returns the node at (`col`, `row`), if inside the grid.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        let spec = self.spec();
        (col < spec.n_columns() && row < spec.n_rows())
            .then(|| self.samples[row * spec.n_columns() + col])
    }

    /// Returns row `row`, if inside the grid.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let n_columns = self.spec().n_columns();
        self.samples.get(row * n_columns..(row + 1) * n_columns)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
}

impl GridSink for MemoryGrid {
    fn name(&self) -> String {
        String::from("<memory>")
    }

    fn write_row(&mut self, row: usize, data: &[f32]) -> Result<(), GridError> {
        if row != self.next_row || row >= self.spec().n_rows() {
            return Err(GridError::RowOrder {
                expected: self.next_row,
                got: row,
            });
        }
        let n_columns = self.spec().n_columns();
        self.samples[row * n_columns..(row + 1) * n_columns].copy_from_slice(data);
        self.next_row += 1;
        Ok(())
    }

    fn finish(&mut self, z_min: f64, z_max: f64) -> Result<(), GridError> {
        let n_rows = self.spec().n_rows();
        if self.next_row != n_rows {
            return Err(GridError::Incomplete(self.next_row, n_rows));
        }
        self.header.z_min = z_min;
        self.header.z_max = z_max;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryGrid;
    use crate::{GridHeader, GridSink, GridSpec, Region, Registration};
    use geo::geometry::Coord;

    fn spec() -> GridSpec {
        GridSpec::new(
            Region::new(0.0, 2.0, 0.0, 1.0).unwrap(),
            Coord { x: 1.0, y: 1.0 },
            Registration::Gridline,
        )
        .unwrap()
    }

    #[test]
    fn test_from_fn_layout() {
        #[allow(clippy::cast_precision_loss)]
        let grid = MemoryGrid::from_fn(spec(), |col, row| (10 * row + col) as f32);
        assert_eq!(grid.get(2, 0), Some(2.0));
        assert_eq!(grid.get(1, 1), Some(11.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.row(1), Some(&[10.0, 11.0, 12.0][..]));
    }

    #[test]
    fn test_sink_rejects_out_of_order_rows() {
        let mut grid = MemoryGrid::new(GridHeader::new(spec()));
        assert!(grid.write_row(1, &[0.0; 3]).is_err());
        grid.write_row(0, &[1.0; 3]).unwrap();
        assert!(grid.finish(1.0, 1.0).is_err());
        grid.write_row(1, &[2.0; 3]).unwrap();
        grid.finish(1.0, 2.0).unwrap();
        assert_eq!(grid.header().z_max, 2.0);
        assert_eq!(grid.get(0, 1), Some(2.0));
    }
}
