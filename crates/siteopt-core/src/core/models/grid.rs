use super::point::Crs;
use super::region::Envelope;

/// Affine mapping between raster pixel indices and map coordinates.
///
/// The six parameters follow the usual raster convention:
/// `x = origin_x + col * pixel_width + row * row_rotation` and
/// `y = origin_y + col * col_rotation + row * pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Builds a transform from the six-element array layout
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_coefficients(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// North-up transform without rotation; `pixel_height` is usually negative.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::from_coefficients([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Map coordinates of the top-left corner of pixel `(col, row)`.
    /// Fractional indices are accepted, so `(col + 0.5, row + 0.5)` is the pixel centre.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Inverts the affine mapping. Returns fractional pixel coordinates, or
    /// `None` when the transform is singular.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (self.pixel_width * dy - self.col_rotation * dx) / det;
        Some((col, row))
    }

    /// Integer pixel containing `(x, y)`, without bounds checking.
    pub fn pixel_index(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        let (col, row) = self.geo_to_pixel(x, y)?;
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        Some((col.floor() as i64, row.floor() as i64))
    }
}

/// Placement of a working grid in the working CRS.
///
/// The origin is the minimum corner of the covered envelope and row 0 is the
/// southern-most row, so y grows with the row index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub width: usize,
    pub height: usize,
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
    pub crs: Crs,
}

impl GridGeometry {
    pub fn new(
        width: usize,
        height: usize,
        origin_x: f64,
        origin_y: f64,
        cell_size: f64,
        crs: Crs,
    ) -> Self {
        Self {
            width,
            height,
            origin_x,
            origin_y,
            cell_width: cell_size,
            cell_height: cell_size,
            crs,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.cell_width,
            self.origin_y + (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// The cell containing `(x, y)`, or `None` when the point lies outside the grid.
    pub fn cell_of(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let col = ((x - self.origin_x) / self.cell_width).floor();
        let row = ((y - self.origin_y) / self.cell_height).floor();
        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }
        Some((col as usize, row as usize))
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::new(
            self.origin_x,
            self.origin_y,
            self.origin_x + self.width as f64 * self.cell_width,
            self.origin_y + self.height as f64 * self.cell_height,
        )
    }
}

/// A dense row-major 2-D array of `f64` values tied to a [`GridGeometry`].
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    geometry: GridGeometry,
    values: Vec<f64>,
}

/// A grid holding population density per cell.
pub type PopulationGrid = Grid;

impl Grid {
    pub fn zeros(geometry: GridGeometry) -> Self {
        Self {
            values: vec![0.0; geometry.cell_count()],
            geometry,
        }
    }

    /// Wraps row-major `values`; returns `None` when the length does not match the geometry.
    pub fn from_values(geometry: GridGeometry, values: Vec<f64>) -> Option<Self> {
        (values.len() == geometry.cell_count()).then_some(Self { geometry, values })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn width(&self) -> usize {
        self.geometry.width
    }

    pub fn height(&self) -> usize {
        self.geometry.height
    }

    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.geometry.width + col
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> f64 {
        self.values[self.index(col, row)]
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, value: f64) {
        let idx = self.index(col, row);
        self.values[idx] = value;
    }

    pub fn add(&mut self, col: usize, row: usize, value: f64) {
        let idx = self.index(col, row);
        self.values[idx] += value;
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0_f64, f64::max)
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Iterates `(col, row, value)` in row-major order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let width = self.geometry.width;
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % width, i / width, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn north_up_transform_round_trips_pixel_centres() {
        let gt = GeoTransform::north_up(100.0, 500.0, 10.0, -10.0);
        let (x, y) = gt.pixel_to_geo(3.5, 7.5);
        assert!(approx_eq(x, 135.0));
        assert!(approx_eq(y, 425.0));
        assert_eq!(gt.pixel_index(x, y), Some((3, 7)));
    }

    #[test]
    fn rotated_transform_inverts_correctly() {
        let gt = GeoTransform::from_coefficients([10.0, 2.0, 0.5, 20.0, 0.25, -3.0]);
        let (x, y) = gt.pixel_to_geo(4.25, 9.75);
        let (col, row) = gt.geo_to_pixel(x, y).unwrap();
        assert!(approx_eq(col, 4.25));
        assert!(approx_eq(row, 9.75));
    }

    #[test]
    fn singular_transform_has_no_inverse() {
        let gt = GeoTransform::from_coefficients([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(gt.geo_to_pixel(1.0, 1.0).is_none());
    }

    #[test]
    fn grid_geometry_maps_points_to_cells() {
        let geom = GridGeometry::new(4, 3, 100.0, 200.0, 10.0, Crs::WORLD_MOLLWEIDE);
        assert_eq!(geom.cell_center(0, 0), (105.0, 205.0));
        assert_eq!(geom.cell_of(105.0, 205.0), Some((0, 0)));
        assert_eq!(geom.cell_of(139.9, 229.9), Some((3, 2)));
        assert_eq!(geom.cell_of(140.0, 205.0), None);
        assert_eq!(geom.cell_of(99.0, 205.0), None);
        assert_eq!(geom.cell_of(f64::NAN, 205.0), None);
    }

    #[test]
    fn grid_is_row_major() {
        let geom = GridGeometry::new(3, 2, 0.0, 0.0, 1.0, Crs::WORLD_MOLLWEIDE);
        let grid = Grid::from_values(geom, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(grid.get(2, 0), 2.0);
        assert_eq!(grid.get(0, 1), 3.0);
        let cells: Vec<_> = grid.iter_cells().collect();
        assert_eq!(cells[4], (1, 1, 4.0));
        assert_eq!(grid.max_value(), 5.0);
        assert_eq!(grid.sum(), 15.0);
    }

    #[test]
    fn from_values_rejects_wrong_length() {
        let geom = GridGeometry::new(3, 2, 0.0, 0.0, 1.0, Crs::WORLD_MOLLWEIDE);
        assert!(Grid::from_values(geom, vec![0.0; 5]).is_none());
    }
}
