//! Array geometry: the sparse-to-dense neighbour tables.
//!
//! A [`Geometry`] describes, for each point of the dense virtual grid, which
//! sparse sensors are its neighbours, how much each contributes, how far
//! their signals may be shifted, and which precomputed sensor-pair
//! cross-correlation measures each neighbour's delay against the first
//! (reference) neighbour.
//!
//! All tables are stored `[dense point][neighbour slot]` with 0-based sensor
//! indices. The on-disk layout (see [`crate::layout`]) is transposed and
//! 1-based; conversion happens once at load time.
//!
//! A geometry is immutable. Replace it wholesale to reconfigure.

use crate::validation::{self, ValidationResult};
use sarita_core::Matrix;
use std::fmt;

/// Largest supported dense grid.
pub const MAX_SENSORS: usize = 64;

/// Direction and quadrature weight of a dense-grid point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DenseDirection {
    /// Azimuth in radians.
    pub azimuth: f32,
    /// Elevation in radians.
    pub elevation: f32,
    /// Quadrature weight used by the downstream encoder.
    pub weight: f32,
}

/// Which stored pair correlation serves a (reference, neighbour) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CombinationRef {
    /// Index into [`Geometry::combinations`].
    pub slot: usize,
    /// The stored pair is (neighbour, reference); flip the lag axis.
    pub reversed: bool,
}

/// Scalar header fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryHeader {
    /// Sample rate the geometry was designed for (Hz).
    pub sample_rate: u32,
    /// Spherical-harmonic order of the sparse array.
    pub source_order: u32,
    /// Spherical-harmonic order of the dense grid.
    pub target_order: u32,
    /// Array radius in metres.
    pub radius: f32,
    /// Largest shift any neighbour may receive, in samples.
    pub max_shift_overall: usize,
}

/// Per-point tables in `[dense][slot]` orientation, 0-based indices.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryTables {
    /// Sensor pairs correlated once per frame.
    pub combinations: Vec<(usize, usize)>,
    /// Neighbour count per dense point.
    pub num_neighbors: Vec<usize>,
    /// Sparse sensor index per (point, slot).
    pub neighbor_indices: Matrix<usize>,
    /// Contribution weight per (point, slot).
    pub neighbor_weights: Matrix<f32>,
    /// Shift search bound per (point, slot - 1); slot 0 is the reference.
    pub max_shift: Matrix<usize>,
    /// Correlation lookup for every non-reference neighbour, point-major.
    pub combination_refs: Vec<CombinationRef>,
    /// Direction of every dense point.
    pub directions: Vec<DenseDirection>,
}

/// Validated array geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    header: GeometryHeader,
    tables: GeometryTables,
    /// `ref_offsets[d]` is the index of point `d`'s first entry in
    /// `tables.combination_refs`.
    ref_offsets: Vec<usize>,
    sparse_channels: usize,
}

impl Geometry {
    /// Validates `tables` against `header` and builds the geometry.
    pub fn from_tables(header: GeometryHeader, tables: GeometryTables) -> ValidationResult<Self> {
        validation::validate_tables(&header, &tables)?;

        let mut ref_offsets = Vec::with_capacity(tables.num_neighbors.len());
        let mut offset = 0;
        for &n in &tables.num_neighbors {
            ref_offsets.push(offset);
            offset += n - 1;
        }

        let sparse_channels = sparse_channel_count(&tables);
        let geometry = Self {
            header,
            tables,
            ref_offsets,
            sparse_channels,
        };
        validation::warn_on_pair_mismatch(&geometry);
        Ok(geometry)
    }

    /// Header fields.
    pub fn header(&self) -> &GeometryHeader {
        &self.header
    }

    /// Design sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    /// Sparse array SH order.
    pub fn source_order(&self) -> u32 {
        self.header.source_order
    }

    /// Dense grid SH order.
    pub fn target_order(&self) -> u32 {
        self.header.target_order
    }

    /// Array radius in metres.
    pub fn radius(&self) -> f32 {
        self.header.radius
    }

    /// Largest shift in samples; the dense buffers are padded by twice this.
    pub fn max_shift_overall(&self) -> usize {
        self.header.max_shift_overall
    }

    /// Number of dense-grid points.
    pub fn dense_grid_size(&self) -> usize {
        self.tables.num_neighbors.len()
    }

    /// Slots per dense point in the neighbour tables.
    pub fn neighbor_list_len(&self) -> usize {
        self.tables.neighbor_indices.cols()
    }

    /// Number of sparse channels referenced (highest index + 1).
    pub fn sparse_channels(&self) -> usize {
        self.sparse_channels
    }

    /// Sensor pairs whose correlation is computed each frame.
    pub fn combinations(&self) -> &[(usize, usize)] {
        &self.tables.combinations
    }

    /// Neighbour count of point `d`.
    #[inline]
    pub fn num_neighbors(&self, d: usize) -> usize {
        self.tables.num_neighbors[d]
    }

    /// Sparse indices of the neighbours of `d`, reference first.
    #[inline]
    pub fn neighbors(&self, d: usize) -> &[usize] {
        &self.tables.neighbor_indices.row(d)[..self.num_neighbors(d)]
    }

    /// Weights of the neighbours of `d`.
    #[inline]
    pub fn weights(&self, d: usize) -> &[f32] {
        &self.tables.neighbor_weights.row(d)[..self.num_neighbors(d)]
    }

    /// Shift search bound for neighbour `j >= 1` of `d`.
    #[inline]
    pub fn max_shift(&self, d: usize, j: usize) -> usize {
        *self.tables.max_shift.get(d, j - 1)
    }

    /// Correlation lookup for neighbour `j >= 1` of `d`.
    #[inline]
    pub fn combination(&self, d: usize, j: usize) -> CombinationRef {
        self.tables.combination_refs[self.ref_offsets[d] + j - 1]
    }

    /// All correlation lookups, point-major.
    pub fn combination_refs(&self) -> &[CombinationRef] {
        &self.tables.combination_refs
    }

    /// Direction of point `d`.
    pub fn direction(&self, d: usize) -> DenseDirection {
        self.tables.directions[d]
    }

    /// Directions of all dense points.
    pub fn directions(&self) -> &[DenseDirection] {
        &self.tables.directions
    }

    /// Raw tables.
    pub fn tables(&self) -> &GeometryTables {
        &self.tables
    }

    /// Short description for status displays.
    pub fn summary(&self) -> GeometrySummary {
        GeometrySummary {
            source_order: self.source_order(),
            target_order: self.target_order(),
            sparse_channels: self.sparse_channels(),
            dense_points: self.dense_grid_size(),
            sample_rate: self.sample_rate(),
            max_shift_overall: self.max_shift_overall(),
        }
    }
}

fn sparse_channel_count(tables: &GeometryTables) -> usize {
    let from_pairs = tables
        .combinations
        .iter()
        .map(|&(a, b)| a.max(b) + 1)
        .max()
        .unwrap_or(0);
    let from_neighbors = (0..tables.num_neighbors.len())
        .flat_map(|d| tables.neighbor_indices.row(d)[..tables.num_neighbors[d]].iter())
        .map(|&i| i + 1)
        .max()
        .unwrap_or(0);
    from_pairs.max(from_neighbors)
}

/// Grid facts shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometrySummary {
    /// Sparse array SH order.
    pub source_order: u32,
    /// Dense grid SH order.
    pub target_order: u32,
    /// Sparse channels required.
    pub sparse_channels: usize,
    /// Dense grid points produced.
    pub dense_points: usize,
    /// Design sample rate.
    pub sample_rate: u32,
    /// Largest shift in samples.
    pub max_shift_overall: usize,
}

impl fmt::Display for GeometrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Source Grid Order: {}", self.source_order)?;
        writeln!(f, "Target Grid Order: {}", self.target_order)?;
        writeln!(f, "Number of Sensors: {}", self.dense_points)?;
        writeln!(f, "Sparse Channels:   {}", self.sparse_channels)?;
        writeln!(f, "Sample Rate:       {} Hz", self.sample_rate)?;
        write!(f, "Max Shift:         {} samples", self.max_shift_overall)
    }
}

/// One dense point for [`GeometryBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct DensePoint {
    direction: DenseDirection,
    /// (sensor, weight, max shift or None for the overall bound)
    neighbors: Vec<(usize, f32, Option<usize>)>,
}

impl DensePoint {
    /// Point at the given direction (radians) with quadrature weight.
    pub fn new(azimuth: f32, elevation: f32, weight: f32) -> Self {
        Self {
            direction: DenseDirection {
                azimuth,
                elevation,
                weight,
            },
            neighbors: Vec::new(),
        }
    }

    /// Adds a neighbour searched over the overall shift bound. The first
    /// neighbour added is the reference.
    pub fn neighbor(mut self, sensor: usize, weight: f32) -> Self {
        self.neighbors.push((sensor, weight, None));
        self
    }

    /// Adds a neighbour with its own shift bound.
    pub fn neighbor_with_shift(mut self, sensor: usize, weight: f32, max_shift: usize) -> Self {
        self.neighbors.push((sensor, weight, Some(max_shift)));
        self
    }
}

/// Programmatic geometry construction.
///
/// Combination pairs and lookups are derived: each (reference, neighbour)
/// pair reuses a stored pair in either orientation, or appends a new one.
///
/// # Example
///
/// ```rust
/// use sarita_config::{DensePoint, GeometryBuilder};
///
/// let geometry = GeometryBuilder::new(48000)
///     .max_shift_overall(4)
///     .point(DensePoint::new(0.0, 0.0, 0.5).neighbor(0, 1.0))
///     .point(DensePoint::new(1.0, 0.0, 0.5).neighbor(0, 0.5).neighbor(1, 0.5))
///     .build()
///     .unwrap();
///
/// assert_eq!(geometry.dense_grid_size(), 2);
/// assert_eq!(geometry.combinations(), &[(0, 1)]);
/// assert_eq!(geometry.sparse_channels(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct GeometryBuilder {
    header: GeometryHeader,
    points: Vec<DensePoint>,
    combinations: Vec<(usize, usize)>,
}

impl GeometryBuilder {
    /// Starts an empty geometry for `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            header: GeometryHeader {
                sample_rate,
                source_order: 1,
                target_order: 1,
                radius: 0.0,
                max_shift_overall: 0,
            },
            points: Vec::new(),
            combinations: Vec::new(),
        }
    }

    /// Sets the source and target SH orders.
    pub fn orders(mut self, source: u32, target: u32) -> Self {
        self.header.source_order = source;
        self.header.target_order = target;
        self
    }

    /// Sets the array radius in metres.
    pub fn radius(mut self, radius: f32) -> Self {
        self.header.radius = radius;
        self
    }

    /// Sets the overall shift bound in samples.
    pub fn max_shift_overall(mut self, samples: usize) -> Self {
        self.header.max_shift_overall = samples;
        self
    }

    /// Pre-registers a combination pair so its slot index is fixed.
    pub fn combination(mut self, a: usize, b: usize) -> Self {
        self.combinations.push((a, b));
        self
    }

    /// Appends a dense point.
    pub fn point(mut self, point: DensePoint) -> Self {
        self.points.push(point);
        self
    }

    /// Builds and validates the geometry.
    pub fn build(self) -> ValidationResult<Geometry> {
        let dense = self.points.len();
        let list_len = self
            .points
            .iter()
            .map(|p| p.neighbors.len())
            .max()
            .unwrap_or(0);
        let overall = self.header.max_shift_overall;

        let mut combinations = self.combinations;
        let mut num_neighbors = Vec::with_capacity(dense);
        let mut neighbor_indices = Matrix::new(dense, list_len);
        let mut neighbor_weights = Matrix::new(dense, list_len);
        let mut max_shift = Matrix::new(dense, list_len.saturating_sub(1));
        let mut combination_refs = Vec::new();
        let mut directions = Vec::with_capacity(dense);

        for (d, point) in self.points.iter().enumerate() {
            num_neighbors.push(point.neighbors.len());
            directions.push(point.direction);

            for (j, &(sensor, weight, shift)) in point.neighbors.iter().enumerate() {
                *neighbor_indices.get_mut(d, j) = sensor;
                *neighbor_weights.get_mut(d, j) = weight;
                if j == 0 {
                    continue;
                }
                *max_shift.get_mut(d, j - 1) = shift.unwrap_or(overall);

                let reference = point.neighbors[0].0;
                combination_refs.push(lookup_or_insert(&mut combinations, reference, sensor));
            }
        }

        Geometry::from_tables(
            self.header,
            GeometryTables {
                combinations,
                num_neighbors,
                neighbor_indices,
                neighbor_weights,
                max_shift,
                combination_refs,
                directions,
            },
        )
    }
}

fn lookup_or_insert(
    combinations: &mut Vec<(usize, usize)>,
    reference: usize,
    neighbor: usize,
) -> CombinationRef {
    for (slot, &pair) in combinations.iter().enumerate() {
        if pair == (reference, neighbor) {
            return CombinationRef {
                slot,
                reversed: false,
            };
        }
        if pair == (neighbor, reference) {
            return CombinationRef {
                slot,
                reversed: true,
            };
        }
    }
    combinations.push((reference, neighbor));
    CombinationRef {
        slot: combinations.len() - 1,
        reversed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_point() -> Geometry {
        GeometryBuilder::new(48000)
            .orders(1, 2)
            .radius(0.05)
            .max_shift_overall(4)
            .point(DensePoint::new(0.0, 0.0, 0.25).neighbor(0, 1.0))
            .point(DensePoint::new(1.0, 0.0, 0.25).neighbor(1, 1.0))
            .point(
                DensePoint::new(2.0, 0.0, 0.25)
                    .neighbor(0, 0.5)
                    .neighbor_with_shift(1, 0.5, 3),
            )
            .point(DensePoint::new(3.0, 0.0, 0.25).neighbor(1, 0.5).neighbor(0, 0.5))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_shares_combinations() {
        let g = four_point();
        assert_eq!(g.combinations(), &[(0, 1)]);
        assert_eq!(
            g.combination(2, 1),
            CombinationRef {
                slot: 0,
                reversed: false
            }
        );
        assert_eq!(
            g.combination(3, 1),
            CombinationRef {
                slot: 0,
                reversed: true
            }
        );
    }

    #[test]
    fn test_accessors() {
        let g = four_point();
        assert_eq!(g.dense_grid_size(), 4);
        assert_eq!(g.neighbor_list_len(), 2);
        assert_eq!(g.neighbors(3), &[1, 0]);
        assert_eq!(g.weights(2), &[0.5, 0.5]);
        assert_eq!(g.max_shift(2, 1), 3);
        assert_eq!(g.max_shift(3, 1), 4);
        assert_eq!(g.sparse_channels(), 2);
        assert_eq!(g.direction(1).azimuth, 1.0);
    }

    #[test]
    fn test_ref_offsets_skip_single_neighbor_points() {
        let g = four_point();
        // points 0 and 1 contribute no lookups
        assert_eq!(g.combination_refs().len(), 2);
        assert!(g.combination(3, 1).reversed);
    }

    #[test]
    fn test_summary_display() {
        let text = four_point().summary().to_string();
        assert!(text.contains("Source Grid Order: 1"));
        assert!(text.contains("Target Grid Order: 2"));
        assert!(text.contains("Number of Sensors: 4"));
    }

    #[test]
    fn test_empty_builder_rejected() {
        assert!(GeometryBuilder::new(48000).build().is_err());
    }
}
