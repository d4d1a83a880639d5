//! Geometric tolerances shared by every algorithm.
//!
//! All comparisons that decide "same point", "same plane" or "too small"
//! go through a [`Tolerances`] value so callers working in other model
//! units can retune them in one place.

use crate::error::{MeshError, Result};

/// Point/plane coincidence distance in model units.
pub const DISTANCE_TOLERANCE: f64 = 1e-3;

/// Cosine similarity above which two normals count as the same plane
/// direction (about 2.5 degrees).
pub const NORMAL_TOLERANCE: f64 = 0.999;

/// Upper bound on merge passes in the coplanar merger.
pub const MAX_MERGE_ITERATIONS: usize = 10;

/// Largest polygon the merger will produce.
pub const MAX_POLYGON_VERTICES: usize = 20;

/// Merged polygon edges must be longer than this multiple of the distance
/// tolerance.
pub const MIN_EDGE_FACTOR: f64 = 10.0;

/// Smallest area a merged polygon may have.
pub const MIN_FACE_AREA: f64 = 1e-6;

/// Cross-product magnitude under which a triangle is degenerate.
pub const DEGENERATE_EPSILON: f64 = 1e-10;

/// Tunable tolerance set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Point/plane coincidence distance.
    pub distance: f64,

    /// Minimum `|n1 · n2|` for two faces to share a plane direction.
    pub normal: f64,

    /// Maximum number of merge passes.
    pub max_merge_iterations: usize,

    /// Maximum vertex count of a merged polygon.
    pub max_polygon_vertices: usize,

    /// Minimum area of a merged polygon.
    pub min_area: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            distance: DISTANCE_TOLERANCE,
            normal: NORMAL_TOLERANCE,
            max_merge_iterations: MAX_MERGE_ITERATIONS,
            max_polygon_vertices: MAX_POLYGON_VERTICES,
            min_area: MIN_FACE_AREA,
        }
    }
}

impl Tolerances {
    /// Set the distance tolerance.
    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Set the normal (cosine) tolerance.
    pub fn with_normal(mut self, normal: f64) -> Self {
        self.normal = normal;
        self
    }

    /// Set the merge pass bound.
    pub fn with_max_merge_iterations(mut self, iterations: usize) -> Self {
        self.max_merge_iterations = iterations;
        self
    }

    /// Shortest edge a merged polygon may keep.
    #[inline]
    pub fn min_edge_length(&self) -> f64 {
        self.distance * MIN_EDGE_FACTOR
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(MeshError::invalid_param(
                "distance",
                self.distance,
                "must be finite and positive",
            ));
        }
        if !(self.normal > 0.0 && self.normal <= 1.0) {
            return Err(MeshError::invalid_param(
                "normal",
                self.normal,
                "must be in (0, 1]",
            ));
        }
        if self.max_polygon_vertices < 3 {
            return Err(MeshError::invalid_param(
                "max_polygon_vertices",
                self.max_polygon_vertices,
                "must be at least 3",
            ));
        }
        if self.min_area.is_nan() || self.min_area < 0.0 {
            return Err(MeshError::invalid_param(
                "min_area",
                self.min_area,
                "must be non-negative",
            ));
        }
        Ok(())
    }

    /// Copy with every unusable value replaced by its default.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            distance: if self.distance.is_finite() && self.distance > 0.0 {
                self.distance
            } else {
                defaults.distance
            },
            normal: if self.normal > 0.0 && self.normal <= 1.0 {
                self.normal
            } else {
                defaults.normal
            },
            max_merge_iterations: self.max_merge_iterations,
            max_polygon_vertices: self.max_polygon_vertices.max(3),
            min_area: if self.min_area.is_nan() || self.min_area < 0.0 {
                defaults.min_area
            } else {
                self.min_area
            },
        }
    }
}
