//! Polygon face reconstruction from a triangle buffer.
//!
//! Turns every non-degenerate triangle into a single-triangle
//! [`PolygonFace`] and hands the set to the coplanar merger. The result can
//! be attached to the buffer as its overlay.
//!
//! # Example
//!
//! ```
//! use tessera::algo::merge::MergeOptions;
//! use tessera::algo::reconstruct::reconstruct_overlay;
//! use tessera::mesh::MeshBuffer;
//!
//! let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
//! let mut mesh = MeshBuffer::from_flat(&positions, Some(&[0, 1, 2, 0, 2, 3])).unwrap();
//!
//! let faces = reconstruct_overlay(&mut mesh, &MergeOptions::default()).unwrap();
//! assert_eq!(faces, 1);
//! assert_eq!(mesh.overlay().unwrap()[0].num_vertices(), 4);
//! ```

use log::{debug, info};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::error::{MeshError, Result};
use crate::mesh::{centroid, triangle_normal, MeshBuffer, PolygonFace, PARALLEL_THRESHOLD};

use super::merge::{merge_coplanar, MergeOptions};

/// A non-degenerate buffer triangle with its derived geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Index into the triangle buffer.
    pub index: usize,
    /// Corner positions.
    pub corners: [Point3<f64>; 3],
    /// Unit normal.
    pub normal: Vector3<f64>,
    /// Corner average.
    pub centroid: Point3<f64>,
}

impl Triangle {
    /// Wrap as a single-triangle polygon face.
    pub fn to_face(&self) -> PolygonFace {
        PolygonFace::new(self.corners.to_vec(), self.normal, vec![self.index])
    }
}

/// Extract every non-degenerate triangle of a buffer, in buffer order.
pub fn extract_triangles(mesh: &MeshBuffer, parallel: bool) -> Vec<Triangle> {
    let extract = |index: usize| {
        let corners = mesh.triangle_positions(index);
        triangle_normal(&corners).map(|normal| Triangle {
            index,
            corners,
            normal,
            centroid: centroid(&corners),
        })
    };
    if parallel && mesh.num_triangles() > PARALLEL_THRESHOLD {
        (0..mesh.num_triangles())
            .into_par_iter()
            .filter_map(extract)
            .collect()
    } else {
        (0..mesh.num_triangles()).filter_map(extract).collect()
    }
}

/// Derive polygon faces for a buffer.
///
/// Returns [`MeshError::EmptyGeometry`] if the buffer has no vertices, no
/// triangles, or only degenerate triangles, and
/// [`MeshError::InvalidParameter`] for unusable tolerances.
pub fn reconstruct(mesh: &MeshBuffer, options: &MergeOptions) -> Result<Vec<PolygonFace>> {
    if mesh.is_empty() {
        return Err(MeshError::EmptyGeometry);
    }
    options.tolerances.validate()?;
    let triangles = extract_triangles(mesh, options.parallel);
    if triangles.is_empty() {
        return Err(MeshError::EmptyGeometry);
    }
    let skipped = mesh.num_triangles() - triangles.len();
    if skipped > 0 {
        debug!("skipped {} degenerate triangle(s)", skipped);
    }

    let faces: Vec<PolygonFace> = triangles.iter().map(Triangle::to_face).collect();
    let merged = merge_coplanar(faces, options);
    info!(
        "reconstructed {} polygon faces from {} triangles",
        merged.len(),
        mesh.num_triangles()
    );
    Ok(merged)
}

/// Replace the overlay of `mesh` in one step.
pub fn apply_overlay(mesh: &mut MeshBuffer, faces: Vec<PolygonFace>) -> Result<()> {
    mesh.apply_overlay(faces)
}

/// Reconstruct and attach the overlay. Returns the number of polygon faces.
///
/// On error the buffer's overlay is left as it was.
pub fn reconstruct_overlay(mesh: &mut MeshBuffer, options: &MergeOptions) -> Result<usize> {
    let faces = reconstruct(mesh, options)?;
    let count = faces.len();
    apply_overlay(mesh, faces)?;
    Ok(count)
}
