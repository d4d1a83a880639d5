//! Core mesh data structures.
//!
//! This module provides the indexed triangle buffer and the polygon overlay
//! that is reconstructed on top of it.
//!
//! # Overview
//!
//! The primary type is [`MeshBuffer`]: a flat vertex buffer, a triangle index
//! buffer, per-triangle flat normals and an optional overlay of
//! [`PolygonFace`]s. The triangle buffer is the ground truth; the overlay is
//! re-derivable from it and is hidden once the buffer is mutated without it
//! being refreshed.
//!
//! Several buffer entries may hold "the same" vertex when a mesh comes from
//! a format without shared vertices. [`VertexWeld`] recovers that logical
//! identity by proximity.
//!
//! # Construction
//!
//! ```
//! use tessera::mesh::MeshBuffer;
//!
//! let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.5, 1.0, 0.0];
//! let mesh = MeshBuffer::from_flat(&positions, Some(&[0, 1, 2])).unwrap();
//!
//! assert_eq!(mesh.num_vertices(), 3);
//! assert_eq!(mesh.num_triangles(), 1);
//! ```

mod buffer;
mod polygon;
mod weld;

pub use buffer::{MeshBuffer, MeshStats};
pub(crate) use buffer::PARALLEL_THRESHOLD;
pub use polygon::{
    centroid, cmp_points, dedup_points, newell_normal, order_around_centroid, plane_basis,
    polygon_area, triangle_normal, FaceType, PolygonFace,
};
pub use weld::VertexWeld;
