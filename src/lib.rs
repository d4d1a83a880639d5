//! # Tessera
//!
//! Polygon-aware editing of triangle meshes.
//!
//! Renderers and exchange formats want triangles; people editing a model
//! think in faces. Tessera keeps both: an indexed triangle buffer is the
//! ground truth, and a polygon overlay is reconstructed on top of it by
//! merging coplanar triangles. Editing operations mutate the buffer and then
//! refresh the overlay so the two never disagree.
//!
//! ## Features
//!
//! - **Coplanar merging**: adjacent coplanar triangles become quads and
//!   n-gons, with validation and repair of the merged faces
//! - **Bulk simplification**: watertight edge collapse that never changes the
//!   triangle count, with a floor on output size and a fallback chain
//! - **Interactive edge collapse**: move both endpoints of one edge to a
//!   target point, keeping duplicated vertices together
//! - **Procedural solids**: a cached catalogue of primitives with their
//!   polygon faces
//! - **File formats**: polygon OBJ and STL
//!
//! ## Quick Start
//!
//! ```
//! use tessera::prelude::*;
//!
//! let positions = [
//!     0.0, 0.0, 0.0,
//!     1.0, 0.0, 0.0,
//!     1.0, 1.0, 0.0,
//!     0.0, 1.0, 0.0,
//! ];
//! let mut mesh = MeshBuffer::from_flat(&positions, Some(&[0, 1, 2, 0, 2, 3])).unwrap();
//!
//! let faces = reconstruct_overlay(&mut mesh, &MergeOptions::default()).unwrap();
//! assert_eq!(faces, 1);
//! assert_eq!(mesh.overlay().unwrap()[0].face_type, FaceType::Quad);
//! ```
//!
//! ## Simplifying
//!
//! ```
//! use tessera::prelude::*;
//!
//! let mesh = SolidCache::new().get("cylinder").unwrap();
//! let result = simplify(&mesh, &SimplifyOptions::with_target(0.3)).unwrap();
//!
//! // Vertices move, triangles stay.
//! assert_eq!(result.new_stats.triangles, result.original_stats.triangles);
//! println!("{} via {}", result.reduction_achieved, result.strategy);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod mesh;
pub mod solids;
pub mod tolerance;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::merge::{merge_coplanar, MergeOptions};
    pub use crate::algo::painter::{collapse_edge, EdgeCollapseResult, PainterOptions};
    pub use crate::algo::reconstruct::{reconstruct, reconstruct_overlay};
    pub use crate::algo::simplify::{
        simplify, simplify_with, ExternalSimplifier, SimplifiedResult, SimplifyOptions,
        SimplifyStrategy,
    };
    pub use crate::algo::{CancelToken, Progress};
    pub use crate::error::{MeshError, Result};
    pub use crate::mesh::{FaceType, MeshBuffer, MeshStats, PolygonFace, VertexWeld};
    pub use crate::solids::SolidCache;
    pub use crate::tolerance::Tolerances;
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_cube_round_trip() {
        let cube = SolidCache::new().get("cube").unwrap();
        assert_eq!(cube.num_vertices(), 8);
        assert_eq!(cube.num_triangles(), 12);

        let mut triangles_only = cube.clone();
        triangles_only.clear_overlay();
        let faces = reconstruct(&triangles_only, &MergeOptions::default()).unwrap();
        assert_eq!(faces.len(), 6);
        assert!(faces.iter().all(|f| f.face_type == FaceType::Quad));

        let result = collapse_edge(
            &cube,
            0,
            1,
            Point3::new(0.0, 0.0, 0.0),
            &PainterOptions::default(),
        )
        .unwrap();
        assert_eq!(result.mesh.num_triangles(), 12);
    }
}
