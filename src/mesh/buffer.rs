//! Indexed triangle storage with an optional polygon overlay.
//!
//! The triangle buffer is the ground truth for rendering and export. The
//! polygon overlay is advisory: it is stamped with the buffer revision it was
//! derived from and is hidden as soon as the buffer changes underneath it.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use super::polygon::{triangle_normal, PolygonFace};
use super::weld::VertexWeld;
use crate::error::{MeshError, Result};
use crate::tolerance::DISTANCE_TOLERANCE;

/// Vertex, triangle and polygon counts of a mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshStats {
    /// Buffer vertex entries.
    pub vertices: usize,
    /// Logical vertices (buffer entries welded at the default distance
    /// tolerance).
    pub unique_vertices: usize,
    /// Triangles in the buffer, degenerate ones included.
    pub triangles: usize,
    /// Triangles with non-zero area.
    pub non_degenerate_triangles: usize,
    /// Polygon faces in the overlay, if a fresh overlay is attached.
    pub polygon_faces: Option<usize>,
}

#[derive(Debug, Clone)]
struct Overlay {
    revision: u64,
    faces: Vec<PolygonFace>,
}

/// A vertex buffer, a triangle index buffer and an optional polygon overlay.
#[derive(Debug, Clone, Default)]
pub struct MeshBuffer {
    positions: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
    flat_normals: Vec<Vector3<f64>>,
    overlay: Option<Overlay>,
    revision: u64,
}

impl MeshBuffer {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from positions and triangles, validating indices.
    pub fn from_parts(positions: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        validate_indices(positions.len(), &triangles)?;
        let mut mesh = Self {
            positions,
            triangles,
            flat_normals: Vec::new(),
            overlay: None,
            revision: 0,
        };
        mesh.recompute_flat_normals();
        Ok(mesh)
    }

    /// Build a mesh from a flat `[x, y, z, ...]` array and an optional index
    /// array. Without indices, consecutive position triplets form triangles.
    pub fn from_flat(positions: &[f64], indices: Option<&[u32]>) -> Result<Self> {
        if positions.len() % 3 != 0 {
            return Err(MeshError::InvalidBufferLength {
                name: "position",
                len: positions.len(),
            });
        }
        let points: Vec<Point3<f64>> = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();

        let triangles: Vec<[usize; 3]> = match indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(MeshError::InvalidBufferLength {
                        name: "index",
                        len: indices.len(),
                    });
                }
                indices
                    .chunks_exact(3)
                    .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
                    .collect()
            }
            None => {
                if points.len() % 3 != 0 {
                    return Err(MeshError::InvalidBufferLength {
                        name: "non-indexed position",
                        len: positions.len(),
                    });
                }
                (0..points.len() / 3)
                    .map(|t| [3 * t, 3 * t + 1, 3 * t + 2])
                    .collect()
            }
        };

        Self::from_parts(points, triangles)
    }

    // ==================== Accessors ====================

    /// Get the number of buffer vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no vertices or no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.triangles.is_empty()
    }

    /// All vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Position of one vertex.
    #[inline]
    pub fn position(&self, index: usize) -> Option<&Point3<f64>> {
        self.positions.get(index)
    }

    /// All triangles.
    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Per-triangle flat normals (zero for degenerate triangles).
    #[inline]
    pub fn flat_normals(&self) -> &[Vector3<f64>] {
        &self.flat_normals
    }

    /// Buffer revision; bumped by every structural mutation.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Corner positions of a triangle.
    #[inline]
    pub fn triangle_positions(&self, triangle: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[triangle];
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Unit face normal of a triangle, `None` if degenerate.
    pub fn triangle_normal(&self, triangle: usize) -> Option<Vector3<f64>> {
        triangle_normal(&self.triangle_positions(triangle))
    }

    /// Whether a triangle has (numerically) zero area.
    pub fn is_degenerate(&self, triangle: usize) -> bool {
        self.triangle_normal(triangle).is_none()
    }

    /// Number of triangles with non-zero area.
    pub fn num_non_degenerate(&self) -> usize {
        (0..self.triangles.len())
            .filter(|&t| !self.is_degenerate(t))
            .count()
    }

    /// Axis-aligned bounding box.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.positions.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.positions[1..] {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }

    /// Summary statistics.
    pub fn stats(&self) -> MeshStats {
        MeshStats {
            vertices: self.positions.len(),
            unique_vertices: self.weld(DISTANCE_TOLERANCE).num_logical(),
            triangles: self.triangles.len(),
            non_degenerate_triangles: self.num_non_degenerate(),
            polygon_faces: self.overlay().map(<[PolygonFace]>::len),
        }
    }

    /// Build the logical-vertex index of this buffer.
    pub fn weld(&self, tolerance: f64) -> VertexWeld {
        VertexWeld::build(&self.positions, tolerance)
    }

    // ==================== Overlay ====================

    /// The polygon overlay, if one is attached and still matches the buffer.
    pub fn overlay(&self) -> Option<&[PolygonFace]> {
        self.overlay
            .as_ref()
            .filter(|o| o.revision == self.revision)
            .map(|o| o.faces.as_slice())
    }

    /// Whether an overlay is attached but no longer matches the buffer.
    pub fn has_stale_overlay(&self) -> bool {
        self.overlay
            .as_ref()
            .is_some_and(|o| o.revision != self.revision)
    }

    /// Replace the overlay in one step.
    ///
    /// Every source triangle index must address the current buffer.
    pub fn apply_overlay(&mut self, faces: Vec<PolygonFace>) -> Result<()> {
        let count = self.triangles.len();
        if let Some((fi, &t)) = faces
            .iter()
            .enumerate()
            .flat_map(|(fi, f)| f.source_triangles.iter().map(move |t| (fi, t)))
            .find(|&(_, &t)| t >= count)
        {
            return Err(MeshError::InvalidState(format!(
                "overlay face {} references triangle {} but the buffer has {}",
                fi, t, count
            )));
        }
        self.overlay = Some(Overlay {
            revision: self.revision,
            faces,
        });
        Ok(())
    }

    /// Drop the overlay.
    pub fn clear_overlay(&mut self) -> Option<Vec<PolygonFace>> {
        self.overlay.take().map(|o| o.faces)
    }

    // ==================== Mutation ====================

    /// Move one vertex. Stales the overlay.
    pub fn set_position(&mut self, index: usize, position: Point3<f64>) {
        self.positions[index] = position;
        self.revision += 1;
    }

    /// Move several vertices to the same position. Stales the overlay.
    pub fn move_vertices(&mut self, indices: &[usize], position: Point3<f64>) {
        for &i in indices {
            self.positions[i] = position;
        }
        self.revision += 1;
    }

    /// Remove vertices no triangle references, reindexing triangles.
    ///
    /// Returns the number of vertices removed.
    pub fn compact(&mut self) -> usize {
        let mut remap = vec![usize::MAX; self.positions.len()];
        let mut kept = Vec::with_capacity(self.positions.len());
        for tri in &self.triangles {
            for &v in tri {
                if remap[v] == usize::MAX {
                    remap[v] = kept.len();
                    kept.push(self.positions[v]);
                }
            }
        }
        let removed = self.positions.len() - kept.len();
        if removed == 0 {
            return 0;
        }
        for tri in &mut self.triangles {
            for v in tri.iter_mut() {
                *v = remap[*v];
            }
        }
        self.positions = kept;
        self.revision += 1;
        removed
    }

    /// Recompute per-triangle ("flat") normals.
    ///
    /// Does not stale the overlay; normals are derived data.
    pub fn recompute_flat_normals(&mut self) {
        let positions = &self.positions;
        let normal_of = |tri: &[usize; 3]| {
            triangle_normal(&[positions[tri[0]], positions[tri[1]], positions[tri[2]]])
                .unwrap_or_else(Vector3::zeros)
        };
        self.flat_normals = if self.triangles.len() > PARALLEL_THRESHOLD {
            self.triangles.par_iter().map(normal_of).collect()
        } else {
            self.triangles.iter().map(normal_of).collect()
        };
    }

    // ==================== Export ====================

    /// Positions as a flat `[x, y, z, ...]` array.
    pub fn to_flat_positions(&self) -> Vec<f64> {
        self.positions
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect()
    }

    /// Triangle indices as a flat array.
    pub fn to_flat_indices(&self) -> Vec<u32> {
        self.triangles
            .iter()
            .flat_map(|t| t.iter().map(|&v| v as u32))
            .collect()
    }

    /// Flat normals repeated for each of the three triangle corners.
    pub fn corner_normals(&self) -> Vec<Vector3<f64>> {
        self.flat_normals.iter().flat_map(|n| [*n; 3]).collect()
    }

    /// [`corner_normals`](Self::corner_normals) as a flat array, matching a
    /// non-indexed position layout.
    pub fn to_flat_normals(&self) -> Vec<f64> {
        self.corner_normals()
            .iter()
            .flat_map(|n| [n.x, n.y, n.z])
            .collect()
    }

    /// Whether all referenced positions are finite.
    pub fn is_finite(&self) -> bool {
        self.positions
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
    }
}

/// Triangle count above which per-triangle work is spread over rayon.
pub(crate) const PARALLEL_THRESHOLD: usize = 4096;

fn validate_indices(num_vertices: usize, triangles: &[[usize; 3]]) -> Result<()> {
    for (ti, tri) in triangles.iter().enumerate() {
        for &v in tri {
            if v >= num_vertices {
                return Err(MeshError::InvalidVertexIndex {
                    triangle: ti,
                    vertex: v,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshBuffer {
        MeshBuffer::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            Some(&[0, 1, 2, 0, 2, 3]),
        )
        .unwrap()
    }

    #[test]
    fn test_from_flat_indexed() {
        let mesh = quad();
        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_triangles(), 2);
        assert_eq!(mesh.flat_normals().len(), 2);
        assert!((mesh.flat_normals()[0] - Vector3::z()).norm() < 1e-12);
    }

    #[test]
    fn test_from_flat_non_indexed() {
        let mesh = MeshBuffer::from_flat(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            None,
        )
        .unwrap();
        assert_eq!(mesh.triangles(), &[[0, 1, 2]]);
    }

    #[test]
    fn test_from_flat_rejects_bad_input() {
        assert!(matches!(
            MeshBuffer::from_flat(&[0.0, 1.0], None),
            Err(MeshError::InvalidBufferLength { .. })
        ));
        assert!(matches!(
            MeshBuffer::from_flat(&[0.0; 9], Some(&[0, 1, 5])),
            Err(MeshError::InvalidVertexIndex { triangle: 0, vertex: 5 })
        ));
    }

    #[test]
    fn test_round_trip_flat() {
        let mesh = quad();
        let again =
            MeshBuffer::from_flat(&mesh.to_flat_positions(), Some(&mesh.to_flat_indices())).unwrap();
        assert_eq!(again.positions(), mesh.positions());
        assert_eq!(again.triangles(), mesh.triangles());
        assert_eq!(mesh.to_flat_normals().len(), 2 * 9);
    }

    #[test]
    fn test_overlay_goes_stale_on_mutation() {
        let mut mesh = quad();
        let face = PolygonFace::from_triangle(0, mesh.triangle_positions(0)).unwrap();
        mesh.apply_overlay(vec![face]).unwrap();
        assert_eq!(mesh.overlay().map(|o| o.len()), Some(1));

        mesh.set_position(3, Point3::new(0.0, 2.0, 0.0));
        assert!(mesh.overlay().is_none());
        assert!(mesh.has_stale_overlay());
    }

    #[test]
    fn test_overlay_rejects_out_of_range_sources() {
        let mut mesh = quad();
        let mut face = PolygonFace::from_triangle(0, mesh.triangle_positions(0)).unwrap();
        face.source_triangles = vec![7];
        assert!(matches!(
            mesh.apply_overlay(vec![face]),
            Err(MeshError::InvalidState(_))
        ));
        assert!(mesh.overlay().is_none());
    }

    #[test]
    fn test_compact_removes_unreferenced() {
        let mut mesh = MeshBuffer::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(9.0, 9.0, 9.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 2, 3]],
        )
        .unwrap();
        assert_eq!(mesh.compact(), 1);
        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.triangles(), &[[0, 1, 2]]);
    }

    #[test]
    fn test_stats_and_degenerate() {
        let mesh = MeshBuffer::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 1, 3]],
        )
        .unwrap();
        let stats = mesh.stats();
        assert_eq!(stats.vertices, 4);
        assert_eq!(stats.unique_vertices, 3);
        assert_eq!(stats.triangles, 2);
        assert_eq!(stats.non_degenerate_triangles, 1);
        assert_eq!(stats.polygon_faces, None);
        assert_eq!(mesh.flat_normals()[1], Vector3::zeros());
    }

    #[test]
    fn test_bounding_box() {
        let mesh = quad();
        let (min, max) = mesh.bounding_box().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 0.0));
        assert!(MeshBuffer::new().bounding_box().is_none());
    }
}
