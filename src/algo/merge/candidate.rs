//! Pairwise merge test and merge operation.

use log::trace;

use crate::error::{MeshError, Result};
use crate::mesh::{dedup_points, order_around_centroid, PolygonFace};
use crate::tolerance::Tolerances;

/// Whether two faces are merge candidates: parallel planes, the second
/// face's centroid on the first face's plane, and a shared vertex.
///
/// Faces with fewer than three vertices never merge.
pub fn can_merge(a: &PolygonFace, b: &PolygonFace, tol: &Tolerances) -> bool {
    if a.num_vertices() < 3 || b.num_vertices() < 3 {
        return false;
    }
    if a.normal.dot(&b.normal).abs() < tol.normal {
        return false;
    }
    if a.plane_distance(&b.centroid()).abs() > tol.distance {
        return false;
    }
    a.shares_vertex(b, tol.distance)
}

/// Merge two candidate faces into one polygon.
///
/// The merged face keeps the normal of `a`. Its vertices are the union of
/// both vertex sets with near-duplicates removed, ordered counter-clockwise
/// around the centroid. Fails with [`MeshError::DegenerateMergeCandidate`]
/// when the result would have fewer than 3 or more than
/// `max_polygon_vertices` vertices, an edge no longer than
/// [`Tolerances::min_edge_length`], an area no larger than `min_area`, or
/// would fail [`PolygonFace::is_coplanar`]. A merge never produces a face
/// that [`validate_and_repair`](super::validate_and_repair) would split.
pub fn try_merge(a: &PolygonFace, b: &PolygonFace, tol: &Tolerances) -> Result<PolygonFace> {
    let mut points = Vec::with_capacity(a.num_vertices() + b.num_vertices());
    points.extend_from_slice(&a.vertices);
    points.extend_from_slice(&b.vertices);
    let unique = dedup_points(&points, tol.distance);

    if unique.len() < 3 {
        return Err(MeshError::degenerate("fewer than three distinct vertices"));
    }
    if unique.len() > tol.max_polygon_vertices {
        return Err(MeshError::degenerate("too many vertices"));
    }

    let ordered = order_around_centroid(&unique, &a.normal);
    let min_edge = tol.min_edge_length();
    let n = ordered.len();
    if (0..n).any(|i| (ordered[(i + 1) % n] - ordered[i]).norm() <= min_edge) {
        return Err(MeshError::degenerate("edge shorter than minimum"));
    }

    let mut sources = a.source_triangles.clone();
    sources.extend_from_slice(&b.source_triangles);
    let merged = PolygonFace::new(ordered, a.normal, sources);

    if merged.area() <= tol.min_area {
        return Err(MeshError::degenerate("area below minimum"));
    }
    if !merged.is_coplanar(tol.distance) {
        return Err(MeshError::degenerate("merged polygon is not planar"));
    }
    Ok(merged)
}

/// Merge `a` and `b` in either order, `a` first.
///
/// Trying both orders makes the outcome depend on the pair, not on where
/// the faces sit in the scan.
pub(crate) fn merge_if_possible(
    a: &PolygonFace,
    b: &PolygonFace,
    tol: &Tolerances,
) -> Option<PolygonFace> {
    merge_ordered(a, b, tol).or_else(|| merge_ordered(b, a, tol))
}

/// [`try_merge`] for candidates only; rejections are trace-logged.
fn merge_ordered(a: &PolygonFace, b: &PolygonFace, tol: &Tolerances) -> Option<PolygonFace> {
    if !can_merge(a, b, tol) {
        return None;
    }
    match try_merge(a, b, tol) {
        Ok(merged) => Some(merged),
        Err(err) => {
            trace!(
                "skipping merge of faces {:?} and {:?}: {}",
                a.source_triangles,
                b.source_triangles,
                err
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    fn tri(index: usize, a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> PolygonFace {
        PolygonFace::from_triangle(
            index,
            [
                Point3::new(a[0], a[1], a[2]),
                Point3::new(b[0], b[1], b[2]),
                Point3::new(c[0], c[1], c[2]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_square_halves_merge_to_quad() {
        let tol = Tolerances::default();
        let a = tri(0, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        let b = tri(1, [0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(can_merge(&a, &b, &tol));

        let merged = try_merge(&a, &b, &tol).unwrap();
        assert_eq!(merged.num_vertices(), 4);
        assert_eq!(merged.source_triangles, vec![0, 1]);
        assert_eq!(merged.normal, Vector3::z());
        assert!((merged.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_perpendicular_faces_are_not_candidates() {
        let tol = Tolerances::default();
        let a = tri(0, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        let b = tri(1, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0]);
        assert!(!can_merge(&a, &b, &tol));
    }

    #[test]
    fn test_parallel_offset_faces_are_not_candidates() {
        let tol = Tolerances::default();
        let a = tri(0, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        let b = tri(1, [0.0, 0.0, 0.5], [1.0, 0.0, 0.5], [1.0, 1.0, 0.5]);
        assert!(!can_merge(&a, &b, &tol));
    }

    #[test]
    fn test_disjoint_coplanar_faces_are_not_candidates() {
        let tol = Tolerances::default();
        let a = tri(0, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        let b = tri(1, [5.0, 0.0, 0.0], [6.0, 0.0, 0.0], [6.0, 1.0, 0.0]);
        assert!(!can_merge(&a, &b, &tol));
    }

    #[test]
    fn test_short_edge_rejected() {
        let tol = Tolerances::default();
        let a = tri(0, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        // Adds a vertex 5e-3 away from (1, 0, 0): distinct, but too close.
        let b = tri(1, [0.0, 0.0, 0.0], [1.005, 0.0, 0.0], [1.0, 1.0, 0.0]);
        assert!(matches!(
            try_merge(&a, &b, &tol),
            Err(MeshError::DegenerateMergeCandidate { .. })
        ));
        assert!(merge_if_possible(&a, &b, &tol).is_none());
    }

    #[test]
    fn test_warped_union_rejected() {
        let tol = Tolerances::default();
        // Close enough to be candidates, but the union's last corner sits
        // 1.7e-3 off the plane through its first three.
        let a = tri(0, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0008]);
        let b = tri(1, [0.0, 0.0, 0.0], [1.0, 1.0, 0.0008], [0.0, 1.0, 0.0025]);
        assert!(can_merge(&a, &b, &tol));
        let err = try_merge(&a, &b, &tol).unwrap_err();
        assert!(err.to_string().contains("not planar"), "{}", err);
        assert!(merge_if_possible(&a, &b, &tol).is_none());
    }

    #[test]
    fn test_merge_is_order_independent() {
        let tol = Tolerances::default();
        let a = tri(0, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        let b = tri(1, [0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
        let ab = merge_if_possible(&a, &b, &tol).unwrap();
        let ba = merge_if_possible(&b, &a, &tol).unwrap();
        assert_eq!(ab.vertices, ba.vertices);
        assert_eq!(ab.source_triangles, ba.source_triangles);
    }

    #[test]
    fn test_vertex_cap_rejected() {
        let tol = Tolerances {
            max_polygon_vertices: 3,
            ..Tolerances::default()
        };
        let a = tri(0, [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]);
        let b = tri(1, [0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]);
        assert!(try_merge(&a, &b, &tol).is_err());
    }
}
