//! Post-merge validation: planarity repair and vertex ordering.

use log::debug;

use crate::mesh::{triangle_normal, PolygonFace};
use crate::tolerance::Tolerances;

/// Replace every non-planar face by a triangle fan.
///
/// Faces with four or more vertices are checked against the plane through
/// their first three vertices (see [`PolygonFace::reference_plane`]). A face
/// with any vertex farther than `tol.distance` from that plane is
/// fan-triangulated from vertex 0; every piece inherits the parent's source
/// triangles. Planar faces pass through unchanged.
pub fn validate_and_repair(faces: Vec<PolygonFace>, tol: &Tolerances) -> Vec<PolygonFace> {
    let mut out = Vec::with_capacity(faces.len());
    let mut repaired = 0usize;
    for face in faces {
        if face.is_coplanar(tol.distance) {
            out.push(face);
        } else {
            repaired += 1;
            out.extend(fan_triangulate(&face));
        }
    }
    if repaired > 0 {
        debug!("fan-triangulated {} non-planar polygon(s)", repaired);
    }
    out
}

/// Re-order the vertices of every face counter-clockwise around its
/// centroid, seen from its normal.
pub fn order_faces(faces: &mut [PolygonFace]) {
    for face in faces.iter_mut() {
        face.order_vertices();
        face.refresh_type();
    }
}

fn fan_triangulate(face: &PolygonFace) -> Vec<PolygonFace> {
    let v = &face.vertices;
    (1..v.len().saturating_sub(1))
        .map(|i| {
            let corners = [v[0], v[i], v[i + 1]];
            let normal = triangle_normal(&corners).unwrap_or(face.normal);
            PolygonFace::new(corners.to_vec(), normal, face.source_triangles.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FaceType;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_planar_face_untouched() {
        let face = PolygonFace::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            Vector3::z(),
            vec![0, 1],
        );
        let out = validate_and_repair(vec![face.clone()], &Tolerances::default());
        assert_eq!(out, vec![face]);
    }

    #[test]
    fn test_warped_quad_is_fanned() {
        let face = PolygonFace::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.3),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(-0.5, 0.5, 0.0),
            ],
            Vector3::z(),
            vec![4, 7],
        );
        let out = validate_and_repair(vec![face], &Tolerances::default());
        assert_eq!(out.len(), 3);
        for piece in &out {
            assert_eq!(piece.face_type, FaceType::Triangle);
            assert_eq!(piece.source_triangles, vec![4, 7]);
            assert_eq!(piece.vertices[0], Point3::new(0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_order_faces_restores_ccw() {
        let mut faces = vec![PolygonFace::new(
            vec![
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            Vector3::z(),
            vec![0],
        )];
        order_faces(&mut faces);
        let n = crate::mesh::newell_normal(&faces[0].vertices).unwrap();
        assert!(n.dot(&Vector3::z()) > 0.999);
    }
}
