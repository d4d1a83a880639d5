//! Polygon faces: the reconstructed overlay above the triangle buffer.
//!
//! A [`PolygonFace`] stores vertex *positions* rather than buffer indices so
//! that it tolerates meshes whose triangles do not share vertex entries.
//! Its [`FaceType`] is derived from the vertex count alone.

use std::cmp::Ordering;
use std::fmt;

use nalgebra::{Point3, Vector3};

use crate::tolerance::DEGENERATE_EPSILON;

/// Sine of the angle under which the first three vertices of a polygon are
/// treated as collinear when fitting its reference plane.
const COLLINEAR_SINE: f64 = 1e-6;

/// Polygon classification by vertex count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceType {
    /// Fewer than three vertices; only produced by interactive collapses,
    /// which never delete faces.
    Degenerate,
    /// Exactly three vertices.
    Triangle,
    /// Exactly four vertices.
    Quad,
    /// More than four vertices.
    Polygon,
}

impl FaceType {
    /// Classify a vertex count.
    pub fn from_vertex_count(count: usize) -> Self {
        match count {
            0..=2 => FaceType::Degenerate,
            3 => FaceType::Triangle,
            4 => FaceType::Quad,
            _ => FaceType::Polygon,
        }
    }

    /// Lowercase tag used by exporters.
    pub fn as_str(self) -> &'static str {
        match self {
            FaceType::Degenerate => "degenerate",
            FaceType::Triangle => "triangle",
            FaceType::Quad => "quad",
            FaceType::Polygon => "polygon",
        }
    }
}

impl fmt::Display for FaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A planar polygon reconstructed from one or more source triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFace {
    /// Classification derived from `vertices.len()`.
    pub face_type: FaceType,

    /// Perimeter-ordered vertex positions.
    pub vertices: Vec<Point3<f64>>,

    /// Unit normal.
    pub normal: Vector3<f64>,

    /// Indices of the buffer triangles this face covers, sorted.
    pub source_triangles: Vec<usize>,
}

impl PolygonFace {
    /// Create a face; the type is derived from the vertex count.
    pub fn new(
        vertices: Vec<Point3<f64>>,
        normal: Vector3<f64>,
        mut source_triangles: Vec<usize>,
    ) -> Self {
        source_triangles.sort_unstable();
        source_triangles.dedup();
        Self {
            face_type: FaceType::from_vertex_count(vertices.len()),
            vertices,
            normal,
            source_triangles,
        }
    }

    /// Wrap a single buffer triangle. Returns `None` for a degenerate one.
    pub fn from_triangle(index: usize, corners: [Point3<f64>; 3]) -> Option<Self> {
        let normal = triangle_normal(&corners)?;
        Some(Self::new(corners.to_vec(), normal, vec![index]))
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Average of the vertex positions.
    pub fn centroid(&self) -> Point3<f64> {
        centroid(&self.vertices)
    }

    /// Polygon area measured along the face normal.
    pub fn area(&self) -> f64 {
        polygon_area(&self.vertices, &self.normal)
    }

    /// Signed distance from `p` to this face's plane (through the centroid).
    pub fn plane_distance(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.centroid()))
    }

    /// Whether any vertex of `self` lies within `tolerance` of a vertex of
    /// `other`.
    pub fn shares_vertex(&self, other: &PolygonFace, tolerance: f64) -> bool {
        self.vertices
            .iter()
            .any(|a| other.vertices.iter().any(|b| (a - b).norm() <= tolerance))
    }

    /// Plane through the first three vertices, as `(origin, unit normal)`.
    ///
    /// Falls back to the stored normal through the first vertex when the
    /// first three vertices are collinear.
    pub fn reference_plane(&self) -> Option<(Point3<f64>, Vector3<f64>)> {
        let origin = *self.vertices.first()?;
        if self.vertices.len() >= 3 {
            let e1 = self.vertices[1] - origin;
            let e2 = self.vertices[2] - origin;
            let cross = e1.cross(&e2);
            let scale = e1.norm() * e2.norm();
            if scale > 0.0 && cross.norm() > COLLINEAR_SINE * scale {
                return Some((origin, cross.normalize()));
            }
        }
        let len = self.normal.norm();
        if len > DEGENERATE_EPSILON {
            Some((origin, self.normal / len))
        } else {
            None
        }
    }

    /// Largest distance of any vertex from [`reference_plane`](Self::reference_plane).
    pub fn max_plane_deviation(&self) -> f64 {
        match self.reference_plane() {
            Some((origin, normal)) => self
                .vertices
                .iter()
                .map(|v| normal.dot(&(v - origin)).abs())
                .fold(0.0, f64::max),
            None => 0.0,
        }
    }

    /// Strict coplanarity check. Faces with fewer than four vertices are
    /// coplanar by construction.
    pub fn is_coplanar(&self, tolerance: f64) -> bool {
        self.vertices.len() < 4 || self.max_plane_deviation() <= tolerance
    }

    /// Re-derive [`FaceType`] from the current vertex count.
    #[inline]
    pub fn refresh_type(&mut self) {
        self.face_type = FaceType::from_vertex_count(self.vertices.len());
    }

    /// Re-order the vertices by angle around the centroid, in the plane of
    /// the face normal.
    pub fn order_vertices(&mut self) {
        self.vertices = order_around_centroid(&self.vertices, &self.normal);
    }
}

/// Unit normal of a triangle, or `None` if it is degenerate.
pub fn triangle_normal(corners: &[Point3<f64>; 3]) -> Option<Vector3<f64>> {
    let cross = (corners[1] - corners[0]).cross(&(corners[2] - corners[0]));
    let len = cross.norm();
    if len < DEGENERATE_EPSILON {
        None
    } else {
        Some(cross / len)
    }
}

/// Newell's method normal for an arbitrary polygon.
pub fn newell_normal(vertices: &[Point3<f64>]) -> Option<Vector3<f64>> {
    if vertices.len() < 3 {
        return None;
    }
    let mut n = Vector3::zeros();
    for (i, a) in vertices.iter().enumerate() {
        let b = &vertices[(i + 1) % vertices.len()];
        n += a.coords.cross(&b.coords);
    }
    let len = n.norm();
    if len < DEGENERATE_EPSILON {
        None
    } else {
        Some(n / len)
    }
}

/// Average position.
pub fn centroid(vertices: &[Point3<f64>]) -> Point3<f64> {
    if vertices.is_empty() {
        return Point3::origin();
    }
    let sum = vertices
        .iter()
        .fold(Vector3::zeros(), |acc, v| acc + v.coords);
    Point3::from(sum / vertices.len() as f64)
}

/// Area of a planar polygon measured along `normal`.
pub fn polygon_area(vertices: &[Point3<f64>], normal: &Vector3<f64>) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = Vector3::zeros();
    for (i, a) in vertices.iter().enumerate() {
        let b = &vertices[(i + 1) % vertices.len()];
        sum += a.coords.cross(&b.coords);
    }
    0.5 * sum.dot(normal).abs()
}

/// An orthonormal in-plane basis `(x, y)` with `y = normal × x`.
pub fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    // Cross with the axis least aligned with the normal.
    let axis = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
        Vector3::x()
    } else if normal.y.abs() <= normal.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let x = normal.cross(&axis).normalize();
    let y = normal.cross(&x);
    (x, y)
}

/// Lexicographic order on coordinates, total over NaN.
pub fn cmp_points(a: &Point3<f64>, b: &Point3<f64>) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

/// Sort positions counter-clockwise (seen from `normal`) around their
/// centroid, starting from the lexicographically smallest position.
///
/// The fixed start makes the result depend only on the cyclic order, so
/// re-ordering an ordered loop returns it unchanged.
pub fn order_around_centroid(vertices: &[Point3<f64>], normal: &Vector3<f64>) -> Vec<Point3<f64>> {
    if vertices.len() < 3 || normal.norm() < DEGENERATE_EPSILON {
        return vertices.to_vec();
    }
    let (x, y) = plane_basis(&normal.normalize());
    let c = centroid(vertices);
    let mut keyed: Vec<(f64, Point3<f64>)> = vertices
        .iter()
        .map(|v| {
            let d = v - c;
            (d.dot(&y).atan2(d.dot(&x)), *v)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut ordered: Vec<Point3<f64>> = keyed.into_iter().map(|(_, v)| v).collect();
    let start = (0..ordered.len())
        .min_by(|&i, &j| cmp_points(&ordered[i], &ordered[j]))
        .unwrap_or(0);
    ordered.rotate_left(start);
    ordered
}

/// Remove points closer than `tolerance` to an earlier point.
pub fn dedup_points(points: &[Point3<f64>], tolerance: f64) -> Vec<Point3<f64>> {
    let mut unique: Vec<Point3<f64>> = Vec::with_capacity(points.len());
    for p in points {
        if !unique.iter().any(|u| (u - p).norm() < tolerance) {
            unique.push(*p);
        }
    }
    unique
}
