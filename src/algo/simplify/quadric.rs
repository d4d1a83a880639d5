//! Quadric error metric used as an optional collapse cost.

use std::ops::{Add, AddAssign};

use nalgebra::{Matrix4, Point3, Vector4};

/// Sum of `p pᵀ` over a set of unit planes `p = (n, d)`; `vᵀ Q v` is the
/// summed squared distance of `v = (x, y, z, 1)` to those planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Quadric(Matrix4<f64>);

impl Quadric {
    pub(crate) fn zero() -> Self {
        Quadric(Matrix4::zeros())
    }

    /// Quadric of the plane `n · x + d = 0`; `n` must be unit length.
    pub(crate) fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        let p = Vector4::new(a, b, c, d);
        Quadric(p * p.transpose())
    }

    pub(crate) fn evaluate(&self, p: &Point3<f64>) -> f64 {
        let v = p.to_homogeneous();
        v.dot(&(self.0 * v))
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, other: Quadric) {
        self.0 += other.0;
    }
}

impl Add for Quadric {
    type Output = Quadric;

    fn add(mut self, other: Quadric) -> Quadric {
        self += other;
        self
    }
}

/// Accumulate the plane quadrics of every incident triangle per vertex.
///
/// Degenerate triangles contribute nothing.
pub(crate) fn vertex_quadrics(positions: &[Point3<f64>], triangles: &[[usize; 3]]) -> Vec<Quadric> {
    let mut quadrics = vec![Quadric::zero(); positions.len()];
    for tri in triangles {
        let [a, b, c] = [positions[tri[0]], positions[tri[1]], positions[tri[2]]];
        let Some(n) = (b - a).cross(&(c - a)).try_normalize(f64::EPSILON) else {
            continue;
        };
        let d = -n.dot(&a.coords);
        let q = Quadric::from_plane(n.x, n.y, n.z, d);
        for &v in tri {
            quadrics[v] += q;
        }
    }
    quadrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_quadric_measures_squared_distance() {
        // z = 0
        let q = Quadric::from_plane(0.0, 0.0, 1.0, 0.0);
        assert!(q.evaluate(&Point3::new(3.0, -2.0, 0.0)).abs() < 1e-12);
        assert!((q.evaluate(&Point3::new(0.0, 0.0, 2.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_sum_of_planes() {
        let q = Quadric::from_plane(1.0, 0.0, 0.0, 0.0) + Quadric::from_plane(0.0, 1.0, 0.0, 0.0);
        assert!((q.evaluate(&Point3::new(1.0, 1.0, 5.0)) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_vertex_quadrics_flat_patch() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let quadrics = vertex_quadrics(&positions, &[[0, 1, 2], [0, 2, 3]]);
        // Any point in the plane has zero error.
        let mid = Point3::new(0.5, 0.5, 0.0);
        assert!((quadrics[0] + quadrics[2]).evaluate(&mid).abs() < 1e-12);
        assert!(quadrics[1].evaluate(&Point3::new(0.0, 0.0, 1.0)) > 0.0);
    }
}
