//! Logical vertex identity for buffers with duplicated positions.
//!
//! Import formats such as STL store every triangle corner separately, so one
//! logical vertex may occupy many buffer slots. [`VertexWeld`] groups buffer
//! vertices that lie within a tolerance of each other using a spatial hash,
//! and answers "which buffer vertices sit near this point" queries without a
//! full scan.

use std::collections::HashMap;

use nalgebra::Point3;

type Cell = (i64, i64, i64);

/// Spatial index mapping buffer vertices to logical vertices.
#[derive(Debug, Clone)]
pub struct VertexWeld {
    tolerance: f64,
    cell_size: f64,
    cells: HashMap<Cell, Vec<usize>>,
    positions: Vec<Point3<f64>>,
    /// Buffer index -> logical index.
    logical: Vec<usize>,
    /// Logical index -> representative position (first buffer occurrence).
    representatives: Vec<Point3<f64>>,
}

impl VertexWeld {
    /// Build the index for `positions` with the given coincidence tolerance.
    pub fn build(positions: &[Point3<f64>], tolerance: f64) -> Self {
        let cell_size = (tolerance * 2.0).max(f64::MIN_POSITIVE);
        let mut cells: HashMap<Cell, Vec<usize>> = HashMap::new();
        for (idx, p) in positions.iter().enumerate() {
            cells.entry(pos_to_cell(p, cell_size)).or_default().push(idx);
        }

        let mut weld = Self {
            tolerance,
            cell_size,
            cells,
            positions: positions.to_vec(),
            logical: vec![usize::MAX; positions.len()],
            representatives: Vec::new(),
        };

        // Flood each unassigned vertex's neighbourhood so chains of
        // near-coincident points collapse onto one logical vertex.
        for start in 0..positions.len() {
            if weld.logical[start] != usize::MAX {
                continue;
            }
            let id = weld.representatives.len();
            weld.representatives.push(positions[start]);
            weld.logical[start] = id;

            let mut stack = vec![start];
            while let Some(current) = stack.pop() {
                for other in weld.near(&positions[current]) {
                    if weld.logical[other] == usize::MAX {
                        weld.logical[other] = id;
                        stack.push(other);
                    }
                }
            }
        }

        weld
    }

    /// Coincidence tolerance this index was built with.
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of distinct logical vertices.
    #[inline]
    pub fn num_logical(&self) -> usize {
        self.representatives.len()
    }

    /// Logical vertex of a buffer vertex.
    #[inline]
    pub fn logical(&self, buffer_index: usize) -> usize {
        self.logical[buffer_index]
    }

    /// Buffer-to-logical map.
    #[inline]
    pub fn logical_map(&self) -> &[usize] {
        &self.logical
    }

    /// Representative positions, indexed by logical vertex.
    #[inline]
    pub fn representatives(&self) -> &[Point3<f64>] {
        &self.representatives
    }

    /// Buffer vertices within the tolerance of `p`, in ascending order.
    pub fn near(&self, p: &Point3<f64>) -> Vec<usize> {
        let (cx, cy, cz) = pos_to_cell(p, self.cell_size);
        let mut found = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let cell = (
                        cx.saturating_add(dx),
                        cy.saturating_add(dy),
                        cz.saturating_add(dz),
                    );
                    if let Some(candidates) = self.cells.get(&cell) {
                        found.extend(
                            candidates
                                .iter()
                                .copied()
                                .filter(|&i| (self.positions[i] - p).norm() <= self.tolerance),
                        );
                    }
                }
            }
        }
        // Saturated cells at the coordinate limits can repeat.
        found.sort_unstable();
        found.dedup();
        found
    }
}

/// Convert position to spatial hash cell.
fn pos_to_cell(pos: &Point3<f64>, cell_size: f64) -> Cell {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weld_duplicates() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0004),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let weld = VertexWeld::build(&positions, 1e-3);

        assert_eq!(weld.num_logical(), 3);
        assert_eq!(weld.logical(0), weld.logical(2));
        assert_eq!(weld.logical(1), weld.logical(3));
        assert_ne!(weld.logical(0), weld.logical(4));
        assert_eq!(weld.representatives()[weld.logical(3)], positions[1]);
    }

    #[test]
    fn test_near_query() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0005, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
        ];
        let weld = VertexWeld::build(&positions, 1e-3);
        assert_eq!(weld.near(&Point3::new(0.0, 0.0, 0.0)), vec![0, 1]);
        assert!(weld.near(&Point3::new(2.0, 2.0, 2.0)).is_empty());
    }

    #[test]
    fn test_zero_tolerance_matches_exact_copies() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
        ];
        let weld = VertexWeld::build(&positions, 0.0);
        assert_eq!(weld.num_logical(), 3);
        assert_eq!(weld.near(&positions[1]), vec![1, 2]);
        assert_eq!(weld.near(&positions[3]), vec![3]);
    }

    #[test]
    fn test_empty() {
        let weld = VertexWeld::build(&[], 1e-3);
        assert_eq!(weld.num_logical(), 0);
    }
}
