//! Coplanar face merging.
//!
//! Greedily merges adjacent faces that lie in the same plane into larger
//! polygons, then repairs any polygon that drifted out of plane and puts
//! every vertex loop into counter-clockwise order.
//!
//! # Algorithm
//!
//! 1. Input faces are ordered and repaired, so that every face entering
//!    the scan is already in its final form.
//! 2. Faces are grouped by quantized normal direction. Two faces in
//!    different groups can never pass the normal test, so groups are merged
//!    independently (and in parallel when enabled).
//! 3. Within a group, each face is compared with every later face, in both
//!    orders. A successful merge replaces the pair and the scan for that
//!    face starts over. One sweep over the group is a *pass*; passes repeat
//!    until one makes no merge or `max_merge_iterations` passes have run.
//!    A merge whose result is not planar is rejected.
//! 4. [`validate_and_repair`] fan-triangulates non-planar results.
//! 5. [`order_faces`] restores counter-clockwise vertex order.
//!
//! The output is sorted by source triangles, then by vertex positions, so it
//! is independent of grouping and of thread scheduling.
//!
//! # Example
//!
//! ```
//! use tessera::algo::merge::{merge_coplanar, MergeOptions};
//! use tessera::mesh::PolygonFace;
//! use nalgebra::Point3;
//!
//! let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
//! let faces = vec![
//!     PolygonFace::from_triangle(0, [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)]).unwrap(),
//!     PolygonFace::from_triangle(1, [p(0.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)]).unwrap(),
//! ];
//!
//! let merged = merge_coplanar(faces, &MergeOptions::default());
//! assert_eq!(merged.len(), 1);
//! assert_eq!(merged[0].num_vertices(), 4);
//! ```

mod candidate;
mod repair;

use std::cmp::Ordering;
use std::collections::HashMap;

use log::{debug, warn};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::mesh::{cmp_points, PolygonFace};
use crate::tolerance::Tolerances;

pub use candidate::{can_merge, try_merge};
pub use repair::{order_faces, validate_and_repair};

/// Options for coplanar merging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeOptions {
    /// Geometric tolerances.
    pub tolerances: Tolerances,

    /// Group faces by normal direction before merging (default: true).
    pub bucket_by_normal: bool,

    /// Merge normal groups in parallel (default: true).
    pub parallel: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            tolerances: Tolerances::default(),
            bucket_by_normal: true,
            parallel: true,
        }
    }
}

impl MergeOptions {
    /// Set the tolerances.
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Set whether faces are grouped by normal before merging.
    pub fn with_bucket_by_normal(mut self, bucket: bool) -> Self {
        self.bucket_by_normal = bucket;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Merge coplanar faces into polygons.
///
/// Every output face is planar within `tolerances.distance`, has its
/// vertices in counter-clockwise order, and covers the source triangles of
/// the faces it replaced. Running the merger on its own output returns the
/// same faces, provided the first run converged within the pass bound.
///
/// Unusable tolerances are replaced by their defaults.
pub fn merge_coplanar(mut faces: Vec<PolygonFace>, options: &MergeOptions) -> Vec<PolygonFace> {
    let tol = &options.tolerances.sanitized();
    if *tol != options.tolerances {
        warn!("unusable merge tolerances replaced by defaults: {:?}", tol);
    }
    let input = faces.len();

    order_faces(&mut faces);
    let mut faces = validate_and_repair(faces, tol);
    order_faces(&mut faces);

    let groups = if options.bucket_by_normal {
        group_by_normal(faces, tol.normal)
    } else {
        vec![faces]
    };
    let num_groups = groups.len();

    let merged: Vec<Vec<PolygonFace>> = if options.parallel && num_groups > 1 {
        groups
            .into_par_iter()
            .map(|group| merge_group(group, tol))
            .collect()
    } else {
        groups
            .into_iter()
            .map(|group| merge_group(group, tol))
            .collect()
    };

    let mut out = validate_and_repair(merged.into_iter().flatten().collect(), tol);
    order_faces(&mut out);
    out.sort_by(canonical_order);

    debug!(
        "merged {} faces into {} polygons ({} normal groups)",
        input,
        out.len(),
        num_groups
    );
    out
}

/// Faces by source triangles, then by vertex positions. Fan pieces share
/// their sources, so the positions break the tie.
fn canonical_order(a: &PolygonFace, b: &PolygonFace) -> Ordering {
    a.source_triangles.cmp(&b.source_triangles).then_with(|| {
        a.vertices
            .iter()
            .zip(&b.vertices)
            .map(|(p, q)| cmp_points(p, q))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| a.vertices.len().cmp(&b.vertices.len()))
    })
}

/// Run merge passes over one group until a pass makes no merge.
fn merge_group(mut faces: Vec<PolygonFace>, tol: &Tolerances) -> Vec<PolygonFace> {
    for _pass in 0..tol.max_merge_iterations {
        let mut merged_any = false;
        let mut i = 0;
        while i < faces.len() {
            let mut j = i + 1;
            while j < faces.len() {
                if let Some(merged) = candidate::merge_if_possible(&faces[i], &faces[j], tol) {
                    faces[i] = merged;
                    faces.remove(j);
                    merged_any = true;
                    j = i + 1;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        if !merged_any {
            break;
        }
    }
    faces
}

type Cell = (i64, i64, i64);

/// Split faces into connected components of nearby normal directions.
///
/// Normals are quantized into cells whose size is the chord length between
/// two unit normals at the tolerance angle. Two faces whose normals satisfy
/// `|n1 · n2| >= normal_tol` have `n2` within one chord of `n1` or `-n1`, so
/// they land in neighbouring cells and end up in the same component.
/// Faces with a zero normal form singleton groups. Groups (and the faces in
/// each) keep input order.
fn group_by_normal(faces: Vec<PolygonFace>, normal_tol: f64) -> Vec<Vec<PolygonFace>> {
    if faces.len() < 2 {
        return vec![faces];
    }
    let cell_size = (2.0 - 2.0 * normal_tol.min(1.0)).sqrt().max(1e-6);
    let to_cell = |n: &Vector3<f64>| -> Cell {
        (
            (n.x / cell_size).floor() as i64,
            (n.y / cell_size).floor() as i64,
            (n.z / cell_size).floor() as i64,
        )
    };

    let units: Vec<Option<Vector3<f64>>> = faces
        .iter()
        .map(|f| f.normal.try_normalize(1e-12))
        .collect();

    let mut cells: HashMap<Cell, Vec<usize>> = HashMap::new();
    for (i, n) in units.iter().enumerate() {
        if let Some(n) = n {
            cells.entry(to_cell(n)).or_default().push(i);
        }
    }

    let mut sets = DisjointSets::new(faces.len());
    for (i, n) in units.iter().enumerate() {
        let Some(n) = n else { continue };
        for direction in [*n, -*n] {
            let (cx, cy, cz) = to_cell(&direction);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let cell = (
                            cx.saturating_add(dx),
                            cy.saturating_add(dy),
                            cz.saturating_add(dz),
                        );
                        if let Some(members) = cells.get(&cell) {
                            for &j in members {
                                sets.union(i, j);
                            }
                        }
                    }
                }
            }
        }
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<Vec<PolygonFace>> = Vec::new();
    for (i, face) in faces.into_iter().enumerate() {
        let root = sets.find(i);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(face);
    }
    groups
}

/// Union-find over face indices.
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Smaller root wins so group order follows input order.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}
