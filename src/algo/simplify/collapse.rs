//! One greedy pass of shortest-edge collapses over a welded mesh.

use std::collections::HashSet;

use log::debug;
use nalgebra::Point3;

use crate::algo::progress::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

use super::quadric::vertex_quadrics;

/// Sort key for collapse candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollapseCost {
    /// Euclidean edge length.
    #[default]
    EdgeLength,
    /// Quadric error of the edge midpoint against the planes around both
    /// endpoints.
    Quadric,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    cost: f64,
    a: usize,
    b: usize,
}

/// Collapse edges until `round(V × fraction)` logical vertices are removed
/// or no collapsible edge remains.
///
/// Buffer vertices are first welded at `weld_tolerance` so duplicated corners
/// move together. Each collapse moves the lower-indexed endpoint to the edge
/// midpoint and redirects the other endpoint onto it; an endpoint touched by
/// one collapse is not used again in the same pass. Triangles are remapped
/// (never deleted) and unreferenced vertices compacted away.
///
/// Returns [`MeshError::Cancelled`] if `progress` is cancelled between
/// collapses.
pub(crate) fn collapse_edges(
    mesh: &MeshBuffer,
    fraction: f64,
    cost: CollapseCost,
    weld_tolerance: f64,
    progress: &Progress,
) -> Result<MeshBuffer> {
    let weld = mesh.weld(weld_tolerance);
    let map = weld.logical_map();
    let mut positions = weld.representatives().to_vec();
    let triangles: Vec<[usize; 3]> = mesh
        .triangles()
        .iter()
        .map(|t| [map[t[0]], map[t[1]], map[t[2]]])
        .collect();

    let to_remove = (positions.len() as f64 * fraction).round() as usize;
    let candidates = sorted_edges(&positions, &triangles, cost);

    let mut touched = vec![false; positions.len()];
    let mut remap: Vec<usize> = (0..positions.len()).collect();
    let mut removed = 0usize;

    for edge in &candidates {
        if removed >= to_remove {
            break;
        }
        if progress.is_cancelled() {
            return Err(MeshError::Cancelled { completed: removed });
        }
        if touched[edge.a] || touched[edge.b] {
            continue;
        }
        positions[edge.a] = midpoint(&positions[edge.a], &positions[edge.b]);
        remap[edge.b] = edge.a;
        touched[edge.a] = true;
        touched[edge.b] = true;
        removed += 1;
        if removed % 256 == 0 {
            progress.report(removed, to_remove, "Collapsing edges");
        }
    }
    progress.report(removed, to_remove, "Collapsing edges");

    let triangles: Vec<[usize; 3]> = triangles
        .iter()
        .map(|t| [remap[t[0]], remap[t[1]], remap[t[2]]])
        .collect();

    let mut out = MeshBuffer::from_parts(positions, triangles)?;
    out.compact();
    debug!(
        "collapsed {} of {} requested edges ({} candidates)",
        removed,
        to_remove,
        candidates.len()
    );
    Ok(out)
}

fn midpoint(a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    Point3::from((a.coords + b.coords) * 0.5)
}

/// Unique undirected edges, cheapest first, ties broken by index pair.
fn sorted_edges(
    positions: &[Point3<f64>],
    triangles: &[[usize; 3]],
    cost: CollapseCost,
) -> Vec<Candidate> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut edges: Vec<(usize, usize)> = Vec::new();
    for tri in triangles {
        for k in 0..3 {
            let (u, v) = (tri[k], tri[(k + 1) % 3]);
            if u == v {
                continue;
            }
            let key = (u.min(v), u.max(v));
            if seen.insert(key) {
                edges.push(key);
            }
        }
    }

    let quadrics = match cost {
        CollapseCost::Quadric => Some(vertex_quadrics(positions, triangles)),
        CollapseCost::EdgeLength => None,
    };

    let mut candidates: Vec<Candidate> = edges
        .into_iter()
        .map(|(a, b)| {
            let cost = match &quadrics {
                Some(q) => (q[a] + q[b]).evaluate(&midpoint(&positions[a], &positions[b])),
                None => (positions[a] - positions[b]).norm(),
            };
            Candidate { cost, a, b }
        })
        .collect();
    candidates.sort_by(|x, y| {
        x.cost
            .total_cmp(&y.cost)
            .then(x.a.cmp(&y.a))
            .then(x.b.cmp(&y.b))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::progress::CancelToken;

    /// Unit square split into four triangles around a centre vertex.
    fn fan() -> MeshBuffer {
        MeshBuffer::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.5, 0.5, 0.0),
            ],
            vec![[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]],
        )
        .unwrap()
    }

    #[test]
    fn test_shortest_edge_collapses_first() {
        let out = collapse_edges(&fan(), 0.2, CollapseCost::EdgeLength, 1e-3, &Progress::none())
            .unwrap();
        assert_eq!(out.num_vertices(), 4);
        assert_eq!(out.num_triangles(), 4);
        // Spokes are shortest; the lowest pair (0, 4) goes first.
        assert!(out
            .positions()
            .iter()
            .any(|p| (p - Point3::new(0.25, 0.25, 0.0)).norm() < 1e-12));
    }

    #[test]
    fn test_touched_vertices_are_skipped() {
        // Every edge touches the centre or a corner; at most two disjoint
        // collapses fit in one pass.
        let out =
            collapse_edges(&fan(), 1.0, CollapseCost::EdgeLength, 1e-3, &Progress::none()).unwrap();
        assert!(out.num_vertices() >= 3);
        assert_eq!(out.num_triangles(), 4);
    }

    #[test]
    fn test_duplicated_corners_are_welded() {
        let mut positions = Vec::new();
        let mut triangles = Vec::new();
        let base = fan();
        for t in base.triangles() {
            let start = positions.len();
            for &v in t {
                positions.push(base.positions()[v]);
            }
            triangles.push([start, start + 1, start + 2]);
        }
        let soup = MeshBuffer::from_parts(positions, triangles).unwrap();
        let out =
            collapse_edges(&soup, 0.2, CollapseCost::EdgeLength, 1e-3, &Progress::none()).unwrap();
        assert_eq!(out.num_vertices(), 4);
    }

    #[test]
    fn test_quadric_cost_keeps_plane() {
        let out =
            collapse_edges(&fan(), 0.2, CollapseCost::Quadric, 1e-3, &Progress::none()).unwrap();
        assert_eq!(out.num_vertices(), 4);
        assert!(out.positions().iter().all(|p| p.z.abs() < 1e-12));
    }

    #[test]
    fn test_cancelled_before_first_collapse() {
        let token = CancelToken::new();
        token.cancel();
        let progress = Progress::none().with_cancel(token);
        assert!(matches!(
            collapse_edges(&fan(), 0.2, CollapseCost::EdgeLength, 1e-3, &progress),
            Err(MeshError::Cancelled { completed: 0 })
        ));
    }
}
