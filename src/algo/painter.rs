//! Interactive single-edge collapse.
//!
//! A user picks two vertices and a target position; every buffer vertex
//! that sits on either endpoint moves to the target. Meshes imported
//! without shared vertices store one copy of a corner per triangle, so the
//! endpoints are matched by position rather than by index.
//!
//! When the mesh carries a fresh polygon overlay, the overlay is patched in
//! place and re-validated; otherwise only the buffer is edited. Neither mode
//! deletes triangles or faces.
//!
//! # Example
//!
//! ```
//! use tessera::algo::merge::MergeOptions;
//! use tessera::algo::painter::{collapse_edge, CollapseMode, PainterOptions};
//! use tessera::algo::reconstruct::reconstruct_overlay;
//! use tessera::solids::SolidCache;
//!
//! let mut mesh = SolidCache::new().get("cube").unwrap();
//! reconstruct_overlay(&mut mesh, &MergeOptions::default()).unwrap();
//!
//! let target = mesh.positions()[0];
//! let result = collapse_edge(&mesh, 0, 1, target, &PainterOptions::default()).unwrap();
//! assert_eq!(result.mode, CollapseMode::Overlay);
//! assert_eq!(result.mesh.num_triangles(), mesh.num_triangles());
//! ```

use std::fmt;

use log::{debug, info};
use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::mesh::{newell_normal, MeshBuffer, PolygonFace};
use crate::tolerance::Tolerances;

use super::merge::{order_faces, validate_and_repair};

/// Options for interactive collapses.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PainterOptions {
    /// Tolerances for matching endpoint copies and for overlay repair.
    pub tolerances: Tolerances,
}

impl PainterOptions {
    /// Set the tolerances.
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }
}

/// How a collapse was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseMode {
    /// The overlay was patched and re-validated.
    Overlay,
    /// No fresh overlay was present; only buffer vertices moved.
    Basic,
}

impl fmt::Display for CollapseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollapseMode::Overlay => "overlay",
            CollapseMode::Basic => "basic",
        })
    }
}

/// Outcome of [`collapse_edge`].
#[derive(Debug, Clone)]
pub struct EdgeCollapseResult {
    /// The edited mesh.
    pub mesh: MeshBuffer,
    /// Human-readable summary.
    pub message: String,
    /// Buffer vertices moved to the target.
    pub moved_vertices: usize,
    /// Overlay faces that contained an endpoint.
    pub updated_faces: usize,
    /// Which mode ran.
    pub mode: CollapseMode,
}

/// Collapse the edge `(v1, v2)` onto `target`.
///
/// # Errors
///
/// - [`MeshError::EmptyGeometry`] if the mesh has no vertices or triangles.
/// - [`MeshError::InvalidVertexIndex`] if `v1` or `v2` is out of range
///   (`triangle` holds the argument slot, 0 or 1).
/// - [`MeshError::InvalidParameter`] if `v1 == v2`, `target` is not finite,
///   or the tolerances are unusable.
pub fn collapse_edge(
    mesh: &MeshBuffer,
    v1: usize,
    v2: usize,
    target: Point3<f64>,
    options: &PainterOptions,
) -> Result<EdgeCollapseResult> {
    if mesh.is_empty() {
        return Err(MeshError::EmptyGeometry);
    }
    let p1 = *mesh
        .position(v1)
        .ok_or(MeshError::InvalidVertexIndex { triangle: 0, vertex: v1 })?;
    let p2 = *mesh
        .position(v2)
        .ok_or(MeshError::InvalidVertexIndex { triangle: 1, vertex: v2 })?;
    if v1 == v2 {
        return Err(MeshError::invalid_param("v2", v2, "must differ from v1"));
    }
    if !(target.x.is_finite() && target.y.is_finite() && target.z.is_finite()) {
        return Err(MeshError::invalid_param(
            "target",
            format!("{:?}", target),
            "must be finite",
        ));
    }
    options.tolerances.validate()?;

    let tol = options.tolerances.distance;
    let overlay = mesh.overlay().map(<[PolygonFace]>::to_vec);

    let weld = mesh.weld(tol);
    let mut moving = weld.near(&p1);
    moving.extend(weld.near(&p2));
    moving.sort_unstable();
    moving.dedup();

    let mut out = mesh.clone();
    out.move_vertices(&moving, target);

    let (mode, updated_faces) = match overlay {
        Some(faces) => {
            let (faces, updated) = patch_overlay(faces, &p1, &p2, &target, &options.tolerances);
            out.recompute_flat_normals();
            out.apply_overlay(faces)?;
            (CollapseMode::Overlay, updated)
        }
        None => {
            out.recompute_flat_normals();
            out.clear_overlay();
            (CollapseMode::Basic, 0)
        }
    };

    let message = format!(
        "Collapsed edge {}-{}: moved {} vertices, updated {} faces ({} mode)",
        v1,
        v2,
        moving.len(),
        updated_faces,
        mode
    );
    info!("{}", message);

    Ok(EdgeCollapseResult {
        mesh: out,
        message,
        moved_vertices: moving.len(),
        updated_faces,
        mode,
    })
}

/// Replace both endpoints by `target` in every face, then re-validate.
fn patch_overlay(
    faces: Vec<PolygonFace>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
    target: &Point3<f64>,
    tol: &Tolerances,
) -> (Vec<PolygonFace>, usize) {
    let is_endpoint =
        |v: &Point3<f64>| (v - p1).norm() <= tol.distance || (v - p2).norm() <= tol.distance;
    let mut updated = 0usize;

    let faces: Vec<PolygonFace> = faces
        .into_iter()
        .map(|mut face| {
            if !face.vertices.iter().any(is_endpoint) {
                return face;
            }
            updated += 1;

            let mut replaced = false;
            let mut vertices = Vec::with_capacity(face.vertices.len());
            for v in &face.vertices {
                if is_endpoint(v) {
                    if !replaced {
                        vertices.push(*target);
                        replaced = true;
                    }
                } else {
                    vertices.push(*v);
                }
            }
            face.vertices = strip_consecutive_duplicates(vertices, tol.distance);
            face.refresh_type();
            if let Some(normal) = newell_normal(&face.vertices) {
                face.normal = normal;
            }
            face
        })
        .collect();

    debug!("patched {} overlay faces", updated);
    let mut faces = validate_and_repair(faces, tol);
    order_faces(&mut faces);
    (faces, updated)
}

/// Drop vertices equal to their predecessor, including last-to-first.
fn strip_consecutive_duplicates(vertices: Vec<Point3<f64>>, tolerance: f64) -> Vec<Point3<f64>> {
    let mut out: Vec<Point3<f64>> = Vec::with_capacity(vertices.len());
    for v in vertices {
        if out.last().is_none_or(|last| (last - v).norm() > tolerance) {
            out.push(v);
        }
    }
    while out.len() > 1 {
        let (first, last) = (out[0], out[out.len() - 1]);
        if (first - last).norm() > tolerance {
            break;
        }
        out.pop();
    }
    out
}
