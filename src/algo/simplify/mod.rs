//! Watertight bulk simplification by edge collapse.
//!
//! Simplification here never deletes a triangle: collapsed edges leave
//! zero-area triangles behind, so the triangle count (and with it any
//! per-triangle data downstream) is preserved while the vertex count drops.
//! Duplicated buffer vertices are welded before collapsing so meshes
//! imported without shared vertices stay closed.
//!
//! # Safety policy
//!
//! - Reduction requests are clamped to `[0, 1)` and capped at
//!   [`SimplifyOptions::max_reduction_per_pass`] (0.5 by default).
//! - The triangle floor `max(min_triangles, floor(T × (1 − effective)))`
//!   must not exceed the current count `T`, otherwise the call is a no-op.
//! - Backends are tried in order: the external peer (if any), an in-process
//!   pass at the effective fraction, a conservative pass at a fraction of
//!   that, and finally the input unchanged. A backend result with fewer than
//!   [`MIN_RECOGNIZABLE_VERTICES`] vertices, a non-finite position, or no
//!   non-degenerate triangle is discarded.
//!
//! None of these conditions is an error. Only an empty input or unusable
//! tolerances in [`SimplifyOptions::merge`] fail.
//!
//! # Example
//!
//! ```
//! use tessera::algo::simplify::{simplify, SimplifyOptions, SimplifyStrategy};
//! use tessera::solids::SolidCache;
//!
//! let cache = SolidCache::new();
//! let cube = cache.get("cube").unwrap();
//!
//! let result = simplify(&cube, &SimplifyOptions::with_target(0.5)).unwrap();
//! assert_eq!(result.strategy, SimplifyStrategy::InProcess);
//! assert_eq!(result.mesh.num_triangles(), cube.num_triangles());
//! assert!(result.new_stats.unique_vertices < result.original_stats.unique_vertices);
//! ```

mod collapse;
mod external;
mod quadric;

use std::fmt;

use log::{debug, info, warn};

use crate::error::{MeshError, Result};
use crate::mesh::{MeshBuffer, MeshStats};

use super::merge::MergeOptions;
use super::progress::Progress;
use super::reconstruct::reconstruct_overlay;

pub use collapse::CollapseCost;
pub use external::{
    ExternalSimplification, ExternalSimplifier, ServiceStats, HEADER_FINAL_TRIANGLES,
    HEADER_FINAL_VERTICES, HEADER_FORMAT, HEADER_ORIGINAL_TRIANGLES, HEADER_ORIGINAL_VERTICES,
    HEADER_REDUCTION_ACHIEVED,
};

/// Triangle floor below which simplification never goes.
pub const ABSOLUTE_MINIMUM_TRIANGLES: usize = 12;

/// Fewest vertices a simplified mesh may keep.
pub const MIN_RECOGNIZABLE_VERTICES: usize = 4;

/// Default cap on the fraction removed in one call.
pub const MAX_REDUCTION_PER_PASS: f64 = 0.5;

/// Default fraction of the effective target used by the conservative pass.
pub const CONSERVATIVE_FACTOR: f64 = 0.5;

/// Options for bulk simplification.
#[derive(Debug, Clone)]
pub struct SimplifyOptions {
    /// Requested fraction of logical vertices to remove.
    pub target_reduction: f64,

    /// Triangle floor.
    pub min_triangles: usize,

    /// Cap applied to `target_reduction`.
    pub max_reduction_per_pass: f64,

    /// Fraction of the effective target used by the conservative fallback.
    pub conservative_factor: f64,

    /// Collapse ordering.
    pub cost: CollapseCost,

    /// Options for the overlay refresh (its distance tolerance is also the
    /// weld tolerance).
    pub merge: MergeOptions,

    /// Rebuild the polygon overlay of the result (default: true).
    pub refresh_overlay: bool,

    /// Progress reporting and cancellation.
    pub progress: Progress,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            target_reduction: 0.5,
            min_triangles: ABSOLUTE_MINIMUM_TRIANGLES,
            max_reduction_per_pass: MAX_REDUCTION_PER_PASS,
            conservative_factor: CONSERVATIVE_FACTOR,
            cost: CollapseCost::default(),
            merge: MergeOptions::default(),
            refresh_overlay: true,
            progress: Progress::none(),
        }
    }
}

impl SimplifyOptions {
    /// Create options with a reduction target.
    pub fn with_target(target_reduction: f64) -> Self {
        Self {
            target_reduction,
            ..Self::default()
        }
    }

    /// Set the triangle floor.
    pub fn with_min_triangles(mut self, min_triangles: usize) -> Self {
        self.min_triangles = min_triangles;
        self
    }

    /// Set the per-call reduction cap.
    pub fn with_max_reduction_per_pass(mut self, cap: f64) -> Self {
        self.max_reduction_per_pass = cap;
        self
    }

    /// Set the collapse ordering.
    pub fn with_cost(mut self, cost: CollapseCost) -> Self {
        self.cost = cost;
        self
    }

    /// Set the merge options used for the overlay refresh.
    pub fn with_merge(mut self, merge: MergeOptions) -> Self {
        self.merge = merge;
        self
    }

    /// Set whether the overlay is rebuilt.
    pub fn with_refresh_overlay(mut self, refresh: bool) -> Self {
        self.refresh_overlay = refresh;
        self
    }

    /// Attach a progress reporter.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }
}

/// Which backend produced a [`SimplifiedResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimplifyStrategy {
    /// The external peer.
    External,
    /// In-process collapse at the effective target.
    InProcess,
    /// In-process collapse at the reduced, conservative target.
    Conservative,
    /// Every backend failed (or the run was cancelled); the input is
    /// returned.
    Unchanged,
    /// The triangle floor left nothing to do.
    NoOp,
}

impl fmt::Display for SimplifyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SimplifyStrategy::External => "external",
            SimplifyStrategy::InProcess => "in-process",
            SimplifyStrategy::Conservative => "conservative",
            SimplifyStrategy::Unchanged => "unchanged",
            SimplifyStrategy::NoOp => "no-op",
        };
        f.write_str(name)
    }
}

/// Outcome of [`simplify`].
#[derive(Debug, Clone)]
pub struct SimplifiedResult {
    /// The simplified mesh, overlay attached when refresh succeeded.
    pub mesh: MeshBuffer,
    /// Statistics of the input.
    pub original_stats: MeshStats,
    /// Statistics of the output.
    pub new_stats: MeshStats,
    /// `1 − final / original` logical vertex count.
    pub reduction_achieved: f64,
    /// The request after clamping to `[0, 1)`.
    pub requested_reduction: f64,
    /// The request after the per-pass cap.
    pub effective_reduction: f64,
    /// Which backend produced `mesh`.
    pub strategy: SimplifyStrategy,
}

/// Simplify in-process.
///
/// Returns [`MeshError::EmptyGeometry`] for a mesh without vertices or
/// triangles and [`MeshError::InvalidParameter`] for unusable tolerances;
/// every other condition produces a valid result.
pub fn simplify(mesh: &MeshBuffer, options: &SimplifyOptions) -> Result<SimplifiedResult> {
    simplify_with(mesh, options, None)
}

/// Simplify, trying `external` before the in-process backends.
pub fn simplify_with(
    mesh: &MeshBuffer,
    options: &SimplifyOptions,
    external: Option<&dyn ExternalSimplifier>,
) -> Result<SimplifiedResult> {
    if mesh.is_empty() {
        return Err(MeshError::EmptyGeometry);
    }
    options.merge.tolerances.validate()?;

    let requested = clamp_target(options.target_reduction);
    let effective = requested.min(options.max_reduction_per_pass.max(0.0));
    let original_stats = mesh.stats();
    let triangles = mesh.num_triangles();
    let floor = safe_target(triangles, effective, options.min_triangles);

    info!(
        "simplifying {} vertices / {} triangles: requested {:.3}, effective {:.3}",
        original_stats.unique_vertices, triangles, requested, effective
    );

    let finish = |out: MeshBuffer, strategy: SimplifyStrategy| {
        let out = finalize(out, options);
        let new_stats = out.stats();
        let reduction_achieved = reduction(&original_stats, &new_stats);
        info!(
            "simplification finished ({}): {} -> {} vertices, reduction {:.3}",
            strategy, original_stats.unique_vertices, new_stats.unique_vertices, reduction_achieved
        );
        SimplifiedResult {
            mesh: out,
            original_stats,
            new_stats,
            reduction_achieved,
            requested_reduction: requested,
            effective_reduction: effective,
            strategy,
        }
    };

    if floor > triangles || effective <= 0.0 {
        debug!(
            "triangle floor {} exceeds {} triangles or nothing requested; skipping",
            floor, triangles
        );
        return Ok(finish(mesh.clone(), SimplifyStrategy::NoOp));
    }

    if let Some(peer) = external {
        let target = ServiceStats::request_target(effective);
        match peer.simplify(mesh, target) {
            Ok(result) if is_valid(&result.mesh, Some(options.min_triangles)) => {
                if let Some(stats) = &result.stats {
                    debug!(
                        "{} reported {} -> {} triangles",
                        peer.name(),
                        stats.original_triangles,
                        stats.final_triangles
                    );
                }
                return Ok(finish(result.mesh, SimplifyStrategy::External));
            }
            Ok(_) => warn!("{} returned an unusable mesh; falling back", peer.name()),
            Err(err) => warn!("{} failed: {}; falling back", peer.name(), err),
        }
    }

    let passes = [
        (effective, SimplifyStrategy::InProcess),
        (
            effective * options.conservative_factor.clamp(0.0, 1.0),
            SimplifyStrategy::Conservative,
        ),
    ];
    for (fraction, strategy) in passes {
        if fraction <= 0.0 {
            continue;
        }
        match collapse::collapse_edges(
            mesh,
            fraction,
            options.cost,
            options.merge.tolerances.distance,
            &options.progress,
        ) {
            Ok(out) if is_valid(&out, None) => return Ok(finish(out, strategy)),
            Ok(out) => warn!(
                "{} pass at {:.3} left {} vertices; discarding",
                strategy,
                fraction,
                out.num_vertices()
            ),
            Err(err @ MeshError::Cancelled { .. }) => {
                warn!("simplification cancelled: {}", err);
                break;
            }
            Err(err) => warn!("{} pass at {:.3} failed: {}", strategy, fraction, err),
        }
    }

    Ok(finish(mesh.clone(), SimplifyStrategy::Unchanged))
}

/// Clamp a request into `[0, 1)`, logging out-of-range values.
fn clamp_target(requested: f64) -> f64 {
    if (0.0..1.0).contains(&requested) {
        return requested;
    }
    let err = MeshError::InvalidReductionTarget { requested };
    let clamped = if requested >= 1.0 {
        1.0 - f64::EPSILON
    } else {
        0.0
    };
    warn!("{}; clamped to {:.3}", err, clamped);
    clamped
}

/// `max(min_triangles, floor(T × (1 − effective)))`.
fn safe_target(triangles: usize, effective: f64, min_triangles: usize) -> usize {
    let kept = (triangles as f64 * (1.0 - effective)).floor() as usize;
    kept.max(min_triangles)
}

fn reduction(original: &MeshStats, new: &MeshStats) -> f64 {
    if original.unique_vertices == 0 {
        return 0.0;
    }
    1.0 - new.unique_vertices as f64 / original.unique_vertices as f64
}

/// Whether a backend result is usable. `min_triangles` applies to results
/// that may have deleted triangles.
fn is_valid(mesh: &MeshBuffer, min_triangles: Option<usize>) -> bool {
    mesh.num_vertices() >= MIN_RECOGNIZABLE_VERTICES
        && mesh.is_finite()
        && mesh.num_non_degenerate() > 0
        && min_triangles.is_none_or(|floor| mesh.num_triangles() >= floor)
}

/// Recompute normals and refresh the overlay.
fn finalize(mut mesh: MeshBuffer, options: &SimplifyOptions) -> MeshBuffer {
    mesh.recompute_flat_normals();
    if options.refresh_overlay {
        if let Err(err) = reconstruct_overlay(&mut mesh, &options.merge) {
            warn!("overlay refresh failed: {}", err);
            mesh.clear_overlay();
        }
    } else {
        mesh.clear_overlay();
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::progress::CancelToken;
    use nalgebra::Point3;

    /// Flat `n`×`n` grid of unit squares, two triangles each.
    fn grid(n: usize) -> MeshBuffer {
        let mut positions = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                positions.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }
        let w = n + 1;
        let mut triangles = Vec::new();
        for j in 0..n {
            for i in 0..n {
                let a = j * w + i;
                triangles.push([a, a + 1, a + w + 1]);
                triangles.push([a, a + w + 1, a + w]);
            }
        }
        MeshBuffer::from_parts(positions, triangles).unwrap()
    }

    struct FailingPeer;

    impl ExternalSimplifier for FailingPeer {
        fn simplify(&self, _: &MeshBuffer, _: f64) -> Result<ExternalSimplification> {
            Err(MeshError::ExternalServiceUnavailable("connection refused".into()))
        }
    }

    struct EchoPeer;

    impl ExternalSimplifier for EchoPeer {
        fn name(&self) -> &str {
            "echo"
        }

        fn simplify(&self, mesh: &MeshBuffer, target: f64) -> Result<ExternalSimplification> {
            assert!(target <= ServiceStats::MAX_TARGET_REDUCTION);
            Ok(ExternalSimplification {
                mesh: mesh.clone(),
                stats: Some(ServiceStats::from_meshes(mesh, mesh, "obj")),
            })
        }
    }

    #[test]
    fn test_empty_mesh_is_an_error() {
        assert!(matches!(
            simplify(&MeshBuffer::new(), &SimplifyOptions::default()),
            Err(MeshError::EmptyGeometry)
        ));
    }

    #[test]
    fn test_target_is_clamped_and_capped() {
        let mesh = grid(4);
        let result = simplify(&mesh, &SimplifyOptions::with_target(3.0)).unwrap();
        assert!(result.requested_reduction < 1.0);
        assert_eq!(result.effective_reduction, MAX_REDUCTION_PER_PASS);

        let result = simplify(&mesh, &SimplifyOptions::with_target(-0.2)).unwrap();
        assert_eq!(result.requested_reduction, 0.0);
        assert_eq!(result.strategy, SimplifyStrategy::NoOp);
    }

    #[test]
    fn test_triangle_count_preserved() {
        let mesh = grid(4);
        let result = simplify(&mesh, &SimplifyOptions::with_target(0.3)).unwrap();
        assert_eq!(result.strategy, SimplifyStrategy::InProcess);
        assert_eq!(result.mesh.num_triangles(), mesh.num_triangles());
        assert!(result.reduction_achieved > 0.0);
        assert!(result.reduction_achieved <= 0.5);
    }

    #[test]
    fn test_floor_above_count_is_noop() {
        // 8 triangles < floor of 12.
        let mesh = grid(2);
        let result = simplify(&mesh, &SimplifyOptions::with_target(0.5)).unwrap();
        assert_eq!(result.strategy, SimplifyStrategy::NoOp);
        assert_eq!(result.reduction_achieved, 0.0);
        assert_eq!(result.mesh.positions(), mesh.positions());
        assert!(result.mesh.overlay().is_some());
    }

    #[test]
    fn test_failing_peer_falls_back() {
        let mesh = grid(4);
        let result =
            simplify_with(&mesh, &SimplifyOptions::with_target(0.3), Some(&FailingPeer)).unwrap();
        assert_eq!(result.strategy, SimplifyStrategy::InProcess);
    }

    #[test]
    fn test_valid_peer_result_is_used() {
        let mesh = grid(4);
        let result =
            simplify_with(&mesh, &SimplifyOptions::with_target(0.9), Some(&EchoPeer)).unwrap();
        assert_eq!(result.strategy, SimplifyStrategy::External);
        assert_eq!(result.reduction_achieved, 0.0);
    }

    #[test]
    fn test_cancelled_run_returns_input() {
        let token = CancelToken::new();
        token.cancel();
        let options =
            SimplifyOptions::with_target(0.4).with_progress(Progress::none().with_cancel(token));
        let mesh = grid(4);
        let result = simplify(&mesh, &options).unwrap();
        assert_eq!(result.strategy, SimplifyStrategy::Unchanged);
        assert_eq!(result.mesh.positions(), mesh.positions());
        assert_eq!(result.reduction_achieved, 0.0);
    }

    #[test]
    fn test_overlay_refresh_can_be_disabled() {
        let mesh = grid(4);
        let options = SimplifyOptions::with_target(0.3).with_refresh_overlay(false);
        let result = simplify(&mesh, &options).unwrap();
        assert!(result.mesh.overlay().is_none());
    }

    #[test]
    fn test_unusable_tolerance_rejected() {
        let tolerances = crate::tolerance::Tolerances::default().with_distance(0.0);
        let options = SimplifyOptions::with_target(0.5)
            .with_merge(MergeOptions::default().with_tolerances(tolerances));
        assert!(matches!(
            simplify(&grid(4), &options),
            Err(MeshError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_safe_target() {
        assert_eq!(safe_target(12, 0.5, 12), 12);
        assert_eq!(safe_target(100, 0.5, 12), 50);
        assert_eq!(safe_target(8, 0.5, 12), 12);
    }
}
