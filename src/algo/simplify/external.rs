//! Contract for an out-of-process simplification peer.
//!
//! The peer runs quadric decimation on a mesh file and answers with the
//! decimated mesh plus statistics headers. This crate ships no client; it
//! defines the [`ExternalSimplifier`] seam the simplifier calls first, and
//! the header format in [`ServiceStats`].

use crate::error::{MeshError, Result};
use crate::mesh::MeshBuffer;

/// Header carrying the input vertex count.
pub const HEADER_ORIGINAL_VERTICES: &str = "X-Original-Vertices";
/// Header carrying the output vertex count.
pub const HEADER_FINAL_VERTICES: &str = "X-Final-Vertices";
/// Header carrying the input triangle count.
pub const HEADER_ORIGINAL_TRIANGLES: &str = "X-Original-Triangles";
/// Header carrying the output triangle count.
pub const HEADER_FINAL_TRIANGLES: &str = "X-Final-Triangles";
/// Header carrying the achieved vertex reduction, three decimals.
pub const HEADER_REDUCTION_ACHIEVED: &str = "X-Reduction-Achieved";
/// Header carrying the output format (`STL` or `OBJ`).
pub const HEADER_FORMAT: &str = "X-Format";

/// A simplification backend outside this crate.
pub trait ExternalSimplifier: Send + Sync {
    /// Name used in log messages.
    fn name(&self) -> &str {
        "external"
    }

    /// Simplify `mesh` by `target_reduction`, already clamped to the peer's
    /// accepted range.
    ///
    /// Any error (including [`MeshError::ExternalServiceUnavailable`]) makes
    /// the caller fall back to in-process simplification.
    fn simplify(&self, mesh: &MeshBuffer, target_reduction: f64)
        -> Result<ExternalSimplification>;
}

/// What the peer returned.
#[derive(Debug, Clone)]
pub struct ExternalSimplification {
    /// The decimated mesh.
    pub mesh: MeshBuffer,
    /// Statistics reported by the peer, if it sent any.
    pub stats: Option<ServiceStats>,
}

/// Statistics the peer reports alongside a decimated mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStats {
    /// Vertex count before decimation.
    pub original_vertices: usize,
    /// Vertex count after decimation.
    pub final_vertices: usize,
    /// Triangle count before decimation.
    pub original_triangles: usize,
    /// Triangle count after decimation.
    pub final_triangles: usize,
    /// `1 - final_vertices / original_vertices`.
    pub reduction_achieved: f64,
    /// Upper-case output format tag.
    pub format: String,
}

impl ServiceStats {
    /// Largest reduction the peer accepts.
    pub const MAX_TARGET_REDUCTION: f64 = 0.95;

    /// Fewest triangles the peer will decimate down to.
    pub const MIN_TRIANGLES: usize = 4;

    /// Clamp a reduction request to `[0, MAX_TARGET_REDUCTION]`.
    pub fn request_target(target_reduction: f64) -> f64 {
        if target_reduction.is_nan() {
            return 0.0;
        }
        target_reduction.clamp(0.0, Self::MAX_TARGET_REDUCTION)
    }

    /// Triangle budget the peer aims for.
    pub fn target_triangles(original_triangles: usize, target_reduction: f64) -> usize {
        let keep = original_triangles as f64 * (1.0 - Self::request_target(target_reduction));
        (keep.floor() as usize).max(Self::MIN_TRIANGLES)
    }

    /// Compute the statistics for a decimation.
    pub fn from_meshes(original: &MeshBuffer, decimated: &MeshBuffer, format: &str) -> Self {
        let original_vertices = original.num_vertices();
        let final_vertices = decimated.num_vertices();
        let reduction_achieved = if original_vertices == 0 {
            0.0
        } else {
            1.0 - final_vertices as f64 / original_vertices as f64
        };
        Self {
            original_vertices,
            final_vertices,
            original_triangles: original.num_triangles(),
            final_triangles: decimated.num_triangles(),
            reduction_achieved,
            format: format.to_ascii_uppercase(),
        }
    }

    /// Parse response headers. Header names match case-insensitively.
    pub fn from_headers<'a, I>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let headers: Vec<(&str, &str)> = headers.into_iter().collect();
        let lookup = |name: &'static str| -> Result<&str> {
            headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.trim())
                .ok_or_else(|| MeshError::InvalidServiceResponse {
                    field: name,
                    value: String::new(),
                })
        };
        let count = |name: &'static str| -> Result<usize> {
            let raw = lookup(name)?;
            raw.parse().map_err(|_| MeshError::InvalidServiceResponse {
                field: name,
                value: raw.to_string(),
            })
        };

        let raw_reduction = lookup(HEADER_REDUCTION_ACHIEVED)?;
        let reduction_achieved: f64 =
            raw_reduction
                .parse()
                .map_err(|_| MeshError::InvalidServiceResponse {
                    field: HEADER_REDUCTION_ACHIEVED,
                    value: raw_reduction.to_string(),
                })?;

        Ok(Self {
            original_vertices: count(HEADER_ORIGINAL_VERTICES)?,
            final_vertices: count(HEADER_FINAL_VERTICES)?,
            original_triangles: count(HEADER_ORIGINAL_TRIANGLES)?,
            final_triangles: count(HEADER_FINAL_TRIANGLES)?,
            reduction_achieved,
            format: lookup(HEADER_FORMAT)?.to_ascii_uppercase(),
        })
    }

    /// Emit response headers.
    pub fn to_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (HEADER_ORIGINAL_VERTICES, self.original_vertices.to_string()),
            (HEADER_FINAL_VERTICES, self.final_vertices.to_string()),
            (HEADER_ORIGINAL_TRIANGLES, self.original_triangles.to_string()),
            (HEADER_FINAL_TRIANGLES, self.final_triangles.to_string()),
            (
                HEADER_REDUCTION_ACHIEVED,
                format!("{:.3}", self.reduction_achieved),
            ),
            (HEADER_FORMAT, self.format.clone()),
        ]
    }
}
