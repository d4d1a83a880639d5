//! Mesh editing algorithms.
//!
//! - **Merging**: coplanar triangles into polygon faces ([`merge`])
//! - **Reconstruction**: the polygon overlay of a triangle buffer ([`reconstruct`])
//! - **Simplification**: watertight edge collapse with a fallback chain ([`simplify`])
//! - **Painting**: interactive single-edge collapse ([`painter`])
//!
//! Long-running operations report through [`Progress`], which can also carry
//! a [`CancelToken`].

pub mod merge;
pub mod painter;
pub mod progress;
pub mod reconstruct;
pub mod simplify;

pub use progress::{CancelToken, Progress};
