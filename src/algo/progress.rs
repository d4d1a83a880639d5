//! Progress reporting and cooperative cancellation for whole-mesh passes.
//!
//! Bulk simplification runs a bounded collapse loop. A [`Progress`] handle
//! lets the caller watch it and, through a [`CancelToken`], ask it to stop
//! at the next checkpoint. A cancelled operation abandons its partial
//! result rather than returning a half-edited mesh.
//!
//! # Example
//!
//! ```
//! use tessera::algo::progress::{CancelToken, Progress};
//!
//! let token = CancelToken::new();
//! let progress = Progress::new(|current, total, message| {
//!     eprintln!("[{}/{}] {}", current, total, message);
//! })
//! .with_cancel(token.clone());
//!
//! assert!(!progress.is_cancelled());
//! token.cancel();
//! assert!(progress.is_cancelled());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag a caller sets to stop a running operation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

type Callback = dyn Fn(usize, usize, &str) + Send + Sync;

/// A progress callback plus an optional cancellation token.
///
/// The callback receives:
/// - `current`: Current step (0-based)
/// - `total`: Total number of steps
/// - `message`: Description of the current operation
#[derive(Clone)]
pub struct Progress {
    callback: Arc<Callback>,
    cancel: Option<CancelToken>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            cancel: None,
        }
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Whether the attached token (if any) was cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_report_invokes_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let progress = Progress::new(move |current, total, _| {
            assert!(current <= total);
            seen.fetch_add(1, Ordering::Relaxed);
        });
        progress.report(1, 4, "step");
        progress.report(4, 4, "done");
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let progress = Progress::none().with_cancel(token.clone());
        let copy = progress.clone();
        assert!(!copy.is_cancelled());
        token.cancel();
        assert!(progress.is_cancelled());
        assert!(copy.is_cancelled());
    }

    #[test]
    fn test_none_is_never_cancelled() {
        assert!(!Progress::default().is_cancelled());
    }
}
