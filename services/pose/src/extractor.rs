//! Landmark extraction seam.

use crate::error::ExtractError;
use crate::frame::Frame;
use crate::landmark::LandmarkSet;

/// Locates body landmarks on a decoded frame.
///
/// One instance is created at process start and shared by every worker, so
/// implementations must be safe to call from several threads at once. A
/// model runtime that is not reentrant has to serialize calls internally.
pub trait LandmarkExtractor: Send + Sync {
    /// Returns `Ok(None)` when no subject is found on the frame.
    fn extract(&self, frame: &Frame) -> Result<Option<LandmarkSet>, ExtractError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
