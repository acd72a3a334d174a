//! The `Generator` trait -- the seam between segment processing and
//! whatever produces text.
//!
//! The trait is object-safe so pipelines can take `&dyn Generator` and
//! tests can substitute scripted fakes.

use async_trait::async_trait;

use super::{GenerationError, GenerationRequest};

/// Produces replacement text for one segment.
///
/// Implementations return plain text only. They must not touch the content
/// tree; splicing the result back is the caller's job.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short identifier used in logs (e.g. "claude-code").
    fn name(&self) -> &str;

    /// Generate text for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

// Compile-time assertion: Generator must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Generator) {}
};
