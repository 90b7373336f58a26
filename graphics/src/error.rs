//! Graphics error types.

use thiserror::Error;

/// Errors reported by resource factories and propagated out of
/// [`FrameGraph::execute`](crate::FrameGraph::execute).
///
/// Misuse of the graph itself (dead proxy ids, undeclared resources, an
/// `Unknown` destination usage) is not an error value: it panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphicsError {
    /// Failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// A requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// Out of GPU memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The GPU device was lost.
    #[error("GPU device lost")]
    DeviceLost,
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::ResourceCreationFailed("image 512x512".to_string());
        assert_eq!(err.to_string(), "resource creation failed: image 512x512");
    }
}
