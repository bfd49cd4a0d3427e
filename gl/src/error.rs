//! Graphics error types.

use thiserror::Error;

/// Errors that can occur in the GL device.
///
/// Drawing operations never return these: contract violations on the draw
/// path are assertions, and missing capabilities degrade silently. Errors
/// only surface from construction and from native object (re)creation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the device or load driver bindings.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// The driver refused to create a native object.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// The native context is lost or not current.
    #[error("graphics context lost")]
    ContextLost,
    /// A requested feature is not supported.
    #[error("feature not supported: {0}")]
    FeatureNotSupported(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result alias used throughout the crate.
pub type GraphicsResult<T> = Result<T, GraphicsError>;
