//! Error types for scene loading and the splat worker

use thiserror::Error;

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors raised while importing or handing off splat scenes
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("invalid PLY file: {0}")]
    InvalidPly(String),

    #[error("scene contains no splats")]
    EmptyScene,

    #[error("packed buffer of {len} bytes does not hold whole 32-byte records")]
    LengthMismatch { len: usize },

    #[error("scene worker is no longer running")]
    WorkerGone,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
