//! Splat scene ingestion, packing, covariance texture and depth sorting
//!
//! The CPU half of the splat pipeline:
//!
//! - [`SplatCloud`]: normalized per-splat arrays as produced by the importer.
//! - [`PackedSplats`]: the 32-byte-per-splat buffer handed to the worker.
//! - [`texture::generate`]: one-time covariance texture generation.
//! - [`DepthSorter`]: throttled 16-bit counting sort, front to back.
//! - [`SceneHandle`]: the worker thread owning the packed buffer,
//!   driven by messages from the render loop.

pub mod error;
pub mod pack;
pub mod ply;
pub mod sort;
pub mod splat;
pub mod texture;
pub mod worker;

pub use error::{SceneError, SceneResult};
pub use pack::PackedSplats;
pub use sort::{DepthSorter, SplatOrder};
pub use splat::SplatCloud;
pub use texture::CovarianceTexture;
pub use worker::{SceneEvent, SceneHandle, SceneRequest};
