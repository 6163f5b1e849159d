//! Thumbcache-Common: Shared types and errors.
//!
//! This crate provides the vocabulary used across thumbcache:
//!
//! - **Identifiers**: [`VideoId`] and locator extraction
//! - **Thumbnail Types**: [`ThumbnailRecord`], [`ThumbnailResult`] and the
//!   per-item [`FailureKind`]
//! - **Error Handling**: Common error type and result alias
//!
//! # Examples
//!
//! ```
//! use thumbcache_common::{FailureKind, ThumbnailResult, VideoId};
//!
//! let id = VideoId::from_locator("https://www.youtube.com/watch?v=Gmlh0NrvzP0").unwrap();
//! assert_eq!(id.as_str(), "Gmlh0NrvzP0");
//!
//! let miss = ThumbnailResult::failure(id.as_str(), FailureKind::NotFound);
//! assert_eq!(miss.message(), Some("not found"));
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
