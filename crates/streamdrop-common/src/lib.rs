//! Streamdrop-Common: Shared types, identifiers, and utilities.
//!
//! This crate provides common functionality used across streamdrop:
//!
//! - **Share IDs**: 8-character capability tokens drawn from the OS RNG
//! - **Origins**: The tagged [`FileOrigin`] variant telling delivery where bytes live
//! - **Content types**: Extension-based MIME lookup
//! - **Timestamps**: The fixed RFC 3339 form used for stored expiry times
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use streamdrop_common::{ShareId, FileOrigin, Result};
//! use streamdrop_common::content_type::content_type_for;
//!
//! fn example() -> Result<()> {
//!     let id = ShareId::generate()?;
//!     assert_eq!(id.as_str().len(), 8);
//!     Ok(())
//! }
//!
//! assert_eq!(content_type_for("movie.mp4"), "video/mp4");
//! let origin = FileOrigin::remote("https://cdn.example.com/f/1", true);
//! assert!(origin.is_remote());
//! # example().unwrap();
//! ```

pub mod content_type;
pub mod error;
pub mod ids;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
