//! Core library for packing images into fixed-size atlas pages.
//!
//! - Allocator: a binary space-partition tree per page (`PackNode` / `TreePacker`)
//! - Driver: `PackingDriver` feeds images largest-first and opens pages on demand
//! - Pipeline: `pack_images` takes decoded images and returns pages + placement indices
//!
//! Quick example:
//! ```ignore
//! use treepack_core::{ImageDescriptor, PackerConfig, open_descriptor, pack_images};
//! # fn main() -> anyhow::Result<()> {
//! let inputs = vec![
//!   open_descriptor("a.png".as_ref(), "a")?,
//!   open_descriptor("b.png".as_ref(), "b")?,
//! ];
//! let cfg = PackerConfig { page_width: 1024, page_height: 1024, ..Default::default() };
//! let out = pack_images(inputs, cfg)?;
//! for p in &out.pages {
//!     print!("{}", treepack_core::to_index_string(&p.page));
//! }
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod packer;
pub mod page;
pub mod pipeline;
pub mod source;

pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use packer::*;
pub use page::*;
pub use pipeline::*;
pub use source::*;

/// Convenience prelude for common types and functions.
/// Importing `treepack_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{PackerConfig, PackerConfigBuilder, SortOrder};
    pub use crate::error::TreePackError;
    pub use crate::export::{to_index_string, to_json, write_index};
    pub use crate::model::{Atlas, Meta, PackStats, Page, Placement, Rect};
    pub use crate::packer::{PackNode, Packer, TreePacker};
    pub use crate::page::PackPage;
    pub use crate::source::ImageDescriptor;
    pub use crate::{
        OutputPage, Outcome, PackOutput, PackReport, PackingDriver, SkipReason, SkippedImage,
        order_descriptors, pack_images, pack_layout,
    };
}
