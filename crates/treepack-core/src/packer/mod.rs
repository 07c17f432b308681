use crate::model::Rect;

pub mod tree;

pub use tree::{PackNode, TreePacker};

/// A packer places rectangles into a single fixed-size page.
///
/// Implementations must ensure no overlaps and keep every placement inside the
/// page. `pack` returns `None` when the rectangle cannot be placed, and a failed
/// `pack` must leave the packer unchanged.
pub trait Packer<K> {
    fn can_pack(&self, w: u32, h: u32) -> bool;
    fn pack(&mut self, key: K, w: u32, h: u32) -> Option<Rect>;
}
