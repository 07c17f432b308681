use super::Packer;
use crate::model::Rect;

/// One region of a page's binary space-partition tree.
///
/// A node is either a leaf (empty or holding exactly one image) or an internal
/// node with exactly two children. Children are created lazily, only when a
/// leaf must split to take an image.
#[derive(Debug, Clone)]
pub struct PackNode<K> {
    rect: Rect,
    occupant: Option<K>,
    children: Option<Box<[PackNode<K>; 2]>>,
}

impl<K> PackNode<K> {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            occupant: None,
            children: None,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn is_occupied(&self) -> bool {
        self.is_leaf() && self.occupant.is_some()
    }

    pub fn occupant(&self) -> Option<&K> {
        self.occupant.as_ref()
    }

    pub fn children(&self) -> Option<&[PackNode<K>; 2]> {
        self.children.as_deref()
    }

    /// Read-only probe: true if `insert` with this size would succeed.
    pub fn fits(&self, w: u32, h: u32) -> bool {
        self.find(w, h).is_some()
    }

    /// Read-only probe: the rectangle `insert` would return for this size.
    ///
    /// A fitting leaf always places the image at its own top-left corner, so
    /// the answer is the first free leaf that is large enough.
    pub fn find(&self, w: u32, h: u32) -> Option<Rect> {
        match &self.children {
            Some(children) => children[0].find(w, h).or_else(|| children[1].find(w, h)),
            None if self.occupant.is_none() && w <= self.rect.w && h <= self.rect.h => {
                Some(Rect::new(self.rect.x, self.rect.y, w, h))
            }
            None => None,
        }
    }

    /// Places a `w`x`h` image somewhere in this subtree, depth-first with the
    /// first child always tried before the second.
    ///
    /// Returns the rectangle of the leaf that now holds `key`. On failure the
    /// tree is left untouched.
    pub fn insert(&mut self, key: K, w: u32, h: u32, padding: u32) -> Option<Rect> {
        self.try_insert(key, w, h, padding).ok()
    }

    // Hands the key back on failure so the caller can offer it to the sibling.
    fn try_insert(&mut self, key: K, w: u32, h: u32, padding: u32) -> Result<Rect, K> {
        if let Some(children) = self.children.as_mut() {
            let key = match children[0].try_insert(key, w, h, padding) {
                Ok(rect) => return Ok(rect),
                Err(key) => key,
            };
            return children[1].try_insert(key, w, h, padding);
        }

        if self.occupant.is_some() {
            return Err(key);
        }
        if w > self.rect.w || h > self.rect.h {
            return Err(key);
        }
        if w == self.rect.w && h == self.rect.h {
            self.occupant = Some(key);
            return Ok(self.rect);
        }

        // Split along the axis with more leftover space.
        let r = self.rect;
        let dw = r.w - w;
        let dh = r.h - h;
        let (first, second) = if dw > dh {
            (
                Rect::new(r.x, r.y, w, r.h),
                Rect::new(
                    r.x.saturating_add(w).saturating_add(padding),
                    r.y,
                    r.w.saturating_sub(w).saturating_sub(padding),
                    r.h,
                ),
            )
        } else {
            (
                Rect::new(r.x, r.y, r.w, h),
                Rect::new(
                    r.x,
                    r.y.saturating_add(h).saturating_add(padding),
                    r.w,
                    r.h.saturating_sub(h).saturating_sub(padding),
                ),
            )
        };
        let children = self
            .children
            .insert(Box::new([PackNode::new(first), PackNode::new(second)]));
        // `first` matches the image exactly along one axis, so this cannot fail.
        children[0].try_insert(key, w, h, padding)
    }

    /// Occupied leaves in depth-first, first-child-first order.
    pub fn occupied(&self) -> Vec<(&K, Rect)> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node.children.as_deref() {
                Some([a, b]) => {
                    stack.push(b);
                    stack.push(a);
                }
                None => {
                    if let Some(k) = &node.occupant {
                        out.push((k, node.rect));
                    }
                }
            }
        }
        out
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        match self.children.as_deref() {
            Some([a, b]) => 1 + a.node_count() + b.node_count(),
            None => 1,
        }
    }
}

/// Binary-tree packer for one page (the classic lightmap packing scheme).
#[derive(Debug, Clone)]
pub struct TreePacker<K> {
    root: PackNode<K>,
    padding: u32,
}

impl<K> TreePacker<K> {
    pub fn new(width: u32, height: u32, padding: u32) -> Self {
        Self {
            root: PackNode::new(Rect::new(0, 0, width, height)),
            padding,
        }
    }

    pub fn root(&self) -> &PackNode<K> {
        &self.root
    }

    pub fn bounds(&self) -> Rect {
        self.root.rect()
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    /// Where `pack` would put a `w`x`h` image, without placing it.
    pub fn peek(&self, w: u32, h: u32) -> Option<Rect> {
        if w == 0 || h == 0 {
            return None;
        }
        self.root.find(w, h)
    }
}

impl<K> Packer<K> for TreePacker<K> {
    fn can_pack(&self, w: u32, h: u32) -> bool {
        w > 0 && h > 0 && self.root.fits(w, h)
    }

    fn pack(&mut self, key: K, w: u32, h: u32) -> Option<Rect> {
        if w == 0 || h == 0 {
            return None;
        }
        self.root.insert(key, w, h, self.padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_fit_occupies_root_without_split() {
        let mut p: TreePacker<&str> = TreePacker::new(64, 32, 0);
        assert_eq!(p.pack("a", 64, 32), Some(Rect::new(0, 0, 64, 32)));
        assert!(p.root().is_leaf());
        assert!(p.root().is_occupied());
        assert!(!p.can_pack(1, 1));
    }

    #[test]
    fn wider_leftover_splits_vertically() {
        let mut root: PackNode<&str> = PackNode::new(Rect::new(0, 0, 100, 40));
        // dw = 80, dh = 20
        assert_eq!(root.insert("a", 20, 20, 0), Some(Rect::new(0, 0, 20, 20)));
        let [a, b] = root.children().expect("split");
        assert_eq!(a.rect(), Rect::new(0, 0, 20, 40));
        assert_eq!(b.rect(), Rect::new(20, 0, 80, 40));
    }

    #[test]
    fn equal_leftover_splits_horizontally() {
        let mut root: PackNode<&str> = PackNode::new(Rect::new(0, 0, 64, 64));
        root.insert("a", 32, 32, 0);
        let [a, b] = root.children().expect("split");
        assert_eq!(a.rect(), Rect::new(0, 0, 64, 32));
        assert_eq!(b.rect(), Rect::new(0, 32, 64, 32));
    }

    #[test]
    fn padding_is_left_between_siblings() {
        let mut root: PackNode<&str> = PackNode::new(Rect::new(0, 0, 100, 40));
        root.insert("a", 20, 20, 2);
        let [_, b] = root.children().expect("split");
        assert_eq!(b.rect(), Rect::new(22, 0, 78, 40));
    }

    #[test]
    fn oversized_padding_yields_empty_sibling() {
        let mut root: PackNode<&str> = PackNode::new(Rect::new(0, 0, 10, 4));
        // dw == dh, so the first split is horizontal and the padding eats the band below.
        assert!(root.insert("a", 8, 2, 5).is_some());
        let [_, b] = root.children().expect("split");
        assert_eq!(b.rect().h, 0);
        assert!(root.insert("b", 1, 1, 5).is_none());
    }

    #[test]
    fn failed_insert_leaves_tree_untouched() {
        let mut p: TreePacker<&str> = TreePacker::new(64, 64, 0);
        p.pack("a", 40, 40).expect("first");
        let before = p.root().node_count();
        assert!(!p.can_pack(40, 40));
        assert_eq!(p.pack("b", 40, 40), None);
        assert_eq!(p.root().node_count(), before);
        assert_eq!(p.root().occupied().len(), 1);
    }

    #[test]
    fn first_child_is_preferred() {
        let mut p: TreePacker<u32> = TreePacker::new(128, 128, 0);
        p.pack(0, 64, 64);
        // Both the remaining right strip and the bottom band could hold it;
        // the first (top) band wins.
        assert_eq!(p.pack(1, 32, 32), Some(Rect::new(64, 0, 32, 32)));
    }

    #[test]
    fn zero_sized_request_is_rejected() {
        let mut p: TreePacker<&str> = TreePacker::new(16, 16, 0);
        assert_eq!(p.pack("z", 0, 4), None);
        assert!(p.root().is_leaf());
    }

    #[test]
    fn occupied_lists_every_key_once() {
        let mut p: TreePacker<usize> = TreePacker::new(256, 256, 1);
        let mut placed = Vec::new();
        for i in 0..40 {
            if let Some(r) = p.pack(i, 10 + (i as u32 % 7) * 3, 12 + (i as u32 % 5) * 4) {
                placed.push((i, r));
            }
        }
        let occ = p.root().occupied();
        assert_eq!(occ.len(), placed.len());
        for (k, r) in &placed {
            let found: Vec<_> = occ.iter().filter(|(ok, _)| **ok == *k).collect();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].1, *r);
        }
    }

    #[test]
    fn peek_predicts_pack_without_mutation() {
        let mut p: TreePacker<&str> = TreePacker::new(100, 60, 3);
        for (k, w, h) in [("a", 40, 20), ("b", 30, 30), ("c", 50, 10), ("d", 7, 7)] {
            let nodes = p.root().node_count();
            let predicted = p.peek(w, h);
            assert_eq!(p.root().node_count(), nodes);
            assert_eq!(p.pack(k, w, h), predicted, "{k}");
        }
        assert_eq!(p.peek(0, 5), None);
        assert_eq!(p.peek(101, 1), None);
    }
}
