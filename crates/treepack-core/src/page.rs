use crate::compositing::blit_rgba;
use crate::config::PackerConfig;
use crate::error::{Result, TreePackError};
use crate::model::{Page, Placement, Rect};
use crate::packer::{Packer, TreePacker};
use crate::source::ImageDescriptor;
use image::RgbaImage;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// One fixed-size atlas page: a placement tree, the key -> placement map and
/// (when composing) the page canvas.
#[derive(Debug, Clone)]
pub struct PackPage {
    id: usize,
    packer: TreePacker<String>,
    placements: BTreeMap<String, Placement>,
    canvas: Option<RgbaImage>,
}

impl PackPage {
    pub fn new(id: usize, width: u32, height: u32, padding: u32, compose: bool) -> Self {
        Self {
            id,
            packer: TreePacker::new(width, height, padding),
            placements: BTreeMap::new(),
            canvas: compose.then(|| RgbaImage::new(width, height)),
        }
    }

    pub fn from_config(id: usize, cfg: &PackerConfig) -> Self {
        Self::new(id, cfg.page_width, cfg.page_height, cfg.padding, cfg.compose)
    }

    pub fn id(&self) -> usize {
        self.id
    }
    pub fn width(&self) -> u32 {
        self.packer.bounds().w
    }
    pub fn height(&self) -> u32 {
        self.packer.bounds().h
    }
    pub fn len(&self) -> usize {
        self.placements.len()
    }
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.placements.contains_key(key)
    }
    pub fn placement(&self, key: &str) -> Option<&Placement> {
        self.placements.get(key)
    }
    /// Placements in key order.
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.values()
    }
    pub fn packer(&self) -> &TreePacker<String> {
        &self.packer
    }
    pub fn canvas(&self) -> Option<&RgbaImage> {
        self.canvas.as_ref()
    }

    /// True if `image` is not on this page yet and a free leaf can hold it.
    pub fn can_insert(&self, image: &ImageDescriptor) -> bool {
        !self.contains_key(&image.key) && self.packer.can_pack(image.width, image.height)
    }

    /// Places `image` on this page.
    ///
    /// Returns `Ok(Some(rect))` on success, `Ok(None)` if no free region can
    /// hold it, and `DuplicateKey` if the key is already on this page. Nothing
    /// is mutated unless the image is placed.
    pub fn insert(&mut self, image: &ImageDescriptor) -> Result<Option<Rect>> {
        if self.placements.contains_key(&image.key) {
            warn!(key = %image.key, page = self.id, "duplicate image");
            return Err(TreePackError::DuplicateKey(image.key.clone()));
        }
        if !image.pixels_match() {
            return Err(TreePackError::InvalidConfig(format!(
                "pixels of {} do not match its size {}x{}",
                image.key, image.width, image.height
            )));
        }

        let Some(frame) = self.packer.peek(image.width, image.height) else {
            return Ok(None);
        };
        // Blit first: a refused blit leaves the canvas untouched, and the
        // tree is only split once the pixels are in.
        if let (Some(canvas), Some(px)) = (self.canvas.as_mut(), image.pixels.as_ref()) {
            if !blit_rgba(px, canvas, frame.x, frame.y) {
                return Err(TreePackError::Blit {
                    key: image.key.clone(),
                    x: frame.x,
                    y: frame.y,
                });
            }
        }
        let placed = self
            .packer
            .pack(image.key.clone(), image.width, image.height);
        debug_assert_eq!(placed, Some(frame));

        self.placements.insert(
            image.key.clone(),
            Placement {
                key: image.key.clone(),
                frame,
                has_alpha: image.has_alpha,
            },
        );
        debug!(key = %image.key, page = self.id, x = frame.x, y = frame.y, w = frame.w, h = frame.h, "placed");
        Ok(Some(frame))
    }

    /// Logical page record with placements sorted by key.
    pub fn to_page(&self) -> Page {
        Page {
            id: self.id,
            width: self.width(),
            height: self.height(),
            placements: self.placements.values().cloned().collect(),
        }
    }

    pub fn into_parts(self) -> (Page, Option<RgbaImage>) {
        let page = self.to_page();
        (page, self.canvas)
    }
}
