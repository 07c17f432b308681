use crate::config::{PackerConfig, SortOrder};
use crate::error::{Result, TreePackError};
use crate::model::{Atlas, Meta, Page, PackStats, Rect};
use crate::page::PackPage;
use crate::source::ImageDescriptor;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

/// Output page: the logical record plus its composited canvas (absent for
/// layout-only runs).
pub struct OutputPage {
    pub page: Page,
    pub rgba: Option<RgbaImage>,
}

impl OutputPage {
    /// Writes the page canvas; the format follows the file extension.
    pub fn save_image(&self, path: &Path) -> Result<()> {
        let rgba = self.rgba.as_ref().ok_or_else(|| {
            TreePackError::Encode(format!("page {} was packed without a canvas", self.page.id))
        })?;
        rgba.save(path)?;
        Ok(())
    }

    /// Writes the page's plain-text placement index.
    pub fn save_index(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut w = std::io::BufWriter::new(file);
        crate::export::write_index(&self.page, &mut w)?;
        std::io::Write::flush(&mut w)?;
        Ok(())
    }
}

/// Why an image ended up on no page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Width or height is zero (includes images that failed to decode).
    ZeroSized,
    /// The key was already seen earlier in the run.
    Duplicate,
    /// Larger than the page in at least one dimension.
    Oversized,
    /// Attached pixels disagree with the declared size.
    InvalidPixels,
    /// Rejected even by a fresh, empty page. Indicates a defect.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedImage {
    pub key: String,
    pub reason: SkipReason,
}

/// Per-run summary of outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackReport {
    pub placed: usize,
    pub skipped: Vec<SkippedImage>,
}

impl PackReport {
    pub fn all_placed(&self) -> bool {
        self.skipped.is_empty()
    }

    pub fn has_defects(&self) -> bool {
        self.skipped
            .iter()
            .any(|s| matches!(s.reason, SkipReason::Exhausted))
    }

    /// Fails with `PlacementExhausted` for the first image a fresh page refused.
    pub fn check(&self) -> Result<()> {
        match self
            .skipped
            .iter()
            .find(|s| matches!(s.reason, SkipReason::Exhausted))
        {
            Some(s) => Err(TreePackError::PlacementExhausted(s.key.clone())),
            None => Ok(()),
        }
    }

    pub fn count(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}

/// Result of offering one image to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Placed { page: usize, frame: Rect },
    Skipped(SkipReason),
}

/// Output of a packing run: atlas metadata, pages and the per-image report.
pub struct PackOutput {
    pub atlas: Atlas,
    pub pages: Vec<OutputPage>,
    pub report: PackReport,
}

impl PackOutput {
    /// Convenience method that delegates to `atlas.stats()`.
    pub fn stats(&self) -> PackStats {
        self.atlas.stats()
    }
}

/// Multi-page packing state for one run.
///
/// Images are offered one at a time; each goes to the first page (in creation
/// order) that accepts it, and a new page is opened when none does.
pub struct PackingDriver {
    cfg: PackerConfig,
    pages: Vec<PackPage>,
    seen: HashSet<String>,
    report: PackReport,
}

impl PackingDriver {
    pub fn new(cfg: PackerConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            pages: Vec::new(),
            seen: HashSet::new(),
            report: PackReport::default(),
        })
    }

    pub fn config(&self) -> &PackerConfig {
        &self.cfg
    }

    pub fn pages(&self) -> &[PackPage] {
        &self.pages
    }

    pub fn report(&self) -> &PackReport {
        &self.report
    }

    /// Offers one image. Per-image problems are reported as
    /// `Outcome::Skipped`; only compositing defects surface as errors.
    pub fn place(&mut self, image: &ImageDescriptor) -> Result<Outcome> {
        if image.is_empty() {
            debug!(key = %image.key, "zero-sized image dropped");
            return Ok(self.skip(image, SkipReason::ZeroSized));
        }
        if !image.pixels_match() {
            error!(
                key = %image.key,
                width = image.width,
                height = image.height,
                "pixels do not match image size"
            );
            return Ok(self.skip(image, SkipReason::InvalidPixels));
        }
        if image.width > self.cfg.page_width || image.height > self.cfg.page_height {
            warn!(
                key = %image.key,
                width = image.width,
                height = image.height,
                page_width = self.cfg.page_width,
                page_height = self.cfg.page_height,
                "image too big, skipped"
            );
            return Ok(self.skip(image, SkipReason::Oversized));
        }
        // Only images that reach a page claim their key.
        if !self.seen.insert(image.key.clone()) {
            warn!(key = %image.key, "duplicate image");
            return Ok(self.skip(image, SkipReason::Duplicate));
        }

        let mut duplicate = false;
        for page in self.pages.iter_mut() {
            match page.insert(image) {
                Ok(Some(frame)) => {
                    self.report.placed += 1;
                    return Ok(Outcome::Placed {
                        page: page.id(),
                        frame,
                    });
                }
                Ok(None) => {}
                Err(TreePackError::DuplicateKey(_)) => {
                    duplicate = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        if duplicate {
            return Ok(self.skip(image, SkipReason::Duplicate));
        }

        let id = self.pages.len();
        info!(page = id, "opening page");
        self.pages.push(PackPage::from_config(id, &self.cfg));
        let page = &mut self.pages[id];
        match page.insert(image)? {
            Some(frame) => {
                self.report.placed += 1;
                Ok(Outcome::Placed { page: id, frame })
            }
            None => {
                error!(key = %image.key, page = id, "image does not fit into an empty page");
                Ok(self.skip(image, SkipReason::Exhausted))
            }
        }
    }

    fn skip(&mut self, image: &ImageDescriptor, reason: SkipReason) -> Outcome {
        self.report.skipped.push(SkippedImage {
            key: image.key.clone(),
            reason,
        });
        Outcome::Skipped(reason)
    }

    /// Consumes the driver, returning pages in creation order.
    pub fn finish(self) -> PackOutput {
        let meta = build_meta(&self.cfg);
        let mut atlas_pages = Vec::with_capacity(self.pages.len());
        let mut pages = Vec::with_capacity(self.pages.len());
        for p in self.pages {
            let (page, rgba) = p.into_parts();
            atlas_pages.push(page.clone());
            pages.push(OutputPage { page, rgba });
        }
        PackOutput {
            atlas: Atlas {
                pages: atlas_pages,
                meta,
            },
            pages,
            report: self.report,
        }
    }
}

fn build_meta(cfg: &PackerConfig) -> Meta {
    Meta {
        schema_version: "1".into(),
        app: "treepack".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        format: "RGBA8888".into(),
        page_size: (cfg.page_width, cfg.page_height),
        padding: cfg.padding,
        sort_order: cfg.sort_order.to_string(),
    }
}

/// Drops zero-sized descriptors and sorts the rest per `order`.
///
/// The sort is stable, so ties keep discovery order.
pub fn order_descriptors(
    mut descriptors: Vec<ImageDescriptor>,
    order: &SortOrder,
) -> Vec<ImageDescriptor> {
    descriptors.retain(|d| !d.is_empty());
    match order {
        SortOrder::None => {}
        SortOrder::NameAsc => descriptors.sort_by(|a, b| a.key.cmp(&b.key)),
        SortOrder::AreaDesc => descriptors.sort_by(|a, b| b.area().cmp(&a.area())),
        SortOrder::MaxSideDesc => {
            descriptors.sort_by(|a, b| b.width.max(b.height).cmp(&a.width.max(a.height)))
        }
        SortOrder::HeightDesc => descriptors.sort_by(|a, b| b.height.cmp(&a.height)),
        SortOrder::WidthDesc => descriptors.sort_by(|a, b| b.width.cmp(&a.width)),
    }
    descriptors
}

/// Packs `inputs` into fixed-size pages and returns metadata, canvases and
/// the per-image report.
///
/// Fails with `Empty` when no input has a positive size.
#[instrument(skip_all)]
pub fn pack_images(inputs: Vec<ImageDescriptor>, cfg: PackerConfig) -> Result<PackOutput> {
    cfg.validate()?;

    let ordered = order_descriptors(inputs, &cfg.sort_order);
    if ordered.is_empty() {
        return Err(TreePackError::Empty);
    }

    let mut driver = PackingDriver::new(cfg)?;
    for image in &ordered {
        driver.place(image)?;
    }
    let out = driver.finish();
    info!(
        pages = out.pages.len(),
        placed = out.report.placed,
        skipped = out.report.skipped.len(),
        "packing finished"
    );
    Ok(out)
}

/// Layout-only packing: sizes in, placements out, no canvases.
#[instrument(skip_all)]
pub fn pack_layout<K: Into<String>>(
    inputs: Vec<(K, u32, u32)>,
    mut cfg: PackerConfig,
) -> Result<PackOutput> {
    cfg.compose = false;
    let descriptors = inputs
        .into_iter()
        .map(|(k, w, h)| ImageDescriptor::new(k, w, h))
        .collect();
    pack_images(descriptors, cfg)
}
