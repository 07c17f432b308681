use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        if self.is_empty() || r.is_empty() {
            return false;
        }
        let a_x2 = self.x as u64 + self.w as u64;
        let a_y2 = self.y as u64 + self.h as u64;
        let b_x2 = r.x as u64 + r.w as u64;
        let b_y2 = r.y as u64 + r.h as u64;
        !((self.x as u64) >= b_x2
            || (r.x as u64) >= a_x2
            || (self.y as u64) >= b_y2
            || (r.y as u64) >= a_y2)
    }
}

/// A placed image within a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Placement<K = String> {
    /// Image key (usually the discovered file path).
    pub key: K,
    /// Placed rectangle within the page; always the source image size.
    pub frame: Rect,
    /// True if the source image had at least one non-opaque pixel.
    pub has_alpha: bool,
}

/// A single atlas page (logical record). Placements are ordered by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<K = String> {
    pub id: usize,
    pub width: u32,
    pub height: u32,
    pub placements: Vec<Placement<K>>,
}

/// Atlas-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    /// Schema version of the JSON document; current: "1".
    pub schema_version: String,
    pub app: String,
    pub version: String,
    pub format: String,
    pub page_size: (u32, u32),
    pub padding: u32,
    pub sort_order: String,
}

/// Atlas of pages and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atlas<K = String> {
    pub pages: Vec<Page<K>>,
    pub meta: Meta,
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PackStats {
    /// Total number of pages in the atlas.
    pub num_pages: usize,
    /// Total number of placed images.
    pub num_placements: usize,
    /// Sum of `width * height` over all pages.
    pub total_page_area: u64,
    /// Sum of `width * height` over all placements.
    pub used_area: u64,
    /// used_area / total_page_area (0.0 to 1.0).
    pub occupancy: f64,
    /// Number of placements whose source carries transparency.
    pub num_with_alpha: usize,
}

impl<K> Atlas<K> {
    /// Computes packing statistics for this atlas.
    pub fn stats(&self) -> PackStats {
        let mut num_placements = 0;
        let mut total_page_area = 0u64;
        let mut used_area = 0u64;
        let mut num_with_alpha = 0;

        for page in &self.pages {
            total_page_area += (page.width as u64) * (page.height as u64);
            for p in &page.placements {
                num_placements += 1;
                used_area += p.frame.area();
                if p.has_alpha {
                    num_with_alpha += 1;
                }
            }
        }

        let occupancy = if total_page_area > 0 {
            used_area as f64 / total_page_area as f64
        } else {
            0.0
        };

        PackStats {
            num_pages: self.pages.len(),
            num_placements,
            total_page_area,
            used_area,
            occupancy,
            num_with_alpha,
        }
    }
}

impl PackStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Pages: {}, Images: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px², With Alpha: {}",
            self.num_pages,
            self.num_placements,
            self.occupancy * 100.0,
            self.total_page_area,
            self.used_area,
            self.num_with_alpha,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_page_area.saturating_sub(self.used_area)
    }

    /// Returns wasted space as a percentage (0.0 to 100.0).
    pub fn waste_percentage(&self) -> f64 {
        if self.total_page_area > 0 {
            (self.wasted_area() as f64 / self.total_page_area as f64) * 100.0
        } else {
            0.0
        }
    }
}
