use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Insertion orders for deterministic packing.
///
/// Every order is a stable sort, so images comparing equal keep their
/// discovery order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Largest area first (the binary tree packs best this way).
    #[default]
    AreaDesc,
    MaxSideDesc,
    HeightDesc,
    WidthDesc,
    NameAsc,
    /// Keep discovery order.
    None,
}

impl FromStr for SortOrder {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "area_desc" => Ok(Self::AreaDesc),
            "max_side_desc" => Ok(Self::MaxSideDesc),
            "height_desc" => Ok(Self::HeightDesc),
            "width_desc" => Ok(Self::WidthDesc),
            "name_asc" => Ok(Self::NameAsc),
            "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AreaDesc => "area_desc",
            Self::MaxSideDesc => "max_side_desc",
            Self::HeightDesc => "height_desc",
            Self::WidthDesc => "width_desc",
            Self::NameAsc => "name_asc",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackerConfig {
    /// Fixed page width in pixels.
    #[serde(default = "default_page_dim")]
    pub page_width: u32,
    /// Fixed page height in pixels.
    #[serde(default = "default_page_dim")]
    pub page_height: u32,
    /// Gap left between a placed image and the free remainder of its region.
    #[serde(default)]
    pub padding: u32,
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Allocate page canvases and blit pixels. Disable for layout-only runs.
    #[serde(default = "default_compose")]
    pub compose: bool,
    /// Decode sources in parallel when feature "parallel" is on.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_dim(),
            page_height: default_page_dim(),
            padding: 0,
            sort_order: SortOrder::AreaDesc,
            compose: default_compose(),
            parallel: false,
        }
    }
}

impl PackerConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if a page dimension is zero or if the padding leaves
    /// no room for anything beside the first image on both axes.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::TreePackError;

        if self.page_width == 0 || self.page_height == 0 {
            return Err(TreePackError::InvalidDimensions {
                width: self.page_width,
                height: self.page_height,
            });
        }

        if self.padding >= self.page_width && self.padding >= self.page_height {
            return Err(TreePackError::InvalidConfig(format!(
                "padding ({}) must be smaller than a page dimension ({}x{})",
                self.padding, self.page_width, self.page_height
            )));
        }

        Ok(())
    }

    /// Page bounds as a rectangle anchored at the origin.
    pub fn page_rect(&self) -> crate::model::Rect {
        crate::model::Rect::new(0, 0, self.page_width, self.page_height)
    }
}

fn default_page_dim() -> u32 {
    2048
}
fn default_compose() -> bool {
    true
}

/// Builder for `PackerConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackerConfigBuilder {
    cfg: PackerConfig,
}

impl PackerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackerConfig::default(),
        }
    }
    pub fn with_page_size(mut self, w: u32, h: u32) -> Self {
        self.cfg.page_width = w;
        self.cfg.page_height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn sort_order(mut self, v: SortOrder) -> Self {
        self.cfg.sort_order = v;
        self
    }
    pub fn compose(mut self, v: bool) -> Self {
        self.cfg.compose = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> PackerConfig {
        self.cfg
    }
}

impl PackerConfig {
    /// Create a fluent builder for `PackerConfig`.
    pub fn builder() -> PackerConfigBuilder {
        PackerConfigBuilder::new()
    }
}
