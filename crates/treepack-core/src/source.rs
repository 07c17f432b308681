use crate::error::Result;
use image::{DynamicImage, ImageReader, RgbaImage};
use std::path::{Path, PathBuf};
use tracing::error;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One source image as seen by the packer.
///
/// `pixels` is the decoded image in RGBA8 byte order; it is `None` for
/// layout-only descriptors that carry just a size.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    pub pixels: Option<RgbaImage>,
}

impl ImageDescriptor {
    /// Size-only descriptor (no pixels).
    pub fn new(key: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            key: key.into(),
            width,
            height,
            has_alpha: false,
            pixels: None,
        }
    }

    /// Converts a decoded image to RGBA8. `has_alpha` is set only when the
    /// source colour type carries alpha and some pixel is not fully opaque.
    pub fn from_image(key: impl Into<String>, image: DynamicImage) -> Self {
        let color_alpha = image.color().has_alpha();
        let rgba = image.into_rgba8();
        let has_alpha = color_alpha && rgba.pixels().any(|p| p[3] != 255);
        let (width, height) = rgba.dimensions();
        Self {
            key: key.into(),
            width,
            height,
            has_alpha,
            pixels: Some(rgba),
        }
    }

    pub fn from_rgba(key: impl Into<String>, rgba: RgbaImage) -> Self {
        Self::from_image(key, DynamicImage::ImageRgba8(rgba))
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// False when attached pixels disagree with `width`/`height`.
    pub fn pixels_match(&self) -> bool {
        self.pixels
            .as_ref()
            .is_none_or(|px| px.dimensions() == (self.width, self.height))
    }
}

/// Key used for a discovered file: its path with `\` normalised to `/`.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Decodes one file, guessing the format from its content.
pub fn open_descriptor(path: &Path, key: impl Into<String>) -> Result<ImageDescriptor> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(ImageDescriptor::from_image(key, img))
}

/// Decodes `paths` in order, dropping (and logging) files that fail to decode.
///
/// With feature `parallel` and `parallel == true` decoding runs on the rayon
/// pool; the result keeps the order of `paths` either way.
pub fn load_descriptors(paths: &[PathBuf], parallel: bool) -> Vec<ImageDescriptor> {
    decode_all(paths, parallel)
        .into_iter()
        .zip(paths)
        .filter_map(|(res, p)| match res {
            Ok(d) => Some(d),
            Err(e) => {
                error!(?p, error = %e, "skip image");
                None
            }
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn decode_all(paths: &[PathBuf], parallel: bool) -> Vec<Result<ImageDescriptor>> {
    if parallel {
        paths
            .par_iter()
            .map(|p| open_descriptor(p, path_key(p)))
            .collect()
    } else {
        paths.iter().map(|p| open_descriptor(p, path_key(p))).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn decode_all(paths: &[PathBuf], _parallel: bool) -> Vec<Result<ImageDescriptor>> {
    paths.iter().map(|p| open_descriptor(p, path_key(p))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    #[test]
    fn opaque_rgba_has_no_alpha() {
        let img = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        let d = ImageDescriptor::from_rgba("a", img);
        assert_eq!((d.width, d.height), (4, 3));
        assert!(!d.has_alpha);
        assert_eq!(d.area(), 12);
    }

    #[test]
    fn translucent_pixel_sets_alpha() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(3, 3, Rgba([0, 0, 0, 10]));
        assert!(ImageDescriptor::from_rgba("a", img).has_alpha);
    }

    #[test]
    fn rgb_source_is_converted_to_rgba() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([9, 8, 7])));
        let d = ImageDescriptor::from_image("rgb", img);
        assert!(!d.has_alpha);
        let px = d.pixels.expect("pixels");
        assert_eq!(*px.get_pixel(1, 1), Rgba([9, 8, 7, 255]));
    }

    #[test]
    fn undecodable_files_are_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("good.png");
        RgbaImage::new(3, 5).save(&good).expect("save png");
        let bad = dir.path().join("bad.png");
        std::fs::write(&bad, b"not an image").expect("write");

        let list = load_descriptors(&[bad, good.clone()], false);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].key, path_key(&good));
        assert_eq!((list[0].width, list[0].height), (3, 5));
    }
}
