use image::{Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use treepack_core::prelude::*;

fn solid(key: &str, w: u32, h: u32, color: [u8; 4]) -> ImageDescriptor {
    ImageDescriptor::from_rgba(key, RgbaImage::from_pixel(w, h, Rgba(color)))
}

fn frame_of(page: &Page, key: &str) -> Option<Rect> {
    page.placements.iter().find(|p| p.key == key).map(|p| p.frame)
}

#[test]
fn three_squares_share_one_page() {
    let cfg = PackerConfig::builder().with_page_size(256, 256).build();
    let inputs = vec![
        solid("a", 100, 100, [255, 0, 0, 255]),
        solid("b", 100, 100, [0, 255, 0, 255]),
        solid("c", 50, 50, [0, 0, 255, 255]),
    ];
    let out = pack_images(inputs, cfg).expect("pack");
    assert_eq!(out.pages.len(), 1);
    let page = &out.atlas.pages[0];
    assert_eq!(frame_of(page, "a"), Some(Rect::new(0, 0, 100, 100)));
    // Side by side: the first 100px band is split along x.
    assert_eq!(frame_of(page, "b"), Some(Rect::new(100, 0, 100, 100)));
    assert_eq!(frame_of(page, "c"), Some(Rect::new(200, 0, 50, 50)));

    let rgba = out.pages[0].rgba.as_ref().expect("canvas");
    assert_eq!(*rgba.get_pixel(99, 99), Rgba([255, 0, 0, 255]));
    assert_eq!(*rgba.get_pixel(100, 0), Rgba([0, 255, 0, 255]));
    assert_eq!(*rgba.get_pixel(249, 49), Rgba([0, 0, 255, 255]));
    assert_eq!(*rgba.get_pixel(250, 0), Rgba([0, 0, 0, 0]));
}

#[test]
fn oversized_image_is_skipped_others_placed() {
    let cfg = PackerConfig::builder()
        .with_page_size(2048, 2048)
        .compose(false)
        .build();
    let out = pack_images(
        vec![
            ImageDescriptor::new("wide", 2049, 100),
            ImageDescriptor::new("ok", 64, 64),
        ],
        cfg,
    )
    .expect("pack");
    assert_eq!(out.report.placed, 1);
    assert_eq!(
        out.report.skipped,
        vec![SkippedImage {
            key: "wide".into(),
            reason: SkipReason::Oversized
        }]
    );
    assert!(!out.report.has_defects());
    assert_eq!(out.atlas.pages.len(), 1);
    assert!(frame_of(&out.atlas.pages[0], "wide").is_none());
}

#[test]
fn only_oversized_image_yields_no_pages() {
    let cfg = PackerConfig::default();
    let out = pack_layout(vec![("wide", 2049u32, 100u32)], cfg).expect("pack");
    assert!(out.pages.is_empty());
    assert_eq!(out.report.placed, 0);
    assert_eq!(out.report.count(SkipReason::Oversized), 1);
}

#[test]
fn duplicate_key_first_wins() {
    let cfg = PackerConfig::builder().with_page_size(64, 64).build();
    let inputs = vec![
        solid("same", 10, 10, [255, 0, 0, 255]),
        solid("same", 10, 10, [0, 0, 255, 255]),
    ];
    let out = pack_images(inputs, cfg).expect("pack");
    assert_eq!(out.report.placed, 1);
    assert_eq!(out.report.count(SkipReason::Duplicate), 1);

    let page = &out.pages[0];
    assert_eq!(page.page.placements.len(), 1);
    assert_eq!(to_index_string(&page.page), "same 0 0 10 10\n");
    let rgba = page.rgba.as_ref().expect("canvas");
    assert_eq!(*rgba.get_pixel(5, 5), Rgba([255, 0, 0, 255]));
}

#[test]
fn duplicate_key_is_rejected_across_pages() {
    let cfg = PackerConfig::builder()
        .with_page_size(32, 32)
        .compose(false)
        .build();
    let out = pack_layout(vec![("a", 32, 32), ("b", 32, 32), ("a", 16, 16)], cfg).expect("pack");
    assert_eq!(out.atlas.pages.len(), 2);
    assert_eq!(out.report.count(SkipReason::Duplicate), 1);
    let total: usize = out.atlas.pages.iter().map(|p| p.placements.len()).sum();
    assert_eq!(total, 2);
}

#[test]
fn overflow_opens_second_page() {
    let cfg = PackerConfig::builder()
        .with_page_size(128, 128)
        .compose(false)
        .build();
    let items: Vec<(String, u32, u32)> = (0..5).map(|i| (format!("t{}", i), 64, 64)).collect();
    let out = pack_layout(items, cfg).expect("pack");
    assert_eq!(out.atlas.pages.len(), 2);
    assert_eq!(out.atlas.pages[0].placements.len(), 4);
    assert_eq!(out.atlas.pages[1].placements.len(), 1);
    assert_eq!(frame_of(&out.atlas.pages[1], "t4"), Some(Rect::new(0, 0, 64, 64)));
    assert!(out.report.all_placed());
}

#[test]
fn earlier_pages_are_preferred() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    let images = order_descriptors(
        (0..400)
            .map(|i| {
                ImageDescriptor::new(
                    format!("i{}", i),
                    rng.gen_range(2..=60),
                    rng.gen_range(2..=60),
                )
            })
            .collect(),
        &SortOrder::AreaDesc,
    );
    let cfg = PackerConfig::builder()
        .with_page_size(160, 160)
        .compose(false)
        .build();
    let mut driver = PackingDriver::new(cfg).expect("driver");
    for img in &images {
        let expected = driver
            .pages()
            .iter()
            .position(|p| p.can_insert(img))
            .unwrap_or(driver.pages().len());
        match driver.place(img).expect("place") {
            Outcome::Placed { page, .. } => assert_eq!(page, expected, "{}", img.key),
            Outcome::Skipped(reason) => panic!("{} skipped: {:?}", img.key, reason),
        }
    }
    assert!(driver.pages().len() > 1);
}
