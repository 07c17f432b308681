use treepack_core::config::PackerConfig;
use treepack_core::error::TreePackError;
use treepack_core::{ImageDescriptor, SkipReason, pack_images, pack_layout};

#[test]
fn test_zero_width() {
    let cfg = PackerConfig {
        page_width: 0,
        page_height: 1024,
        ..Default::default()
    };

    match cfg.validate() {
        Err(TreePackError::InvalidDimensions { width, height }) => {
            assert_eq!(width, 0);
            assert_eq!(height, 1024);
        }
        _ => panic!("Expected InvalidDimensions error"),
    }
}

#[test]
fn test_padding_consumes_page() {
    let cfg = PackerConfig {
        page_width: 64,
        page_height: 64,
        padding: 64,
        ..Default::default()
    };

    match cfg.validate() {
        Err(TreePackError::InvalidConfig(msg)) => assert!(msg.contains("padding")),
        _ => panic!("Expected InvalidConfig error"),
    }
}

#[test]
fn test_defaults_are_reference_values() {
    let cfg = PackerConfig::default();
    assert_eq!((cfg.page_width, cfg.page_height), (2048, 2048));
    assert_eq!(cfg.padding, 0);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_empty_input() {
    let result = pack_images(Vec::new(), PackerConfig::default());
    assert!(matches!(result, Err(TreePackError::Empty)));
}

#[test]
fn test_only_zero_sized_input_is_empty() {
    let inputs = vec![
        ImageDescriptor::new("a", 0, 10),
        ImageDescriptor::new("b", 10, 0),
    ];
    let result = pack_images(inputs, PackerConfig::default());
    assert!(matches!(result, Err(TreePackError::Empty)));
}

#[test]
fn test_zero_sized_images_dropped_silently() {
    let out = pack_layout(
        vec![("a", 0u32, 10u32), ("b", 4, 4)],
        PackerConfig::default(),
    )
    .expect("pack");
    assert_eq!(out.report.placed, 1);
    // Dropped before ordering, so never reported.
    assert_eq!(out.report.count(SkipReason::ZeroSized), 0);
}

#[test]
fn test_image_exactly_page_size() {
    let cfg = PackerConfig {
        page_width: 100,
        page_height: 50,
        ..Default::default()
    };
    let out = pack_layout(vec![("full", 100u32, 50u32), ("next", 1, 1)], cfg).expect("pack");
    assert_eq!(out.atlas.pages.len(), 2);
    assert_eq!(out.atlas.pages[0].placements[0].key, "full");
    assert_eq!(out.atlas.pages[1].placements[0].key, "next");
}

#[test]
fn test_one_pixel_images_fill_page() {
    let cfg = PackerConfig {
        page_width: 4,
        page_height: 4,
        compose: false,
        ..Default::default()
    };
    let items: Vec<(String, u32, u32)> = (0..17).map(|i| (format!("p{:02}", i), 1, 1)).collect();
    let out = pack_layout(items, cfg).expect("pack");
    assert_eq!(out.atlas.pages.len(), 2);
    assert_eq!(out.atlas.pages[0].placements.len(), 16);
    assert_eq!(out.atlas.pages[1].placements.len(), 1);
}

#[test]
fn test_non_square_page_height_oversize() {
    let cfg = PackerConfig {
        page_width: 512,
        page_height: 128,
        ..Default::default()
    };
    let out = pack_layout(vec![("tall", 10u32, 129u32)], cfg).expect("pack");
    assert_eq!(out.report.count(SkipReason::Oversized), 1);
    assert!(out.atlas.pages.is_empty());
}
