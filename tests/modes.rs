use image::{Rgb, Rgba, RgbaImage};
use segfx::render::{
    CompositeOptions, MaskCompositor, OutputImagePair, OverlayRenderer, OVERLAY_ALPHA, PALETTE,
};
use segfx::segmentation::{
    BoundingBox, Mask, MaskPostprocessor, PostprocessConfig, SegmentationBatch,
    SegmentationResult,
};
use std::borrow::Cow;

fn frame() -> RgbaImage {
    RgbaImage::from_fn(4, 4, |x, y| Rgba([x as u8 * 60, y as u8 * 60, 200, 255]))
}

/// Two instances of different classes: left half and right half
fn two_instance_batch() -> SegmentationBatch {
    let left = Mask::from_rows(&[[1u8, 1, 0, 0]; 4]).unwrap();
    let right = Mask::from_rows(&[[0u8, 0, 1, 1]; 4]).unwrap();
    SegmentationBatch::new(vec![
        SegmentationResult::new(left, BoundingBox::for_class(0)),
        SegmentationResult::new(right, BoundingBox::for_class(16)),
    ])
}

fn options(separate_output: bool, mask_only: bool) -> CompositeOptions {
    CompositeOptions {
        separate_output,
        mask_only,
    }
}

fn paint(color: Rgb<u8>) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], OVERLAY_ALPHA])
}

#[test]
fn every_mode_returns_documented_outputs() {
    let original = frame();
    let batch = two_instance_batch();
    let mut compositor = MaskCompositor::new();

    let cases = [
        (options(true, true), 2, false),
        (options(true, false), 2, true),
        (options(false, true), 1, false),
        (options(false, false), 1, true),
    ];

    for (opts, count, has_overlay) in cases {
        let outputs = compositor.compose(&original, &batch, opts).unwrap();
        assert_eq!(outputs.len(), count, "{opts:?}");
        for pair in &outputs {
            assert_eq!(pair.overlay.is_some(), has_overlay, "{opts:?}");
            assert_eq!(pair.base.dimensions(), (4, 4));
        }
    }
}

#[test]
fn empty_batch_yields_nothing() {
    let original = frame();
    let mut compositor = MaskCompositor::new();
    for (separate, mask_only) in [(true, true), (true, false), (false, true), (false, false)] {
        let outputs = compositor
            .compose(&original, &SegmentationBatch::default(), options(separate, mask_only))
            .unwrap();
        assert!(outputs.is_empty());
    }
}

#[test]
fn per_instance_masks_black_out_other_instances() {
    let original = frame();
    let mut compositor = MaskCompositor::new();
    let outputs = compositor
        .compose(&original, &two_instance_batch(), options(true, true))
        .unwrap();

    let left = &outputs[0].base;
    assert_eq!(left.get_pixel(1, 2), original.get_pixel(1, 2));
    assert_eq!(left.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));

    let right = &outputs[1].base;
    assert_eq!(right.get_pixel(1, 2), &Rgba([0, 0, 0, 255]));
    assert_eq!(right.get_pixel(3, 0), original.get_pixel(3, 0));
}

#[test]
fn combined_mask_keeps_union() {
    let original = frame();
    let mut compositor = MaskCompositor::new();
    let outputs = compositor
        .compose(&original, &two_instance_batch(), options(false, true))
        .unwrap();

    // The two halves cover the whole frame
    assert_eq!(&*outputs[0].base, &original);
    assert!(matches!(outputs[0].base, Cow::Owned(_)));
}

#[test]
fn overlay_modes_share_the_original() {
    let original = frame();
    let mut compositor = MaskCompositor::new();
    let outputs = compositor
        .compose(&original, &two_instance_batch(), options(true, false))
        .unwrap();

    for pair in &outputs {
        match &pair.base {
            Cow::Borrowed(base) => assert!(std::ptr::eq(*base, &original)),
            Cow::Owned(_) => panic!("overlay mode copied the original"),
        }
    }
}

#[test]
fn class_colors_are_stable_across_calls() {
    let original = frame();
    let mut compositor = MaskCompositor::new();

    let first = compositor
        .compose(&original, &two_instance_batch(), options(false, false))
        .unwrap();
    let overlay = first[0].overlay.as_ref().unwrap();
    assert_eq!(overlay.get_pixel(0, 0), &paint(PALETTE[0]));
    assert_eq!(overlay.get_pixel(3, 3), &paint(PALETTE[1]));

    // Same classes in reverse order keep their colors
    let mut reversed = two_instance_batch();
    reversed.results.reverse();
    let second = compositor
        .compose(&original, &reversed, options(false, false))
        .unwrap();
    let overlay = second[0].overlay.as_ref().unwrap();
    assert_eq!(overlay.get_pixel(0, 0), &paint(PALETTE[0]));
    assert_eq!(overlay.get_pixel(3, 3), &paint(PALETTE[1]));
}

#[test]
fn ninth_class_reuses_first_color() {
    let original = frame();
    let mut compositor = MaskCompositor::new();
    let full = Mask::from_rows(&[[1u8; 4]; 4]).unwrap();

    for class_id in 0..9 {
        let batch = SegmentationBatch::new(vec![SegmentationResult::new(
            full.clone(),
            BoundingBox::for_class(class_id * 10),
        )]);
        let outputs = compositor
            .compose(&original, &batch, options(false, false))
            .unwrap();
        let expected = PALETTE[class_id as usize % PALETTE.len()];
        assert_eq!(
            outputs[0].overlay.as_ref().unwrap().get_pixel(2, 2),
            &paint(expected)
        );
    }
    assert_eq!(compositor.colors().get(80), Some(PALETTE[0]));
}

#[test]
fn postprocessed_logits_feed_the_compositor() {
    let post = MaskPostprocessor::new(PostprocessConfig::default());
    let logits =
        ndarray::Array2::from_shape_fn((8, 8), |(_, x)| if x < 4 { 1.0f32 } else { -1.0 });
    let mask = post.process(logits.view(), 4, 4).unwrap();

    let original = frame();
    let batch = SegmentationBatch::new(vec![SegmentationResult::new(
        mask,
        BoundingBox::for_class(2),
    )]);
    let outputs = MaskCompositor::new()
        .compose(&original, &batch, options(false, true))
        .unwrap();

    let base = &outputs[0].base;
    assert_eq!(base.get_pixel(1, 1), original.get_pixel(1, 1));
    assert_eq!(base.get_pixel(2, 1), &Rgba([0, 0, 0, 255]));
}

#[test]
fn live_and_batch_paths_keep_separate_colors() {
    let original = frame();
    let mut compositor = MaskCompositor::new();
    let mut renderer = OverlayRenderer::new(8, 8);

    // Batch path sees class 16 first, live path sees class 0 first
    let mut reversed = two_instance_batch();
    reversed.results.reverse();
    compositor
        .compose(&original, &reversed, options(false, false))
        .unwrap();
    renderer.set_results(two_instance_batch(), 4, 4);

    assert_eq!(compositor.colors().get(16), Some(PALETTE[0]));
    assert_eq!(renderer.colors().get(0), Some(PALETTE[0]));
    assert_eq!(renderer.colors().get(16), Some(PALETTE[1]));

    let mut surface = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
    renderer.draw(&mut surface).unwrap();
    // Left half tinted toward class 0's color, right half toward class 16's
    assert_ne!(surface.get_pixel(1, 1), &Rgba([0, 0, 0, 255]));
    assert_ne!(surface.get_pixel(6, 6), &Rgba([0, 0, 0, 255]));
    assert_ne!(surface.get_pixel(1, 1), surface.get_pixel(6, 6));
}

#[test]
fn flattened_pair_tints_foreground() {
    let original = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
    let mut compositor = MaskCompositor::new();
    let outputs: Vec<OutputImagePair> = compositor
        .compose(&original, &two_instance_batch(), options(false, false))
        .unwrap();

    let flat = outputs[0].flatten().unwrap();
    assert_eq!(flat.dimensions(), (4, 4));
    assert!(flat.pixels().all(|p| p[3] >= 254));
    assert_ne!(flat.get_pixel(0, 0), flat.get_pixel(3, 0));
}
