use image::{Rgb, RgbImage};
use skintelli_core::{
    AnalysisError, Compositor, Feature, FeatureDetector, HeuristicAnalyzer, RednessDetector,
    ScoreMap, SeverityTier, SkinAnalyzer, transform,
};
use skintelli_utils::config::RednessSettings;

fn fill_rect(image: &mut RgbImage, left: u32, top: u32, width: u32, height: u32, color: [u8; 3]) {
    for y in top..top + height {
        for x in left..left + width {
            image.put_pixel(x, y, Rgb(color));
        }
    }
}

/// Deterministic pseudo-random texture.
fn noisy_image(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    RgbImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let [a, b, c, _] = state.to_le_bytes();
        Rgb([a, b, c])
    })
}

fn busy_image() -> RgbImage {
    let mut image = RgbImage::from_pixel(160, 120, Rgb([205, 170, 150]));
    fill_rect(&mut image, 10, 10, 30, 25, [90, 60, 50]);
    fill_rect(&mut image, 90, 20, 40, 30, [230, 60, 60]);
    fill_rect(&mut image, 50, 70, 20, 20, [250, 245, 240]);
    for x in (100..150).step_by(4) {
        fill_rect(&mut image, x, 80, 2, 30, [40, 40, 40]);
    }
    image
}

#[test]
fn uniform_images_are_clear() {
    let analyzer = HeuristicAnalyzer::default();
    for (size, color) in [
        ((64, 64), [128, 128, 128]),
        ((100, 80), [224, 172, 150]),
        ((70, 90), [30, 30, 30]),
        ((64, 64), [255, 255, 255]),
    ] {
        let image = RgbImage::from_pixel(size.0, size.1, Rgb(color));
        let result = analyzer.analyze(&image).expect("analyze");
        assert_eq!(result.tier, SeverityTier::None, "{color:?}");
        assert!(result.regions.is_empty());
        assert_eq!(result.affected_fraction, 0.0);
        assert_eq!(result.mean_severity, 0.0);
        assert_eq!(result.overlay, image, "zero scores leave the photo untouched");
    }
}

#[test]
fn fraction_and_mean_stay_in_unit_range() {
    let analyzer = HeuristicAnalyzer::default();
    for image in [noisy_image(96, 64, 1), noisy_image(64, 128, 7), busy_image()] {
        let result = analyzer.analyze(&image).expect("analyze");
        assert!((0.0..=1.0).contains(&result.affected_fraction));
        assert!((0.0..=1.0).contains(&result.mean_severity));
        for feature in Feature::ALL {
            assert!((0.0..=1.0).contains(&result.feature_scores.get(feature)));
        }
    }
}

#[test]
fn redness_increases_with_saturation() {
    let detector = RednessDetector::new(RednessSettings::default());
    let mut previous = -1.0f32;
    for gb in [120u8, 80, 40] {
        let mut image = RgbImage::from_pixel(64, 64, Rgb([128, 128, 128]));
        fill_rect(&mut image, 24, 24, 16, 16, [200, gb, gb]);
        let planes = transform(&image).expect("transform");
        let map = detector.detect(&image, &planes).expect("detect");
        let score = map.get(30, 30);
        assert!(score > previous, "score {score} not above {previous}");
        previous = score;
    }
}

#[test]
fn repeated_analysis_is_bit_identical() {
    let analyzer = HeuristicAnalyzer::default();
    let image = busy_image();
    let first = analyzer.analyze(&image).expect("analyze");
    for _ in 0..3 {
        assert_eq!(analyzer.analyze(&image).expect("analyze"), first);
    }
}

#[test]
fn regions_are_ordered_by_area_then_position() {
    let mut image = RgbImage::from_pixel(200, 200, Rgb([180, 180, 180]));
    fill_rect(&mut image, 100, 100, 20, 20, [60, 60, 60]);
    fill_rect(&mut image, 120, 20, 30, 30, [60, 60, 60]);
    fill_rect(&mut image, 20, 100, 20, 20, [60, 60, 60]);

    let result = HeuristicAnalyzer::default().analyze(&image).expect("analyze");
    let summary: Vec<(u32, u32, u32)> = result
        .regions
        .iter()
        .map(|r| (r.area, r.bounds.left, r.bounds.top))
        .collect();
    assert_eq!(summary, [(900, 120, 20), (400, 20, 100), (400, 100, 100)]);
    assert!(
        result
            .regions
            .iter()
            .all(|r| r.dominant_feature == Feature::DarkSpot)
    );
}

#[test]
fn five_percent_is_medium_and_just_under_one_percent_is_none() {
    let compositor = Compositor::default();
    let zeros = ScoreMap::zeros(100, 100);
    let rect = |left: u32, top: u32, w: u32, h: u32| {
        ScoreMap::from_fn(100, 100, |x, y| {
            if x >= left && x < left + w && y >= top && y < top + h { 0.6 } else { 0.0 }
        })
    };

    let medium = compositor
        .composite(&zeros, &rect(30, 30, 25, 20), &zeros, &zeros)
        .expect("composite");
    assert_eq!(medium.affected_fraction, 0.05);
    assert_eq!(medium.tier(0.75), SeverityTier::Medium);

    let none = compositor
        .composite(&rect(40, 40, 9, 11), &zeros, &zeros, &zeros)
        .expect("composite");
    assert_eq!(none.affected_fraction, 0.0099);
    assert_eq!(none.tier(0.75), SeverityTier::None);
}

#[test]
fn single_dark_blob_becomes_one_dark_spot_region() {
    // 36 × 36 = 1296 pixels, about 2% of 256 × 256.
    let mut image = RgbImage::from_pixel(256, 256, Rgb([180, 180, 180]));
    fill_rect(&mut image, 100, 90, 36, 36, [110, 110, 110]);

    let result = HeuristicAnalyzer::default().analyze(&image).expect("analyze");
    assert_eq!(result.regions.len(), 1);
    let region = &result.regions[0];
    assert_eq!(region.dominant_feature, Feature::DarkSpot);
    assert_eq!(region.area, 1296);
    assert_eq!((region.bounds.left, region.bounds.top), (100, 90));
    assert!((result.affected_fraction - 1296.0 / 65536.0).abs() < 1e-12);
    assert_eq!(result.tier, SeverityTier::Low);
    assert!(result.has_issues());
}

#[test]
fn overlay_matches_input_dimensions() {
    let analyzer = HeuristicAnalyzer::default();
    for (w, h) in [(64, 64), (257, 131), (64, 700), (1024, 64)] {
        let image = noisy_image(w, h, w ^ h);
        let result = analyzer.analyze(&image).expect("analyze");
        assert_eq!(result.overlay.dimensions(), (w, h));
    }
}

#[test]
#[ignore = "allocates several 4096x4096 planes; run with --ignored in release builds"]
fn overlay_matches_largest_supported_input() {
    let image = RgbImage::from_pixel(4096, 4096, Rgb([200, 160, 140]));
    let result = HeuristicAnalyzer::default().analyze(&image).expect("analyze");
    assert_eq!(result.overlay.dimensions(), (4096, 4096));
    assert_eq!(result.tier, SeverityTier::None);
}

#[test]
fn zero_area_input_is_rejected() {
    let err = HeuristicAnalyzer::default()
        .analyze(&RgbImage::new(10, 0))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
}
