//! Tests for distance field generation

use std::io::Cursor;
use std::path::Path;

use crate::generator::{GenerationRequest, Generator, kernel_radius};
use crate::intake::{self, FileDrop, PNG_MIME, mime_for_path};
use crate::kernel::{
    Coord, DistanceFieldKernel, FeatureAtlas, FeatureRecord, FeatureResolvePass, Kernel, ResolveMode,
    signed_alpha, source_index,
};
use crate::raster::{Raster, Rgba};
use crate::session::{MakerConfig, SdfMaker};
use crate::settings::{NumericSetting, OutputSettings};
use crate::gpu::surface::{MAX_GPU_SOURCE_SIDE, check_source_size};
use crate::surface::CpuSurface;
use crate::{GpuSurface, SdfError, parse_args};

const BACKGROUND: Rgba = Rgba { r: 0.2, g: 0.3, b: 0.4, a: 0.0 };

/// Foreground texels are colored by position so color lookups are traceable
fn mask_raster(w: u32, h: u32, is_fg: impl Fn(u32, u32) -> bool) -> Raster {
    Raster::from_fn(w, h, |x, y| {
        if is_fg(x, y) {
            Rgba::new(x as f32 / w as f32, y as f32 / h as f32, 1.0, 1.0)
        } else {
            BACKGROUND
        }
    })
}

fn rect_raster(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Raster {
    mask_raster(w, h, |x, y| x >= x0 && x < x1 && y >= y0 && y < y1)
}

fn png_bytes(raster: &Raster) -> Vec<u8> {
    let image = image::RgbaImage::from_raw(raster.width(), raster.height(), raster.to_rgba8())
        .expect("buffer matches dimensions");
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("png encode");
    bytes
}

/// Exhaustive squared distance to the nearest opposite-class texel, with
/// everything outside the raster counted as background
fn exact_dist2(source: &Raster, x: u32, y: u32) -> u64 {
    let base = source.get(x, y).is_foreground();
    let (w, h) = source.dimensions();
    let mut best = u64::MAX;
    for sy in -1..=h as i64 {
        for sx in -1..=w as i64 {
            if source.fetch(sx, sy).is_foreground() == base {
                continue;
            }
            let dx = sx - x as i64;
            let dy = sy - y as i64;
            best = best.min((dx * dx + dy * dy) as u64);
        }
    }
    best
}

fn assert_close(a: f32, b: f32, what: &str) {
    assert!((a - b).abs() < 1e-5, "{}: {} vs {}", what, a, b);
}

// ============================================================================
// Radius derivation and coordinate mapping
// ============================================================================

#[test]
fn test_kernel_radius_downsample() {
    assert_eq!(kernel_radius(64, 64, 16, 16, 2), 8);
}

#[test]
fn test_kernel_radius_takes_larger_axis() {
    // x shrinks 10×, y not at all
    assert_eq!(kernel_radius(100, 50, 10, 50, 1), 10);
    // Non-integer ratio rounds up
    assert_eq!(kernel_radius(100, 100, 30, 30, 1), 4);
}

#[test]
fn test_kernel_radius_upsample_never_below_one() {
    assert_eq!(kernel_radius(16, 16, 64, 64, 1), 1);
    assert_eq!(kernel_radius(16, 16, 64, 64, 3), 1);
    assert_eq!(kernel_radius(16, 16, 64, 64, 5), 2);
}

#[test]
fn test_source_index_mapping() {
    for i in 0..37 {
        assert_eq!(source_index(i, 37, 37), i, "same size maps one to one");
    }
    // 64 -> 16: every fourth source texel
    assert_eq!(source_index(0, 16, 64), 0);
    assert_eq!(source_index(1, 16, 64), 4);
    assert_eq!(source_index(15, 16, 64), 60);
    // Upsampling never reads past the last texel
    assert_eq!(source_index(63, 64, 16), 15);
    assert_eq!(source_index(0, 64, 16), 0);
}

// ============================================================================
// Brute-force kernel
// ============================================================================

#[test]
fn test_signed_alpha_formula() {
    assert_close(signed_alpha(true, 0, 4), 0.5, "fg at zero");
    assert_close(signed_alpha(false, 4, 4), 0.25, "bg at distance 2 of 4");
    assert_close(signed_alpha(true, 4, 4), 0.75, "fg at distance 2 of 4");
    assert_close(signed_alpha(false, 1000, 4), 0.0, "bg saturates");
    assert_close(signed_alpha(true, 1000, 4), 1.0, "fg saturates");
}

#[test]
fn test_brute_force_saturates_beyond_radius() {
    let radius = 3;
    let source = mask_raster(21, 21, |x, y| (x, y) == (10, 10));
    let output = DistanceFieldKernel::new(radius).render(&source, 21, 21);

    for y in 0..21 {
        for x in 0..21 {
            let d2 = exact_dist2(&source, x, y);
            let alpha = output.get(x, y).a;
            if (x, y) == (10, 10) {
                assert_close(alpha, 0.5 + 0.5 / radius as f32, "lone foreground pixel");
            } else if d2 >= (radius * radius) as u64 {
                assert_eq!(alpha, 0.0, "background at ({}, {}) should saturate", x, y);
            } else {
                assert!(alpha > 0.0 && alpha < 0.5, "({}, {}) alpha {}", x, y, alpha);
            }
        }
    }

    // Solid foreground, far from the raster edge
    let solid = mask_raster(21, 21, |_, _| true);
    let output = DistanceFieldKernel::new(radius).render(&solid, 21, 21);
    assert_eq!(output.get(10, 10).a, 1.0);
    // Edge texels see the outside as background at distance 1
    assert_close(output.get(0, 10).a, 0.5 + 0.5 / radius as f32, "edge texel");
}

#[test]
fn test_brute_force_alpha_monotonic_in_distance() {
    let radius = 8;
    // Left 20 columns foreground
    let source = mask_raster(40, 33, |x, _| x < 20);
    let output = DistanceFieldKernel::new(radius).render(&source, 40, 33);
    let y = 16;

    let mut previous = f32::NEG_INFINITY;
    for x in 20..40 {
        let magnitude = (output.get(x, y).a - 0.5).abs();
        assert!(magnitude >= previous, "background magnitude dropped at x={}", x);
        assert!(output.get(x, y).a <= 0.5);
        previous = magnitude;
    }
    assert_eq!(output.get(39, y).a, 0.0);

    let mut previous = f32::NEG_INFINITY;
    for x in (12..20).rev() {
        let magnitude = (output.get(x, y).a - 0.5).abs();
        assert!(magnitude >= previous, "foreground magnitude dropped at x={}", x);
        assert!(output.get(x, y).a >= 0.5);
        previous = magnitude;
    }
    assert_eq!(output.get(12, y).a, 1.0);
}

#[test]
fn test_brute_force_color_bleeds_into_background_only() {
    let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
    let green = Rgba::new(0.0, 1.0, 0.0, 1.0);
    // Row: [red, green, bg, bg, bg, bg, bg]
    let source = Raster::from_fn(7, 1, |x, _| match x {
        0 => red,
        1 => green,
        _ => BACKGROUND,
    });
    let output = DistanceFieldKernel::new(3).render(&source, 7, 1);

    // Foreground keeps its own color even with a different neighbor
    assert_eq!(output.get(0, 0).r, 1.0);
    assert_eq!(output.get(1, 0).g, 1.0);
    // Background within range takes the nearest foreground color
    assert_eq!((output.get(2, 0).r, output.get(2, 0).g), (0.0, 1.0));
    assert_eq!((output.get(3, 0).r, output.get(3, 0).g), (0.0, 1.0));
    // Exactly at the radius nothing is closer than the initial r², own color stays
    assert_eq!(output.get(4, 0).b, BACKGROUND.b);
    assert_eq!(output.get(6, 0).b, BACKGROUND.b);
}

// ============================================================================
// Propagation atlas
// ============================================================================

#[test]
fn test_pass_count() {
    assert_eq!(FeatureAtlas::pass_count(1, 1), 0);
    assert_eq!(FeatureAtlas::pass_count(2, 1), 3);
    assert_eq!(FeatureAtlas::pass_count(16, 16), 6);
    assert_eq!(FeatureAtlas::pass_count(17, 3), 7);
    assert_eq!(FeatureAtlas::pass_count(33, 17), 8);

    // Halving steps, then the two refinement steps
    let steps: Vec<u32> = FeatureAtlas::steps(16, 9).collect();
    assert_eq!(steps, vec![8, 4, 2, 1, 2, 1]);
    assert_eq!(FeatureAtlas::steps(1, 1).count(), 0);
}

#[test]
fn test_atlas_single_pixel_converges_everywhere() {
    for (w, h) in [(1, 1), (7, 5), (16, 16), (33, 17), (64, 1), (1, 40), (100, 63)] {
        let source = mask_raster(w, h, |x, y| (x, y) == (0, 0));
        let atlas = FeatureAtlas::build(&source);
        assert_eq!(atlas.passes(), FeatureAtlas::pass_count(w, h));

        for y in 0..h {
            for x in 0..w {
                assert_eq!(
                    atlas.nearest_foreground(x, y),
                    Some(Coord::new(0, 0)),
                    "{}x{} grid, cell ({}, {})",
                    w,
                    h,
                    x,
                    y
                );
            }
        }
    }
}

#[test]
fn test_atlas_matches_exhaustive_search_for_rectangle() {
    let source = rect_raster(37, 23, 9, 5, 21, 15);
    let atlas = FeatureAtlas::build(&source);

    for y in 0..23 {
        for x in 0..37 {
            let cell = Coord::new(x, y);
            let fg = atlas.nearest_foreground(x, y).expect("has foreground");
            let bg = atlas.nearest_background(x, y).expect("has background");
            assert!(source.get(fg.x, fg.y).is_foreground());
            assert!(!source.get(bg.x, bg.y).is_foreground());

            // Nearest foreground of an outside cell is its clamp onto the rectangle
            let clamped = Coord::new(x.clamp(9, 20), y.clamp(5, 14));
            assert_eq!(cell.dist2(fg), cell.dist2(clamped), "fg distance at ({}, {})", x, y);

            if source.get(x, y).is_foreground() {
                let sides = [x - 8, 21 - x, y - 4, 15 - y];
                let nearest = *sides.iter().min().unwrap() as u64;
                assert_eq!(cell.dist2(bg), nearest * nearest, "bg distance at ({}, {})", x, y);
            } else {
                assert_eq!(bg, cell);
            }
        }
    }
}

#[test]
fn test_atlas_without_foreground_reports_none() {
    let source = mask_raster(9, 6, |_, _| false);
    let atlas = FeatureAtlas::build(&source);
    for y in 0..6 {
        for x in 0..9 {
            assert_eq!(atlas.nearest_foreground(x, y), None);
            // Unknown fields keep pointing at the cell itself
            assert_eq!(atlas.record(x, y).foreground, Coord::new(x, y));
        }
    }
}

#[test]
fn test_feature_record_packing() {
    let record = FeatureRecord {
        foreground: Coord::new(513, 7),
        background: Coord::new(0, 65535),
    };
    let packed = record.pack();
    assert_eq!(packed[0], 513 | (7 << 16));
    assert_eq!(packed[1], 65535 << 16);
    assert_eq!(FeatureRecord::unpack(packed), record);
}

// ============================================================================
// Resolve pass
// ============================================================================

#[test]
fn test_resolve_distance_agrees_with_brute_force() {
    let shapes = [
        ("rectangle", rect_raster(37, 23, 9, 5, 21, 15)),
        ("half plane", mask_raster(30, 12, |x, _| x < 11)),
        ("single pixel", mask_raster(15, 15, |x, y| (x, y) == (4, 9))),
        ("corner block", rect_raster(20, 20, 0, 0, 6, 6)),
    ];

    for (name, source) in &shapes {
        let atlas = FeatureAtlas::build(source);
        // 500 is past every shape's extent
        for radius in [1, 3, 8, 40, 500] {
            let brute = DistanceFieldKernel::new(radius).render(source, source.width(), source.height());
            let flood = FeatureResolvePass::new(ResolveMode::Distance, radius).render(
                &atlas,
                source,
                source.width(),
                source.height(),
            );
            for (i, (a, b)) in brute.texels().iter().zip(flood.texels()).enumerate() {
                assert!(
                    (a.a - b.a).abs() < 1e-6,
                    "{} r={} texel {}: brute {} vs flood {}",
                    name,
                    radius,
                    i,
                    a.a,
                    b.a
                );
                assert_eq!((a.r, a.g, a.b), (b.r, b.g, b.b), "{} r={} color at texel {}", name, radius, i);
            }
        }
    }
}

/// Deterministic xorshift stream for scattered test masks
fn scatter(seed: u32) -> impl FnMut() -> u32 {
    let mut state = seed.max(1);
    move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state
    }
}

#[test]
fn test_resolve_distance_agrees_with_brute_force_on_scattered_masks() {
    let (w, h) = (48, 40);
    let radius = 40;
    let mut mismatched = 0;
    let mut worst = 0.0f32;

    for seed in 1..=40u32 {
        let mut next = scatter(seed.wrapping_mul(0x9e37_79b9));
        // Roughly 4% foreground
        let mask: Vec<bool> = (0..w * h).map(|_| next() % 100 < 4).collect();
        let source = mask_raster(w, h, |x, y| mask[(y * w + x) as usize]);

        let atlas = FeatureAtlas::build(&source);
        let brute = DistanceFieldKernel::new(radius).render(&source, w, h);
        let flood = FeatureResolvePass::new(ResolveMode::Distance, radius).render(&atlas, &source, w, h);

        for (a, b) in brute.texels().iter().zip(flood.texels()) {
            let diff = (a.a - b.a).abs();
            if diff > 1e-6 {
                mismatched += 1;
            }
            worst = worst.max(diff);
        }
    }

    println!("mismatched texels: {}, worst alpha diff: {}", mismatched, worst);
    assert_eq!(mismatched, 0, "worst alpha diff {}", worst);
}

#[test]
fn test_resolve_fill_reads_own_class() {
    let source = rect_raster(12, 8, 3, 2, 7, 6);
    let atlas = FeatureAtlas::build(&source);
    let output = FeatureResolvePass::new(ResolveMode::Fill, 2).render(&atlas, &source, 12, 8);

    for y in 0..8 {
        for x in 0..12 {
            let texel = output.get(x, y);
            let own = source.get(x, y);
            assert_eq!(texel.a, 1.0);
            assert_eq!((texel.r, texel.g, texel.b), (own.r, own.g, own.b), "({}, {})", x, y);
        }
    }
}

#[test]
fn test_resolve_bleed_fills_background_with_nearest_foreground() {
    let source = rect_raster(12, 8, 3, 2, 7, 6);
    let atlas = FeatureAtlas::build(&source);
    let output = FeatureResolvePass::new(ResolveMode::Bleed, 1).render(&atlas, &source, 12, 8);

    for y in 0..8 {
        for x in 0..12 {
            let clamped = source.get(x.clamp(3, 6), y.clamp(2, 5));
            let texel = output.get(x, y);
            assert_eq!(texel.a, 1.0);
            assert_eq!((texel.r, texel.g), (clamped.r, clamped.g), "({}, {})", x, y);
        }
    }

    // Nothing to bleed from: background keeps its own color
    let empty = mask_raster(4, 4, |_, _| false);
    let atlas = FeatureAtlas::build(&empty);
    let output = FeatureResolvePass::new(ResolveMode::Bleed, 1).render(&atlas, &empty, 4, 4);
    assert_eq!(output.get(2, 2), BACKGROUND.with_alpha(1.0));
}

// ============================================================================
// Generator
// ============================================================================

fn request(src: (u32, u32), out: (u32, u32), radius: u32, kernel: Kernel) -> GenerationRequest {
    GenerationRequest {
        source_width: src.0,
        source_height: src.1,
        output_width: out.0,
        output_height: out.1,
        user_radius: radius,
        kernel,
    }
}

#[test]
fn test_generator_same_size_allocates_once() {
    let source = rect_raster(32, 32, 8, 8, 24, 24);
    let mut generator = Generator::new(CpuSurface::new());
    generator.set_source(&source).unwrap();

    let req = request((32, 32), (16, 16), 1, Kernel::BruteForce);
    generator.generate(&req).unwrap();
    generator.generate(&req).unwrap();
    assert_eq!(generator.surface().allocations(), 1);
    assert_eq!(generator.surface().dispatches(), 2);

    generator.generate(&request((32, 32), (8, 8), 1, Kernel::BruteForce)).unwrap();
    assert_eq!(generator.surface().allocations(), 2);
}

#[test]
fn test_generator_rebuilds_only_on_change() {
    let source = rect_raster(64, 64, 10, 10, 40, 50);
    let mut generator = Generator::new(CpuSurface::new());
    generator.set_source(&source).unwrap();

    generator.generate(&request((64, 64), (16, 16), 2, Kernel::BruteForce)).unwrap();
    assert_eq!(generator.compiled_radius(), Some(8));
    assert_eq!(generator.rebuilds(), 1);

    // Same derived radius from a different user radius/size pair
    generator.generate(&request((64, 64), (32, 32), 4, Kernel::BruteForce)).unwrap();
    assert_eq!(generator.rebuilds(), 1);

    generator.generate(&request((64, 64), (16, 16), 3, Kernel::BruteForce)).unwrap();
    assert_eq!(generator.compiled_radius(), Some(12));
    assert_eq!(generator.rebuilds(), 2);

    generator
        .generate(&request((64, 64), (16, 16), 3, Kernel::JumpFlood(ResolveMode::Distance)))
        .unwrap();
    assert_eq!(generator.rebuilds(), 3);
}

#[test]
fn test_generator_downsampled_kernels_agree() {
    let source = rect_raster(64, 64, 12, 20, 44, 52);
    let mut brute = Generator::new(CpuSurface::new());
    let mut flood = Generator::new(CpuSurface::new());
    brute.set_source(&source).unwrap();
    flood.set_source(&source).unwrap();

    let a = brute.generate(&request((64, 64), (16, 16), 2, Kernel::BruteForce)).unwrap().clone();
    let b = flood
        .generate(&request((64, 64), (16, 16), 2, Kernel::JumpFlood(ResolveMode::Distance)))
        .unwrap()
        .clone();

    assert_eq!(a.dimensions(), (16, 16));
    for (i, (ta, tb)) in a.texels().iter().zip(b.texels()).enumerate() {
        assert!((ta.a - tb.a).abs() < 1e-6, "texel {}: {} vs {}", i, ta.a, tb.a);
    }
    // The outer ring is more than 8 source pixels from the shape
    assert_eq!(a.get(0, 0).a, 0.0);
}

#[test]
fn test_generator_compile_failure_keeps_previous_output() {
    let source = rect_raster(64, 64, 16, 16, 48, 48);
    let mut generator = Generator::new(CpuSurface::new());
    generator.set_source(&source).unwrap();

    let good = request((64, 64), (16, 16), 1, Kernel::BruteForce);
    let before = generator.generate(&good).unwrap().clone();

    // A zero radius has no kernel
    let bad = request((64, 64), (16, 16), 0, Kernel::BruteForce);
    match generator.generate(&bad) {
        Err(SdfError::KernelCompileFailure { radius, .. }) => assert_eq!(radius, 0),
        other => panic!("expected compile failure, got {:?}", other.map(|r| r.dimensions())),
    }
    assert_eq!(generator.output(), &before);
    assert_eq!(generator.compiled_radius(), None);

    // Recovers on the next valid request
    assert_eq!(generator.generate(&good).unwrap(), &before);
}

#[test]
fn test_generator_large_downsample() {
    // Derived radius 4100 source pixels
    let source = rect_raster(8200, 4, 1000, 0, 7000, 4);
    let mut generator = Generator::new(CpuSurface::new());
    generator.set_source(&source).unwrap();

    let output = generator
        .generate(&request((8200, 4), (2, 1), 1, Kernel::JumpFlood(ResolveMode::Distance)))
        .unwrap();
    assert_eq!(output.dimensions(), (2, 1));
    assert_eq!(generator.compiled_radius(), Some(4100));
    // Output (0, 0) reads source (0, 0): background, 1000 px from the shape
    assert_close(generator.output().get(0, 0).a, 0.5 - 0.5 * 1000.0 / 4100.0, "left background");

    // Brute force takes the same radius and agrees
    let small = rect_raster(600, 3, 100, 0, 500, 3);
    let mut brute = Generator::new(CpuSurface::new());
    let mut flood = Generator::new(CpuSurface::new());
    brute.set_source(&small).unwrap();
    flood.set_source(&small).unwrap();
    let a = brute.generate(&request((600, 3), (1, 1), 5, Kernel::BruteForce)).unwrap().clone();
    let b = flood
        .generate(&request((600, 3), (1, 1), 5, Kernel::JumpFlood(ResolveMode::Distance)))
        .unwrap()
        .clone();
    assert_eq!(brute.compiled_radius(), Some(3000));
    assert_close(a.get(0, 0).a, b.get(0, 0).a, "brute vs flood at radius 3000");
    assert_close(a.get(0, 0).a, 0.5 - 0.5 * 100.0 / 3000.0, "nearest shape texel 100 px away");
}

#[test]
fn test_generator_radius_saturates() {
    assert_eq!(kernel_radius(16384, 1, 1, 1, u32::MAX), u32::MAX);

    let source = rect_raster(64, 64, 16, 16, 48, 48);
    let mut generator = Generator::new(CpuSurface::new());
    generator.set_source(&source).unwrap();
    generator
        .generate(&request((64, 64), (16, 16), u32::MAX, Kernel::JumpFlood(ResolveMode::Distance)))
        .unwrap();
    assert_eq!(generator.compiled_radius(), Some(u32::MAX));
}

#[test]
fn test_generator_rejects_mismatched_source_size() {
    let source = rect_raster(20, 10, 2, 2, 8, 8);
    let mut generator = Generator::new(CpuSurface::new());
    generator.set_source(&source).unwrap();

    let before = generator.generate(&request((20, 10), (20, 10), 2, Kernel::BruteForce)).unwrap().clone();
    let result = generator.generate(&request((40, 20), (20, 10), 1, Kernel::BruteForce));
    assert!(matches!(result, Err(SdfError::DispatchFailure(_))));
    assert_eq!(generator.output(), &before);
}

#[test]
fn test_generator_without_source() {
    let mut generator = Generator::new(CpuSurface::new());
    let result = generator.generate(&request((8, 8), (8, 8), 1, Kernel::BruteForce));
    assert!(matches!(result, Err(SdfError::NoSource)));
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_numeric_parse() {
    assert_eq!(NumericSetting::parse("12").unwrap(), 12);
    assert_eq!(NumericSetting::parse(" 12 ").unwrap(), 12);
    assert_eq!(NumericSetting::parse("12.0").unwrap(), 12);
    assert_eq!(NumericSetting::parse("-3").unwrap(), -3);
    for bad in ["", "abc", "1.5", "NaN", "inf", "12px"] {
        assert!(
            matches!(NumericSetting::parse(bad), Err(SdfError::InvalidNumericInput { .. })),
            "{:?} should be rejected",
            bad
        );
    }
}

#[test]
fn test_numeric_apply_input_clamps_and_resets() {
    let mut setting = NumericSetting::new(5, 1, 64);
    assert_eq!(setting.apply_input("100"), 64);
    assert_eq!(setting.apply_input("0"), 1);
    assert_eq!(setting.apply_input("17"), 17);
    assert_eq!(setting.apply_input("seventeen"), 1);
    assert_eq!(setting.apply_input("2.5"), 1);
    assert_eq!(setting.value(), 1);
}

#[test]
fn test_output_settings_follow_aspect() {
    let mut settings = OutputSettings::new((1, 4096), (1, 4096), (1, 255), 1);

    // Disabled until a source is loaded
    settings.set_width_input("50");
    assert_eq!(settings.width(), 1);
    assert!(!settings.is_enabled());

    settings.load_source(200, 100);
    assert_eq!((settings.width(), settings.height()), (200, 100));

    settings.set_width_input("50");
    assert_eq!((settings.width(), settings.height()), (50, 25));

    settings.set_height_input("30");
    assert_eq!((settings.width(), settings.height()), (60, 30));

    settings.set_width_input("abc");
    assert_eq!((settings.width(), settings.height()), (1, 1));

    // Height clamps even when derived
    settings.set_width_input("9000");
    assert_eq!((settings.width(), settings.height()), (4096, 2048));

    settings.set_radius_input("300");
    assert_eq!(settings.radius(), 255);
    settings.set_radius_input("x");
    assert_eq!(settings.radius(), 1);
}

// ============================================================================
// Intake and session
// ============================================================================

#[test]
fn test_mime_for_path() {
    assert_eq!(mime_for_path(Path::new("shape.png")), PNG_MIME);
    assert_eq!(mime_for_path(Path::new("SHAPE.PNG")), PNG_MIME);
    assert_eq!(mime_for_path(Path::new("notes.txt")), "text/plain");
    assert_eq!(mime_for_path(Path::new("photo.jpeg")), "image/jpeg");
    assert_eq!(mime_for_path(Path::new("noext")), "application/octet-stream");
}

#[test]
fn test_decode_png_8_bit() {
    let source = rect_raster(5, 4, 1, 1, 3, 3);
    let decoded = intake::accept(&FileDrop::new("rect.png", PNG_MIME, png_bytes(&source))).unwrap();
    assert_eq!(decoded.name, "rect.png");
    assert_eq!(decoded.raster.dimensions(), (5, 4));
    assert_eq!(decoded.raster.class_mask(), source.class_mask());
    assert!((decoded.raster.get(2, 2).g - source.get(2, 2).g).abs() < 1.0 / 255.0);
    assert_eq!(decoded.info(), "Name: rect.png\nSize: 5 x 4");
}

#[test]
fn test_decode_png_16_bit() {
    let image = image::ImageBuffer::<image::Rgba<u16>, Vec<u16>>::from_raw(2, 1, vec![65535, 32768, 0, 65535, 0, 0, 0, 1000])
        .expect("buffer matches dimensions");
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("png encode");

    let raster = Raster::decode_png(&bytes).unwrap();
    let texel = raster.get(0, 0);
    assert_eq!(texel.r, 1.0);
    assert!((texel.g - 32768.0 / 65535.0).abs() < 1e-6, "16-bit precision kept: {}", texel.g);
    assert!(texel.is_foreground());
    assert!(!raster.get(1, 0).is_foreground());
}

#[test]
fn test_decode_rejects_garbage() {
    let drop = FileDrop::new("broken.png", PNG_MIME, b"not a png".to_vec());
    assert!(matches!(intake::accept(&drop), Err(SdfError::Decode(_))));
}

#[test]
fn test_text_drop_is_rejected_without_state_change() {
    let mut maker = SdfMaker::new(CpuSurface::new(), MakerConfig::default());

    let text = FileDrop::new("notes.txt", "text/plain", b"hello".to_vec());
    let err = maker.drop_files(&[text.clone()]).unwrap_err();
    assert!(matches!(err, SdfError::UnsupportedFileType { .. }));
    assert!(err.to_string().contains("Only .png files are supported"));
    assert!(maker.image().is_none());
    assert!(!maker.settings().is_enabled());

    // With an image loaded, a rejected drop keeps it and the settings
    let source = rect_raster(40, 20, 5, 5, 30, 15);
    maker
        .drop_files(&[FileDrop::new("rect.png", PNG_MIME, png_bytes(&source))])
        .unwrap();
    maker.set_width_input("20");
    let settings_before = maker.settings().clone();

    assert!(maker.drop_files(&[text]).is_err());
    assert_eq!(maker.image().map(|i| i.name.as_str()), Some("rect.png"));
    assert_eq!(maker.settings(), &settings_before);
}

#[test]
fn test_empty_drop_is_ignored() {
    let mut maker = SdfMaker::new(CpuSurface::new(), MakerConfig::default());
    maker.drop_files(&[]).unwrap();
    assert!(maker.image().is_none());
}

#[test]
fn test_session_generates_from_png() {
    let source = rect_raster(64, 32, 10, 6, 50, 26);
    let mut maker = SdfMaker::new(CpuSurface::new(), MakerConfig::default());
    maker
        .drop_files(&[FileDrop::new("rect.png", PNG_MIME, png_bytes(&source))])
        .unwrap();
    assert_eq!((maker.settings().width(), maker.settings().height()), (64, 32));

    maker.set_width_input("32");
    maker.set_radius_input("3");
    assert_eq!(maker.kernel_radius().unwrap(), 6);

    maker.set_kernel(Kernel::JumpFlood(ResolveMode::Distance));
    let output = maker.generate().unwrap();
    assert_eq!(output.dimensions(), (32, 16));
    // Centre of the rectangle is deep inside the shape
    assert_eq!(output.get(15, 8).a, 1.0);
    assert_eq!(output.get(0, 0).a, 0.0);
}

#[test]
fn test_session_requires_source() {
    let mut maker = SdfMaker::new(CpuSurface::new(), MakerConfig::default());
    assert!(matches!(maker.generate(), Err(SdfError::NoSource)));
}

#[test]
fn test_kernel_names() {
    for kernel in Kernel::ALL {
        assert_eq!(Kernel::from_name(&kernel.to_string()), Some(kernel));
    }
    assert_eq!(Kernel::from_name("nope"), None);
    assert_eq!(Kernel::JumpFlood(ResolveMode::Bleed).next(), Kernel::BruteForce);
}

#[test]
fn test_parse_args() {
    let args: Vec<String> = ["shape.png", "--width", "128", "--kernel", "bleed", "--gpu"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let options = parse_args(&args).unwrap();
    assert_eq!(options.input.as_deref(), Some(Path::new("shape.png")));
    assert_eq!(options.width.as_deref(), Some("128"));
    assert_eq!(options.height, None);
    assert_eq!(options.kernel, Some(Kernel::JumpFlood(ResolveMode::Bleed)));
    assert!(options.gpu && !options.preview && !options.benchmark);

    let rejected: [&[&str]; 4] = [&["--radius"], &["--kernel", "sobel"], &["--fast"], &["a.png", "b.png"]];
    for bad in rejected {
        let args: Vec<String> = bad.iter().map(|s| s.to_string()).collect();
        assert!(parse_args(&args).is_err(), "{:?} should be rejected", bad);
    }
}

// ============================================================================
// GPU surface (skipped when no adapter is available)
// ============================================================================

#[test]
fn test_gpu_source_size_limit() {
    assert!(check_source_size(MAX_GPU_SOURCE_SIDE, 1).is_ok());
    assert!(check_source_size(1, MAX_GPU_SOURCE_SIDE).is_ok());
    assert!(matches!(check_source_size(MAX_GPU_SOURCE_SIDE + 1, 1), Err(SdfError::DispatchFailure(_))));
    assert!(matches!(check_source_size(4, 32768), Err(SdfError::DispatchFailure(_))));
    assert!(check_source_size(0, 5).is_err());
}

#[test]
fn test_gpu_matches_cpu() {
    let gpu = match GpuSurface::new() {
        Ok(gpu) => gpu,
        Err(e) => {
            println!("Skipping GPU test: {}", e);
            return;
        }
    };
    println!("GPU: {}", gpu.adapter_info().name);

    let source = rect_raster(48, 40, 7, 9, 30, 33);
    let mut gpu = Generator::new(gpu);
    let mut cpu = Generator::new(CpuSurface::new());
    gpu.set_source(&source).unwrap();
    cpu.set_source(&source).unwrap();

    for kernel in Kernel::ALL {
        for (out, radius) in [((48, 40), 4), ((24, 20), 2), ((96, 80), 3)] {
            let req = request((48, 40), out, radius, kernel);
            let expected = cpu.generate(&req).unwrap().clone();
            let actual = gpu.generate(&req).unwrap();
            assert_eq!(actual.dimensions(), expected.dimensions());
            for (i, (a, e)) in actual.texels().iter().zip(expected.texels()).enumerate() {
                assert!((a.a - e.a).abs() < 1e-5, "{} {:?} texel {}: {} vs {}", kernel, out, i, a.a, e.a);
                assert_eq!((a.r, a.g, a.b), (e.r, e.g, e.b), "{} {:?} color at texel {}", kernel, out, i);
            }
        }
    }
}
