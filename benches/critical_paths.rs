//! Criterion benchmarks for fryfall critical paths
//!
//! Benchmarks the per-frame work:
//! - Simulation: one update step at several surface sizes
//! - Raster: rendering a full frame offscreen
//! - Color: CSS color parsing (hex and functional)
//! - Theme: var() resolution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fryfall::color::parse_color;
use fryfall::raster::RasterSurface;
use fryfall::render::render_frame;
use fryfall::sim::{SimOptions, Simulation};
use fryfall::sprites::Sprite;
use fryfall::theme::{Theme, ThemeSource, VariableRegistry};
use image::RgbaImage;

const SIZES: [(f64, f64); 3] = [(800.0, 600.0), (1280.0, 720.0), (1920.0, 1080.0)];

fn sim(width: f64, height: f64) -> Simulation {
    Simulation::new(width, height, SimOptions { seed: Some(1), ..Default::default() })
}

// =============================================================================
// Simulation Benchmarks
// =============================================================================

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("update");

    for (w, h) in SIZES {
        let mut s = sim(w, h);
        group.throughput(Throughput::Elements(s.base_count() as u64));
        group.bench_function(BenchmarkId::new("step_16ms", format!("{}x{}", w, h)), |b| {
            b.iter(|| s.update(black_box(0.016)))
        });
    }

    // Worst case: spark and fume caps saturated plus a burst in flight
    let mut busy = sim(1920.0, 1080.0);
    for i in 0..300 {
        busy.emit_spark(i as f64 * 6.0, 500.0);
        busy.emit_fume(i as f64 * 6.0, 1076.0);
    }
    busy.emit_burst(960.0, 200.0);
    busy.trigger_impact(960.0, 540.0, 32, 12);
    group.bench_function("step_16ms_saturated", |b| b.iter(|| busy.update(black_box(0.016))));

    group.finish();
}

// =============================================================================
// Raster Benchmarks
// =============================================================================

fn bench_raster(c: &mut Criterion) {
    let mut group = c.benchmark_group("raster");
    group.sample_size(20);
    let sprites: [Sprite<RgbaImage>; 0] = [];

    for (w, h) in SIZES {
        let mut s = sim(w, h);
        // settle fresh spawns into view
        for _ in 0..120 {
            s.update(0.05);
        }
        let mut surface = RasterSurface::new(w, h, 1.0);
        group.throughput(Throughput::Elements((w * h) as u64));
        let id = BenchmarkId::new("render_frame", format!("{}x{}", w, h));
        group.bench_with_input(id, &s, |b, s| {
            b.iter(|| render_frame(&mut surface, black_box(s), &sprites))
        });
    }

    group.finish();
}

// =============================================================================
// Color and Theme Benchmarks
// =============================================================================

fn bench_color(c: &mut Criterion) {
    let mut group = c.benchmark_group("color");

    group.bench_function("parse_hex_6", |b| b.iter(|| parse_color(black_box("#f8b400"))));
    group.bench_function("parse_rgb", |b| {
        b.iter(|| parse_color(black_box("rgb(217, 43, 43)")))
    });
    group.bench_function("parse_hsl", |b| {
        b.iter(|| parse_color(black_box("hsl(41, 100%, 49%)")))
    });
    group.bench_function("parse_named", |b| b.iter(|| parse_color(black_box("white"))));

    let mut vars = VariableRegistry::new();
    vars.define("--greasy-gold", "var(--brand, #f8b400)");
    vars.define("--brand", "#ffcc00");
    let source = ThemeSource::default();
    group.bench_function("resolve_theme", |b| {
        b.iter(|| Theme::resolve(black_box(&source), black_box(&vars)))
    });

    group.finish();
}

criterion_group!(benches, bench_update, bench_raster, bench_color);
criterion_main!(benches);
