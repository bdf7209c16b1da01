//! Render benchmarks

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tftmux::display::MemorySink;
use tftmux::feed::{Decoder, SharedScreen};
use tftmux::font::{Glyph, GlyphCache, PLACEHOLDER};
use tftmux::renderer::{Geometry, Renderer, Rotation, TargetMode};
use tftmux::theme::{Rgb, Theme};

fn glyphs() -> GlyphCache {
    let glyphs: HashMap<u32, Glyph> = (32u32..127)
        .chain([PLACEHOLDER])
        .map(|cp| (cp, Glyph::from_rows(4, 8, &[cp & 0xf, cp >> 4, 0b1010, 0b0101, cp & 0xf, cp >> 4, 0b1111, 0])))
        .collect();
    GlyphCache::from_glyphs(glyphs, 4, 8).unwrap()
}

fn filled_screen(geometry: &Geometry) -> SharedScreen {
    let screen = SharedScreen::new(geometry.columns(), geometry.rows());
    let mut decoder = Decoder::new();
    for i in 0..geometry.rows() {
        let line = format!("\x1b[3{}m{:<58}\x1b[0m\r\n", i % 8, format!("line {} with some content", i));
        decoder.feed(line.as_bytes(), &screen);
    }
    screen
}

fn bench_full_screen(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let geometry = Geometry::new(240, 240, 4, 8, Rotation::Deg180).unwrap();
    group.throughput(Throughput::Elements(geometry.rows() as u64));

    for (name, mode) in [("strip", TargetMode::Strip), ("full", TargetMode::Full)] {
        let screen = filled_screen(&geometry);
        let theme = Theme::new(Rgb::WHITE, Rgb::BLACK);
        let mut renderer = Renderer::new(geometry, glyphs(), theme, MemorySink::new(240, 240), mode).unwrap();

        group.bench_function(name, |b| {
            b.iter(|| {
                screen.write(|w| w.mark_all_dirty());
                black_box(renderer.render_cycle(&screen).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_single_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let geometry = Geometry::new(240, 320, 4, 8, Rotation::Deg90).unwrap();
    let screen = filled_screen(&geometry);
    let mut renderer = Renderer::new(
        geometry,
        glyphs(),
        Theme::default(),
        MemorySink::new(240, 320),
        TargetMode::Strip,
    )
    .unwrap();
    renderer.render_cycle(&screen).unwrap();

    group.bench_function("typing", |b| {
        b.iter(|| {
            screen.write(|w| w.print('x'));
            black_box(renderer.render_cycle(&screen).unwrap())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_full_screen, bench_single_row);
criterion_main!(benches);
