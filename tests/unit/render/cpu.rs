use super::*;
use crate::{
    eval::evaluator::Evaluator,
    foundation::core::{Fps, FrameIndex, Rgba8},
    scene::model::{CounterConfig, DesignEffect, FontSpec, TextOverlayConfig},
};

fn settings() -> RenderSettings {
    RenderSettings {
        canvas: Canvas {
            width: 160,
            height: 90,
        },
        scale: 1.0,
        background: Background::Transparent,
        font: FontSpec {
            size_px: 40.0,
            ..FontSpec::default()
        },
        effect: DesignEffect::Classic,
        overlay: None,
    }
}

fn state_at(i: u64) -> FrameState {
    let counter = CounterConfig {
        start: 0.0,
        end: 999.0,
        duration: 1.0,
        ..CounterConfig::default()
    };
    let mut ev = Evaluator::new(&counter, Fps::export(24).unwrap(), 1.0).unwrap();
    ev.eval_frame(FrameIndex(i)).unwrap()
}

fn alpha_sum(f: &Frame) -> u64 {
    f.data().chunks_exact(4).map(|px| u64::from(px[3])).sum()
}

#[test]
fn renders_canvas_sized_frames() {
    let mut be = CpuBackend::new(settings()).unwrap();
    let f = be.render(&state_at(10)).unwrap();
    assert_eq!((f.width(), f.height()), (160, 90));
    assert_eq!(f.index(), FrameIndex(10));
    assert!(alpha_sum(&f) > 0);
    // corners stay transparent
    assert_eq!(&f.data()[0..4], &[0, 0, 0, 0]);
}

#[test]
fn rendering_is_deterministic() {
    let mut a = CpuBackend::new(settings()).unwrap();
    let mut b = CpuBackend::new(settings()).unwrap();
    let st = state_at(17);
    let fa = a.render(&st).unwrap();
    assert_eq!(fa.fingerprint(), b.render(&st).unwrap().fingerprint());
    // reusing a backend does not leak state between frames
    a.render(&state_at(3)).unwrap();
    assert_eq!(fa.fingerprint(), a.render(&st).unwrap().fingerprint());
}

#[test]
fn solid_background_is_opaque() {
    let mut s = settings();
    s.background = Background::Solid {
        color: Rgba8::rgb(0, 0, 64),
    };
    let mut be = CpuBackend::new(s).unwrap();
    let f = be.render(&state_at(0)).unwrap();
    assert!(f.data().chunks_exact(4).all(|px| px[3] == 255));
    assert_eq!(&f.data()[0..4], &[0, 0, 64, 255]);
}

#[test]
fn wider_numbers_cover_more() {
    let mut be = CpuBackend::new(settings()).unwrap();
    let small = be.render(&state_at(0)).unwrap();
    let big = be.render(&state_at(23)).unwrap();
    assert!(alpha_sum(&big) > alpha_sum(&small));
}

#[test]
fn overlay_adds_pixels() {
    let mut s = settings();
    let base = CpuBackend::new(s.clone()).unwrap().render(&state_at(5)).unwrap();
    s.overlay = Some(TextOverlayConfig {
        text: "LIKES".to_owned(),
        offset_y: 30.0,
        font: FontSpec {
            size_px: 14.0,
            ..FontSpec::default()
        },
        ..TextOverlayConfig::default()
    });
    let with_overlay = CpuBackend::new(s).unwrap().render(&state_at(5)).unwrap();
    assert!(alpha_sum(&with_overlay) > alpha_sum(&base));
}

#[test]
fn glow_spreads_beyond_classic() {
    let classic = CpuBackend::new(settings()).unwrap().render(&state_at(12)).unwrap();
    let mut s = settings();
    s.effect = DesignEffect::Glow {
        color: Rgba8::rgb(255, 200, 0),
        intensity: 1.0,
    };
    let glow = CpuBackend::new(s).unwrap().render(&state_at(12)).unwrap();
    let covered = |f: &Frame| f.data().chunks_exact(4).filter(|px| px[3] > 0).count();
    assert!(covered(&glow) > covered(&classic));
}

#[test]
fn rejects_invalid_settings() {
    let mut s = settings();
    s.canvas.width = 0;
    assert!(CpuBackend::new(s).is_err());
    let mut s = settings();
    s.scale = 0.0;
    assert!(CpuBackend::new(s).is_err());
    let mut s = settings();
    s.canvas.height = 70_000;
    assert!(CpuBackend::new(s).is_err());
}
