use super::*;
use crate::scene::model::GradientStop;

const W: u32 = 32;
const H: u32 = 32;

/// Opaque white square in the middle of a transparent canvas.
fn square_mask() -> Vec<u8> {
    let mut mask = vec![0u8; (W * H * 4) as usize];
    for y in 12..20 {
        for x in 12..20 {
            let i = ((y * W + x) * 4) as usize;
            mask[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
        }
    }
    mask
}

fn coverage(mask: &[u8]) -> GlyphCoverage<'_> {
    GlyphCoverage {
        mask,
        width: W,
        height: H,
        layout: kurbo::Rect::new(12.0, 12.0, 20.0, 20.0),
        ink: kurbo::Rect::new(12.0, 12.0, 20.0, 20.0),
        size_px: 40.0,
    }
}

fn alpha_at(buf: &[u8], x: u32, y: u32) -> u8 {
    buf[((y * W + x) * 4 + 3) as usize]
}

fn render(effect: &DesignEffect) -> Vec<u8> {
    let mask = square_mask();
    let mut dst = vec![0u8; mask.len()];
    apply_design_effect(&mut dst, &coverage(&mask), Rgba8::rgb(10, 200, 30), effect).unwrap();
    dst
}

#[test]
fn classic_fills_exactly_the_glyphs() {
    let dst = render(&DesignEffect::Classic);
    assert_eq!(&dst[((15 * W + 15) * 4) as usize..][..4], &[10, 200, 30, 255]);
    assert_eq!(alpha_at(&dst, 9, 15), 0);
}

#[test]
fn glow_effects_bleed_outside_glyphs() {
    for effect in [
        DesignEffect::Neon { color: Rgba8::rgb(0, 255, 255), intensity: 1.0 },
        DesignEffect::Glow { color: Rgba8::WHITE, intensity: 1.0 },
        DesignEffect::Fire {
            stops: vec![
                GradientStop::new(0.0, Rgba8::rgb(255, 0, 0)),
                GradientStop::new(1.0, Rgba8::rgb(255, 255, 0)),
            ],
            glow: 1.0,
        },
    ] {
        let dst = render(&effect);
        assert!(alpha_at(&dst, 10, 15) > 0, "{}", effect.name());
        assert_eq!(alpha_at(&dst, 15, 15), 255, "{}", effect.name());
    }
}

#[test]
fn zero_intensity_glow_draws_core_only() {
    let dst = render(&DesignEffect::Glow { color: Rgba8::WHITE, intensity: 0.0 });
    assert_eq!(dst, render(&DesignEffect::Classic));
}

#[test]
fn chrome_shadow_falls_down_right() {
    let dst = render(&DesignEffect::Chrome {
        stops: vec![GradientStop::new(0.0, Rgba8::WHITE)],
    });
    assert!(alpha_at(&dst, 21, 21) > 0);
    assert_eq!(alpha_at(&dst, 5, 5), 0);
}

#[test]
fn gradient_and_rainbow_stay_inside_glyphs() {
    for effect in [
        DesignEffect::Gradient {
            stops: vec![
                GradientStop::new(0.0, Rgba8::rgb(255, 0, 0)),
                GradientStop::new(1.0, Rgba8::rgb(0, 0, 255)),
            ],
        },
        DesignEffect::Rainbow {
            stops: vec![
                GradientStop::new(0.0, Rgba8::rgb(255, 0, 0)),
                GradientStop::new(1.0, Rgba8::rgb(0, 255, 0)),
            ],
        },
    ] {
        let dst = render(&effect);
        assert_eq!(alpha_at(&dst, 11, 15), 0);
        assert_eq!(alpha_at(&dst, 15, 15), 255);
    }
}

#[test]
fn effects_are_deterministic() {
    let effect = DesignEffect::Neon { color: Rgba8::rgb(255, 0, 255), intensity: 2.0 };
    assert_eq!(render(&effect), render(&effect));
}
