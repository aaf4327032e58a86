use crate::{
    effects::{
        blur::{PixelRegion, blur_region},
        composite::{
            GradientAxis, gradient_over_in_place, sample_stops, shift_rgba8, tint_over_in_place,
        },
    },
    foundation::{core::Rgba8, error::CountframeResult},
    scene::model::DesignEffect,
};

/// White coverage of the counter glyphs for one frame, plus the geometry effects need.
pub(crate) struct GlyphCoverage<'a> {
    /// Premultiplied RGBA8; only alpha is read.
    pub(crate) mask: &'a [u8],
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Settled layout box of the counter text (gradient span).
    pub(crate) layout: kurbo::Rect,
    /// Bounds of everything drawn this frame, including moving layers.
    pub(crate) ink: kurbo::Rect,
    /// Scaled font size in pixels.
    pub(crate) size_px: f64,
}

/// Neon glow passes as (radius factor, alpha), widest first.
const NEON_PASSES: [(f64, f64); 3] = [(3.0, 0.35), (2.0, 0.5), (1.0, 0.8)];
const NEON_BASE_RADIUS: f64 = 0.06;
const GLOW_RADIUS: f64 = 0.12;
const FIRE_GLOW_RADIUS: f64 = 0.1;
const CHROME_SHADOW_RADIUS: f64 = 0.05;
const CHROME_SHADOW_OFFSET: f64 = 0.04;

/// Draw the counter glyphs onto `dst` with `effect`. `fill` is the font color.
pub(crate) fn apply_design_effect(
    dst: &mut [u8],
    cov: &GlyphCoverage<'_>,
    fill: Rgba8,
    effect: &DesignEffect,
) -> CountframeResult<()> {
    match effect {
        DesignEffect::Classic => tint_over_in_place(dst, cov.mask, fill, 1.0),
        DesignEffect::Neon { color, intensity } => {
            for (factor, alpha) in NEON_PASSES {
                glow_pass(
                    dst,
                    cov,
                    *color,
                    cov.size_px * NEON_BASE_RADIUS * factor,
                    alpha * intensity,
                )?;
            }
            tint_over_in_place(dst, cov.mask, color.lerp(Rgba8::WHITE, 0.75), 1.0)
        }
        DesignEffect::Glow { color, intensity } => {
            glow_pass(dst, cov, *color, cov.size_px * GLOW_RADIUS, 0.9 * intensity)?;
            tint_over_in_place(dst, cov.mask, fill, 1.0)
        }
        DesignEffect::Gradient { stops } => gradient_over_in_place(
            dst,
            cov.mask,
            cov.width,
            cov.layout,
            stops,
            GradientAxis::TopDown,
        ),
        DesignEffect::Fire { stops, glow } => {
            let ember = sample_stops(stops, 0.5);
            glow_pass(dst, cov, ember, cov.size_px * FIRE_GLOW_RADIUS, 0.8 * glow)?;
            gradient_over_in_place(
                dst,
                cov.mask,
                cov.width,
                cov.layout,
                stops,
                GradientAxis::BottomUp,
            )
        }
        DesignEffect::Rainbow { stops } => gradient_over_in_place(
            dst,
            cov.mask,
            cov.width,
            cov.layout,
            stops,
            GradientAxis::LeftRight,
        ),
        DesignEffect::Chrome { stops } => {
            shadow_pass(dst, cov)?;
            gradient_over_in_place(
                dst,
                cov.mask,
                cov.width,
                cov.layout,
                stops,
                GradientAxis::TopDown,
            )
        }
    }
}

fn glow_pass(
    dst: &mut [u8],
    cov: &GlyphCoverage<'_>,
    color: Rgba8,
    radius_px: f64,
    opacity: f64,
) -> CountframeResult<()> {
    if opacity <= 0.0 {
        return Ok(());
    }
    let (radius, sigma) = blur_params(radius_px);
    let region = PixelRegion::around(cov.ink, f64::from(radius) * 2.0, cov.width, cov.height);
    let blurred = blur_region(cov.mask, cov.width, cov.height, region, radius, sigma)?;
    tint_over_in_place(dst, &blurred, color, opacity.min(1.0) as f32)
}

fn shadow_pass(dst: &mut [u8], cov: &GlyphCoverage<'_>) -> CountframeResult<()> {
    let offset = (cov.size_px * CHROME_SHADOW_OFFSET).round().max(1.0) as i32;
    let shifted = shift_rgba8(cov.mask, cov.width, cov.height, offset, offset);
    let (radius, sigma) = blur_params(cov.size_px * CHROME_SHADOW_RADIUS);
    let ink = cov.ink + kurbo::Vec2::new(f64::from(offset), f64::from(offset));
    let region = PixelRegion::around(ink, f64::from(radius) * 2.0, cov.width, cov.height);
    let blurred = blur_region(&shifted, cov.width, cov.height, region, radius, sigma)?;
    tint_over_in_place(dst, &blurred, Rgba8::BLACK, 0.5)
}

fn blur_params(radius_px: f64) -> (u32, f32) {
    let radius = radius_px.round().clamp(1.0, 256.0) as u32;
    let sigma = (radius as f32 / 2.0).max(0.5);
    (radius, sigma)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/design.rs"]
mod tests;
