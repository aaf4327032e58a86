use crate::{
    foundation::{
        core::Rgba8,
        error::{CountframeError, CountframeResult},
        math::mul_div255_u8,
    },
    scene::model::GradientStop,
};

pub(crate) type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over for premultiplied pixels with extra `opacity` on `src`.
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

pub(crate) fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> CountframeResult<()> {
    check_pair(dst, src, "over_in_place")?;
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Paint `color` through the alpha coverage of `mask` and composite it over `dst`.
pub(crate) fn tint_over_in_place(
    dst: &mut [u8],
    mask: &[u8],
    color: Rgba8,
    opacity: f32,
) -> CountframeResult<()> {
    check_pair(dst, mask, "tint_over_in_place")?;
    let c = color.premul().to_array();
    for (d, m) in dst.chunks_exact_mut(4).zip(mask.chunks_exact(4)) {
        let cov = m[3];
        if cov == 0 {
            continue;
        }
        let src = scale_px(c, cov);
        let out = over([d[0], d[1], d[2], d[3]], src, opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Direction a gradient runs across the counter bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GradientAxis {
    /// First stop at the top.
    TopDown,
    /// First stop at the bottom.
    BottomUp,
    /// First stop at the left.
    LeftRight,
}

/// Paint a multi-stop gradient spanning `bounds` through `mask` and composite over `dst`.
pub(crate) fn gradient_over_in_place(
    dst: &mut [u8],
    mask: &[u8],
    width: u32,
    bounds: kurbo::Rect,
    stops: &[GradientStop],
    axis: GradientAxis,
) -> CountframeResult<()> {
    check_pair(dst, mask, "gradient_over_in_place")?;
    if width == 0 {
        return Ok(());
    }
    let span = match axis {
        GradientAxis::TopDown | GradientAxis::BottomUp => bounds.height(),
        GradientAxis::LeftRight => bounds.width(),
    }
    .max(1.0);

    // one lookup per row or column
    let lut_len = match axis {
        GradientAxis::LeftRight => width as usize,
        _ => dst.len() / 4 / width as usize,
    };
    let lut: Vec<PremulRgba8> = (0..lut_len)
        .map(|i| {
            let pos = i as f64 + 0.5;
            let t = match axis {
                GradientAxis::TopDown => (pos - bounds.y0) / span,
                GradientAxis::BottomUp => (bounds.y1 - pos) / span,
                GradientAxis::LeftRight => (pos - bounds.x0) / span,
            };
            sample_stops(stops, t).premul().to_array()
        })
        .collect();

    for (i, (d, m)) in dst.chunks_exact_mut(4).zip(mask.chunks_exact(4)).enumerate() {
        let cov = m[3];
        if cov == 0 {
            continue;
        }
        let (x, y) = (i % width as usize, i / width as usize);
        let c = match axis {
            GradientAxis::LeftRight => lut[x],
            _ => lut[y],
        };
        let out = over([d[0], d[1], d[2], d[3]], scale_px(c, cov), 1.0);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Color of a multi-stop gradient at `t` (clamped), interpolating straight RGBA.
pub(crate) fn sample_stops(stops: &[GradientStop], t: f64) -> Rgba8 {
    let Some(first) = stops.first() else {
        return Rgba8::WHITE;
    };
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    if t <= first.offset {
        return first.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t <= b.offset {
            let span = b.offset - a.offset;
            if span <= f64::EPSILON {
                return b.color;
            }
            return a.color.lerp(b.color, (t - a.offset) / span);
        }
    }
    stops.last().map_or(first.color, |s| s.color)
}

/// Move a buffer by whole pixels; uncovered pixels become transparent.
pub(crate) fn shift_rgba8(src: &[u8], width: u32, height: u32, dx: i32, dy: i32) -> Vec<u8> {
    let mut out = vec![0u8; src.len()];
    let (w, h) = (width as i32, height as i32);
    for y in 0..h {
        let sy = y - dy;
        if sy < 0 || sy >= h {
            continue;
        }
        for x in 0..w {
            let sx = x - dx;
            if sx < 0 || sx >= w {
                continue;
            }
            let si = ((sy * w + sx) as usize) * 4;
            let di = ((y * w + x) as usize) * 4;
            out[di..di + 4].copy_from_slice(&src[si..si + 4]);
        }
    }
    out
}

fn scale_px(c: PremulRgba8, cov: u8) -> PremulRgba8 {
    if cov == 255 {
        return c;
    }
    let k = u16::from(cov);
    [
        mul_div255_u8(u16::from(c[0]), k),
        mul_div255_u8(u16::from(c[1]), k),
        mul_div255_u8(u16::from(c[2]), k),
        mul_div255_u8(u16::from(c[3]), k),
    ]
}

fn check_pair(dst: &[u8], src: &[u8], op: &str) -> CountframeResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(CountframeError::render(format!(
            "{op} expects equal-length rgba8 buffers"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
