use crate::foundation::error::{CountframeError, CountframeResult};

/// Pixel rectangle `[x0, x1) x [y0, y1)` inside a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PixelRegion {
    pub(crate) x0: u32,
    pub(crate) y0: u32,
    pub(crate) x1: u32,
    pub(crate) y1: u32,
}

impl PixelRegion {
    /// Region covering `rect` grown by `pad` pixels, clipped to the buffer.
    pub(crate) fn around(rect: kurbo::Rect, pad: f64, width: u32, height: u32) -> Self {
        let clip = |v: f64, max: u32| -> u32 { v.clamp(0.0, f64::from(max)) as u32 };
        Self {
            x0: clip((rect.x0 - pad).floor(), width),
            y0: clip((rect.y0 - pad).floor(), height),
            x1: clip((rect.x1 + pad).ceil(), width),
            y1: clip((rect.y1 + pad).ceil(), height),
        }
    }

    pub(crate) fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub(crate) fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub(crate) fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Separable gaussian blur over premultiplied RGBA8 with a Q16 kernel.
pub(crate) fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
) -> CountframeResult<Vec<u8>> {
    let expected_len = checked_len(width, height)?;
    if src.len() != expected_len {
        return Err(CountframeError::render(
            "blur_rgba8_premul expects src matching width*height*4",
        ));
    }
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

/// Blur only `region` of a full-size buffer; pixels outside the region come back transparent.
pub(crate) fn blur_region(
    src: &[u8],
    width: u32,
    height: u32,
    region: PixelRegion,
    radius: u32,
    sigma: f32,
) -> CountframeResult<Vec<u8>> {
    let full_len = checked_len(width, height)?;
    if src.len() != full_len {
        return Err(CountframeError::render(
            "blur_region expects src matching width*height*4",
        ));
    }
    let mut out = vec![0u8; full_len];
    if region.is_empty() {
        return Ok(out);
    }

    let (rw, rh) = (region.width(), region.height());
    let mut crop = Vec::with_capacity(checked_len(rw, rh)?);
    for y in region.y0..region.y1 {
        let start = ((y * width + region.x0) as usize) * 4;
        crop.extend_from_slice(&src[start..start + (rw as usize) * 4]);
    }

    let blurred = blur_rgba8_premul(&crop, rw, rh, radius, sigma)?;
    for (row, y) in (region.y0..region.y1).enumerate() {
        let dst_start = ((y * width + region.x0) as usize) * 4;
        let src_start = row * (rw as usize) * 4;
        out[dst_start..dst_start + (rw as usize) * 4]
            .copy_from_slice(&blurred[src_start..src_start + (rw as usize) * 4]);
    }
    Ok(out)
}

fn checked_len(width: u32, height: u32) -> CountframeResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CountframeError::render("blur buffer size overflow"))
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> CountframeResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(CountframeError::configuration("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(CountframeError::render("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    // force the taps to sum to exactly 1.0 in Q16
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }

    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
