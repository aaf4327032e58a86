use crate::foundation::{
    core::{Canvas, FrameIndex},
    error::{CountframeError, CountframeResult},
    math::{Fnv1a64, unpremul_rgba8},
};

/// One rendered frame: premultiplied RGBA8 pixels plus its position on the timeline.
///
/// Frames are immutable once created; consumers read them or take the buffer with
/// [`Frame::into_data`].
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    index: FrameIndex,
    timestamp_ms: f64,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a premultiplied RGBA8 buffer, checking its length against `width * height * 4`.
    pub fn from_premul_rgba8(
        index: FrameIndex,
        timestamp_ms: f64,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> CountframeResult<Self> {
        if width == 0 || height == 0 {
            return Err(CountframeError::render("frame dimensions must be > 0"));
        }
        let canvas = Canvas { width, height };
        if data.len() != canvas.rgba_len() {
            return Err(CountframeError::render(format!(
                "frame buffer is {} bytes, expected {} for {width}x{height}",
                data.len(),
                canvas.rgba_len()
            )));
        }
        Ok(Self {
            index,
            timestamp_ms,
            width,
            height,
            data,
        })
    }

    /// Frame index.
    pub fn index(&self) -> FrameIndex {
        self.index
    }

    /// Milliseconds from export start.
    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp_ms
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel dimensions.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Premultiplied RGBA8 pixels, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the pixel buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        unpremul_rgba8(&self.data)
    }

    /// Stable 64-bit hash of dimensions and pixels.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u64(u64::from(self.width));
        h.write_u64(u64::from(self.height));
        h.write_bytes(&self.data);
        h.finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/frame.rs"]
mod tests;
