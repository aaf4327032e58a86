use crate::{
    eval::evaluator::FrameState,
    foundation::{
        core::Canvas,
        error::{CountframeError, CountframeResult},
    },
    render::frame::Frame,
    scene::model::{Background, DesignEffect, FontSpec, TextOverlayConfig},
};

/// Rendering surface: turns an evaluated [`FrameState`] into pixels.
///
/// A backend is owned by exactly one export session at a time.
pub trait RenderBackend {
    /// Render one frame.
    fn render(&mut self, state: &FrameState) -> CountframeResult<Frame>;

    /// Output dimensions of every frame this backend produces.
    fn canvas(&self) -> Canvas;
}

/// Available backend kinds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendKind {
    /// CPU raster backend powered by `vello_cpu`.
    #[default]
    Cpu,
}

/// Static inputs of a backend, fixed for a whole export.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    /// Output size in pixels (already scaled).
    pub canvas: Canvas,
    /// Multiplier applied to font sizes and overlay offsets.
    pub scale: f64,
    /// Background fill.
    pub background: Background,
    /// Counter typeface.
    pub font: FontSpec,
    /// Counter design effect.
    pub effect: DesignEffect,
    /// Optional overlay text.
    pub overlay: Option<TextOverlayConfig>,
}

impl RenderSettings {
    /// Reject zero or oversized canvases and bad scales.
    pub fn validate(&self) -> CountframeResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(CountframeError::configuration(
                "canvas width/height must be > 0",
            ));
        }
        if self.canvas.width > u32::from(u16::MAX) || self.canvas.height > u32::from(u16::MAX) {
            return Err(CountframeError::configuration(
                "canvas width/height must fit in u16",
            ));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(CountframeError::configuration(
                "scale must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// Construct a backend of `kind`.
pub fn create_backend(
    kind: BackendKind,
    settings: &RenderSettings,
) -> CountframeResult<Box<dyn RenderBackend>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(crate::render::cpu::CpuBackend::new(
            settings.clone(),
        )?)),
    }
}
