use crate::{
    animation::digits::DigitTransform,
    effects::{
        composite::over_in_place,
        design::{GlyphCoverage, apply_design_effect},
    },
    eval::evaluator::{FrameState, GlyphLayers},
    foundation::{
        core::{Affine, Canvas, Rect},
        error::{CountframeError, CountframeResult},
    },
    render::{
        backend::{RenderBackend, RenderSettings},
        frame::Frame,
        glyphs::{GlyphSource, glyph_source_for},
    },
    scene::model::Background,
};

/// CPU raster backend.
///
/// Counter glyphs are first drawn as white coverage (one layer per transitioning glyph, with
/// its transform and opacity); the design effect then turns coverage into colored pixels over
/// the background. The overlay is drawn last, untouched by counter transforms.
pub struct CpuBackend {
    settings: RenderSettings,
    width: u16,
    height: u16,
    ctx: Option<vello_cpu::RenderContext>,
    counter_glyphs: Box<dyn GlyphSource>,
    overlay_glyphs: Option<Box<dyn GlyphSource>>,
    mask: vello_cpu::Pixmap,
}

/// One glyph layer positioned on the canvas.
struct PlacedLayer {
    text: String,
    transform: Affine,
    opacity: f64,
}

struct CounterLayout {
    layers: Vec<PlacedLayer>,
    layout: Rect,
    ink: Rect,
}

impl CpuBackend {
    /// Create a backend, loading fonts up front.
    pub fn new(settings: RenderSettings) -> CountframeResult<Self> {
        settings.validate()?;
        let width: u16 = settings
            .canvas
            .width
            .try_into()
            .map_err(|_| CountframeError::configuration("canvas width exceeds u16"))?;
        let height: u16 = settings
            .canvas
            .height
            .try_into()
            .map_err(|_| CountframeError::configuration("canvas height exceeds u16"))?;

        let counter_glyphs = glyph_source_for(&settings.font)?;
        let overlay_glyphs = match &settings.overlay {
            Some(o) if o.is_visible() => Some(glyph_source_for(&o.font)?),
            _ => None,
        };

        Ok(Self {
            settings,
            width,
            height,
            ctx: None,
            counter_glyphs,
            overlay_glyphs,
            mask: vello_cpu::Pixmap::new(width, height),
        })
    }

    fn counter_size_px(&self) -> f64 {
        self.settings.font.size_px * self.settings.scale
    }

    fn layout_counter(&mut self, state: &FrameState) -> CountframeResult<CounterLayout> {
        let size = self.counter_size_px();
        let canvas_w = f64::from(self.settings.canvas.width);
        let canvas_h = f64::from(self.settings.canvas.height);
        let cell_h = self.counter_glyphs.measure(&state.text, size)?.height;
        let y0 = (canvas_h - cell_h) / 2.0;

        let mut layers = Vec::new();
        let layout;
        match &state.glyphs {
            GlyphLayers::PerDigit(columns) => {
                let mut widths = Vec::with_capacity(columns.len());
                let mut lead = 0.0;
                let mut total = 0.0;
                for col in columns {
                    let ch = col
                        .target
                        .or_else(|| col.layers.first().map(|l| l.value))
                        .unwrap_or(' ');
                    let w = self.counter_glyphs.measure(ch.encode_utf8(&mut [0; 4]), size)?.width;
                    if col.target.is_none() {
                        lead += w;
                    }
                    total += w;
                    widths.push(w);
                }
                let text_w = total - lead;
                let x_text = (canvas_w - text_w) / 2.0;
                layout = Rect::new(x_text, y0, x_text + text_w, y0 + cell_h);

                let mut x = x_text - lead;
                for (col, w) in columns.iter().zip(widths) {
                    for layer in &col.layers {
                        let text = layer.value.to_string();
                        let lw = self.counter_glyphs.measure(&text, size)?.width;
                        let cell = Rect::new(
                            x + (w - lw) / 2.0,
                            y0,
                            x + (w + lw) / 2.0,
                            y0 + cell_h,
                        );
                        layers.push(place(text, &layer.transform, cell));
                    }
                    x += w;
                }
            }
            GlyphLayers::Block(block) => {
                let text_w = self.counter_glyphs.measure(&state.text, size)?.width;
                let x_text = (canvas_w - text_w) / 2.0;
                layout = Rect::new(x_text, y0, x_text + text_w, y0 + cell_h);
                for layer in block {
                    let lw = self.counter_glyphs.measure(&layer.value, size)?.width;
                    let x = (canvas_w - lw) / 2.0;
                    let cell = Rect::new(x, y0, x + lw, y0 + cell_h);
                    layers.push(place(layer.value.clone(), &layer.transform, cell));
                }
            }
        }

        layers.retain(|l| l.opacity > 0.0);
        let ink = layout.union(self.ink_from_cells(&layers, size, cell_h)?);

        Ok(CounterLayout { layers, layout, ink })
    }

    fn ink_from_cells(
        &mut self,
        layers: &[PlacedLayer],
        size: f64,
        cell_h: f64,
    ) -> CountframeResult<Rect> {
        let mut ink: Option<Rect> = None; // union of transformed cells
        for l in layers {
            let w = self.counter_glyphs.measure(&l.text, size)?.width;
            let r = l.transform.transform_rect_bbox(Rect::new(0.0, 0.0, w, cell_h));
            ink = Some(ink.map_or(r, |acc| acc.union(r)));
        }
        Ok(ink.unwrap_or(Rect::ZERO))
    }

    fn draw_coverage(&mut self, counter: &CounterLayout) -> CountframeResult<()> {
        let size = self.counter_size_px();
        let mut ctx = take_ctx(&mut self.ctx, self.width, self.height);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        for layer in &counter.layers {
            let faded = layer.opacity < 1.0;
            if faded {
                ctx.push_opacity_layer(layer.opacity as f32);
            }
            self.counter_glyphs
                .fill(&mut ctx, &layer.text, size, layer.transform)?;
            if faded {
                ctx.pop_layer();
            }
        }
        self.mask.data_as_u8_slice_mut().fill(0);
        ctx.flush();
        ctx.render_to_pixmap(&mut self.mask);
        self.ctx = Some(ctx);
        Ok(())
    }

    fn draw_overlay(&mut self, out: &mut [u8]) -> CountframeResult<()> {
        let Some(overlay) = self.settings.overlay.clone() else {
            return Ok(());
        };
        let Some(glyphs) = self.overlay_glyphs.as_mut() else {
            return Ok(());
        };
        let scale = self.settings.scale;
        let size = overlay.font.size_px * scale;
        let m = glyphs.measure(&overlay.text, size)?;
        let x = (f64::from(self.settings.canvas.width) - m.width) / 2.0 + overlay.offset_x * scale;
        let y = (f64::from(self.settings.canvas.height) - m.height) / 2.0 + overlay.offset_y * scale;

        let mut ctx = take_ctx(&mut self.ctx, self.width, self.height);
        let c = overlay.font.color;
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a));
        let faded = overlay.opacity < 1.0;
        if faded {
            ctx.push_opacity_layer(overlay.opacity as f32);
        }
        glyphs.fill(&mut ctx, &overlay.text, size, Affine::translate((x, y)))?;
        if faded {
            ctx.pop_layer();
        }

        let mut pixmap = vello_cpu::Pixmap::new(self.width, self.height);
        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);
        self.ctx = Some(ctx);
        over_in_place(out, pixmap.data_as_u8_slice(), 1.0)
    }
}

fn take_ctx(
    slot: &mut Option<vello_cpu::RenderContext>,
    width: u16,
    height: u16,
) -> vello_cpu::RenderContext {
    let mut ctx = match slot.take() {
        Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
        _ => vello_cpu::RenderContext::new(width, height),
    };
    ctx.reset();
    ctx
}

fn place(text: String, transform: &DigitTransform, cell: Rect) -> PlacedLayer {
    PlacedLayer {
        text,
        transform: transform.to_affine(cell) * Affine::translate(cell.origin().to_vec2()),
        opacity: if transform.is_visible() {
            transform.opacity
        } else {
            0.0
        },
    }
}

fn background_pixels(canvas: Canvas, background: Background) -> Vec<u8> {
    match background {
        Background::Transparent => vec![0u8; canvas.rgba_len()],
        Background::Solid { color } => color.premul().to_array().repeat(canvas.rgba_len() / 4),
    }
}

impl RenderBackend for CpuBackend {
    #[tracing::instrument(level = "trace", skip(self, state), fields(frame = state.index().0))]
    fn render(&mut self, state: &FrameState) -> CountframeResult<Frame> {
        let counter = self.layout_counter(state)?;
        self.draw_coverage(&counter)?;

        let canvas = self.settings.canvas;
        let mut out = background_pixels(canvas, self.settings.background);
        let coverage = GlyphCoverage {
            mask: self.mask.data_as_u8_slice(),
            width: canvas.width,
            height: canvas.height,
            layout: counter.layout,
            ink: counter.ink,
            size_px: self.counter_size_px(),
        };
        apply_design_effect(
            &mut out,
            &coverage,
            self.settings.font.color,
            &self.settings.effect,
        )?;
        self.draw_overlay(&mut out)?;

        Frame::from_premul_rgba8(
            state.index(),
            state.sample.timestamp_ms,
            canvas.width,
            canvas.height,
            out,
        )
    }

    fn canvas(&self) -> Canvas {
        self.settings.canvas
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
