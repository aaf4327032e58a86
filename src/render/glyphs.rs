//! Glyph sources: a font file shaped with Parley, or the built-in segment font.
//!
//! Both draw with whatever paint the render context currently holds, so the caller decides
//! whether glyphs become coverage (white) or colored text.

use std::collections::HashMap;

use kurbo::{BezPath, Point};

use crate::{
    foundation::{
        core::Affine,
        error::{CountframeError, CountframeResult},
    },
    render::text::TextLayoutEngine,
    scene::model::FontSpec,
};

/// Size of a laid-out run of text in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TextMetrics {
    pub(crate) width: f64,
    pub(crate) height: f64,
}

pub(crate) trait GlyphSource {
    /// Measure `text` at `size_px`.
    fn measure(&mut self, text: &str, size_px: f64) -> CountframeResult<TextMetrics>;

    /// Fill `text` with the top-left of its cell at the origin of `transform`.
    fn fill(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: f64,
        transform: Affine,
    ) -> CountframeResult<()>;
}

/// Pick the glyph source for `font`: its file when `source` is set, else the segment font.
pub(crate) fn glyph_source_for(font: &FontSpec) -> CountframeResult<Box<dyn GlyphSource>> {
    match &font.source {
        Some(path) => {
            let bytes = std::fs::read(path).map_err(|e| {
                CountframeError::configuration(format!(
                    "failed to read font '{}': {e}",
                    path.display()
                ))
            })?;
            Ok(Box::new(FontGlyphs::new(bytes, font.weight)?))
        }
        None => Ok(Box::new(SegmentGlyphs::new(font.weight))),
    }
}

/// Glyphs shaped from a font file.
pub(crate) struct FontGlyphs {
    engine: TextLayoutEngine,
    font: vello_cpu::peniko::FontData,
}

impl FontGlyphs {
    pub(crate) fn new(font_bytes: Vec<u8>, weight: u16) -> CountframeResult<Self> {
        let engine = TextLayoutEngine::new(&font_bytes, weight)?;
        let font = vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(font_bytes), 0);
        tracing::debug!(family = engine.family_name(), weight, "loaded font");
        Ok(Self { engine, font })
    }
}

impl GlyphSource for FontGlyphs {
    fn measure(&mut self, text: &str, size_px: f64) -> CountframeResult<TextMetrics> {
        let layout = self.engine.layout_line(text, size_px as f32)?;
        Ok(TextMetrics {
            width: f64::from(layout.width()),
            height: f64::from(layout.height()),
        })
    }

    fn fill(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: f64,
        transform: Affine,
    ) -> CountframeResult<()> {
        let layout = self.engine.layout_line(text, size_px as f32)?;
        ctx.set_transform(affine_to_cpu(transform));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&self.font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }
}

/// Built-in vector font: segment-display strokes for digits, Latin capitals and numeric
/// punctuation. Lowercase letters map to capitals; anything else draws as a hollow box.
pub(crate) struct SegmentGlyphs {
    thickness: f64,
    cache: HashMap<char, (f64, BezPath)>,
}

// Glyph space is one em tall; strokes live inside the cell box below.
const ADVANCE: f64 = 0.62;
const NARROW_ADVANCE: f64 = 0.3;
const X0: f64 = 0.1;
const XM: f64 = 0.31;
const X1: f64 = 0.52;
const Y0: f64 = 0.14;
const YM: f64 = 0.5;
const Y1: f64 = 0.86;

#[derive(Clone, Copy)]
enum Seg {
    A,
    B,
    C,
    D,
    E,
    F,
    G1,
    G2,
    H,
    I,
    J,
    K,
    L,
    M,
    DiagDownLeft,
    DiagDownRight,
}

impl Seg {
    fn ends(self) -> (Point, Point) {
        let p = Point::new;
        match self {
            Seg::A => (p(X0, Y0), p(X1, Y0)),
            Seg::B => (p(X1, Y0), p(X1, YM)),
            Seg::C => (p(X1, YM), p(X1, Y1)),
            Seg::D => (p(X0, Y1), p(X1, Y1)),
            Seg::E => (p(X0, YM), p(X0, Y1)),
            Seg::F => (p(X0, Y0), p(X0, YM)),
            Seg::G1 => (p(X0, YM), p(XM, YM)),
            Seg::G2 => (p(XM, YM), p(X1, YM)),
            Seg::H => (p(X0, Y0), p(XM, YM)),
            Seg::I => (p(XM, Y0), p(XM, YM)),
            Seg::J => (p(X1, Y0), p(XM, YM)),
            Seg::K => (p(XM, YM), p(X0, Y1)),
            Seg::L => (p(XM, YM), p(XM, Y1)),
            Seg::M => (p(XM, YM), p(X1, Y1)),
            Seg::DiagDownLeft => (p(X0, Y0), p(XM, Y1)),
            Seg::DiagDownRight => (p(X1, Y0), p(XM, Y1)),
        }
    }
}

fn segments(c: char) -> Option<&'static [Seg]> {
    use Seg::*;
    let segs: &'static [Seg] = match c {
        '0' => &[A, B, C, D, E, F],
        '1' => &[B, C],
        '2' => &[A, B, G1, G2, E, D],
        '3' => &[A, B, G1, G2, C, D],
        '4' => &[F, G1, G2, B, C],
        '5' => &[A, F, G1, G2, C, D],
        '6' => &[A, F, G1, G2, E, C, D],
        '7' => &[A, B, C],
        '8' => &[A, B, C, D, E, F, G1, G2],
        '9' => &[A, B, C, D, F, G1, G2],
        '-' => &[G1, G2],
        '+' => &[G1, G2, I, L],
        '/' => &[J, K],
        '$' => &[A, F, G1, G2, C, D, I, L],
        '%' => &[J, K, H, M],
        'A' => &[A, B, C, E, F, G1, G2],
        'B' => &[A, B, C, D, I, L, G2],
        'C' => &[A, D, E, F],
        'D' => &[A, B, C, D, I, L],
        'E' => &[A, D, E, F, G1],
        'F' => &[A, E, F, G1],
        'G' => &[A, C, D, E, F, G2],
        'H' => &[B, C, E, F, G1, G2],
        'I' => &[A, D, I, L],
        'J' => &[B, C, D, E],
        'K' => &[E, F, G1, J, M],
        'L' => &[D, E, F],
        'M' => &[B, C, E, F, H, J],
        'N' => &[B, C, E, F, H, M],
        'O' => &[A, B, C, D, E, F],
        'P' => &[A, B, E, F, G1, G2],
        'Q' => &[A, B, C, D, E, F, M],
        'R' => &[A, B, E, F, G1, G2, M],
        'S' => &[A, F, G1, G2, C, D],
        'T' => &[A, I, L],
        'U' => &[B, C, D, E, F],
        'V' => &[DiagDownLeft, DiagDownRight],
        'W' => &[B, C, E, F, K, M],
        'X' => &[H, J, K, M],
        'Y' => &[H, J, L],
        'Z' => &[A, D, J, K],
        _ => return None,
    };
    Some(segs)
}

impl SegmentGlyphs {
    /// Segment font with stroke thickness derived from a CSS weight.
    pub(crate) fn new(weight: u16) -> Self {
        let w = f64::from(weight.clamp(100, 900));
        Self {
            thickness: 0.05 + 0.05 * (w - 100.0) / 800.0,
            cache: HashMap::new(),
        }
    }

    fn glyph(&mut self, c: char) -> &(f64, BezPath) {
        let thickness = self.thickness;
        self.cache
            .entry(c)
            .or_insert_with(|| build_glyph(c.to_ascii_uppercase(), thickness))
    }
}

fn build_glyph(c: char, t: f64) -> (f64, BezPath) {
    let mut path = BezPath::new();
    let cx = NARROW_ADVANCE / 2.0;
    match c {
        ' ' => return (NARROW_ADVANCE, path),
        '.' => {
            push_dot(&mut path, Point::new(cx, Y1), t);
            return (NARROW_ADVANCE, path);
        }
        ',' => {
            push_dot(&mut path, Point::new(cx, Y1), t);
            push_bar(&mut path, Point::new(cx, Y1), Point::new(cx - 0.06, Y1 + 0.1), t * 0.8);
            return (NARROW_ADVANCE, path);
        }
        ':' => {
            push_dot(&mut path, Point::new(cx, 0.32), t);
            push_dot(&mut path, Point::new(cx, 0.72), t);
            return (NARROW_ADVANCE, path);
        }
        '\'' => {
            push_bar(&mut path, Point::new(cx, Y0), Point::new(cx, Y0 + 0.14), t);
            return (NARROW_ADVANCE, path);
        }
        _ => {}
    }

    match segments(c) {
        Some(segs) => {
            for seg in segs {
                let (a, b) = seg.ends();
                push_bar(&mut path, a, b, t);
            }
        }
        None => {
            for seg in [Seg::A, Seg::B, Seg::C, Seg::D, Seg::E, Seg::F] {
                let (a, b) = seg.ends();
                push_bar(&mut path, a, b, t * 0.5);
            }
        }
    }
    (ADVANCE, path)
}

/// Append a stroke from `a` to `b` as a closed quad, extended by half the thickness at both
/// ends so joints overlap.
fn push_bar(path: &mut BezPath, a: Point, b: Point, thickness: f64) {
    let d = b - a;
    let len = d.hypot();
    if len <= f64::EPSILON {
        push_dot(path, a, thickness);
        return;
    }
    let u = d / len * (thickness / 2.0);
    let n = kurbo::Vec2::new(-u.y, u.x);
    path.move_to(a - u + n);
    path.line_to(b + u + n);
    path.line_to(b + u - n);
    path.line_to(a - u - n);
    path.close_path();
}

fn push_dot(path: &mut BezPath, c: Point, size: f64) {
    let h = size * 0.6;
    path.move_to(Point::new(c.x - h, c.y - h));
    path.line_to(Point::new(c.x + h, c.y - h));
    path.line_to(Point::new(c.x + h, c.y + h));
    path.line_to(Point::new(c.x - h, c.y + h));
    path.close_path();
}

impl GlyphSource for SegmentGlyphs {
    fn measure(&mut self, text: &str, size_px: f64) -> CountframeResult<TextMetrics> {
        let mut width = 0.0;
        for c in text.chars() {
            width += self.glyph(c).0;
        }
        Ok(TextMetrics {
            width: width * size_px,
            height: size_px,
        })
    }

    fn fill(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        text: &str,
        size_px: f64,
        transform: Affine,
    ) -> CountframeResult<()> {
        let mut x = 0.0;
        for c in text.chars() {
            let (advance, path) = self.glyph(c);
            let advance = *advance;
            if !path.elements().is_empty() {
                let local = transform * Affine::translate((x * size_px, 0.0)) * Affine::scale(size_px);
                ctx.set_transform(affine_to_cpu(local));
                ctx.fill_path(&bezpath_to_cpu(path));
            }
            x += advance;
        }
        Ok(())
    }
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

pub(crate) fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/glyphs.rs"]
mod tests;
