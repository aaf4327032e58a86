use super::*;

fn rasterize(src: &mut dyn GlyphSource, text: &str, size: f64, w: u16, h: u16) -> Vec<u8> {
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
    src.fill(&mut ctx, text, size, Affine::IDENTITY).unwrap();
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.flush();
    ctx.render_to_pixmap(&mut pixmap);
    pixmap.data_as_u8_slice().to_vec()
}

fn coverage(buf: &[u8]) -> usize {
    buf.chunks_exact(4).filter(|px| px[3] > 0).count()
}

#[test]
fn segment_metrics_scale_with_size() {
    let mut g = SegmentGlyphs::new(400);
    let m = g.measure("12", 100.0).unwrap();
    assert!((m.width - 2.0 * ADVANCE * 100.0).abs() < 1e-9);
    assert_eq!(m.height, 100.0);
    let narrow = g.measure("1,2", 100.0).unwrap();
    assert!((narrow.width - (2.0 * ADVANCE + NARROW_ADVANCE) * 100.0).abs() < 1e-9);
}

#[test]
fn eight_covers_more_than_one() {
    let mut g = SegmentGlyphs::new(700);
    let one = coverage(&rasterize(&mut g, "1", 64.0, 48, 64));
    let eight = coverage(&rasterize(&mut g, "8", 64.0, 48, 64));
    assert!(one > 0);
    assert!(eight > one);
}

#[test]
fn space_draws_nothing() {
    let mut g = SegmentGlyphs::new(400);
    assert_eq!(coverage(&rasterize(&mut g, " ", 64.0, 32, 64)), 0);
}

#[test]
fn heavier_weight_is_thicker() {
    let mut light = SegmentGlyphs::new(100);
    let mut bold = SegmentGlyphs::new(900);
    let a = coverage(&rasterize(&mut light, "0", 64.0, 48, 64));
    let b = coverage(&rasterize(&mut bold, "0", 64.0, 48, 64));
    assert!(b > a);
}

#[test]
fn lowercase_maps_to_capitals_and_unknown_is_boxed() {
    let mut g = SegmentGlyphs::new(400);
    let lower = rasterize(&mut g, "k", 64.0, 48, 64);
    let upper = rasterize(&mut g, "K", 64.0, 48, 64);
    assert_eq!(lower, upper);
    assert!(coverage(&rasterize(&mut g, "€", 64.0, 48, 64)) > 0);
}

#[test]
fn missing_font_file_is_a_configuration_error() {
    let font = FontSpec {
        source: Some("/nonexistent/countframe-font.ttf".into()),
        ..FontSpec::default()
    };
    let err = glyph_source_for(&font).err().unwrap();
    assert!(matches!(err, CountframeError::Configuration(_)));
}

#[test]
fn font_glyphs_draw_with_local_font_if_present() {
    let path = std::env::var("COUNTFRAME_TEST_FONT")
        .unwrap_or_else(|_| "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_owned());
    let Ok(bytes) = std::fs::read(path) else {
        return;
    };
    let mut g = FontGlyphs::new(bytes, 400).unwrap();
    let m = g.measure("42", 48.0).unwrap();
    assert!(m.width > 0.0 && m.height > 0.0);
    assert!(coverage(&rasterize(&mut g, "42", 48.0, 96, 72)) > 0);
}
