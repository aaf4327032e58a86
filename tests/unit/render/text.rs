use super::*;

fn local_font_bytes() -> Option<Vec<u8>> {
    let path = std::env::var("COUNTFRAME_TEST_FONT")
        .unwrap_or_else(|_| "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_owned());
    std::fs::read(path).ok()
}

fn first_run_emboldened(layout: &parley::Layout<TextBrushRgba8>) -> Option<bool> {
    layout.lines().next()?.items().find_map(|item| match item {
        parley::layout::PositionedLayoutItem::GlyphRun(run) => {
            Some(run.run().synthesis().embolden())
        }
        _ => None,
    })
}

#[test]
fn rejects_bytes_without_fonts() {
    assert!(TextLayoutEngine::new(b"not a font", 400).is_err());
}

#[test]
fn text_layout_smoke_with_local_font_if_present() {
    let Some(font_bytes) = local_font_bytes() else {
        return;
    };

    let mut engine = TextLayoutEngine::new(&font_bytes, 400).unwrap();
    assert!(!engine.family_name().is_empty());
    let layout = engine.layout_line("12,345", 48.0).unwrap();
    assert!(layout.lines().next().is_some());
    assert!(layout.width() > 0.0);
    assert!(engine.layout_line("1", 0.0).is_err());
}

#[test]
fn requested_weight_reaches_the_shaper() {
    let Some(font_bytes) = local_font_bytes() else {
        return;
    };

    let mut regular = TextLayoutEngine::new(&font_bytes, 400).unwrap();
    let mut heavy = TextLayoutEngine::new(&font_bytes, 900).unwrap();
    assert_eq!(heavy.weight(), 900);

    let regular_bold = first_run_emboldened(regular.layout_line("42", 48.0).unwrap());
    let heavy_bold = first_run_emboldened(heavy.layout_line("42", 48.0).unwrap());
    assert_eq!(regular_bold, Some(false));
    // A single regular face can only satisfy 900 through synthesis.
    assert_eq!(heavy_bold, Some(true));
}
