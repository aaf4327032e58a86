use std::collections::HashMap;

use crate::foundation::error::{CountframeError, CountframeResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    /// Red channel.
    pub(crate) r: u8,
    /// Green channel.
    pub(crate) g: u8,
    /// Blue channel.
    pub(crate) b: u8,
    /// Alpha channel.
    pub(crate) a: u8,
}

const LAYOUT_CACHE_LIMIT: usize = 4096;

/// Shapes text with one registered font face and caches the resulting layouts.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
    weight: u16,
    cache: HashMap<(String, u32), parley::Layout<TextBrushRgba8>>,
}

impl TextLayoutEngine {
    /// Register `font_bytes` and prepare fresh Parley contexts shaping at CSS `weight`.
    pub(crate) fn new(font_bytes: &[u8], weight: u16) -> CountframeResult<Self> {
        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            CountframeError::configuration("no font families registered from font bytes")
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| CountframeError::configuration("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            weight,
            cache: HashMap::new(),
        })
    }

    /// Family name of the registered face.
    pub(crate) fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Requested CSS weight.
    pub(crate) fn weight(&self) -> u16 {
        self.weight
    }

    /// Shape and lay out a single line of `text` at `size_px`.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        size_px: f32,
    ) -> CountframeResult<&parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(CountframeError::configuration(
                "text size_px must be finite and > 0",
            ));
        }
        let key = (text.to_owned(), size_px.to_bits());
        if !self.cache.contains_key(&key) {
            if self.cache.len() >= LAYOUT_CACHE_LIMIT {
                self.cache.clear();
            }
            let layout = self.build(text, size_px);
            self.cache.insert(key.clone(), layout);
        }
        self.cache
            .get(&key)
            .ok_or_else(|| CountframeError::render("text layout cache miss"))
    }

    fn build(&mut self, text: &str, size_px: f32) -> parley::Layout<TextBrushRgba8> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(self.weight)),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(TextBrushRgba8 {
            r: 255,
            g: 255,
            b: 255,
            a: 255,
        }));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
