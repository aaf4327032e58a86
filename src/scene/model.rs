use std::path::PathBuf;

use crate::{
    animation::{digits::DigitTransitionConfig, ease::Ease},
    foundation::{
        core::Rgba8,
        error::{CountframeError, CountframeResult},
    },
};

/// Largest number of decimal places a counter may display.
pub const MAX_DECIMALS: u8 = 10;

/// Counter animation settings. Immutable for the lifetime of an export job.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Value shown at progress 0.
    pub start: f64,
    /// Value reached at progress 1.
    pub end: f64,
    /// Counter animation duration in seconds.
    pub duration: f64,
    /// Playback speed multiplier applied to counter time.
    pub speed: f64,
    /// Counter typeface.
    pub font: FontSpec,
    /// Numeric formatting.
    pub format: NumberFormat,
    /// Visual treatment of the glyphs.
    pub effect: DesignEffect,
    /// Per-digit transition style.
    pub transition: DigitTransitionConfig,
    /// Easing applied to the value interpolation.
    pub ease: Ease,
    /// Whether digits animate individually or as one block.
    pub layout: DigitLayout,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 100.0,
            duration: 5.0,
            speed: 1.0,
            font: FontSpec::default(),
            format: NumberFormat::default(),
            effect: DesignEffect::Classic,
            transition: DigitTransitionConfig::default(),
            ease: Ease::Linear,
            layout: DigitLayout::PerDigit,
        }
    }
}

impl CounterConfig {
    /// Check value ranges that cannot be expressed through types.
    pub fn validate(&self) -> CountframeResult<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(CountframeError::configuration(
                "counter start/end must be finite",
            ));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(CountframeError::configuration(
                "counter duration must be finite and > 0",
            ));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(CountframeError::configuration(
                "counter speed must be finite and > 0",
            ));
        }
        self.font.validate()?;
        self.format.validate()?;
        self.effect.validate()?;
        self.transition.validate()?;
        Ok(())
    }
}

/// Typeface selection for counter or overlay text.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FontSpec {
    /// Family name recorded in metadata and used to pick a face from `source`.
    pub family: String,
    /// Font file to shape text with. The built-in segment font is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    /// Font size in pixels before job scaling.
    pub size_px: f64,
    /// CSS-style weight (100..=900).
    pub weight: u16,
    /// Fill color.
    pub color: Rgba8,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_owned(),
            source: None,
            size_px: 96.0,
            weight: 700,
            color: Rgba8::WHITE,
        }
    }
}

impl FontSpec {
    /// Reject non-positive sizes and out-of-range weights.
    pub fn validate(&self) -> CountframeResult<()> {
        if !self.size_px.is_finite() || self.size_px <= 0.0 {
            return Err(CountframeError::configuration(
                "font size_px must be finite and > 0",
            ));
        }
        if !(100..=900).contains(&self.weight) {
            return Err(CountframeError::configuration(format!(
                "font weight {} is outside 100..=900",
                self.weight
            )));
        }
        Ok(())
    }
}

/// Digit grouping separator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Separator {
    /// `1,234.5`
    #[default]
    Comma,
    /// `1.234,5`
    Period,
    /// `1 234.5`
    Space,
    /// `1'234.5`
    Apostrophe,
    /// `1234.5`
    None,
}

impl Separator {
    /// Grouping character, if any.
    pub fn group_char(self) -> Option<char> {
        match self {
            Self::Comma => Some(','),
            Self::Period => Some('.'),
            Self::Space => Some(' '),
            Self::Apostrophe => Some('\''),
            Self::None => None,
        }
    }

    /// Decimal mark paired with this separator.
    pub fn decimal_mark(self) -> char {
        match self {
            Self::Period => ',',
            _ => '.',
        }
    }
}

/// Numeric formatting of the counter value.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NumberFormat {
    /// Thousands separator.
    pub separator: Separator,
    /// Decimal places (0..=[`MAX_DECIMALS`]).
    pub decimals: u8,
    /// Text placed before the number.
    pub prefix: String,
    /// Text placed after the number.
    pub suffix: String,
}

impl NumberFormat {
    /// Reject too many decimals.
    pub fn validate(&self) -> CountframeResult<()> {
        if self.decimals > MAX_DECIMALS {
            return Err(CountframeError::configuration(format!(
                "decimals must be <= {MAX_DECIMALS}"
            )));
        }
        Ok(())
    }

    /// Format `value` with these settings.
    pub fn format(&self, value: f64) -> String {
        crate::scene::format::format_number(value, self)
    }
}

/// Color stop of a multi-stop gradient.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    /// Position along the gradient axis in `[0, 1]`.
    pub offset: f64,
    /// Color at `offset`.
    pub color: Rgba8,
}

impl GradientStop {
    /// Stop at `offset` with `color`.
    pub const fn new(offset: f64, color: Rgba8) -> Self {
        Self { offset, color }
    }
}

/// Visual treatment of counter glyphs.
///
/// Each variant owns its parameters; effects are dispatched by exhaustive `match`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DesignEffect {
    /// Plain fill in the font color.
    #[default]
    Classic,
    /// Stacked blurred glow passes under a bright core.
    Neon {
        /// Glow color.
        #[serde(default = "default_neon_color")]
        color: Rgba8,
        /// Glow strength multiplier.
        #[serde(default = "default_intensity")]
        intensity: f64,
    },
    /// One soft glow pass under the solid glyphs.
    Glow {
        /// Glow color.
        #[serde(default = "default_glow_color")]
        color: Rgba8,
        /// Glow strength multiplier.
        #[serde(default = "default_intensity")]
        intensity: f64,
    },
    /// Vertical multi-stop fill.
    Gradient {
        /// Top-to-bottom color stops.
        #[serde(default = "default_gradient_stops")]
        stops: Vec<GradientStop>,
    },
    /// Warm glow under a vertical fire gradient.
    Fire {
        /// Bottom-to-top color stops.
        #[serde(default = "default_fire_stops")]
        stops: Vec<GradientStop>,
        /// Glow strength multiplier.
        #[serde(default = "default_intensity")]
        glow: f64,
    },
    /// Horizontal multi-stop fill.
    Rainbow {
        /// Left-to-right color stops.
        #[serde(default = "default_rainbow_stops")]
        stops: Vec<GradientStop>,
    },
    /// Soft shadow under a vertical metallic gradient.
    Chrome {
        /// Top-to-bottom color stops.
        #[serde(default = "default_chrome_stops")]
        stops: Vec<GradientStop>,
    },
}

impl DesignEffect {
    /// Return `true` for effects that need blurred passes.
    pub fn is_complex(&self) -> bool {
        matches!(
            self,
            Self::Neon { .. } | Self::Glow { .. } | Self::Fire { .. } | Self::Chrome { .. }
        )
    }

    /// Stable lowercase name, as used in JSON.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Neon { .. } => "neon",
            Self::Glow { .. } => "glow",
            Self::Gradient { .. } => "gradient",
            Self::Fire { .. } => "fire",
            Self::Rainbow { .. } => "rainbow",
            Self::Chrome { .. } => "chrome",
        }
    }

    /// Check intensities and gradient stops.
    pub fn validate(&self) -> CountframeResult<()> {
        match self {
            Self::Classic => Ok(()),
            Self::Neon { intensity, .. } | Self::Glow { intensity, .. } => {
                validate_intensity(self.name(), *intensity)
            }
            Self::Fire { stops, glow } => {
                validate_intensity(self.name(), *glow)?;
                validate_stops(self.name(), stops)
            }
            Self::Gradient { stops } | Self::Rainbow { stops } | Self::Chrome { stops } => {
                validate_stops(self.name(), stops)
            }
        }
    }
}

fn validate_intensity(effect: &str, v: f64) -> CountframeResult<()> {
    if !v.is_finite() || !(0.0..=4.0).contains(&v) {
        return Err(CountframeError::configuration(format!(
            "{effect} intensity must be in [0, 4]"
        )));
    }
    Ok(())
}

fn validate_stops(effect: &str, stops: &[GradientStop]) -> CountframeResult<()> {
    if stops.is_empty() {
        return Err(CountframeError::configuration(format!(
            "{effect} needs at least one gradient stop"
        )));
    }
    let mut prev = 0.0;
    for s in stops {
        if !s.offset.is_finite() || !(0.0..=1.0).contains(&s.offset) {
            return Err(CountframeError::configuration(format!(
                "{effect} stop offsets must be in [0, 1]"
            )));
        }
        if s.offset < prev {
            return Err(CountframeError::configuration(format!(
                "{effect} stop offsets must be non-decreasing"
            )));
        }
        prev = s.offset;
    }
    Ok(())
}

fn default_intensity() -> f64 {
    1.0
}

fn default_neon_color() -> Rgba8 {
    Rgba8::rgb(0x00, 0xF0, 0xFF)
}

fn default_glow_color() -> Rgba8 {
    Rgba8::rgb(0xFF, 0xFF, 0xFF)
}

fn default_gradient_stops() -> Vec<GradientStop> {
    vec![
        GradientStop::new(0.0, Rgba8::rgb(0x66, 0x7E, 0xEA)),
        GradientStop::new(1.0, Rgba8::rgb(0x76, 0x4B, 0xA2)),
    ]
}

fn default_fire_stops() -> Vec<GradientStop> {
    vec![
        GradientStop::new(0.0, Rgba8::rgb(0xFF, 0x3D, 0x00)),
        GradientStop::new(0.5, Rgba8::rgb(0xFF, 0x91, 0x00)),
        GradientStop::new(1.0, Rgba8::rgb(0xFF, 0xEA, 0x00)),
    ]
}

fn default_rainbow_stops() -> Vec<GradientStop> {
    vec![
        GradientStop::new(0.0, Rgba8::rgb(0xFF, 0x00, 0x00)),
        GradientStop::new(0.17, Rgba8::rgb(0xFF, 0x7F, 0x00)),
        GradientStop::new(0.33, Rgba8::rgb(0xFF, 0xFF, 0x00)),
        GradientStop::new(0.5, Rgba8::rgb(0x00, 0xFF, 0x00)),
        GradientStop::new(0.67, Rgba8::rgb(0x00, 0x00, 0xFF)),
        GradientStop::new(0.83, Rgba8::rgb(0x4B, 0x00, 0x82)),
        GradientStop::new(1.0, Rgba8::rgb(0x94, 0x00, 0xD3)),
    ]
}

fn default_chrome_stops() -> Vec<GradientStop> {
    vec![
        GradientStop::new(0.0, Rgba8::rgb(0xF5, 0xF5, 0xF5)),
        GradientStop::new(0.45, Rgba8::rgb(0x9E, 0x9E, 0x9E)),
        GradientStop::new(0.55, Rgba8::rgb(0x61, 0x61, 0x61)),
        GradientStop::new(1.0, Rgba8::rgb(0xE0, 0xE0, 0xE0)),
    ]
}

/// Digit animation granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigitLayout {
    /// Every character position transitions independently.
    #[default]
    PerDigit,
    /// The formatted string transitions as one unit.
    SingleBlock,
}

/// Static text drawn on top of the counter.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextOverlayConfig {
    /// Draw the overlay at all.
    pub enabled: bool,
    /// Overlay text.
    pub text: String,
    /// Overlay typeface and color.
    pub font: FontSpec,
    /// Overlay opacity in `[0, 1]`.
    pub opacity: f64,
    /// Horizontal offset from canvas center in pixels (before scaling).
    pub offset_x: f64,
    /// Vertical offset from canvas center in pixels (before scaling).
    pub offset_y: f64,
}

impl Default for TextOverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            text: String::new(),
            font: FontSpec {
                size_px: 32.0,
                weight: 400,
                ..FontSpec::default()
            },
            opacity: 1.0,
            offset_x: 0.0,
            offset_y: 120.0,
        }
    }
}

impl TextOverlayConfig {
    /// Return `true` when there is something to draw.
    pub fn is_visible(&self) -> bool {
        self.enabled && self.opacity > 0.0 && !self.text.trim().is_empty()
    }

    /// Check opacity, offsets and font.
    pub fn validate(&self) -> CountframeResult<()> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(CountframeError::configuration(
                "overlay opacity must be in [0, 1]",
            ));
        }
        if !self.offset_x.is_finite() || !self.offset_y.is_finite() {
            return Err(CountframeError::configuration(
                "overlay offsets must be finite",
            ));
        }
        self.font.validate()
    }
}

/// Frame background.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Background {
    /// Fully transparent pixels.
    #[default]
    Transparent,
    /// Solid fill.
    Solid {
        /// Fill color.
        color: Rgba8,
    },
}

impl Background {
    /// Return `true` when the background leaves alpha at zero.
    pub fn is_transparent(self) -> bool {
        match self {
            Self::Transparent => true,
            Self::Solid { color } => color.a < 255,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
