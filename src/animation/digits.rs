//! Per-digit transition state machine.
//!
//! Every displayed position owns a [`TransitionSlot`]. A slot is `Active(value)` until its target
//! changes; it then runs an exiting layer (old value) and an entering layer (new value)
//! concurrently, and collapses back to `Active(new)` once `delay + duration + index * stagger`
//! has elapsed.
//!
//! Retargeting a slot that is still transitioning cancels and restarts: the in-flight exit is
//! discarded, the in-flight entering glyph becomes the new exiting glyph starting from the
//! transform it currently renders with, and a fresh entry begins.
//!
//! All motion is described by [`DigitTransform`] values computed from local progress; nothing
//! here touches shared or global state.

use crate::animation::ease::Ease;
use crate::foundation::core::{Affine, Point, Rect, Vec2};
use crate::foundation::error::{CountframeError, CountframeResult};
use crate::foundation::math::lerp;

/// Digit transition style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DigitTransitionKind {
    /// Values swap instantly.
    #[default]
    None,
    /// Roll down from above while fading in.
    FadeRoll,
    /// Flip down about the top edge.
    FlipDown,
    /// Slide down from above, fully opaque.
    SlideVertical,
    /// Drop in with an overshooting settle.
    Bounce,
    /// Grow from nothing while fading in.
    Scale,
}

/// Timing and style of digit transitions.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DigitTransitionConfig {
    /// Transition style.
    pub kind: DigitTransitionKind,
    /// Duration of one entry/exit in milliseconds.
    pub duration_ms: f64,
    /// Easing applied to local transition progress.
    pub ease: Ease,
    /// Delay before every transition starts, in milliseconds.
    pub delay_ms: f64,
    /// Extra delay per left-to-right digit index, in milliseconds.
    pub stagger_ms: f64,
}

impl Default for DigitTransitionConfig {
    fn default() -> Self {
        Self {
            kind: DigitTransitionKind::None,
            duration_ms: 300.0,
            ease: Ease::EaseOut,
            delay_ms: 0.0,
            stagger_ms: 50.0,
        }
    }
}

impl DigitTransitionConfig {
    /// Reject non-finite or negative timings.
    pub fn validate(&self) -> CountframeResult<()> {
        for (name, v) in [
            ("duration_ms", self.duration_ms),
            ("delay_ms", self.delay_ms),
            ("stagger_ms", self.stagger_ms),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(CountframeError::configuration(format!(
                    "digit transition {name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }

    /// Time from a value change until the slot at `index` is settled again.
    pub fn settle_ms(&self, index: usize) -> f64 {
        self.start_offset_ms(index) + self.duration_ms
    }

    /// Eased local progress of a transition `elapsed_ms` after the change, for the slot at
    /// `index` (left-to-right).
    pub fn local_progress(&self, elapsed_ms: f64, index: usize) -> f64 {
        let t = elapsed_ms - self.start_offset_ms(index);
        if t <= 0.0 {
            return self.ease.apply(0.0);
        }
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        self.ease.apply(t / self.duration_ms)
    }

    fn start_offset_ms(&self, index: usize) -> f64 {
        self.delay_ms + (index as f64) * self.stagger_ms
    }
}

/// Anchor for scale and flip transforms, relative to the glyph cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransformOrigin {
    /// Top edge, horizontally centered.
    Top,
    /// Cell center.
    #[default]
    Center,
    /// Bottom edge, horizontally centered.
    Bottom,
}

/// Explicit transform of one glyph layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DigitTransform {
    /// Vertical translation as a fraction of the cell height (positive is down).
    pub translate_y: f64,
    /// Horizontal scale.
    pub scale_x: f64,
    /// Vertical scale.
    pub scale_y: f64,
    /// Rotation about the horizontal axis in degrees (rendered as vertical foreshortening).
    pub rotate_x_deg: f64,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f64,
    /// Anchor for scale and rotation.
    pub origin: TransformOrigin,
}

impl DigitTransform {
    /// Untransformed, fully opaque.
    pub const IDENTITY: Self = Self {
        translate_y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
        rotate_x_deg: 0.0,
        opacity: 1.0,
        origin: TransformOrigin::Center,
    };

    /// Fully transparent.
    pub const HIDDEN: Self = Self {
        opacity: 0.0,
        ..Self::IDENTITY
    };

    /// Component-wise interpolation; the origin switches to `to`'s origin.
    pub fn lerp(self, to: Self, t: f64) -> Self {
        Self {
            translate_y: lerp(self.translate_y, to.translate_y, t),
            scale_x: lerp(self.scale_x, to.scale_x, t),
            scale_y: lerp(self.scale_y, to.scale_y, t),
            rotate_x_deg: lerp(self.rotate_x_deg, to.rotate_x_deg, t),
            opacity: lerp(self.opacity, to.opacity, t).clamp(0.0, 1.0),
            origin: to.origin,
        }
    }

    /// Effective vertical scale including rotateX foreshortening.
    pub fn effective_scale_y(&self) -> f64 {
        self.scale_y * self.rotate_x_deg.to_radians().cos()
    }

    /// Return `true` when drawing this layer can produce visible pixels.
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0 && self.scale_x.abs() > 1e-6 && self.effective_scale_y().abs() > 1e-6
    }

    /// Map glyph-space coordinates inside `cell` through this transform.
    pub fn to_affine(&self, cell: Rect) -> Affine {
        let anchor = match self.origin {
            TransformOrigin::Top => Point::new(cell.center().x, cell.y0),
            TransformOrigin::Center => cell.center(),
            TransformOrigin::Bottom => Point::new(cell.center().x, cell.y1),
        };
        let shift = Vec2::new(0.0, self.translate_y * cell.height());
        Affine::translate(shift + anchor.to_vec2())
            * Affine::scale_non_uniform(self.scale_x, self.effective_scale_y())
            * Affine::translate(-anchor.to_vec2())
    }
}

impl DigitTransitionKind {
    /// Transform of an entering glyph at eased local progress `q`.
    pub fn enter(self, q: f64) -> DigitTransform {
        let q = q.clamp(-0.5, 1.5);
        let id = DigitTransform::IDENTITY;
        match self {
            Self::None => id,
            Self::FadeRoll => DigitTransform {
                translate_y: q - 1.0,
                opacity: q.clamp(0.0, 1.0),
                ..id
            },
            Self::FlipDown => DigitTransform {
                rotate_x_deg: -90.0 * (1.0 - q),
                origin: TransformOrigin::Top,
                ..id
            },
            Self::SlideVertical => DigitTransform {
                translate_y: q - 1.0,
                ..id
            },
            Self::Bounce => {
                let travel = keyframes(q, &BOUNCE_TRAVEL);
                DigitTransform {
                    translate_y: travel - 1.0,
                    scale_x: travel,
                    scale_y: travel,
                    ..id
                }
            }
            Self::Scale => DigitTransform {
                scale_x: q,
                scale_y: q,
                opacity: q.clamp(0.0, 1.0),
                ..id
            },
        }
    }

    /// Transform an exiting glyph reaches at the end of its exit.
    pub fn exit_target(self) -> DigitTransform {
        let id = DigitTransform::IDENTITY;
        match self {
            Self::None => DigitTransform::HIDDEN,
            Self::FadeRoll => DigitTransform {
                translate_y: 1.0,
                opacity: 0.0,
                ..id
            },
            Self::FlipDown => DigitTransform {
                rotate_x_deg: 90.0,
                origin: TransformOrigin::Bottom,
                ..id
            },
            Self::SlideVertical => DigitTransform {
                translate_y: 1.0,
                ..id
            },
            Self::Bounce => DigitTransform {
                scale_x: 0.0,
                scale_y: 0.0,
                ..id
            },
            Self::Scale => DigitTransform {
                scale_x: 0.0,
                scale_y: 0.0,
                opacity: 0.0,
                ..id
            },
        }
    }
}

/// Travel keyframes for the bounce entry: overshoot to 110%, settle back through 95%.
const BOUNCE_TRAVEL: [(f64, f64); 4] = [(0.0, 0.0), (0.5, 1.1), (0.75, 0.95), (1.0, 1.0)];

fn keyframes(q: f64, keys: &[(f64, f64)]) -> f64 {
    let Some(&(first_t, first_v)) = keys.first() else {
        return q;
    };
    if q <= first_t {
        return first_v;
    }
    for pair in keys.windows(2) {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        if q <= t1 {
            let span = (t1 - t0).max(f64::EPSILON);
            return lerp(v0, v1, (q - t0) / span);
        }
    }
    keys.last().map(|&(_, v)| v).unwrap_or(q)
}

/// Role of a sampled layer within its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerRole {
    /// Settled value.
    Active,
    /// New value moving in.
    Entering,
    /// Previous value moving out.
    Exiting,
}

/// One drawable layer of a slot at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotLayer<V> {
    /// Value drawn by this layer.
    pub value: V,
    /// Transform applied to the glyph cell.
    pub transform: DigitTransform,
    /// Which phase produced the layer.
    pub role: LayerRole,
}

#[derive(Clone, Debug, PartialEq)]
struct ExitingLayer<V> {
    value: V,
    from: DigitTransform,
}

#[derive(Clone, Debug, PartialEq)]
enum SlotPhase<V> {
    Active(Option<V>),
    Transitioning {
        exiting: Option<ExitingLayer<V>>,
        entering: Option<V>,
        changed_at_ms: f64,
    },
}

/// Transition state of one displayed position. `None` values are blank positions.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionSlot<V> {
    phase: SlotPhase<V>,
}

impl<V: Clone + PartialEq> TransitionSlot<V> {
    /// A settled slot showing `value`.
    pub fn new(value: Option<V>) -> Self {
        Self {
            phase: SlotPhase::Active(value),
        }
    }

    /// The value this slot is showing or moving towards.
    pub fn target(&self) -> Option<&V> {
        match &self.phase {
            SlotPhase::Active(v) => v.as_ref(),
            SlotPhase::Transitioning { entering, .. } => entering.as_ref(),
        }
    }

    /// Return `true` while an entry or exit is in flight.
    pub fn is_transitioning(&self) -> bool {
        matches!(self.phase, SlotPhase::Transitioning { .. })
    }

    /// Return `true` for a settled blank position.
    pub fn is_blank(&self) -> bool {
        matches!(self.phase, SlotPhase::Active(None))
    }

    /// Collapse a finished transition into `Active`.
    pub fn advance(&mut self, now_ms: f64, index: usize, cfg: &DigitTransitionConfig) {
        if let SlotPhase::Transitioning {
            entering,
            changed_at_ms,
            ..
        } = &self.phase
            && now_ms - changed_at_ms >= cfg.settle_ms(index)
        {
            self.phase = SlotPhase::Active(entering.clone());
        }
    }

    /// Retarget the slot at `now_ms`. No-op when `value` equals the current target.
    pub fn set_target(
        &mut self,
        value: Option<V>,
        now_ms: f64,
        index: usize,
        cfg: &DigitTransitionConfig,
    ) {
        if self.target() == value.as_ref() {
            return;
        }
        if cfg.kind == DigitTransitionKind::None {
            self.phase = SlotPhase::Active(value);
            return;
        }

        let phase = std::mem::replace(&mut self.phase, SlotPhase::Active(None));
        let exiting = match phase {
            SlotPhase::Active(old) => old.map(|value| ExitingLayer {
                value,
                from: DigitTransform::IDENTITY,
            }),
            SlotPhase::Transitioning {
                entering,
                changed_at_ms,
                ..
            } => {
                let q = cfg.local_progress(now_ms - changed_at_ms, index);
                entering.map(|value| ExitingLayer {
                    value,
                    from: cfg.kind.enter(q),
                })
            }
        };

        self.phase = SlotPhase::Transitioning {
            exiting,
            entering: value,
            changed_at_ms: now_ms,
        };
    }

    /// Sample drawable layers at `now_ms`, exiting layer first.
    pub fn layers(
        &self,
        now_ms: f64,
        index: usize,
        cfg: &DigitTransitionConfig,
    ) -> Vec<SlotLayer<V>> {
        match &self.phase {
            SlotPhase::Active(None) => Vec::new(),
            SlotPhase::Active(Some(v)) => vec![SlotLayer {
                value: v.clone(),
                transform: DigitTransform::IDENTITY,
                role: LayerRole::Active,
            }],
            SlotPhase::Transitioning {
                exiting,
                entering,
                changed_at_ms,
            } => {
                let q = cfg.local_progress(now_ms - changed_at_ms, index);
                let mut out = Vec::with_capacity(2);
                if let Some(ex) = exiting {
                    out.push(SlotLayer {
                        value: ex.value.clone(),
                        transform: ex.from.lerp(cfg.kind.exit_target(), q),
                        role: LayerRole::Exiting,
                    });
                }
                if let Some(v) = entering {
                    out.push(SlotLayer {
                        value: v.clone(),
                        transform: cfg.kind.enter(q),
                        role: LayerRole::Entering,
                    });
                }
                out
            }
        }
    }
}

/// One displayed position sampled for drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct DigitColumn {
    /// Left-to-right stagger index.
    pub index: usize,
    /// Current target character (`None` while the position is exiting to blank).
    pub target: Option<char>,
    /// Drawable layers, exiting first.
    pub layers: Vec<SlotLayer<char>>,
}

/// Per-character transition track for a formatted counter string.
///
/// Slots are aligned from the right so the units position keeps its slot when the string grows.
#[derive(Clone, Debug)]
pub struct DigitTrack {
    cfg: DigitTransitionConfig,
    slots: Vec<TransitionSlot<char>>, // slots[0] is the rightmost position
    len: usize,
    primed: bool,
}

impl DigitTrack {
    /// Create an empty track. The first update shows its text without transitions.
    pub fn new(cfg: DigitTransitionConfig) -> Self {
        Self {
            cfg,
            slots: Vec::new(),
            len: 0,
            primed: false,
        }
    }

    /// Number of live slots (may exceed the text length while positions exit).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Return `true` while any slot is transitioning.
    pub fn is_transitioning(&self) -> bool {
        self.slots.iter().any(TransitionSlot::is_transitioning)
    }

    /// Retarget every position to `text` at `now_ms`.
    pub fn update(&mut self, text: &str, now_ms: f64) {
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        self.len = n;

        if !self.primed {
            self.slots = chars.iter().rev().map(|&c| TransitionSlot::new(Some(c))).collect();
            self.primed = true;
            return;
        }

        if self.slots.len() < n {
            self.slots.resize_with(n, || TransitionSlot::new(None));
        }
        for (k, slot) in self.slots.iter_mut().enumerate() {
            let index = stagger_index(k, n);
            slot.advance(now_ms, index, &self.cfg);
            let target = (k < n).then(|| chars[n - 1 - k]);
            slot.set_target(target, now_ms, index, &self.cfg);
        }
        while self.slots.len() > n && self.slots.last().is_some_and(TransitionSlot::is_blank) {
            self.slots.pop();
        }
    }

    /// Sample all positions left to right.
    pub fn sample(&self, now_ms: f64) -> Vec<DigitColumn> {
        let n = self.len;
        (0..self.slots.len())
            .rev()
            .map(|k| {
                let index = stagger_index(k, n);
                let slot = &self.slots[k];
                DigitColumn {
                    index,
                    target: slot.target().copied(),
                    layers: slot.layers(now_ms, index, &self.cfg),
                }
            })
            .collect()
    }
}

fn stagger_index(k_from_right: usize, len: usize) -> usize {
    len.saturating_sub(k_from_right + 1)
}

/// Whole-string transition track used by single-block layouts.
#[derive(Clone, Debug)]
pub struct BlockTrack {
    cfg: DigitTransitionConfig,
    slot: TransitionSlot<String>,
    primed: bool,
}

impl BlockTrack {
    /// Create an empty block track.
    pub fn new(cfg: DigitTransitionConfig) -> Self {
        Self {
            cfg,
            slot: TransitionSlot::new(None),
            primed: false,
        }
    }

    /// Retarget the block to `text` at `now_ms`.
    pub fn update(&mut self, text: &str, now_ms: f64) {
        if !self.primed {
            self.slot = TransitionSlot::new(Some(text.to_owned()));
            self.primed = true;
            return;
        }
        self.slot.advance(now_ms, 0, &self.cfg);
        self.slot
            .set_target(Some(text.to_owned()), now_ms, 0, &self.cfg);
    }

    /// Sample block layers, exiting first.
    pub fn sample(&self, now_ms: f64) -> Vec<SlotLayer<String>> {
        self.slot.layers(now_ms, 0, &self.cfg)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/digits.rs"]
mod tests;
