//! Quality presets and export size/time estimation.

pub(crate) mod estimate;
pub(crate) mod presets;
