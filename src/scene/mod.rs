pub(crate) mod format;
pub(crate) mod model;
