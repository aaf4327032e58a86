//! Export jobs: configuration, lifecycle, progress reporting and packaging.

pub(crate) mod archive;
pub(crate) mod job;
pub(crate) mod progress;
pub(crate) mod session;
pub(crate) mod state;
