pub(crate) mod counter;
pub(crate) mod digits;
pub(crate) mod ease;
