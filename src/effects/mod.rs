pub(crate) mod blur;
pub(crate) mod composite;
pub(crate) mod design;
