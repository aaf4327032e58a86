//! Frame consumers: PNG sequence optimization and alpha-video encoding.
//!
//! Every consumer receives frames in strictly increasing index order through [`sink::FrameSink`].

pub(crate) mod ffmpeg;
pub(crate) mod png_seq;
pub(crate) mod sink;
pub(crate) mod video;
