//! Binary-side helpers: effective settings and terminal progress.

pub(crate) mod progress;
pub(crate) mod settings;
