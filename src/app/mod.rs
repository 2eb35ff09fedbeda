//! Application runtime composition modules.

pub(crate) mod config;
pub(crate) mod console;
pub(crate) mod runtime;
