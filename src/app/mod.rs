//! Process-level wiring: logging and startup.

pub mod logging;
pub mod setup;
