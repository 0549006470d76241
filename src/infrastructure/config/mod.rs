//! Infrastructure configuration modules.

pub mod jobs;
pub mod logging;
pub mod settings;
