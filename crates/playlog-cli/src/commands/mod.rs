//! Subcommand implementations

pub mod flush;
pub mod run;
pub mod session;
pub mod status;
pub mod sync;
