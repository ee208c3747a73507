//! CLI subcommand implementations.

pub mod add;
pub mod delete;
pub mod rename;
pub mod reset;
pub mod status;
pub mod switch;
pub mod util;
pub mod watch;
