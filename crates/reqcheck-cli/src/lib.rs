//! reqcheck command-line front end

pub mod cli;
pub mod replay;

pub use cli::{Cli, Commands};
pub use replay::{replay, ReplayReport, Scenario};
