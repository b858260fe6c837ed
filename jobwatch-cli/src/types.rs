//! CLI argument types

use clap::ValueEnum;
use jobwatch_client::BackendMode;

/// Transport mode as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Pick the best supported transport
    Auto,
    /// Persistent status stream
    Push,
    /// Recurring status polls
    Poll,
}

impl std::fmt::Display for ModeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModeArg::Auto => "auto",
            ModeArg::Push => "push",
            ModeArg::Poll => "poll",
        };
        f.write_str(name)
    }
}

impl From<ModeArg> for BackendMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => BackendMode::Auto,
            ModeArg::Push => BackendMode::Push,
            ModeArg::Poll => BackendMode::Poll,
        }
    }
}
