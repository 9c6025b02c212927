// ABOUTME: Command module aggregator for the rollwright CLI.
// ABOUTME: Re-exports run, classify, and phases command handlers.

mod inspect;
mod run;

pub use inspect::{classify_error, show_phases};
pub use run::run;
