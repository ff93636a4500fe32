//! Inputs are where user commands come from. There are two flavors: typed
//! commands on the console, and buttons on a game controller. Either way the
//! result is a stream of [Command]s for the dispatcher.

pub mod console;
pub mod controller;

use crate::dispatch::Command;

/// A source of user commands
pub trait Input {
    /// Wait for the user to do something. `None` means nothing actionable
    /// happened this time around (no button pressed, invalid command, etc.),
    /// and the caller should just ask again.
    fn next_command(&mut self) -> anyhow::Result<Option<Command>>;
}
