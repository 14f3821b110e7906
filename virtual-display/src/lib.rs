// src/lib.rs

mod hyprctl;
mod runner;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use hyprctl::{Hyprctl, HYPRCTL};
pub use runner::{CommandOutput, CommandRunner, SystemRunner};
