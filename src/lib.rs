//! Common functionality for the steel transition model.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod finance;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod plant;
pub mod reference;
pub mod region;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod technology;
pub mod units;
pub mod year;

#[cfg(test)]
mod fixture;

/// Get the directory in which program-wide configuration files (e.g. `settings.toml`) are stored
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("steel-transition");
    path
}
