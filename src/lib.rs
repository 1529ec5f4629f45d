//! Boot configuration engine for EPass devices.
//!
//! Hardware features (buses, USB modes, add-on peripherals) are switched on
//! by listing their identifiers on the `interface=` and `ext=` lines of the
//! bootloader's `uEnv.txt`. This crate knows which features exist, which
//! board revisions support them, and how they depend on or exclude each
//! other, and rewrites the file without disturbing anything else in it.
//!
//! The public API is organised into layers:
//!
//! - **[`registry`]**: the option catalog and its dependency graph
//! - **[`uenv`]**: byte-exact loading and atomic rewriting of `uEnv.txt`
//! - **[`state`]**: enabled flags and the enable/disable protocol
//! - **[`device`]**: revision and screen detection from flash
//! - **[`commands`]**: top-level subcommand orchestration (`list`, `enable`, ...)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod device;
pub mod error;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod state;
pub mod uenv;
