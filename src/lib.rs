//! Slicing front end for the OrcaSlicer engine.
//!
//! Prepares a print job (model plus printer, filament and process settings)
//! and hands it to an external slicing engine. The engine does all geometric
//! work; this crate decides exactly which configuration and which plate
//! origin it is given.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: typed configuration dictionary, settings and override files
//! - **[`presets`]**: the preset library, selection by name and from project evidence
//! - **[`project`]**, **[`resolver`]**, **[`plate`]**: override extraction,
//!   precedence merge and plate placement
//! - **[`engine`]**: the engine contract and the session that owns it
//! - **[`stages`]**: the slice request pipeline
//! - **[`commands`]**: top-level subcommand orchestration (`slice`, `info`, `list-profiles`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod exec;
pub mod logging;
pub mod plate;
pub mod presets;
pub mod project;
pub mod resolver;
pub mod stages;
