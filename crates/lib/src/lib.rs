//! cish-lib: build orchestration for cish scripts
//!
//! This crate provides everything between a script on disk and the compiler:
//! - `script`: the tree of required scripts and the incremental build cache
//! - `extension`: extension package scanning and load-order resolution
//! - `assets`: content-addressed cache of downloaded artifacts
//! - `version`: version strings and constraints
//! - `build`: the pipeline tying these together

pub mod assets;
pub mod build;
pub mod config;
pub mod consts;
pub mod extension;
pub mod platform;
pub mod script;
pub mod util;
pub mod version;
