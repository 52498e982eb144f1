#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod commands;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod directive;
pub mod engine;
pub mod finish;
pub mod prefix;
pub mod state;
