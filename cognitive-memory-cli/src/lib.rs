//! # Cognitive Memory CLI
//!
//! Command-line front end for `cognitive_memory_core::facade::CognitiveMemory`.
//! Exposes the five façade operations as subcommands; everything else
//! (activation spreading, bridge discovery, decay, file sync) lives in the
//! library and is reached only through that façade.

pub mod commands;
pub mod config;
pub mod errors;
pub mod output;
