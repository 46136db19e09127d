//! Remodel CLI - Command-line interface for Remodel schema migrations.
//!
//! This crate provides the `remodel` binary for managing Remodel projects:
//! scaffolding, plan generation, applying plans, and status reporting.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
