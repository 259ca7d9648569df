//! Mort: a personal task list with time tracking.
//!
//! This module exports the core components for the binary and for testing.

pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod filter;
pub mod format;
pub mod range;
pub mod report;
pub mod types;
