//! Core domain types
//!
//! This module contains the structures shared by the HTTP client, the
//! synchronization layer and the CLI. They describe what a parsing job is,
//! how it is launched and how its progress is reported.

pub mod catalog;
pub mod descriptor;
pub mod job;
pub mod log;
