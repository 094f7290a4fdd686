//! Tally Core
//!
//! Core types for the Tally parsing-job console.
//!
//! This crate contains:
//! - Domain types: jobs, status snapshots, launch descriptors and the reference catalog
//! - DTOs: request/response bodies exchanged with the parsing backend

pub mod domain;
pub mod dto;
pub mod timestamp;
