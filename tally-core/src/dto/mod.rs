//! Data Transfer Objects for backend communication
//!
//! Wire shapes of the parsing backend's request and response bodies. Domain
//! types that travel unchanged (snapshots, catalog entries) are not repeated
//! here.

pub mod job;
