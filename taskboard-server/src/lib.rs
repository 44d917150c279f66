//! Taskboard task service library.
//!
//! Exposes the REST server for use in tests and embedding. The server keeps
//! tasks in memory and can be told to fail or stall a share of requests,
//! which makes it a realistic counterpart for the client's retry and
//! rollback paths.

pub mod api;
pub mod config;
pub mod faults;
pub mod table;
