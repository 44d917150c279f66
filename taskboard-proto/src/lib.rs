//! Shared task model and wire definitions for the task board.

pub mod api;
pub mod task;
