//! Taskboard: a terminal kanban board that keeps its state in sync with a
//! remote task service.
//!
//! Status moves are applied optimistically and rolled back if the service
//! rejects them; every remote call goes through a bounded retry; the last
//! move can be undone for a short window.

pub mod app;
pub mod board;
pub mod config;
pub mod driver;
pub mod remote;
pub mod retry;
pub mod ui;
