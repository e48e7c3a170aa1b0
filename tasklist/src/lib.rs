//! `tasklist` -- task list client library.

pub mod app;
pub mod config;
pub mod service;
pub mod shell;
pub mod ui;
