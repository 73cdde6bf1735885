//! `retake-runner` library crate.
//!
//! Configuration, the interactive menu, and the completion notifier.
//! The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod menu;
pub mod notify;
