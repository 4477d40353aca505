#![forbid(unsafe_code)]

//! `entry-bridge`: client-side control core for a remote data-entry engine.
//!
//! The engine owns all entry semantics; this crate owns presentation,
//! navigation authority, dialog arbitration and session recovery.

pub mod channel;
pub mod command;
pub mod config;
pub mod controller;
pub mod dialog;
pub mod errors;
pub mod loader;
pub mod models;
pub mod navigation;
pub mod presenter;
pub mod resolver;
pub mod session;
pub mod surface;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
