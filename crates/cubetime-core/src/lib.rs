//! `CubeTime` Core Library
//!
//! Shared functionality for the `CubeTime` competition server:
//! - Configuration resolution and hierarchy
//! - Admin allow-list
//! - `SQLite` helpers and the `define_database!` macro
//! - Injectable clock for expiry decisions
//! - Common error types

pub mod admins;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use admins::AdminAllowList;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
