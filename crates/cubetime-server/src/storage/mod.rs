//! `SQLite` storage for the `CubeTime` server.
//!
//! Provides persistence for QR validation sessions (the Session Store) and
//! validated attempts (the Leaderboard Store). Each store operation is a
//! single statement, so row-level atomicity comes from `SQLite` itself.

mod db;
mod models;
mod queries_leaderboard;
mod queries_sessions;


pub use cubetime_core::db::DatabaseError;
pub use db::CompetitionDatabase;
pub use models::*;
pub use queries_leaderboard::{LeaderboardFilter, NewEntryParams};
pub use queries_sessions::NewSessionParams;
