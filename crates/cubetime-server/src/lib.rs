//! `CubeTime` Competition Server Library
//!
//! Backend for a speedcubing competition:
//! - `SQLite` storage for QR sessions and the leaderboard
//! - QR payload format and SVG rendering
//! - Admin email notification of issued sessions
//! - Competition services (issue, validate, rank, clear)
//! - JSON HTTP API over those services

pub mod competition;
pub mod http;
pub mod notifications;
pub mod qr;
pub mod storage;
