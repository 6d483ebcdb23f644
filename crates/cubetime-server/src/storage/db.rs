//! `SQLite` database for the `CubeTime` server.

cubetime_core::define_database!(
    CompetitionDatabase,
    "Competition database migrations complete"
);
