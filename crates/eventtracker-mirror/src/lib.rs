//! Event tracker mirror database.
//!
//! `PostgreSQL` implementation of the mirror repository plus pool setup and
//! migrations.

pub mod config;
pub mod pg_mirror_repository;

pub use config::MirrorConfig;
pub use pg_mirror_repository::PgMirrorRepository;

/// Migrations for the mirror schema, embedded from the workspace
/// `migrations/` directory.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
