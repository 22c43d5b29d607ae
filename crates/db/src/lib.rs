//! Persistence for the storefront provisioning toolkit.
//!
//! Entities are JSON documents kept behind the [`DocumentStore`] trait, with
//! a PostgreSQL implementation ([`PgStore`]) and an in-process one
//! ([`MemoryStore`]). [`Query`] reads the entity graph and [`Linker`] manages
//! cross-module link records.

pub mod document;
pub mod error;
pub mod link;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use document::Document;
pub use error::{StoreError, StoreResult};
pub use link::{LinkRecord, LinkSide, Linker};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use query::{Filter, GraphQuery, Query};
pub use store::DocumentStore;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
