//! Database module: models and schema for persistent storage.
//!
//! Layout:
//! - `models.rs`: post/comment rows and the shared timestamp format
//! - `schema.rs`: SQL DDL for initializing the database
//! - `sqlite.rs`: `BlogStorage`, the query layer used by the handlers

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Comment, FlaggedComment, Post};
pub use sqlite::BlogStorage;

/// Connect to `database_url` and make sure the schema exists.
pub async fn connect(database_url: &str) -> Result<BlogStorage, crate::BlogError> {
    BlogStorage::connect(database_url).await
}
