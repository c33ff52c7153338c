//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite storage backend.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per logical record (progress, page fragment, collection, final)
CREATE TABLE IF NOT EXISTS blobs (
    key TEXT PRIMARY KEY,
    body TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
