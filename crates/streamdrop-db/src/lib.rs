//! Streamdrop-DB: the record registry.
//!
//! SQLite via rusqlite with r2d2 connection pooling. The `files` table is the
//! single source of truth for whether a share link is still valid.
//!
//! # Modules
//!
//! - `migrations` - Embedded schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching the schema
//! - `queries` - Registry operations
//!
//! # Example
//!
//! ```no_run
//! use streamdrop_db::pool::{init_pool, get_conn};
//! use streamdrop_db::queries::files;
//!
//! let pool = init_pool("/var/lib/streamdrop/registry.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let record = files::get_file(&conn, "AbC12XyZ").unwrap();
//! println!("{} expires at {:?}", record.name, record.expires_at);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
