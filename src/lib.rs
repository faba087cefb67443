//! Jet / Access database file reading toolkit.
//!
//! The `mdb-utils` crate (library name `mdb`) provides Rust types and
//! functions for parsing Microsoft Jet / Access database files (`.mdb`,
//! `.accdb`) supplied as in-memory byte buffers, and for exposing the user
//! tables inside them as typed rows.
//!
//! Reading is the whole surface: there is no write-back, no SQL layer, no
//! index or relationship handling, and no password or encryption support.
//!
//! # Quick example
//!
//! ```no_run
//! use mdb::jet::database::Database;
//!
//! let bytes = std::fs::read("contacts.mdb").unwrap();
//! let db = Database::from_bytes(bytes).unwrap();
//!
//! println!("Jet version {}", db.version());
//! for name in db.table_names() {
//!     let rows = db.parse_table(name).unwrap();
//!     println!("{}: {} rows", name, rows.len());
//! }
//! ```
//!
//! # Key entry points
//!
//! | Type / Function | Purpose |
//! |-----------------|---------|
//! | [`jet::database::Database`] | Open a file image, list and parse tables |
//! | [`jet::version::JetVersion`] | Detected dialect (3, 4, 5, 2010) |
//! | [`jet::database::Row`] | One decoded row: column map + 1-based number |
//! | [`jet::value::Value`] | Decoded field value |
//! | [`jet::export::rows_to_json`] | Rows as pretty JSON |
//! | [`jet::export::rows_to_csv`] | Rows as RFC 4180 CSV |
//!
//! # Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`jet::database`] | Facade: construction, catalog, table parsing |
//! | [`jet::version`] | File-header verification and dialect detection |
//! | [`jet::page`] | Page classification, record slots, overflow pointers |
//! | [`jet::tdef`] | Table-definition chains and column descriptors |
//! | [`jet::record`] | Row decoding: null bitmap, fixed and variable passes |
//! | [`jet::value`] | Type registry and byte-level primitives |
//! | [`jet::memo`] | Memo (LVAL) field resolution |
//! | [`jet::catalog`] | MSysObjects user-table extraction |
//! | [`jet::export`] | JSON / CSV rendering of parsed rows |
//! | [`jet::constants`] | Jet page and file structure constants |
//!
//! Recoverable per-row conditions (skipped records, memo fallbacks,
//! dangling overflow pointers) are reported through the [`log`] facade;
//! install any `log`-compatible logger to see them.

pub mod jet;

use thiserror::Error;

/// Errors returned by `mdb` operations.
#[derive(Error, Debug)]
pub enum MdbError {
    /// The buffer is not a readable database image (bad magic, length not a
    /// page multiple, missing or corrupt catalog).
    #[error("malformed buffer: {0}")]
    MalformedBuffer(String),

    /// The file header carries a version code this reader does not know.
    #[error("unknown Jet version code {0}")]
    UnknownVersion(u8),

    /// A table definition could not be reconstructed.
    #[error("table definition corrupt: {0}")]
    TableHeaderCorrupt(String),

    /// The requested table is not in the catalog.
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The table is defined but owns no data pages.
    #[error("table {0} has no data pages")]
    EmptyTable(String),
}
