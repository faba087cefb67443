//! Database facade.
//!
//! [`Database`] is the primary entry point. Construction takes the complete
//! file as one byte buffer, verifies the header, classifies every page,
//! links data pages to the table definitions that own them, and extracts
//! the user-table catalog. Tables are then parsed on request.
//!
//! The instance is immutable after construction; callers that parse tables
//! concurrently should give each thread its own `Database` over a shared
//! buffer.

use std::collections::{BTreeMap, HashMap};

use log::warn;
use serde::Serialize;

use crate::jet::catalog;
use crate::jet::constants::*;
use crate::jet::page::{
    record_slots, resolve_record_pointer, DataPageHeader, PageIndex, RecordSlot,
};
use crate::jet::record::decode_row;
use crate::jet::tdef::TableDef;
use crate::jet::value::Value;
use crate::jet::version::{detect_version, JetVersion};
use crate::MdbError;

/// One decoded table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    /// Column name → decoded value.
    pub data: BTreeMap<String, Value>,
    /// 1-based position in scan order; deleted records are not numbered.
    pub row_number: u64,
}

/// A table definition page together with the data pages that point at it.
#[derive(Debug, Clone)]
struct TableObject {
    data_pages: Vec<u32>,
}

/// An open Jet database held in memory.
pub struct Database {
    buf: Vec<u8>,
    version: JetVersion,
    pages: PageIndex,
    tables: HashMap<u32, TableObject>,
    catalog: BTreeMap<String, u32>,
}

impl Database {
    /// Parse the file header and catalog of a complete database image.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mdb::jet::database::Database;
    ///
    /// let bytes = std::fs::read("northwind.mdb").unwrap();
    /// let db = Database::from_bytes(bytes).unwrap();
    /// for name in db.table_names() {
    ///     let rows = db.parse_table(name).unwrap();
    ///     println!("{}: {} rows", name, rows.len());
    /// }
    /// ```
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self, MdbError> {
        let version = detect_version(&buf)?;
        let pages = PageIndex::classify(&buf, version)?;

        // Every TDEF page owns a table object, even before any data page
        // points at it; a defined table with no data is still addressable.
        let mut tables: HashMap<u32, TableObject> = pages
            .tdef_pages()
            .map(|no| (no, TableObject { data_pages: Vec::new() }))
            .collect();
        for no in pages.data_pages() {
            let page = match pages.page(&buf, no) {
                Some(p) => p,
                None => continue,
            };
            match DataPageHeader::parse(page, version) {
                Some(header) => {
                    if let Some(table) = tables.get_mut(&header.owner) {
                        table.data_pages.push(no);
                    }
                }
                None => warn!("data page {} has an unreadable header, ignored", no),
            }
        }

        let catalog_object = tables.get(&CATALOG_PAGE).ok_or_else(|| {
            MdbError::MalformedBuffer(format!(
                "no catalog table definition at page {}",
                CATALOG_PAGE
            ))
        })?;
        let catalog_def = TableDef::parse(&buf, &pages, CATALOG_PAGE, version)?;
        let rows = parse_rows(
            &buf,
            &pages,
            version,
            &catalog_def,
            &catalog_object.data_pages,
        )?;
        let data: Vec<_> = rows.into_iter().map(|r| r.data).collect();
        let catalog = catalog::build_catalog(&catalog_def, &data)?;

        Ok(Database {
            buf,
            version,
            pages,
            tables,
            catalog,
        })
    }

    /// Detected Jet dialect.
    pub fn version(&self) -> JetVersion {
        self.version
    }

    /// Names of the user tables in the catalog, sorted.
    pub fn table_names(&self) -> Vec<&str> {
        self.catalog.keys().map(String::as_str).collect()
    }

    /// Parse every row of one user table.
    pub fn parse_table(&self, name: &str) -> Result<Vec<Row>, MdbError> {
        let root = *self
            .catalog
            .get(name)
            .ok_or_else(|| MdbError::UnknownTable(name.to_string()))?;
        let object = self.tables.get(&root).ok_or_else(|| {
            MdbError::TableHeaderCorrupt(format!(
                "catalog entry for {} points at page {}, which holds no table definition",
                name, root
            ))
        })?;
        if object.data_pages.is_empty() {
            return Err(MdbError::EmptyTable(name.to_string()));
        }
        let tdef = TableDef::parse(&self.buf, &self.pages, root, self.version)?;
        parse_rows(
            &self.buf,
            &self.pages,
            self.version,
            &tdef,
            &object.data_pages,
        )
    }
}

/// Decode the rows of one table from its data pages, in scan order.
///
/// Per-row failures are logged and skipped; only schema-level mismatches
/// are errors.
fn parse_rows(
    buf: &[u8],
    pages: &PageIndex,
    version: JetVersion,
    tdef: &TableDef,
    data_pages: &[u32],
) -> Result<Vec<Row>, MdbError> {
    let null_bits = (tdef.column_count as usize).div_ceil(8) * 8;
    if let Some(col) = tdef
        .columns
        .iter()
        .find(|c| c.column_id as usize >= null_bits)
    {
        return Err(MdbError::TableHeaderCorrupt(format!(
            "column {} has id {}, beyond the {}-bit null bitmap",
            col.name, col.column_id, null_bits
        )));
    }

    let mut rows = Vec::new();
    let mut row_number = 0u64;
    for &no in data_pages {
        let page = match pages.page(buf, no) {
            Some(p) => p,
            None => continue,
        };
        let Some(slots) = record_slots(page, version) else {
            warn!("record offsets on data page {} are unreadable, page skipped", no);
            continue;
        };
        let page_start = no as usize * pages.page_size();

        for slot in slots {
            let range = match slot {
                RecordSlot::Inline(r) => page_start + r.start..page_start + r.end,
                RecordSlot::Overflow(pointer) => {
                    match resolve_record_pointer(buf, pages, version, pointer) {
                        Some(r) => r,
                        None => {
                            warn!(
                                "overflow pointer {:#010x} on page {} does not resolve, row skipped",
                                pointer, no
                            );
                            continue;
                        }
                    }
                }
            };
            if let Some(data) = decode_row(&buf[range], tdef, version, buf, pages) {
                row_number += 1;
                rows.push(Row { data, row_number });
            }
        }
    }
    Ok(rows)
}
