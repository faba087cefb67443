//! MSysObjects catalog extraction.
//!
//! Jet keeps its object catalog in the MSysObjects table, whose definition
//! always sits at page index 2. Each catalog row names an object, its type,
//! its flags, and an id whose low bytes hold the object's root page. User
//! tables are the rows with the user-table type and no flag bits; system
//! objects carry the well-known flag values (stored as signed 32-bit, so
//! both sign forms occur) and are never exposed.

use std::collections::BTreeMap;

use log::{debug, warn};

use crate::jet::constants::*;
use crate::jet::tdef::TableDef;
use crate::jet::value::Value;
use crate::MdbError;

/// Catalog columns the reader requires.
const REQUIRED: [&str; 4] = ["Name", "Type", "Flags", "Id"];

/// Whether a Flags value marks a system object.
pub fn is_system_flags(flags: i64) -> bool {
    CATALOG_SYSTEM_FLAGS.contains(&flags)
}

/// Build the user-table catalog from parsed MSysObjects rows.
///
/// `tdef` is the MSysObjects definition (used to verify the required
/// columns exist) and `rows` its decoded rows. The result maps table names
/// to root data page numbers.
pub fn build_catalog(
    tdef: &TableDef,
    rows: &[BTreeMap<String, Value>],
) -> Result<BTreeMap<String, u32>, MdbError> {
    for required in REQUIRED {
        if !tdef.columns.iter().any(|c| c.name == required) {
            return Err(MdbError::MalformedBuffer(format!(
                "catalog table has no {} column",
                required
            )));
        }
    }

    let mut catalog = BTreeMap::new();
    for row in rows {
        let Some(name) = str_field(row, "Name") else {
            warn!("catalog row without a name, skipped");
            continue;
        };
        let (Some(ty), Some(flags), Some(id)) = (
            int_field(row, "Type"),
            int_field(row, "Flags"),
            int_field(row, "Id"),
        ) else {
            warn!("catalog row for {} is missing fields, skipped", name);
            continue;
        };

        if ty != CATALOG_USER_TABLE_TYPE || flags != 0 || is_system_flags(flags) {
            debug!("catalog row {} excluded (type {}, flags {:#x})", name, ty, flags);
            continue;
        }
        catalog.insert(name.to_string(), (id & CATALOG_ID_PAGE_MASK) as u32);
    }
    Ok(catalog)
}

fn str_field<'a>(row: &'a BTreeMap<String, Value>, name: &str) -> Option<&'a str> {
    match row.get(name)? {
        Value::Str(s) => Some(s),
        _ => None,
    }
}

fn int_field(row: &BTreeMap<String, Value>, name: &str) -> Option<i64> {
    match row.get(name)? {
        Value::Int(v) => Some(*v),
        _ => None,
    }
}
