//! Table-definition (TDEF) page parsing.
//!
//! A table definition starts on a `02 01` page and may continue on further
//! TDEF pages linked through the next-page pointer; the payloads concatenate
//! into one logical stream. The stream carries the table header (row count,
//! column counts, index counts), per-index metadata, the column descriptors,
//! and finally the column-name table, zipped with the descriptors by
//! position.
//!
//! Columns are keyed by `column_index - min(column_index)`; when that
//! collides the stable column id is used instead. Some files reuse the
//! positional index while keeping ids stable, so the fallback order matters.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::jet::constants::*;
use crate::jet::page::{PageIndex, PageKind};
use crate::jet::value::{decode_text, JetType};
use crate::jet::version::JetVersion;
use crate::MdbError;

/// One column of a table definition.
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    /// Column name from the TDEF name table.
    pub name: String,
    /// Declared type.
    pub ty: JetType,
    /// Stable identifier; indexes the record null bitmap.
    pub column_id: u16,
    /// Positional index.
    pub column_index: u16,
    /// Position among the variable-length columns.
    pub var_index: u16,
    /// Byte offset of the value within the fixed-length region.
    pub fixed_offset: u16,
    /// Declared length in bytes.
    pub length: u16,
    /// Descriptor flags.
    pub flags: u8,
}

impl Column {
    /// Whether the value lives in the fixed-length region of each record.
    pub fn is_fixed(&self) -> bool {
        self.flags & COL_FLAG_FIXED != 0
    }
}

/// Parsed table definition.
#[derive(Debug, Clone, Serialize)]
pub struct TableDef {
    /// Rows the table claims to hold.
    pub row_count: u32,
    /// Total column count.
    pub column_count: u16,
    /// Count of variable-length columns.
    pub var_column_count: u16,
    /// Total index count.
    pub index_count: u32,
    /// Physical index count; sizes the metadata block before the columns.
    pub real_index_count: u32,
    /// Columns in column-map key order.
    pub columns: Vec<Column>,
}

impl TableDef {
    /// Parse the table definition rooted at `tdef_page`, following the
    /// continuation chain to its end.
    pub fn parse(
        buf: &[u8],
        index: &PageIndex,
        tdef_page: u32,
        version: JetVersion,
    ) -> Result<Self, MdbError> {
        let stream = assemble_stream(buf, index, tdef_page)?;
        parse_stream(&stream, version)
    }
}

/// Concatenate a TDEF page chain into one logical byte stream.
///
/// The first page contributes its full contents; continuation pages skip
/// their own 8-byte header.
fn assemble_stream(buf: &[u8], index: &PageIndex, first: u32) -> Result<Vec<u8>, MdbError> {
    let page = index
        .page(buf, first)
        .filter(|_| index.kind(first) == Some(PageKind::TableDef))
        .ok_or_else(|| {
            MdbError::TableHeaderCorrupt(format!("page {} is not a table definition", first))
        })?;

    let mut stream = page.to_vec();
    let mut next = LittleEndian::read_u32(&page[TDEF_NEXT_PAGE..]);
    let mut visited = 1u32;
    while next != 0 {
        // A chain longer than the file is a cycle.
        if visited > index.page_count() {
            return Err(MdbError::TableHeaderCorrupt(format!(
                "definition chain starting at page {} does not terminate",
                first
            )));
        }
        let page = index
            .page(buf, next)
            .filter(|_| index.kind(next) == Some(PageKind::TableDef))
            .ok_or_else(|| {
                MdbError::TableHeaderCorrupt(format!(
                    "definition chain continues onto invalid page {}",
                    next
                ))
            })?;
        stream.extend_from_slice(&page[TDEF_CONTINUATION_HDR..]);
        next = LittleEndian::read_u32(&page[TDEF_NEXT_PAGE..]);
        visited += 1;
    }
    Ok(stream)
}

fn parse_stream(stream: &[u8], version: JetVersion) -> Result<TableDef, MdbError> {
    let v3 = version == JetVersion::V3;
    let (row_at, var_at, cols_at, idx_at, real_idx_at) = if v3 {
        (
            TDEF_J3_ROW_COUNT,
            TDEF_J3_VAR_COLS,
            TDEF_J3_COLS,
            TDEF_J3_NUM_IDX,
            TDEF_J3_NUM_REAL_IDX,
        )
    } else {
        (
            TDEF_J4_ROW_COUNT,
            TDEF_J4_VAR_COLS,
            TDEF_J4_COLS,
            TDEF_J4_NUM_IDX,
            TDEF_J4_NUM_REAL_IDX,
        )
    };
    let idx_base = if v3 { TDEF_J3_IDX_BASE } else { TDEF_J4_IDX_BASE };
    let idx_entry = if v3 { TDEF_J3_IDX_ENTRY } else { TDEF_J4_IDX_ENTRY };
    let col_entry = if v3 { TDEF_J3_COL_ENTRY } else { TDEF_J4_COL_ENTRY };

    if stream.len() < idx_base {
        return Err(MdbError::TableHeaderCorrupt(format!(
            "definition stream of {} bytes is shorter than its header",
            stream.len()
        )));
    }

    let row_count = LittleEndian::read_u32(&stream[row_at..]);
    let var_column_count = LittleEndian::read_u16(&stream[var_at..]);
    let column_count = LittleEndian::read_u16(&stream[cols_at..]);
    let index_count = LittleEndian::read_u32(&stream[idx_at..]);
    let real_index_count = LittleEndian::read_u32(&stream[real_idx_at..]);

    let col_base = idx_base + real_index_count as usize * idx_entry;
    let names_base = col_base + column_count as usize * col_entry;
    if stream.len() < names_base {
        return Err(MdbError::TableHeaderCorrupt(format!(
            "definition stream ends inside the column descriptors ({} columns, {} real indexes)",
            column_count, real_index_count
        )));
    }

    let mut columns = Vec::with_capacity(column_count as usize);
    for i in 0..column_count as usize {
        columns.push(parse_column(&stream[col_base + i * col_entry..], version));
    }

    let names = parse_name_table(&stream[names_base..], column_count as usize, version)
        .ok_or_else(|| {
            MdbError::TableHeaderCorrupt("definition stream ends inside the name table".to_string())
        })?;
    for (col, name) in columns.iter_mut().zip(names) {
        col.name = name;
    }

    let columns = build_column_map(columns, column_count)?;

    Ok(TableDef {
        row_count,
        column_count,
        var_column_count,
        index_count,
        real_index_count,
        columns,
    })
}

fn parse_column(data: &[u8], version: JetVersion) -> Column {
    if version == JetVersion::V3 {
        Column {
            name: String::new(),
            ty: JetType::from_u8(data[0]),
            column_id: LittleEndian::read_u16(&data[COL_J3_ID..]),
            var_index: LittleEndian::read_u16(&data[COL_J3_VAR_INDEX..]),
            column_index: LittleEndian::read_u16(&data[COL_J3_INDEX..]),
            fixed_offset: LittleEndian::read_u16(&data[COL_J3_FIXED_OFFSET..]),
            length: LittleEndian::read_u16(&data[COL_J3_LENGTH..]),
            flags: data[COL_J3_FLAGS],
        }
    } else {
        Column {
            name: String::new(),
            ty: JetType::from_u8(data[0]),
            column_id: LittleEndian::read_u16(&data[COL_J4_ID..]),
            var_index: LittleEndian::read_u16(&data[COL_J4_VAR_INDEX..]),
            column_index: LittleEndian::read_u16(&data[COL_J4_INDEX..]),
            fixed_offset: LittleEndian::read_u16(&data[COL_J4_FIXED_OFFSET..]),
            length: LittleEndian::read_u16(&data[COL_J4_LENGTH..]),
            flags: data[COL_J4_FLAGS],
        }
    }
}

/// Read `count` names from the name table. Jet 3 names are a u8 length and
/// single-byte text; Jet 4+ names are a u16 length and UTF-16LE text.
fn parse_name_table(data: &[u8], count: usize, version: JetVersion) -> Option<Vec<String>> {
    let mut names = Vec::with_capacity(count);
    let mut pos = 0usize;
    for _ in 0..count {
        let len = if version == JetVersion::V3 {
            let l = *data.get(pos)? as usize;
            pos += 1;
            l
        } else {
            let bytes = data.get(pos..pos + 2)?;
            pos += 2;
            LittleEndian::read_u16(bytes) as usize
        };
        let raw = data.get(pos..pos + len)?;
        pos += len;
        names.push(decode_text(raw, version));
    }
    Some(names)
}

/// Key the descriptors by `column_index - min_index`, falling back to the
/// stable column id on collision. Either keying must recover every column.
fn build_column_map(columns: Vec<Column>, column_count: u16) -> Result<Vec<Column>, MdbError> {
    let min_index = columns.iter().map(|c| c.column_index).min().unwrap_or(0);

    let by_index: BTreeMap<u16, &Column> = columns
        .iter()
        .map(|c| (c.column_index - min_index, c))
        .collect();
    if by_index.len() == columns.len() {
        return Ok(by_index.into_values().cloned().collect());
    }

    let by_id: BTreeMap<u16, &Column> = columns.iter().map(|c| (c.column_id, c)).collect();
    if by_id.len() == columns.len() && by_id.len() == column_count as usize {
        return Ok(by_id.into_values().cloned().collect());
    }

    Err(MdbError::TableHeaderCorrupt(format!(
        "column map holds {} of {} columns",
        by_id.len(),
        column_count
    )))
}
