//! Row-level record decoding.
//!
//! A Jet record is a small header (1 byte on Jet 3, 2 bytes on Jet 4+), a
//! fixed-length field region, a variable-length field region, and a trailing
//! null bitmap of one bit per column, LSB-first, keyed by the stable column
//! id. Immediately before the bitmap, read backward from the record end,
//! sits the variable-length metadata: the field count, a table of offsets
//! measured from the record start, and on Jet 3 a jump table of field
//! indices marking where a 0x100 bias joins the 8-bit offsets (records
//! longer than 256 bytes cannot address their tail otherwise).
//!
//! Decoding is forgiving per row: a metadata mismatch first retries the
//! parse from nearby tail anchors before the row is dropped with a warning,
//! and a value that cannot be carved degrades to null instead of failing
//! the table.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::jet::constants::*;
use crate::jet::memo;
use crate::jet::page::PageIndex;
use crate::jet::tdef::TableDef;
use crate::jet::value::{decode_value, JetType, Value};
use crate::jet::version::JetVersion;

/// Trailing variable-length metadata of one record.
#[derive(Debug, Clone, PartialEq)]
struct VarMeta {
    /// Offsets from the record start; entry `count` bounds the last field.
    offsets: Vec<usize>,
    /// Jet 3 jump table: field indices where the 0x100 bias advances.
    jumps: Vec<u8>,
}

/// Parse the variable-length metadata whose count field ends at `tail`.
fn parse_var_meta_at(rec: &[u8], tail: usize, version: JetVersion) -> Option<(usize, VarMeta)> {
    let es = version.var_entry_size();
    if tail > rec.len() || tail < es {
        return None;
    }
    let count = if es == 1 {
        rec[tail - 1] as usize
    } else {
        LittleEndian::read_u16(&rec[tail - 2..tail]) as usize
    };

    // count + 1 offsets precede the count, highest index first.
    let table_bytes = es * (count + 1);
    let table_base = tail.checked_sub(es + table_bytes)?;
    let mut offsets = Vec::with_capacity(count + 1);
    for i in 0..=count {
        let at = tail - es - es * (i + 1);
        offsets.push(if es == 1 {
            rec[at] as usize
        } else {
            LittleEndian::read_u16(&rec[at..at + 2]) as usize
        });
    }

    let jumps = if version == JetVersion::V3 {
        let jump_count = (rec.len() - 1) / 256;
        let base = table_base.checked_sub(jump_count)?;
        rec[base..table_base].to_vec()
    } else {
        Vec::new()
    };

    Some((count, VarMeta { offsets, jumps }))
}

/// Locate and parse the variable-length metadata of a record.
///
/// The canonical anchor is just below the null bitmap (skipping one zero
/// pad byte on Jet 4+). When the count found there disagrees with the
/// table's variable-column count, nearby tail anchors are tried before
/// giving up — files produced by some writers shift the block by a byte
/// or two.
fn parse_var_meta(
    rec: &[u8],
    version: JetVersion,
    null_bytes: usize,
    expected: usize,
) -> Option<VarMeta> {
    let mut tail = rec.len().checked_sub(null_bytes)?;
    if version != JetVersion::V3 && tail > 0 && rec[tail - 1] == 0 {
        tail -= 1;
    }
    if let Some((count, meta)) = parse_var_meta_at(rec, tail, version) {
        if count == expected {
            return Some(meta);
        }
    }

    for delta in 0..VAR_META_SCAN_WINDOW {
        let Some(anchor) = rec.len().checked_sub(delta) else {
            break;
        };
        if let Some((count, meta)) = parse_var_meta_at(rec, anchor, version) {
            if count == expected {
                debug!(
                    "variable-length metadata recovered {} bytes from the record end",
                    delta
                );
                return Some(meta);
            }
        }
    }
    None
}

/// Decode one record into a column-name → value map.
///
/// Returns `None` when the record is unusable (too short for its bitmap,
/// or variable-length metadata that cannot be reconciled); the caller skips
/// the row and keeps going. `buf` and `pages` serve memo fields, whose
/// payloads may live on other pages.
pub fn decode_row(
    rec: &[u8],
    table: &TableDef,
    version: JetVersion,
    buf: &[u8],
    pages: &PageIndex,
) -> Option<BTreeMap<String, Value>> {
    let null_bytes = (table.column_count as usize).div_ceil(8);
    let prefix = version.record_prefix();
    if rec.len() < prefix + null_bytes {
        warn!(
            "{}-byte record cannot hold a {}-byte null bitmap, skipped",
            rec.len(),
            null_bytes
        );
        return None;
    }

    let bitmap = &rec[rec.len() - null_bytes..];
    let has_value = |id: u16| {
        let id = id as usize;
        bitmap
            .get(id / 8)
            .is_some_and(|b| b >> (id % 8) & 1 != 0)
    };

    let body = &rec[prefix..];
    let mut data = BTreeMap::new();

    // Fixed-length pass.
    for col in table.columns.iter().filter(|c| c.is_fixed()) {
        if col.ty == JetType::Bool {
            // Yes/No values have no payload; the bitmap is the carrier.
            data.insert(col.name.clone(), Value::Bool(has_value(col.column_id)));
            continue;
        }
        if !has_value(col.column_id) {
            data.insert(col.name.clone(), Value::Null);
            continue;
        }
        let len = col.ty.fixed_size().unwrap_or(col.length as usize);
        let start = col.fixed_offset as usize;
        let value = match body.get(start..start + len) {
            Some(slice) => decode_value(slice, col.ty, col.length as usize, version),
            None => {
                debug!("fixed column {} overruns the record, null substituted", col.name);
                Value::Null
            }
        };
        data.insert(col.name.clone(), value);
    }

    // Variable-length pass.
    let var_columns: Vec<_> = table.columns.iter().filter(|c| !c.is_fixed()).collect();
    if !var_columns.is_empty() {
        let Some(meta) = parse_var_meta(
            rec,
            version,
            null_bytes,
            table.var_column_count as usize,
        ) else {
            warn!(
                "variable-length metadata does not match {} expected columns, row dropped",
                table.var_column_count
            );
            return None;
        };

        // The jump table marks the offset indices where a 0x100 bias joins;
        // fold it into the table up front so a field crossing the boundary
        // still sees a biased end offset.
        let mut offsets = meta.offsets.clone();
        let mut bias = 0usize;
        for (j, off) in offsets.iter_mut().enumerate() {
            if meta.jumps.contains(&(j as u8)) {
                bias += 0x100;
            }
            *off += bias;
        }

        for (i, col) in var_columns.iter().enumerate() {
            if !has_value(col.column_id) {
                data.insert(col.name.clone(), Value::Null);
                continue;
            }
            let Some((&off_start, &off_end)) = offsets.get(i).zip(offsets.get(i + 1)) else {
                debug!("no offset entry for column {}, null substituted", col.name);
                data.insert(col.name.clone(), Value::Null);
                continue;
            };
            let mut start = off_start;
            let mut end = off_end;
            if version != JetVersion::V3 {
                // 16-bit offsets occasionally carry a truncated high byte.
                if start > rec.len() {
                    start &= 0xFF;
                }
                if end > rec.len() {
                    end &= 0xFF;
                }
            }

            let value = if start == end {
                Value::Str(String::new())
            } else if start < end && end <= rec.len() {
                let slice = &rec[start..end];
                if col.ty == JetType::Memo {
                    memo::decode_memo(slice, buf, pages, version)
                } else {
                    decode_value(slice, col.ty, col.length as usize, version)
                }
            } else {
                debug!(
                    "column {} spans {}..{} outside the record, null substituted",
                    col.name, start, end
                );
                Value::Null
            };
            data.insert(col.name.clone(), value);
        }
    }

    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jet::tdef::Column;
    use byteorder::{ByteOrder, LittleEndian};

    fn column(name: &str, ty: JetType, id: u16, flags: u8, fixed_offset: u16, length: u16) -> Column {
        Column {
            name: name.to_string(),
            ty,
            column_id: id,
            column_index: id,
            var_index: 0,
            fixed_offset,
            length,
            flags,
        }
    }

    fn table(columns: Vec<Column>) -> TableDef {
        let var = columns.iter().filter(|c| !c.is_fixed()).count() as u16;
        TableDef {
            row_count: 0,
            column_count: columns.len() as u16,
            var_column_count: var,
            index_count: 0,
            real_index_count: 0,
            columns,
        }
    }

    fn empty_pages() -> (Vec<u8>, PageIndex) {
        let buf = vec![0u8; 0x1000];
        let pages = PageIndex::classify(&buf, JetVersion::V4).unwrap();
        (buf, pages)
    }

    /// Assemble a Jet 4 record: prefix, fixed bytes, var fields, offsets
    /// table (highest index first), count, pad, null bitmap.
    fn build_record_j4(fixed: &[u8], vars: &[&[u8]], bitmap: &[u8]) -> Vec<u8> {
        let mut rec = vec![0u8; 2];
        rec.extend_from_slice(fixed);
        let mut offsets = Vec::new();
        for v in vars {
            offsets.push(rec.len() as u16);
            rec.extend_from_slice(v);
        }
        offsets.push(rec.len() as u16);
        for off in offsets.iter().rev() {
            let mut b = [0u8; 2];
            LittleEndian::write_u16(&mut b, *off);
            rec.extend_from_slice(&b);
        }
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, vars.len() as u16);
        rec.extend_from_slice(&b);
        rec.push(0); // pad
        rec.extend_from_slice(bitmap);
        rec
    }

    /// Assemble a Jet 3 record with an explicit jump table.
    fn build_record_j3(fixed: &[u8], vars: &[&[u8]], bitmap: &[u8]) -> Vec<u8> {
        let mut rec = vec![0u8; 1];
        rec.extend_from_slice(fixed);
        let mut absolute = Vec::new();
        for v in vars {
            absolute.push(rec.len());
            rec.extend_from_slice(v);
        }
        absolute.push(rec.len());

        // Predict the final record length to size the jump table the way
        // the reader will: jumps, offset table, count, bitmap.
        let mut len = rec.len() + (vars.len() + 1) + 1 + bitmap.len();
        let mut jump_count = (len - 1) / 256;
        len += jump_count;
        jump_count = (len - 1) / 256;

        // Field indices whose offset crosses each 0x100 boundary.
        let mut jumps = Vec::new();
        for boundary in 1..=jump_count {
            let idx = absolute
                .iter()
                .position(|&a| a >= boundary * 0x100)
                .unwrap_or(vars.len());
            jumps.push(idx as u8);
        }
        rec.extend_from_slice(&jumps);
        for off in absolute.iter().rev() {
            rec.push((*off & 0xFF) as u8);
        }
        rec.push(vars.len() as u8);
        rec.extend_from_slice(bitmap);
        rec
    }

    #[test]
    fn test_fixed_columns_decode() {
        let t = table(vec![
            column("age", JetType::Int, 0, COL_FLAG_FIXED, 0, 2),
            column("score", JetType::LongInt, 1, COL_FLAG_FIXED, 2, 4),
        ]);
        let mut fixed = [0u8; 6];
        LittleEndian::write_i16(&mut fixed[..2], 23);
        LittleEndian::write_i32(&mut fixed[2..], -7);
        let rec = build_record_j4(&fixed, &[], &[0b0000_0011]);
        let (buf, pages) = empty_pages();

        let row = decode_row(&rec, &t, JetVersion::V4, &buf, &pages).unwrap();
        assert_eq!(row["age"], Value::Int(23));
        assert_eq!(row["score"], Value::Int(-7));
    }

    #[test]
    fn test_null_bitmap_governs_values() {
        let t = table(vec![
            column("a", JetType::Int, 0, COL_FLAG_FIXED, 0, 2),
            column("b", JetType::Int, 1, COL_FLAG_FIXED, 2, 2),
        ]);
        let mut fixed = [0u8; 4];
        LittleEndian::write_i16(&mut fixed[..2], 1);
        LittleEndian::write_i16(&mut fixed[2..], 2);
        // Only column id 1 carries a value.
        let rec = build_record_j4(&fixed, &[], &[0b0000_0010]);
        let (buf, pages) = empty_pages();

        let row = decode_row(&rec, &t, JetVersion::V4, &buf, &pages).unwrap();
        assert_eq!(row["a"], Value::Null);
        assert_eq!(row["b"], Value::Int(2));
    }

    #[test]
    fn test_bool_carried_by_bitmap() {
        let t = table(vec![
            column("yes", JetType::Bool, 0, COL_FLAG_FIXED, 0, 0),
            column("no", JetType::Bool, 1, COL_FLAG_FIXED, 0, 0),
        ]);
        let rec = build_record_j4(&[], &[], &[0b0000_0001]);
        let (buf, pages) = empty_pages();

        let row = decode_row(&rec, &t, JetVersion::V4, &buf, &pages).unwrap();
        assert_eq!(row["yes"], Value::Bool(true));
        assert_eq!(row["no"], Value::Bool(false));
    }

    #[test]
    fn test_variable_text_jet4() {
        let t = table(vec![column("name", JetType::Text, 0, 0, 0, 50)]);
        let john: Vec<u8> = "John".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let rec = build_record_j4(&[], &[&john], &[0b0000_0001]);
        let (buf, pages) = empty_pages();

        let row = decode_row(&rec, &t, JetVersion::V4, &buf, &pages).unwrap();
        assert_eq!(row["name"], Value::Str("John".to_string()));
    }

    #[test]
    fn test_empty_variable_field_is_empty_string() {
        let t = table(vec![column("note", JetType::Text, 0, 0, 0, 50)]);
        let rec = build_record_j4(&[], &[b""], &[0b0000_0001]);
        let (buf, pages) = empty_pages();

        let row = decode_row(&rec, &t, JetVersion::V4, &buf, &pages).unwrap();
        assert_eq!(row["note"], Value::Str(String::new()));
    }

    #[test]
    fn test_null_variable_field() {
        let t = table(vec![column("note", JetType::Text, 0, 0, 0, 50)]);
        let rec = build_record_j4(&[], &[b""], &[0b0000_0000]);
        let (buf, pages) = empty_pages();

        let row = decode_row(&rec, &t, JetVersion::V4, &buf, &pages).unwrap();
        assert_eq!(row["note"], Value::Null);
    }

    #[test]
    fn test_jet3_long_record_jump_table() {
        // Two text fields with the second starting past 256 bytes; its
        // 8-bit offset only decodes correctly through the jump table.
        let t = table(vec![
            column("big", JetType::Text, 0, 0, 0, 400),
            column("tail", JetType::Text, 1, 0, 0, 50),
        ]);
        let big = vec![b'x'; 300];
        let rec = build_record_j3(&[], &[&big, b"end"], &[0b0000_0011]);
        let (buf, pages) = empty_pages();

        let row = decode_row(&rec, &t, JetVersion::V3, &buf, &pages).unwrap();
        assert_eq!(row["big"], Value::Str("x".repeat(300)));
        assert_eq!(row["tail"], Value::Str("end".to_string()));
    }

    #[test]
    fn test_metadata_recovery_scan() {
        // Omit the Jet 4 pad byte; the canonical anchor misreads the count
        // and the scan must find the true position.
        let t = table(vec![column("name", JetType::Text, 0, 0, 0, 50)]);
        let mut rec = vec![0u8; 2];
        let abc: Vec<u8> = "abc".encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
        let start = rec.len() as u16;
        rec.extend_from_slice(&abc);
        let end = rec.len() as u16;
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, end);
        rec.extend_from_slice(&b);
        LittleEndian::write_u16(&mut b, start);
        rec.extend_from_slice(&b);
        LittleEndian::write_u16(&mut b, 1); // count, no pad after
        rec.extend_from_slice(&b);
        rec.push(0b0000_0001);
        let (buf, pages) = empty_pages();

        let row = decode_row(&rec, &t, JetVersion::V4, &buf, &pages).unwrap();
        assert_eq!(row["name"], Value::Str("abc".to_string()));
    }

    #[test]
    fn test_unreconcilable_metadata_drops_row() {
        let t = table(vec![column("name", JetType::Text, 0, 0, 0, 50)]);
        // A record with no variable metadata at all.
        let rec = vec![0u8; 3];
        let (buf, pages) = empty_pages();
        assert!(decode_row(&rec, &t, JetVersion::V4, &buf, &pages).is_none());
    }

    #[test]
    fn test_record_too_short_for_bitmap() {
        let t = table(vec![column("a", JetType::Int, 0, COL_FLAG_FIXED, 0, 2)]);
        let (buf, pages) = empty_pages();
        assert!(decode_row(&[0u8; 1], &t, JetVersion::V4, &buf, &pages).is_none());
    }
}
