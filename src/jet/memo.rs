//! Memo (LVAL) field resolution.
//!
//! A memo field in a record is a 12-byte header: the payload length with
//! two flag bits folded into the top, a packed record pointer, and four
//! unused bytes. Short values are stored inline after the header; longer
//! ones live in a single overflow record named by the pointer (LVAL type 1).
//! The multi-page chain form (LVAL type 2) is not supported — it is logged
//! and decoded best-effort.
//!
//! Memo resolution never fails a row: every error path degrades to a lossy
//! UTF-8 reading of the raw field bytes.

use byteorder::{ByteOrder, LittleEndian};
use log::warn;

use crate::jet::constants::*;
use crate::jet::page::{resolve_record_pointer, PageIndex};
use crate::jet::value::{decode_text, Value};
use crate::jet::version::JetVersion;

/// Resolve and decode one memo field.
///
/// `data` is the field's slice within the record; `buf` and `pages` locate
/// overflow records elsewhere in the file.
pub fn decode_memo(data: &[u8], buf: &[u8], pages: &PageIndex, version: JetVersion) -> Value {
    if data.len() < MEMO_HDR_SIZE {
        warn!(
            "{}-byte memo field is shorter than its header, raw bytes kept",
            data.len()
        );
        return Value::Str(String::from_utf8_lossy(data).into_owned());
    }

    let len_flags = LittleEndian::read_u32(&data[..4]);
    let pointer = LittleEndian::read_u32(&data[4..8]);
    let length = (len_flags & MEMO_LEN_MASK) as usize;

    if len_flags & MEMO_FLAG_INLINE != 0 {
        let payload = &data[MEMO_HDR_SIZE..];
        let end = length.min(payload.len());
        return Value::Str(decode_text(&payload[..end], version));
    }

    if len_flags & MEMO_FLAG_LVAL1 != 0 {
        return match resolve_record_pointer(buf, pages, version, pointer) {
            Some(range) => Value::Str(decode_text(&buf[range], version)),
            None => {
                warn!(
                    "memo record pointer {:#010x} does not resolve, raw bytes kept",
                    pointer
                );
                Value::Str(String::from_utf8_lossy(data).into_owned())
            }
        };
    }

    warn!("multi-page memo chains are not supported, header decoded best-effort");
    Value::Str(decode_text(data, version))
}
