//! Field-level value decoding for Jet records.
//!
//! Decodes raw bytes carved out of Jet records into typed values, given the
//! column type code and the file dialect. Handles Jet's internal storage
//! encodings: little-endian integers and IEEE 754 floats, the 64-bit
//! fixed-point currency format, the 1899-12-30 floating-point date epoch,
//! raw-byte GUID stringification, and the dialect-dependent text encodings.
//!
//! # Supported types
//!
//! | Code | Access type | Decoder |
//! |------|-------------|---------|
//! | 1 | Yes/No | carried by the null bitmap, no payload |
//! | 2 | Byte | signed 8-bit |
//! | 3 | Integer | signed 16-bit LE |
//! | 4 | Long Integer | signed 32-bit LE |
//! | 5 | Currency | fixed-point / 10000 |
//! | 6 | Single | IEEE 754 32-bit LE |
//! | 7 | Double | IEEE 754 64-bit LE |
//! | 8 | Date/Time | f64 days since 1899-12-30 noon |
//! | 9 | Binary | UTF-8, declared length |
//! | 10 | Text | dialect-dependent, see [`decode_text`] |
//! | 11 | OLE Object | hex passthrough |
//! | 12 | Memo | handled by the memo module |
//! | 15 | Replication ID | GUID, raw byte order |
//! | 16 | Numeric | UTF-8 of the 17-byte payload |
//! | 18 | Complex | signed 32-bit LE side-table id |

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::{UTF_16LE, WINDOWS_1252};
use serde::Serialize;

use crate::jet::version::JetVersion;

/// Decoded field value from a Jet record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Yes/No field.
    Bool(bool),
    /// Signed integer (Byte, Integer, Long Integer, Complex id).
    Int(i64),
    /// Single-precision float.
    Float(f32),
    /// Double-precision float (also Currency after scaling).
    Double(f64),
    /// String value (Text, Memo, Date/Time, GUID, hex passthrough).
    Str(String),
}

/// Jet column type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JetType {
    Bool,
    Byte,
    Int,
    LongInt,
    Currency,
    Float,
    Double,
    DateTime,
    Binary,
    Text,
    Ole,
    Memo,
    Guid,
    Numeric,
    Complex,
    /// Unrecognized type code, decoded as hex passthrough.
    Unknown(u8),
}

impl JetType {
    /// Map an on-disk type code to a `JetType`.
    pub fn from_u8(code: u8) -> Self {
        match code {
            1 => JetType::Bool,
            2 => JetType::Byte,
            3 => JetType::Int,
            4 => JetType::LongInt,
            5 => JetType::Currency,
            6 => JetType::Float,
            7 => JetType::Double,
            8 => JetType::DateTime,
            9 => JetType::Binary,
            10 => JetType::Text,
            11 => JetType::Ole,
            12 => JetType::Memo,
            15 => JetType::Guid,
            16 => JetType::Numeric,
            18 => JetType::Complex,
            other => JetType::Unknown(other),
        }
    }

    /// Intrinsic byte width in the fixed-length region, or `None` when the
    /// width comes from the column's declared length (Text, Binary).
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            JetType::Bool => Some(0),
            JetType::Byte => Some(1),
            JetType::Int => Some(2),
            JetType::LongInt | JetType::Complex => Some(4),
            JetType::Float => Some(4),
            JetType::Currency | JetType::Double | JetType::DateTime => Some(8),
            JetType::Guid => Some(16),
            JetType::Numeric => Some(17),
            _ => None,
        }
    }
}

/// Decode a field value from raw bytes.
///
/// Boolean fields never reach here (the null bitmap is their only carrier)
/// and Memo fields are resolved by the memo module before the payload text
/// is decoded. `length` is the column's declared length, consulted only for
/// the types without an intrinsic width.
pub fn decode_value(data: &[u8], ty: JetType, length: usize, version: JetVersion) -> Value {
    match ty {
        JetType::Bool => Value::Bool(!data.is_empty()),
        JetType::Byte => {
            if data.is_empty() {
                return decode_hex(data);
            }
            Value::Int(data[0] as i8 as i64)
        }
        JetType::Int => {
            if data.len() < 2 {
                return decode_hex(data);
            }
            Value::Int(LittleEndian::read_i16(data) as i64)
        }
        JetType::LongInt | JetType::Complex => {
            if data.len() < 4 {
                return decode_hex(data);
            }
            Value::Int(LittleEndian::read_i32(data) as i64)
        }
        JetType::Currency => decode_money(data),
        JetType::Float => {
            if data.len() < 4 {
                return decode_hex(data);
            }
            Value::Float(LittleEndian::read_f32(data))
        }
        JetType::Double => {
            if data.len() < 8 {
                return decode_hex(data);
            }
            Value::Double(LittleEndian::read_f64(data))
        }
        JetType::DateTime => {
            if data.len() < 8 {
                return decode_hex(data);
            }
            Value::Str(format_datetime(LittleEndian::read_f64(data)))
        }
        JetType::Binary => {
            let end = length.min(data.len());
            Value::Str(String::from_utf8_lossy(&data[..end]).into_owned())
        }
        JetType::Text | JetType::Memo => Value::Str(decode_text(data, version)),
        JetType::Guid => match format_guid(data) {
            Some(s) => Value::Str(s),
            None => decode_hex(data),
        },
        JetType::Numeric => {
            let end = 17.min(data.len());
            Value::Str(String::from_utf8_lossy(&data[..end]).into_owned())
        }
        JetType::Ole | JetType::Unknown(_) => decode_hex(data),
    }
}

/// Decode a text payload according to the file dialect.
///
/// Jet 3 stores text as single-byte data, taken as UTF-8. Jet 4+ stores
/// UTF-16LE by default, but compressed values carry a two-byte `FE FF` (or
/// `FF FE`) marker followed by windows-1252 data.
pub fn decode_text(data: &[u8], version: JetVersion) -> String {
    if version == JetVersion::V3 {
        return String::from_utf8_lossy(data).into_owned();
    }
    if data.len() >= 2 && (data[..2] == [0xFE, 0xFF] || data[..2] == [0xFF, 0xFE]) {
        let (text, _) = WINDOWS_1252.decode_without_bom_handling(&data[2..]);
        return text.into_owned();
    }
    let (text, _) = UTF_16LE.decode_without_bom_handling(data);
    text.into_owned()
}

/// Decode the 64-bit Currency fixed-point format.
///
/// The low 32 bits are unsigned, the high 32 bits signed; the combined
/// integer is scaled by 1/10000.
fn decode_money(data: &[u8]) -> Value {
    if data.len() < 8 {
        return decode_hex(data);
    }
    let low = LittleEndian::read_u32(&data[..4]) as i64;
    let high = LittleEndian::read_i32(&data[4..8]) as i64;
    let scaled = low + (high << 32);
    Value::Double(scaled as f64 / 10000.0)
}

/// Format 16 GUID bytes as `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
///
/// The bytes are emitted in the order read, without the RFC 4122
/// little-endian flip of the first three groups — Jet replication IDs are
/// displayed raw.
pub fn format_guid(data: &[u8]) -> Option<String> {
    if data.len() < 16 {
        return None;
    }
    let hex: Vec<String> = data[..16].iter().map(|b| format!("{:02x}", b)).collect();
    Some(format!(
        "{}-{}-{}-{}-{}",
        hex[..4].join(""),
        hex[4..6].join(""),
        hex[6..8].join(""),
        hex[8..10].join(""),
        hex[10..16].join("")
    ))
}

/// Days from the Unix epoch back to 1899-12-30, the Access date origin.
const ACCESS_EPOCH_UNIX_DAYS: i64 = -25_569;

/// Format an Access Date/Time value as an ISO-8601 UTC timestamp.
///
/// The value counts days since 1899-12-30 at noon. The integer part moves
/// the calendar date; the fraction becomes hours, minutes, seconds, and
/// milliseconds by successive multiplication with truncation. The noon base
/// folds into the hour field modulo 24.
pub fn format_datetime(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}", value);
    }
    let days = value.floor();
    let frac = value - days;

    let hours = frac * 24.0;
    let hour = hours.floor();
    let minutes = (hours - hour) * 60.0;
    let minute = minutes.floor();
    let seconds = (minutes - minute) * 60.0;
    let second = seconds.floor();
    let millis = ((seconds - second) * 1000.0).round() as i64;

    let hour = (12 + hour as i64).rem_euclid(24);
    let (year, month, day) = civil_from_days(ACCESS_EPOCH_UNIX_DAYS + days as i64);

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year, month, day, hour, minute as i64, second as i64, millis
    )
}

/// Convert days since 1970-01-01 to (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    // Algorithm from https://howardhinnant.github.io/date_algorithms.html
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Hex-encode bytes as a fallback for OLE and unknown type codes.
fn decode_hex(data: &[u8]) -> Value {
    let hex: String = data.iter().map(|b| format!("{:02x}", b)).collect();
    Value::Str(format!("0x{}", hex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};

    #[test]
    fn test_type_codes_round() {
        assert_eq!(JetType::from_u8(1), JetType::Bool);
        assert_eq!(JetType::from_u8(4), JetType::LongInt);
        assert_eq!(JetType::from_u8(12), JetType::Memo);
        assert_eq!(JetType::from_u8(15), JetType::Guid);
        assert_eq!(JetType::from_u8(99), JetType::Unknown(99));
    }

    #[test]
    fn test_decode_byte_signed() {
        assert_eq!(
            decode_value(&[0xFF], JetType::Byte, 1, JetVersion::V3),
            Value::Int(-1)
        );
        assert_eq!(
            decode_value(&[0x7F], JetType::Byte, 1, JetVersion::V3),
            Value::Int(127)
        );
    }

    #[test]
    fn test_decode_int16() {
        let mut buf = [0u8; 2];
        LittleEndian::write_i16(&mut buf, -12345);
        assert_eq!(
            decode_value(&buf, JetType::Int, 2, JetVersion::V4),
            Value::Int(-12345)
        );
    }

    #[test]
    fn test_decode_int32() {
        let mut buf = [0u8; 4];
        LittleEndian::write_i32(&mut buf, 1 << 30);
        assert_eq!(
            decode_value(&buf, JetType::LongInt, 4, JetVersion::V4),
            Value::Int(1 << 30)
        );
    }

    #[test]
    fn test_decode_money_scale() {
        let mut buf = [0u8; 8];
        LittleEndian::write_u64(&mut buf, 12345);
        assert_eq!(
            decode_value(&buf, JetType::Currency, 8, JetVersion::V4),
            Value::Double(1.2345)
        );
    }

    #[test]
    fn test_decode_money_negative() {
        let mut buf = [0u8; 8];
        LittleEndian::write_i64(&mut buf, -12_345_000);
        assert_eq!(
            decode_value(&buf, JetType::Currency, 8, JetVersion::V4),
            Value::Double(-1234.5)
        );
    }

    #[test]
    fn test_decode_double() {
        let mut buf = [0u8; 8];
        LittleEndian::write_f64(&mut buf, 2.5);
        assert_eq!(
            decode_value(&buf, JetType::Double, 8, JetVersion::V3),
            Value::Double(2.5)
        );
    }

    #[test]
    fn test_datetime_epoch_is_noon() {
        assert_eq!(format_datetime(0.0), "1899-12-30T12:00:00.000Z");
    }

    #[test]
    fn test_datetime_day_and_half() {
        assert_eq!(format_datetime(1.5), "1899-12-31T00:00:00.000Z");
    }

    #[test]
    fn test_datetime_quarter_day() {
        // 6 hours past noon on the epoch day.
        assert_eq!(format_datetime(0.25), "1899-12-30T18:00:00.000Z");
    }

    #[test]
    fn test_guid_raw_byte_order() {
        let bytes: Vec<u8> = (0..16).map(|i| (i * 0x11) as u8).collect();
        assert_eq!(
            format_guid(&bytes).unwrap(),
            "00112233-4455-6677-8899-aabbccddeeff"
        );
    }

    #[test]
    fn test_guid_too_short() {
        assert!(format_guid(&[0u8; 8]).is_none());
    }

    #[test]
    fn test_text_jet3_utf8() {
        assert_eq!(decode_text(b"hello", JetVersion::V3), "hello");
    }

    #[test]
    fn test_text_jet4_compressed_marker() {
        let mut data = vec![0xFE, 0xFF];
        data.extend_from_slice(b"caf\xE9"); // windows-1252 é
        assert_eq!(decode_text(&data, JetVersion::V4), "café");
    }

    #[test]
    fn test_text_jet4_reversed_marker() {
        let mut data = vec![0xFF, 0xFE];
        data.extend_from_slice(b"abc");
        assert_eq!(decode_text(&data, JetVersion::V4), "abc");
    }

    #[test]
    fn test_text_jet4_utf16le() {
        let mut data = Vec::new();
        for unit in "José".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&data, JetVersion::V4), "José");
    }

    #[test]
    fn test_ole_hex_passthrough() {
        assert_eq!(
            decode_value(&[0xDE, 0xAD], JetType::Ole, 2, JetVersion::V4),
            Value::Str("0xdead".to_string())
        );
    }

    #[test]
    fn test_numeric_seventeen_bytes() {
        let mut data = vec![b'x'; 20];
        data[16] = b'!';
        match decode_value(&data, JetType::Numeric, 20, JetVersion::V4) {
            Value::Str(s) => assert_eq!(s.len(), 17),
            other => panic!("expected Str, got {:?}", other),
        }
    }

    #[test]
    fn test_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Int(7),
            Value::Str("a".to_string()),
            Value::Bool(true),
        ])
        .unwrap();
        assert_eq!(json, r#"[null,7,"a",true]"#);
    }
}
