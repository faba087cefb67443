//! Jet page and file structure constants.
//!
//! Offsets and masks for the on-disk structures of Microsoft Jet / Access
//! database files (`.mdb`, `.accdb`), covering Jet 3 through the ACE 2010
//! dialect. All multi-byte fields are little-endian.

// ── Page sizes ──────────────────────────────────────────────────────

/// Page size for Jet 3 files (2 KiB).
pub const SIZE_PAGE_JET3: usize = 0x0800;
/// Page size for Jet 4 and later files (4 KiB).
pub const SIZE_PAGE_JET4: usize = 0x1000;

// ── File header (page 0) ────────────────────────────────────────────

/// First four bytes of every Jet database file.
pub const FILE_MAGIC: [u8; 4] = [0x00, 0x01, 0x00, 0x00];
/// Offset of the format version code. 1 byte.
pub const HDR_VERSION_CODE: usize = 0x14;
/// Minimum byte count needed to read the file header fields.
pub const HDR_MIN_LEN: usize = HDR_VERSION_CODE + 1;

// ── Page magics (first two bytes of each page) ──────────────────────

/// Data page magic.
pub const MAGIC_DATA: [u8; 2] = [0x01, 0x01];
/// Table-definition page magic.
pub const MAGIC_TDEF: [u8; 2] = [0x02, 0x01];

// ── Data page header ────────────────────────────────────────────────

/// Offset of the owning TDEF page number. 4 bytes.
pub const DATA_PAGE_OWNER: usize = 0x04;
/// Offset of the record count on Jet 3 data pages. 2 bytes.
pub const DATA_RECORD_COUNT_J3: usize = 0x08;
/// Offset of the record count on Jet 4+ data pages. 2 bytes.
pub const DATA_RECORD_COUNT_J4: usize = 0x0C;
// The record-offset slot table (2 bytes per slot) follows the count.

/// Slot flag: record deleted. The low bits still carry the boundary of the
/// previous live record.
pub const SLOT_FLAG_DELETED: u16 = 0x8000;
/// Slot flag: the slot holds a 4-byte record pointer, not an inline record.
pub const SLOT_FLAG_OVERFLOW: u16 = 0x4000;
/// Mask extracting the byte offset from a slot entry.
pub const SLOT_OFFSET_MASK: u16 = 0x0FFF;

// ── TDEF pages ──────────────────────────────────────────────────────

/// Offset of the next-TDEF-page pointer (0 terminates the chain). 4 bytes.
pub const TDEF_NEXT_PAGE: usize = 0x04;
/// Offset of the total definition length. 4 bytes.
pub const TDEF_LEN: usize = 0x08;
/// Bytes of page header skipped on TDEF continuation pages.
pub const TDEF_CONTINUATION_HDR: usize = 0x08;

/// Jet 3 TDEF header: row count. 4 bytes.
pub const TDEF_J3_ROW_COUNT: usize = 0x0C;
/// Jet 3 TDEF header: variable-column count. 2 bytes.
pub const TDEF_J3_VAR_COLS: usize = 0x17;
/// Jet 3 TDEF header: column count. 2 bytes.
pub const TDEF_J3_COLS: usize = 0x19;
/// Jet 3 TDEF header: total index count. 4 bytes.
pub const TDEF_J3_NUM_IDX: usize = 0x1B;
/// Jet 3 TDEF header: real (physical) index count. 4 bytes.
pub const TDEF_J3_NUM_REAL_IDX: usize = 0x1F;
/// Jet 3: start of the per-real-index metadata block.
pub const TDEF_J3_IDX_BASE: usize = 0x2B;
/// Jet 3: size of one real-index metadata entry.
pub const TDEF_J3_IDX_ENTRY: usize = 8;
/// Jet 3: size of one column descriptor.
pub const TDEF_J3_COL_ENTRY: usize = 18;

/// Jet 4+ TDEF header: row count. 4 bytes.
pub const TDEF_J4_ROW_COUNT: usize = 0x10;
/// Jet 4+ TDEF header: variable-column count. 2 bytes.
pub const TDEF_J4_VAR_COLS: usize = 0x1F;
/// Jet 4+ TDEF header: column count. 2 bytes.
pub const TDEF_J4_COLS: usize = 0x21;
/// Jet 4+ TDEF header: total index count. 4 bytes.
pub const TDEF_J4_NUM_IDX: usize = 0x23;
/// Jet 4+ TDEF header: real (physical) index count. 4 bytes.
pub const TDEF_J4_NUM_REAL_IDX: usize = 0x27;
/// Jet 4+: start of the per-real-index metadata block.
pub const TDEF_J4_IDX_BASE: usize = 0x3F;
/// Jet 4+: size of one real-index metadata entry.
pub const TDEF_J4_IDX_ENTRY: usize = 12;
/// Jet 4+: size of one column descriptor.
pub const TDEF_J4_COL_ENTRY: usize = 25;

// ── Column descriptors ──────────────────────────────────────────────
//
// Jet 3 (18 bytes): type u8 @0, column id u16 @1, variable index u16 @3,
// column index u16 @5, fixed offset u16 @7, length u16 @9, flags u8 @13.
// Jet 4+ (25 bytes): type u8 @0, misc u32 @1, column id u16 @5, variable
// index u16 @7, column index u16 @9, flags u8 @15, fixed offset u16 @21,
// length u16 @23.

pub const COL_J3_ID: usize = 1;
pub const COL_J3_VAR_INDEX: usize = 3;
pub const COL_J3_INDEX: usize = 5;
pub const COL_J3_FIXED_OFFSET: usize = 7;
pub const COL_J3_LENGTH: usize = 9;
pub const COL_J3_FLAGS: usize = 13;

pub const COL_J4_ID: usize = 5;
pub const COL_J4_VAR_INDEX: usize = 7;
pub const COL_J4_INDEX: usize = 9;
pub const COL_J4_FLAGS: usize = 15;
pub const COL_J4_FIXED_OFFSET: usize = 21;
pub const COL_J4_LENGTH: usize = 23;

/// Column flag: the value lives in the fixed-length region.
pub const COL_FLAG_FIXED: u8 = 0x01;

// ── Records ─────────────────────────────────────────────────────────

/// Bytes per slot offset in the Jet 3 variable-length table.
pub const VAR_ENTRY_J3: usize = 1;
/// Bytes per slot offset in the Jet 4+ variable-length table.
pub const VAR_ENTRY_J4: usize = 2;
/// How far into the record tail the variable-count recovery scan looks.
pub const VAR_META_SCAN_WINDOW: usize = 10;

// ── Memo (LVAL) fields ──────────────────────────────────────────────

/// Size of the memo header preceding inline payload or a record pointer.
pub const MEMO_HDR_SIZE: usize = 12;
/// Memo length flag: payload is inline, after the header.
pub const MEMO_FLAG_INLINE: u32 = 0x8000_0000;
/// Memo length flag: payload is one overflow record (LVAL type 1).
pub const MEMO_FLAG_LVAL1: u32 = 0x4000_0000;
/// Mask extracting the payload byte length.
pub const MEMO_LEN_MASK: u32 = 0x3FFF_FFFF;

// ── Catalog (MSysObjects) ───────────────────────────────────────────

/// Page index of the catalog table definition.
pub const CATALOG_PAGE: u32 = 2;
/// MSysObjects Type value identifying a user table.
pub const CATALOG_USER_TABLE_TYPE: i64 = 1;
/// MSysObjects Flags values marking system objects, in both the unsigned
/// and sign-extended forms Jet writes.
pub const CATALOG_SYSTEM_FLAGS: [i64; 4] = [0x8000_0000, -0x8000_0000, 0x0000_0002, -0x0000_0002];
/// Mask extracting the root data page number from an MSysObjects Id.
pub const CATALOG_ID_PAGE_MASK: i64 = 0x00FF_FFFF;
