//! Page classification and data-page record carving.
//!
//! A Jet file is a flat array of fixed-size pages. The first two bytes of a
//! page identify it: `01 01` marks a data page, `02 01` a table-definition
//! page. [`PageIndex`] classifies the whole buffer once; [`record_slots`]
//! turns a data page's record-offset table into inline byte ranges and
//! overflow pointers; [`resolve_record_pointer`] chases a packed
//! `(page, slot)` reference to the record bytes it designates.

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};
use log::warn;
use serde::Serialize;

use crate::jet::constants::*;
use crate::jet::version::JetVersion;
use crate::MdbError;

/// Classification of a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageKind {
    /// Record-bearing page (magic `01 01`).
    Data,
    /// Table-definition page (magic `02 01`).
    TableDef,
    /// Anything else, including the file header page.
    Other,
}

impl PageKind {
    fn of(page: &[u8]) -> Self {
        if page.len() < 2 {
            return PageKind::Other;
        }
        if page[..2] == MAGIC_DATA {
            PageKind::Data
        } else if page[..2] == MAGIC_TDEF {
            PageKind::TableDef
        } else {
            PageKind::Other
        }
    }
}

/// Page classification for a whole buffer, indexed by page number.
#[derive(Debug, Clone)]
pub struct PageIndex {
    page_size: usize,
    kinds: Vec<PageKind>,
}

impl PageIndex {
    /// Classify every page in the buffer.
    ///
    /// The buffer length must be a whole multiple of the page size.
    pub fn classify(buf: &[u8], version: JetVersion) -> Result<Self, MdbError> {
        let page_size = version.page_size();
        if buf.is_empty() || buf.len() % page_size != 0 {
            return Err(MdbError::MalformedBuffer(format!(
                "buffer length {} is not a multiple of the {} byte page size",
                buf.len(),
                page_size
            )));
        }
        let kinds = buf.chunks_exact(page_size).map(PageKind::of).collect();
        Ok(PageIndex { page_size, kinds })
    }

    /// Page size this index was built with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Total number of pages.
    pub fn page_count(&self) -> u32 {
        self.kinds.len() as u32
    }

    /// Classification of a page, if it exists.
    pub fn kind(&self, page_no: u32) -> Option<PageKind> {
        self.kinds.get(page_no as usize).copied()
    }

    /// Borrow the bytes of one page.
    pub fn page<'a>(&self, buf: &'a [u8], page_no: u32) -> Option<&'a [u8]> {
        let start = (page_no as usize).checked_mul(self.page_size)?;
        buf.get(start..start + self.page_size)
    }

    /// Page numbers of all data pages.
    pub fn data_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages_of_kind(PageKind::Data)
    }

    /// Page numbers of all table-definition pages.
    pub fn tdef_pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages_of_kind(PageKind::TableDef)
    }

    fn pages_of_kind(&self, kind: PageKind) -> impl Iterator<Item = u32> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .filter(move |(_, k)| **k == kind)
            .map(|(no, _)| no as u32)
    }
}

/// Parsed data-page header.
#[derive(Debug, Clone, Serialize)]
pub struct DataPageHeader {
    /// Page number of the table definition this page belongs to.
    pub owner: u32,
    /// Number of record-offset slots on the page.
    pub record_count: u16,
}

impl DataPageHeader {
    /// Parse a data-page header from a full page buffer.
    pub fn parse(page: &[u8], version: JetVersion) -> Option<Self> {
        if PageKind::of(page) != PageKind::Data {
            return None;
        }
        let count_at = slot_count_offset(version);
        if page.len() < count_at + 2 {
            return None;
        }
        Some(DataPageHeader {
            owner: LittleEndian::read_u32(&page[DATA_PAGE_OWNER..]),
            record_count: LittleEndian::read_u16(&page[count_at..]),
        })
    }
}

fn slot_count_offset(version: JetVersion) -> usize {
    match version {
        JetVersion::V3 => DATA_RECORD_COUNT_J3,
        _ => DATA_RECORD_COUNT_J4,
    }
}

/// One entry of a data page's record-offset table, resolved to its meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSlot {
    /// Live inline record; the range is page-relative.
    Inline(Range<usize>),
    /// Packed record pointer to a record stored on another page.
    Overflow(u32),
}

/// Carve the record-offset table of a data page into slots.
///
/// Offsets grow downward from the page end, so each live offset also bounds
/// the previous record. Deleted entries (`0x8000`) are skipped but still
/// advance that boundary; overflow entries (`0x4000`) yield the 4-byte
/// record pointer stored at the slot's offset.
pub fn record_slots(page: &[u8], version: JetVersion) -> Option<Vec<RecordSlot>> {
    let header = DataPageHeader::parse(page, version)?;
    let base = slot_count_offset(version) + 2;
    let count = header.record_count as usize;
    if page.len() < base + count * 2 {
        return None;
    }

    let mut slots = Vec::new();
    let mut last_offset: Option<usize> = None;
    for i in 0..count {
        let raw = LittleEndian::read_u16(&page[base + i * 2..]);
        let off = (raw & SLOT_OFFSET_MASK) as usize;

        if raw & SLOT_FLAG_DELETED != 0 {
            last_offset = Some(off);
            continue;
        }
        if raw & SLOT_FLAG_OVERFLOW != 0 {
            if off + 4 <= page.len() {
                slots.push(RecordSlot::Overflow(LittleEndian::read_u32(&page[off..])));
            } else {
                warn!("overflow slot {} points past the page end, skipped", i);
            }
            last_offset = Some(off);
            continue;
        }

        let end = last_offset.unwrap_or(page.len());
        if off <= end && end <= page.len() {
            slots.push(RecordSlot::Inline(off..end));
        } else {
            warn!("record slot {} has inverted bounds {}..{}, skipped", i, off, end);
        }
        last_offset = Some(off);
    }
    Some(slots)
}

/// Chase a packed record pointer to the bytes of the record it names.
///
/// The high 24 bits select the page, the low 8 bits the slot on that page.
/// Returns the absolute byte range within the buffer, or `None` when any
/// step of the lookup fails — callers substitute a fallback rather than
/// aborting the row.
pub fn resolve_record_pointer(
    buf: &[u8],
    index: &PageIndex,
    version: JetVersion,
    pointer: u32,
) -> Option<Range<usize>> {
    let page_no = pointer >> 8;
    let slot = (pointer & 0xFF) as usize;

    if index.kind(page_no)? != PageKind::Data {
        return None;
    }
    let page = index.page(buf, page_no)?;
    let header = DataPageHeader::parse(page, version)?;
    if slot >= header.record_count as usize {
        return None;
    }

    let base = slot_count_offset(version) + 2;
    let raw = LittleEndian::read_u16(&page[base + slot * 2..]);
    if raw & SLOT_FLAG_DELETED != 0 {
        return None;
    }
    let start = (raw & SLOT_OFFSET_MASK) as usize;
    let end = if slot == 0 {
        page.len()
    } else {
        let prev = LittleEndian::read_u16(&page[base + (slot - 1) * 2..]);
        (prev & SLOT_OFFSET_MASK) as usize
    };
    if start > end || end > page.len() {
        return None;
    }

    let page_start = page_no as usize * index.page_size();
    Some(page_start + start..page_start + end)
}
