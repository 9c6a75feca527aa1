//! Storage Module
//!
//! Fixed-size binary records addressed by byte offset.
//!
//! ## Responsibilities
//! - Encode/decode records at explicit offsets (big-endian, zero-padded text)
//! - Map logical IDs to offsets (index table)
//! - Track reclaimable slots (free list)
//! - Allocate, relocate and truncate slots in a data file
//!
//! ## Files per table `<name>`
//! ```text
//! ┌────────────────────────────────────────┐
//! │ <name>.fl  - data                      │
//! │ ┌──────────┬──────────┬──────────────┐ │
//! │ │ Record 0 │ Record 1 │ ...          │ │
//! │ └──────────┴──────────┴──────────────┘ │
//! ├────────────────────────────────────────┤
//! │ <name>.ind - index                     │
//! │ ┌────────┬──────────┬─────┐            │
//! │ │ ID (4) │ Addr (4) │ ... │            │
//! │ └────────┴──────────┴─────┘            │
//! ├────────────────────────────────────────┤
//! │ <name>.jk  - free list (optional)      │
//! │ ┌──────────┬─────┐                     │
//! │ │ Addr (4) │ ... │                     │
//! │ └──────────┴─────┘                     │
//! └────────────────────────────────────────┘
//! ```
//!
//! Record `i` is not necessarily at `i * size` once free slots are reused or
//! compaction has run.

pub mod codec;
mod index;
mod iterator;
mod junk;
mod table;

pub use codec::{read_record, write_record, Record};
pub use index::{IndexEntry, IndexTable};
pub use iterator::RecordIterator;
pub use junk::FreeList;
pub use table::{Table, DATA_EXT, INDEX_EXT, JUNK_EXT};
