//! Index table
//!
//! Ordered mapping from logical record ID to byte offset in the data file.
//!
//! Entries are kept sorted ascending by ID at all times, so lookups are a
//! binary search and the persisted file is always in ID order.
//!
//! ## File Format
//! ```text
//! ┌──────────┬──────────────┬──────────┬──────────────┬─────
//! │ ID (4)   │ Address (4)  │ ID (4)   │ Address (4)  │ ...
//! └──────────┴──────────────┴──────────┴──────────────┴─────
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, TandemError};

/// Size of one persisted entry: ID (4) + Address (4)
pub const ENTRY_SIZE: usize = 8;

/// One (ID, offset) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Logical record ID
    pub id: u32,
    /// Byte offset of the record in the data file
    pub address: u32,
}

/// In-memory index for one table
#[derive(Debug, Clone)]
pub struct IndexTable {
    /// Table kind, for error messages
    kind: &'static str,
    /// Entries sorted ascending by `id`
    entries: Vec<IndexEntry>,
}

impl IndexTable {
    /// Create an empty index
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Load an index from its file; a missing file is an empty index
    pub fn load(path: &Path, kind: &'static str) -> Result<Self> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if raw.len() % ENTRY_SIZE != 0 {
            return Err(TandemError::Malformed(format!(
                "{} index is {} bytes, not a multiple of {}",
                kind,
                raw.len(),
                ENTRY_SIZE
            )));
        }

        let mut buf = raw.as_slice();
        let mut entries = Vec::with_capacity(raw.len() / ENTRY_SIZE);
        while buf.has_remaining() {
            let id = buf.get_u32();
            let address = buf.get_u32();
            entries.push(IndexEntry { id, address });
        }

        entries.sort_by_key(|e| e.id);
        if let Some(pair) = entries.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(TandemError::Malformed(format!(
                "{} index lists ID {} twice",
                kind, pair[0].id
            )));
        }

        Ok(Self { kind, entries })
    }

    /// Register a new ID at `address`
    pub fn add(&mut self, id: u32, address: u32) -> Result<()> {
        match self.position(id) {
            Ok(_) => Err(TandemError::DuplicateId {
                table: self.kind,
                id,
            }),
            Err(pos) => {
                self.entries.insert(pos, IndexEntry { id, address });
                Ok(())
            }
        }
    }

    /// Remove an ID, returning the address it pointed at
    pub fn remove(&mut self, id: u32) -> Option<u32> {
        let pos = self.position(id).ok()?;
        Some(self.entries.remove(pos).address)
    }

    /// Point an existing ID at a new address
    pub fn update_address(&mut self, id: u32, address: u32) -> Result<()> {
        match self.position(id) {
            Ok(pos) => {
                self.entries[pos].address = address;
                Ok(())
            }
            Err(_) => Err(TandemError::NotFound {
                table: self.kind,
                id,
            }),
        }
    }

    /// Whether the ID is registered
    pub fn exists(&self, id: u32) -> bool {
        self.position(id).is_ok()
    }

    /// Address of an ID, O(log n)
    pub fn address_of(&self, id: u32) -> Option<u32> {
        self.position(id).ok().map(|pos| self.entries[pos].address)
    }

    /// Number of live IDs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending ID order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Entry with the highest address (the last record in the file)
    pub fn last_by_address(&self) -> Option<IndexEntry> {
        self.entries.iter().copied().max_by_key(|e| e.address)
    }

    /// Whether any entry points at `address`
    pub fn holds_address(&self, address: u32) -> bool {
        self.entries.iter().any(|e| e.address == address)
    }

    /// Serialized form, in ID order
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.entries.len() * ENTRY_SIZE);
        for entry in &self.entries {
            buf.put_u32(entry.id);
            buf.put_u32(entry.address);
        }
        buf
    }

    /// Truncate the index file and rewrite it from offset 0
    pub fn flush(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(&self.encode())?;
        file.sync_data()?;
        Ok(())
    }

    fn position(&self, id: u32) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by_key(&id, |e| e.id)
    }
}
