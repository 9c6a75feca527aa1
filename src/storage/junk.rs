//! Free list ("junk")
//!
//! Offsets of data-file slots whose records were deleted. New records take
//! the oldest entry first; the file only grows when the list is empty.
//!
//! ## File Format
//! ```text
//! ┌──────────────┬──────────────┬─────
//! │ Offset (4)   │ Offset (4)   │ ...
//! └──────────────┴──────────────┴─────
//! ```

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, TandemError};

/// Size of one persisted offset
pub const SLOT_SIZE: usize = 4;

/// Reclaimable slots of one data file, oldest first
#[derive(Debug, Clone, Default)]
pub struct FreeList {
    slots: VecDeque<u32>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a free list from its file; a missing file is an empty list
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if raw.len() % SLOT_SIZE != 0 {
            return Err(TandemError::Malformed(format!(
                "free list is {} bytes, not a multiple of {}",
                raw.len(),
                SLOT_SIZE
            )));
        }

        let mut buf = raw.as_slice();
        let mut slots = VecDeque::with_capacity(raw.len() / SLOT_SIZE);
        while buf.has_remaining() {
            slots.push_back(buf.get_u32());
        }
        Ok(Self { slots })
    }

    /// Record a freed slot
    pub fn push(&mut self, address: u32) {
        self.slots.push_back(address);
    }

    /// Take the slot to reuse for the next insert (FIFO)
    pub fn pop_preferred(&mut self) -> Option<u32> {
        self.slots.pop_front()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, address: u32) -> bool {
        self.slots.contains(&address)
    }

    /// Slots in insertion order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots.iter().copied()
    }

    /// Slots sorted ascending (compaction sweep order)
    pub fn sorted(&self) -> Vec<u32> {
        let mut slots: Vec<u32> = self.slots.iter().copied().collect();
        slots.sort_unstable();
        slots
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Serialized form, in insertion order
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.slots.len() * SLOT_SIZE);
        for &slot in &self.slots {
            buf.put_u32(slot);
        }
        buf
    }

    /// Truncate the free-list file and rewrite it from offset 0
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
}
