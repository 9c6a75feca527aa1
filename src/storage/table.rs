//! Table
//!
//! One data file plus its index and free list. All record placement goes
//! through here: slot allocation, in-place writes, relocation and truncation.

use std::fs::{File, OpenOptions};
use std::io::SeekFrom;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::{Result, TandemError};

use super::codec::{read_record, write_record, Record};
use super::index::IndexTable;
use super::iterator::RecordIterator;
use super::junk::FreeList;

/// File extension of the data file
pub const DATA_EXT: &str = "fl";
/// File extension of the index file
pub const INDEX_EXT: &str = "ind";
/// File extension of the free-list file
pub const JUNK_EXT: &str = "jk";

/// A table of fixed-size `R` records
///
/// ## Invariants
/// - Every index entry points at a slot inside the data file
/// - No offset is both indexed and on the free list
pub struct Table<R: Record> {
    /// Data file handle (read + write)
    data: File,
    data_path: PathBuf,
    index_path: PathBuf,
    /// `None` for tables that never leave holes
    junk_path: Option<PathBuf>,
    index: IndexTable,
    junk: FreeList,
    _record: PhantomData<R>,
}

impl<R: Record> Table<R> {
    /// Open or create `<base>.fl`, `<base>.ind` and, with `with_junk`,
    /// `<base>.jk`
    pub fn open(base: &Path, with_junk: bool) -> Result<Self> {
        let data_path = file_path(base, DATA_EXT);
        let index_path = file_path(base, INDEX_EXT);
        let junk_path = with_junk.then(|| file_path(base, JUNK_EXT));

        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&data_path)?;

        let data_len = data.metadata()?.len();
        if data_len % R::SIZE as u64 != 0 {
            return Err(TandemError::Malformed(format!(
                "{} is {} bytes, not a multiple of the {}-byte {} record",
                data_path.display(),
                data_len,
                R::SIZE,
                R::KIND
            )));
        }

        let index = IndexTable::load(&index_path, R::KIND)?;
        let junk = match &junk_path {
            Some(path) => FreeList::load(path)?,
            None => FreeList::new(),
        };

        tracing::info!(
            "opened {} table {}: {} records, {} free slots, {} bytes",
            R::KIND,
            data_path.display(),
            index.len(),
            junk.len(),
            data_len
        );

        Ok(Self {
            data,
            data_path,
            index_path,
            junk_path,
            index,
            junk,
            _record: PhantomData,
        })
    }

    // =========================================================================
    // Record Access
    // =========================================================================

    /// Read the record stored at `offset`
    pub fn read_at(&mut self, offset: u32) -> Result<R> {
        match read_record(&mut self.data, SeekFrom::Start(offset as u64)) {
            Err(TandemError::Eof) => Err(TandemError::DanglingOffset {
                table: R::KIND,
                offset,
            }),
            other => other,
        }
    }

    /// Overwrite the slot at `offset`
    pub fn write_at(&mut self, offset: u32, record: &R) -> Result<()> {
        write_record(&mut self.data, record, SeekFrom::Start(offset as u64))
    }

    /// Look up a record by ID, returning its offset too
    pub fn get(&mut self, id: u32) -> Result<(u32, R)> {
        let offset = self.address_of(id)?;
        let record = self.read_at(offset)?;
        Ok((offset, record))
    }

    /// Offset of a live ID
    pub fn address_of(&self, id: u32) -> Result<u32> {
        self.index
            .address_of(id)
            .ok_or(TandemError::NotFound { table: R::KIND, id })
    }

    /// Fail with `DuplicateId` if the ID is already live
    pub fn ensure_absent(&self, id: u32) -> Result<()> {
        if self.index.exists(id) {
            return Err(TandemError::DuplicateId { table: R::KIND, id });
        }
        Ok(())
    }

    /// Choose the slot for a new record: the oldest free slot, else the end
    /// of the file
    pub fn allocate_slot(&mut self) -> Result<u32> {
        if let Some(slot) = self.junk.pop_preferred() {
            tracing::debug!("{}: reusing free slot {}", R::KIND, slot);
            return Ok(slot);
        }
        let end = self.file_len()?;
        let slot = u32::try_from(end).map_err(|_| {
            TandemError::Malformed(format!(
                "{} grew past the 32-bit address space",
                self.data_path.display()
            ))
        })?;
        tracing::debug!("{}: appending at {}", R::KIND, slot);
        Ok(slot)
    }

    /// Write a new record into `slot` and index it
    pub fn place(&mut self, slot: u32, record: &R) -> Result<()> {
        self.write_at(slot, record)?;
        self.index.add(record.id(), slot)
    }

    /// Insert a record that has no links to maintain
    pub fn insert(&mut self, record: &R) -> Result<u32> {
        self.ensure_absent(record.id())?;
        let slot = self.allocate_slot()?;
        self.place(slot, record)?;
        Ok(slot)
    }

    /// Copy the record at `from` into `to`, returning it
    pub fn relocate(&mut self, from: u32, to: u32) -> Result<R> {
        let record = self.read_at(from)?;
        self.write_at(to, &record)?;
        tracing::debug!("{} {}: moved {} -> {}", R::KIND, record.id(), from, to);
        Ok(record)
    }

    /// Lazy scan of every slot from offset 0 until end of file
    pub fn scan(&mut self) -> Result<RecordIterator<'_, R>> {
        RecordIterator::new(&mut self.data)
    }

    // =========================================================================
    // File Size
    // =========================================================================

    /// Current data file length in bytes
    pub fn file_len(&self) -> Result<u64> {
        Ok(self.data.metadata()?.len())
    }

    /// Number of record slots in the data file, live or not
    pub fn slot_count(&self) -> Result<u64> {
        Ok(self.file_len()? / R::SIZE as u64)
    }

    /// Cut the data file to `len` bytes
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.data.set_len(len)?;
        Ok(())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Persist the index and free list (truncate-then-write) and sync data
    pub fn flush(&self) -> Result<()> {
        self.data.sync_data()?;
        self.index.flush(&self.index_path)?;
        if let Some(path) = &self.junk_path {
            self.junk.flush(path)?;
        }
        tracing::debug!(
            "flushed {} table: {} index entries, {} free slots",
            R::KIND,
            self.index.len(),
            self.junk.len()
        );
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Fixed record size of this table
    pub fn record_size(&self) -> usize {
        R::SIZE
    }

    pub fn index(&self) -> &IndexTable {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut IndexTable {
        &mut self.index
    }

    pub fn junk(&self) -> &FreeList {
        &self.junk
    }

    pub fn junk_mut(&mut self) -> &mut FreeList {
        &mut self.junk
    }

    /// Whether this table persists a free list
    pub fn has_junk_file(&self) -> bool {
        self.junk_path.is_some()
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn junk_path(&self) -> Option<&Path> {
        self.junk_path.as_deref()
    }
}

/// `<base>.<ext>`, keeping any dots already in the base name
fn file_path(base: &Path, ext: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
