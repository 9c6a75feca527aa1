//! Record iterator
//!
//! Sequential iteration over every slot of a data file.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::marker::PhantomData;

use crate::error::{Result, TandemError};

use super::codec::{read_record, Record};

/// Iterator over `(offset, record)` pairs in file order
///
/// Yields cleared slots too; callers filter on presence. Stops at the first
/// end-of-file on a record boundary, or after the first error.
pub struct RecordIterator<'a, R: Record> {
    file: &'a mut File,
    /// Offset of the next slot
    offset: u64,
    done: bool,
    _record: PhantomData<R>,
}

impl<'a, R: Record> RecordIterator<'a, R> {
    /// Start a scan at offset 0
    pub(super) fn new(file: &'a mut File) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        Ok(Self {
            file,
            offset: 0,
            done: false,
            _record: PhantomData,
        })
    }
}

impl<'a, R: Record> Iterator for RecordIterator<'a, R> {
    type Item = Result<(u32, R)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match read_record::<R, File>(&mut *self.file, SeekFrom::Current(0)) {
            Ok(record) => {
                let at = self.offset as u32;
                self.offset += R::SIZE as u64;
                Some(Ok((at, record)))
            }
            Err(TandemError::Eof) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
