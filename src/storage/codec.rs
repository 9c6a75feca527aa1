//! Binary record codec
//!
//! Fixed-width encoding of records at explicit file offsets.
//!
//! - Integers are big-endian (`bytes::Buf` / `bytes::BufMut` defaults)
//! - Text is a fixed-length byte array, left-aligned, zero-padded, with no
//!   length prefix. Readers trim trailing zero bytes.
//! - Booleans are a single byte, `0` or `1`
//!
//! A record is read or written whole. A read that finds no bytes at all at
//! the requested offset is [`TandemError::Eof`]; a read that finds some but
//! fewer than `R::SIZE` bytes is [`TandemError::Malformed`].

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, TandemError};

/// A fixed-size record stored back-to-back in a data file
pub trait Record: Sized {
    /// Encoded size in bytes, identical for every record of the type
    const SIZE: usize;

    /// Table kind used in errors and logs
    const KIND: &'static str;

    /// Logical ID of the record
    fn id(&self) -> u32;

    /// Append exactly `SIZE` bytes to `buf`
    fn encode(&self, buf: &mut BytesMut);

    /// Decode from a buffer holding at least `SIZE` bytes
    fn decode(buf: &mut &[u8]) -> Result<Self>;
}

// =============================================================================
// Whole-record I/O
// =============================================================================

/// Seek to `pos` and read one record
pub fn read_record<R, F>(file: &mut F, pos: SeekFrom) -> Result<R>
where
    R: Record,
    F: Read + Seek,
{
    let at = file.seek(pos)?;
    let mut raw = vec![0u8; R::SIZE];
    let filled = read_full(file, &mut raw)?;

    if filled == 0 {
        return Err(TandemError::Eof);
    }
    if filled < R::SIZE {
        return Err(TandemError::Malformed(format!(
            "short {} record at offset {}: expected {} bytes, got {}",
            R::KIND,
            at,
            R::SIZE,
            filled
        )));
    }

    let mut slice = raw.as_slice();
    R::decode(&mut slice)
}

/// Seek to `pos` and write one record
pub fn write_record<R, F>(file: &mut F, record: &R, pos: SeekFrom) -> Result<()>
where
    R: Record,
    F: Write + Seek,
{
    file.seek(pos)?;

    let mut buf = BytesMut::with_capacity(R::SIZE);
    record.encode(&mut buf);
    if buf.len() != R::SIZE {
        return Err(TandemError::Malformed(format!(
            "{} record encoded to {} bytes, expected {}",
            R::KIND,
            buf.len(),
            R::SIZE
        )));
    }

    file.write_all(&buf)?;
    Ok(())
}

/// Read until `buf` is full or the reader is exhausted; returns bytes read
fn read_full<F: Read>(file: &mut F, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

// =============================================================================
// Field Helpers
// =============================================================================

/// Longest prefix of `text` that fits in `width` bytes without splitting a
/// UTF-8 character
pub fn fit_text(text: &str, width: usize) -> &str {
    if text.len() <= width {
        return text;
    }
    let mut end = width;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Write `text` as a zero-padded field of `width` bytes
pub fn put_text(buf: &mut BytesMut, text: &str, width: usize) {
    let fitted = fit_text(text, width);
    if fitted.len() < text.len() {
        tracing::warn!(
            "text truncated to {} bytes: {:?} -> {:?}",
            width,
            text,
            fitted
        );
    }
    buf.put_slice(fitted.as_bytes());
    buf.put_bytes(0, width - fitted.len());
}

/// Read a zero-padded field of `width` bytes, trimming the padding
pub fn get_text(buf: &mut &[u8], width: usize) -> String {
    let field = &buf[..width];
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let text = String::from_utf8_lossy(&field[..end]).into_owned();
    buf.advance(width);
    text
}

/// Write a presence flag
pub fn put_flag(buf: &mut BytesMut, flag: bool) {
    buf.put_u8(flag as u8);
}

/// Read a presence flag, rejecting anything other than 0 or 1
pub fn get_flag(buf: &mut &[u8]) -> Result<bool> {
    match buf.get_u8() {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(TandemError::Malformed(format!(
            "invalid presence byte 0x{:02x}",
            other
        ))),
    }
}
