//! Certificate file compaction
//!
//! Moves the last live certificates into free slots nearer the front of the
//! file, then cuts off the tail.
//!
//! ## Algorithm
//! 1. Free slots ascending, live records descending by address
//! 2. Pair them up while the live record sits after the free slot; records
//!    only ever move toward the front
//! 3. For each pair: copy the bytes, update the index, repoint the chain
//!    neighbours (and the course head, when the node is a head)
//! 4. Truncate to `live_count * record_size` and empty the free list
//!
//! Each move leaves the chains consistent on its own. A failure part-way
//! stops compaction with earlier moves applied and the free list untouched.

use crate::chain;
use crate::error::{Result, TandemError};
use crate::model::{Certificate, Course, Link};
use crate::storage::{IndexEntry, Record, Table};

/// One relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    /// Logical ID of the moved record
    pub id: u32,
    /// Old (higher) offset
    pub from: u32,
    /// New (lower) offset, taken from the free list
    pub to: u32,
}

/// Outcome of one compaction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactionStats {
    /// Records relocated
    pub moved: usize,
    /// Free-list entries discarded
    pub reclaimed_slots: usize,
    /// Data file size before
    pub bytes_before: u64,
    /// Data file size after
    pub bytes_after: u64,
}

/// Decide which records move where
///
/// Pairs the i-th highest live address with the i-th lowest free slot for as
/// long as the live record lies after the slot.
pub fn plan(live: &[IndexEntry], free: &[u32]) -> Vec<Move> {
    let mut by_address = live.to_vec();
    by_address.sort_by(|a, b| b.address.cmp(&a.address));

    let mut slots = free.to_vec();
    slots.sort_unstable();

    by_address
        .iter()
        .zip(slots.iter())
        .take_while(|(entry, slot)| entry.address > **slot)
        .map(|(entry, &slot)| Move {
            id: entry.id,
            from: entry.address,
            to: slot,
        })
        .collect()
}

/// Compact the certificate table, fixing course heads in `courses`
pub fn compact(
    certificates: &mut Table<Certificate>,
    courses: &mut Table<Course>,
) -> Result<CompactionStats> {
    let bytes_before = certificates.file_len()?;
    let moves = plan(certificates.index().entries(), &certificates.junk().sorted());

    for m in &moves {
        apply_move(certificates, courses, m)?;
    }

    let live = certificates.index().len() as u64;
    let new_len = live * Certificate::SIZE as u64;
    if let Some(stray) = certificates
        .index()
        .entries()
        .iter()
        .find(|e| e.address as u64 >= new_len)
    {
        return Err(TandemError::Malformed(format!(
            "certificate {} still at {} after compaction; free list does not cover every hole",
            stray.id, stray.address
        )));
    }

    certificates.truncate(new_len)?;
    let reclaimed_slots = certificates.junk().len();
    certificates.junk_mut().clear();

    let stats = CompactionStats {
        moved: moves.len(),
        reclaimed_slots,
        bytes_before,
        bytes_after: new_len,
    };

    tracing::info!(
        "compacted certificates: moved {} records, reclaimed {} slots, {} -> {} bytes",
        stats.moved,
        stats.reclaimed_slots,
        stats.bytes_before,
        stats.bytes_after
    );

    Ok(stats)
}

fn apply_move(
    certificates: &mut Table<Certificate>,
    courses: &mut Table<Course>,
    m: &Move,
) -> Result<()> {
    let node = certificates.relocate(m.from, m.to)?;
    certificates.index_mut().update_address(m.id, m.to)?;

    let is_head = chain::relink_moved(certificates, &node, m.to)?;
    if is_head {
        let (course_at, mut course) = courses.get(node.course_id)?;
        course.first_certificate = Link::At(m.to);
        courses.write_at(course_at, &course)?;
    }

    Ok(())
}
