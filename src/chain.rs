//! Certificate chains
//!
//! Maintenance of the doubly-linked list threaded through certificate
//! records. Each operation works on a [`NodeStore`] addressed by offset, so
//! the same code runs against the data file and against an in-memory map.
//!
//! ## Invariants
//! - If `A.next == At(b)` then the node at `b` has `previous == At(a)`, and
//!   symmetrically for `previous`
//! - The head has `previous == Nil`, the tail has `next == Nil`
//! - The chain is acyclic
//!
//! Callers own the course record: operations that move the head return the
//! new head instead of writing the course themselves.

use std::collections::{BTreeMap, HashSet};

use crate::error::{Result, TandemError};
use crate::model::{Certificate, Link};
use crate::storage::{Record, Table};

/// Offset-addressed storage of certificate nodes
pub trait NodeStore {
    fn load(&mut self, at: u32) -> Result<Certificate>;
    fn store(&mut self, at: u32, node: &Certificate) -> Result<()>;
}

impl NodeStore for Table<Certificate> {
    fn load(&mut self, at: u32) -> Result<Certificate> {
        self.read_at(at)
    }

    fn store(&mut self, at: u32, node: &Certificate) -> Result<()> {
        self.write_at(at, node)
    }
}

impl NodeStore for BTreeMap<u32, Certificate> {
    fn load(&mut self, at: u32) -> Result<Certificate> {
        self.get(&at).cloned().ok_or(TandemError::DanglingOffset {
            table: Certificate::KIND,
            offset: at,
        })
    }

    fn store(&mut self, at: u32, node: &Certificate) -> Result<()> {
        self.insert(at, node.clone());
        Ok(())
    }
}

// =============================================================================
// Traversal
// =============================================================================

/// Every node of the chain starting at `head`, head first
pub fn walk<S: NodeStore>(store: &mut S, head: Link) -> Result<Vec<(u32, Certificate)>> {
    let mut nodes = Vec::new();
    let mut seen = HashSet::new();
    let mut cursor = head;

    while let Link::At(at) = cursor {
        if !seen.insert(at) {
            return Err(TandemError::Malformed(format!(
                "certificate chain starting at {} loops back to {}",
                head, at
            )));
        }
        let node = store.load(at)?;
        cursor = node.next;
        nodes.push((at, node));
    }

    Ok(nodes)
}

/// Offset of the last node, or `None` for an empty chain
pub fn tail<S: NodeStore>(store: &mut S, head: Link) -> Result<Option<u32>> {
    Ok(walk(store, head)?.last().map(|(at, _)| *at))
}

// =============================================================================
// Mutation
// =============================================================================

/// Thread `node` (about to be written at `at`) onto the end of the chain
///
/// Sets `node.previous` / `node.next` and rewrites the current tail. Returns
/// the chain head afterwards, which differs from `head` only when the chain
/// was empty. The caller writes `node` itself.
pub fn append<S: NodeStore>(
    store: &mut S,
    head: Link,
    node: &mut Certificate,
    at: u32,
) -> Result<Link> {
    node.next = Link::Nil;

    let Some(last_at) = tail(store, head)? else {
        node.previous = Link::Nil;
        return Ok(Link::At(at));
    };

    let mut last = store.load(last_at)?;
    last.next = Link::At(at);
    store.store(last_at, &last)?;

    node.previous = Link::At(last_at);
    Ok(head)
}

/// Detach `node` from its neighbours
///
/// Returns `Some(new_head)` when `node` was the head, so the caller can
/// update the course. `node` itself is left untouched.
pub fn unlink<S: NodeStore>(store: &mut S, node: &Certificate) -> Result<Option<Link>> {
    match (node.previous, node.next) {
        // head
        (Link::Nil, next) => {
            if let Link::At(next_at) = next {
                let mut successor = store.load(next_at)?;
                successor.previous = Link::Nil;
                store.store(next_at, &successor)?;
            }
            tracing::debug!("certificate {}: unlinked head", node.id);
            Ok(Some(next))
        }
        // interior
        (Link::At(prev_at), Link::At(next_at)) => {
            let mut predecessor = store.load(prev_at)?;
            predecessor.next = node.next;
            store.store(prev_at, &predecessor)?;

            let mut successor = store.load(next_at)?;
            successor.previous = node.previous;
            store.store(next_at, &successor)?;

            tracing::debug!("certificate {}: unlinked interior node", node.id);
            Ok(None)
        }
        // tail
        (Link::At(prev_at), Link::Nil) => {
            let mut predecessor = store.load(prev_at)?;
            predecessor.next = Link::Nil;
            store.store(prev_at, &predecessor)?;

            tracing::debug!("certificate {}: unlinked tail", node.id);
            Ok(None)
        }
    }
}

/// Point the neighbours of `node` at its new offset `new_at`
///
/// Returns `true` when `node` is a chain head, in which case the owning
/// course's head pointer must also move to `new_at`.
pub fn relink_moved<S: NodeStore>(store: &mut S, node: &Certificate, new_at: u32) -> Result<bool> {
    if let Link::At(prev_at) = node.previous {
        let mut predecessor = store.load(prev_at)?;
        predecessor.next = Link::At(new_at);
        store.store(prev_at, &predecessor)?;
    }

    if let Link::At(next_at) = node.next {
        let mut successor = store.load(next_at)?;
        successor.previous = Link::At(new_at);
        store.store(next_at, &successor)?;
    }

    Ok(node.previous.is_nil())
}

// =============================================================================
// Verification
// =============================================================================

/// Describe every broken link in the chain of course `course_id`
///
/// An empty result means the chain is well formed.
pub fn check<S: NodeStore>(store: &mut S, head: Link, course_id: u32) -> Result<Vec<String>> {
    let nodes = match walk(store, head) {
        Ok(nodes) => nodes,
        Err(e @ (TandemError::Malformed(_) | TandemError::DanglingOffset { .. })) => {
            return Ok(vec![format!("course {}: {}", course_id, e)])
        }
        Err(e) => return Err(e),
    };

    let mut problems = Vec::new();
    let mut expected_previous = Link::Nil;

    for (at, node) in &nodes {
        if node.previous != expected_previous {
            problems.push(format!(
                "certificate {} at {}: previous is {}, expected {}",
                node.id, at, node.previous, expected_previous
            ));
        }
        if node.course_id != course_id {
            problems.push(format!(
                "certificate {} at {}: belongs to course {}, found in chain of course {}",
                node.id, at, node.course_id, course_id
            ));
        }
        if !node.presence {
            problems.push(format!(
                "certificate {} at {}: cleared record still linked",
                node.id, at
            ));
        }
        expected_previous = Link::At(*at);
    }

    Ok(problems)
}
