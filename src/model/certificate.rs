//! Certificate (slave) record

use bytes::{Buf, BufMut, BytesMut};

use crate::error::Result;
use crate::storage::codec::{get_flag, get_text, put_flag, put_text, Record};

use super::link::{get_link, put_link, Link, LINK_SIZE};
use super::projection::Project;

/// Width of the issued-to field
pub const ISSUED_TO_LEN: usize = 30;

/// A certificate, one node of its course's doubly-linked chain
///
/// ## Layout (55 bytes)
/// ```text
/// ┌────────┬──────────────┬───────────────┬──────────────┬────────────────┬────────────┐
/// │ ID (4) │ CourseID (4) │ IssuedTo (30) │ Presence (1) │ Previous (i64) │ Next (i64) │
/// └────────┴──────────────┴───────────────┴──────────────┴────────────────┴────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub id: u32,
    /// Logical ID (not offset) of the owning course
    pub course_id: u32,
    pub issued_to: String,
    pub presence: bool,
    pub previous: Link,
    pub next: Link,
}

impl Certificate {
    /// A live, unlinked certificate
    pub fn new(id: u32, course_id: u32, issued_to: impl Into<String>) -> Self {
        Self {
            id,
            course_id,
            issued_to: issued_to.into(),
            presence: true,
            previous: Link::Nil,
            next: Link::Nil,
        }
    }

    /// Wipe the payload and links and mark the slot free
    pub fn clear(&mut self) {
        self.issued_to.clear();
        self.presence = false;
        self.previous = Link::Nil;
        self.next = Link::Nil;
    }
}

impl Record for Certificate {
    const SIZE: usize = 4 + 4 + ISSUED_TO_LEN + 1 + LINK_SIZE + LINK_SIZE;
    const KIND: &'static str = "certificate";

    fn id(&self) -> u32 {
        self.id
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.id);
        buf.put_u32(self.course_id);
        put_text(buf, &self.issued_to, ISSUED_TO_LEN);
        put_flag(buf, self.presence);
        put_link(buf, self.previous);
        put_link(buf, self.next);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        let id = buf.get_u32();
        let course_id = buf.get_u32();
        let issued_to = get_text(buf, ISSUED_TO_LEN);
        let presence = get_flag(buf)?;
        let previous = get_link(buf)?;
        let next = get_link(buf)?;
        Ok(Self {
            id,
            course_id,
            issued_to,
            presence,
            previous,
            next,
        })
    }
}

impl Project for Certificate {
    const FIELDS: &'static [&'static str] =
        &["ID", "COURSE_ID", "ISSUED_TO", "PRESENCE", "PREVIOUS", "NEXT"];
    const DEFAULT_FIELDS: &'static [&'static str] = &["ID", "COURSE_ID", "ISSUED_TO"];

    fn value(&self, field: &str) -> Option<String> {
        let value = match field {
            "ID" => self.id.to_string(),
            "COURSE_ID" => self.course_id.to_string(),
            "ISSUED_TO" => self.issued_to.clone(),
            "PRESENCE" => self.presence.to_string(),
            "PREVIOUS" => self.previous.to_string(),
            "NEXT" => self.next.to_string(),
            _ => return None,
        };
        Some(value)
    }
}
