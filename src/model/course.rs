//! Course (master) record

use bytes::{Buf, BufMut, BytesMut};

use crate::error::Result;
use crate::storage::codec::{get_flag, get_text, put_flag, put_text, Record};

use super::link::{get_link, put_link, Link, LINK_SIZE};
use super::projection::Project;

/// Width of the title field
pub const TITLE_LEN: usize = 50;
/// Width of the category field
pub const CATEGORY_LEN: usize = 15;
/// Width of the instructor field
pub const INSTRUCTOR_LEN: usize = 30;

/// A course
///
/// ## Layout (108 bytes)
/// ```text
/// ┌────────┬────────────┬───────────────┬─────────────────┬──────────────────┬──────────────┐
/// │ ID (4) │ Title (50) │ Category (15) │ Instructor (30) │ FirstCert (i64)  │ Presence (1) │
/// └────────┴────────────┴───────────────┴─────────────────┴──────────────────┴──────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub instructor: String,
    /// Head of this course's certificate chain
    pub first_certificate: Link,
    pub presence: bool,
}

impl Course {
    /// A live course with no certificates
    pub fn new(
        id: u32,
        title: impl Into<String>,
        category: impl Into<String>,
        instructor: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            category: category.into(),
            instructor: instructor.into(),
            first_certificate: Link::Nil,
            presence: true,
        }
    }
}

impl Record for Course {
    const SIZE: usize = 4 + TITLE_LEN + CATEGORY_LEN + INSTRUCTOR_LEN + LINK_SIZE + 1;
    const KIND: &'static str = "course";

    fn id(&self) -> u32 {
        self.id
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.id);
        put_text(buf, &self.title, TITLE_LEN);
        put_text(buf, &self.category, CATEGORY_LEN);
        put_text(buf, &self.instructor, INSTRUCTOR_LEN);
        put_link(buf, self.first_certificate);
        put_flag(buf, self.presence);
    }

    fn decode(buf: &mut &[u8]) -> Result<Self> {
        let id = buf.get_u32();
        let title = get_text(buf, TITLE_LEN);
        let category = get_text(buf, CATEGORY_LEN);
        let instructor = get_text(buf, INSTRUCTOR_LEN);
        let first_certificate = get_link(buf)?;
        let presence = get_flag(buf)?;
        Ok(Self {
            id,
            title,
            category,
            instructor,
            first_certificate,
            presence,
        })
    }
}

impl Project for Course {
    const FIELDS: &'static [&'static str] = &[
        "ID",
        "TITLE",
        "CATEGORY",
        "INSTRUCTOR",
        "FS_ADDRESS",
        "PRESENCE",
    ];
    const DEFAULT_FIELDS: &'static [&'static str] = &["ID", "TITLE", "CATEGORY", "INSTRUCTOR"];

    fn value(&self, field: &str) -> Option<String> {
        let value = match field {
            "ID" => self.id.to_string(),
            "TITLE" => self.title.clone(),
            "CATEGORY" => self.category.clone(),
            "INSTRUCTOR" => self.instructor.clone(),
            "FS_ADDRESS" => self.first_certificate.to_string(),
            "PRESENCE" => self.presence.to_string(),
            _ => return None,
        };
        Some(value)
    }
}
