//! Link pointers
//!
//! On disk a link is an `i64` offset with `-1` meaning "no link". In memory
//! it is a [`Link`], so a missing link can never be mistaken for an offset.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, TandemError};

/// Encoded size of a link field
pub const LINK_SIZE: usize = 8;

/// On-disk value of [`Link::Nil`]
pub const NO_LINK: i64 = -1;

/// Offset of another record in the certificate file, or nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Link {
    #[default]
    Nil,
    At(u32),
}

impl Link {
    /// Decode an on-disk link value
    pub fn from_raw(raw: i64) -> Result<Self> {
        if raw == NO_LINK {
            return Ok(Link::Nil);
        }
        u32::try_from(raw)
            .map(Link::At)
            .map_err(|_| TandemError::Malformed(format!("invalid link value {}", raw)))
    }

    /// On-disk value of this link
    pub fn to_raw(self) -> i64 {
        match self {
            Link::Nil => NO_LINK,
            Link::At(offset) => offset as i64,
        }
    }

    pub fn offset(self) -> Option<u32> {
        match self {
            Link::Nil => None,
            Link::At(offset) => Some(offset),
        }
    }

    pub fn is_nil(self) -> bool {
        self == Link::Nil
    }
}

impl From<u32> for Link {
    fn from(offset: u32) -> Self {
        Link::At(offset)
    }
}

impl From<Option<u32>> for Link {
    fn from(offset: Option<u32>) -> Self {
        offset.map_or(Link::Nil, Link::At)
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_raw())
    }
}

pub(crate) fn put_link(buf: &mut BytesMut, link: Link) {
    buf.put_i64(link.to_raw());
}

pub(crate) fn get_link(buf: &mut &[u8]) -> Result<Link> {
    Link::from_raw(buf.get_i64())
}
