//! Model Module
//!
//! The two record types and the link type that ties them together.
//!
//! ```text
//!   Course ──first_certificate──▶ Cert A ◀──▶ Cert B ◀──▶ Cert C ──▶ Nil
//!                                  ▲ previous = Nil
//! ```
//!
//! A course holds only the offset of its first certificate. Certificates of
//! one course form a doubly-linked chain through `previous` / `next`, and
//! each refers back to its course by logical ID.

mod certificate;
mod course;
mod link;
mod projection;

pub use certificate::{Certificate, ISSUED_TO_LEN};
pub use course::{Course, CATEGORY_LEN, INSTRUCTOR_LEN, TITLE_LEN};
pub use link::{Link, LINK_SIZE, NO_LINK};
pub use projection::{Project, Projection, Selection};
