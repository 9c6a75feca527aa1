//! Shell commands
//!
//! Grammar of one REPL line, parsed with clap.

use std::str::FromStr;

use clap::{Parser, Subcommand};

use crate::error::{Result, TandemError};

use super::split::split_line;

/// Record selector: one ID or every record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    Id(u32),
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Target::All);
        }
        s.parse()
            .map(Target::Id)
            .map_err(|_| format!("expected a record ID or 'all', got '{}'", s))
    }
}

#[derive(Parser, Debug)]
#[command(name = "tandem", no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert a course
    #[command(name = "insert-m")]
    InsertM {
        id: u32,
        title: String,
        category: String,
        instructor: String,
    },

    /// Insert a certificate for a course
    #[command(name = "insert-s")]
    InsertS {
        id: u32,
        course_id: u32,
        issued_to: String,
    },

    /// Show a course (or all) with optional field names
    #[command(name = "get-m")]
    GetM { target: Target, fields: Vec<String> },

    /// Show a certificate (or all, optionally of one course) with optional
    /// field names
    #[command(name = "get-s")]
    GetS { target: Target, fields: Vec<String> },

    /// Update course fields; the keep token leaves a field unchanged
    #[command(name = "update-m")]
    UpdateM {
        id: u32,
        title: String,
        category: Option<String>,
        instructor: Option<String>,
    },

    /// Update a certificate holder; the keep token leaves it unchanged
    #[command(name = "update-s")]
    UpdateS { id: u32, issued_to: String },

    /// Delete a course and its certificates
    #[command(name = "del-m")]
    DelM { id: u32 },

    /// Delete a certificate
    #[command(name = "del-s")]
    DelS { id: u32 },

    /// Count courses
    #[command(name = "calc-m")]
    CalcM,

    /// Count certificates, overall or of one course
    #[command(name = "calc-s")]
    CalcS { course_id: Option<u32> },

    /// Dump every course slot
    #[command(name = "ut-m")]
    UtM,

    /// Dump every certificate slot
    #[command(name = "ut-s")]
    UtS,

    /// Compact the certificate file now
    Compact,

    /// Check all storage invariants
    Verify,

    /// Flush and leave the shell
    #[command(alias = "quit")]
    Exit,
}

impl Command {
    /// Parse one input line; `Ok(None)` for a blank line
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let words = split_line(line)?;
        if words.is_empty() {
            return Ok(None);
        }
        Line::try_parse_from(words)
            .map(|line| Some(line.command))
            .map_err(|e| TandemError::Command(e.to_string().trim_end().to_string()))
    }
}
