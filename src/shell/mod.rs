//! Shell Module
//!
//! Interactive front end over a [`Database`]: one command per line, results
//! as text tables. Errors are printed and the loop carries on; only I/O
//! errors on the shell's own input/output end it.

mod command;
mod render;
mod split;

use std::io::{BufRead, Write};

use crate::database::{CertificateUpdate, CourseUpdate, Database};
use crate::error::{Result, TandemError};
use crate::model::{Certificate, Course, Project, Selection};

pub use command::{Command, Target};
pub use render::render_table;
pub use split::split_line;

/// What the loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// REPL bound to one open database
pub struct Shell<'a> {
    db: &'a Database,
    keep_token: String,
}

impl<'a> Shell<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            keep_token: db.config().keep_token.clone(),
        }
    }

    /// Read commands from `input` until `exit` or end of input
    pub fn run<R: BufRead, W: Write>(&self, input: R, out: &mut W) -> Result<()> {
        let mut lines = input.lines();
        loop {
            write!(out, "> ")?;
            out.flush()?;

            let Some(line) = lines.next() else {
                writeln!(out)?;
                break;
            };
            let line = line?;

            let command = match Command::parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    writeln!(out, "{}", e)?;
                    continue;
                }
            };

            match self.execute(command, out) {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(TandemError::Io(e)) if is_output_error(&e) => return Err(e.into()),
                Err(e) => writeln!(out, "error: {}", e)?,
            }
        }
        writeln!(out, "Exiting...")?;
        Ok(())
    }

    /// Run one command, writing its output to `out`
    pub fn execute<W: Write>(&self, command: Command, out: &mut W) -> Result<Flow> {
        match command {
            Command::InsertM {
                id,
                title,
                category,
                instructor,
            } => {
                let at = self.db.insert_course(id, &title, &category, &instructor)?;
                writeln!(out, "course {} inserted at offset {}", id, at)?;
            }
            Command::InsertS {
                id,
                course_id,
                issued_to,
            } => {
                let at = self.db.insert_certificate(id, course_id, &issued_to)?;
                writeln!(out, "certificate {} inserted at offset {}", id, at)?;
            }
            Command::GetM { target, fields } => self.get_courses(target, &fields, out)?,
            Command::GetS { target, fields } => self.get_certificates(target, fields, out)?,
            Command::UpdateM {
                id,
                title,
                category,
                instructor,
            } => {
                let update = CourseUpdate {
                    title: self.keep(Some(title)),
                    category: self.keep(category),
                    instructor: self.keep(instructor),
                };
                if update.is_empty() {
                    writeln!(out, "nothing to update")?;
                } else {
                    self.db.update_course(id, &update)?;
                    writeln!(out, "course {} updated", id)?;
                }
            }
            Command::UpdateS { id, issued_to } => {
                let update = CertificateUpdate {
                    issued_to: self.keep(Some(issued_to)),
                };
                if update.is_empty() {
                    writeln!(out, "nothing to update")?;
                } else {
                    self.db.update_certificate(id, &update)?;
                    writeln!(out, "certificate {} updated", id)?;
                }
            }
            Command::DelM { id } => {
                self.db.delete_course(id)?;
                writeln!(out, "course {} deleted", id)?;
            }
            Command::DelS { id } => {
                self.db.delete_certificate(id)?;
                writeln!(out, "certificate {} deleted", id)?;
            }
            Command::CalcM => writeln!(out, "{}", self.db.count_courses())?,
            Command::CalcS { course_id } => {
                writeln!(out, "{}", self.db.count_certificates(course_id)?)?
            }
            Command::UtM => {
                let mut courses = self.db.courses(true)?;
                courses.sort_by_key(|c| c.id);
                write_records(out, Course::FIELDS, &courses)?;
            }
            Command::UtS => {
                let mut certificates = self.db.certificates(true)?;
                certificates.sort_by_key(|c| c.id);
                write_records(out, Certificate::FIELDS, &certificates)?;
            }
            Command::Compact => {
                let stats = self.db.compact()?;
                writeln!(
                    out,
                    "moved {} records, reclaimed {} slots, {} -> {} bytes",
                    stats.moved, stats.reclaimed_slots, stats.bytes_before, stats.bytes_after
                )?;
            }
            Command::Verify => {
                let report = self.db.verify()?;
                if report.is_ok() {
                    writeln!(out, "ok")?;
                } else {
                    for problem in &report.problems {
                        writeln!(out, "{}", problem)?;
                    }
                }
            }
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn get_courses<W: Write>(&self, target: Target, fields: &[String], out: &mut W) -> Result<()> {
        let courses = match target {
            Target::Id(id) => vec![self.db.course(id)?],
            Target::All => self.db.courses(false)?,
        };
        write_selection(out, fields, &courses)
    }

    fn get_certificates<W: Write>(
        &self,
        target: Target,
        mut fields: Vec<String>,
        out: &mut W,
    ) -> Result<()> {
        let certificates = match target {
            Target::Id(id) => vec![self.db.certificate(id)?],
            Target::All => match fields.first().and_then(|f| f.parse::<u32>().ok()) {
                Some(course_id) => {
                    fields.remove(0);
                    self.db
                        .certificates_of(course_id)?
                        .into_iter()
                        .map(|(_, c)| c)
                        .collect()
                }
                None => self.db.certificates(false)?,
            },
        };
        write_selection(out, &fields, &certificates)
    }

    /// `None` for an absent argument or the keep token
    fn keep(&self, value: Option<String>) -> Option<String> {
        value.filter(|v| *v != self.keep_token)
    }
}

fn write_selection<W: Write, R: Project>(out: &mut W, fields: &[String], records: &[R]) -> Result<()> {
    let selection = Selection::resolve::<R>(fields);
    for name in &selection.unknown {
        writeln!(out, "field '{}' was not found", name.to_lowercase())?;
    }

    let asked_for_id = fields.iter().any(|f| f.eq_ignore_ascii_case("id"));
    if !fields.is_empty() && selection.fields.len() == 1 && !asked_for_id {
        writeln!(out, "nothing to show")?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = records.iter().map(|r| selection.row(r)).collect();
    write!(out, "{}", render_table(&selection.fields, &rows))?;
    Ok(())
}

fn write_records<W: Write, R: Project>(
    out: &mut W,
    fields: &[&str],
    records: &[R],
) -> Result<()> {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| fields.iter().map(|f| r.value(f).unwrap_or_default()).collect())
        .collect();
    write!(out, "{}", render_table(fields, &rows))?;
    Ok(())
}

/// Errors raised while writing shell output rather than by the database
fn is_output_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::WriteZero
    )
}
