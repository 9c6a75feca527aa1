//! Database Module
//!
//! The course/certificate pair and every operation the shell calls.
//!
//! ## Responsibilities
//! - Open both tables and their index / free-list files
//! - Keep certificate chains and course head pointers consistent
//! - Keep the course file dense (swap-with-last delete)
//! - Trigger certificate compaction when the free list reaches the threshold
//! - Persist index and free lists after writes and on close

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::chain;
use crate::compaction::{self, CompactionStats};
use crate::config::Config;
use crate::error::{Result, TandemError};
use crate::model::{Certificate, Course, Link, Projection};
use crate::storage::{Record, Table};

/// Changes to a course; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub category: Option<String>,
    pub instructor: Option<String>,
}

impl CourseUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.category.is_none() && self.instructor.is_none()
    }
}

/// Changes to a certificate; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateUpdate {
    pub issued_to: Option<String>,
}

impl CertificateUpdate {
    pub fn is_empty(&self) -> bool {
        self.issued_to.is_none()
    }
}

/// Sizes of both tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub courses: usize,
    pub certificates: usize,
    pub free_slots: usize,
    pub course_bytes: u64,
    pub certificate_bytes: u64,
}

/// Result of [`Database::verify`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// One line per violated invariant
    pub problems: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

struct Tables {
    courses: Table<Course>,
    certificates: Table<Certificate>,
}

impl Tables {
    fn flush(&self) -> Result<()> {
        self.courses.flush()?;
        self.certificates.flush()
    }
}

/// Master/slave record store
///
/// ## Concurrency
/// Single writer. Both tables sit behind one lock, so every operation sees
/// the index, free list and data file of each table as one consistent unit.
/// There is no cross-process locking.
pub struct Database {
    config: Config,
    tables: Mutex<Tables>,
}

impl Database {
    /// Open or create the tables under `config.data_dir`
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let courses = Table::open(&config.master_base(), false)?;
        let certificates = Table::open(&config.slave_base(), true)?;
        let tables = Tables {
            courses,
            certificates,
        };

        // Materialize the index / free-list files on first open
        tables.flush()?;

        tracing::info!("database opened at {}", config.data_dir.display());

        Ok(Self {
            config,
            tables: Mutex::new(tables),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    // =========================================================================
    // Courses
    // =========================================================================

    /// Insert a course, returning its offset
    pub fn insert_course(
        &self,
        id: u32,
        title: &str,
        category: &str,
        instructor: &str,
    ) -> Result<u32> {
        let mut tables = self.tables.lock();
        let course = Course::new(id, title, category, instructor);
        let at = tables.courses.insert(&course)?;
        tracing::debug!("course {} inserted at {}", id, at);
        self.after_write(&tables)?;
        Ok(at)
    }

    /// Fetch a course by ID
    pub fn course(&self, id: u32) -> Result<Course> {
        let mut tables = self.tables.lock();
        Ok(tables.courses.get(id)?.1)
    }

    /// Fetch selected fields of a course
    pub fn course_fields(&self, id: u32, fields: &[impl AsRef<str>]) -> Result<Projection> {
        Ok(Projection::of(&self.course(id)?, fields))
    }

    /// Overwrite the supplied fields of a course in place
    pub fn update_course(&self, id: u32, update: &CourseUpdate) -> Result<Course> {
        let mut tables = self.tables.lock();
        let (at, mut course) = tables.courses.get(id)?;

        if let Some(title) = &update.title {
            course.title = title.clone();
        }
        if let Some(category) = &update.category {
            course.category = category.clone();
        }
        if let Some(instructor) = &update.instructor {
            course.instructor = instructor.clone();
        }

        tables.courses.write_at(at, &course)?;
        tracing::debug!("course {} updated at {}", id, at);
        self.after_write(&tables)?;
        Ok(course)
    }

    /// Delete a course and all of its certificates
    ///
    /// The course file never keeps a hole: the last course is moved into the
    /// freed slot and the file is cut by one record.
    pub fn delete_course(&self, id: u32) -> Result<()> {
        let mut guard = self.tables.lock();
        let Tables {
            courses,
            certificates,
        } = &mut *guard;

        let (at, course) = courses.get(id)?;
        let removed = delete_chain(certificates, course.first_certificate)?;

        let last = courses
            .index()
            .last_by_address()
            .ok_or(TandemError::NotFound {
                table: Course::KIND,
                id,
            })?;

        if last.address == at {
            courses.index_mut().remove(id);
            courses.truncate(at as u64)?;
            tracing::debug!("course {} deleted from the end at {}", id, at);
        } else {
            let moved = courses.relocate(last.address, at)?;
            courses.index_mut().update_address(moved.id, at)?;
            courses.index_mut().remove(id);
            courses.truncate(last.address as u64)?;
            tracing::debug!(
                "course {} deleted; course {} moved {} -> {}",
                id,
                moved.id,
                last.address,
                at
            );
        }

        tracing::info!("course {} deleted with {} certificates", id, removed);

        self.maybe_compact(&mut guard)?;
        self.after_write(&guard)
    }

    /// Number of courses
    pub fn count_courses(&self) -> usize {
        self.tables.lock().courses.index().len()
    }

    /// Visit every course slot in file order
    ///
    /// With `include_deleted` cleared slots are visited too.
    pub fn scan_courses<F>(&self, include_deleted: bool, mut visit: F) -> Result<()>
    where
        F: FnMut(u32, &Course),
    {
        let mut tables = self.tables.lock();
        for item in tables.courses.scan()? {
            let (at, course) = item?;
            if include_deleted || course.presence {
                visit(at, &course);
            }
        }
        Ok(())
    }

    /// All courses in file order
    pub fn courses(&self, include_deleted: bool) -> Result<Vec<Course>> {
        let mut out = Vec::new();
        self.scan_courses(include_deleted, |_, c| out.push(c.clone()))?;
        Ok(out)
    }

    // =========================================================================
    // Certificates
    // =========================================================================

    /// Insert a certificate at the end of its course's chain, returning its
    /// offset
    pub fn insert_certificate(&self, id: u32, course_id: u32, issued_to: &str) -> Result<u32> {
        let mut guard = self.tables.lock();
        let Tables {
            courses,
            certificates,
        } = &mut *guard;

        certificates.ensure_absent(id)?;
        let (course_at, mut course) = courses.get(course_id)?;

        let at = certificates.allocate_slot()?;
        let mut node = Certificate::new(id, course_id, issued_to);
        let head = chain::append(certificates, course.first_certificate, &mut node, at)?;
        certificates.place(at, &node)?;

        if head != course.first_certificate {
            course.first_certificate = head;
            courses.write_at(course_at, &course)?;
        }

        tracing::debug!("certificate {} of course {} inserted at {}", id, course_id, at);
        self.after_write(&guard)?;
        Ok(at)
    }

    /// Fetch a certificate by ID
    pub fn certificate(&self, id: u32) -> Result<Certificate> {
        let mut tables = self.tables.lock();
        Ok(tables.certificates.get(id)?.1)
    }

    /// Fetch selected fields of a certificate
    pub fn certificate_fields(&self, id: u32, fields: &[impl AsRef<str>]) -> Result<Projection> {
        Ok(Projection::of(&self.certificate(id)?, fields))
    }

    /// Overwrite the supplied fields of a certificate in place
    pub fn update_certificate(&self, id: u32, update: &CertificateUpdate) -> Result<Certificate> {
        let mut tables = self.tables.lock();
        let (at, mut certificate) = tables.certificates.get(id)?;

        if let Some(issued_to) = &update.issued_to {
            certificate.issued_to = issued_to.clone();
        }

        tables.certificates.write_at(at, &certificate)?;
        tracing::debug!("certificate {} updated at {}", id, at);
        self.after_write(&tables)?;
        Ok(certificate)
    }

    /// Unlink and clear a certificate, freeing its slot
    pub fn delete_certificate(&self, id: u32) -> Result<()> {
        let mut guard = self.tables.lock();
        let Tables {
            courses,
            certificates,
        } = &mut *guard;

        let (at, mut node) = certificates.get(id)?;

        if let Some(head) = chain::unlink(certificates, &node)? {
            let (course_at, mut course) = courses.get(node.course_id)?;
            course.first_certificate = head;
            courses.write_at(course_at, &course)?;
        }

        node.clear();
        certificates.write_at(at, &node)?;
        certificates.index_mut().remove(id);
        certificates.junk_mut().push(at);
        tracing::debug!("certificate {} deleted, slot {} freed", id, at);

        self.maybe_compact(&mut guard)?;
        self.after_write(&guard)
    }

    /// Number of certificates, overall or of one course
    pub fn count_certificates(&self, course_id: Option<u32>) -> Result<usize> {
        let mut guard = self.tables.lock();
        let Tables {
            courses,
            certificates,
        } = &mut *guard;

        match course_id {
            None => Ok(certificates.index().len()),
            Some(course_id) => {
                let (_, course) = courses.get(course_id)?;
                let nodes = chain::walk(certificates, course.first_certificate)?;
                Ok(nodes.iter().filter(|(_, n)| n.presence).count())
            }
        }
    }

    /// Certificates of one course in chain order, with their offsets
    pub fn certificates_of(&self, course_id: u32) -> Result<Vec<(u32, Certificate)>> {
        let mut guard = self.tables.lock();
        let Tables {
            courses,
            certificates,
        } = &mut *guard;

        let (_, course) = courses.get(course_id)?;
        chain::walk(certificates, course.first_certificate)
    }

    /// Visit every certificate slot in file order
    ///
    /// With `include_deleted` cleared slots are visited too.
    pub fn scan_certificates<F>(&self, include_deleted: bool, mut visit: F) -> Result<()>
    where
        F: FnMut(u32, &Certificate),
    {
        let mut tables = self.tables.lock();
        for item in tables.certificates.scan()? {
            let (at, certificate) = item?;
            if include_deleted || certificate.presence {
                visit(at, &certificate);
            }
        }
        Ok(())
    }

    /// All certificates in file order
    pub fn certificates(&self, include_deleted: bool) -> Result<Vec<Certificate>> {
        let mut out = Vec::new();
        self.scan_certificates(include_deleted, |_, c| out.push(c.clone()))?;
        Ok(out)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Compact the certificate file now, regardless of the threshold
    pub fn compact(&self) -> Result<CompactionStats> {
        let mut guard = self.tables.lock();
        let Tables {
            courses,
            certificates,
        } = &mut *guard;

        let stats = compaction::compact(certificates, courses)?;
        self.after_write(&guard)?;
        Ok(stats)
    }

    /// Check every cross-record invariant of both tables
    pub fn verify(&self) -> Result<VerifyReport> {
        let mut guard = self.tables.lock();
        let Tables {
            courses,
            certificates,
        } = &mut *guard;
        let mut problems = Vec::new();

        // Courses: indexed records present, file dense
        let mut course_heads = Vec::new();
        let mut addresses: Vec<u32> = Vec::new();
        for entry in courses.index().entries().to_vec() {
            match courses.read_at(entry.address) {
                Ok(course) if course.id != entry.id => problems.push(format!(
                    "course index {} points at {} holding course {}",
                    entry.id, entry.address, course.id
                )),
                Ok(course) if !course.presence => problems.push(format!(
                    "course {} at {} is not present",
                    entry.id, entry.address
                )),
                Ok(course) => course_heads.push((course.id, course.first_certificate)),
                Err(e) if e.is_not_found() || matches!(e, TandemError::Malformed(_)) => {
                    problems.push(format!("course {}: {}", entry.id, e))
                }
                Err(e) => return Err(e),
            }
            addresses.push(entry.address);
        }
        addresses.sort_unstable();
        for (slot, address) in addresses.iter().enumerate() {
            if *address as usize != slot * Course::SIZE {
                problems.push(format!(
                    "course file has a hole: slot {} holds offset {}",
                    slot, address
                ));
                break;
            }
        }
        let expected_len = (addresses.len() * Course::SIZE) as u64;
        let course_len = courses.file_len()?;
        if course_len != expected_len {
            problems.push(format!(
                "course file is {} bytes, expected {}",
                course_len, expected_len
            ));
        }

        // Certificates: indexed records present, free list disjoint
        for entry in certificates.index().entries().to_vec() {
            match certificates.read_at(entry.address) {
                Ok(node) if node.id != entry.id => problems.push(format!(
                    "certificate index {} points at {} holding certificate {}",
                    entry.id, entry.address, node.id
                )),
                Ok(node) if !node.presence => problems.push(format!(
                    "certificate {} at {} is not present",
                    entry.id, entry.address
                )),
                Ok(_) => {}
                Err(e) if e.is_not_found() || matches!(e, TandemError::Malformed(_)) => {
                    problems.push(format!("certificate {}: {}", entry.id, e))
                }
                Err(e) => return Err(e),
            }
        }
        let mut free_seen = HashSet::new();
        for slot in certificates.junk().iter() {
            if !free_seen.insert(slot) {
                problems.push(format!("free slot {} listed twice", slot));
            }
            if certificates.index().holds_address(slot) {
                problems.push(format!("free slot {} is also indexed", slot));
            }
        }

        // Chains: well formed, and together they cover every certificate
        let mut chained = 0;
        for (course_id, head) in course_heads {
            problems.extend(chain::check(certificates, head, course_id)?);
            if let Ok(nodes) = chain::walk(certificates, head) {
                for (at, node) in &nodes {
                    if certificates.index().address_of(node.id) != Some(*at) {
                        problems.push(format!(
                            "certificate {} chained at {} but indexed elsewhere",
                            node.id, at
                        ));
                    }
                }
                chained += nodes.len();
            }
        }
        if chained != certificates.index().len() {
            problems.push(format!(
                "{} certificates indexed but {} reachable from courses",
                certificates.index().len(),
                chained
            ));
        }

        Ok(VerifyReport { problems })
    }

    /// Persist index and free lists of both tables
    pub fn flush(&self) -> Result<()> {
        self.tables.lock().flush()
    }

    /// Flush and close the database
    pub fn close(self) -> Result<()> {
        self.flush()?;
        tracing::info!("database closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Offset of a course, if it exists
    pub fn course_offset(&self, id: u32) -> Option<u32> {
        self.tables.lock().courses.index().address_of(id)
    }

    /// Offset of a certificate, if it exists
    pub fn certificate_offset(&self, id: u32) -> Option<u32> {
        self.tables.lock().certificates.index().address_of(id)
    }

    /// Free certificate slots, oldest first
    pub fn free_slots(&self) -> Vec<u32> {
        self.tables.lock().certificates.junk().iter().collect()
    }

    /// Table sizes
    pub fn stats(&self) -> Result<DatabaseStats> {
        let tables = self.tables.lock();
        Ok(DatabaseStats {
            courses: tables.courses.index().len(),
            certificates: tables.certificates.index().len(),
            free_slots: tables.certificates.junk().len(),
            course_bytes: tables.courses.file_len()?,
            certificate_bytes: tables.certificates.file_len()?,
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn maybe_compact(&self, tables: &mut Tables) -> Result<Option<CompactionStats>> {
        if tables.certificates.junk().len() < self.config.compaction_threshold {
            return Ok(None);
        }
        let Tables {
            courses,
            certificates,
        } = tables;
        compaction::compact(certificates, courses).map(Some)
    }

    fn after_write(&self, tables: &Tables) -> Result<()> {
        if self.config.flush_on_write {
            tables.flush()?;
        }
        Ok(())
    }
}

/// Clear every certificate of a chain and free its slot
///
/// Neighbour links are not repaired since the whole chain goes.
fn delete_chain(certificates: &mut Table<Certificate>, head: Link) -> Result<usize> {
    let nodes = chain::walk(certificates, head)?;

    for (at, mut node) in nodes.iter().cloned() {
        let id = node.id;
        node.clear();
        certificates.write_at(at, &node)?;
        certificates.index_mut().remove(id);
        certificates.junk_mut().push(at);
        tracing::debug!("certificate {} removed with its course, slot {} freed", id, at);
    }

    Ok(nodes.len())
}
