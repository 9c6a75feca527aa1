//! Field projection
//!
//! Selects named fields of a record for display. Field names are matched
//! case-insensitively; unknown names are collected rather than failing the
//! whole projection.

/// Records whose fields can be selected by name
pub trait Project {
    /// Every field name, upper case, in layout order
    const FIELDS: &'static [&'static str];

    /// Fields shown when none are requested
    const DEFAULT_FIELDS: &'static [&'static str];

    /// Display value of a field from `FIELDS`
    fn value(&self, field: &str) -> Option<String>;
}

/// Resolved column list for a projection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Canonical field names, `ID` first, no duplicates
    pub fields: Vec<&'static str>,
    /// Requested names that matched no field, as given
    pub unknown: Vec<String>,
}

impl Selection {
    /// Resolve requested field names against `R::FIELDS`
    pub fn resolve<R: Project>(requested: &[impl AsRef<str>]) -> Self {
        if requested.is_empty() {
            return Self {
                fields: R::DEFAULT_FIELDS.to_vec(),
                unknown: Vec::new(),
            };
        }

        let mut fields = vec!["ID"];
        let mut unknown = Vec::new();
        for name in requested {
            let name = name.as_ref();
            let upper = name.to_ascii_uppercase();
            match R::FIELDS.iter().find(|f| **f == upper) {
                Some(field) if !fields.contains(field) => fields.push(field),
                Some(_) => {}
                None => {
                    tracing::warn!("field '{}' was not found", name.to_lowercase());
                    unknown.push(name.to_string());
                }
            }
        }
        Self { fields, unknown }
    }

    /// Values of the selected fields of one record
    pub fn row<R: Project>(&self, record: &R) -> Vec<String> {
        self.fields
            .iter()
            .map(|f| record.value(f).unwrap_or_default())
            .collect()
    }
}

/// One record projected onto a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// (field, value) pairs in selection order
    pub values: Vec<(&'static str, String)>,
    /// Requested names that matched no field
    pub unknown: Vec<String>,
}

impl Projection {
    /// Project `record` onto the requested field names
    pub fn of<R: Project>(record: &R, requested: &[impl AsRef<str>]) -> Self {
        let selection = Selection::resolve::<R>(requested);
        let values = selection
            .fields
            .iter()
            .copied()
            .zip(selection.row(record))
            .collect();
        Self {
            values,
            unknown: selection.unknown,
        }
    }

    /// Value of one field, if it was selected
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }
}
