// Record loader module
// Loads and validates employee records from the JSON data file


use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{Result, SearchError};

/// A single validated employee record. Immutable once loaded; records
/// live for one indexing pass and are replaced wholesale on rebuild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EmployeeRecord {
    pub id: u64,
    pub name: String,
    pub skills: Vec<String>,
    pub experience_years: u32,
    pub projects: Vec<String>,
    pub availability: String,
}

#[derive(Debug, Deserialize)]
struct EmployeeFile {
    employees: Vec<EmployeeRecord>,
}

impl EmployeeRecord {
    /// Construct a record, rejecting malformed field values. Missing
    /// fields are already rejected at deserialization time; this covers
    /// the semantic rules serde cannot express.
    #[inline]
    pub fn new(
        id: u64,
        name: String,
        skills: Vec<String>,
        experience_years: u32,
        projects: Vec<String>,
        availability: String,
    ) -> Result<Self> {
        let record = Self {
            id,
            name,
            skills,
            experience_years,
            projects,
            availability,
        };
        record.validate()?;
        Ok(record)
    }

    /// Validate field contents. Empty skill/project lists are valid (the
    /// record still yields a profile document), but empty strings inside
    /// them are not, since they would become meaningless discriminators.
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SearchError::Validation(format!(
                "Employee {} has an empty name",
                self.id
            )));
        }

        if self.availability.trim().is_empty() {
            return Err(SearchError::Validation(format!(
                "Employee {} ({}) has an empty availability status",
                self.id, self.name
            )));
        }

        if self.skills.iter().any(|s| s.trim().is_empty()) {
            return Err(SearchError::Validation(format!(
                "Employee {} ({}) has an empty skill entry",
                self.id, self.name
            )));
        }

        if self.projects.iter().any(|p| p.trim().is_empty()) {
            return Err(SearchError::Validation(format!(
                "Employee {} ({}) has an empty project entry",
                self.id, self.name
            )));
        }

        Ok(())
    }
}

/// Load employee records from a JSON file of the form
/// `{"employees": [...]}`. Any structural problem fails the whole load;
/// no partially validated record set is ever returned.
#[inline]
pub fn load_employee_records<P: AsRef<Path>>(path: P) -> Result<Vec<EmployeeRecord>> {
    let path = path.as_ref();
    info!("Loading employee data from {}", path.display());

    if !path.exists() {
        return Err(SearchError::Validation(format!(
            "Employee data file not found at: {}",
            path.display()
        )));
    }

    let content = fs::read_to_string(path)?;

    let file: EmployeeFile = serde_json::from_str(&content).map_err(|e| {
        SearchError::Validation(format!(
            "Failed to parse employee data file {}: {}",
            path.display(),
            e
        ))
    })?;

    validate_records(&file.employees)?;

    if file.employees.is_empty() {
        warn!("Employee data file {} contains no records", path.display());
    } else {
        info!("Loaded {} employee records", file.employees.len());
    }

    Ok(file.employees)
}

/// Validate a full record set: per-record field rules plus cross-record
/// id uniqueness.
#[inline]
pub fn validate_records(records: &[EmployeeRecord]) -> Result<()> {
    let mut seen_ids = HashSet::new();

    for record in records {
        record.validate()?;

        if !seen_ids.insert(record.id) {
            return Err(SearchError::Validation(format!(
                "Duplicate employee id {} in record set",
                record.id
            )));
        }
    }

    Ok(())
}
