// Document expander module
// Fans each employee record out into one profile document plus one
// document per skill and per project, so that narrowly focused queries
// are not diluted by unrelated fields sharing a vector.


use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::loader::EmployeeRecord;

/// Classification of an indexed fragment, controlling which
/// discriminator its metadata carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Profile,
    Skill,
    Project,
}

impl DocumentKind {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Profile => "profile",
            DocumentKind::Skill => "skill",
            DocumentKind::Project => "project",
        }
    }

    #[inline]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "profile" => Some(DocumentKind::Profile),
            "skill" => Some(DocumentKind::Skill),
            "project" => Some(DocumentKind::Project),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata stored alongside each indexed document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub employee_id: u64,
    pub name: String,
    pub kind: DocumentKind,
    /// Originating skill, present only for `Skill` documents.
    pub skill: Option<String>,
    /// Originating project, present only for `Project` documents.
    pub project: Option<String>,
    pub experience_years: u32,
    pub availability: String,
}

/// A searchable text fragment derived from one employee record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl IndexedDocument {
    /// Identity of a document within one index generation:
    /// (employee id, kind, discriminator). Every document produced by
    /// `expand` has a distinct identity.
    #[inline]
    pub fn identity(&self) -> (u64, DocumentKind, Option<&str>) {
        let discriminator = match self.metadata.kind {
            DocumentKind::Profile => None,
            DocumentKind::Skill => self.metadata.skill.as_deref(),
            DocumentKind::Project => self.metadata.project.as_deref(),
        };
        (self.metadata.employee_id, self.metadata.kind, discriminator)
    }
}

/// Expand one record into `1 + |skills| + |projects|` documents. A
/// record with no skills and no projects still yields its profile
/// document. Fails fast on a malformed record rather than indexing
/// corrupt metadata.
#[inline]
pub fn expand(record: &EmployeeRecord) -> Result<Vec<IndexedDocument>> {
    record.validate()?;

    let mut documents = Vec::with_capacity(1 + record.skills.len() + record.projects.len());

    documents.push(profile_document(record));

    for skill in &record.skills {
        documents.push(skill_document(record, skill));
    }

    for project in &record.projects {
        documents.push(project_document(record, project));
    }

    Ok(documents)
}

/// Expand a whole record set in input order. Any invalid record aborts
/// the expansion; no partial document list is returned.
#[inline]
pub fn expand_all(records: &[EmployeeRecord]) -> Result<Vec<IndexedDocument>> {
    let mut documents = Vec::new();
    for record in records {
        documents.extend(expand(record)?);
    }
    Ok(documents)
}

/// The profile document restates the primary fields in a condensed
/// "Key Details" section; the redundancy raises lexical overlap with
/// varied query phrasings.
fn profile_document(record: &EmployeeRecord) -> IndexedDocument {
    let skills = record.skills.join(", ");
    let projects = record.projects.join(", ");
    let primary_skills = record
        .skills
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    let text = format!(
        "Employee Profile:\n\
         ID: {id}\n\
         Name: {name}\n\
         Skills: {skills}\n\
         Experience: {years} years\n\
         Projects: {projects}\n\
         Availability: {availability}\n\
         \n\
         Key Details:\n\
         - Primary Skills: {primary_skills}\n\
         - Years of Experience: {years}\n\
         - Current Availability: {availability}\n\
         - Project Experience: {projects}\n",
        id = record.id,
        name = record.name,
        skills = skills,
        years = record.experience_years,
        projects = projects,
        availability = record.availability,
        primary_skills = primary_skills,
    );

    IndexedDocument {
        text,
        metadata: DocumentMetadata {
            employee_id: record.id,
            name: record.name.clone(),
            kind: DocumentKind::Profile,
            skill: None,
            project: None,
            experience_years: record.experience_years,
            availability: record.availability.clone(),
        },
    }
}

fn skill_document(record: &EmployeeRecord, skill: &str) -> IndexedDocument {
    let text = format!(
        "Employee {name} has expertise in {skill} with {years} years of experience.\n\
         Projects involving {skill}: {projects}\n\
         Availability: {availability}",
        name = record.name,
        skill = skill,
        years = record.experience_years,
        projects = record.projects.join(", "),
        availability = record.availability,
    );

    IndexedDocument {
        text,
        metadata: DocumentMetadata {
            employee_id: record.id,
            name: record.name.clone(),
            kind: DocumentKind::Skill,
            skill: Some(skill.to_string()),
            project: None,
            experience_years: record.experience_years,
            availability: record.availability.clone(),
        },
    }
}

fn project_document(record: &EmployeeRecord, project: &str) -> IndexedDocument {
    let text = format!(
        "Employee {name} worked on {project} project.\n\
         Skills used: {skills}\n\
         Experience: {years} years\n\
         Availability: {availability}",
        name = record.name,
        project = project,
        skills = record.skills.join(", "),
        years = record.experience_years,
        availability = record.availability,
    );

    IndexedDocument {
        text,
        metadata: DocumentMetadata {
            employee_id: record.id,
            name: record.name.clone(),
            kind: DocumentKind::Project,
            skill: None,
            project: Some(project.to_string()),
            experience_years: record.experience_years,
            availability: record.availability.clone(),
        },
    }
}
