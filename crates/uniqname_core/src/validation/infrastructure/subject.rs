//! Subject naming and identification.
//!
//! A subject is the profile record being validated. Its identifier is stable across
//! updates and is the key under which concurrent field validations of one profile
//! coordinate. Name values are optional because a profile may exist without either half
//! of its name.

use std::fmt::{Debug, Display};

/// Stable unique identifier of a subject.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SubjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A profile record as stored by the directory.
///
/// Also used as the snapshot of the current stored values handed to the validator along
/// with each field change.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Subject {
    /// Stable identifier
    pub id: SubjectId,
    /// Stored first name, if any
    pub first_name: Option<String>,
    /// Stored last name, if any
    pub last_name: Option<String>,
    /// Stored locale preference as a language tag (e.g. "fr-CA")
    pub locale: Option<String>,
}

impl Subject {
    pub fn new(id: impl Into<SubjectId>, first_name: &str, last_name: &str) -> Self {
        Self {
            id: id.into(),
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            locale: None,
        }
    }

    /// Creates a subject with no stored name at all.
    pub fn unnamed(id: impl Into<SubjectId>) -> Self {
        Self { id: id.into(), first_name: None, last_name: None, locale: None }
    }

    pub fn with_locale(self, locale: &str) -> Self {
        Self { locale: Some(locale.to_string()), ..self }
    }

    /// Returns the stored value of the given name field.
    pub fn name(&self, field: NameField) -> Option<&str> {
        match field {
            NameField::FirstName => self.first_name.as_deref(),
            NameField::LastName => self.last_name.as_deref(),
        }
    }
}

/// The two attributes taking part in the uniqueness constraint.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum NameField {
    FirstName,
    LastName,
}

impl NameField {
    /// Attribute name as known by the host framework.
    pub fn attribute_name(&self) -> &'static str {
        match self {
            NameField::FirstName => "firstName",
            NameField::LastName => "lastName",
        }
    }
}

impl Display for NameField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.attribute_name())
    }
}

/// The (first name, last name) pair checked for uniqueness.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct NameCandidate {
    pub first_name: String,
    pub last_name: String,
}

impl NameCandidate {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self { first_name: first_name.to_string(), last_name: last_name.to_string() }
    }

    /// Assembles a candidate only when both halves are known.
    pub fn from_parts(first_name: Option<String>, last_name: Option<String>) -> Option<Self> {
        match (first_name, last_name) {
            (Some(first_name), Some(last_name)) => Some(Self { first_name, last_name }),
            _ => None,
        }
    }
}

impl Display for NameCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}
