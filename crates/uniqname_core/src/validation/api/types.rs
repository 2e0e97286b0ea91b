//! Validation API type definitions.
//!
//! This module defines the request and response types of every service in the
//! validation stack.
//!
//! ## Field validation API
//! The entry point invoked by the host framework once per changed attribute. Each call
//! carries the subject's current stored values, the changed field, its new value and the
//! request scope shared with the other field calls of the same profile update.
//!
//! ## Internal Service APIs
//! - **Barrier**: per-subject rendezvous between the last-name and first-name calls
//! - **Uniqueness**: pairing check against the directory
//!
//! ## External Service APIs
//! - **Directory**: attribute search over all subjects
//! - **Localization**: message catalog lookup

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use futures::stream::BoxStream;

use crate::validation::{
    error::ValidationError,
    infrastructure::subject::{NameCandidate, NameField, Subject, SubjectId},
    services::registry::RoundLease,
};

/// Proposed name values recorded by the field calls of one profile update.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ProposedNames {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Allocator of round tokens, one per request scope.
static NEXT_ROUND: AtomicU64 = AtomicU64::new(1);

/// Request-scoped store shared by the field calls of a single profile update.
///
/// Owned by the framework adapter, which creates one per update and hands a clone to each
/// field validation. It never outlives the update. Its round token ties the barrier round
/// of each subject to this update only.
#[derive(Debug, Clone)]
pub struct RequestScope {
    round: u64,
    /// Fields validated by the update, `None` when the caller did not declare them
    expected: Option<Vec<NameField>>,
    proposed: Arc<Mutex<ProposedNames>>,
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestScope {
    /// Scope of an update that may validate both name fields.
    pub fn new() -> Self {
        Self {
            round: NEXT_ROUND.fetch_add(1, Ordering::Relaxed),
            expected: None,
            proposed: Arc::default(),
        }
    }

    /// Scope of an update validating exactly `fields`.
    pub fn expecting(fields: impl IntoIterator<Item = NameField>) -> Self {
        Self { expected: Some(fields.into_iter().collect()), ..Self::new() }
    }

    /// Round token of the update.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Whether the update validates `field`. Undeclared scopes expect both fields.
    pub fn expects(&self, field: NameField) -> bool {
        self.expected.as_ref().is_none_or(|fields| fields.contains(&field))
    }

    /// Records the proposed value for a field.
    pub fn propose(&self, field: NameField, value: &str) {
        let mut proposed = self.proposed.lock().unwrap_or_else(PoisonError::into_inner);
        match field {
            NameField::FirstName => proposed.first_name = Some(value.to_string()),
            NameField::LastName => proposed.last_name = Some(value.to_string()),
        }
    }

    /// Returns the proposed value for a field, if one was recorded in this update.
    pub fn proposed(&self, field: NameField) -> Option<String> {
        let proposed = self.proposed.lock().unwrap_or_else(PoisonError::into_inner);
        match field {
            NameField::FirstName => proposed.first_name.clone(),
            NameField::LastName => proposed.last_name.clone(),
        }
    }

    pub fn snapshot(&self) -> ProposedNames {
        self.proposed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Field validation request, one per changed attribute.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    /// Current stored values of the subject being updated
    pub subject: Subject,
    /// Attribute that changed
    pub field: NameField,
    /// New value submitted for the attribute
    pub value: String,
    /// Store shared with the other field calls of the same update
    pub scope: RequestScope,
}

/// Field validation outcome.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ValidationOutcome {
    /// The combined name is unique, or could not be assembled.
    Pass,
    /// Another subject already carries the combined name.
    DuplicateName {
        /// Field the error is attached to
        field: NameField,
        /// Localized error text
        message: String,
    },
}

/// Barrier service request types.
#[derive(Debug, Eq, PartialEq)]
pub enum BarrierRequest {
    /// Publish the last name of the subject's round and wake its waiters.
    SubmitLastName { subject: SubjectId, round: u64, value: String },
    /// Wait for the last name of the subject's round.
    AwaitLastName { subject: SubjectId, round: u64 },
    /// Discard a consumed round.
    Release { lease: RoundLease },
}

/// Barrier service response types.
#[derive(Debug, Eq, PartialEq)]
pub enum BarrierResponse {
    /// Last name published in the given round.
    Submitted { round: u64 },
    /// Last name recalled, with the claim on its round.
    LastName { value: String, lease: RoundLease },
    /// Round discarded.
    Released,
}

/// Uniqueness service request types.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum UniquenessRequest {
    /// Check that no subject other than `exclude` carries the candidate name.
    IsUnique { candidate: NameCandidate, exclude: Option<SubjectId> },
}

/// Uniqueness service response types.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UniquenessResponse {
    Unique(bool),
}

/// Directory service request types.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DirectoryRequest {
    /// Search subjects whose attribute exactly equals the value.
    Search { attribute: NameField, value: String },
}

/// Lazy sequence of subjects produced by a directory search.
pub type SubjectStream = BoxStream<'static, Result<Subject, ValidationError>>;

/// Directory service response types.
pub enum DirectoryResponse {
    Subjects(SubjectStream),
}

/// Localization service request types.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LocalizationRequest {
    /// Resolve a message key for a locale given as a language tag.
    ResolveMessage { locale: String, key: String },
}

/// Localization service response types.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LocalizationResponse {
    Message(String),
}
