//! Host framework adapter.
//!
//! Models the way an identity framework drives the validator: every submitted name
//! attribute of a profile update triggers its own validation call, all dispatched at once
//! on separate tasks and in no particular order. The calls of one update share a single
//! [`RequestScope`], which declares the attributes the update validates.

use tower::{Service, ServiceExt};
#[cfg(feature = "uniqname_tracing")]
use tracing::debug;

use crate::validation::{
    api::{RequestScope, ValidationOutcome, ValidationRequest},
    error::ValidationError,
    infrastructure::subject::{NameField, Subject},
};

/// Result of the validation of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResult {
    pub field: NameField,
    pub result: Result<ValidationOutcome, ValidationError>,
}

/// Results of all the attribute validations of one profile update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateReport {
    pub results: Vec<FieldResult>,
}

impl UpdateReport {
    /// Whether every validated attribute passed.
    pub fn is_accepted(&self) -> bool {
        self.results.iter().all(|field| field.result == Ok(ValidationOutcome::Pass))
    }

    pub fn result(&self, field: NameField) -> Option<&Result<ValidationOutcome, ValidationError>> {
        self.results.iter().find(|result| result.field == field).map(|result| &result.result)
    }
}

/// A profile update as submitted to the host framework.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    /// Current stored values of the subject
    subject: Subject,
    /// Submitted name attributes
    submitted: Vec<(NameField, String)>,
    /// Only validate attributes whose value differs from the stored one
    skip_unchanged: bool,
}

impl ProfileUpdate {
    pub fn new(subject: Subject) -> Self {
        Self { subject, submitted: Vec::new(), skip_unchanged: false }
    }

    pub fn first_name(self, value: &str) -> Self {
        self.submit(NameField::FirstName, value)
    }

    pub fn last_name(self, value: &str) -> Self {
        self.submit(NameField::LastName, value)
    }

    /// Skips the validation of attributes submitted unchanged, as some frameworks do.
    ///
    /// A first name changed alone then waits for a last name that never comes; the
    /// validator needs an await timeout to terminate in that case.
    pub fn skip_unchanged(self) -> Self {
        Self { skip_unchanged: true, ..self }
    }

    fn submit(mut self, field: NameField, value: &str) -> Self {
        self.submitted.retain(|(submitted, _)| *submitted != field);
        self.submitted.push((field, value.to_string()));
        self
    }

    /// Validates the update, one concurrent call per submitted attribute.
    pub async fn validate<S>(self, service: S) -> Result<UpdateReport, ValidationError>
    where
        S: Service<ValidationRequest, Response = ValidationOutcome, Error = ValidationError>
            + Clone
            + Send
            + 'static,
        S::Future: Send,
    {
        let skip_unchanged = self.skip_unchanged;
        let subject = self.subject;
        let validated: Vec<(NameField, String)> = self
            .submitted
            .into_iter()
            .filter(|(field, value)| {
                let unchanged = skip_unchanged && subject.name(*field) == Some(value.as_str());
                #[cfg(feature = "uniqname_tracing")]
                if unchanged {
                    debug!("[framework] {} of {} unchanged, skipped", field, subject.id);
                }
                !unchanged
            })
            .collect();

        let scope = RequestScope::expecting(validated.iter().map(|(field, _)| *field));
        let mut tasks = Vec::new();
        for (field, value) in validated {
            let request =
                ValidationRequest { subject: subject.clone(), field, value, scope: scope.clone() };
            let service = service.clone();
            tasks.push((field, tokio::spawn(service.oneshot(request))));
        }

        let mut report = UpdateReport::default();
        for (field, task) in tasks {
            let result = task.await.map_err(|_| ValidationError::InternalError)?;
            report.results.push(FieldResult { field, result });
        }
        Ok(report)
    }
}
