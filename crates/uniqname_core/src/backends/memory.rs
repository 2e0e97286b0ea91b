use std::{pin::Pin, sync::Arc, task::Poll};

use dashmap::DashMap;
use futures::{StreamExt, stream};
use tower::Service;

use crate::validation::{
    api::{DirectoryRequest, DirectoryResponse},
    error::ValidationError,
    infrastructure::subject::{Subject, SubjectId},
};

/// Directory keeping every subject in memory.
///
/// Clones share the same store, so subjects inserted after the directory was handed to a
/// validation stack are visible to it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    subjects: Arc<DashMap<SubjectId, Subject>>,
    outage: Option<ValidationError>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_subjects(subjects: impl IntoIterator<Item = Subject>) -> Self {
        let directory = Self::new();
        for subject in subjects {
            directory.insert(subject);
        }
        directory
    }

    /// Makes every search fail with the given error.
    pub fn with_outage(self, error: ValidationError) -> Self {
        Self { outage: Some(error), ..self }
    }

    /// Inserts or replaces a subject, returning the previous record.
    pub fn insert(&self, subject: Subject) -> Option<Subject> {
        self.subjects.insert(subject.id.clone(), subject)
    }

    pub fn remove(&self, id: &SubjectId) -> Option<Subject> {
        self.subjects.remove(id).map(|(_, subject)| subject)
    }

    pub fn get(&self, id: &SubjectId) -> Option<Subject> {
        self.subjects.get(id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

impl Service<DirectoryRequest> for InMemoryDirectory {
    type Response = DirectoryResponse;
    type Error = ValidationError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: DirectoryRequest) -> Self::Future {
        let subjects = self.subjects.clone();
        let outage = self.outage.clone();
        Box::pin(async move {
            if let Some(error) = outage {
                return Err(error);
            }
            match request {
                DirectoryRequest::Search { attribute, value } => {
                    // Snapshot of the ids, records are read lazily as the stream is polled
                    let ids: Vec<SubjectId> =
                        subjects.iter().map(|entry| entry.key().clone()).collect();
                    let matches = stream::iter(ids).filter_map(move |id| {
                        let subject = subjects
                            .get(&id)
                            .map(|entry| entry.value().clone())
                            .filter(|subject| subject.name(attribute) == Some(value.as_str()));
                        async move { subject.map(Ok::<_, ValidationError>) }
                    });
                    Ok(DirectoryResponse::Subjects(matches.boxed()))
                }
            }
        })
    }
}
