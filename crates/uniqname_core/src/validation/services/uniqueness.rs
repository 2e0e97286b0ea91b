//! Uniqueness check of a (first name, last name) pair against the directory.
use std::{future::Future, pin::Pin, task::Poll};

use futures::{TryStreamExt, future};
use tower::{Service, ServiceExt};
#[cfg(feature = "uniqname_tracing")]
use tracing::{debug, info};

use crate::validation::{
    api::{DirectoryRequest, DirectoryResponse, UniquenessRequest, UniquenessResponse},
    error::ValidationError,
    infrastructure::subject::{NameCandidate, NameField, SubjectId},
};

#[derive(Debug, Clone)]
pub struct UniquenessService<D> {
    /// Directory queried for subjects sharing the candidate name
    directory: D,
}

impl<D> UniquenessService<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }
}

impl<D> UniquenessService<D>
where
    D: Service<DirectoryRequest, Response = DirectoryResponse, Error = ValidationError>,
{
    /// Returns true iff no subject other than `exclude` carries the candidate name.
    ///
    /// The directory is searched on the first name only; the last name is matched exactly
    /// (case-sensitive) on the lazily produced results, stopping at the first clash.
    async fn is_unique(
        &mut self,
        candidate: NameCandidate,
        exclude: Option<SubjectId>,
    ) -> Result<bool, ValidationError> {
        let DirectoryResponse::Subjects(subjects) = self
            .directory
            .ready()
            .await?
            .call(DirectoryRequest::Search {
                attribute: NameField::FirstName,
                value: candidate.first_name.clone(),
            })
            .await?;

        let mut clashes = subjects.try_filter(move |subject| {
            future::ready(
                subject.last_name.as_deref() == Some(candidate.last_name.as_str())
                    && exclude.as_ref() != Some(&subject.id),
            )
        });
        match clashes.try_next().await? {
            Some(_subject) => {
                #[cfg(feature = "uniqname_tracing")]
                debug!("[uniqueness] clash with subject {}", _subject.id);
                Ok(false)
            }
            None => Ok(true),
        }
    }
}

impl<D> Service<UniquenessRequest> for UniquenessService<D>
where
    D: Service<DirectoryRequest, Response = DirectoryResponse, Error = ValidationError>
        + Clone
        + Send
        + 'static,
    D::Future: Send,
{
    type Response = UniquenessResponse;
    type Error = ValidationError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: UniquenessRequest) -> Self::Future {
        let mut this = self.clone();
        Box::pin(async move {
            match request {
                UniquenessRequest::IsUnique { candidate, exclude } => {
                    #[cfg(feature = "uniqname_tracing")]
                    info!("[uniqueness] IsUnique: excluding: {:?}", exclude);
                    this.is_unique(candidate, exclude).await.map(UniquenessResponse::Unique)
                }
            }
        })
    }
}
