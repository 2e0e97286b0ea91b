use std::{future::Future, pin::Pin, task::Poll};

use tower::{Service, ServiceExt};
#[cfg(feature = "uniqname_tracing")]
use tracing::{debug, info, warn};

use crate::{
    backends::catalog::{DUPLICATE_NAME_KEY, FALLBACK_MESSAGE},
    validation::{
        api::{
            BarrierRequest, BarrierResponse, LocalizationRequest, LocalizationResponse,
            UniquenessRequest, UniquenessResponse, ValidationOutcome, ValidationRequest,
        },
        error::ValidationError,
        infrastructure::{
            config::{AwaitFallback, DEFAULT_LOCALE},
            subject::{NameCandidate, NameField, Subject},
        },
    },
};

/// Field validation service.
///
/// Entry point invoked once per changed name attribute. The last-name call publishes its
/// value to the round of its update and checks it against the stored first name; the
/// first-name call waits for that value, checks the combined pair and releases the round. Both attach a localized
/// duplicate error to their own field when the pair is already taken by another subject.
#[derive(Debug, Clone)]
pub struct FieldValidationService<B, U, L> {
    /// Rendezvous between the two field calls of a subject
    barrier: B,
    /// Pairing check against the directory
    uniqueness: U,
    /// Message catalog for the duplicate error text
    localization: L,
    /// Behavior when the wait for the last name is cancelled
    fallback: AwaitFallback,
    /// Locale used when the subject has no stored preference
    default_locale: String,
}

impl<B, U, L> FieldValidationService<B, U, L> {
    pub fn new(barrier: B, uniqueness: U, localization: L) -> Self {
        Self {
            barrier,
            uniqueness,
            localization,
            fallback: AwaitFallback::default(),
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn with_fallback(self, fallback: AwaitFallback) -> Self {
        Self { fallback, ..self }
    }

    pub fn with_default_locale(self, default_locale: &str) -> Self {
        Self { default_locale: default_locale.to_string(), ..self }
    }
}

impl<B, U, L> FieldValidationService<B, U, L>
where
    B: Service<BarrierRequest, Response = BarrierResponse, Error = ValidationError>,
    U: Service<UniquenessRequest, Response = UniquenessResponse, Error = ValidationError>,
    L: Service<LocalizationRequest, Response = LocalizationResponse, Error = ValidationError>,
{
    async fn validate_last_name(
        &mut self,
        request: ValidationRequest,
    ) -> Result<ValidationOutcome, ValidationError> {
        let ValidationRequest { subject, value, scope, .. } = request;
        if scope.expects(NameField::FirstName) {
            let BarrierResponse::Submitted { .. } = self
                .barrier
                .ready()
                .await?
                .call(BarrierRequest::SubmitLastName {
                    subject: subject.id.clone(),
                    round: scope.round(),
                    value: value.clone(),
                })
                .await?
            else {
                return Err(ValidationError::InternalError);
            };
        } else {
            #[cfg(feature = "uniqname_tracing")]
            debug!("[validation] no first name validated with {}, nothing to submit", subject.id);
        }
        scope.propose(NameField::LastName, &value);

        let candidate = NameCandidate::from_parts(subject.first_name.clone(), Some(value));
        self.check(&subject, NameField::LastName, candidate).await
    }

    async fn validate_first_name(
        &mut self,
        request: ValidationRequest,
    ) -> Result<ValidationOutcome, ValidationError> {
        let ValidationRequest { subject, value, scope, .. } = request;
        let awaited = self
            .barrier
            .ready()
            .await?
            .call(BarrierRequest::AwaitLastName { subject: subject.id.clone(), round: scope.round() })
            .await;
        let (last_name, lease) = match awaited {
            Ok(BarrierResponse::LastName { value, lease }) => (Some(value), Some(lease)),
            Ok(_) => return Err(ValidationError::InternalError),
            Err(ValidationError::WaitCancelled(_id))
                if self.fallback == AwaitFallback::CurrentLastName =>
            {
                #[cfg(feature = "uniqname_tracing")]
                warn!("[validation] no last name submitted for {}, using the stored one", _id);
                (subject.last_name.clone(), None)
            }
            Err(error) => return Err(error),
        };
        scope.propose(NameField::FirstName, &value);

        // The lease releases the round if this call is dropped before the release below
        let candidate = NameCandidate::from_parts(Some(value), last_name);
        let outcome = self.check(&subject, NameField::FirstName, candidate).await;
        if let Some(lease) = lease {
            self.barrier.ready().await?.call(BarrierRequest::Release { lease }).await?;
        }
        outcome
    }

    /// Runs the uniqueness check, skipped when either half of the name is unknown.
    async fn check(
        &mut self,
        subject: &Subject,
        field: NameField,
        candidate: Option<NameCandidate>,
    ) -> Result<ValidationOutcome, ValidationError> {
        let Some(candidate) = candidate else {
            return Ok(ValidationOutcome::Pass);
        };
        match self
            .uniqueness
            .ready()
            .await?
            .call(UniquenessRequest::IsUnique { candidate, exclude: Some(subject.id.clone()) })
            .await?
        {
            UniquenessResponse::Unique(true) => Ok(ValidationOutcome::Pass),
            UniquenessResponse::Unique(false) => {
                let locale = subject.locale.clone().unwrap_or_else(|| self.default_locale.clone());
                let message = match self.localize(locale).await {
                    Ok(message) => message,
                    Err(_error) => {
                        #[cfg(feature = "uniqname_tracing")]
                        warn!("[validation] failed to load localized message: {}", _error);
                        FALLBACK_MESSAGE.to_string()
                    }
                };
                Ok(ValidationOutcome::DuplicateName { field, message })
            }
        }
    }

    async fn localize(&mut self, locale: String) -> Result<String, ValidationError> {
        let LocalizationResponse::Message(message) = self
            .localization
            .ready()
            .await?
            .call(LocalizationRequest::ResolveMessage {
                locale,
                key: DUPLICATE_NAME_KEY.to_string(),
            })
            .await?;
        Ok(message)
    }
}

impl<B, U, L> Service<ValidationRequest> for FieldValidationService<B, U, L>
where
    B: Service<BarrierRequest, Response = BarrierResponse, Error = ValidationError>
        + Clone
        + Send
        + 'static,
    B::Future: Send,
    U: Service<UniquenessRequest, Response = UniquenessResponse, Error = ValidationError>
        + Clone
        + Send
        + 'static,
    U::Future: Send,
    L: Service<LocalizationRequest, Response = LocalizationResponse, Error = ValidationError>
        + Clone
        + Send
        + 'static,
    L::Future: Send,
{
    type Response = ValidationOutcome;
    type Error = ValidationError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: ValidationRequest) -> Self::Future {
        let mut this = self.clone();
        Box::pin(async move {
            #[cfg(feature = "uniqname_tracing")]
            info!(
                "[validation] ValidateField: subject: {}, field: {}",
                request.subject.id, request.field
            );
            match request.field {
                NameField::LastName => this.validate_last_name(request).await,
                NameField::FirstName => this.validate_first_name(request).await,
            }
        })
    }
}
