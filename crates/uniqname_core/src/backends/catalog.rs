use std::{collections::HashMap, pin::Pin, sync::Arc, task::Poll};

use tower::Service;

use crate::validation::{
    api::{LocalizationRequest, LocalizationResponse},
    error::ValidationError,
};

/// Message key of the duplicate name error.
pub const DUPLICATE_NAME_KEY: &str = "attributeValidationDuplicateFirstnameLastnameCombination";

/// Text used when the duplicate name message cannot be resolved.
pub const FALLBACK_MESSAGE: &str = "An error occurred while validating the name combination.";

/// Message catalog keyed by (locale, key).
///
/// Lookups try the exact language tag first, then its primary language subtag, so that
/// "fr-CA" resolves against "fr" messages.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    messages: Arc<HashMap<(String, String), String>>,
}

impl MessageCatalog {
    pub fn new(messages: impl IntoIterator<Item = (&'static str, &'static str, &'static str)>) -> Self {
        let messages = messages
            .into_iter()
            .map(|(locale, key, message)| ((locale.to_string(), key.to_string()), message.to_string()))
            .collect();
        Self { messages: Arc::new(messages) }
    }

    fn resolve(&self, locale: &str, key: &str) -> Result<String, ValidationError> {
        let language = locale.split(['-', '_']).next().unwrap_or(locale);
        [locale, language]
            .into_iter()
            .find_map(|tag| self.messages.get(&(tag.to_string(), key.to_string())))
            .cloned()
            .ok_or_else(|| ValidationError::LocalizationFailure {
                locale: locale.to_string(),
                key: key.to_string(),
            })
    }
}

/// Catalog with the duplicate name message in the bundled languages.
pub fn default_catalog() -> MessageCatalog {
    MessageCatalog::new([
        ("en", DUPLICATE_NAME_KEY, "This combination of first name and last name is already in use."),
        ("fr", DUPLICATE_NAME_KEY, "Cette combinaison de prénom et de nom est déjà utilisée."),
        ("de", DUPLICATE_NAME_KEY, "Diese Kombination aus Vor- und Nachname wird bereits verwendet."),
    ])
}

impl Service<LocalizationRequest> for MessageCatalog {
    type Response = LocalizationResponse;
    type Error = ValidationError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: LocalizationRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                LocalizationRequest::ResolveMessage { locale, key } => {
                    this.resolve(&locale, &key).map(LocalizationResponse::Message)
                }
            }
        })
    }
}
