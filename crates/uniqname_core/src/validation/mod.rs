//! Validation module.
//!
//! Enforces the uniqueness of the (first name, last name) pair of a subject although the
//! two attributes are validated by separate, concurrently scheduled calls.
//!
//! ## Components
//!
//! - **Registry**: owns the coordination state of each (subject, round), handed out by
//!   atomic get-or-create and taken back by identity-checked removal
//! - **Barrier**: lets the first-name call of a subject observe the value submitted by the
//!   last-name call of the same update
//! - **Uniqueness**: searches the directory on the first name and filters on the last name
//! - **Field validation**: the entry point composing the above, called once per attribute
//! - **Framework adapter**: dispatches the attribute calls of a profile update
//!
//! ## Default Service Stack
//!
//! [`ValidationDefaultStack`] wires the barrier and the uniqueness checker to a directory
//! and a localization service; [`init_validator`] builds it from a [`ValidatorConfig`].
pub mod api;
pub mod error;
pub mod field;
pub mod framework;
pub mod infrastructure;
pub mod services;

use infrastructure::config::ValidatorConfig;

/// Standard field validation stack parameterized by directory and localization services.
pub type ValidationDefaultStack<D, L> = field::FieldValidationService<
    services::barrier::BarrierService,
    services::uniqueness::UniquenessService<D>,
    L,
>;

/// Initialize a field validation stack.
///
/// # Arguments
/// * `directory` - Directory service searched for clashing subjects
/// * `localization` - Message catalog resolving the duplicate error text
/// * `config` - Await timeout, await fallback and default locale
pub fn init_validator<D, L>(
    directory: D,
    localization: L,
    config: &ValidatorConfig,
) -> ValidationDefaultStack<D, L> {
    field::FieldValidationService::new(
        services::barrier::BarrierService::new(config.await_timeout_ms),
        services::uniqueness::UniquenessService::new(directory),
        localization,
    )
    .with_fallback(config.fallback)
    .with_default_locale(&config.default_locale)
}
