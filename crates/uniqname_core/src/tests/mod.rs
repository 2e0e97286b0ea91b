
use std::time::{Duration, Instant};

use tower::Service;

use crate::{
    backends::catalog::default_catalog,
    validation::{
        api::{RequestScope, ValidationOutcome},
        error::ValidationError,
        framework::ProfileUpdate,
        infrastructure::{
            config::{AwaitFallback, ValidatorConfig},
            subject::{NameField, Subject},
        },
        init_validator,
    },
};

#[tokio::test]
async fn integration_duplicate_pair_for_new_subject() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let (mut validator, barrier) = fixtures::validator(fixtures::directory(), &Default::default());
    let subject = Subject::unnamed("y");
    let scope = RequestScope::new();

    assert_pass!(validate_field!(validator, subject, LastName, "Doe", scope));
    assert_duplicate!(validate_field!(validator, subject, FirstName, "John", scope), FirstName);
    assert!(barrier.registry().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn integration_duplicate_pair_concurrent_update() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let validator = init_validator(fixtures::directory(), default_catalog(), &Default::default());

    // Both attribute calls dispatched at once, in whatever order the runtime picks
    let report = ProfileUpdate::new(Subject::unnamed("y"))
        .first_name("John")
        .last_name("Doe")
        .validate(validator)
        .await
        .unwrap();

    assert!(!report.is_accepted());
    assert_eq!(report.results.len(), 2);
    // No stored first name, so the last-name half has nothing to compare whatever the order
    assert_eq!(report.result(NameField::LastName), Some(&Ok(ValidationOutcome::Pass)));
    assert_duplicate!(report.result(NameField::FirstName).cloned().unwrap(), FirstName);
}

#[tokio::test]
async fn integration_own_pair_is_unique() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let directory = fixtures::directory();
    let stored = Subject::new("u", "Jon", "Doe");
    directory.insert(stored.clone());
    let validator = init_validator(directory.clone(), default_catalog(), &Default::default());

    // Resubmitting the stored pair unchanged
    let report = ProfileUpdate::new(stored.clone())
        .first_name("Jon")
        .last_name("Doe")
        .validate(validator.clone())
        .await
        .unwrap();
    assert!(report.is_accepted());

    // Jon -> John while "x" already is John Doe
    let report = ProfileUpdate::new(stored)
        .first_name("John")
        .last_name("Doe")
        .validate(validator)
        .await
        .unwrap();
    assert_duplicate!(report.result(NameField::FirstName).cloned().unwrap(), FirstName);
}

#[tokio::test]
async fn integration_rename_into_free_pair_excluding_self() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let directory = fixtures::directory();
    // "x" is stored as Jon Doe and renames itself to John Doe
    directory.insert(Subject::new("x", "Jon", "Doe"));
    let validator = init_validator(directory.clone(), default_catalog(), &Default::default());

    let report = ProfileUpdate::new(Subject::new("x", "Jon", "Doe"))
        .first_name("John")
        .last_name("Doe")
        .validate(validator)
        .await
        .unwrap();
    assert!(report.is_accepted());
}

#[tokio::test]
async fn integration_unused_pair_passes() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let (mut validator, barrier) = fixtures::validator(fixtures::directory(), &Default::default());
    let subject = Subject::unnamed("y");
    let scope = RequestScope::new();

    assert_pass!(validate_field!(validator, subject, LastName, "Smyth", scope));
    assert_pass!(validate_field!(validator, subject, FirstName, "Anna", scope));
    assert!(barrier.registry().is_empty());
}

#[tokio::test]
async fn integration_consecutive_rounds_observe_latest_pair() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let (mut validator, barrier) = fixtures::validator(fixtures::directory(), &Default::default());
    let subject = Subject::unnamed("y");

    let scope = RequestScope::new();
    assert_pass!(validate_field!(validator, subject, LastName, "Doe", scope));
    assert_pass!(validate_field!(validator, subject, FirstName, "Anna", scope));
    assert!(barrier.registry().is_empty());

    // Second round must not see the "Doe" of the first one
    let scope = RequestScope::new();
    assert_pass!(validate_field!(validator, subject, LastName, "Smith", scope));
    assert_duplicate!(validate_field!(validator, subject, FirstName, "Anna", scope), FirstName);
    assert!(barrier.registry().is_empty());
}

#[tokio::test]
async fn integration_first_name_without_last_name_blocks() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let (validator, _) = fixtures::validator(fixtures::directory(), &Default::default());
    let subject = Subject::new("y", "Jon", "Doe");
    let scope = RequestScope::new();

    let mut validator_clone = validator.clone();
    let subject_clone = subject.clone();
    let scope_clone = scope.clone();
    let waiting = tokio::spawn(async move {
        validate_field!(validator_clone, subject_clone, FirstName, "John", scope_clone)
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!waiting.is_finished());

    // A late last name of the same round unblocks it
    let mut validator = validator;
    assert_pass!(validate_field!(validator, subject, LastName, "Poe", scope));
    assert_pass!(tokio::time::timeout(Duration::from_secs(1), waiting).await.unwrap().unwrap());
}

#[tokio::test]
async fn integration_first_name_without_last_name_times_out() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let config = ValidatorConfig::default().with_await_timeout_ms(20);
    let (validator, barrier) = fixtures::validator(fixtures::directory(), &config);

    // Last name unchanged, so the framework only validates the first name
    let start = Instant::now();
    let report = ProfileUpdate::new(Subject::new("y", "Jon", "Doe"))
        .first_name("John")
        .last_name("Doe")
        .skip_unchanged()
        .validate(validator)
        .await
        .unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(report.results.len(), 1);
    assert_eq!(
        report.result(NameField::FirstName),
        Some(&Err(ValidationError::WaitCancelled("y".into())))
    );
    assert!(!report.is_accepted());
    assert!(barrier.registry().is_empty());
}

#[tokio::test]
async fn integration_first_name_without_last_name_fallback() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let config = ValidatorConfig::default()
        .with_await_timeout_ms(20)
        .with_fallback(AwaitFallback::CurrentLastName);
    let (validator, _) = fixtures::validator(fixtures::directory(), &config);

    let report = ProfileUpdate::new(Subject::new("y", "Jon", "Doe"))
        .first_name("John")
        .last_name("Doe")
        .skip_unchanged()
        .validate(validator.clone())
        .await
        .unwrap();
    assert_duplicate!(report.result(NameField::FirstName).cloned().unwrap(), FirstName);

    let report = ProfileUpdate::new(Subject::new("y", "Jon", "Doe"))
        .first_name("Johan")
        .skip_unchanged()
        .validate(validator)
        .await
        .unwrap();
    assert!(report.is_accepted());
}

#[tokio::test]
async fn integration_last_name_of_earlier_update_not_reused() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let config = ValidatorConfig::default()
        .with_await_timeout_ms(50)
        .with_fallback(AwaitFallback::CurrentLastName);
    let (validator, barrier) = fixtures::validator(fixtures::directory(), &config);
    let stored = Subject::new("y", "Jon", "Doe");

    // First update only changes the last name, and is not committed afterwards
    let report = ProfileUpdate::new(stored.clone())
        .last_name("Poe")
        .validate(validator.clone())
        .await
        .unwrap();
    assert!(report.is_accepted());
    assert!(barrier.registry().is_empty());

    // Second update only changes the first name: checked against the stored "Doe"
    let report = ProfileUpdate::new(stored).first_name("John").validate(validator).await.unwrap();
    assert_duplicate!(report.result(NameField::FirstName).cloned().unwrap(), FirstName);
    assert!(barrier.registry().is_empty());
}

#[tokio::test]
async fn integration_cancelled_first_name_leaves_no_round() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let (validator, barrier) = fixtures::validator(fixtures::directory(), &Default::default());

    let mut validator_clone = validator.clone();
    let waiting = tokio::spawn(async move {
        validate_field!(validator_clone, Subject::unnamed("y"), FirstName, "John", RequestScope::new())
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(barrier.registry().len(), 1);

    waiting.abort();
    assert!(waiting.await.unwrap_err().is_cancelled());
    assert!(barrier.registry().is_empty());
}

#[tokio::test]
async fn integration_directory_failure_propagates() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let failure = ValidationError::DirectoryQueryFailure("connection refused".to_string());
    let (mut validator, barrier) =
        fixtures::validator(fixtures::directory().with_outage(failure.clone()), &Default::default());
    let subject = Subject::new("y", "Jon", "Doe");
    let scope = RequestScope::new();

    assert_eq!(validate_field!(validator, subject, LastName, "Roe", scope).unwrap_err(), failure);
    assert_eq!(validate_field!(validator, subject, FirstName, "John", scope).unwrap_err(), failure);
    // The round is released even though the check failed
    assert!(barrier.registry().is_empty());
}

#[tokio::test]
async fn integration_localized_message_from_subject_locale() {
    #[cfg(feature = "uniqname_tracing")]
    crate::uniqname_tracing::init();
    let config = ValidatorConfig::default().with_default_locale("fr");
    let (mut validator, _) = fixtures::validator(fixtures::directory(), &config);
    let scope = RequestScope::new();

    // Stored preference wins over the default locale
    let subject = Subject::unnamed("y").with_locale("de-CH");
    assert_pass!(validate_field!(validator, subject, LastName, "Roe", scope));
    let outcome = validate_field!(validator, subject, FirstName, "Jon", scope).unwrap();
    assert!(matches!(
        outcome,
        ValidationOutcome::DuplicateName { ref message, .. } if message.starts_with("Diese")
    ));

    // No stored preference, default locale used
    let scope = RequestScope::new();
    let subject = Subject::unnamed("t");
    assert_pass!(validate_field!(validator, subject, LastName, "Roe", scope));
    let outcome = validate_field!(validator, subject, FirstName, "Jon", scope).unwrap();
    assert!(matches!(
        outcome,
        ValidationOutcome::DuplicateName { ref message, .. } if message.starts_with("Cette")
    ));
}
