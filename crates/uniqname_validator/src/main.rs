use std::process::ExitCode;

use clap::Parser;
use uniqname_core::{
    backends::{catalog::default_catalog, memory::InMemoryDirectory},
    validation::{
        api::ValidationOutcome,
        framework::ProfileUpdate,
        infrastructure::{
            config::{AwaitFallback, DEFAULT_LOCALE, ValidatorConfig},
            subject::Subject,
        },
        init_validator,
    },
};

#[derive(Parser, Debug)]
#[command(name = "uniqname_validator")]
#[command(about = "Replays a profile name update against an in-memory directory")]
struct UniqnameValidatorArgs {
    /// Stored subject, as ID:FIRST:LAST[:LOCALE] (repeatable)
    #[arg(short, long = "subject", value_parser = parse_subject)]
    subjects: Vec<Subject>,

    /// Submitted update, as ID:FIRST:LAST
    #[arg(short, long, value_parser = parse_subject)]
    update: Subject,

    /// Bound on the wait for the last name in milliseconds, 0 waits forever
    #[arg(short, long, default_value_t = 0)]
    await_timeout_ms: u64,

    /// Fall back to the stored last name when the wait is cancelled
    #[arg(long, default_value_t = false)]
    fallback_current_last_name: bool,

    /// Locale used for subjects without a stored preference
    #[arg(long, default_value = DEFAULT_LOCALE)]
    default_locale: String,

    /// Only validate attributes whose value changed
    #[arg(long, default_value_t = false)]
    skip_unchanged: bool,
}

fn parse_subject(raw: &str) -> Result<Subject, String> {
    match raw.split(':').collect::<Vec<_>>().as_slice() {
        [id, first_name, last_name] => Ok(Subject::new(*id, first_name, last_name)),
        [id, first_name, last_name, locale] => {
            Ok(Subject::new(*id, first_name, last_name).with_locale(locale))
        }
        _ => Err(format!("expected ID:FIRST:LAST[:LOCALE], got {raw}")),
    }
}

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    #[cfg(feature = "uniqname_tracing")]
    uniqname_core::uniqname_tracing::init();

    let args = UniqnameValidatorArgs::parse();

    let config = ValidatorConfig::default()
        .with_await_timeout_ms(args.await_timeout_ms)
        .with_fallback(if args.fallback_current_last_name {
            AwaitFallback::CurrentLastName
        } else {
            AwaitFallback::Fail
        })
        .with_default_locale(&args.default_locale);

    let directory = InMemoryDirectory::from_subjects(args.subjects);
    let validator = init_validator(directory.clone(), default_catalog(), &config);

    let id = args.update.id.clone();
    let current = directory.get(&id).unwrap_or_else(|| Subject::unnamed(id));
    let mut update = ProfileUpdate::new(current);
    if let Some(first_name) = &args.update.first_name {
        update = update.first_name(first_name);
    }
    if let Some(last_name) = &args.update.last_name {
        update = update.last_name(last_name);
    }
    if args.skip_unchanged {
        update = update.skip_unchanged();
    }

    let report = update.validate(validator).await?;
    for field in &report.results {
        match &field.result {
            Ok(ValidationOutcome::Pass) => println!("{}: pass", field.field),
            Ok(ValidationOutcome::DuplicateName { message, .. }) => {
                println!("{}: duplicate: {}", field.field, message)
            }
            Err(error) => println!("{}: error: {}", field.field, error),
        }
    }

    Ok(if report.is_accepted() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
