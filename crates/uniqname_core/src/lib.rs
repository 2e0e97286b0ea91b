//! Cross-field uniqueness validation for first name / last name pairs.
//!
//! Identity systems typically validate a profile one attribute at a time: each changed
//! field triggers its own validation call, scheduled concurrently and in no particular
//! order. This crate enforces a uniqueness constraint spanning two of those fields by
//! letting the first-name validation rendezvous with the last-name validation of the same
//! subject, then checking the combined pair against the directory.
//!
//! Every component is a [`tower::Service`], so the stack can be layered (timeouts,
//! buffering) the same way as any other tower service. The directory and the message
//! catalog are external collaborators; in-memory implementations are provided in
//! [`backends`].

#[cfg(test)]
mod tests;

pub mod backends;
pub mod validation;

#[cfg(feature = "uniqname_tracing")]
pub mod uniqname_tracing {
    use std::sync::Once;
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: Once = Once::new();

    /// Initialize tracing.
    ///
    /// Reads the filter from `RUST_LOG` and stays silent otherwise. Safe to call from every
    /// test, only the first call installs the subscriber.
    pub fn init() {
        INIT.call_once(|| {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));

            let _ = fmt()
                .with_target(false)
                .with_test_writer()
                .with_env_filter(filter)
                .try_init();
        });
    }
}
