//! Validator configuration.

/// Default locale used when the subject has no stored preference.
pub const DEFAULT_LOCALE: &str = "en";

/// What the first-name validation does when its wait for the last name is cancelled.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum AwaitFallback {
    /// Abort the validation with `WaitCancelled`; the caller treats it as indeterminate.
    #[default]
    Fail,
    /// Proceed with the subject's current stored last name.
    CurrentLastName,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ValidatorConfig {
    /// Bound on the wait for the last name, in milliseconds. Disabled if set to 0.
    pub await_timeout_ms: u64,
    pub fallback: AwaitFallback,
    pub default_locale: String,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            await_timeout_ms: 0,
            fallback: AwaitFallback::default(),
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl ValidatorConfig {
    pub fn with_await_timeout_ms(self, await_timeout_ms: u64) -> Self {
        Self { await_timeout_ms, ..self }
    }

    pub fn with_fallback(self, fallback: AwaitFallback) -> Self {
        Self { fallback, ..self }
    }

    pub fn with_default_locale(self, default_locale: &str) -> Self {
        Self { default_locale: default_locale.to_string(), ..self }
    }
}
