//! Configuration validation

use super::error::ConfigResult;

/// Trait for validatable configuration objects
///
/// # Example
/// ```rust,ignore
/// fn build<C: Validatable>(config: C) -> Result<Analyzer, ConfigError> {
///     config.validate()?;
///     // ...
/// }
/// ```
pub trait Validatable {
    /// Validate the configuration
    ///
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}

/// Check `value` against an inclusive range
pub(crate) fn check_range<T>(field: &str, value: T, min: T, max: T, hint: &str) -> ConfigResult<()>
where
    T: PartialOrd + ToString,
{
    if value < min || value > max {
        return Err(super::error::ConfigError::range_with_hint(
            field, value, min, max, hint,
        ));
    }
    Ok(())
}
