use thiserror::Error;

/// A required environment variable is unset or blank.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads a required environment variable.
///
/// Surrounding whitespace is trimmed; a variable that is set but blank counts as
/// missing, the same as [`get_env_opt`].
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    get_env_opt(name).ok_or_else(|| MissingEnvVarError(name.to_string()))
}

/// Reads an optional environment variable. Unset and blank values both yield `None`.
pub fn get_env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_names_itself() {
        let err = get_env_var("SHARED_UTILS_TEST_NEVER_SET").unwrap_err();
        assert_eq!(err.0, "SHARED_UTILS_TEST_NEVER_SET");
        assert!(err.to_string().contains("SHARED_UTILS_TEST_NEVER_SET"));
    }

    #[test]
    fn unset_optional_is_none() {
        assert!(get_env_opt("SHARED_UTILS_TEST_NEVER_SET").is_none());
    }
}
