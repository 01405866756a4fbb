//! Validation helpers for DTOs.

use validator::ValidationError;

/// Maximum accepted identity length.
const MAX_IDENTITY_LENGTH: usize = 32;

/// Validates that a session identity is 1 to 32 characters of letters,
/// digits, `_`, `-` or `.` with no surrounding whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_identity("alice")     // Ok
/// validate_identity("team-42")   // Ok
/// validate_identity("")          // Err - empty
/// validate_identity("two words") // Err - whitespace
/// ```
pub fn validate_identity(identity: &str) -> Result<(), ValidationError> {
    if identity.is_empty() || identity.len() > MAX_IDENTITY_LENGTH {
        let mut err = ValidationError::new("identity_length");
        err.message = Some(
            format!(
                "identity must be 1 to {} characters (got {})",
                MAX_IDENTITY_LENGTH,
                identity.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !identity
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        let mut err = ValidationError::new("identity_format");
        err.message =
            Some("identity may only contain letters, digits, `_`, `-` and `.`".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identity_valid() {
        assert!(validate_identity("alice").is_ok());
        assert!(validate_identity("team-42").is_ok());
        assert!(validate_identity("Bob_2.0").is_ok());
        assert!(validate_identity("x").is_ok());
    }

    #[test]
    fn test_validate_identity_invalid_length() {
        assert!(validate_identity("").is_err());
        assert!(validate_identity(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_identity_invalid_format() {
        assert!(validate_identity("two words").is_err()); // whitespace
        assert!(validate_identity(" alice").is_err()); // leading space
        assert!(validate_identity("buzz!").is_err()); // punctuation
        assert!(validate_identity("émile").is_err()); // non-ascii
    }
}
