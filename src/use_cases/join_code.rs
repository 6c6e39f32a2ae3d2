// Join code validation for lobby creation and lookup.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("join code must look like ABC-123, got `{0}`")]
    MalformedJoinCode(String),
}

/// Trims and upper-cases `raw`, then requires three ASCII letters, a dash and three digits.
pub fn normalize_join_code(raw: &str) -> Result<String, ValidationError> {
    let code = raw.trim().to_ascii_uppercase();
    let bytes = code.as_bytes();

    let well_formed = bytes.len() == 7
        && bytes[..3].iter().all(u8::is_ascii_uppercase)
        && bytes[3] == b'-'
        && bytes[4..].iter().all(u8::is_ascii_digit);

    if well_formed {
        Ok(code)
    } else {
        Err(ValidationError::MalformedJoinCode(raw.to_string()))
    }
}
