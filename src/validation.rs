//! Validation for values placed into protocol lines.
//!
//! The coordinator splits each line on whitespace and each token on the first `=`,
//! so field values must be single ASCII words without `=`.

use anyhow::{bail, Result};

/// Maximum allowed length for a single field value.
pub const MAX_TOKEN_LENGTH: usize = 1024;

/// Validates that a value can be sent as one `KEY=VALUE` token.
///
/// A token is valid if:
/// - It is not empty
/// - It is no longer than MAX_TOKEN_LENGTH bytes
/// - It is printable ASCII with no whitespace and no `=`
///
/// # Examples
///
/// ```
/// use freight_link::validation::validate_token;
///
/// assert!(validate_token("/data/home").is_ok());
/// assert!(validate_token("two words").is_err());
/// assert!(validate_token("a=b").is_err());
/// ```
pub fn validate_token(value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("Value cannot be empty");
    }

    if value.len() > MAX_TOKEN_LENGTH {
        bail!(
            "Value too long: {} bytes (max {})",
            value.len(),
            MAX_TOKEN_LENGTH
        );
    }

    if let Some(c) = value.chars().find(|c| !c.is_ascii_graphic()) {
        bail!("Value '{value}' contains {c:?}; use printable ASCII without spaces");
    }

    if value.contains('=') {
        bail!("Value '{value}' contains '=', which the line protocol reserves");
    }

    Ok(())
}

/// Clap value parser for protocol field values.
///
/// ```ignore
/// #[arg(long, value_parser = clap_token_validator)]
/// dir: String,
/// ```
pub fn clap_token_validator(s: &str) -> Result<String, String> {
    validate_token(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}

/// Validates a raw protocol line passed through verbatim.
///
/// The transport terminates each line with `\n`, so a line must be non-empty and
/// free of control characters. An embedded newline would start another protocol line.
///
/// # Examples
///
/// ```
/// use freight_link::validation::validate_line;
///
/// assert!(validate_line("PING from=ops").is_ok());
/// assert!(validate_line("PING\nSTOP tool=scan dir=/a status=ok").is_err());
/// ```
pub fn validate_line(value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("Line cannot be empty");
    }

    if value.len() > MAX_TOKEN_LENGTH {
        bail!(
            "Line too long: {} bytes (max {})",
            value.len(),
            MAX_TOKEN_LENGTH
        );
    }

    if let Some(c) = value.chars().find(|c| c.is_control()) {
        bail!("Line contains control character {c:?}");
    }

    Ok(())
}

/// Clap value parser for raw protocol lines.
pub fn clap_line_validator(s: &str) -> Result<String, String> {
    validate_line(s).map_err(|e| e.to_string())?;
    Ok(s.to_string())
}
