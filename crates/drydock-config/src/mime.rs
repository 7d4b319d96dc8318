//! Mime-type override parsing.

use std::collections::HashMap;

use crate::ConfigError;

/// Parses a space-separated mime override spec into an extension-to-type
/// map.
///
/// The format is `extension type extension type ...`, e.g.
/// `js application/javascript txt text/plain`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidMimeTypeSpec`] on an odd token count.
///
/// # Example
///
/// ```rust
/// use drydock_config::parse_mime_types;
///
/// let map = parse_mime_types("js application/javascript").unwrap();
/// assert_eq!(map["js"], "application/javascript");
/// ```
pub fn parse_mime_types(spec: &str) -> Result<HashMap<String, String>, ConfigError> {
    let tokens: Vec<&str> = spec.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(ConfigError::InvalidMimeTypeSpec {
            spec: spec.to_string(),
        });
    }

    Ok(tokens
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect())
}
