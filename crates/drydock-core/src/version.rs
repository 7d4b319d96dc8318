//! Server-version compatibility checks.
//!
//! Each driver variant declares a minimum embedded-server version; the
//! lifecycle refuses to start against an older library rather than fail
//! obscurely halfway through a deployment.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors from version parsing and compatibility checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The version string has no leading numeric component.
    #[error("unparseable server version: {raw}")]
    Unparseable {
        /// The string that failed to parse.
        raw: String,
    },

    /// The detected server version is below the declared minimum.
    #[error("incompatible server version: [actual:{actual}], [minimum:{minimum}]")]
    Incompatible {
        /// The detected version.
        actual: String,
        /// The required minimum.
        minimum: String,
    },
}

/// A dotted server version such as `9.4.53` or `12.0.16.v20240101`.
///
/// Comparison is numeric per dot-separated component with missing
/// components treated as zero; a component without a leading digit (a
/// vendor qualifier like `v20240101`) ends the comparable part.
///
/// # Example
///
/// ```rust
/// use drydock_core::ServerVersion;
///
/// let a: ServerVersion = "9.4.53".parse().unwrap();
/// let b: ServerVersion = "9.4".parse().unwrap();
/// assert!(a > b);
/// ```
#[derive(Debug, Clone)]
pub struct ServerVersion {
    parts: Vec<u64>,
    raw: String,
}

impl PartialEq for ServerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ServerVersion {}

impl ServerVersion {
    /// Builds a version directly from numeric components.
    ///
    /// # Panics
    ///
    /// Panics when `parts` is empty; a version needs at least a major
    /// component.
    #[must_use]
    pub fn new(parts: &[u64]) -> Self {
        assert!(!parts.is_empty(), "a version needs at least one component");
        let raw = parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self {
            parts: parts.to_vec(),
            raw,
        }
    }

    /// The numeric components of the version.
    #[must_use]
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// Checks that `self` is at least `minimum`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::Incompatible`] naming both versions when
    /// `self` is below `minimum`.
    pub fn assert_minimum(&self, minimum: &ServerVersion) -> Result<(), VersionError> {
        if self >= minimum {
            Ok(())
        } else {
            Err(VersionError::Incompatible {
                actual: self.raw.clone(),
                minimum: minimum.raw.clone(),
            })
        }
    }
}

impl FromStr for ServerVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::new();
        for component in s.split('.') {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                // Vendor qualifier reached; everything after is ignored.
                break;
            }
            let value = digits.parse::<u64>().map_err(|_| VersionError::Unparseable {
                raw: s.to_string(),
            })?;
            parts.push(value);
            if digits.len() != component.len() {
                break;
            }
        }

        if parts.is_empty() {
            return Err(VersionError::Unparseable { raw: s.to_string() });
        }

        Ok(Self {
            parts,
            raw: s.to_string(),
        })
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ServerVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_simple() {
        assert_eq!(v("9.4.53").parts(), &[9, 4, 53]);
    }

    #[test]
    fn test_parse_vendor_qualifier() {
        assert_eq!(v("12.0.16.v20240101").parts(), &[12, 0, 16]);
    }

    #[test]
    fn test_parse_inline_qualifier() {
        // A qualifier glued to a numeric component ends the parse there.
        assert_eq!(v("9.4rc1.2").parts(), &[9, 4]);
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert!(matches!(
            "snapshot".parse::<ServerVersion>(),
            Err(VersionError::Unparseable { .. })
        ));
    }

    #[test]
    fn test_ordering() {
        assert!(v("10.0") > v("9.4.53"));
        assert!(v("9.4.53") > v("9.4"));
        assert!(v("9.4") == v("9.4.0"));
        assert!(v("7.6.21") < v("9.0"));
    }

    #[test]
    fn test_assert_minimum_ok() {
        assert!(v("11.0.24").assert_minimum(&v("11.0")).is_ok());
        assert!(v("11.0").assert_minimum(&v("11.0")).is_ok());
    }

    #[test]
    fn test_assert_minimum_fails_below() {
        let err = v("8.1.22").assert_minimum(&v("9.0")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("8.1.22"));
        assert!(msg.contains("9.0"));
    }
}
