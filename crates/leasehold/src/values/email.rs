use std::fmt;

use regex::Regex;
use serde::Serialize;

use super::DomainError;

const DEFAULT_EMAIL_PATTERN: &str = r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$";

/// Compiled e-mail shape check, built once and handed to whoever validates addresses.
#[derive(Debug, Clone)]
pub struct EmailPolicy {
    pattern: Regex,
}

impl EmailPolicy {
    /// Build a policy from a custom pattern. Input is lower-cased before matching.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn accepts(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_EMAIL_PATTERN).expect("default email pattern compiles"),
        }
    }
}

/// Lower-cased, shape-checked e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(value: &str, policy: &EmailPolicy) -> Result<Self, DomainError> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(DomainError::validation("email", "must not be empty"));
        }
        if !policy.accepts(&normalized) {
            return Err(DomainError::validation(
                "email",
                format!("'{}' is not a valid address", value.trim()),
            ));
        }
        Ok(Self(normalized))
    }

    /// Parse with the default policy.
    pub fn create(value: &str) -> Result<Self, DomainError> {
        Self::parse(value, &EmailPolicy::default())
    }

    pub fn value(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map(|(_, domain)| domain).unwrap_or_default()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
