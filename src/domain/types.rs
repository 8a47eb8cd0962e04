//! Type-safe wrappers using new-type pattern
//!
//! Inputs that must never be logged or confused with each other get their
//! own types.

use std::fmt;
use std::str::FromStr;

use crate::infra::error::SigningError;

/// Passphrase protecting a PKCS#12 container.
///
/// Any string is accepted, including the empty one.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Passphrase(String);

impl Passphrase {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Passphrase(passphrase.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Passphrase {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Passphrase {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// Never print the secret, not even in debug output
impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Passphrase([REDACTED])")
    }
}

impl fmt::Display for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[PASSPHRASE REDACTED]")
    }
}

/// Friendly name selecting an entry inside a PKCS#12 container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alias(String);

impl Alias {
    /// Returns `None` for an empty alias, which means "no alias requested".
    pub fn new(alias: impl Into<String>) -> Option<Self> {
        let alias = alias.into();
        if alias.is_empty() {
            None
        } else {
            Some(Alias(alias))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Alias {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| SigningError::InvalidInput("Alias must not be empty".into()))
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
