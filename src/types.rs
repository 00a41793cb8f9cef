use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

/// Secret text wrapper that avoids accidental logging.
///
/// Deserializes from a plain JSON string; `Debug` never prints the value.
#[derive(Clone)]
pub struct SecretValue {
    inner: SecretString,
}

impl SecretValue {
    /// Constructs a secret value from text.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::new(value.into()),
        }
    }

    /// Exposes the secret text to a closure.
    pub fn expose<F, R>(&self, function: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        function(self.inner.expose_secret())
    }

    /// Returns `true` when the secret is the empty string.
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }

    /// Returns a copy with surrounding whitespace removed.
    pub fn trimmed(&self) -> Self {
        Self::new(self.inner.expose_secret().trim())
    }

    /// Compares two secrets without handing either value to the caller.
    pub fn matches(&self, other: &SecretValue) -> bool {
        self.inner.expose_secret() == other.inner.expose_secret()
    }
}

impl Default for SecretValue {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue::new)
    }
}

/// How a mount request unlocks the encrypted folder.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Unlock with the folder password.
    #[default]
    Password,
    /// Unlock with the master key printed by `gocryptfs -init`.
    #[serde(rename = "masterkey")]
    MasterKey,
}

/// External tools the UI shells out to.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    /// `gocryptfs` itself.
    Gocryptfs,
    /// FUSE unmount helper.
    Fusermount,
    /// util-linux mount table query.
    Findmnt,
    /// GTK dialog helper for the folder picker.
    Zenity,
}

impl Tool {
    /// Default executable name for this tool.
    pub fn default_binary(self) -> &'static str {
        match self {
            Tool::Gocryptfs => "gocryptfs",
            Tool::Fusermount => "fusermount",
            Tool::Findmnt => "findmnt",
            Tool::Zenity => "zenity",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_binary())
    }
}

#[cfg(test)]
mod unit_tests {
    use super::{AuthMode, SecretValue};

    #[test]
    fn secret_value_debug_is_redacted() {
        let secret = SecretValue::new("hunter2");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn secret_value_deserializes_from_string_and_trims() {
        let secret: SecretValue = serde_json::from_str("\"  key-material \\n\"").unwrap();
        assert!(!secret.is_empty());
        assert!(secret.trimmed().matches(&SecretValue::new("key-material")));
    }

    #[test]
    fn auth_mode_uses_form_literals() {
        let mode: AuthMode = serde_json::from_str("\"masterkey\"").unwrap();
        assert_eq!(mode, AuthMode::MasterKey);
        let mode: AuthMode = serde_json::from_str("\"password\"").unwrap();
        assert_eq!(mode, AuthMode::Password);
        assert!(serde_json::from_str::<AuthMode>("\"token\"").is_err());
    }
}
