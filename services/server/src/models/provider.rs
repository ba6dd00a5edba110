//! Identity providers a user can authenticate with

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Email and password stored in the user table
    Local,
    Google,
    GitHub,
}

impl Provider {
    /// Get the provider name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Google => "google",
            Provider::GitHub => "github",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
