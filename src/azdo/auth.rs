//! Azure DevOps Authentication
//!
//! Personal access tokens (PATs) are sent as HTTP basic auth with an empty
//! user name.

use anyhow::Result;
use std::fmt;

/// Environment variable holding the personal access token
pub const TOKEN_ENV_VAR: &str = "AZDO_PERSONAL_ACCESS_TOKEN";

/// Personal access token credentials
#[derive(Clone)]
pub struct AzdoCredentials {
    token: String,
}

impl AzdoCredentials {
    /// Create credentials from a personal access token
    pub fn new(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(anyhow::anyhow!("Personal access token is empty"));
        }
        Ok(Self {
            token: token.to_string(),
        })
    }

    /// User name half of the basic auth pair
    pub fn username(&self) -> &str {
        ""
    }

    /// Password half of the basic auth pair
    pub fn password(&self) -> &str {
        &self.token
    }
}

// Security: never print the token, not even in debug output
impl fmt::Debug for AzdoCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzdoCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}
