use std::fmt;

use aws_smithy_types::{DateTime, date_time::Format};

pub mod profile;
pub mod roles;
pub mod sts;

/// AWS temporary credentials structure
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime>,
}

impl Credentials {
    /// Expiration formatted as RFC 3339, or "unknown"
    pub fn expiration_display(&self) -> String {
        self.expiration
            .and_then(|dt| dt.fmt(Format::DateTime).ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field("session_token", &"** redacted **")
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl From<&aws_sdk_sts::types::Credentials> for Credentials {
    fn from(creds: &aws_sdk_sts::types::Credentials) -> Self {
        Self {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            session_token: creds.session_token().to_string(),
            expiration: Some(*creds.expiration()),
        }
    }
}

impl From<aws_credential_types::Credentials> for Credentials {
    fn from(creds: aws_credential_types::Credentials) -> Self {
        Self {
            access_key_id: creds.access_key_id().to_string(),
            secret_access_key: creds.secret_access_key().to_string(),
            // Long-term keys carry no session token
            session_token: creds.session_token().unwrap_or_default().to_string(),
            expiration: creds.expiry().map(DateTime::from),
        }
    }
}
