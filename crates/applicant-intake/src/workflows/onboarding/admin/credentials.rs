use sha2::{Digest, Sha256};

use crate::config::AdminConfig;

use super::guard::AdminIdentity;

/// Decides whether a username/password pair identifies an administrator.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> Option<AdminIdentity>;
}

/// Single administrator account taken from configuration.
#[derive(Clone)]
pub struct StaticCredentials {
    username: String,
    password_digest: [u8; 32],
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: &str) -> Self {
        Self {
            username: username.into(),
            password_digest: digest(password),
        }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.username.clone(), &config.password)
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> Option<AdminIdentity> {
        let password_matches = digest(password) == self.password_digest;
        if username == self.username && password_matches {
            Some(AdminIdentity {
                username: self.username.clone(),
            })
        } else {
            None
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
