use serde::{Deserialize, Serialize};
use std::fmt;

/// A Jenkins password or API token.
///
/// Never printed: `Debug` renders a placeholder so configuration can be
/// logged as-is.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("\"********\"")
    }
}

/// Basic-auth credentials for the Jenkins API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: Password,
}

impl Credentials {
    /// Returns `None` when no user is configured (anonymous access).
    pub fn from_parts(user: &str, password: &Password) -> Option<Self> {
        if user.is_empty() {
            return None;
        }
        Some(Self {
            user: user.to_owned(),
            password: password.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_is_redacted_in_debug() {
        let password = Password::from("hunter2");
        assert_eq!(format!("{password:?}"), "\"********\"");
        assert_eq!(password.as_str(), "hunter2");
    }

    #[test]
    fn test_credentials_require_user() {
        assert!(Credentials::from_parts("", &Password::from("secret")).is_none());

        let creds = Credentials::from_parts("admin", &Password::from("secret")).unwrap();
        assert_eq!(creds.user, "admin");
        assert_eq!(creds.password.as_str(), "secret");
    }
}
