//! Account and authentication payloads.

use serde::{Deserialize, Serialize};

/// Public details of the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    pub username: String,
    pub email: String,
}

impl UserProfile {
    /// Single uppercase letter used as an avatar placeholder.
    pub fn initial(&self) -> Option<char> {
        self.username.chars().next().map(|c| c.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// `data` payload of a successful login.
#[derive(Deserialize)]
pub struct AuthToken {
    pub token: String,
}

// Never print the token itself.
impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken").field("token", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_initial() {
        let profile = UserProfile {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
        };
        assert_eq!(profile.initial(), Some('A'));

        let empty = UserProfile {
            username: String::new(),
            email: String::new(),
        };
        assert_eq!(empty.initial(), None);
    }

    #[test]
    fn test_auth_token_debug_is_redacted() {
        let token = AuthToken {
            token: "secret-jwt".to_string(),
        };
        let shown = format!("{:?}", token);
        assert!(!shown.contains("secret-jwt"));
    }
}
