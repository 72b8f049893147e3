//! Session lifecycle: login, registration, logout and profile lookup.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::api::client::{LOGIN_PATH, PROFILE_PATH, REGISTER_PATH};
use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::models::{AuthToken, LoginRequest, RegisterRequest, UserProfile};

use super::CredentialStore;

/// Derived from the credential store on every query; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

pub struct SessionController {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
}

impl SessionController {
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        Self { api, store }
    }

    pub fn state(&self) -> Result<SessionState> {
        Ok(if self.store.has_token()? {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        })
    }

    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.state()? == SessionState::Authenticated)
    }

    /// Exchange credentials for a token and persist it.
    ///
    /// On rejection the server's message comes back verbatim in
    /// [`crate::api::ApiError::Status`] and the store is left as it was.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::Validation("Username and password required".to_string()));
        }

        let auth: AuthToken = self
            .api
            .post(LOGIN_PATH, &LoginRequest { username, password }, None)
            .await
            .map_err(|e| {
                error!(error = %e, "Login failed");
                Error::from(e)
            })?;

        self.store.save(&auth.token)?;
        info!(username, "Login successful");
        Ok(())
    }

    /// Create an account. The caller moves on to [`login`](Self::login)
    /// afterwards; registration does not sign the user in.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<()> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "Username, email and password are required".to_string(),
            ));
        }

        self.api
            .request_unit(
                reqwest::Method::POST,
                REGISTER_PATH,
                Some(&RegisterRequest {
                    username,
                    email,
                    password,
                }),
                None,
            )
            .await?;

        info!(username, "Registration successful");
        Ok(())
    }

    /// Forget the stored token. Local only; the server is not contacted.
    pub fn logout(&self) -> Result<()> {
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        let token = bearer_token(self.store.as_ref())?;
        self.api
            .get(PROFILE_PATH, Some(token.as_str()))
            .await
            .map_err(|e| expire_rejected_token(self.store.as_ref(), e.into()))
    }
}

/// Token for an authenticated call, or `NotAuthenticated` without touching the network.
pub(crate) fn bearer_token(store: &dyn CredentialStore) -> Result<String> {
    store.read()?.ok_or(Error::NotAuthenticated)
}

/// Drop a token the server has refused so the session reads as signed out.
/// The original error is handed back unchanged.
pub(crate) fn expire_rejected_token(store: &dyn CredentialStore, err: Error) -> Error {
    if err.is_unauthorized() {
        warn!("Stored token rejected by server, clearing session");
        if let Err(e) = store.clear() {
            warn!(error = %e, "Failed to clear rejected token");
        }
    }
    err
}
