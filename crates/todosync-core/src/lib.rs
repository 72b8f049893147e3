//! Client library for the todosync to-do service.
//!
//! # Overview
//! Implements the client side of the service's session and
//! data-synchronization contract:
//!
//! - [`auth::CredentialStore`] persists the single bearer token.
//! - [`api::ApiClient`] talks to the REST API, taking the token per call.
//! - [`auth::SessionController`] handles login, registration, logout and the
//!   profile lookup. Signed-in state is derived from the store on demand.
//! - [`sync::CollectionSync`] owns the local copy of the to-do list and
//!   re-fetches it after every add or remove instead of patching it.
//! - [`sync::ViewScope`] drops results that arrive after their consumer is gone.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod sync;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, SessionController, SessionState, TokenBackend};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{TodoItem, UserProfile};
pub use sync::{CollectionSync, ViewScope};
