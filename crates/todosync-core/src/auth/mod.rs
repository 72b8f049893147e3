//! Authentication module for managing the session token.
//!
//! This module provides:
//! - `CredentialStore`: durable storage for the single session token, with
//!   keychain, file and in-memory backends
//! - `SessionController`: login, registration, logout and profile lookup
//!
//! Whether the user is signed in is always derived from the store; nothing
//! else caches it.

pub mod credentials;
pub mod session;

pub use credentials::{
    open_store, CredentialError, CredentialStore, FileCredentialStore, KeyringCredentialStore,
    MemoryCredentialStore, TokenBackend,
};
pub use session::{SessionController, SessionState};
