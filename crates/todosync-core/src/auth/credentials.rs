use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use keyring::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Keychain service name
const SERVICE_NAME: &str = "todosync";

/// Fixed key the session token is stored under, in every backend
pub const TOKEN_KEY: &str = "token";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Token file error: {0}")]
    Io(#[from] io::Error),
}

/// Durable home for the single session token.
///
/// Every operation is idempotent: saving the same token twice, reading an
/// absent token, and clearing an already-cleared store all succeed.
pub trait CredentialStore: Send + Sync {
    /// Persist `token`, replacing any previous one
    fn save(&self, token: &str) -> Result<(), CredentialError>;

    /// The persisted token, or `None` if never set or cleared
    fn read(&self) -> Result<Option<String>, CredentialError>;

    /// Remove the persisted token
    fn clear(&self) -> Result<(), CredentialError>;

    /// Check if a token is present
    fn has_token(&self) -> Result<bool, CredentialError> {
        Ok(self.read()?.is_some())
    }
}

/// Which backend holds the token.
///
/// On Linux the keychain is the kernel session keyring, which is emptied on
/// logout or reboot, so the plain file is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenBackend {
    Keyring,
    #[default]
    File,
}

/// Open the configured backend. `data_dir` is only used by the file backend.
pub fn open_store(backend: TokenBackend, data_dir: &Path) -> Arc<dyn CredentialStore> {
    match backend {
        TokenBackend::Keyring => Arc::new(KeyringCredentialStore::new(SERVICE_NAME)),
        TokenBackend::File => Arc::new(FileCredentialStore::in_dir(data_dir)),
    }
}

// ============================================================================
// OS keychain
// ============================================================================

#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl KeyringCredentialStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry, CredentialError> {
        Ok(Entry::new(&self.service, TOKEN_KEY)?)
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn save(&self, token: &str) -> Result<(), CredentialError> {
        self.entry()?.set_password(token)?;
        debug!(service = %self.service, "Token stored in keychain");
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, CredentialError> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Plain-text file
// ============================================================================

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the token as `<dir>/token`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(TOKEN_KEY))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = ?self.path, "Token written");
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, CredentialError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = strip_line_ending(&contents);
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), CredentialError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Drop the single newline an editor appends; the token itself is opaque.
fn strip_line_ending(contents: &str) -> &str {
    contents
        .strip_suffix('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .unwrap_or(contents)
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store for tests and embedders that manage persistence.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str) -> Result<(), CredentialError> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    fn read(&self) -> Result<Option<String>, CredentialError> {
        Ok(self.slot().clone())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(&dir.path().join("nested"));

        assert_eq!(store.read().unwrap(), None);

        store.save("tok-123").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("tok-123"));
        assert!(store.has_token().unwrap());

        store.save("tok-456").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("tok-456"));

        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileCredentialStore::in_dir(dir.path()).save("persisted").unwrap();

        let reopened = FileCredentialStore::in_dir(dir.path());
        assert_eq!(reopened.read().unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_file_store_empty_file_reads_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());
        std::fs::write(store.path(), "\n").unwrap();
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_file_store_returns_token_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());

        store.save(" tok ").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some(" tok "));

        store.save("a\tb\n\n").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("a\tb\n"));
    }

    #[test]
    fn test_file_store_tolerates_hand_edited_newline() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());

        std::fs::write(store.path(), "tok-789\n").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("tok-789"));

        std::fs::write(store.path(), "tok-789\r\n").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("tok-789"));
    }

    #[test]
    fn test_keyring_store_roundtrip() {
        let store = KeyringCredentialStore::new(format!("todosync-test-{}", std::process::id()));
        match store.save("tok-1") {
            Ok(()) => {}
            // No reachable keychain (headless session, sandboxed container).
            Err(CredentialError::Keyring(
                keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_),
            )) => return,
            Err(e) => panic!("keychain save failed: {e}"),
        }

        assert_eq!(store.read().unwrap().as_deref(), Some("tok-1"));

        // A fresh handle on the same service sees the stored token.
        let reopened = KeyringCredentialStore::new(store.service.clone());
        assert_eq!(reopened.read().unwrap().as_deref(), Some("tok-1"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(reopened.read().unwrap(), None);
    }

    #[test]
    fn test_file_store_surfaces_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // The token path is an existing directory, so writing must fail.
        let store = FileCredentialStore::new(dir.path());
        assert!(matches!(store.save("t"), Err(CredentialError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::in_dir(dir.path());
        store.save("t").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert!(!store.has_token().unwrap());
        store.save("a").unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some("a"));
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.read().unwrap(), None);

        let preloaded = MemoryCredentialStore::with_token("b");
        assert_eq!(preloaded.read().unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_token_backend_serde() {
        assert_eq!(serde_json::to_string(&TokenBackend::File).unwrap(), "\"file\"");
        let backend: TokenBackend = serde_json::from_str("\"keyring\"").unwrap();
        assert_eq!(backend, TokenBackend::Keyring);
    }
}
