use std::sync::Arc;

use todosync_core::auth::{CredentialStore, FileCredentialStore};
use todosync_core::{ApiClient, CollectionSync, SessionController};

pub struct Harness {
    pub store: Arc<dyn CredentialStore>,
    pub session: SessionController,
    pub todos: CollectionSync,
    // Keeps the token directory alive for the test's duration.
    _dir: tempfile::TempDir,
}

/// Start a fresh mock server and wire both controllers to it through a
/// file-backed credential store.
pub async fn harness() -> Harness {
    let addr = todosync_mock_server::spawn().await.expect("spawn mock server");
    let api = ApiClient::new(&format!("http://{addr}")).expect("client");

    let dir = tempfile::tempdir().expect("tempdir");
    let store: Arc<dyn CredentialStore> = Arc::new(FileCredentialStore::in_dir(dir.path()));

    Harness {
        session: SessionController::new(api.clone(), Arc::clone(&store)),
        todos: CollectionSync::new(api, Arc::clone(&store)),
        store,
        _dir: dir,
    }
}

impl Harness {
    pub async fn sign_up_and_in(&self, username: &str) {
        self.session
            .register(username, &format!("{username}@example.com"), "secret")
            .await
            .expect("register");
        self.session.login(username, "secret").await.expect("login");
    }
}
