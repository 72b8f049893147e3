use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::api::client::{todo_path, TODOS_PATH};
use crate::api::ApiClient;
use crate::auth::session::{bearer_token, expire_rejected_token};
use crate::auth::CredentialStore;
use crate::error::{Error, Result};
use crate::models::{NewTodo, TodoItem};

/// Validation notice for a to-do with a blank title or description.
pub const EMPTY_FIELDS_MESSAGE: &str = "Both title and description are required.";

/// Owner of the single in-memory copy of the user's to-do list.
///
/// The copy is only ever replaced by a successful `list()`; mutations go to
/// the server first and are followed by a re-fetch, so server-assigned
/// fields (id, createdAt) are never guessed locally. Once the store holds no
/// token the copy is emptied, so a previous account's list never outlives
/// its session.
pub struct CollectionSync {
    api: ApiClient,
    store: Arc<dyn CredentialStore>,
    items: watch::Sender<Vec<TodoItem>>,
    // Serializes mutation + refresh pairs so they never interleave.
    op_lock: Mutex<()>,
}

impl CollectionSync {
    pub fn new(api: ApiClient, store: Arc<dyn CredentialStore>) -> Self {
        let (items, _) = watch::channel(Vec::new());
        Self {
            api,
            store,
            items,
            op_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the collection as of the last successful fetch
    pub fn items(&self) -> Vec<TodoItem> {
        self.items.borrow().clone()
    }

    /// Receiver that observes every wholesale replacement of the collection
    pub fn subscribe(&self) -> watch::Receiver<Vec<TodoItem>> {
        self.items.subscribe()
    }

    /// Fetch the full collection and replace the local copy with it.
    pub async fn list(&self) -> Result<Vec<TodoItem>> {
        let _guard = self.op_lock.lock().await;
        self.refresh().await
    }

    /// Create a to-do, then re-fetch the collection.
    ///
    /// Blank fields are rejected before any request is made. An error from the
    /// re-fetch does not mean the to-do was not created: the server may
    /// already hold it, and calling `add` again creates a second one. Call
    /// `list` to see what the server has.
    pub async fn add(&self, title: &str, description: &str) -> Result<Vec<TodoItem>> {
        let todo = NewTodo::new(title, description);
        if !todo.is_complete() {
            return Err(Error::Validation(EMPTY_FIELDS_MESSAGE.to_string()));
        }

        let _guard = self.op_lock.lock().await;
        let token = self.token()?;
        let created: TodoItem = self
            .api
            .post(TODOS_PATH, &todo, Some(token.as_str()))
            .await
            .map_err(|e| self.reject(e.into()))?;
        info!(id = %created.id, "Todo created");

        self.refresh().await
    }

    /// Delete a to-do by id, then re-fetch the collection.
    pub async fn remove(&self, id: &str) -> Result<Vec<TodoItem>> {
        let _guard = self.op_lock.lock().await;
        let token = self.token()?;
        self.api
            .delete(&todo_path(id), Some(token.as_str()))
            .await
            .map_err(|e| self.reject(e.into()))?;
        info!(id, "Todo deleted");

        self.refresh().await
    }

    // Caller must hold `op_lock`.
    async fn refresh(&self) -> Result<Vec<TodoItem>> {
        let token = self.token()?;
        let todos: Vec<TodoItem> = self
            .api
            .get(TODOS_PATH, Some(token.as_str()))
            .await
            .map_err(|e| self.reject(e.into()))?;

        debug!(count = todos.len(), "Collection refreshed");
        self.items.send_replace(todos.clone());
        Ok(todos)
    }

    fn token(&self) -> Result<String> {
        let token = bearer_token(self.store.as_ref());
        if matches!(token, Err(Error::NotAuthenticated)) {
            self.forget();
        }
        token
    }

    /// Empty the local copy, notifying subscribers only if it held anything.
    fn forget(&self) {
        let dropped = self.items.send_if_modified(|items| {
            let had_items = !items.is_empty();
            items.clear();
            had_items
        });
        if dropped {
            debug!("Signed out, cleared local collection");
        }
    }

    fn reject(&self, err: Error) -> Error {
        expire_rejected_token(self.store.as_ref(), err)
    }
}
