//! Keeping the local view of the remote to-do collection in step with the server.
//!
//! This module provides:
//! - `CollectionSync`: list/add/remove with a wholesale re-fetch after every
//!   mutation, publishing each fresh list to subscribers
//! - `ViewScope`: ties in-flight work to a consumer's lifetime so results
//!   arriving after teardown are dropped

pub mod collection;
pub mod scope;

pub use collection::{CollectionSync, EMPTY_FIELDS_MESSAGE};
pub use scope::ViewScope;
