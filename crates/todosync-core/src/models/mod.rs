//! Data models for the to-do service.
//!
//! This module contains the wire and domain types shared by the API client,
//! the session controller and collection sync:
//!
//! - `TodoItem`, `NewTodo`: to-do entries as returned by and sent to the server
//! - `UserProfile`: the signed-in account's public details
//! - Auth payloads: `LoginRequest`, `RegisterRequest`, `AuthToken`

pub mod todo;
pub mod user;

pub use todo::{NewTodo, TodoItem};
pub use user::{AuthToken, LoginRequest, RegisterRequest, UserProfile};
