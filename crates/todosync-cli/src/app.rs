//! Command handlers for the todosync CLI.
//!
//! `App` wires the core services together from the user's configuration and
//! renders each result as plain text. Failures come back as a one-line
//! notice; the user can simply run the command again.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::warn;

use todosync_core::auth::open_store;
use todosync_core::utils::{format_date, truncate_string};
use todosync_core::{
    ApiClient, CollectionSync, Config, Error, SessionController, SessionState, TodoItem,
};

/// Width of the description column in `list` output.
const DESCRIPTION_WIDTH: usize = 48;

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "TODOSYNC_PASSWORD";

/// A user-facing failure: a short title plus the message to show.
#[derive(Debug)]
pub struct Notice {
    title: &'static str,
    message: String,
}

impl Notice {
    fn new(title: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            title,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

pub type Outcome = std::result::Result<(), Notice>;

pub struct App {
    config: Config,
    api_url: String,
    session: SessionController,
    todos: CollectionSync,
}

impl App {
    pub fn new(api_url_override: Option<String>) -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let api_url = api_url_override.unwrap_or_else(|| config.api_url());
        let api = ApiClient::with_timeout(&api_url, config.request_timeout())
            .context("Failed to build HTTP client")?;
        let store = open_store(config.token_backend, &config.data_dir()?);

        Ok(Self {
            session: SessionController::new(api.clone(), store.clone()),
            todos: CollectionSync::new(api, store),
            api_url,
            config,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub async fn login(&mut self, username: Option<String>) -> Outcome {
        let username = match username.or_else(|| self.config.last_username.clone()) {
            Some(u) => u,
            None => prompt_line("Username: ").map_err(|e| Notice::new("Login Failed", e))?,
        };
        let password = read_password().map_err(|e| Notice::new("Login Failed", e))?;

        self.session
            .login(&username, &password)
            .await
            .map_err(|e| Notice::new("Login Failed", e))?;

        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!("Login successful!");
        Ok(())
    }

    pub async fn register(&self, username: &str, email: &str) -> Outcome {
        let password = read_password().map_err(|e| Notice::new("Registration Failed", e))?;
        self.session
            .register(username, email, &password)
            .await
            .map_err(|e| Notice::new("Registration Failed", e))?;

        println!("Account created. Run `todosync login {}` to sign in.", username);
        Ok(())
    }

    pub fn logout(&self) -> Outcome {
        self.session.logout().map_err(|e| Notice::new("Logout", e))?;
        println!("Logged out.");
        Ok(())
    }

    pub fn status(&self) -> Outcome {
        match self.session.state().map_err(|e| Notice::new("Status", e))? {
            SessionState::Authenticated => println!("Signed in ({})", self.api_url),
            SessionState::Unauthenticated => println!("Not signed in ({})", self.api_url),
        }
        Ok(())
    }

    pub async fn profile(&self) -> Outcome {
        let profile = self
            .session
            .fetch_profile()
            .await
            .map_err(|e| Notice::new("Profile", signed_in_hint(e)))?;

        let initial = profile.initial().unwrap_or('?');
        println!("[{}] Welcome, {}!", initial, profile.username);
        println!("  Username: {}", profile.username);
        println!("  Email:    {}", profile.email);
        Ok(())
    }

    // =========================================================================
    // To-dos
    // =========================================================================

    pub async fn list(&self) -> Outcome {
        let items = self
            .todos
            .list()
            .await
            .map_err(|e| Notice::new("Alert", signed_in_hint(e)))?;
        render_todos(&items);
        Ok(())
    }

    pub async fn add(&self, title: &str, description: &str) -> Outcome {
        let items = self
            .todos
            .add(title, description)
            .await
            .map_err(|e| Notice::new("Alert", signed_in_hint(e)))?;
        render_todos(&items);
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Outcome {
        let items = self
            .todos
            .remove(id)
            .await
            .map_err(|e| Notice::new("Alert", signed_in_hint(e)))?;
        render_todos(&items);
        Ok(())
    }
}

/// Point the user at `login` when the failure means the session is gone.
fn signed_in_hint(err: Error) -> String {
    if matches!(err, Error::NotAuthenticated) || err.is_unauthorized() {
        format!("{}. Run `todosync login` to sign in.", err)
    } else {
        err.to_string()
    }
}

fn render_todos(items: &[TodoItem]) {
    if items.is_empty() {
        println!("No to-dos yet.");
        return;
    }
    for item in items {
        println!(
            "{}  {:<24}  {:<width$}  {}",
            item.id,
            truncate_string(&item.title, 24),
            truncate_string(&item.description, DESCRIPTION_WIDTH),
            format_date(&item.created_at),
            width = DESCRIPTION_WIDTH,
        );
    }
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}
