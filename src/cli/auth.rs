//! Keyring-based session storage for the compactd server

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use keyring::Entry;
use tracing::{debug, info};

use compactd::datasource::CompactdClient;

const KEYRING_SERVICE: &str = "compactd";

/// A logged-in session
#[derive(Debug, Clone)]
pub struct Session {
    pub url: String,
    pub username: String,
    pub token: String,
}

impl Session {
    pub fn client(&self) -> Result<CompactdClient> {
        CompactdClient::new(&self.url, Some(&self.token)).context("Failed to create HTTP client")
    }
}

/// Manages the stored session
pub struct AuthManager;

impl AuthManager {
    /// Log in to the server
    ///
    /// Reuses the stored session unless `force` is set; prompts for whatever
    /// was not given on the command line.
    pub async fn authenticate(
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
        force: bool,
    ) -> Result<Session> {
        if !force {
            if let Ok(session) = Self::load() {
                info!("Found existing session in keyring");
                return Ok(session);
            }
        } else {
            debug!("Force flag set, ignoring stored session");
        }

        let url = match url {
            Some(url) => url,
            None => Input::new()
                .with_prompt("compactd server URL")
                .interact_text()
                .context("Failed to read URL")?,
        };
        let username = match username {
            Some(username) => username,
            None => Input::new()
                .with_prompt("Username")
                .interact_text()
                .context("Failed to read username")?,
        };
        let password = match password {
            Some(password) => password,
            None => Password::new()
                .with_prompt("Password")
                .interact()
                .context("Failed to read password")?,
        };

        let url = url.trim_end_matches('/').to_string();
        let mut client =
            CompactdClient::new(&url, None).context("Failed to create HTTP client")?;
        let token = client
            .login(&username, &password)
            .await
            .context("Failed to log in")?;

        let session = Session {
            url,
            username,
            token,
        };
        Self::store(&session)?;
        info!("Session stored in keyring");

        Ok(session)
    }

    pub fn load() -> Result<Session> {
        let url = Self::get_entry("url")?
            .get_password()
            .context("No compactd URL in keyring")?;
        let username = Self::get_entry("username")?
            .get_password()
            .context("No compactd username in keyring")?;
        let token = Self::get_entry("token")?
            .get_password()
            .context("No compactd session in keyring")?;

        Ok(Session {
            url,
            username,
            token,
        })
    }

    /// Load the stored session or explain how to create one
    pub fn require() -> Result<Session> {
        Self::load()
            .map_err(|_| anyhow::anyhow!("No session found. Run 'compactd auth' first to log in."))
    }

    pub fn store(session: &Session) -> Result<()> {
        Self::get_entry("url")?
            .set_password(&session.url)
            .context("Failed to store URL in keyring")?;
        Self::get_entry("username")?
            .set_password(&session.username)
            .context("Failed to store username in keyring")?;
        Self::get_entry("token")?
            .set_password(&session.token)
            .context("Failed to store session in keyring")?;

        debug!("Session stored in keyring");
        Ok(())
    }

    fn get_entry(key: &str) -> Result<Entry> {
        let entry_key = format!("compactd:{}", key);
        Entry::new(KEYRING_SERVICE, &entry_key).context("Failed to access keyring")
    }
}
