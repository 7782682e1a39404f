//! User memory service client
//!
//! Syncs the signed-in user and their chat sessions to an external
//! memory service so multi-turn context can be reassembled across
//! sessions. Users are keyed by email, sessions by thread id. Every
//! failure here is non-fatal to the chat flow.

use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::auth::Profile;
use crate::config::{Config, Environment};
use crate::error::Error;
use crate::Result;

/// Outbound request timeout.
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Client for the user memory service.
pub struct MemoryClient {
    api_url: String,
    api_key: String,
    environment: Environment,
    http_client: Client,
}

impl MemoryClient {
    pub fn new(config: &Config) -> Self {
        Self {
            api_url: config.memory.api_url.trim_end_matches('/').to_string(),
            api_key: config.memory.api_key.clone(),
            environment: config.environment,
            http_client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// The service-side user id for an email address.
    fn user_id(&self, email: &str) -> String {
        scoped_email(email, self.environment)
    }

    /// Make sure the user exists in the memory service, creating it on
    /// first login.
    pub async fn ensure_user(&self, profile: &Profile) -> Result<()> {
        let user_id = self.user_id(&profile.email);

        let response = self
            .http_client
            .get(format!("{}/users/{}", self.api_url, user_id))
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .send()
            .await
            .map_err(|e| Error::Memory(format!("User lookup failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!("User {user_id} not found in memory service, creating");
                self.create_user(&user_id, profile).await
            }
            status if status.is_success() => Ok(()),
            status => Err(Error::Memory(format!("User lookup failed: {status}"))),
        }
    }

    async fn create_user(&self, user_id: &str, profile: &Profile) -> Result<()> {
        let body = json!({
            "user_id": user_id,
            "email": user_id,
            "first_name": profile.given_name,
            "last_name": profile.family_name,
            "metadata": {"picture": profile.picture},
        });

        let response = self
            .http_client
            .post(format!("{}/users", self.api_url))
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Memory(format!("User creation failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Memory(format!(
                "User creation failed: {}",
                response.status()
            )));
        }

        debug!("Created memory service user {user_id}");
        Ok(())
    }

    /// Register a freshly allocated chat session under the user.
    pub async fn register_session(&self, thread_id: &Uuid, email: &str) -> Result<()> {
        let body = json!({
            "session_id": thread_id.to_string(),
            "user_id": self.user_id(email),
        });

        let response = self
            .http_client
            .post(format!("{}/sessions", self.api_url))
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Memory(format!("Session registration failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Memory(format!(
                "Session registration failed: {}",
                response.status()
            )));
        }

        debug!("Registered session {thread_id}");
        Ok(())
    }
}

/// In dev, scope addresses with a `+devtest` tag so test users never
/// collide with production records.
fn scoped_email(email: &str, environment: Environment) -> String {
    match environment {
        Environment::Dev => email.replacen('@', "+devtest@", 1),
        Environment::Prod => email.to_string(),
    }
}
