//! Google OAuth login flow
//!
//! Authorization-code flow for a confidential client: build the consent
//! URL, capture the one-shot callback, exchange the code, fetch the
//! OpenID profile. The same redirect URI and a per-attempt `state` value
//! are used on both legs, and nothing is committed on any failure.

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{Config, OAuthConfig};
use crate::error::Error;
use crate::Result;

use super::callback::wait_for_callback;
use super::store::Profile;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Scopes requested at login.
const SCOPES: &[&str] = &[
    "openid",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Outbound request timeout.
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Google token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Token exchange request body.
#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

/// Raw userinfo endpoint payload.
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    picture: String,
}

impl From<UserInfo> for Profile {
    fn from(info: UserInfo) -> Self {
        Profile {
            id: info.sub,
            email: info.email,
            name: info.name,
            given_name: info.given_name,
            family_name: info.family_name,
            picture: info.picture,
        }
    }
}

/// Google OAuth login flow for the configured client.
#[derive(Clone)]
pub struct GoogleAuthFlow {
    oauth: OAuthConfig,
    http_client: Client,
}

impl GoogleAuthFlow {
    pub fn new(config: &Config) -> Self {
        Self {
            oauth: config.oauth.clone(),
            http_client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Run the complete login flow and return the user's profile.
    ///
    /// The caller is responsible for committing the profile to the auth
    /// store; on any failure here the store is left untouched.
    pub async fn login(&self) -> Result<Profile> {
        let state = generate_state();
        let auth_url = self.authorization_url(&state)?;

        println!("\nOpening browser for Google sign-in...");
        println!("If the browser doesn't open, visit:\n{auth_url}\n");

        if let Err(e) = open::that(&auth_url) {
            tracing::warn!("Failed to open browser: {e}");
        }

        println!("Waiting for authorization...");
        let params = wait_for_callback(&self.oauth.redirect_uri, &state).await?;

        tracing::debug!("Authorization code received, exchanging");
        let access_token = self.exchange_code(&params.code).await?;
        self.fetch_profile(&access_token).await
    }

    /// Build the consent URL for a login attempt.
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(GOOGLE_AUTH_URL)
            .map_err(|e| Error::OAuth(format!("Invalid auth URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.oauth.client_id)
            .append_pair("redirect_uri", &self.oauth.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", state)
            .append_pair("include_granted_scopes", "true")
            .append_pair("access_type", "offline");

        Ok(url.to_string())
    }

    /// Exchange the one-time authorization code for an access token.
    ///
    /// A stale or already-consumed code fails here with the provider's
    /// error surfaced; it is never retried with cached credentials.
    async fn exchange_code(&self, code: &str) -> Result<String> {
        let request = TokenExchangeRequest {
            client_id: &self.oauth.client_id,
            client_secret: &self.oauth.client_secret,
            code,
            redirect_uri: &self.oauth.redirect_uri,
            grant_type: "authorization_code",
        };

        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(Error::OAuth(format!("Token exchange failed: {error_text}")));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    /// Fetch the OpenID profile for a freshly exchanged token.
    async fn fetch_profile(&self, access_token: &str) -> Result<Profile> {
        let response = self
            .http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(Error::OAuth(format!("Profile fetch failed: {error_text}")));
        }

        let info: UserInfo = response.json().await?;
        tracing::debug!("Profile retrieved for {}", info.email);
        Ok(info.into())
    }
}

/// Random state string for CSRF protection.
fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow() -> GoogleAuthFlow {
        GoogleAuthFlow {
            oauth: OAuthConfig {
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                redirect_uri: "http://localhost:8501/".to_string(),
            },
            http_client: Client::new(),
        }
    }

    #[test]
    fn test_authorization_url_params() {
        let url = flow().authorization_url("state123").unwrap();
        let parsed = Url::parse(&url).unwrap();

        let pairs: std::collections::HashMap<_, _> = parsed.query_pairs().collect();
        assert_eq!(pairs["client_id"], "client-id");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8501/");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["state"], "state123");
        assert_eq!(pairs["access_type"], "offline");
        assert!(pairs["scope"].contains("openid"));
        assert!(pairs["scope"].contains("userinfo.email"));
    }

    #[test]
    fn test_generate_state() {
        let state = generate_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(state, generate_state());
    }

    #[test]
    fn test_userinfo_maps_to_profile() {
        let info: UserInfo = serde_json::from_str(
            r#"{
                "sub": "108",
                "email": "ada@example.com",
                "name": "Ada Lovelace",
                "given_name": "Ada",
                "family_name": "Lovelace",
                "picture": "https://example.com/ada.png"
            }"#,
        )
        .unwrap();

        let profile: Profile = info.into();
        assert_eq!(profile.id, "108");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.given_name, "Ada");
    }

    #[test]
    fn test_userinfo_tolerates_missing_optionals() {
        let info: UserInfo =
            serde_json::from_str(r#"{"sub": "1", "email": "a@b.c"}"#).unwrap();
        let profile: Profile = info.into();

        assert!(profile.name.is_none());
        assert!(profile.given_name.is_empty());
        assert!(profile.picture.is_empty());
    }
}
