//! REST boundary to the external identity provider.
//!
//! The provider issues short-lived ID tokens against a long-lived refresh
//! token. Account endpoints (sign-in, sign-up, out-of-band emails, lookup)
//! live under one base URL; the token-refresh endpoint under another. All
//! calls carry the project API key as a query parameter.
//!
//! Provider error codes (`EMAIL_NOT_FOUND`, `INVALID_PASSWORD`,
//! `EMAIL_EXISTS`, `WEAK_PASSWORD`, ...) are surfaced verbatim — their text is
//! exactly what the user sees in the failure toast.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::errors::IdentityError;
use crate::identity::principal::{Principal, TokenSet};

/// The slice of the provider the session resolver depends on. Split out so
/// session logic can be exercised against a stub.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange a refresh token for a fresh ID token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IdentityError>;

    /// Fetch the account record behind an ID token. This is the verification
    /// check: `email_verified` reflects the provider's current state, not the
    /// one baked into the token.
    async fn lookup(&self, id_token: &str) -> Result<Principal, IdentityError>;
}

#[derive(Debug, Clone)]
pub struct RestIdentityProvider {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    /// Seconds until expiry, as a decimal string.
    expires_in: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    display_name: Option<String>,
}

impl RestIdentityProvider {
    pub fn new(
        base_url: impl Into<String>,
        token_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token_url: token_url.into(),
            api_key: api_key.into(),
        }
    }

    fn account_url(&self, action: &str) -> String {
        format!("{}/v1/accounts:{}?key={}", self.base_url, action, self.api_key)
    }

    /// Email + password sign-in.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenSet, IdentityError> {
        let resp = self
            .http
            .post(self.account_url("signInWithPassword"))
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;
        let signin: SignInResponse = check(resp).await?.json().await?;
        Ok(into_token_set(
            signin.id_token,
            signin.refresh_token,
            &signin.expires_in,
        ))
    }

    /// Complete an OAuth sign-in with the credential the user obtained in the
    /// browser handoff.
    pub async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        oauth_id_token: &str,
    ) -> Result<TokenSet, IdentityError> {
        let resp = self
            .http
            .post(self.account_url("signInWithIdp"))
            .json(&json!({
                "postBody": format!("id_token={}&providerId={}", oauth_id_token, provider_id),
                "requestUri": "http://localhost",
                "returnSecureToken": true,
                "returnIdpCredential": true,
            }))
            .send()
            .await?;
        let signin: SignInResponse = check(resp).await?.json().await?;
        Ok(into_token_set(
            signin.id_token,
            signin.refresh_token,
            &signin.expires_in,
        ))
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<TokenSet, IdentityError> {
        let resp = self
            .http
            .post(self.account_url("signUp"))
            .json(&json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;
        let signin: SignInResponse = check(resp).await?.json().await?;
        Ok(into_token_set(
            signin.id_token,
            signin.refresh_token,
            &signin.expires_in,
        ))
    }

    pub async fn send_verification_email(&self, id_token: &str) -> Result<(), IdentityError> {
        let resp = self
            .http
            .post(self.account_url("sendOobCode"))
            .json(&json!({
                "requestType": "VERIFY_EMAIL",
                "idToken": id_token,
            }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn send_password_reset_email(&self, email: &str) -> Result<(), IdentityError> {
        let resp = self
            .http
            .post(self.account_url("sendOobCode"))
            .json(&json!({
                "requestType": "PASSWORD_RESET",
                "email": email,
            }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Reauthenticate with the current password, then set the new one. The
    /// token set returned belongs to the reauthenticated session.
    pub async fn update_password(
        &self,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<TokenSet, IdentityError> {
        let tokens = self.sign_in_with_password(email, current_password).await?;
        let resp = self
            .http
            .post(self.account_url("update"))
            .json(&json!({
                "idToken": tokens.id_token,
                "password": new_password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;
        let updated: SignInResponse = check(resp).await?.json().await?;
        Ok(into_token_set(
            updated.id_token,
            updated.refresh_token,
            &updated.expires_in,
        ))
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, IdentityError> {
        let resp = self
            .http
            .post(format!("{}/v1/token?key={}", self.token_url, self.api_key))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;
        let refreshed: RefreshResponse = check(resp).await?.json().await?;
        Ok(into_token_set(
            refreshed.id_token,
            refreshed.refresh_token,
            &refreshed.expires_in,
        ))
    }

    async fn lookup(&self, id_token: &str) -> Result<Principal, IdentityError> {
        let resp = self
            .http
            .post(self.account_url("lookup"))
            .json(&json!({ "idToken": id_token }))
            .send()
            .await?;
        let lookup: LookupResponse = check(resp).await?.json().await?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::Provider("USER_NOT_FOUND".to_string()))?;
        Ok(Principal {
            uid: user.local_id,
            email: user.email,
            email_verified: user.email_verified,
            display_name: user.display_name,
        })
    }
}

fn into_token_set(id_token: String, refresh_token: String, expires_in: &str) -> TokenSet {
    let seconds = expires_in.parse::<i64>().unwrap_or(3600);
    TokenSet {
        id_token,
        refresh_token,
        expires_at: Utc::now() + Duration::seconds(seconds),
    }
}

/// Map a provider error body (`{"error": {"message": "..."}}`) to
/// `IdentityError::Provider` with the code verbatim.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let message = resp
        .text()
        .await
        .ok()
        .as_deref()
        .and_then(parse_provider_error)
        .unwrap_or_else(|| format!("Identity provider returned {}", status));
    Err(IdentityError::Provider(message))
}

fn parse_provider_error(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
