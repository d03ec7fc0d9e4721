//! Typed client for the Kanbanize REST API.
//!
//! Every call carries the identity provider's ID token as a bearer header.
//! Non-2xx responses are mapped to [`ApiError::Status`], preserving the
//! server's `{"detail": ...}` message when one is present so failure toasts
//! can show it.

use serde_json::json;

use crate::api::models::{
    Card, CardPatch, NewCard, Profile, ProfileUpdate, Team, WorkDay,
};
use crate::errors::ApiError;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── profile ──────────────────────────────────────────────────────

    pub async fn get_profile(&self, token: &str) -> Result<Profile, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/profile/"))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Profile, ApiError> {
        let resp = self
            .http
            .put(self.url("/api/profile/me/"))
            .header("Authorization", format!("Bearer {}", token))
            .json(update)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn deactivate_profile(&self, token: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .post(self.url("/api/profile/deactivate/"))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    // ── teams ────────────────────────────────────────────────────────

    pub async fn list_teams(&self, token: &str) -> Result<Vec<Team>, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/teams/"))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn create_team(&self, token: &str, name: &str, code: &str) -> Result<Team, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/teams/"))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "name": name, "code": code }))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn delete_team(&self, token: &str, team_id: i64) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/teams/{}/", team_id)))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn join_team(&self, token: &str, code: &str) -> Result<Team, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/teams/join/"))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "code": code }))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Remove a member; the server responds with the updated team record.
    pub async fn remove_member(
        &self,
        token: &str,
        team_id: i64,
        member_id: i64,
    ) -> Result<Team, ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/teams/{}/members/{}/", team_id, member_id)))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    // ── cards ────────────────────────────────────────────────────────

    pub async fn list_cards(
        &self,
        token: &str,
        team_id: i64,
        assigned_to: Option<&str>,
    ) -> Result<Vec<Card>, ApiError> {
        let mut query: Vec<(&str, String)> = vec![("team_id", team_id.to_string())];
        if let Some(name) = assigned_to {
            query.push(("assigned_to", name.to_string()));
        }
        let resp = self
            .http
            .get(self.url("/api/cards/"))
            .header("Authorization", format!("Bearer {}", token))
            .query(&query)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn create_card(&self, token: &str, card: &NewCard) -> Result<Card, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/cards/"))
            .header("Authorization", format!("Bearer {}", token))
            .json(card)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn patch_card(
        &self,
        token: &str,
        card_id: i64,
        patch: &CardPatch,
    ) -> Result<Card, ApiError> {
        let resp = self
            .http
            .patch(self.url(&format!("/api/cards/{}/", card_id)))
            .header("Authorization", format!("Bearer {}", token))
            .json(patch)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn delete_card(&self, token: &str, card_id: i64) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/api/cards/{}/", card_id)))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    // ── workdays ─────────────────────────────────────────────────────

    pub async fn list_workdays(&self, token: &str) -> Result<Vec<WorkDay>, ApiError> {
        let resp = self
            .http
            .get(self.url("/api/workdays/"))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn start_workday(
        &self,
        token: &str,
        start_time: DateTime<Utc>,
    ) -> Result<WorkDay, ApiError> {
        let resp = self
            .http
            .post(self.url("/api/workdays/"))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "start_time": start_time }))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn end_workday(
        &self,
        token: &str,
        workday_id: i64,
        end_time: DateTime<Utc>,
        working_hours: &str,
    ) -> Result<WorkDay, ApiError> {
        let resp = self
            .http
            .patch(self.url(&format!("/api/workdays/{}/", workday_id)))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "end_time": end_time, "working_hours": working_hours }))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }
}

/// Map a non-2xx response to `ApiError::Status`, extracting the server's
/// `detail` body field when present.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp.text().await.ok().as_deref().and_then(parse_detail);
    Err(ApiError::Status {
        status: status.as_u16(),
        detail,
    })
}

fn parse_detail(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .map(str::to_string)
}
