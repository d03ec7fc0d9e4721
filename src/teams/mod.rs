//! The teams dashboard: list, create, join, delete, membership.
//!
//! Owns the team list and the single selection. The invariant: at most one
//! team is selected, and the selected id always references a team present in
//! the last-fetched list — a refresh that drops the selected team also clears
//! the selection. Deletes and member removals are optimistic with rollback,
//! like the board's card mutations.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::info;

use crate::api::ApiClient;
use crate::api::models::Team;
use crate::errors::ActionError;
use crate::gate::Capabilities;
use crate::ui::toast::Notifier;

#[derive(Debug, Default)]
struct TeamsState {
    teams: Vec<Team>,
    selected: Option<i64>,
}

pub struct TeamsPanel {
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
    state: Mutex<TeamsState>,
    selected_tx: watch::Sender<Option<i64>>,
}

impl TeamsPanel {
    pub fn new(api: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        let (selected_tx, _) = watch::channel(None);
        Self {
            api,
            notifier,
            state: Mutex::new(TeamsState::default()),
            selected_tx,
        }
    }

    pub fn teams(&self) -> Vec<Team> {
        self.lock().teams.clone()
    }

    pub fn selected_team_id(&self) -> Option<i64> {
        self.lock().selected
    }

    pub fn selected_team(&self) -> Option<Team> {
        let state = self.lock();
        let selected = state.selected?;
        state.teams.iter().find(|t| t.id == selected).cloned()
    }

    /// Selection change notifications for the sync loop.
    pub fn subscribe_selection(&self) -> watch::Receiver<Option<i64>> {
        self.selected_tx.subscribe()
    }

    /// Select a team. The id must reference a team in the last-fetched list.
    pub fn select(&self, team_id: i64) -> Result<(), ActionError> {
        {
            let mut state = self.lock();
            if !state.teams.iter().any(|t| t.id == team_id) {
                return Err(ActionError::TeamNotFound(team_id));
            }
            state.selected = Some(team_id);
        }
        self.selected_tx.send_replace(Some(team_id));
        Ok(())
    }

    pub fn clear_selection(&self) {
        self.lock().selected = None;
        self.selected_tx.send_replace(None);
    }

    /// Reload the team list. A failed fetch resets the list to empty; either
    /// way the selection invariant is re-established afterwards.
    pub async fn refresh(&self, token: &str) -> Result<(), ActionError> {
        match self.api.list_teams(token).await {
            Ok(teams) => {
                let dropped_selection = {
                    let mut state = self.lock();
                    state.teams = teams;
                    let still_present = state
                        .selected
                        .map(|id| state.teams.iter().any(|t| t.id == id))
                        .unwrap_or(true);
                    if !still_present {
                        state.selected = None;
                    }
                    !still_present
                };
                if dropped_selection {
                    self.selected_tx.send_replace(None);
                }
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Fetch teams"));
                {
                    let mut state = self.lock();
                    state.teams.clear();
                    state.selected = None;
                }
                self.selected_tx.send_replace(None);
                Err(err.into())
            }
        }
    }

    /// Create a team with a generated join code.
    pub async fn create(
        &self,
        token: &str,
        capabilities: &Capabilities,
        name: &str,
    ) -> Result<Team, ActionError> {
        if !capabilities.can_create_team {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can create teams".to_string(),
            )));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject(ActionError::MissingField("Team name")));
        }

        let code = generate_team_code();
        match self.api.create_team(token, name, &code).await {
            Ok(team) => {
                self.lock().teams.push(team.clone());
                info!(team_id = team.id, "team created");
                self.notifier
                    .success(&format!("Team {} created successfully", team.name));
                Ok(team)
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Create team"));
                Err(err.into())
            }
        }
    }

    /// Join a team by its 6-character code.
    pub async fn join(&self, token: &str, code: &str) -> Result<Team, ActionError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(self.reject(ActionError::MissingField("Team code")));
        }

        match self.api.join_team(token, code).await {
            Ok(team) => {
                {
                    let mut state = self.lock();
                    if !state.teams.iter().any(|t| t.id == team.id) {
                        state.teams.push(team.clone());
                    }
                }
                self.notifier
                    .success(&format!("Joined team {}", team.name));
                Ok(team)
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Join team"));
                Err(err.into())
            }
        }
    }

    /// Delete a team: removed from the list immediately, restored on failure.
    pub async fn delete(
        &self,
        token: &str,
        capabilities: &Capabilities,
        team_id: i64,
    ) -> Result<(), ActionError> {
        if !capabilities.can_delete_team {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can delete teams".to_string(),
            )));
        }

        // optimistic removal, remembering position and selection
        let (index, team, was_selected) = {
            let mut state = self.lock();
            let Some(index) = state.teams.iter().position(|t| t.id == team_id) else {
                drop(state);
                let err = ActionError::TeamNotFound(team_id);
                self.notifier.error(&format!("Delete team failed: {}", err));
                return Err(err);
            };
            let team = state.teams.remove(index);
            let was_selected = state.selected == Some(team_id);
            if was_selected {
                state.selected = None;
            }
            (index, team, was_selected)
        };
        if was_selected {
            self.selected_tx.send_replace(None);
        }

        match self.api.delete_team(token, team_id).await {
            Ok(()) => {
                info!(team_id, "team deleted");
                self.notifier
                    .success(&format!("Team {} deleted", team.name));
                Ok(())
            }
            Err(err) => {
                // rollback: the team reappears where it was
                {
                    let mut state = self.lock();
                    let index = index.min(state.teams.len());
                    state.teams.insert(index, team);
                    if was_selected {
                        state.selected = Some(team_id);
                    }
                }
                if was_selected {
                    self.selected_tx.send_replace(Some(team_id));
                }
                self.notifier.error(&err.action_failed("Delete team"));
                Err(err.into())
            }
        }
    }

    /// Remove a member from a team, optimistically.
    pub async fn remove_member(
        &self,
        token: &str,
        capabilities: &Capabilities,
        team_id: i64,
        member_id: i64,
    ) -> Result<(), ActionError> {
        if !capabilities.can_remove_member {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can remove team members".to_string(),
            )));
        }

        let (original, member_name) = {
            let mut state = self.lock();
            let Some(team) = state.teams.iter_mut().find(|t| t.id == team_id) else {
                drop(state);
                let err = ActionError::TeamNotFound(team_id);
                self.notifier
                    .error(&format!("Remove member failed: {}", err));
                return Err(err);
            };
            let original = team.clone();
            let member_name = team
                .members
                .iter()
                .find(|m| m.id == member_id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|| format!("User {}", member_id));
            team.members.retain(|m| m.id != member_id);
            (original, member_name)
        };

        match self.api.remove_member(token, team_id, member_id).await {
            Ok(updated) => {
                // the server's view of the team replaces ours
                let mut state = self.lock();
                if let Some(team) = state.teams.iter_mut().find(|t| t.id == team_id) {
                    *team = updated;
                }
                drop(state);
                self.notifier
                    .success(&format!("Removed {} from team", member_name));
                Ok(())
            }
            Err(err) => {
                let mut state = self.lock();
                if let Some(team) = state.teams.iter_mut().find(|t| t.id == team_id) {
                    *team = original;
                }
                drop(state);
                self.notifier.error(&err.action_failed("Remove member"));
                Err(err.into())
            }
        }
    }

    fn reject(&self, err: ActionError) -> ActionError {
        self.notifier.error(&err.to_string());
        err
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TeamsState> {
        self.state.lock().expect("teams lock poisoned")
    }
}

/// A 6-character uppercase alphanumeric join code.
pub fn generate_team_code() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(6)
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Member, Role};
    use crate::ui::toast::MemoryNotifier;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};

    fn manager() -> Capabilities {
        Capabilities::for_role(Some(Role::ProjectManager))
    }

    fn member_caps() -> Capabilities {
        Capabilities::for_role(Some(Role::TeamMember))
    }

    async fn serve(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(format!("http://{}", addr))
    }

    fn panel(api: ApiClient) -> (TeamsPanel, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        (TeamsPanel::new(api, notifier.clone()), notifier)
    }

    fn seed(panel: &TeamsPanel, teams: Vec<Team>) {
        panel.lock().teams = teams;
    }

    fn team(id: i64, name: &str) -> Team {
        Team {
            id,
            name: name.to_string(),
            code: "A1B2C3".to_string(),
            members: vec![
                Member {
                    id: 10,
                    name: "Dana".to_string(),
                    role: None,
                },
                Member {
                    id: 11,
                    name: "Riley".to_string(),
                    role: None,
                },
            ],
        }
    }

    #[test]
    fn test_generate_team_code_shape() {
        for _ in 0..20 {
            let code = generate_team_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_select_requires_known_team() {
        let (panel, _) = panel(ApiClient::new("http://unused.invalid"));
        seed(&panel, vec![team(1, "Core")]);

        assert!(panel.select(1).is_ok());
        assert_eq!(panel.selected_team_id(), Some(1));
        assert!(matches!(panel.select(99), Err(ActionError::TeamNotFound(99))));
        // failed select leaves the previous selection intact
        assert_eq!(panel.selected_team_id(), Some(1));
    }

    #[tokio::test]
    async fn test_refresh_clears_selection_when_team_disappears() {
        let api = serve(Router::new().route(
            "/api/teams/",
            get(|| async { Json(serde_json::json!([{"id": 2, "name": "Other", "code": "XYZ123"}])) }),
        ))
        .await;
        let (panel, _) = panel(api);
        seed(&panel, vec![team(1, "Core"), team(2, "Other")]);
        panel.select(1).unwrap();

        panel.refresh("tok").await.unwrap();
        assert_eq!(panel.selected_team_id(), None);
        assert_eq!(panel.teams().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_empties_list() {
        let api = serve(Router::new().route(
            "/api/teams/",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let (panel, notifier) = panel(api);
        seed(&panel, vec![team(1, "Core")]);

        assert!(panel.refresh("tok").await.is_err());
        assert!(panel.teams().is_empty());
        assert_eq!(panel.selected_team_id(), None);
        assert_eq!(notifier.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_manager() {
        let (panel, notifier) = panel(ApiClient::new("http://unused.invalid"));
        let result = panel.create("tok", &member_caps(), "New Team").await;
        assert!(matches!(result, Err(ActionError::NotPermitted(_))));
        assert_eq!(
            notifier.errors(),
            vec!["Only Project Managers can create teams".to_string()]
        );
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let (panel, notifier) = panel(ApiClient::new("http://unused.invalid"));
        let result = panel.create("tok", &manager(), "  ").await;
        assert!(matches!(result, Err(ActionError::MissingField(_))));
        assert_eq!(notifier.errors(), vec!["Team name is required".to_string()]);
    }

    #[tokio::test]
    async fn test_create_success_appends_team() {
        let api = serve(Router::new().route(
            "/api/teams/",
            post(|Json(body): Json<serde_json::Value>| async move {
                let code = body["code"].as_str().unwrap();
                assert_eq!(code.len(), 6);
                Json(serde_json::json!({
                    "id": 5, "name": body["name"], "code": code, "members": []
                }))
            }),
        ))
        .await;
        let (panel, notifier) = panel(api);

        let created = panel.create("tok", &manager(), "Core").await.unwrap();
        assert_eq!(created.id, 5);
        assert_eq!(panel.teams().len(), 1);
        assert!(
            notifier
                .messages()
                .contains(&"Team Core created successfully".to_string())
        );
    }

    #[tokio::test]
    async fn test_join_requires_code() {
        let (panel, notifier) = panel(ApiClient::new("http://unused.invalid"));
        assert!(panel.join("tok", " ").await.is_err());
        assert_eq!(notifier.errors(), vec!["Team code is required".to_string()]);
    }

    #[tokio::test]
    async fn test_join_surfaces_server_detail() {
        let api = serve(Router::new().route(
            "/api/teams/join/",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"detail": "Invalid team code"})),
                )
            }),
        ))
        .await;
        let (panel, notifier) = panel(api);

        assert!(panel.join("tok", "ZZZZZZ").await.is_err());
        assert_eq!(
            notifier.errors(),
            vec!["Join team failed: Invalid team code".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_failure_rolls_team_back() {
        let api = serve(Router::new().route(
            "/api/teams/{id}/",
            delete(|Path(_id): Path<i64>| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"detail": "Database error"})),
                )
            }),
        ))
        .await;
        let (panel, notifier) = panel(api);
        seed(&panel, vec![team(1, "Core"), team(2, "Other")]);
        panel.select(1).unwrap();

        let result = panel.delete("tok", &manager(), 1).await;
        assert!(result.is_err());
        // the team reappears in its old position, selection restored
        let ids: Vec<i64> = panel.teams().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(panel.selected_team_id(), Some(1));
        assert_eq!(
            notifier.errors(),
            vec!["Delete team failed: Database error".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_success_clears_selection() {
        let api = serve(Router::new().route(
            "/api/teams/{id}/",
            delete(|Path(_id): Path<i64>| async { StatusCode::NO_CONTENT }),
        ))
        .await;
        let (panel, _) = panel(api);
        seed(&panel, vec![team(1, "Core")]);
        panel.select(1).unwrap();

        panel.delete("tok", &manager(), 1).await.unwrap();
        assert!(panel.teams().is_empty());
        assert_eq!(panel.selected_team_id(), None);
    }

    #[tokio::test]
    async fn test_delete_requires_manager() {
        let (panel, _) = panel(ApiClient::new("http://unused.invalid"));
        seed(&panel, vec![team(1, "Core")]);
        assert!(panel.delete("tok", &member_caps(), 1).await.is_err());
        assert_eq!(panel.teams().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_member_success_takes_server_view() {
        let api = serve(Router::new().route(
            "/api/teams/{team_id}/members/{member_id}/",
            delete(|Path((team_id, member_id)): Path<(i64, i64)>| async move {
                assert_eq!((team_id, member_id), (1, 10));
                Json(serde_json::json!({
                    "id": 1, "name": "Core", "code": "A1B2C3",
                    "members": [{"id": 11, "name": "Riley"}]
                }))
            }),
        ))
        .await;
        let (panel, notifier) = panel(api);
        seed(&panel, vec![team(1, "Core")]);

        panel
            .remove_member("tok", &manager(), 1, 10)
            .await
            .unwrap();
        let members = &panel.teams()[0].members;
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, 11);
        assert!(
            notifier
                .messages()
                .contains(&"Removed Dana from team".to_string())
        );
    }

    #[tokio::test]
    async fn test_remove_member_failure_restores_roster() {
        let api = serve(Router::new().route(
            "/api/teams/{team_id}/members/{member_id}/",
            delete(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let (panel, _) = panel(api);
        seed(&panel, vec![team(1, "Core")]);

        assert!(
            panel
                .remove_member("tok", &manager(), 1, 10)
                .await
                .is_err()
        );
        assert_eq!(panel.teams()[0].members.len(), 2);
    }
}
