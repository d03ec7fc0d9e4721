//! The application shell: composition root for the reconciliation core.
//!
//! Wires the pieces together the way the data flows: session resolver →
//! profile gate → (route gate) → task store poller → board and workday timer.
//! Components communicate through shared handles and watch channels, never by
//! calling into each other directly.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::ApiClient;
use crate::board::{Board, BoardCtx, SPRINT_SWEEP_INTERVAL};
use crate::config::Config;
use crate::errors::ActionError;
use crate::gate::{self, GateState, Route, RouteDecision};
use crate::identity::{IdentityProvider, RestIdentityProvider, SessionResolver};
use crate::store::{PollDeps, TaskPoller, TaskStore};
use crate::teams::TeamsPanel;
use crate::ui::toast::Notifier;
use crate::workday::WorkdayTimer;

pub struct AppShell {
    pub config: Config,
    pub api: ApiClient,
    pub provider: Arc<RestIdentityProvider>,
    pub session: Arc<SessionResolver>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<TaskStore>,
    pub teams: Arc<TeamsPanel>,
    pub timer: Arc<WorkdayTimer>,
    pub board: Arc<Board>,
    gate: Mutex<GateState>,
    deps_tx: watch::Sender<PollDeps>,
}

impl AppShell {
    pub fn new(config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let provider = Arc::new(RestIdentityProvider::new(
            config.identity_url.clone(),
            config.token_url.clone(),
            config.api_key.clone(),
        ));
        let session = Arc::new(SessionResolver::new(
            Arc::clone(&provider) as Arc<dyn IdentityProvider>,
            config.session_file.clone(),
        ));
        let api = ApiClient::new(config.api_base_url.clone());
        let store = Arc::new(TaskStore::new());
        let teams = Arc::new(TeamsPanel::new(api.clone(), Arc::clone(&notifier)));
        let timer = Arc::new(WorkdayTimer::new(api.clone(), Arc::clone(&notifier)));
        let board = Arc::new(Board::new(
            Arc::clone(&store),
            api.clone(),
            Arc::clone(&notifier),
        ));
        let (deps_tx, _) = watch::channel(PollDeps::default());

        Self {
            config,
            api,
            provider,
            session,
            notifier,
            store,
            teams,
            timer,
            board,
            gate: Mutex::new(GateState::CheckingAuth),
            deps_tx,
        }
    }

    /// Resolve the cached session (if any) and evaluate the profile gate.
    pub async fn init(&self) -> GateState {
        if let Err(err) = self.session.resolve().await {
            // the resolver has already published a safe signed-out state
            self.notifier.error(&err.to_string());
        }
        self.refresh_gate().await
    }

    /// Re-evaluate the gate against the current session. Terminal gate states
    /// are re-entered on every session change.
    pub async fn refresh_gate(&self) -> GateState {
        let state = self.session.state();
        let token = if state.principal.is_some() {
            self.session.id_token().await.ok()
        } else {
            None
        };
        let gate = gate::evaluate(&self.api, &state, token.as_deref(), self.notifier.as_ref()).await;
        *self.gate.lock().expect("gate lock poisoned") = gate.clone();
        self.update_deps();
        gate
    }

    pub fn gate(&self) -> GateState {
        self.gate.lock().expect("gate lock poisoned").clone()
    }

    /// Where a requested path lands for the current gate.
    pub fn route(&self, path: &str) -> RouteDecision {
        gate::resolve_terminal(&self.gate(), &Route::parse(path))
    }

    pub fn select_team(&self, team_id: i64) -> Result<(), ActionError> {
        self.teams.select(team_id)?;
        self.update_deps();
        Ok(())
    }

    pub fn clear_team_selection(&self) {
        self.teams.clear_selection();
        self.update_deps();
    }

    /// Everything a board mutation needs about the caller, freshly tokened.
    pub async fn board_ctx(&self) -> Result<BoardCtx> {
        let gate = self.gate();
        if !gate.is_verified() {
            bail!("Not signed in with a verified account");
        }
        let Some(team_id) = self.teams.selected_team_id() else {
            bail!("No team selected");
        };
        let token = self
            .session
            .id_token()
            .await
            .context("Failed to obtain an ID token")?;
        Ok(BoardCtx {
            token,
            team_id,
            capabilities: gate.capabilities(),
            profile_id: gate.profile_id(),
            workday_started: self.timer.is_running(),
        })
    }

    /// Spawn the background loops: the 30-second task poll and the 60-second
    /// expired-sprint sweep. Handles are aborted on shutdown.
    pub fn start_sync(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let poller = TaskPoller::spawn(
            Arc::clone(&self.store),
            self.api.clone(),
            Arc::clone(&self.session),
            Arc::clone(&self.notifier),
            self.deps_tx.subscribe(),
        );

        let shell = Arc::clone(self);
        let sweeper = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SPRINT_SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                if let Ok(ctx) = shell.board_ctx().await {
                    let _ = shell.board.sweep_expired(&ctx).await;
                }
            }
        });

        vec![poller, sweeper]
    }

    fn update_deps(&self) {
        let gate = self.gate();
        self.deps_tx.send_replace(PollDeps {
            verified: gate.is_verified(),
            name: gate.verified_name().map(str::to_string),
            team_id: self.teams.selected_team_id(),
        });
    }
}
