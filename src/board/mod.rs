//! The board reconciler: every card mutation the five-lane board performs.
//!
//! All mutations share one contract:
//! 1. capability check — rejected callers get a toast and no state change;
//! 2. optimistic update through the task store;
//! 3. network confirmation;
//! 4. rollback to the snapshot plus a failure toast when the server refuses.
//!
//! A drop targeting a card the store no longer knows performs exactly one
//! re-fetch before giving up. Progress mutations are additionally gated on an
//! open workday: when that gate is closed the call is rejected before any
//! network traffic.

pub mod debounce;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use crate::api::models::{Card, CardPatch, Column, Member, NewCard, Priority};
use crate::api::ApiClient;
use crate::errors::ActionError;
use crate::gate::Capabilities;
use crate::store::{TaskStore, mutate};
use crate::ui::toast::Notifier;

pub use debounce::{PROGRESS_DEBOUNCE, ProgressDebouncer};

/// Cadence of the expired-sprint sweep.
pub const SPRINT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Everything a board mutation needs to know about the caller.
#[derive(Debug, Clone)]
pub struct BoardCtx {
    pub token: String,
    pub team_id: i64,
    pub capabilities: Capabilities,
    pub profile_id: Option<i64>,
    pub workday_started: bool,
}

pub struct Board {
    store: Arc<TaskStore>,
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl Board {
    pub fn new(store: Arc<TaskStore>, api: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            api,
            notifier,
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    /// Full-team refetch into the shared store.
    pub async fn refresh(&self, ctx: &BoardCtx) -> Result<(), ActionError> {
        match self.api.list_cards(&ctx.token, ctx.team_id, None).await {
            Ok(cards) => {
                self.store.replace(cards);
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Sync cards"));
                Err(err.into())
            }
        }
    }

    /// Drop a card into a lane.
    pub async fn move_card(
        &self,
        ctx: &BoardCtx,
        card_id: i64,
        target: Column,
    ) -> Result<(), ActionError> {
        if !ctx.capabilities.can_move_card {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can move tasks".to_string(),
            )));
        }

        let card = match self.store.get(card_id) {
            Some(card) => card,
            None => {
                // Stale cache: one re-fetch before giving up.
                debug!(card_id, "card missing from local state; re-fetching");
                let _ = self.refresh(ctx).await;
                match self.store.get(card_id) {
                    Some(card) => card,
                    None => {
                        let err = ActionError::CardNotFound(card_id);
                        self.notifier.error(&format!("Move card failed: {}", err));
                        return Err(err);
                    }
                }
            }
        };

        if card.sprint_expired(Utc::now()) && target != Column::Backlog {
            return Err(self.reject(ActionError::SprintExpired));
        }

        let result = mutate(
            || self.store.set_column(card_id, target),
            self.api
                .patch_card(&ctx.token, card_id, &CardPatch::column(target)),
            |previous| {
                if let Some(previous) = previous {
                    self.store.set_column(card_id, previous);
                }
            },
        )
        .await;

        match result {
            Ok(updated) => {
                self.store.upsert(updated);
                info!(card_id, column = target.as_str(), "card moved");
                self.notifier.success("Task moved successfully");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Move card"));
                Err(err.into())
            }
        }
    }

    /// Drop a card onto the burn barrel.
    pub async fn delete_card(&self, ctx: &BoardCtx, card_id: i64) -> Result<(), ActionError> {
        if !ctx.capabilities.can_delete_card {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can delete tasks".to_string(),
            )));
        }
        if !self.store.contains(card_id) {
            let err = ActionError::CardNotFound(card_id);
            self.notifier.error(&format!("Delete card failed: {}", err));
            return Err(err);
        }

        let result = mutate(
            || self.store.remove(card_id),
            self.api.delete_card(&ctx.token, card_id),
            |removed| {
                // put the original object back at its old position
                if let Some((index, card)) = removed {
                    self.store.insert_at(index, card);
                }
            },
        )
        .await;

        match result {
            Ok(()) => {
                self.notifier.success("Card deleted successfully");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Delete card"));
                Err(err.into())
            }
        }
    }

    /// Assign a card to a team member.
    pub async fn assign_card(
        &self,
        ctx: &BoardCtx,
        card_id: i64,
        member: &Member,
    ) -> Result<(), ActionError> {
        if !ctx.capabilities.can_assign {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can assign tasks".to_string(),
            )));
        }
        if !self.store.contains(card_id) {
            let err = ActionError::CardNotFound(card_id);
            self.notifier.error(&format!("Assign card failed: {}", err));
            return Err(err);
        }

        let result = mutate(
            || self.store.set_assignee(card_id, Some(member.id)),
            self.api
                .patch_card(&ctx.token, card_id, &CardPatch::assigned_to(member.id)),
            |previous| {
                if let Some(previous) = previous {
                    self.store.set_assignee(card_id, previous);
                }
            },
        )
        .await;

        match result {
            Ok(updated) => {
                self.store.upsert(updated);
                self.notifier
                    .success(&format!("Assigned to {}", member.name));
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Assign card"));
                Err(err.into())
            }
        }
    }

    /// Settle a progress value for a card. Gated on an open workday first —
    /// a closed gate means no network call is ever issued — then on role or
    /// assignment.
    pub async fn update_progress(
        &self,
        ctx: &BoardCtx,
        card_id: i64,
        progress: u8,
    ) -> Result<(), ActionError> {
        if !ctx.workday_started {
            return Err(self.reject(ActionError::WorkdayClosed("update progress")));
        }
        let card = match self.store.get(card_id) {
            Some(card) => card,
            None => {
                let err = ActionError::CardNotFound(card_id);
                self.notifier
                    .error(&format!("Update progress failed: {}", err));
                return Err(err);
            }
        };
        if !ctx
            .capabilities
            .can_update_progress(card.assigned_to, ctx.profile_id)
        {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers or assigned users can update progress".to_string(),
            )));
        }

        let progress = progress.min(100);
        let result = mutate(
            || self.store.set_progress(card_id, progress),
            self.api
                .patch_card(&ctx.token, card_id, &CardPatch::progress(progress)),
            |previous| {
                if let Some(previous) = previous {
                    self.store.set_progress(card_id, previous);
                }
            },
        )
        .await;

        match result {
            Ok(updated) => {
                self.store.upsert(updated);
                self.notifier.success("Progress updated successfully");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Update progress"));
                Err(err.into())
            }
        }
    }

    /// Flip a card between complete (100) and not (0). Manager-only even for
    /// the assigned member; assignment grants progress updates, not this.
    pub async fn toggle_complete(&self, ctx: &BoardCtx, card_id: i64) -> Result<(), ActionError> {
        if !ctx.workday_started {
            return Err(self.reject(ActionError::WorkdayClosed("mark tasks complete")));
        }
        if !ctx.capabilities.can_force_complete {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can mark tasks complete".to_string(),
            )));
        }
        let card = match self.store.get(card_id) {
            Some(card) => card,
            None => {
                let err = ActionError::CardNotFound(card_id);
                self.notifier
                    .error(&format!("Toggle completion failed: {}", err));
                return Err(err);
            }
        };

        let target = if card.progress == 100 { 0 } else { 100 };
        let result = mutate(
            || self.store.set_progress(card_id, target),
            self.api
                .patch_card(&ctx.token, card_id, &CardPatch::progress(target)),
            |previous| {
                if let Some(previous) = previous {
                    self.store.set_progress(card_id, previous);
                }
            },
        )
        .await;

        match result {
            Ok(updated) => {
                self.store.upsert(updated);
                self.notifier.success(if target == 100 {
                    "Marked complete"
                } else {
                    "Marked incomplete"
                });
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Toggle completion"));
                Err(err.into())
            }
        }
    }

    /// Create a card in a lane. A card created straight into Done starts at
    /// progress 100.
    pub async fn create_card(
        &self,
        ctx: &BoardCtx,
        column: Column,
        title: &str,
        priority: Priority,
        deadline: Option<NaiveDate>,
        sprint: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Result<Card, ActionError> {
        if !ctx.capabilities.can_create_card {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can add tasks".to_string(),
            )));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(self.reject(ActionError::MissingField("Title")));
        }
        if let Some((start, finish)) = sprint {
            if finish < start {
                return Err(self.reject(ActionError::Invalid(
                    "Sprint finish must be after sprint start",
                )));
            }
        }

        let new_card = NewCard {
            team: ctx.team_id,
            title: title.to_string(),
            column,
            priority,
            deadline,
            progress: if column == Column::Done { 100 } else { 0 },
            sprint_start: sprint.map(|(start, _)| start),
            sprint_finish: sprint.map(|(_, finish)| finish),
        };
        match self.api.create_card(&ctx.token, &new_card).await {
            Ok(card) => {
                // merged into the shared store so every consumer sees it
                // without a separate fetch
                self.store.upsert(card.clone());
                self.notifier.success("Card created successfully");
                Ok(card)
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Create card"));
                Err(err.into())
            }
        }
    }

    /// Edit a card's title, priority, deadline and progress.
    pub async fn edit_card(
        &self,
        ctx: &BoardCtx,
        card_id: i64,
        title: &str,
        priority: Priority,
        deadline: Option<NaiveDate>,
        progress: u8,
    ) -> Result<(), ActionError> {
        if !ctx.capabilities.can_edit_card {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can edit tasks".to_string(),
            )));
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(self.reject(ActionError::MissingField("Title")));
        }
        if !self.store.contains(card_id) {
            let err = ActionError::CardNotFound(card_id);
            self.notifier.error(&format!("Update card failed: {}", err));
            return Err(err);
        }

        let patch = CardPatch {
            title: Some(title.to_string()),
            priority: Some(priority),
            deadline,
            progress: Some(progress.min(100)),
            ..CardPatch::default()
        };
        match self.api.patch_card(&ctx.token, card_id, &patch).await {
            Ok(updated) => {
                self.store.upsert(updated);
                self.notifier.success("Card updated successfully");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Update card"));
                Err(err.into())
            }
        }
    }

    /// Reschedule a card's sprint window.
    pub async fn edit_sprint(
        &self,
        ctx: &BoardCtx,
        card_id: i64,
        start: DateTime<Utc>,
        finish: DateTime<Utc>,
    ) -> Result<(), ActionError> {
        if !ctx.capabilities.can_edit_card {
            return Err(self.reject(ActionError::NotPermitted(
                "Only Project Managers can edit tasks".to_string(),
            )));
        }
        if finish < start {
            return Err(self.reject(ActionError::Invalid(
                "Sprint finish must be after sprint start",
            )));
        }
        if !self.store.contains(card_id) {
            let err = ActionError::CardNotFound(card_id);
            self.notifier.error(&format!("Update card failed: {}", err));
            return Err(err);
        }

        let patch = CardPatch {
            sprint_start: Some(start),
            sprint_finish: Some(finish),
            ..CardPatch::default()
        };
        match self.api.patch_card(&ctx.token, card_id, &patch).await {
            Ok(updated) => {
                self.store.upsert(updated);
                self.notifier.success("Card updated successfully");
                Ok(())
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Update card"));
                Err(err.into())
            }
        }
    }

    /// Move every card whose sprint window has closed back to Backlog.
    /// Returns how many cards were moved.
    pub async fn sweep_expired(&self, ctx: &BoardCtx) -> Result<usize, ActionError> {
        let now = Utc::now();
        let expired: Vec<Card> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|card| card.sprint_expired(now) && card.column != Column::Backlog)
            .collect();

        let mut moved = 0;
        for card in &expired {
            match self
                .api
                .patch_card(&ctx.token, card.id, &CardPatch::column(Column::Backlog))
                .await
            {
                Ok(updated) => {
                    self.store.upsert(updated);
                    moved += 1;
                }
                Err(err) => {
                    self.notifier
                        .error(&err.action_failed("Update expired tasks"));
                    return Err(err.into());
                }
            }
        }
        if moved > 0 {
            info!(moved, "expired sprint cards returned to backlog");
        }
        Ok(moved)
    }

    /// A 500 ms trailing-edge debouncer that settles slider values into
    /// [`Board::update_progress`] calls — one PATCH per settling point.
    pub fn progress_debouncer(self: &Arc<Self>, ctx: BoardCtx, card_id: i64) -> ProgressDebouncer {
        let board = Arc::clone(self);
        ProgressDebouncer::new(PROGRESS_DEBOUNCE, move |value| {
            let board = Arc::clone(&board);
            let ctx = ctx.clone();
            async move {
                let _ = board.update_progress(&ctx, card_id, value).await;
            }
        })
    }

    fn reject(&self, err: ActionError) -> ActionError {
        self.notifier.error(&err.to_string());
        err
    }
}
