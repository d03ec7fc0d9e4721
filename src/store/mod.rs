//! The task store: the single owner of the canonical card list.
//!
//! Every consumer — board, workday tracker, CLI views — reads snapshots and
//! requests changes through named mutation methods; nothing holds a reference
//! into the list. Races between concurrent mutations are therefore visible as
//! method-call sequences, and the periodic poll (which replaces the whole
//! list) is the consistency mechanism of record: the later write wins at the
//! list level.

pub mod optimistic;
pub mod poller;

use std::sync::Mutex;

use tokio::sync::watch;

use crate::api::models::{Card, Column};

pub use optimistic::mutate;
pub use poller::{PollDeps, TaskPoller, refresh_tasks};

pub struct TaskStore {
    cards: Mutex<Vec<Card>>,
    tx: watch::Sender<Vec<Card>>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            cards: Mutex::new(Vec::new()),
            tx,
        }
    }

    /// Change notifications; receivers get the full list on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Card>> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> Vec<Card> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, card_id: i64) -> Option<Card> {
        self.lock().iter().find(|c| c.id == card_id).cloned()
    }

    pub fn contains(&self, card_id: i64) -> bool {
        self.lock().iter().any(|c| c.id == card_id)
    }

    /// Replace the whole list (poll result or board refresh).
    pub fn replace(&self, cards: Vec<Card>) {
        *self.lock() = cards;
        self.publish();
    }

    /// Reset to empty — the required state after any failed fetch, so a stale
    /// or partial list is never shown.
    pub fn clear(&self) {
        self.lock().clear();
        self.publish();
    }

    /// Set a card's column, returning the previous value for rollback.
    pub fn set_column(&self, card_id: i64, column: Column) -> Option<Column> {
        let previous = {
            let mut cards = self.lock();
            let card = cards.iter_mut().find(|c| c.id == card_id)?;
            std::mem::replace(&mut card.column, column)
        };
        self.publish();
        Some(previous)
    }

    /// Set a card's progress, returning the previous value for rollback.
    pub fn set_progress(&self, card_id: i64, progress: u8) -> Option<u8> {
        let previous = {
            let mut cards = self.lock();
            let card = cards.iter_mut().find(|c| c.id == card_id)?;
            std::mem::replace(&mut card.progress, progress)
        };
        self.publish();
        Some(previous)
    }

    /// Set a card's assignee, returning the previous value for rollback.
    pub fn set_assignee(&self, card_id: i64, assignee: Option<i64>) -> Option<Option<i64>> {
        let previous = {
            let mut cards = self.lock();
            let card = cards.iter_mut().find(|c| c.id == card_id)?;
            std::mem::replace(&mut card.assigned_to, assignee)
        };
        self.publish();
        Some(previous)
    }

    /// Remove a card, returning it with its position so a failed delete can
    /// put it back where it was.
    pub fn remove(&self, card_id: i64) -> Option<(usize, Card)> {
        let removed = {
            let mut cards = self.lock();
            let index = cards.iter().position(|c| c.id == card_id)?;
            Some((index, cards.remove(index)))
        };
        self.publish();
        removed
    }

    /// Re-insert a card at its former position (clamped if the list shrank).
    pub fn insert_at(&self, index: usize, card: Card) {
        {
            let mut cards = self.lock();
            let index = index.min(cards.len());
            cards.insert(index, card);
        }
        self.publish();
    }

    /// Merge a created or server-updated record: replaces the card in place,
    /// or appends it when new. Keeps every consumer current without a refetch.
    pub fn upsert(&self, card: Card) {
        {
            let mut cards = self.lock();
            match cards.iter_mut().find(|c| c.id == card.id) {
                Some(existing) => *existing = card,
                None => cards.push(card),
            }
        }
        self.publish();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Card>> {
        self.cards.lock().expect("task store lock poisoned")
    }

    fn publish(&self) {
        self.tx.send_replace(self.lock().clone());
    }
}
