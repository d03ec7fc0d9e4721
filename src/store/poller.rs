//! Periodic task refresh.
//!
//! A fetch is attempted only while the full dependency triple — verified
//! user, resolved profile name, selected team — holds; otherwise the store is
//! cleared, never left stale. The loop re-fetches immediately whenever the
//! dependencies change and then on a fixed 30-second cadence; a dependency
//! change tears the old interval down so nothing keeps fetching against a
//! stale team id.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::ApiClient;
use crate::identity::SessionResolver;
use crate::store::TaskStore;
use crate::ui::toast::Notifier;

pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// The fetch-guard triple. A fetch happens only when all three hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollDeps {
    pub verified: bool,
    pub name: Option<String>,
    pub team_id: Option<i64>,
}

impl PollDeps {
    /// `(team_id, name)` when every dependency is satisfied.
    pub fn ready(&self) -> Option<(i64, &str)> {
        if !self.verified {
            return None;
        }
        match (self.name.as_deref(), self.team_id) {
            (Some(name), Some(team_id)) if !name.is_empty() => Some((team_id, name)),
            _ => None,
        }
    }
}

/// One refresh pass. Incomplete dependencies or a missing token clear the
/// store and skip the network entirely; a failed fetch clears the store and
/// raises a toast with the server detail when present.
pub async fn refresh_tasks(
    store: &TaskStore,
    api: &ApiClient,
    token: Option<&str>,
    deps: &PollDeps,
    notifier: &dyn Notifier,
) {
    let Some((team_id, name)) = deps.ready() else {
        store.clear();
        return;
    };
    let Some(token) = token else {
        store.clear();
        return;
    };
    match api.list_cards(token, team_id, Some(name)).await {
        Ok(cards) => {
            debug!(count = cards.len(), team_id, "refreshed task list");
            store.replace(cards);
        }
        Err(err) => {
            notifier.error(&err.action_failed("Fetch tasks"));
            store.clear();
        }
    }
}

pub struct TaskPoller;

impl TaskPoller {
    /// Run the refresh loop until the dependency channel closes. The returned
    /// handle is aborted on shell shutdown; in-flight requests are not
    /// cancelled, their late results are simply dropped with the task.
    pub fn spawn(
        store: Arc<TaskStore>,
        api: ApiClient,
        session: Arc<SessionResolver>,
        notifier: Arc<dyn Notifier>,
        mut deps_rx: watch::Receiver<PollDeps>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let deps = deps_rx.borrow_and_update().clone();
                let token = session.id_token().await.ok();
                refresh_tasks(&store, &api, token.as_deref(), &deps, notifier.as_ref()).await;

                let mut interval = tokio::time::interval(POLL_INTERVAL);
                interval.tick().await; // consume the immediate first tick
                loop {
                    tokio::select! {
                        changed = deps_rx.changed() => {
                            match changed {
                                Ok(()) => break, // new deps: restart with a fresh interval
                                Err(_) => return, // shell gone: stop polling
                            }
                        }
                        _ = interval.tick() => {
                            let deps = deps_rx.borrow().clone();
                            let token = session.id_token().await.ok();
                            refresh_tasks(&store, &api, token.as_deref(), &deps, notifier.as_ref()).await;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::toast::MemoryNotifier;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn deps(verified: bool, name: Option<&str>, team_id: Option<i64>) -> PollDeps {
        PollDeps {
            verified,
            name: name.map(str::to_string),
            team_id,
        }
    }

    async fn serve(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(format!("http://{}", addr))
    }

    fn counting_router(hits: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/api/cards/",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    assert_eq!(params.get("team_id").map(String::as_str), Some("3"));
                    assert_eq!(params.get("assigned_to").map(String::as_str), Some("Dana"));
                    Json(serde_json::json!([
                        {"id": 1, "team": 3, "title": "a", "column": "todo", "priority": "Low"},
                        {"id": 2, "team": 3, "title": "b", "column": "doing", "priority": "High", "progress": 35}
                    ]))
                }
            }),
        )
    }

    #[test]
    fn test_deps_ready_requires_all_three() {
        assert!(deps(true, Some("Dana"), Some(3)).ready().is_some());
        assert!(deps(false, Some("Dana"), Some(3)).ready().is_none());
        assert!(deps(true, None, Some(3)).ready().is_none());
        assert!(deps(true, Some("Dana"), None).ready().is_none());
        assert!(deps(true, Some(""), Some(3)).ready().is_none());
    }

    #[tokio::test]
    async fn test_incomplete_deps_clear_without_fetching() {
        let hits = Arc::new(AtomicUsize::new(0));
        let api = serve(counting_router(hits.clone())).await;
        let store = TaskStore::new();
        let notifier = MemoryNotifier::new();
        store.replace(vec![]);

        refresh_tasks(
            &store,
            &api,
            Some("tok"),
            &deps(true, Some("Dana"), None),
            &notifier,
        )
        .await;
        assert!(store.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(notifier.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_list_and_is_idempotent() {
        let hits = Arc::new(AtomicUsize::new(0));
        let api = serve(counting_router(hits.clone())).await;
        let store = TaskStore::new();
        let notifier = MemoryNotifier::new();
        let all = deps(true, Some("Dana"), Some(3));

        refresh_tasks(&store, &api, Some("tok"), &all, &notifier).await;
        let first = store.snapshot();
        refresh_tasks(&store, &api, Some("tok"), &all, &notifier).await;
        let second = store.snapshot();

        // No server-side change: both passes see the identical list.
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_and_toasts_detail() {
        let api = serve(Router::new().route(
            "/api/cards/",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"detail": "team backlog unavailable"})),
                )
            }),
        ))
        .await;
        let store = TaskStore::new();
        store.replace(vec![]);
        let notifier = MemoryNotifier::new();

        refresh_tasks(
            &store,
            &api,
            Some("tok"),
            &deps(true, Some("Dana"), Some(3)),
            &notifier,
        )
        .await;
        assert!(store.is_empty());
        assert_eq!(
            notifier.errors(),
            vec!["Fetch tasks failed: team backlog unavailable".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_token_clears_without_fetching() {
        let hits = Arc::new(AtomicUsize::new(0));
        let api = serve(counting_router(hits.clone())).await;
        let store = TaskStore::new();
        let notifier = MemoryNotifier::new();

        refresh_tasks(
            &store,
            &api,
            None,
            &deps(true, Some("Dana"), Some(3)),
            &notifier,
        )
        .await;
        assert!(store.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
