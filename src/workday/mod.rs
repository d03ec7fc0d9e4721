//! The workday tracker: a per-user `Idle → Running → Idle` state machine with
//! a persisted cross-reload anchor.
//!
//! On start-up the tracker queries the most recent workday record; an open one
//! (no end time) resumes `Running` from its persisted start, so a reload or
//! crash never loses an open session. A new day may begin only when at least
//! 24 hours have passed since the previous start; violating attempts are
//! rejected with the remaining wait in whole minutes, rounded up.
//!
//! The tracker publishes a `started` flag the board consumes as the hard gate
//! for progress mutations.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tracing::info;

use crate::api::ApiClient;
use crate::api::models::{Card, WorkDay};
use crate::errors::WorkdayError;
use crate::ui::toast::Notifier;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkdayPhase {
    Idle,
    Running {
        workday_id: i64,
        started_at: DateTime<Utc>,
    },
}

#[derive(Debug)]
struct TimerState {
    phase: WorkdayPhase,
    last_start: Option<DateTime<Utc>>,
}

pub struct WorkdayTimer {
    api: ApiClient,
    notifier: Arc<dyn Notifier>,
    state: Mutex<TimerState>,
    started_tx: watch::Sender<bool>,
}

impl WorkdayTimer {
    pub fn new(api: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        let (started_tx, _) = watch::channel(false);
        Self {
            api,
            notifier,
            state: Mutex::new(TimerState {
                phase: WorkdayPhase::Idle,
                last_start: None,
            }),
            started_tx,
        }
    }

    /// The "workday started" flag the board consumes as its progress gate.
    pub fn started_flag(&self) -> watch::Receiver<bool> {
        self.started_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.lock().phase, WorkdayPhase::Running { .. })
    }

    pub fn phase(&self) -> WorkdayPhase {
        self.lock().phase.clone()
    }

    /// Elapsed time of the running session, recomputed from `now - start`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self.lock().phase {
            WorkdayPhase::Running { started_at, .. } => Some(now - started_at),
            WorkdayPhase::Idle => None,
        }
    }

    /// Whether a new day may start at `now`; `Err` carries the remaining wait
    /// in whole minutes, rounded up.
    pub fn can_start(&self, now: DateTime<Utc>) -> Result<(), i64> {
        let last_start = match self.lock().last_start {
            Some(last_start) => last_start,
            None => return Ok(()),
        };
        let elapsed = now - last_start;
        if elapsed >= cool_down() {
            return Ok(());
        }
        let remaining_ms = (cool_down() - elapsed).num_milliseconds();
        Err((remaining_ms + 60_000 - 1) / 60_000)
    }

    /// Query the latest workday record; resume `Running` when it is still
    /// open. Returns whether a session was resumed.
    pub async fn resume(&self, token: &str) -> Result<bool, WorkdayError> {
        let workdays = match self.api.list_workdays(token).await {
            Ok(workdays) => workdays,
            Err(err) => {
                self.notifier.error("Failed to check last workday");
                return Err(err.into());
            }
        };
        let latest = workdays.into_iter().max_by_key(|w| w.start_time);
        let Some(latest) = latest else {
            return Ok(false);
        };

        let mut state = self.lock();
        state.last_start = Some(latest.start_time);
        if latest.end_time.is_some() {
            return Ok(false);
        }
        state.phase = WorkdayPhase::Running {
            workday_id: latest.id,
            started_at: latest.start_time,
        };
        drop(state);
        self.started_tx.send_replace(true);
        self.notifier.info("Resumed active workday");
        Ok(true)
    }

    /// Start a new workday at `now`.
    pub async fn start(&self, token: &str, now: DateTime<Utc>) -> Result<WorkDay, WorkdayError> {
        if self.is_running() {
            let err = WorkdayError::AlreadyRunning;
            self.notifier.error(&err.to_string());
            return Err(err);
        }
        if let Err(minutes) = self.can_start(now) {
            let err = WorkdayError::CoolDown(minutes);
            self.notifier.error(&err.to_string());
            return Err(err);
        }

        match self.api.start_workday(token, now).await {
            Ok(workday) => {
                {
                    let mut state = self.lock();
                    state.phase = WorkdayPhase::Running {
                        workday_id: workday.id,
                        started_at: workday.start_time,
                    };
                    state.last_start = Some(workday.start_time);
                }
                self.started_tx.send_replace(true);
                info!(workday_id = workday.id, "workday started");
                self.notifier.success("Work day started!");
                Ok(workday)
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("Start workday"));
                Err(err.into())
            }
        }
    }

    /// End the running workday at `now`. The summary toast enumerates every
    /// visible task's progress.
    pub async fn end(
        &self,
        token: &str,
        now: DateTime<Utc>,
        tasks: &[Card],
    ) -> Result<String, WorkdayError> {
        let (workday_id, started_at) = match self.lock().phase {
            WorkdayPhase::Running {
                workday_id,
                started_at,
            } => (workday_id, started_at),
            WorkdayPhase::Idle => {
                let err = WorkdayError::NoActiveWorkday;
                self.notifier.error(&err.to_string());
                return Err(err);
            }
        };

        let working_hours = format_hms(now - started_at);
        match self
            .api
            .end_workday(token, workday_id, now, &working_hours)
            .await
        {
            Ok(_) => {
                self.lock().phase = WorkdayPhase::Idle;
                self.started_tx.send_replace(false);
                info!(workday_id, %working_hours, "workday ended");
                let message = format!(
                    "Your day has ended! Working hours: {}. Task Progress: {}",
                    working_hours,
                    progress_summary(tasks)
                );
                self.notifier.info(&message);
                Ok(message)
            }
            Err(err) => {
                self.notifier.error(&err.action_failed("End workday"));
                Err(err.into())
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerState> {
        self.state.lock().expect("workday state lock poisoned")
    }
}

fn cool_down() -> Duration {
    Duration::hours(24)
}

/// `HH:MM:SS`, hours uncapped, negative durations clamped to zero.
pub fn format_hms(elapsed: Duration) -> String {
    let total_seconds = elapsed.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60
    )
}

/// `"title: NN%"` per task, comma-separated; `"No tasks assigned"` when the
/// list is empty.
pub fn progress_summary(tasks: &[Card]) -> String {
    if tasks.is_empty() {
        return "No tasks assigned".to_string();
    }
    tasks
        .iter()
        .map(|task| {
            let title = if task.title.is_empty() {
                "Untitled"
            } else {
                &task.title
            };
            format!("{}: {}%", title, task.progress)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{Column, Priority};
    use crate::ui::toast::MemoryNotifier;
    use axum::http::StatusCode;
    use axum::routing::{get, patch, post};
    use axum::{Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn task(title: &str, progress: u8) -> Card {
        Card {
            id: 1,
            team: 3,
            title: title.to_string(),
            column: Column::Doing,
            priority: Priority::Medium,
            assigned_to: None,
            assigned_to_name: None,
            start_date: None,
            deadline: None,
            progress,
            sprint_start: None,
            sprint_finish: None,
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

    fn timer(api: ApiClient) -> (WorkdayTimer, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        (WorkdayTimer::new(api, notifier.clone()), notifier)
    }

    // ── formatting ───────────────────────────────────────────────────

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(Duration::seconds(0)), "00:00:00");
        assert_eq!(format_hms(Duration::seconds(59)), "00:00:59");
        assert_eq!(format_hms(Duration::seconds(3661)), "01:01:01");
        assert_eq!(format_hms(Duration::hours(25)), "25:00:00");
        assert_eq!(format_hms(Duration::seconds(-5)), "00:00:00");
    }

    #[test]
    fn test_progress_summary_joins_tasks() {
        let tasks = vec![task("Login page", 70), task("API wiring", 20)];
        assert_eq!(progress_summary(&tasks), "Login page: 70%, API wiring: 20%");
    }

    #[test]
    fn test_progress_summary_empty_list() {
        assert_eq!(progress_summary(&[]), "No tasks assigned");
    }

    #[test]
    fn test_progress_summary_untitled_fallback() {
        assert_eq!(progress_summary(&[task("", 5)]), "Untitled: 5%");
    }

    // ── cool-down ────────────────────────────────────────────────────

    #[test]
    fn test_can_start_with_no_history() {
        let (timer, _) = timer_offline();
        assert!(timer.can_start(Utc::now()).is_ok());
    }

    fn timer_offline() -> (WorkdayTimer, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        (
            WorkdayTimer::new(ApiClient::new("http://unused.invalid"), notifier.clone()),
            notifier,
        )
    }

    fn with_last_start(timer: &WorkdayTimer, last_start: DateTime<Utc>) {
        timer.lock().last_start = Some(last_start);
    }

    #[test]
    fn test_can_start_after_24_hours() {
        let (timer, _) = timer_offline();
        let now = Utc::now();
        with_last_start(&timer, now - Duration::hours(24));
        assert!(timer.can_start(now).is_ok());
    }

    #[test]
    fn test_cool_down_reports_ceiling_minutes() {
        let (timer, _) = timer_offline();
        let now = Utc::now();

        // 30 minutes remain exactly
        with_last_start(&timer, now - Duration::hours(23) - Duration::minutes(30));
        assert_eq!(timer.can_start(now), Err(30));

        // one extra millisecond of wait rounds up to 31
        with_last_start(
            &timer,
            now - Duration::hours(23) - Duration::minutes(30) + Duration::milliseconds(1),
        );
        assert_eq!(timer.can_start(now), Err(31));

        // 30 seconds remain: one minute
        with_last_start(
            &timer,
            now - Duration::hours(23) - Duration::minutes(59) - Duration::seconds(30),
        );
        assert_eq!(timer.can_start(now), Err(1));
    }

    #[tokio::test]
    async fn test_start_inside_cool_down_issues_no_network_call() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in = hits.clone();
        let api = serve(Router::new().route(
            "/api/workdays/",
            post(move || {
                let hits = hits_in.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    StatusCode::CREATED
                }
            }),
        ))
        .await;
        let (timer, notifier) = timer(api);
        let now = Utc::now();
        with_last_start(&timer, now - Duration::hours(22));

        let result = timer.start("tok", now).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "You can start a new workday after 120 minutes"
        );
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(
            notifier.errors(),
            vec!["You can start a new workday after 120 minutes".to_string()]
        );
    }

    // ── start / resume / end ─────────────────────────────────────────

    #[tokio::test]
    async fn test_start_success_enters_running_and_raises_flag() {
        let api = serve(Router::new().route(
            "/api/workdays/",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert!(body.get("start_time").is_some());
                Json(serde_json::json!({
                    "id": 11,
                    "start_time": body["start_time"],
                    "end_time": null
                }))
            }),
        ))
        .await;
        let (timer, notifier) = timer(api);
        let flag = timer.started_flag();

        let workday = timer.start("tok", Utc::now()).await.unwrap();
        assert_eq!(workday.id, 11);
        assert!(timer.is_running());
        assert!(*flag.borrow());
        assert!(notifier.messages().contains(&"Work day started!".to_string()));
    }

    #[tokio::test]
    async fn test_resume_reopens_latest_open_workday() {
        let start = Utc::now() - Duration::hours(2);
        let api = serve(Router::new().route(
            "/api/workdays/",
            get(move || async move {
                Json(serde_json::json!([
                    {"id": 4, "start_time": Utc::now() - Duration::days(3), "end_time": Utc::now() - Duration::days(3) + Duration::hours(8)},
                    {"id": 9, "start_time": start, "end_time": null}
                ]))
            }),
        ))
        .await;
        let (timer, notifier) = timer(api);

        let resumed = timer.resume("tok").await.unwrap();
        assert!(resumed);
        assert!(timer.is_running());
        let elapsed = timer.elapsed(Utc::now()).unwrap();
        assert!(elapsed >= Duration::hours(2));
        assert!(
            notifier
                .messages()
                .contains(&"Resumed active workday".to_string())
        );
    }

    #[tokio::test]
    async fn test_resume_with_closed_latest_stays_idle_but_tracks_cool_down() {
        let start = Utc::now() - Duration::hours(3);
        let api = serve(Router::new().route(
            "/api/workdays/",
            get(move || async move {
                Json(serde_json::json!([
                    {"id": 9, "start_time": start, "end_time": start + Duration::hours(8), "working_hours": "08:00:00"}
                ]))
            }),
        ))
        .await;
        let (timer, _notifier) = timer(api);

        let resumed = timer.resume("tok").await.unwrap();
        assert!(!resumed);
        assert!(!timer.is_running());
        // the closed record still anchors the 24h cool-down
        assert!(timer.can_start(Utc::now()).is_err());
    }

    #[tokio::test]
    async fn test_resume_with_no_records() {
        let api = serve(Router::new().route(
            "/api/workdays/",
            get(|| async { Json(serde_json::json!([])) }),
        ))
        .await;
        let (timer, _notifier) = timer(api);
        assert!(!timer.resume("tok").await.unwrap());
        assert!(timer.can_start(Utc::now()).is_ok());
    }

    #[tokio::test]
    async fn test_end_patches_hours_and_summarizes_tasks() {
        let start = Utc::now() - Duration::hours(1);
        let api = serve(
            Router::new()
                .route(
                    "/api/workdays/",
                    get(move || async move {
                        Json(serde_json::json!([{"id": 9, "start_time": start, "end_time": null}]))
                    }),
                )
                .route(
                    "/api/workdays/{id}/",
                    patch(|Json(body): Json<serde_json::Value>| async move {
                        let hours = body["working_hours"].as_str().unwrap();
                        assert!(hours.starts_with("01:00:0"), "unexpected hours {hours}");
                        assert!(body.get("end_time").is_some());
                        Json(serde_json::json!({
                            "id": 9,
                            "start_time": Utc::now() - Duration::hours(1),
                            "end_time": Utc::now(),
                            "working_hours": hours
                        }))
                    }),
                ),
        )
        .await;
        let (timer, _notifier) = timer(api);
        timer.resume("tok").await.unwrap();
        let flag = timer.started_flag();

        let tasks = vec![task("Login page", 70), task("API wiring", 20)];
        let message = timer.end("tok", Utc::now(), &tasks).await.unwrap();
        assert!(message.starts_with("Your day has ended! Working hours: 01:00:0"));
        assert!(message.ends_with("Task Progress: Login page: 70%, API wiring: 20%"));
        assert!(!timer.is_running());
        assert!(!*flag.borrow());
    }

    #[tokio::test]
    async fn test_end_without_running_session() {
        let (timer, notifier) = timer_offline();
        let err = timer.end("tok", Utc::now(), &[]).await.unwrap_err();
        assert!(matches!(err, WorkdayError::NoActiveWorkday));
        assert_eq!(
            notifier.errors(),
            vec!["No active workday to end".to_string()]
        );
    }

    #[tokio::test]
    async fn test_end_failure_keeps_running() {
        let start = Utc::now() - Duration::hours(1);
        let api = serve(
            Router::new()
                .route(
                    "/api/workdays/",
                    get(move || async move {
                        Json(serde_json::json!([{"id": 9, "start_time": start, "end_time": null}]))
                    }),
                )
                .route(
                    "/api/workdays/{id}/",
                    patch(|| async {
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(serde_json::json!({"detail": "clock skew"})),
                        )
                    }),
                ),
        )
        .await;
        let (timer, notifier) = timer(api);
        timer.resume("tok").await.unwrap();

        assert!(timer.end("tok", Utc::now(), &[]).await.is_err());
        assert!(timer.is_running());
        assert!(
            notifier
                .errors()
                .contains(&"End workday failed: clock skew".to_string())
        );
    }

    #[tokio::test]
    async fn test_start_while_running_is_rejected() {
        let api = serve(Router::new().route(
            "/api/workdays/",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({"id": 1, "start_time": body["start_time"], "end_time": null}))
            }),
        ))
        .await;
        let (timer, _notifier) = timer(api);
        timer.start("tok", Utc::now()).await.unwrap();

        let err = timer.start("tok", Utc::now()).await.unwrap_err();
        assert!(matches!(err, WorkdayError::AlreadyRunning));
    }
}
