//! Trailing-edge debounce for progress slider values.
//!
//! A slider drag produces a burst of intermediate values; only the final one
//! matters. Values submitted within the window supersede each other, and the
//! sink runs once per settling point with the last value — never once per
//! intermediate step.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// The settling window for progress updates.
pub const PROGRESS_DEBOUNCE: Duration = Duration::from_millis(500);

pub struct ProgressDebouncer {
    tx: mpsc::UnboundedSender<u8>,
    handle: JoinHandle<()>,
}

impl ProgressDebouncer {
    pub fn new<F, Fut>(window: Duration, sink: F) -> Self
    where
        F: Fn(u8) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<u8>();
        let handle = tokio::spawn(async move {
            let mut pending: Option<u8> = None;
            loop {
                match pending {
                    None => match rx.recv().await {
                        Some(value) => pending = Some(value),
                        None => return,
                    },
                    Some(value) => match tokio::time::timeout(window, rx.recv()).await {
                        // a newer value supersedes the pending one
                        Ok(Some(newer)) => pending = Some(newer),
                        // channel closed: flush what we have and stop
                        Ok(None) => {
                            sink(value).await;
                            return;
                        }
                        // window elapsed with no newer value: settle
                        Err(_) => {
                            sink(value).await;
                            pending = None;
                        }
                    },
                }
            }
        });
        Self { tx, handle }
    }

    /// Record a slider value. Cheap; never blocks.
    pub fn submit(&self, value: u8) {
        let _ = self.tx.send(value);
    }

    /// Close the debouncer, flushing a still-pending value before returning.
    pub async fn close(self) {
        drop(self.tx);
        let _ = self.handle.await;
    }
}
