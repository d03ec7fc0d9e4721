//! The optimistic-mutation shape, factored once.
//!
//! Move, delete, assign and progress all follow the same contract: apply the
//! change locally, confirm it over the network, and revert to the snapshot if
//! the confirmation fails. `apply` returns whatever the revert needs (the
//! previous column, the removed card and its position); `revert` runs only on
//! failure.

use std::future::Future;

/// Snapshot → apply → confirm-or-revert.
pub async fn mutate<S, T, E, Fut>(
    apply: impl FnOnce() -> S,
    confirm: Fut,
    revert: impl FnOnce(S),
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let snapshot = apply();
    match confirm.await {
        Ok(value) => Ok(value),
        Err(err) => {
            revert(snapshot);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_success_keeps_applied_state() {
        let value = Cell::new(0);
        let result: Result<&str, &str> = mutate(
            || {
                let previous = value.get();
                value.set(10);
                previous
            },
            async { Ok("confirmed") },
            |previous| value.set(previous),
        )
        .await;
        assert_eq!(result, Ok("confirmed"));
        assert_eq!(value.get(), 10);
    }

    #[tokio::test]
    async fn test_failure_reverts_to_snapshot() {
        let value = Cell::new(3);
        let result: Result<(), &str> = mutate(
            || {
                let previous = value.get();
                value.set(10);
                previous
            },
            async { Err("server said no") },
            |previous| value.set(previous),
        )
        .await;
        assert_eq!(result, Err("server said no"));
        assert_eq!(value.get(), 3);
    }

    #[tokio::test]
    async fn test_apply_runs_before_confirm() {
        // The optimistic update must be observable while the confirmation is
        // still in flight.
        let value = Cell::new(0);
        let _: Result<(), ()> = mutate(
            || value.set(1),
            async {
                assert_eq!(value.get(), 1);
                Ok(())
            },
            |_| value.set(0),
        )
        .await;
    }
}
