//! Bounded polling

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready(T),
    TimedOut,
    Cancelled,
}

/// Calls `check` every `interval` until it yields a value, `timeout`
/// elapses, or `cancel` fires. The check runs at least once; a check error
/// ends the wait immediately. A check still pending at the deadline counts
/// as a timeout.
pub async fn poll_until<T, E, F, Fut>(
    interval: Duration,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
    mut check: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Ok(PollOutcome::Cancelled);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        let checked = match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Ok(PollOutcome::Cancelled),
                    checked = tokio::time::timeout(remaining, check()) => checked,
                }
            }
            None => tokio::time::timeout(remaining, check()).await,
        };
        match checked {
            Ok(result) => {
                if let Some(value) = result? {
                    return Ok(PollOutcome::Ready(value));
                }
            }
            Err(_) => return Ok(PollOutcome::TimedOut),
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::TimedOut);
        }
        let nap = interval.min(deadline - now);
        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Ok(PollOutcome::Cancelled),
                    _ = tokio::time::sleep(nap) => {}
                }
            }
            None => tokio::time::sleep(nap).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[tokio::test(start_paused = true)]
    async fn returns_first_ready_value() {
        let mut calls = 0;
        let outcome = poll_until(Duration::from_millis(100), Duration::from_secs(5), None, || {
            calls += 1;
            let value = (calls == 3).then_some(calls);
            async move { Ok::<_, Infallible>(value) }
        })
        .await
        .unwrap();
        assert_eq!(outcome, PollOutcome::Ready(3));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_the_deadline() {
        let started = Instant::now();
        let outcome = poll_until(
            Duration::from_millis(300),
            Duration::from_secs(1),
            None,
            || async { Ok::<Option<()>, Infallible>(None) },
        )
        .await
        .unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut);
        assert!(started.elapsed() <= Duration::from_millis(1_050));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            trigger.cancel();
        });
        let outcome = poll_until(
            Duration::from_secs(1),
            Duration::from_secs(60),
            Some(&token),
            || async { Ok::<Option<()>, Infallible>(None) },
        )
        .await
        .unwrap();
        assert_eq!(outcome, PollOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_check_is_cut_off_at_the_deadline() {
        let started = Instant::now();
        let outcome = poll_until(
            Duration::from_millis(100),
            Duration::from_secs(2),
            None,
            || async {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                Ok::<Option<()>, Infallible>(Some(()))
            },
        )
        .await
        .unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut);
        assert!(started.elapsed() <= Duration::from_millis(2_050));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_stalled_check() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let outcome = poll_until(
            Duration::from_millis(100),
            Duration::from_secs(60),
            Some(&token),
            std::future::pending::<Result<Option<()>, Infallible>>,
        )
        .await
        .unwrap();
        assert_eq!(outcome, PollOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn check_errors_propagate() {
        let result: Result<PollOutcome<()>, &str> =
            poll_until(Duration::from_millis(1), Duration::from_secs(1), None, || async {
                Err("driver gone")
            })
            .await;
        assert_eq!(result, Err("driver gone"));
    }
}
