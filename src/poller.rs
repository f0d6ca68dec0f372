//! Completion poller
//!
//! Probes the download URL at a fixed cadence until the processed file exists
//! or the attempt budget runs out. Probe failures never end the loop early: a
//! missing object and a transient network error look the same to us, so both
//! count as "not ready yet".

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;

/// Number of probes before giving up
pub const MAX_POLL_ATTEMPTS: u32 = 24;

/// Wait between two probes
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Something that can check whether a URL is retrievable
pub trait Probe {
    fn probe(&self, url: &str) -> impl Future<Output = Result<StatusCode>>;
}

/// Source of the wait between probes
pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

/// Real clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Attempt budget and cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_POLL_ATTEMPTS,
            interval: POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    /// Upper bound on time spent waiting, excluding probe latency
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// How polling ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The download URL answered 200
    Ready,
    /// Every attempt was used without a 200
    TimedOut,
}

/// Poll `url` until it answers 200 or `policy.max_attempts` probes were made.
///
/// `on_attempt` is called before each probe with the 1-based attempt number.
pub async fn wait_for_completion<P, S, F>(
    probe: &P,
    sleeper: &S,
    policy: PollPolicy,
    url: &str,
    mut on_attempt: F,
) -> Outcome
where
    P: Probe,
    S: Sleeper,
    F: FnMut(u32),
{
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            sleeper.sleep(policy.interval).await;
        }

        on_attempt(attempt);
        match probe.probe(url).await {
            Ok(StatusCode::OK) => {
                tracing::info!("Result available after {} attempt(s)", attempt);
                return Outcome::Ready;
            }
            Ok(status) => {
                tracing::debug!("Probe {}/{}: HTTP {}", attempt, policy.max_attempts, status);
            }
            Err(e) => {
                tracing::debug!(
                    "Probe {}/{} failed, treating as not ready: {:#}",
                    attempt,
                    policy.max_attempts,
                    e
                );
            }
        }
    }

    tracing::warn!(
        "Result not available after {} attempts",
        policy.max_attempts
    );
    Outcome::TimedOut
}
