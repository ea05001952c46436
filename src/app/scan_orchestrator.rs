use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app::config::deserialize_duration;
use crate::app::scan_backend::{ScanBackend, ScanBackendError};
use crate::domain::image_identity::ImageIdentity;
use crate::domain::scanresult::{scan_result::ScanResult, scan_status::ScanStatus};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub freshness: Duration,
    pub trigger_on_miss: bool,
    pub rescan_stale: bool,
    #[serde(deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
    #[serde(deserialize_with = "deserialize_duration")]
    pub max_poll_interval: Duration,
    pub backoff_multiplier: f64,
    pub max_attempts: u32,
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            freshness: Duration::from_secs(24 * 60 * 60),
            trigger_on_miss: true,
            rescan_stale: true,
            poll_interval: Duration::from_secs(5),
            max_poll_interval: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            max_attempts: 60,
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(
        "invalid image reference {0:?}, expected <registry-host>/<repository>[:<tag>]"
    )]
    InvalidIdentity(String),

    #[error(transparent)]
    Backend(#[from] ScanBackendError),

    #[error("scan of {identity} did not finish after {attempts} lookups in {elapsed:?}")]
    Timeout {
        identity: String,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("scan of {identity} was cancelled after {attempts} lookups")]
    Cancelled { identity: String, attempts: u32 },
}

const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Return,
    Trigger,
    Poll,
}

/// Stateless between calls, so one instance can serve concurrent scans of different images.
pub struct ScanOrchestrator<B: ?Sized> {
    backend: Arc<B>,
    config: OrchestratorConfig,
}

impl<B: ?Sized> Clone for ScanOrchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            config: self.config.clone(),
        }
    }
}

impl<B: ?Sized> ScanOrchestrator<B> {
    pub fn new(backend: Arc<B>, config: OrchestratorConfig) -> Self {
        Self { backend, config }
    }

    fn next_step(&self, result: &ScanResult, triggered: bool) -> Step {
        let freshness =
            chrono::Duration::from_std(self.config.freshness).unwrap_or(chrono::Duration::MAX);

        match result.status() {
            ScanStatus::Failed => Step::Return,
            ScanStatus::InProgress => Step::Poll,
            ScanStatus::NotFound if triggered => Step::Poll,
            ScanStatus::NotFound if self.config.trigger_on_miss => Step::Trigger,
            ScanStatus::NotFound => Step::Return,
            status @ ScanStatus::Complete { .. } if status.is_fresh_at(Utc::now(), freshness) => {
                Step::Return
            }
            ScanStatus::Complete { .. } if triggered => Step::Poll,
            ScanStatus::Complete { .. } if self.config.rescan_stale => Step::Trigger,
            ScanStatus::Complete { completed_at } => {
                warn!("returning stale scan completed at {completed_at}");
                Step::Return
            }
        }
    }
}

impl<B> ScanOrchestrator<B>
where
    B: ScanBackend + Send + Sync + ?Sized,
{
    pub async fn get_scan_result(&self, identity: &ImageIdentity) -> Result<ScanResult, ScanError> {
        self.get_scan_result_until_cancelled(identity, &CancellationToken::new())
            .await
    }

    /// Same as [`ScanOrchestrator::get_scan_result`], but gives up with [`ScanError::Cancelled`] as
    /// soon as `cancellation` fires. The backend scan itself is left running.
    pub async fn get_scan_result_until_cancelled(
        &self,
        identity: &ImageIdentity,
        cancellation: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        if !identity.is_valid() {
            return Err(ScanError::InvalidIdentity(identity.reference().to_string()));
        }

        let mut poll = PollCycle::new(identity, &self.config, cancellation);
        let mut triggered = false;

        loop {
            let result = poll.suspend(self.backend.lookup(identity)).await??;
            poll.attempts += 1;

            let step = self.next_step(&result, triggered);
            debug!(
                "lookup {} for {identity} returned {:?}, next step {step:?}",
                poll.attempts,
                result.status()
            );

            if step == Step::Return {
                info!("scan of {identity} resolved with {:?}", result.status());
                return Ok(result);
            }

            // A trigger needs at least one lookup left to observe it.
            if poll.attempts >= self.config.max_attempts {
                return Err(poll.timeout());
            }

            if step == Step::Trigger {
                info!("triggering scan of {identity}");
                poll.suspend(self.backend.trigger(identity)).await??;
                triggered = true;
            }

            let delay = poll.backoff.next_delay();
            poll.suspend(tokio::time::sleep(delay)).await?;
        }
    }
}

struct PollCycle<'a> {
    identity: &'a ImageIdentity,
    cancellation: &'a CancellationToken,
    started_at: Instant,
    deadline: Instant,
    attempts: u32,
    backoff: Backoff,
}

impl<'a> PollCycle<'a> {
    fn new(
        identity: &'a ImageIdentity,
        config: &OrchestratorConfig,
        cancellation: &'a CancellationToken,
    ) -> Self {
        let started_at = Instant::now();
        Self {
            identity,
            cancellation,
            started_at,
            deadline: started_at
                .checked_add(config.timeout)
                .unwrap_or_else(|| started_at + FAR_FUTURE),
            attempts: 0,
            backoff: Backoff::new(config),
        }
    }

    async fn suspend<F: Future>(&self, future: F) -> Result<F::Output, ScanError> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(ScanError::Cancelled {
                identity: self.identity.to_string(),
                attempts: self.attempts,
            }),
            _ = tokio::time::sleep_until(self.deadline) => Err(self.timeout()),
            output = future => Ok(output),
        }
    }

    fn timeout(&self) -> ScanError {
        ScanError::Timeout {
            identity: self.identity.to_string(),
            attempts: self.attempts,
            elapsed: self.started_at.elapsed(),
        }
    }
}

struct Backoff {
    next: Duration,
    max: Duration,
    multiplier: f64,
}

impl Backoff {
    fn new(config: &OrchestratorConfig) -> Self {
        Self {
            next: config.poll_interval.min(config.max_poll_interval),
            max: config.max_poll_interval,
            multiplier: config.backoff_multiplier.max(1.0),
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = Duration::try_from_secs_f64(self.next.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max)
            .min(self.max);
        with_jitter(delay)
    }
}

fn with_jitter(delay: Duration) -> Duration {
    let spread = u64::try_from(delay.as_millis() / 10).unwrap_or(u64::MAX);
    if spread == 0 {
        return delay;
    }
    delay.saturating_add(Duration::from_millis(rand::rng().random_range(0..=spread)))
}

#[cfg(test)]
mod tests {
    use super::{Backoff, OrchestratorConfig, with_jitter};
    use std::time::Duration;

    #[test]
    fn the_backoff_grows_until_the_max_interval() {
        let mut backoff = Backoff::new(&OrchestratorConfig {
            poll_interval: Duration::from_secs(1),
            max_poll_interval: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            ..Default::default()
        });

        let delays: Vec<_> = (0..5).map(|_| backoff.next_delay()).collect();

        assert!(delays[0] >= Duration::from_secs(1) && delays[0] <= Duration::from_millis(1100));
        assert!(delays[1] >= Duration::from_secs(2) && delays[1] <= Duration::from_millis(2200));
        assert!(delays[2] >= Duration::from_secs(4) && delays[2] <= Duration::from_millis(4400));
        assert!(delays[3] >= Duration::from_secs(5) && delays[3] <= Duration::from_millis(5500));
        assert!(delays[4] >= Duration::from_secs(5) && delays[4] <= Duration::from_millis(5500));
    }

    #[test]
    fn a_multiplier_below_one_keeps_a_fixed_interval() {
        let mut backoff = Backoff::new(&OrchestratorConfig {
            poll_interval: Duration::from_millis(5),
            max_poll_interval: Duration::from_secs(1),
            backoff_multiplier: 0.5,
            ..Default::default()
        });

        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
        assert_eq!(backoff.next_delay(), Duration::from_millis(5));
    }

    #[test]
    fn jitter_on_a_huge_delay_saturates() {
        assert_eq!(with_jitter(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn the_backoff_saturates_at_a_huge_max_interval() {
        let mut backoff = Backoff::new(&OrchestratorConfig {
            poll_interval: Duration::MAX,
            max_poll_interval: Duration::MAX,
            backoff_multiplier: 2.0,
            ..Default::default()
        });

        assert_eq!(backoff.next_delay(), Duration::MAX);
        assert_eq!(backoff.next_delay(), Duration::MAX);
    }
}
