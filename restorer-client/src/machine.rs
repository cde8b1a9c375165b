//! Client-side restoration flow.
//!
//! ```text
//! Idle ──▶ Uploading ──▶ Processing ──▶ Completed
//!              │              │
//!              └──────┬───────┘
//!                     ▼
//!                   Error
//! ```
//!
//! The poll flow uploads, then asks for status until the job completes.
//! The sync flow posts to `/restore` and completes with an inline image.

use std::time::Duration;

use restorer_core::{job::serve_url, BlobVariant, JobId, RestoreConfigSnapshot};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{ImageUpload, RestorerClient};
use crate::error::ClientError;

/// Where a restoration flow currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPhase {
    Idle,
    Uploading,
    Processing { id: Option<JobId> },
    Completed { id: Option<JobId>, image_url: String },
    Error { message: String },
}

impl ClientPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClientPhase::Completed { .. } | ClientPhase::Error { .. })
    }

    /// Whether moving to `next` follows the flow diagram.
    pub fn can_transition_to(&self, next: &ClientPhase) -> bool {
        use ClientPhase::*;
        match (self, next) {
            (_, Idle) => true,
            (Idle, Uploading) | (Idle, Processing { .. }) => true,
            (Uploading, Processing { .. }) => true,
            (Processing { .. }, Completed { .. }) => true,
            (Uploading, Error { .. }) | (Processing { .. }, Error { .. }) => true,
            _ => false,
        }
    }
}

/// Polling cadence and give-up rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Transport or HTTP failures in a row before the flow errors out.
    /// `processing` answers reset the count.
    pub max_consecutive_failures: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_consecutive_failures: 5,
        }
    }
}

impl PollPolicy {
    /// Read `client.poll_interval_ms` and `client.max_poll_failures`.
    pub fn from_config(config: &RestoreConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            interval: config
                .get_millis("client.poll_interval_ms")
                .unwrap_or(defaults.interval),
            max_consecutive_failures: config
                .get_u64("client.max_poll_failures")
                .and_then(|v| u32::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_consecutive_failures),
        }
    }
}

/// Drives one restoration at a time and publishes its phase.
pub struct RestorationFlow {
    client: RestorerClient,
    policy: PollPolicy,
    phase: watch::Sender<ClientPhase>,
    cancel: CancellationToken,
}

impl RestorationFlow {
    pub fn new(client: RestorerClient, policy: PollPolicy) -> Self {
        let (phase, _) = watch::channel(ClientPhase::Idle);
        Self {
            client,
            policy,
            phase,
            cancel: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> ClientPhase {
        self.phase.borrow().clone()
    }

    /// Token that stops the running flow when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Back to `Idle`, e.g. when the user picks another photo.
    pub fn reset(&mut self) {
        self.cancel = CancellationToken::new();
        self.transition(ClientPhase::Idle);
    }

    fn transition(&self, next: ClientPhase) {
        let current = self.phase();
        if !current.can_transition_to(&next) {
            warn!(from = ?current, to = ?next, "unexpected phase transition");
        }
        debug!(phase = ?next, "client phase");
        self.phase.send_replace(next);
    }

    fn fail(&self, err: ClientError) -> ClientError {
        self.transition(ClientPhase::Error {
            message: err.to_string(),
        });
        err
    }

    /// Upload, then poll status until completed. Returns the absolute URL of
    /// the result.
    pub async fn run_polling(&self, image: &ImageUpload) -> Result<String, ClientError> {
        self.transition(ClientPhase::Uploading);

        let id = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
            res = self.client.upload(image) => res.map_err(|e| self.fail(e))?,
        };

        self.transition(ClientPhase::Processing {
            id: Some(id.clone()),
        });
        self.poll_until_complete(id).await
    }

    async fn poll_until_complete(&self, id: JobId) -> Result<String, ClientError> {
        let mut failures = 0u32;
        let mut attempt = 0u64;

        loop {
            attempt += 1;
            let outcome = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
                res = self.client.status(&id) => res,
            };

            match outcome {
                Ok(report) if report.is_completed() => {
                    let url = report.image_url.unwrap_or_else(|| {
                        serve_url(self.client.api_prefix(), &id, BlobVariant::Result)
                    });
                    let image_url = self.client.resolve(&url);
                    info!(%id, attempt, "restoration completed");
                    self.transition(ClientPhase::Completed {
                        id: Some(id),
                        image_url: image_url.clone(),
                    });
                    return Ok(image_url);
                }
                Ok(_) => {
                    failures = 0;
                    debug!(%id, attempt, "still processing");
                }
                Err(err) if err.is_poll_failure() => {
                    failures += 1;
                    warn!(%id, attempt, failures, error = %err, "status check failed");
                    if failures >= self.policy.max_consecutive_failures {
                        return Err(self.fail(err));
                    }
                }
                Err(err) => return Err(self.fail(err)),
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }

    /// Post to `/restore`. Any failure is terminal. Returns the data URL.
    pub async fn run_sync(
        &self,
        image: &ImageUpload,
        prompt: Option<&str>,
    ) -> Result<String, ClientError> {
        self.transition(ClientPhase::Processing { id: None });

        let restored = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
            res = self.client.restore(image, prompt) => res.map_err(|e| self.fail(e))?,
        };

        self.transition(ClientPhase::Completed {
            id: None,
            image_url: restored.image_url.clone(),
        });
        Ok(restored.image_url)
    }
}
