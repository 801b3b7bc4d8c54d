//! Remote asset lifecycle tracking.
//!
//! One job owns one remote asset: upload it (or adopt an existing handle),
//! poll until the service's state machine reaches a terminal state, answer
//! generation requests against it, and delete it on the way out. The delete
//! fires on every exit path — success, failure, or cancellation — unless
//! the handle was adopted, in which case its creator keeps delete
//! responsibility.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use reel_models::estimate::{human_bytes, human_duration, EtaEstimator};

use crate::backoff::{BackoffConfig, SystemJitter};
use crate::error::{ClientError, ClientResult};
use crate::remote::{FileState, GenerateOptions, RemoteFile, RemoteMedia};
use crate::retry::with_retry;

/// Job tracker configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// How often to poll the remote state while processing.
    pub poll_interval: Duration,
    /// Backoff policy for the upload and generation calls.
    pub backoff: BackoffConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            backoff: BackoffConfig::default(),
        }
    }
}

impl JobConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(
                std::env::var("REEL_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            backoff: BackoffConfig::from_env(),
        }
    }
}

/// Where the job's asset comes from.
#[derive(Debug, Clone)]
pub enum AssetSource {
    /// Upload fresh bytes; the job owns the remote asset and deletes it.
    Upload {
        bytes: Vec<u8>,
        mime_type: String,
        display_name: String,
    },
    /// Adopt an already-uploaded handle; the creator keeps delete
    /// responsibility.
    Reuse { name: String },
}

/// The asset a job currently tracks.
#[derive(Debug, Clone)]
pub struct TrackedAsset {
    pub file: RemoteFile,
    /// Whether this job performed the upload (and therefore the delete).
    pub owns_upload: bool,
    pub size_bytes: u64,
    /// Recorded once the upload completes; absent for adopted handles.
    pub upload_duration: Option<Duration>,
}

/// Lifecycle tracker for one remote asset.
///
/// The asset handle is exclusively owned by this tracker for the job's
/// duration; no two trackers may address the same handle concurrently
/// except through [`AssetSource::Reuse`].
pub struct VideoJob<'a, R: RemoteMedia + ?Sized> {
    remote: &'a R,
    config: JobConfig,
    cancel: watch::Receiver<bool>,
    asset: Option<TrackedAsset>,
}

impl<'a, R: RemoteMedia + ?Sized> VideoJob<'a, R> {
    /// Create a tracker with no asset yet.
    pub fn new(remote: &'a R, config: JobConfig, cancel: watch::Receiver<bool>) -> Self {
        Self {
            remote,
            config,
            cancel,
            asset: None,
        }
    }

    /// The tracked asset, once acquired.
    pub fn asset(&self) -> Option<&TrackedAsset> {
        self.asset.as_ref()
    }

    /// Acquire the remote asset: upload fresh bytes (with retry) or adopt
    /// an existing handle at whatever state the service reports.
    pub async fn acquire(&mut self, source: AssetSource) -> ClientResult<()> {
        if *self.cancel.borrow() {
            return Err(ClientError::Cancelled);
        }

        match source {
            AssetSource::Upload {
                bytes,
                mime_type,
                display_name,
            } => {
                let size_bytes = bytes.len() as u64;
                let remote = self.remote;
                let cancel = self.cancel.clone();
                let started = Instant::now();

                info!(
                    display_name = %display_name,
                    size = %human_bytes(size_bytes),
                    "uploading asset"
                );

                let upload = with_retry(&self.config.backoff, &SystemJitter, "upload", || {
                    let bytes = bytes.clone();
                    let mime_type = mime_type.clone();
                    let display_name = display_name.clone();
                    async move { remote.upload(bytes, &mime_type, &display_name).await }
                });

                let file = tokio::select! {
                    result = upload => result?,
                    _ = wait_for_cancel(cancel) => return Err(ClientError::Cancelled),
                };

                let upload_duration = started.elapsed();
                info!(
                    file = %file.name,
                    took = %human_duration(upload_duration),
                    "upload complete"
                );

                self.asset = Some(TrackedAsset {
                    file,
                    owns_upload: true,
                    size_bytes,
                    upload_duration: Some(upload_duration),
                });
            }
            AssetSource::Reuse { name } => {
                let file = self.remote.get_file(&name).await?;
                info!(file = %file.name, "adopting existing remote asset");
                self.asset = Some(TrackedAsset {
                    file,
                    owns_upload: false,
                    size_bytes: 0,
                    upload_duration: None,
                });
            }
        }

        Ok(())
    }

    /// Poll the remote state machine until it reaches a terminal state.
    ///
    /// Poll failures surface immediately rather than being retried: an
    /// infinite poll loop masking a dead dependency is a correctness
    /// hazard worth surfacing. `Failed` is always fatal.
    pub async fn wait_until_ready(&mut self) -> ClientResult<()> {
        let remote = self.remote;
        let poll_interval = self.config.poll_interval;
        let cancel = self.cancel.clone();
        let asset = self
            .asset
            .as_mut()
            .ok_or_else(|| ClientError::rejected("no asset acquired"))?;

        let mut eta = EtaEstimator::seed(asset.size_bytes, asset.upload_duration);
        let started = Instant::now();

        loop {
            match asset.file.state {
                FileState::Active => {
                    info!(
                        file = %asset.file.name,
                        took = %human_duration(started.elapsed()),
                        "processing complete"
                    );
                    return Ok(());
                }
                FileState::Failed => {
                    return Err(ClientError::ProcessingFailed(asset.file.failure_message()));
                }
                FileState::Processing | FileState::Unknown => {}
            }

            let snapshot = eta.revise(started.elapsed());
            debug!(
                elapsed = %human_duration(snapshot.elapsed),
                remaining = %human_duration(snapshot.remaining()),
                "processing"
            );

            tokio::select! {
                _ = wait_for_cancel(cancel.clone()) => return Err(ClientError::Cancelled),
                _ = tokio::time::sleep(poll_interval) => {}
            }

            asset.file = remote.get_file(&asset.file.name).await?;
        }
    }

    /// Run a generation request against the processed asset, with retry.
    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> ClientResult<String> {
        let asset = self
            .asset
            .as_ref()
            .ok_or_else(|| ClientError::rejected("no asset acquired"))?;
        let remote = self.remote;
        let file = &asset.file;

        let generation = with_retry(&self.config.backoff, &SystemJitter, "generate", || {
            remote.generate(file, prompt, options)
        });

        tokio::select! {
            result = generation => result,
            _ = wait_for_cancel(self.cancel.clone()) => Err(ClientError::Cancelled),
        }
    }

    /// Best-effort remote delete for assets this job uploaded.
    ///
    /// Failures are logged and swallowed; they must never mask the
    /// primary result.
    pub async fn teardown(&mut self) {
        if let Some(asset) = self.asset.take() {
            if !asset.owns_upload {
                return;
            }
            match self.remote.delete_file(&asset.file.name).await {
                Ok(()) => debug!(file = %asset.file.name, "deleted remote asset"),
                Err(e) => warn!(file = %asset.file.name, "failed to delete remote asset: {}", e),
            }
        }
    }
}

/// Resolve once the cancellation signal is raised; never resolve otherwise.
async fn wait_for_cancel(mut cancel: watch::Receiver<bool>) {
    if *cancel.borrow() {
        return;
    }
    while cancel.changed().await.is_ok() {
        if *cancel.borrow() {
            return;
        }
    }
    // Sender dropped without cancelling; cancellation can no longer happen.
    std::future::pending::<()>().await;
}

/// Run the full upload → wait → generate sequence with guaranteed teardown.
///
/// The remote delete fires on every exit path, including cancellation,
/// before the primary result propagates.
pub async fn run_job<R>(
    remote: &R,
    config: JobConfig,
    cancel: watch::Receiver<bool>,
    source: AssetSource,
    prompt: &str,
    options: &GenerateOptions,
) -> ClientResult<String>
where
    R: RemoteMedia + ?Sized,
{
    let mut job = VideoJob::new(remote, config, cancel);

    let result = async {
        job.acquire(source).await?;
        job.wait_until_ready().await?;
        job.generate(prompt, options).await
    }
    .await;

    job.teardown().await;
    result
}
