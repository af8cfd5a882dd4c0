//! Image-to-video generation as a long-running job.
//!
//! Submission runs under credential rotation; the key that created the job
//! is then used for every poll and for the final download. The flow is
//! submit, poll every interval until the operation is done, then stream the
//! video to a local file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::StudioError;
use crate::gemini::types::{Operation, PredictLongRunningRequest, VideoInstance};
use crate::gemini::{Credential, UpstreamError};
use crate::media::InlineMedia;
use crate::prompts;
use crate::studio::Studio;

/// Default polling interval for job status (5 seconds).
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Prompt used when the caller gives none.
pub const DEFAULT_MOTION_PROMPT: &str = "Cinematic movement";

/// Status of a video job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoJobStatus {
    /// Still generating.
    Pending,
    /// Finished; the video can be fetched from `uri`.
    Done { uri: String },
    /// The provider reported a failure.
    Failed { error: String },
}

impl From<&Operation> for VideoJobStatus {
    fn from(operation: &Operation) -> Self {
        if let Some(error) = &operation.error {
            let message = error
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("operation error (code {:?})", error.code));
            return VideoJobStatus::Failed { error: message };
        }
        if !operation.done {
            return VideoJobStatus::Pending;
        }
        match operation.video_uri() {
            Some(uri) => VideoJobStatus::Done {
                uri: uri.to_string(),
            },
            None => VideoJobStatus::Failed {
                error: "No video URI returned".to_string(),
            },
        }
    }
}

/// A submitted job, bound to the credential that created it.
#[derive(Debug)]
pub struct VideoJob {
    name: String,
    credential: Credential,
    status: VideoJobStatus,
    polls: u32,
}

impl VideoJob {
    /// Provider operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &VideoJobStatus {
        &self.status
    }

    /// Status requests made so far.
    pub fn polls(&self) -> u32 {
        self.polls
    }
}

/// A downloaded video on local disk. Call [`VideoHandle::release`] when done.
#[derive(Debug)]
pub struct VideoHandle {
    path: PathBuf,
    size: u64,
}

impl VideoHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Move the video to `dest` and return its new location.
    pub fn persist(self, dest: &Path) -> Result<PathBuf, StudioError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if std::fs::rename(&self.path, dest).is_err() {
            std::fs::copy(&self.path, dest)?;
            std::fs::remove_file(&self.path)?;
        }
        Ok(dest.to_path_buf())
    }

    /// Delete the local file.
    pub fn release(self) -> Result<(), StudioError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Local file path for a job, unique per operation name.
fn video_path(media_dir: &Path, operation_name: &str) -> PathBuf {
    let digest = Sha256::digest(operation_name.as_bytes());
    media_dir.join(format!("{}.mp4", hex::encode(digest)))
}

/// Stream a response body into `dest` and return the bytes written.
async fn write_stream(response: reqwest::Response, dest: &Path) -> Result<u64, StudioError> {
    use futures_util::StreamExt;

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut size = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(UpstreamError::from)?;
        size += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(size)
}

impl Studio {
    /// Submit an image-to-video job. `image` is a data URL or bare base64.
    pub async fn submit_video_job(&self, image: &str, prompt: &str) -> Result<VideoJob, StudioError> {
        let image = InlineMedia::from_data_url(image)?;
        let prompt = match prompt.trim() {
            "" => DEFAULT_MOTION_PROMPT,
            p => p,
        };

        let request = PredictLongRunningRequest {
            instances: vec![VideoInstance {
                prompt: prompt.to_string(),
                image: Some(image.to_video_image()),
            }],
        };

        let client = self.client();
        let model = self.settings().models.video.as_str();
        let request = &request;
        let (credential, operation) = self
            .execute_with_rotation("Video submission", move |credential| async move {
                let operation = client.submit_video(&credential, model, request).await?;
                Ok::<_, StudioError>((credential, operation))
            })
            .await?;

        log::info!("Video job submitted: {}", operation.name);
        Ok(VideoJob {
            status: VideoJobStatus::from(&operation),
            name: operation.name,
            credential,
            polls: 0,
        })
    }

    /// Ask for the job's current state once, with the job's own credential.
    pub async fn poll_video_job(&self, job: &mut VideoJob) -> Result<VideoJobStatus, StudioError> {
        let operation = self
            .client()
            .get_operation(&job.credential, &job.name)
            .await?;
        job.polls += 1;
        job.status = VideoJobStatus::from(&operation);
        log::debug!("Video job {} poll {}: {:?}", job.name, job.polls, job.status);
        Ok(job.status.clone())
    }

    /// Poll until the job is done and return the video locator.
    ///
    /// Waits `poll_interval` before each poll. Ends early with
    /// [`StudioError::Cancelled`] when `cancel` fires, or with
    /// [`StudioError::PollTimeout`] once `max_wait` has elapsed.
    pub async fn wait_for_video(
        &self,
        job: &mut VideoJob,
        cancel: &CancellationToken,
    ) -> Result<String, StudioError> {
        let max_wait = self.settings().max_wait;
        let deadline = max_wait.map(|d| Instant::now() + d);
        let interval = self.settings().poll_interval;

        loop {
            match &job.status {
                VideoJobStatus::Done { uri } => {
                    log::info!("Video job {} done after {} poll(s)", job.name, job.polls);
                    return Ok(uri.clone());
                }
                VideoJobStatus::Failed { error } => {
                    log::error!("Video job {} failed: {}", job.name, error);
                    return Err(StudioError::JobFailed(error.clone()));
                }
                VideoJobStatus::Pending => {}
            }

            if cancel.is_cancelled() {
                return Err(StudioError::Cancelled);
            }

            let wake = match deadline {
                Some(deadline) => (Instant::now() + interval).min(deadline),
                None => Instant::now() + interval,
            };
            tokio::select! {
                _ = cancel.cancelled() => return Err(StudioError::Cancelled),
                _ = tokio::time::sleep_until(wake) => {}
            }

            if let (Some(deadline), Some(max_wait)) = (deadline, max_wait) {
                if Instant::now() >= deadline {
                    log::error!("Video job {} timed out after {:?}", job.name, max_wait);
                    return Err(StudioError::PollTimeout(max_wait));
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(StudioError::Cancelled),
                polled = self.poll_video_job(job) => { polled?; }
            }
        }
    }

    /// Stream the finished video to `media_dir`.
    pub async fn download_video(&self, job: &VideoJob, uri: &str) -> Result<VideoHandle, StudioError> {
        let dest = video_path(&self.settings().media_dir, &job.name);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.client().fetch_media(&job.credential, uri).await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            log::error!("Video download failed with status {}", status);
            return Err(StudioError::VideoDownloadFailed { status });
        }

        let size = match write_stream(response, &dest).await {
            Ok(size) => size,
            Err(e) => {
                log::error!("Video download interrupted: {}", e);
                if let Err(remove_err) = tokio::fs::remove_file(&dest).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("Failed to remove partial video {:?}: {}", dest, remove_err);
                    }
                }
                return Err(e);
            }
        };

        log::info!("Video downloaded to {:?} ({} bytes)", dest, size);
        Ok(VideoHandle { path: dest, size })
    }

    /// Turn a still image into a short video: submit, wait, download.
    pub async fn image_to_video(
        &self,
        image: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<VideoHandle, StudioError> {
        if cancel.is_cancelled() {
            return Err(StudioError::Cancelled);
        }
        let mut job = self.submit_video_job(image, prompt).await?;
        let uri = self.wait_for_video(&mut job, cancel).await?;
        if cancel.is_cancelled() {
            return Err(StudioError::Cancelled);
        }
        self.download_video(&job, &uri).await
    }

    /// Rewrite a rough idea into a detailed generation prompt.
    pub async fn optimize_video_prompt(&self, idea: &str) -> Result<String, StudioError> {
        prompts::validate_prompt(idea)?;
        let text = self
            .generate_text(
                "Optimize prompt",
                prompts::optimize_video_prompt(idea),
                false,
            )
            .await?;
        Ok(text.unwrap_or_default().trim().to_string())
    }
}
