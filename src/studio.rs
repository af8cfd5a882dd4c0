//! The studio context: HTTP client, credentials, and tunables.
//!
//! Every generation operation is a method on [`Studio`]. The struct is cheap
//! to clone, so background work (the per-scene image loop) owns its own copy.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StudioError;
use crate::gemini::types::{GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::gemini::{self, Credential, CredentialStore, GeminiClient, RetryPolicy};
use crate::story::RunId;

/// Delay before each per-scene image request (1 second).
pub const DEFAULT_SCENE_PACING: Duration = Duration::from_millis(1000);

/// Language narrations and scripts are written in.
pub const DEFAULT_LANGUAGE: &str = "Indonesian";

/// Prebuilt voice used for narration.
pub const DEFAULT_VOICE: &str = "Kore";

/// Model identifiers per modality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSet {
    pub text: String,
    pub image: String,
    pub speech: String,
    pub video: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            text: "gemini-2.5-flash".to_string(),
            image: "gemini-2.5-flash-image".to_string(),
            speech: "gemini-2.5-flash-preview-tts".to_string(),
            video: "veo-3.1-fast-generate-preview".to_string(),
        }
    }
}

/// Tunables for a [`Studio`].
#[derive(Debug, Clone)]
pub struct StudioSettings {
    pub models: ModelSet,
    /// Retry budget per credential during rotation.
    pub retry: RetryPolicy,
    pub scene_pacing: Duration,
    pub poll_interval: Duration,
    /// Give up on a video job after this long. `None` waits indefinitely.
    pub max_wait: Option<Duration>,
    pub language: String,
    pub voice: String,
    /// Where downloaded videos are written.
    pub media_dir: PathBuf,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            models: ModelSet::default(),
            retry: RetryPolicy::default(),
            scene_pacing: DEFAULT_SCENE_PACING,
            poll_interval: crate::video::DEFAULT_POLL_INTERVAL,
            max_wait: None,
            language: DEFAULT_LANGUAGE.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            media_dir: default_media_dir(),
        }
    }
}

/// `<tmp>/storyforge/videos`.
pub fn default_media_dir() -> PathBuf {
    std::env::temp_dir().join("storyforge").join("videos")
}

/// Orchestration context for all generation operations.
#[derive(Debug, Clone)]
pub struct Studio {
    client: GeminiClient,
    credentials: CredentialStore,
    settings: StudioSettings,
    runs: Arc<AtomicU64>,
}

impl Studio {
    /// Studio against the public Gemini endpoint.
    pub fn new(credentials: CredentialStore, settings: StudioSettings) -> Result<Self, StudioError> {
        Ok(Self::with_client(GeminiClient::new()?, credentials, settings))
    }

    pub fn with_client(
        client: GeminiClient,
        credentials: CredentialStore,
        settings: StudioSettings,
    ) -> Self {
        Self {
            client,
            credentials,
            settings,
            runs: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the user credentials wholesale. Calls already in flight keep
    /// the candidate list they started with.
    pub fn configure<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.credentials = self.credentials.reconfigure(keys);
        log::info!(
            "Configured {} API key(s)",
            self.credentials.user_credentials().len()
        );
    }

    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn settings(&self) -> &StudioSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut StudioSettings {
        &mut self.settings
    }

    /// Allocate a fresh pipeline run identifier.
    pub fn next_run_id(&self) -> RunId {
        RunId(self.runs.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Run `operation` under credential rotation, using a snapshot of the
    /// current candidates.
    pub async fn execute_with_rotation<T, F, Fut>(
        &self,
        label: &str,
        operation: F,
    ) -> Result<T, StudioError>
    where
        F: FnMut(Credential) -> Fut,
        Fut: Future<Output = Result<T, StudioError>>,
    {
        let candidates = self.credentials.candidates();
        gemini::execute_with_rotation(&candidates, &self.settings.retry, label, operation).await
    }

    /// One `generateContent` call under rotation.
    pub(crate) async fn generate(
        &self,
        label: &str,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, StudioError> {
        let client = &self.client;
        self.execute_with_rotation(label, move |credential| async move {
            client
                .generate_content(&credential, model, request)
                .await
                .map_err(StudioError::from)
        })
        .await
    }

    /// Text-model call returning the answer text, if any.
    pub(crate) async fn generate_text(
        &self,
        label: &str,
        prompt: String,
        json: bool,
    ) -> Result<Option<String>, StudioError> {
        let mut request = GenerateContentRequest::text(prompt);
        if json {
            request = request.with_config(GenerationConfig::json());
        }
        let response = self
            .generate(label, &self.settings.models.text, &request)
            .await?;
        Ok(response.text())
    }
}
