//! Shared helpers for the mock HTTP integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use storyforge::gemini::{CredentialStore, GeminiClient, RetryPolicy};
use storyforge::{Studio, StudioSettings};
use wiremock::MockServer;

pub const TEXT_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";
pub const IMAGE_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";
pub const SPEECH_PATH: &str = "/v1beta/models/gemini-2.5-flash-preview-tts:generateContent";
pub const VIDEO_SUBMIT_PATH: &str =
    "/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning";

/// Fast settings: short backoff, no pacing, short poll interval.
pub fn fast_settings(media_dir: &Path) -> StudioSettings {
    StudioSettings {
        retry: RetryPolicy::new(2, Duration::from_millis(10)),
        scene_pacing: Duration::ZERO,
        poll_interval: Duration::from_millis(20),
        media_dir: media_dir.to_path_buf(),
        ..StudioSettings::default()
    }
}

/// A studio pointed at the mock server, with the given keys and no
/// environment fallback.
pub fn studio(server: &MockServer, keys: &[&str], media_dir: &Path) -> Studio {
    let client = GeminiClient::with_base_url(server.uri()).unwrap();
    let credentials = CredentialStore::configure(keys).with_env_vars(Vec::<String>::new());
    Studio::with_client(client, credentials, fast_settings(media_dir))
}

/// `generateContent` body answering with text.
pub fn text_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}]}, "finishReason": "STOP"}]
    })
}

/// `generateContent` body answering with inline media.
pub fn inline_body(mime_type: &str, data: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{"content": {"parts": [
            {"inlineData": {"mimeType": mime_type, "data": data}}
        ]}}]
    })
}

/// Provider error envelope for a rejected API key.
pub fn invalid_key_body() -> serde_json::Value {
    serde_json::json!({
        "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT",
            "details": [{"reason": "API_KEY_INVALID"}]
        }
    })
}
