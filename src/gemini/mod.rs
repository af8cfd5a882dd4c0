//! Gemini REST integration.
//!
//! This module holds everything that talks to the provider: wire types, the
//! single-call HTTP client, per-call retry of transient faults, and rotation
//! across the configured API keys.

mod client;
mod credentials;
mod retry;
mod rotation;
pub mod types;

pub use client::{
    is_transient_network_error, GeminiClient, UpstreamError, UpstreamErrorKind,
    GEMINI_API_BASE_URL,
};
pub use credentials::{Credential, CredentialStore, API_KEY_ENV_VARS};
pub use retry::{
    retry, RetryError, RetryPolicy, Transient, DEFAULT_BACKOFF_BASE, DEFAULT_MAX_ATTEMPTS,
    ROTATION_ATTEMPTS,
};
pub use rotation::execute_with_rotation;
pub use types::{parse_lenient_list, InlineData};
