//! storyforge library crate.
//!
//! Orchestration core of a generative-AI studio built on the Gemini REST
//! API: story pipelines with progressive scene images, narration audio, UGC
//! scripts, lyrics, and image-to-video jobs. All calls rotate across the
//! configured API keys and retry transient network failures.

pub mod audio;
pub mod config;
pub mod error;
pub mod gemini;
pub mod lyrics;
pub mod media;
pub mod prompts;
pub mod story;
pub mod studio;
pub mod ugc;
pub mod video;

pub use error::{StudioError, MISSING_CREDENTIAL_HINT};
pub use studio::{ModelSet, Studio, StudioSettings};
