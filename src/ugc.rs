//! UGC (user-generated-content style) ad scripts: six fixed-length scenes,
//! each with a visual prompt and a short voice-over line.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::StudioError;
use crate::gemini::parse_lenient_list;
use crate::media::{AspectRatio, InlineMedia};
use crate::prompts;
use crate::story::{RunId, SceneImage, SceneImageUpdate};
use crate::studio::Studio;

/// Scenes in every UGC script.
pub const UGC_SCENE_COUNT: usize = 6;

/// Inputs for a UGC script.
#[derive(Debug, Clone, Default)]
pub struct UgcRequest {
    pub scenario: String,
    /// Language of the spoken lines.
    pub language: String,
    pub character: String,
    pub product: String,
    /// Whether the product description is part of the brief.
    pub use_product: bool,
    pub category: Option<String>,
    /// Free-form shot type, or `hand_focus` for hands-only close-ups.
    pub shot_type: String,
}

/// One scene of a UGC script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UgcScene {
    #[serde(default)]
    pub visual_prompt: String,
    #[serde(default)]
    pub spoken_script: String,
}

/// A UGC script whose scene images are still rendering.
#[derive(Debug)]
pub struct UgcRun {
    pub run: RunId,
    pub scenes: Vec<UgcScene>,
    pub updates: mpsc::UnboundedReceiver<SceneImageUpdate>,
    pub images: JoinHandle<Vec<SceneImage>>,
}

impl Studio {
    /// Generate at most six UGC scenes. A malformed answer gives an empty list.
    pub async fn generate_ugc_script(
        &self,
        request: &UgcRequest,
    ) -> Result<Vec<UgcScene>, StudioError> {
        prompts::validate_prompt(&request.scenario)?;

        let mut request = request.clone();
        if request.language.trim().is_empty() {
            request.language = self.settings().language.clone();
        }

        let text = self
            .generate_text(
                "UGC script",
                prompts::ugc_script(&request, UGC_SCENE_COUNT),
                true,
            )
            .await?
            .unwrap_or_else(|| "[]".to_string());

        let mut scenes: Vec<UgcScene> = parse_lenient_list(&text);
        scenes.truncate(UGC_SCENE_COUNT);
        Ok(scenes)
    }

    /// Generate the script, then render portrait images for its scenes in the
    /// background. `references` are the character and product photos.
    pub async fn run_ugc(
        &self,
        request: &UgcRequest,
        references: Vec<InlineMedia>,
    ) -> Result<UgcRun, StudioError> {
        let scenes = self.generate_ugc_script(request).await?;

        let run = self.next_run_id();
        let scene_prompts = scenes.iter().map(|s| s.visual_prompt.clone()).collect();
        let (updates, receiver) = mpsc::unbounded_channel();
        let images = self.spawn_image_loop(
            run,
            scene_prompts,
            AspectRatio::Portrait,
            references,
            updates,
        );

        Ok(UgcRun {
            run,
            scenes,
            updates: receiver,
            images,
        })
    }
}
