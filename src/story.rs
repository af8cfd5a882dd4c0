//! Story pipeline: ideas, narrative expansion, scene decomposition, and the
//! progressive per-scene image loop.
//!
//! Stages run strictly in order. [`Studio::run_story`] awaits the text stages
//! and hands the image stage to a background task that reports each finished
//! slot over a channel, tagged with the run it belongs to.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::StudioError;
use crate::gemini::parse_lenient_list;
use crate::gemini::types::{GenerateContentRequest, GenerationConfig, Part};
use crate::media::{AspectRatio, GeneratedImage, InlineMedia, MAX_REFERENCE_IMAGES};
use crate::prompts;
use crate::studio::Studio;

/// Scenes requested when the caller does not say.
pub const DEFAULT_SCENE_COUNT: usize = 10;

/// Gender of the main character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unspecified => "general",
        }
    }
}

/// A story premise offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryIdea {
    pub id: String,
    pub text: String,
}

/// One scene of a decomposed story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(rename = "imagePrompt", alias = "visualPrompt", default)]
    pub visual_prompt: String,
    #[serde(default)]
    pub narration: String,
}

/// Identifies one pipeline run. Updates from an older run are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// State of one image slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneImage {
    pub index: usize,
    pub prompt: String,
    pub image: Option<GeneratedImage>,
    pub loading: bool,
}

impl SceneImage {
    fn pending(index: usize, prompt: String) -> Self {
        Self {
            index,
            prompt,
            image: None,
            loading: true,
        }
    }
}

/// A finished slot, sent while the image loop is still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneImageUpdate {
    pub run: RunId,
    pub slot: SceneImage,
}

/// Caller-side view of the image slots of the current run.
#[derive(Debug, Clone)]
pub struct SceneBoard {
    run: RunId,
    slots: Vec<SceneImage>,
}

impl SceneBoard {
    /// Every slot starts out loading.
    pub fn new<I, S>(run: RunId, prompts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = prompts
            .into_iter()
            .enumerate()
            .map(|(i, p)| SceneImage::pending(i, p.into()))
            .collect();
        Self { run, slots }
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn slots(&self) -> &[SceneImage] {
        &self.slots
    }

    /// Apply an update. Returns false, changing nothing, when the update
    /// belongs to another run or names a slot that does not exist.
    pub fn apply(&mut self, update: SceneImageUpdate) -> bool {
        if update.run != self.run {
            log::debug!("Ignoring image update from stale {}", update.run);
            return false;
        }
        match self.slots.get_mut(update.slot.index) {
            Some(slot) => {
                *slot = update.slot;
                true
            }
            None => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| !s.loading)
    }
}

/// Inputs of a full story run.
#[derive(Debug, Clone)]
pub struct StoryRequest {
    pub premise: String,
    pub genre: String,
    pub gender: Gender,
    /// Character description woven into every scene prompt.
    pub character: String,
    pub scene_count: usize,
    pub aspect: AspectRatio,
    /// Character reference images; at most two are sent.
    pub references: Vec<InlineMedia>,
}

impl Default for StoryRequest {
    fn default() -> Self {
        Self {
            premise: String::new(),
            genre: String::new(),
            gender: Gender::default(),
            character: String::new(),
            scene_count: DEFAULT_SCENE_COUNT,
            aspect: AspectRatio::default(),
            references: Vec::new(),
        }
    }
}

/// A story whose text stages are done and whose images are still rendering.
#[derive(Debug)]
pub struct StoryRun {
    pub run: RunId,
    pub narrative: String,
    pub scenes: Vec<Scene>,
    /// One update per scene, in order, as each image finishes.
    pub updates: mpsc::UnboundedReceiver<SceneImageUpdate>,
    /// Resolves to the final slots once the loop ends.
    pub images: JoinHandle<Vec<SceneImage>>,
}

impl StoryRun {
    /// A board for this run, every slot loading.
    pub fn board(&self) -> SceneBoard {
        SceneBoard::new(self.run, self.scenes.iter().map(|s| s.visual_prompt.clone()))
    }
}

fn idea_id(index: usize) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-{}", millis, index)
}

impl Studio {
    /// Story premises for a genre. Unparseable answers give an empty list.
    pub async fn generate_ideas(&self, genre: &str) -> Result<Vec<StoryIdea>, StudioError> {
        let text = self
            .generate_text("Story ideas", prompts::ideas(genre), true)
            .await?
            .unwrap_or_else(|| "[]".to_string());

        let ideas = parse_lenient_list::<String>(&text)
            .into_iter()
            .enumerate()
            .map(|(i, text)| StoryIdea { id: idea_id(i), text })
            .collect();
        Ok(ideas)
    }

    /// Rewrite a story text to read better. Returns the input unchanged when
    /// the model answers with nothing.
    pub async fn polish_story(&self, text: &str) -> Result<String, StudioError> {
        prompts::validate_prompt(text)?;
        let language = &self.settings().language;
        let polished = self
            .generate_text("Polish story", prompts::polish(text, language), false)
            .await?;
        Ok(polished.unwrap_or_else(|| text.to_string()))
    }

    /// Expand a premise into a full narrative of `scene_count` chapters.
    pub async fn expand_narrative(
        &self,
        premise: &str,
        genre: &str,
        gender: Gender,
        scene_count: usize,
    ) -> Result<String, StudioError> {
        prompts::validate_prompt(premise)?;
        let prompt = prompts::narrative(
            premise,
            genre,
            gender,
            scene_count,
            &self.settings().language,
        );
        let narrative = self.generate_text("Full story", prompt, false).await?;
        Ok(narrative.unwrap_or_default().trim().to_string())
    }

    /// Break a narrative into at most `scene_count` scenes.
    ///
    /// A malformed answer yields an empty list, never an error.
    pub async fn decompose_scenes(
        &self,
        narrative: &str,
        character: &str,
        scene_count: usize,
    ) -> Result<Vec<Scene>, StudioError> {
        let prompt = prompts::scenes(narrative, character, scene_count, &self.settings().language);
        let text = self
            .generate_text("Story scenes", prompt, true)
            .await?
            .unwrap_or_else(|| "[]".to_string());

        let mut scenes: Vec<Scene> = parse_lenient_list(&text);
        scenes.truncate(scene_count);
        log::info!("Decomposed story into {} scene(s)", scenes.len());
        Ok(scenes)
    }

    /// Generate one image, optionally guided by up to two reference images.
    pub async fn generate_scene_image(
        &self,
        prompt: &str,
        aspect: AspectRatio,
        references: &[InlineMedia],
    ) -> Result<GeneratedImage, StudioError> {
        prompts::validate_prompt(prompt)?;

        let mut parts: Vec<Part> = references
            .iter()
            .take(MAX_REFERENCE_IMAGES)
            .map(InlineMedia::to_part)
            .collect();
        parts.push(Part::text(prompts::scene_image(prompt)));

        let request = GenerateContentRequest::new(parts)
            .with_config(GenerationConfig::image(aspect.as_str()));
        let response = self
            .generate("Scene image", &self.settings().models.image, &request)
            .await?;

        match response.first_inline_data() {
            Some(data) => Ok(InlineMedia::from(data.clone())),
            None => {
                let reason = response
                    .block_reason()
                    .map(|r| format!("blocked: {}", r))
                    .unwrap_or_else(|| "safety filter triggered or no image returned".to_string());
                Err(StudioError::EmptyGeneration(reason))
            }
        }
    }

    /// Render one image per prompt, one at a time, pacing each request.
    ///
    /// Every slot is reported on `updates` as soon as it finishes. A failed
    /// slot is reported as not loading with no image and the loop moves on.
    /// The result always holds exactly one slot per prompt.
    pub async fn render_scene_images(
        &self,
        run: RunId,
        scene_prompts: Vec<String>,
        aspect: AspectRatio,
        references: Vec<InlineMedia>,
        updates: &mpsc::UnboundedSender<SceneImageUpdate>,
    ) -> Vec<SceneImage> {
        let total = scene_prompts.len();
        let mut slots = Vec::with_capacity(total);

        for (index, prompt) in scene_prompts.into_iter().enumerate() {
            tokio::time::sleep(self.settings().scene_pacing).await;

            let image = match self.generate_scene_image(&prompt, aspect, &references).await {
                Ok(image) => {
                    log::info!("{}: scene {}/{} image ready", run, index + 1, total);
                    Some(image)
                }
                Err(e) => {
                    log::warn!("{}: scene {}/{} image failed: {}", run, index + 1, total, e);
                    None
                }
            };

            let slot = SceneImage {
                index,
                prompt,
                image,
                loading: false,
            };
            if updates
                .send(SceneImageUpdate {
                    run,
                    slot: slot.clone(),
                })
                .is_err()
            {
                log::debug!("{}: update receiver dropped", run);
            }
            slots.push(slot);
        }

        slots
    }

    /// Run the text stages, then start the image loop in the background.
    pub async fn run_story(&self, request: &StoryRequest) -> Result<StoryRun, StudioError> {
        let narrative = self
            .expand_narrative(
                &request.premise,
                &request.genre,
                request.gender,
                request.scene_count,
            )
            .await?;
        let scenes = self
            .decompose_scenes(&narrative, &request.character, request.scene_count)
            .await?;

        let run = self.next_run_id();
        let scene_prompts = scenes.iter().map(|s| s.visual_prompt.clone()).collect();
        let (updates, receiver) = mpsc::unbounded_channel();
        let images = self.spawn_image_loop(
            run,
            scene_prompts,
            request.aspect,
            request.references.clone(),
            updates,
        );

        Ok(StoryRun {
            run,
            narrative,
            scenes,
            updates: receiver,
            images,
        })
    }

    pub(crate) fn spawn_image_loop(
        &self,
        run: RunId,
        scene_prompts: Vec<String>,
        aspect: AspectRatio,
        mut references: Vec<InlineMedia>,
        updates: mpsc::UnboundedSender<SceneImageUpdate>,
    ) -> JoinHandle<Vec<SceneImage>> {
        references.truncate(MAX_REFERENCE_IMAGES);
        let studio = self.clone();
        tokio::spawn(async move {
            studio
                .render_scene_images(run, scene_prompts, aspect, references, &updates)
                .await
        })
    }
}
