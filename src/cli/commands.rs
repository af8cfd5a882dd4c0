//! Subcommand handlers.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use storyforge::config::{default_path as get_config_path, Config, DEFAULT_CONFIG_TEMPLATE};
use storyforge::gemini::{Credential, GeminiClient};
use storyforge::media::InlineMedia;
use storyforge::story::{SceneBoard, StoryRequest};
use storyforge::ugc::UgcRequest;
use storyforge::{Studio, StudioError};

use super::args::{Command, ConfigAction};

/// Load the config and build a studio from it. Keys given on the command
/// line replace the configured ones.
pub fn build_studio(config_path: Option<&Path>, api_keys: &[String]) -> Result<Studio, String> {
    let config = Config::load(config_path).map_err(|e| e.to_string())?;

    let client = GeminiClient::with_base_url(config.base_url())
        .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
    let mut studio = Studio::with_client(client, config.credential_store(), config.settings());
    if !api_keys.is_empty() {
        studio.configure(api_keys);
    }

    if studio.credentials().is_empty() {
        eprintln!("Warning: no API key configured.");
        eprintln!("         Pass --api-key, add keys to the config file, or set GEMINI_API_KEY.\n");
    }

    Ok(studio)
}

/// Run one generation subcommand to completion.
pub async fn run_command(
    studio: &Studio,
    command: Command,
    cancel: &CancellationToken,
) -> Result<(), String> {
    match command {
        Command::Ideas { genre } => {
            let ideas = studio.generate_ideas(&genre).await.map_err(|e| e.to_string())?;
            if ideas.is_empty() {
                println!("No ideas returned.");
            }
            for (i, idea) in ideas.iter().enumerate() {
                println!("{}. {}", i + 1, idea.text);
            }
            Ok(())
        }
        Command::Polish { text } => {
            let polished = studio.polish_story(&text).await.map_err(|e| e.to_string())?;
            println!("{}", polished);
            Ok(())
        }
        Command::Story {
            premise,
            genre,
            gender,
            character,
            scenes,
            aspect,
            references,
            narrate,
            voice,
            output,
        } => {
            let request = StoryRequest {
                premise,
                genre,
                gender: gender.into(),
                character,
                scene_count: scenes,
                aspect: aspect.into(),
                references: load_images(&references)?,
            };
            run_story(studio, &request, narrate, voice, &output).await
        }
        Command::Speech {
            text,
            voice,
            output,
        } => {
            let voice = voice.unwrap_or_else(|| studio.settings().voice.clone());
            let audio = studio
                .assemble_narration_audio(&[text], &voice)
                .await
                .map_err(|e| e.to_string())?;
            let path = audio.save(&output).map_err(|e| e.to_string())?;
            println!("Saved {:?} audio to {}", audio.duration(), path.display());
            Ok(())
        }
        Command::Ugc {
            scenario,
            character,
            product,
            category,
            shot,
            language,
            character_image,
            product_image,
            output,
        } => {
            let request = UgcRequest {
                scenario,
                language: language.unwrap_or_default(),
                character,
                use_product: product.is_some(),
                product: product.unwrap_or_default(),
                category,
                shot_type: shot,
            };
            let references: Vec<PathBuf> = character_image.into_iter().chain(product_image).collect();
            run_ugc(studio, &request, load_images(&references)?, &output).await
        }
        Command::Lyrics { query } => {
            let lyrics = studio.find_lyrics(&query).await.map_err(|e| e.to_string())?;
            println!("{}", lyrics.text);
            if !lyrics.sources.is_empty() {
                println!("\nSources:");
                for source in &lyrics.sources {
                    println!("  {} - {}", source.title, source.uri);
                }
            }
            Ok(())
        }
        Command::Translate { file, language } => {
            let lyrics = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
            let lines = studio
                .translate_lyrics(&lyrics, &language)
                .await
                .map_err(|e| e.to_string())?;
            for line in lines {
                println!("{}\n  {}", line.original, line.translated);
            }
            Ok(())
        }
        Command::Video {
            image,
            prompt,
            output,
            max_wait,
        } => {
            let mut studio = studio.clone();
            if let Some(secs) = max_wait {
                studio.settings_mut().max_wait = Some(std::time::Duration::from_secs(secs));
            }
            let source = InlineMedia::from_file(&image)
                .map_err(|e| format!("Failed to read {}: {}", image.display(), e))?;

            println!("Generating video (this can take a few minutes, Ctrl+C to cancel)...");
            let handle = studio
                .image_to_video(&source.to_data_url(), &prompt, cancel)
                .await
                .map_err(|e| e.to_string())?;
            let size = handle.size();
            let path = handle.persist(&output).map_err(|e| e.to_string())?;
            println!("Saved video ({} bytes) to {}", size, path.display());
            Ok(())
        }
        Command::Prompt { idea } => {
            let prompt = studio
                .optimize_video_prompt(&idea)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", prompt);
            Ok(())
        }
        Command::Config { action } => handle_config_action(action, None),
    }
}

/// Run a command, ending it early when `cancel` fires.
pub async fn run_cancellable(
    studio: &Studio,
    command: Command,
    cancel: &CancellationToken,
) -> Result<(), String> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StudioError::Cancelled.to_string()),
        result = run_command(studio, command, cancel) => result,
    }
}

fn load_images(paths: &[PathBuf]) -> Result<Vec<InlineMedia>, String> {
    paths
        .iter()
        .map(|p| {
            InlineMedia::from_file(p).map_err(|e| format!("Failed to read {}: {}", p.display(), e))
        })
        .collect()
}

fn save_image(dir: &Path, stem: &str, image: &InlineMedia) -> Result<PathBuf, String> {
    let path = dir.join(format!("{}.{}", stem, image.extension()));
    let bytes = image.decode().map_err(|e| e.to_string())?;
    std::fs::write(&path, bytes).map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
    Ok(path)
}

async fn run_story(
    studio: &Studio,
    request: &StoryRequest,
    narrate: bool,
    voice: Option<String>,
    output: &Path,
) -> Result<(), String> {
    std::fs::create_dir_all(output)
        .map_err(|e| format!("Failed to create {}: {}", output.display(), e))?;

    println!("Writing story...");
    let mut run = studio.run_story(request).await.map_err(|e| e.to_string())?;

    let story_path = output.join("story.txt");
    std::fs::write(&story_path, &run.narrative).map_err(|e| e.to_string())?;
    let scenes_json = serde_json::to_string_pretty(&run.scenes).map_err(|e| e.to_string())?;
    std::fs::write(output.join("scenes.json"), scenes_json).map_err(|e| e.to_string())?;
    println!(
        "Story saved to {} ({} scenes)",
        story_path.display(),
        run.scenes.len()
    );

    let mut board = run.board();
    drain_updates(&mut board, &mut run.updates, output).await?;
    run.images
        .await
        .map_err(|e| format!("Image task failed: {}", e))?;

    if narrate {
        let voice = voice.unwrap_or_else(|| studio.settings().voice.clone());
        let narrations: Vec<String> = run.scenes.iter().map(|s| s.narration.clone()).collect();
        println!("Voicing narration with {}...", voice);
        let audio = studio
            .assemble_narration_audio(&narrations, &voice)
            .await
            .map_err(|e| e.to_string())?;
        let path = audio
            .save(&output.join(audio.file_name()))
            .map_err(|e| e.to_string())?;
        println!("Narration saved to {}", path.display());
    }

    Ok(())
}

async fn run_ugc(
    studio: &Studio,
    request: &UgcRequest,
    references: Vec<InlineMedia>,
    output: &Path,
) -> Result<(), String> {
    std::fs::create_dir_all(output)
        .map_err(|e| format!("Failed to create {}: {}", output.display(), e))?;

    println!("Writing UGC script...");
    let mut run = studio
        .run_ugc(request, references)
        .await
        .map_err(|e| e.to_string())?;

    let script = serde_json::to_string_pretty(&run.scenes).map_err(|e| e.to_string())?;
    std::fs::write(output.join("script.json"), &script).map_err(|e| e.to_string())?;
    for (i, scene) in run.scenes.iter().enumerate() {
        println!("Scene {}: {}", i + 1, scene.spoken_script);
    }

    let mut board = SceneBoard::new(run.run, run.scenes.iter().map(|s| s.visual_prompt.clone()));
    drain_updates(&mut board, &mut run.updates, output).await?;
    run.images
        .await
        .map_err(|e| format!("Image task failed: {}", e))?;
    Ok(())
}

async fn drain_updates(
    board: &mut SceneBoard,
    updates: &mut tokio::sync::mpsc::UnboundedReceiver<storyforge::story::SceneImageUpdate>,
    output: &Path,
) -> Result<(), String> {
    let total = board.slots().len();
    while let Some(update) = updates.recv().await {
        let index = update.slot.index;
        match &update.slot.image {
            Some(image) => {
                let path = save_image(output, &format!("scene-{:02}", index + 1), image)?;
                println!("[{}/{}] {}", index + 1, total, path.display());
            }
            None => println!("[{}/{}] image failed", index + 1, total),
        }
        board.apply(update);
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, config_path: Option<&Path>) -> Result<(), String> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);

    match action {
        ConfigAction::Show => {
            let mut config = Config::load(Some(&path)).map_err(|e| e.to_string())?;
            config.credentials.keys = config
                .credentials
                .keys
                .iter()
                .map(|k| Credential::new(k.as_str()).redacted())
                .collect();

            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| format!("Failed to render config: {}", e))?;
            println!("Current configuration:\n");
            println!("{}", rendered);

            if path.exists() {
                println!("Config file: {} (exists)", path.display());
            } else {
                println!("Config file: {} (not found)", path.display());
            }
            Ok(())
        }
        ConfigAction::Init => {
            if path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'storyforge config show' to view current settings.",
                    path.display()
                ));
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }

            std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
                .map_err(|e| format!("Error writing config file: {}", e))?;

            println!("Created config file: {}", path.display());
            Ok(())
        }
    }
}
