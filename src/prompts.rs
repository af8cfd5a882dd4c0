//! Prompt builders for every text, image, and speech call.

use crate::error::StudioError;
use crate::story::Gender;
use crate::ugc::UgcRequest;

/// Number of ideas requested per genre.
pub const IDEA_COUNT: usize = 8;

/// Shot type that asks for hands only, no faces.
pub const HAND_FOCUS_SHOT: &str = "hand_focus";

/// Reject prompts that are empty or whitespace only.
pub fn validate_prompt(prompt: &str) -> Result<(), StudioError> {
    if prompt.trim().is_empty() {
        return Err(StudioError::EmptyPrompt);
    }
    Ok(())
}

pub fn ideas(genre: &str) -> String {
    format!(
        "Generate {} creative story ideas for genre \"{}\". Return JSON array of strings.",
        IDEA_COUNT, genre
    )
}

pub fn polish(text: &str, language: &str) -> String {
    format!(
        "Polish this story text to be more engaging in {}:\n{}",
        language, text
    )
}

pub fn narrative(
    premise: &str,
    genre: &str,
    gender: Gender,
    scene_count: usize,
    language: &str,
) -> String {
    format!(
        "Write a complete story in {} based on: \"{}\". Genre: {}. Main Character: {}.\n\
         Structure it into exactly {} distinct scenes/chapters. Make it cinematic and emotional.",
        language.to_uppercase(),
        premise,
        genre,
        gender.label(),
        scene_count
    )
}

pub fn scenes(narrative: &str, character: &str, scene_count: usize, language: &str) -> String {
    format!(
        "Analyze this story and break it down into EXACTLY {count} scenes.\n\n\
         OUTPUT JSON FORMAT: Array of objects with:\n\
         1. \"imagePrompt\": A highly detailed CINEMATIC VIDEO PROMPT.\n\
            - Language: {language}.\n\
            - Include camera movements (slow zoom in, drone shot, tracking shot).\n\
            - Describe lighting and action vividly.\n\
            - Character context: {character}.\n\
         2. \"narration\": Voice over script in {language} (short, emotional).\n\n\
         STORY:\n{narrative}",
        count = scene_count,
        language = language,
        character = character,
        narrative = narrative
    )
}

pub fn scene_image(prompt: &str) -> String {
    format!(
        "Cinematic Shot: {}. High resolution, 8k, photorealistic.",
        prompt
    )
}

/// Instruction text for a UGC shot type.
pub fn shot_instruction(shot_type: &str) -> String {
    match shot_type.trim() {
        HAND_FOCUS_SHOT => "EXTREME CLOSE-UP HANDS ONLY. NO FACES.".to_string(),
        "" => "default".to_string(),
        other => other.to_string(),
    }
}

pub fn ugc_script(request: &UgcRequest, scene_count: usize) -> String {
    let product = if request.use_product && !request.product.trim().is_empty() {
        request.product.as_str()
    } else {
        "None"
    };
    let category = request.category.as_deref().unwrap_or("general");

    format!(
        "Create exactly {count} Scenes for a UGC Video.\n\
         Context: {scenario}. Char: {character}. Product: {product} (category: {category}).\n\
         Constraint: Each scene is EXACTLY 8 SECONDS.\n\
         Shot Type: {shot}.\n\n\
         Return JSON Array:\n\
         - \"visual_prompt\": Detailed English prompt for video generator (8 sec duration).\n\
         - \"spoken_script\": {language} Voice Over (approx 15 words).",
        count = scene_count,
        scenario = request.scenario,
        character = request.character,
        product = product,
        category = category,
        shot = shot_instruction(&request.shot_type),
        language = request.language
    )
}

pub fn find_lyrics(query: &str) -> String {
    format!(
        "Find lyrics for: \"{}\". Return lyrics with structure tags [Verse], [Chorus]. No translation.",
        query
    )
}

pub fn translate_lyrics(lyrics: &str, language: &str) -> String {
    format!(
        "Translate these lyrics to {} line by line. \
         Return JSON array: [{{\"original\": \"line\", \"translated\": \"line\"}}]\n\n{}",
        language, lyrics
    )
}

pub fn optimize_video_prompt(idea: &str) -> String {
    format!(
        "Optimize this for photorealistic image and video generation (8k): \"{}\". Output prompt only.",
        idea
    )
}
