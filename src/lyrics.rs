//! Lyric lookup with search grounding, and line-by-line translation.

use serde::{Deserialize, Serialize};

use crate::error::StudioError;
use crate::gemini::parse_lenient_list;
use crate::gemini::types::{GenerateContentRequest, Tool};
use crate::prompts;
use crate::studio::Studio;

/// Text returned when the model finds nothing.
pub const LYRICS_NOT_FOUND: &str = "Not found";

/// A web page the lyrics were grounded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LyricSource {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lyrics {
    pub text: String,
    pub sources: Vec<LyricSource>,
}

/// One translated line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    #[serde(default)]
    pub original: String,
    #[serde(default)]
    pub translated: String,
}

impl Studio {
    /// Look up song lyrics, with the web sources used.
    pub async fn find_lyrics(&self, query: &str) -> Result<Lyrics, StudioError> {
        prompts::validate_prompt(query)?;

        let request = GenerateContentRequest::text(prompts::find_lyrics(query))
            .with_tool(Tool::google_search());
        let response = self
            .generate("Find lyrics", &self.settings().models.text, &request)
            .await?;

        let sources = response
            .grounding_sources()
            .map(|web| LyricSource {
                title: web.title.clone().unwrap_or_else(|| "Source".to_string()),
                uri: web.uri.clone().unwrap_or_else(|| "#".to_string()),
            })
            .collect();

        Ok(Lyrics {
            text: response
                .text()
                .unwrap_or_else(|| LYRICS_NOT_FOUND.to_string()),
            sources,
        })
    }

    /// Translate lyrics line by line. A malformed answer gives an empty list.
    pub async fn translate_lyrics(
        &self,
        lyrics: &str,
        language: &str,
    ) -> Result<Vec<LyricLine>, StudioError> {
        prompts::validate_prompt(lyrics)?;
        let text = self
            .generate_text(
                "Translate lyrics",
                prompts::translate_lyrics(lyrics, language),
                true,
            )
            .await?
            .unwrap_or_else(|| "[]".to_string());
        Ok(parse_lenient_list(&text))
    }
}
