//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::enums::{Aspect, GenderArg};

/// Story, narration and video generation studio backed by Gemini
#[derive(Parser, Debug)]
#[command(name = "storyforge")]
#[command(version, about = "Generate stories, scene images, narration and videos", long_about = None)]
#[command(after_help = "EXAMPLES:
    storyforge ideas Fantasy
    storyforge story \"a lighthouse keeper finds a map\" --genre Adventure --scenes 6 --narrate
    storyforge ugc \"morning skincare routine\" --product \"vitamin C serum\" --shot hand_focus
    storyforge video photo.jpg \"slow push in, leaves falling\" -o clip.mp4

ENVIRONMENT:
    GEMINI_API_KEY, GOOGLE_API_KEY, API_KEY
        Fallback API key, used when no key is configured or passed with --api-key.")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// API key to use; repeat to rotate across several (overrides the config file)
    #[arg(long = "api-key", global = true)]
    pub api_keys: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Suggest story premises for a genre
    Ideas {
        /// Genre name, e.g. "Horror" or "Romance"
        genre: String,
    },

    /// Polish a story text
    Polish {
        /// The text to polish
        text: String,
    },

    /// Write a story, split it into scenes and render one image per scene
    Story {
        /// Story premise
        premise: String,

        #[arg(long, default_value = "Drama")]
        genre: String,

        /// Main character gender
        #[arg(long, value_enum, default_value_t = GenderArg::Unspecified)]
        gender: GenderArg,

        /// Character description used in every scene prompt
        #[arg(long, default_value = "")]
        character: String,

        /// Number of scenes
        #[arg(long, default_value_t = 10)]
        scenes: usize,

        #[arg(long, value_enum, default_value_t = Aspect::Portrait)]
        aspect: Aspect,

        /// Character reference image (at most two are used)
        #[arg(long = "reference")]
        references: Vec<PathBuf>,

        /// Also voice the narrations into one WAV file
        #[arg(long)]
        narrate: bool,

        /// Prebuilt voice for narration
        #[arg(long)]
        voice: Option<String>,

        /// Output directory
        #[arg(long, short, default_value = "story-output")]
        output: PathBuf,
    },

    /// Speak a text into a WAV file
    Speech {
        text: String,

        #[arg(long)]
        voice: Option<String>,

        #[arg(long, short, default_value = "speech.wav")]
        output: PathBuf,
    },

    /// Write a six-scene UGC ad script and render a portrait image per scene
    Ugc {
        /// Scenario, e.g. "unboxing at a cafe"
        scenario: String,

        #[arg(long, default_value = "")]
        character: String,

        /// Product description; enables the product in the script
        #[arg(long)]
        product: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Shot type, or hand_focus for hands-only close-ups
        #[arg(long, default_value = "default")]
        shot: String,

        /// Language of the spoken lines
        #[arg(long)]
        language: Option<String>,

        /// Character reference photo
        #[arg(long)]
        character_image: Option<PathBuf>,

        /// Product reference photo
        #[arg(long)]
        product_image: Option<PathBuf>,

        /// Output directory
        #[arg(long, short, default_value = "ugc-output")]
        output: PathBuf,
    },

    /// Find song lyrics with web sources
    Lyrics {
        /// Song title and/or artist
        query: String,
    },

    /// Translate lyrics line by line
    Translate {
        /// File containing the lyrics
        file: PathBuf,

        #[arg(long, default_value = "English")]
        language: String,
    },

    /// Animate a still image into a short video
    Video {
        /// Source image file
        image: PathBuf,

        /// Motion prompt (default: "Cinematic movement")
        #[arg(default_value = "")]
        prompt: String,

        #[arg(long, short, default_value = "video.mp4")]
        output: PathBuf,

        /// Give up after this many seconds
        #[arg(long)]
        max_wait: Option<u64>,
    },

    /// Turn a rough idea into a detailed generation prompt
    Prompt {
        idea: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
