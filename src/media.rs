//! Inline media values: base64 payloads with a MIME type, data URL parsing,
//! and aspect ratios for image generation.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::StudioError;
use crate::gemini::types::{Part, VideoImage};
use crate::gemini::InlineData;

/// At most this many reference images accompany an image request.
pub const MAX_REFERENCE_IMAGES: usize = 2;

/// MIME type assumed when a data URL does not declare one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Base64-encoded media plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    /// Standard base64, no data URL prefix.
    pub data: String,
}

/// Image produced by the provider.
pub type GeneratedImage = InlineMedia;

impl InlineMedia {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Parse `data:<mime>;base64,<payload>`.
    ///
    /// The MIME type comes from the prefix and defaults to `image/jpeg`. A
    /// string without a `data:` prefix is taken as bare base64.
    pub fn from_data_url(input: &str) -> Result<Self, StudioError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(StudioError::InvalidMedia("empty image data".to_string()));
        }

        let Some(rest) = input.strip_prefix("data:") else {
            return Ok(Self::new(DEFAULT_IMAGE_MIME, input));
        };

        let (header, payload) = rest.split_once(',').ok_or_else(|| {
            StudioError::InvalidMedia("data URL has no payload separator".to_string())
        })?;

        if payload.trim().is_empty() {
            return Err(StudioError::InvalidMedia("data URL has no payload".to_string()));
        }

        let mime_type = header
            .split(';')
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_IMAGE_MIME);

        Ok(Self::new(mime_type, payload.trim()))
    }

    /// Encode raw bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, STANDARD.encode(bytes))
    }

    /// Read a file and guess its MIME type from the extension.
    pub fn from_file(path: &Path) -> Result<Self, StudioError> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(mime_for_path(path), &bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode(&self) -> Result<Vec<u8>, StudioError> {
        decode_base64(&self.data)
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "jpg",
        }
    }

    pub(crate) fn to_part(&self) -> Part {
        Part::inline(self.mime_type.clone(), self.data.clone())
    }

    pub(crate) fn to_video_image(&self) -> VideoImage {
        VideoImage {
            bytes_base64_encoded: self.data.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

impl From<InlineData> for InlineMedia {
    fn from(data: InlineData) -> Self {
        Self::new(data.mime_type, data.data)
    }
}

/// Decode standard base64, mapping failures to [`StudioError::InvalidMedia`].
pub fn decode_base64(data: &str) -> Result<Vec<u8>, StudioError> {
    STANDARD
        .decode(data.trim())
        .map_err(|e| StudioError::InvalidMedia(format!("invalid base64: {}", e)))
}

/// Guess an image MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => DEFAULT_IMAGE_MIME,
    }
}

/// Output frame shape for generated images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Portrait,
    Landscape,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
