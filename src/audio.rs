//! Narration audio: speech synthesis and WAV assembly.
//!
//! The provider returns raw 16-bit little-endian mono PCM at 24 kHz. Clips
//! are concatenated in scene order with half a second of silence after each,
//! then wrapped in a WAV container.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::error::StudioError;
use crate::gemini::types::{GenerateContentRequest, GenerationConfig};
use crate::media::decode_base64;
use crate::prompts;
use crate::studio::Studio;

/// PCM sample rate of synthesized speech.
pub const SAMPLE_RATE: u32 = 24_000;

pub const CHANNELS: u16 = 1;

pub const BITS_PER_SAMPLE: u16 = 16;

/// Half a second of 16-bit mono silence at 24 kHz.
pub const SILENCE_BYTES: usize = (SAMPLE_RATE as usize / 2) * (BITS_PER_SAMPLE as usize / 8);

/// A finished narration track.
#[derive(Debug, Clone)]
pub struct NarrationAudio {
    /// Complete WAV file.
    pub wav: Vec<u8>,
    /// Bytes of PCM inside the container.
    pub pcm_len: usize,
    pub voice: String,
    /// Narrations that were voiced.
    pub clips: usize,
}

impl NarrationAudio {
    /// Suggested file name, e.g. `story_narration_Kore.wav`.
    pub fn file_name(&self) -> String {
        format!("story_narration_{}.wav", self.voice)
    }

    /// Write the WAV file.
    pub fn save(&self, path: &Path) -> Result<PathBuf, StudioError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.wav)?;
        Ok(path.to_path_buf())
    }

    /// Playback length.
    pub fn duration(&self) -> std::time::Duration {
        let bytes_per_second = SAMPLE_RATE as u64 * (BITS_PER_SAMPLE as u64 / 8);
        std::time::Duration::from_millis(self.pcm_len as u64 * 1000 / bytes_per_second)
    }
}

pub fn silence() -> Vec<u8> {
    vec![0u8; SILENCE_BYTES]
}

/// Concatenate PCM clips, each followed by silence.
pub fn merge_pcm(clips: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = clips.iter().map(|c| c.len() + SILENCE_BYTES).sum();
    let mut merged = Vec::with_capacity(total);
    for clip in clips {
        merged.extend_from_slice(clip);
        merged.resize(merged.len() + SILENCE_BYTES, 0);
    }
    merged
}

/// Wrap 16-bit little-endian mono PCM in a 24 kHz WAV container.
pub fn pcm_to_wav(pcm: &[u8]) -> Result<Vec<u8>, StudioError> {
    let spec = hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    if pcm.len() % 2 != 0 {
        log::warn!("PCM has an odd byte count ({}); dropping the last byte", pcm.len());
    }

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

impl Studio {
    /// Speak `text` with a prebuilt voice. Returns base64 PCM.
    pub async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<String, StudioError> {
        prompts::validate_prompt(text)?;

        let request =
            GenerateContentRequest::text(text).with_config(GenerationConfig::speech(voice));
        let response = self
            .generate("Speech", &self.settings().models.speech, &request)
            .await?;

        response
            .first_inline_data()
            .map(|data| data.data.clone())
            .ok_or_else(|| StudioError::EmptyGeneration("no audio generated".to_string()))
    }

    /// Voice every non-blank narration, in order, and build one WAV track.
    pub async fn assemble_narration_audio(
        &self,
        narrations: &[String],
        voice: &str,
    ) -> Result<NarrationAudio, StudioError> {
        let mut clips = Vec::new();

        for (index, text) in narrations.iter().enumerate() {
            if text.trim().is_empty() {
                log::debug!("Skipping blank narration {}", index + 1);
                continue;
            }
            let encoded = self.synthesize_speech(text, voice).await?;
            clips.push(decode_base64(&encoded)?);
            log::info!("Narration {}/{} voiced", index + 1, narrations.len());
        }

        if clips.is_empty() {
            return Err(StudioError::NoAudioData);
        }

        let pcm = merge_pcm(&clips);
        let wav = pcm_to_wav(&pcm)?;
        Ok(NarrationAudio {
            wav,
            pcm_len: pcm.len(),
            voice: voice.to_string(),
            clips: clips.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_is_half_second() {
        assert_eq!(SILENCE_BYTES, 24_000);
        assert!(silence().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_merge_appends_silence_after_each_clip() {
        let merged = merge_pcm(&[vec![1, 2], vec![3, 4, 5, 6]]);
        assert_eq!(merged.len(), 2 + 4 + 2 * SILENCE_BYTES);
        assert_eq!(&merged[..2], &[1, 2]);
        assert_eq!(&merged[2 + SILENCE_BYTES..2 + SILENCE_BYTES + 4], &[3, 4, 5, 6]);
        assert!(merged[merged.len() - SILENCE_BYTES..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_wav_header_and_samples() {
        let pcm: Vec<u8> = vec![0x01, 0x00, 0xff, 0x7f, 0x00, 0x80];
        let wav = pcm_to_wav(&pcm).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, i16::MAX, i16::MIN]);
    }

    #[test]
    fn test_empty_pcm_gives_header_only_wav() {
        let wav = pcm_to_wav(&[]).unwrap();
        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_narration_file_name_and_duration() {
        let audio = NarrationAudio {
            wav: Vec::new(),
            pcm_len: 48_000,
            voice: "Kore".to_string(),
            clips: 1,
        };
        assert_eq!(audio.file_name(), "story_narration_Kore.wav");
        assert_eq!(audio.duration(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let audio = NarrationAudio {
            wav: pcm_to_wav(&[0, 0]).unwrap(),
            pcm_len: 2,
            voice: "Puck".to_string(),
            clips: 1,
        };
        let path = audio.save(&dir.path().join("out/narration.wav")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), audio.wav);
    }
}
