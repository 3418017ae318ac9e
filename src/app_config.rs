//! Application configuration module
//!
//! Handles the application configuration including loading defaults and
//! validating settings.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::language_utils;
use crate::muxing;
use crate::transcription::{Device, ModelSize};

/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Source video used when no input path is given on the command line
    #[serde(default)]
    pub source_path: Option<PathBuf>,

    /// Directory for derived artifacts; next to the source video when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Speech-to-text settings
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Media engine settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Speech-to-text configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranscriptionConfig {
    /// Whisper model size
    #[serde(default)]
    pub model_size: ModelSize,

    /// Inference device
    #[serde(default)]
    pub device: Device,

    /// whisper.cpp command-line executable
    #[serde(default = "default_whisper_binary")]
    pub whisper_binary: String,

    /// Directory holding `ggml-<size>.bin` model files
    #[serde(default)]
    pub models_dir: Option<PathBuf>,

    /// Spoken language; auto-detected when unset
    #[serde(default)]
    pub language: Option<String>,

    /// Inference threads; engine default when unset
    #[serde(default)]
    pub threads: Option<u32>,
}

impl TranscriptionConfig {
    // @returns: Configured models dir, or <cache>/whisper.cpp/models
    pub fn resolved_models_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(default_models_dir)
    }

    // @returns: Path of the model file for the configured size
    pub fn model_path(&self) -> PathBuf {
        self.resolved_models_dir().join(self.model_size.ggml_filename())
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model_size: ModelSize::default(),
            device: Device::default(),
            whisper_binary: default_whisper_binary(),
            models_dir: None,
            language: None,
            threads: None,
        }
    }
}

/// Media engine configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MediaConfig {
    /// ffmpeg executable
    #[serde(default = "default_ffmpeg_binary")]
    pub ffmpeg_binary: String,

    /// ffprobe executable
    #[serde(default = "default_ffprobe_binary")]
    pub ffprobe_binary: String,

    /// Sample rate of the extracted audio (whisper expects 16 kHz)
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,

    /// Channel count of the extracted audio
    #[serde(default = "default_audio_channels")]
    pub audio_channels: u32,

    /// Soft subtitle codec; derived from the output container when unset
    #[serde(default)]
    pub soft_subtitle_codec: Option<String>,

    /// Video encoder for burned-in output; engine default when unset
    #[serde(default)]
    pub burn_video_codec: Option<String>,

    /// Run the soft and hard muxing steps concurrently
    #[serde(default = "default_true")]
    pub parallel_outputs: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: default_ffmpeg_binary(),
            ffprobe_binary: default_ffprobe_binary(),
            audio_sample_rate: default_audio_sample_rate(),
            audio_channels: default_audio_channels(),
            soft_subtitle_codec: None,
            burn_video_codec: None,
            parallel_outputs: default_true(),
        }
    }
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_whisper_binary() -> String {
    "whisper-cli".to_string()
}

fn default_ffmpeg_binary() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_binary() -> String {
    "ffprobe".to_string()
}

fn default_audio_sample_rate() -> u32 {
    16_000
}

fn default_audio_channels() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("whisper.cpp")
        .join("models")
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.transcription.whisper_binary.trim().is_empty() {
            return Err(anyhow!("Whisper binary must not be empty"));
        }

        if let Some(language) = &self.transcription.language {
            language_utils::validate_language_code(language)
                .map_err(|e| anyhow!("Invalid transcription language: {}", e))?;
        }

        if self.transcription.threads == Some(0) {
            return Err(anyhow!("Transcription threads must be at least 1"));
        }

        if self.media.ffmpeg_binary.trim().is_empty() || self.media.ffprobe_binary.trim().is_empty() {
            return Err(anyhow!("ffmpeg and ffprobe binaries must not be empty"));
        }

        if self.media.audio_sample_rate == 0 {
            return Err(anyhow!("Audio sample rate must be greater than zero"));
        }

        if self.media.audio_channels == 0 {
            return Err(anyhow!("Audio channel count must be greater than zero"));
        }

        if let Some(codec) = &self.media.soft_subtitle_codec {
            if !muxing::is_text_subtitle_codec(codec) {
                return Err(anyhow!("Unsupported soft subtitle codec: {}", codec));
            }
        }

        if let Some(path) = &self.source_path {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("Source path must not be empty"));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_path: None,
            output_dir: None,
            transcription: TranscriptionConfig::default(),
            media: MediaConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
