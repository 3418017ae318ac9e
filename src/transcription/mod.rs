/*!
 * Speech-to-text collaborators.
 *
 * A `Transcriber` turns an audio file into a detected language code and an
 * ordered list of timed segments:
 * - `whisper_cli`: whisper.cpp command-line backend
 * - `mock`: scripted backend for tests
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use std::path::Path;

use crate::errors::TranscriptionError;
use crate::subtitle_processor::TranscriptSegment;

pub mod mock;
pub mod whisper_cli;

/// Whisper model size
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    #[default]
    Small,
    Medium,
    Large,
}

impl ModelSize {
    /// whisper.cpp model file name for this size
    pub fn ggml_filename(&self) -> &'static str {
        match self {
            Self::Tiny => "ggml-tiny.bin",
            Self::Base => "ggml-base.bin",
            Self::Small => "ggml-small.bin",
            Self::Medium => "ggml-medium.bin",
            Self::Large => "ggml-large-v3.bin",
        }
    }
}

impl fmt::Display for ModelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Tiny => "tiny",
            Self::Base => "base",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        };
        write!(f, "{}", name)
    }
}

/// Inference device
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Gpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

/// Result of transcribing one audio file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Detected (or forced) language code
    pub language: String,
    /// Segments in the order the engine produced them
    pub segments: Vec<TranscriptSegment>,
}

/// Speech-to-text engine
#[async_trait]
pub trait Transcriber: Send + Sync + Debug {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Transcribe an audio file
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError>;
}
