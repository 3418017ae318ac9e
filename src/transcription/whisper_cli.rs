//! whisper.cpp command-line backend.

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{Device, Transcriber, Transcript};
use crate::app_config::TranscriptionConfig;
use crate::errors::TranscriptionError;
use crate::subtitle_processor::{self, TranscriptSegment};

/// Runs a whisper.cpp CLI binary and reads its JSON output
#[derive(Debug, Clone)]
pub struct WhisperCliBackend {
    pub binary: String,
    pub model_path: PathBuf,
    pub device: Device,
    pub language: Option<String>,
    pub threads: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    result: Option<WhisperResult>,
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperResult {
    language: String,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    offsets: Option<WhisperSpan<u64>>,
    #[serde(default)]
    timestamps: Option<WhisperSpan<String>>,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperSpan<T> {
    from: T,
    to: T,
}

impl WhisperCliBackend {
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        Self {
            binary: config.whisper_binary.clone(),
            model_path: config.model_path(),
            device: config.device,
            language: config.language.clone(),
            threads: config.threads,
        }
    }

    /// Command-line arguments for one run writing `<output_base>.json`
    pub fn build_args(&self, audio_path: &Path, output_base: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            self.model_path.to_string_lossy().into_owned(),
            "-f".to_string(),
            audio_path.to_string_lossy().into_owned(),
            "-l".to_string(),
            self.language.clone().unwrap_or_else(|| "auto".to_string()),
            "--output-json".to_string(),
            "-of".to_string(),
            output_base.to_string_lossy().into_owned(),
        ];
        if let Some(threads) = self.threads {
            args.push("-t".to_string());
            args.push(threads.to_string());
        }
        if self.device == Device::Cpu {
            args.push("--no-gpu".to_string());
        }
        args
    }

    /// Parse whisper.cpp `--output-json` content.
    ///
    /// Segment times come from millisecond `offsets`, falling back to the
    /// `timestamps` strings. Blank and zero-length segments are dropped.
    pub fn parse_output(json: &str, fallback_language: Option<&str>) -> Result<Transcript, TranscriptionError> {
        let output: WhisperOutput = serde_json::from_str(json)
            .map_err(|e| TranscriptionError::Parse(e.to_string()))?;

        let language = output.result
            .map(|r| r.language)
            .filter(|l| !l.trim().is_empty())
            .or_else(|| fallback_language.map(str::to_string))
            .ok_or_else(|| TranscriptionError::Parse("output does not report a language".to_string()))?;

        let mut segments = Vec::with_capacity(output.transcription.len());
        let mut dropped = 0;

        for segment in output.transcription {
            let (from_ms, to_ms) = match (&segment.offsets, &segment.timestamps) {
                (Some(offsets), _) => (offsets.from, offsets.to),
                (None, Some(timestamps)) => {
                    let from = subtitle_processor::parse_timecode(&timestamps.from)
                        .map_err(|e| TranscriptionError::Parse(e.to_string()))?;
                    let to = subtitle_processor::parse_timecode(&timestamps.to)
                        .map_err(|e| TranscriptionError::Parse(e.to_string()))?;
                    (from, to)
                }
                (None, None) => {
                    return Err(TranscriptionError::Parse("segment has no timing".to_string()));
                }
            };

            let text = segment.text.trim();
            if text.is_empty() || to_ms <= from_ms {
                dropped += 1;
                continue;
            }

            segments.push(TranscriptSegment::new(
                from_ms as f64 / 1000.0,
                to_ms as f64 / 1000.0,
                text,
            ));
        }

        if dropped > 0 {
            debug!("Dropped {} blank or zero-length whisper segments", dropped);
        }

        Ok(Transcript {
            language: language.trim().to_lowercase(),
            segments,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperCliBackend {
    fn name(&self) -> &'static str {
        "whisper-cli"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        if !self.model_path.exists() {
            return Err(TranscriptionError::ModelNotFound(self.model_path.clone()));
        }

        let work_dir = tempfile::tempdir().map_err(|e| TranscriptionError::Spawn {
            program: self.binary.clone(),
            message: format!("cannot create work directory: {}", e),
        })?;
        let output_base = work_dir.path().join("transcript");
        let args = self.build_args(audio_path, &output_base);
        debug!("Running: {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscriptionError::Spawn {
                program: self.binary.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::EngineFailed {
                status: output.status.code(),
                message: stderr.trim().to_string(),
            });
        }

        let json_path = output_base.with_extension("json");
        let json = tokio::fs::read_to_string(&json_path).await.map_err(|e| {
            TranscriptionError::Parse(format!("cannot read {:?}: {}", json_path, e))
        })?;

        let transcript = Self::parse_output(&json, self.language.as_deref())?;
        if transcript.segments.is_empty() {
            warn!("whisper produced no usable segments for {:?}", audio_path);
            return Err(TranscriptionError::EmptyResult);
        }

        Ok(transcript)
    }
}
