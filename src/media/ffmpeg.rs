use async_trait::async_trait;
use log::{debug, error};
use serde_json::{Value, from_str};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::app_config::MediaConfig;
use crate::errors::MuxError;
use crate::media::{MediaEngine, MuxJob, StreamInfo, StreamKind};

// @module: ffmpeg-backed media engine

/// Media engine that shells out to ffmpeg and ffprobe
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    /// ffmpeg executable
    ffmpeg: String,
    /// ffprobe executable
    ffprobe: String,
}

impl FfmpegEngine {
    pub fn new(ffmpeg: impl Into<String>, ffprobe: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.ffmpeg_binary.clone(), config.ffprobe_binary.clone())
    }

    /// Filter ffmpeg stderr to only show meaningful error lines, stripping the
    /// version banner, build configuration, and stream metadata noise.
    pub fn filter_ffmpeg_stderr(stderr: &str) -> String {
        let dominated_prefixes = [
            "ffmpeg version",
            "built with",
            "configuration:",
            "lib",
            "Input #",
            "Metadata:",
            "Duration:",
            "Chapter",
            "Stream #",
            "title",
            "BPS",
            "DURATION",
            "NUMBER_OF",
            "_STATISTICS",
            "Output #",
            "Stream mapping:",
            "Press [q]",
            "frame=",
            "size=",
        ];

        let meaningful: Vec<&str> = stderr
            .lines()
            .filter(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    return false;
                }
                !dominated_prefixes.iter().any(|p| trimmed.starts_with(p))
            })
            .collect();

        if meaningful.is_empty() {
            "unknown ffmpeg error (stderr was empty after filtering)".to_string()
        } else {
            meaningful.join("\n")
        }
    }

    /// Parse `ffprobe -show_streams -print_format json` output
    pub fn parse_probe_output(stdout: &str) -> Result<Vec<StreamInfo>, MuxError> {
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }

        let json: Value = from_str(stdout)
            .map_err(|e| MuxError::Probe(format!("Failed to parse ffprobe JSON output: {}", e)))?;

        let Some(streams) = json.get("streams").and_then(|s| s.as_array()) else {
            return Ok(Vec::new());
        };

        let tag = |stream: &Value, key: &str| {
            stream.get("tags")
                .and_then(|t| t.get(key))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        let tracks = streams
            .iter()
            .map(|stream| StreamInfo {
                index: stream.get("index")
                    .and_then(|v| v.as_u64())
                    .map(|v| v as usize)
                    .unwrap_or(0),
                kind: StreamKind::from_codec_type(
                    stream.get("codec_type").and_then(|v| v.as_str()).unwrap_or("unknown"),
                ),
                codec_name: stream.get("codec_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string(),
                language: tag(stream, "language"),
                title: tag(stream, "title"),
            })
            .collect();

        Ok(tracks)
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn execute(&self, job: &MuxJob) -> Result<(), MuxError> {
        let args = job.to_ffmpeg_args();
        debug!("Running: {} {}", self.ffmpeg, args.join(" "));

        // kill_on_drop: a dropped pipeline future must not leave an encoder running
        let output = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MuxError::Spawn {
                program: self.ffmpeg.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let filtered = Self::filter_ffmpeg_stderr(&stderr);
            error!("ffmpeg failed writing {:?}: {}", job.output, filtered);
            return Err(MuxError::EngineFailed {
                program: self.ffmpeg.clone(),
                status: output.status.code(),
                message: filtered,
            });
        }

        Ok(())
    }

    async fn probe_streams(&self, path: &Path) -> Result<Vec<StreamInfo>, MuxError> {
        if !path.exists() {
            return Err(MuxError::Probe(format!("Media file not found: {:?}", path)));
        }

        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| MuxError::Spawn {
                program: self.ffprobe.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MuxError::EngineFailed {
                program: self.ffprobe.clone(),
                status: output.status.code(),
                message: stderr.trim().to_string(),
            });
        }

        Self::parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}
