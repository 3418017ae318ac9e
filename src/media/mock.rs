/*!
 * Recording media engine for tests.
 *
 * `RecordingEngine` never encodes anything. It records every job it is asked
 * to run, checks that the job's inputs exist (like a real engine would), and
 * writes a small placeholder file at the job's output so later stages and
 * reruns see the artifact on disk.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;

use crate::errors::MuxError;
use crate::media::{MediaEngine, MuxJob, StreamInfo, StreamKind};

/// Media engine that records jobs instead of running them
#[derive(Debug)]
pub struct RecordingEngine {
    /// Jobs in the order they were executed
    jobs: Mutex<Vec<MuxJob>>,
    /// Streams reported by `probe_streams`
    streams: Vec<StreamInfo>,
    /// Output file name prefixes whose jobs fail
    failing_outputs: Vec<String>,
}

impl RecordingEngine {
    /// Engine whose probes report one video and one audio stream
    pub fn new() -> Self {
        Self::with_streams(vec![
            StreamInfo {
                index: 0,
                kind: StreamKind::Video,
                codec_name: "h264".to_string(),
                language: None,
                title: None,
            },
            StreamInfo {
                index: 1,
                kind: StreamKind::Audio,
                codec_name: "aac".to_string(),
                language: Some("und".to_string()),
                title: None,
            },
        ])
    }

    /// Engine whose probes report the given streams
    pub fn with_streams(streams: Vec<StreamInfo>) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            streams,
            failing_outputs: Vec::new(),
        }
    }

    /// Make every job whose output file name starts with `prefix` fail
    pub fn failing_for(mut self, prefix: impl Into<String>) -> Self {
        self.failing_outputs.push(prefix.into());
        self
    }

    /// Snapshot of the recorded jobs
    pub fn jobs(&self) -> Vec<MuxJob> {
        self.jobs.lock().clone()
    }

    /// Recorded job that wrote the given output file name
    pub fn job_for_output(&self, file_name: &str) -> Option<MuxJob> {
        self.jobs
            .lock()
            .iter()
            .find(|job| job.output.file_name().is_some_and(|n| n == file_name))
            .cloned()
    }
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaEngine for RecordingEngine {
    async fn execute(&self, job: &MuxJob) -> Result<(), MuxError> {
        self.jobs.lock().push(job.clone());

        let file_name = job.output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.failing_outputs.iter().any(|prefix| file_name.starts_with(prefix.as_str())) {
            return Err(MuxError::EngineFailed {
                program: "mock".to_string(),
                status: Some(1),
                message: format!("scripted failure for {}", file_name),
            });
        }

        if let Some(missing) = job.inputs.iter().find(|input| !input.exists()) {
            return Err(MuxError::EngineFailed {
                program: "mock".to_string(),
                status: Some(1),
                message: format!("{}: No such file or directory", missing.display()),
            });
        }

        if job.output.exists() && !job.overwrite {
            return Err(MuxError::EngineFailed {
                program: "mock".to_string(),
                status: Some(1),
                message: format!("File '{}' already exists. Exiting.", job.output.display()),
            });
        }

        std::fs::write(&job.output, job.to_ffmpeg_args().join(" ")).map_err(|e| MuxError::EngineFailed {
            program: "mock".to_string(),
            status: Some(1),
            message: e.to_string(),
        })
    }

    async fn probe_streams(&self, path: &Path) -> Result<Vec<StreamInfo>, MuxError> {
        if !path.exists() {
            return Err(MuxError::Probe(format!("Media file not found: {:?}", path)));
        }
        Ok(self.streams.clone())
    }
}
