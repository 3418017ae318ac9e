/*!
 * Media engine abstraction.
 *
 * Muxing steps describe what they want as a `MuxJob` (inputs, stream maps,
 * filters, codecs, metadata) and hand it to a `MediaEngine`:
 * - `ffmpeg`: runs the job with the ffmpeg/ffprobe binaries
 * - `mock`: records jobs instead of running them, for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::errors::MuxError;

pub mod ffmpeg;
pub mod mock;

/// Codec choice for a set of output streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecChoice {
    /// Stream specifier (`""` for all streams, `"s"`, `"a"`, `"v"`)
    pub streams: String,
    /// Codec name, or `copy` for stream copy
    pub codec: String,
}

/// Metadata entry attached to one output stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMetadata {
    /// Output stream specifier, e.g. `s:s:0`
    pub stream: String,
    /// Metadata key
    pub key: String,
    /// Metadata value
    pub value: String,
}

/// Declarative description of one media engine invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxJob {
    /// Input files, addressed by position in stream maps
    pub inputs: Vec<PathBuf>,
    /// Stream maps (`0`, `1:0`, `0:a?`); empty means engine default selection
    pub maps: Vec<String>,
    /// Video filters, applied in order
    pub video_filters: Vec<String>,
    /// Drop all video streams
    pub drop_video: bool,
    /// Codec choices, applied in order (later entries refine earlier ones)
    pub codecs: Vec<CodecChoice>,
    /// Audio resampling target
    pub audio_sample_rate: Option<u32>,
    /// Audio channel count target
    pub audio_channels: Option<u32>,
    /// Per-stream metadata; each entry is applied independently
    pub metadata: Vec<StreamMetadata>,
    /// Output file
    pub output: PathBuf,
    /// Replace an existing output file
    pub overwrite: bool,
}

impl MuxJob {
    /// Start a job that writes `output`, overwriting it if present
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            inputs: Vec::new(),
            maps: Vec::new(),
            video_filters: Vec::new(),
            drop_video: false,
            codecs: Vec::new(),
            audio_sample_rate: None,
            audio_channels: None,
            metadata: Vec::new(),
            output: output.into(),
            overwrite: true,
        }
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    pub fn map(mut self, selector: impl Into<String>) -> Self {
        self.maps.push(selector.into());
        self
    }

    pub fn video_filter(mut self, filter: impl Into<String>) -> Self {
        self.video_filters.push(filter.into());
        self
    }

    pub fn no_video(mut self) -> Self {
        self.drop_video = true;
        self
    }

    pub fn codec(mut self, streams: impl Into<String>, codec: impl Into<String>) -> Self {
        self.codecs.push(CodecChoice {
            streams: streams.into(),
            codec: codec.into(),
        });
        self
    }

    pub fn audio_format(mut self, sample_rate: u32, channels: u32) -> Self {
        self.audio_sample_rate = Some(sample_rate);
        self.audio_channels = Some(channels);
        self
    }

    pub fn metadata(mut self, stream: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push(StreamMetadata {
            stream: stream.into(),
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Metadata value set on a stream, if any
    pub fn metadata_value(&self, stream: &str, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|m| m.stream == stream && m.key == key)
            .map(|m| m.value.as_str())
    }

    /// Codec chosen for a stream specifier, if any
    pub fn codec_for(&self, streams: &str) -> Option<&str> {
        self.codecs
            .iter()
            .rev()
            .find(|c| c.streams == streams)
            .map(|c| c.codec.as_str())
    }

    /// Render the job as ffmpeg command-line arguments
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into()];
        args.push(if self.overwrite { "-y" } else { "-n" }.into());

        for input in &self.inputs {
            args.push("-i".into());
            args.push(input.to_string_lossy().into_owned());
        }

        for selector in &self.maps {
            args.push("-map".into());
            args.push(selector.clone());
        }

        if !self.video_filters.is_empty() {
            args.push("-vf".into());
            args.push(self.video_filters.join(","));
        }

        if self.drop_video {
            args.push("-vn".into());
        }

        for choice in &self.codecs {
            args.push(if choice.streams.is_empty() {
                "-c".to_string()
            } else {
                format!("-c:{}", choice.streams)
            });
            args.push(choice.codec.clone());
        }

        if let Some(rate) = self.audio_sample_rate {
            args.push("-ar".into());
            args.push(rate.to_string());
        }

        if let Some(channels) = self.audio_channels {
            args.push("-ac".into());
            args.push(channels.to_string());
        }

        for entry in &self.metadata {
            args.push(format!("-metadata:{}", entry.stream));
            args.push(format!("{}={}", entry.key, entry.value));
        }

        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Kind of an elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    Unknown,
}

impl StreamKind {
    /// Parse an ffprobe `codec_type`
    pub fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "subtitle" => Self::Subtitle,
            "data" => Self::Data,
            "attachment" => Self::Attachment,
            _ => Self::Unknown,
        }
    }
}

/// Information about one stream of a media file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// The index of the stream in the container
    pub index: usize,
    /// Video, audio, subtitle...
    pub kind: StreamKind,
    /// The codec name of the stream
    pub codec_name: String,
    /// The language tag, if any
    pub language: Option<String>,
    /// The title tag, if any
    pub title: Option<String>,
}

/// Count streams of a given kind
pub fn count_streams(streams: &[StreamInfo], kind: StreamKind) -> usize {
    streams.iter().filter(|s| s.kind == kind).count()
}

/// The media engine collaborator
///
/// Implementations execute a job synchronously from the caller's point of
/// view and report any non-zero exit as an error. Dropping the returned future
/// must stop the underlying work.
#[async_trait]
pub trait MediaEngine: Send + Sync + Debug {
    /// Run one job to completion
    async fn execute(&self, job: &MuxJob) -> Result<(), MuxError>;

    /// List the streams of a media file
    async fn probe_streams(&self, path: &Path) -> Result<Vec<StreamInfo>, MuxError>;
}
