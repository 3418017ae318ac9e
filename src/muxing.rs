use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

use crate::app_config::MediaConfig;
use crate::errors::MuxError;
use crate::media::{count_streams, MediaEngine, MuxJob, StreamKind};

// @module: Audio extraction, soft subtitle embedding and hard subtitle burning

// @const: Container extension -> text subtitle codec it can carry
const CONTAINER_SUBTITLE_CODECS: [(&str, &[&str]); 7] = [
    ("mp4", &["mov_text"]),
    ("m4v", &["mov_text"]),
    ("mov", &["mov_text"]),
    ("3gp", &["mov_text"]),
    ("mkv", &["srt", "subrip", "ass", "ssa", "webvtt"]),
    ("webm", &["webvtt"]),
    ("mka", &["srt", "subrip", "ass", "ssa", "webvtt"]),
];

/// Whether a codec is a text subtitle codec the embedder knows about
pub fn is_text_subtitle_codec(codec: &str) -> bool {
    CONTAINER_SUBTITLE_CODECS
        .iter()
        .any(|(_, codecs)| codecs.contains(&codec))
}

/// Default text subtitle codec for an output container
pub fn subtitle_codec_for_container(container: &str) -> Option<&'static str> {
    CONTAINER_SUBTITLE_CODECS
        .iter()
        .find(|(ext, _)| *ext == container)
        .and_then(|(_, codecs)| codecs.first().copied())
}

/// Pick the subtitle codec for an output path, checking the container accepts it
pub fn resolve_subtitle_codec(output: &Path, requested: Option<&str>) -> Result<String, MuxError> {
    let container = output
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let accepted = CONTAINER_SUBTITLE_CODECS
        .iter()
        .find(|(ext, _)| *ext == container)
        .map(|(_, codecs)| *codecs);

    match (accepted, requested) {
        (Some(codecs), Some(codec)) if codecs.contains(&codec) => Ok(codec.to_string()),
        (Some(codecs), None) => Ok(codecs[0].to_string()),
        (_, requested) => Err(MuxError::UnsupportedContainer {
            container,
            codec: requested.unwrap_or("text subtitle").to_string(),
        }),
    }
}

/// Escape a path for use as a filter option value inside a filtergraph.
///
/// Two levels apply: the option value (`\ ' : =`) and the filtergraph
/// description (`\ ' [ ] , ;`).
pub fn escape_filter_path(path: &Path) -> String {
    fn escape(input: &str, special: &[char]) -> String {
        let mut escaped = String::with_capacity(input.len());
        for c in input.chars() {
            if special.contains(&c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    let value = escape(&path.to_string_lossy(), &['\\', '\'', ':', '=']);
    escape(&value, &['\\', '\'', '[', ']', ',', ';'])
}

/// Job extracting a mono PCM WAV track for speech recognition
pub fn audio_extraction_job(source: &Path, audio: &Path, sample_rate: u32, channels: u32) -> MuxJob {
    MuxJob::new(audio)
        .input(source)
        .no_video()
        .codec("a", "pcm_s16le")
        .audio_format(sample_rate, channels)
}

/// Job copying every source stream and adding the subtitle file as a new stream.
///
/// `existing_subtitle_streams` is the number of subtitle streams already in the
/// source; the new stream is the next one, and both its language and title
/// metadata are addressed to it.
pub fn soft_embed_job(
    source: &Path,
    subtitle: &Path,
    output: &Path,
    language: &str,
    codec: &str,
    existing_subtitle_streams: usize,
) -> MuxJob {
    let new_stream = format!("s:s:{}", existing_subtitle_streams);
    let title = subtitle
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    MuxJob::new(output)
        .input(source)
        .input(subtitle)
        .map("0")
        .map("1:0")
        .codec("", "copy")
        .codec("s", codec)
        .metadata(new_stream.clone(), "language", language)
        .metadata(new_stream, "title", title)
}

/// Job re-encoding the video with the subtitle file rendered into the frames
pub fn hard_burn_job(source: &Path, subtitle: &Path, output: &Path, video_codec: Option<&str>) -> MuxJob {
    let mut job = MuxJob::new(output)
        .input(source)
        .map("0:v:0")
        .map("0:a?")
        .video_filter(format!("subtitles={}", escape_filter_path(subtitle)));

    if let Some(codec) = video_codec {
        job = job.codec("v", codec);
    }

    job.codec("a", "copy")
}

/// Runs the muxing steps of the pipeline against a media engine
#[derive(Debug, Clone)]
pub struct Muxer {
    engine: Arc<dyn MediaEngine>,
    config: MediaConfig,
}

impl Muxer {
    pub fn new(engine: Arc<dyn MediaEngine>, config: MediaConfig) -> Self {
        Self { engine, config }
    }

    /// Subtitle codec the soft output will use, or why its container cannot take one
    pub fn soft_subtitle_codec(&self, output: &Path) -> Result<String, MuxError> {
        resolve_subtitle_codec(output, self.config.soft_subtitle_codec.as_deref())
    }

    /// Extract the audio track of `source` into `audio`
    pub async fn extract_audio(&self, source: &Path, audio: &Path) -> Result<(), MuxError> {
        info!("Extracting audio to {:?}", audio);
        let job = audio_extraction_job(source, audio, self.config.audio_sample_rate, self.config.audio_channels);
        self.engine.execute(&job).await
    }

    /// Embed a subtitle file as a selectable track.
    ///
    /// Audio and video are stream-copied; the subtitle stream is tagged with
    /// `language` and titled after the subtitle file. Any previous `output`
    /// is overwritten.
    pub async fn embed_soft(&self, source: &Path, subtitle: &Path, output: &Path, language: &str) -> Result<(), MuxError> {
        let codec = self.soft_subtitle_codec(output)?;

        let streams = self.engine.probe_streams(source).await?;
        if count_streams(&streams, StreamKind::Video) == 0 {
            return Err(MuxError::Probe(format!("No video stream in {:?}", source)));
        }
        let existing = count_streams(&streams, StreamKind::Subtitle);
        debug!("Source has {} streams, {} of them subtitles", streams.len(), existing);

        info!("Embedding {} subtitle track into {:?}", codec, output);
        let job = soft_embed_job(source, subtitle, output, language, &codec, existing);
        self.engine.execute(&job).await
    }

    /// Burn a subtitle file into the video frames.
    ///
    /// The subtitle file is read by path while the engine renders, so it must
    /// stay in place until this returns. On error the state of `output` is
    /// undefined.
    pub async fn burn_hard(&self, source: &Path, subtitle: &Path, output: &Path) -> Result<(), MuxError> {
        info!("Burning subtitles into {:?}", output);
        let job = hard_burn_job(source, subtitle, output, self.config.burn_video_codec.as_deref());
        self.engine.execute(&job).await
    }
}
