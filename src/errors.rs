/*!
 * Error types for the subpipe application.
 *
 * This module contains custom error types for the different stages of the
 * subtitle pipeline, using the thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while formatting, building or parsing subtitle documents
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtitleError {
    /// Malformed timing or text reaching the formatter or builder
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed SubRip content
    #[error("Failed to parse SubRip content at line {line}: {message}")]
    Parse {
        /// 1-based line number where parsing failed
        line: usize,
        /// What was wrong with the line
        message: String,
    },
}

/// Errors raised by the speech-to-text collaborator
#[derive(Error, Debug)]
pub enum TranscriptionError {
    /// The ASR binary could not be started
    #[error("Failed to start transcription engine '{program}': {message}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// OS error message
        message: String,
    },

    /// The ASR engine exited unsuccessfully
    #[error("Transcription engine failed (exit status {status:?}): {message}")]
    EngineFailed {
        /// Exit code, if the process was not killed by a signal
        status: Option<i32>,
        /// Diagnostic output from the engine
        message: String,
    },

    /// The engine output could not be understood
    #[error("Failed to parse transcription output: {0}")]
    Parse(String),

    /// The engine produced no usable segments
    #[error("Transcription produced no usable segments")]
    EmptyResult,

    /// The engine reported a language code that is not ISO 639
    #[error("Transcription reported an unknown language code: '{0}'")]
    UnknownLanguage(String),

    /// The configured model file is missing
    #[error("Whisper model not found: {0:?}")]
    ModelNotFound(PathBuf),
}

/// Errors raised by the media engine collaborator
#[derive(Error, Debug)]
pub enum MuxError {
    /// The media binary could not be started
    #[error("Failed to start media engine '{program}': {message}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// OS error message
        message: String,
    },

    /// The media engine exited unsuccessfully
    #[error("{program} failed (exit status {status:?}): {message}")]
    EngineFailed {
        /// Program that failed
        program: String,
        /// Exit code, if the process was not killed by a signal
        status: Option<i32>,
        /// Filtered diagnostic output from the engine
        message: String,
    },

    /// No text subtitle codec is known for the output container
    #[error("Container '{container}' cannot carry a '{codec}' subtitle stream")]
    UnsupportedContainer {
        /// Output container, as its file extension
        container: String,
        /// Requested or derived subtitle codec
        codec: String,
    },

    /// Stream probing failed or returned something unexpected
    #[error("Failed to probe media streams: {0}")]
    Probe(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from subtitle formatting or parsing
    #[error("Subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// Error from the transcription collaborator
    #[error("Transcription error: {0}")]
    Transcription(#[from] TranscriptionError),

    /// Error from the media engine
    #[error("Mux error: {0}")]
    Mux(#[from] MuxError),

    /// Filesystem failure on an artifact
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Pipeline stage, used to tell the caller where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Audio extraction from the source video
    ExtractAudio,
    /// Speech-to-text on the extracted audio
    Transcribe,
    /// Building the SubRip document
    BuildSubtitles,
    /// Writing the SubRip document to disk
    PersistSubtitles,
    /// Soft subtitle track embedding
    EmbedSoft,
    /// Hard subtitle burn-in
    BurnHard,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ExtractAudio => "audio extraction",
            Self::Transcribe => "transcription",
            Self::BuildSubtitles => "subtitle building",
            Self::PersistSubtitles => "subtitle persistence",
            Self::EmbedSoft => "soft subtitle embedding",
            Self::BurnHard => "hard subtitle burn-in",
        };
        write!(f, "{}", name)
    }
}

/// Terminal failure of a pipeline run
#[derive(Error, Debug)]
#[error("Pipeline stopped during {stage}: {source}")]
pub struct PipelineError {
    /// Stage that failed
    pub stage: PipelineStage,
    /// What went wrong
    #[source]
    pub source: AppError,
}

impl PipelineError {
    /// Attach a stage to any error convertible into `AppError`
    pub fn at(stage: PipelineStage, error: impl Into<AppError>) -> Self {
        Self { stage, source: error.into() }
    }
}
