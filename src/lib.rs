/*!
 * # subpipe - Subtitle sync and muxing pipeline
 *
 * A Rust library that turns speech in a video into subtitles and puts them back
 * into the video.
 *
 * ## Features
 *
 * - Extract a speech-recognition friendly audio track from a video
 * - Transcribe it with whisper.cpp, detecting the spoken language
 * - Build a SubRip (SRT) document from the timed transcript segments
 * - Embed the subtitles as a selectable, language-tagged track (soft subtitles)
 * - Burn the subtitles into the video frames (hard subtitles)
 * - Reuse extracted audio across reruns
 * - Process a single file or a whole directory
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Timecodes, cues and SubRip documents
 * - `transcription`: Speech-to-text backends:
 *   - `transcription::whisper_cli`: whisper.cpp command-line backend
 *   - `transcription::mock`: Scripted transcriber for tests
 * - `media`: Media engine abstraction:
 *   - `media::ffmpeg`: ffmpeg/ffprobe engine
 *   - `media::mock`: Recording engine for tests
 * - `muxing`: Audio extraction, soft embedding and hard burn-in jobs
 * - `file_utils`: File system operations and artifact naming
 * - `app_controller`: Pipeline driver
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod file_utils;
pub mod subtitle_processor;
pub mod transcription;
pub mod media;
pub mod muxing;
pub mod app_controller;
pub mod language_utils;
pub mod errors;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{Controller, FolderSummary, PipelineReport};
pub use subtitle_processor::{build_document, format_timecode, SubtitleCue, SubtitleDocument, TranscriptSegment};
pub use language_utils::{normalize_to_part2t, get_language_name};
pub use errors::{AppError, MuxError, PipelineError, PipelineStage, SubtitleError, TranscriptionError};
