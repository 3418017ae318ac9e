use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::{AppError, PipelineError, PipelineStage, SubtitleError, TranscriptionError};
use crate::file_utils::{ArtifactPaths, FileManager};
use crate::language_utils;
use crate::media::MediaEngine;
use crate::media::ffmpeg::FfmpegEngine;
use crate::muxing::Muxer;
use crate::subtitle_processor::SubtitleDocument;
use crate::transcription::Transcriber;
use crate::transcription::whisper_cli::WhisperCliBackend;

// @module: Pipeline driver for subtitle generation and muxing

/// Artifacts and facts produced by one successful run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Source video
    pub source: PathBuf,
    /// Extracted audio
    pub audio: PathBuf,
    /// Whether the audio already existed and extraction was skipped
    pub audio_reused: bool,
    /// Language reported by the transcriber
    pub language: String,
    /// Number of subtitle cues written
    pub cue_count: usize,
    /// Persisted SubRip document
    pub subtitle: PathBuf,
    /// SHA-256 of the SubRip document
    pub subtitle_sha256: String,
    /// Video with a selectable subtitle track
    pub soft_output: PathBuf,
    /// Video with burned-in subtitles
    pub hard_output: PathBuf,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

/// Outcome of processing a directory
#[derive(Debug, Default)]
pub struct FolderSummary {
    /// Successful runs
    pub reports: Vec<PipelineReport>,
    /// Failed runs, with the failing video
    pub failures: Vec<(PathBuf, PipelineError)>,
}

/// Main application controller driving the subtitle pipeline
#[derive(Debug)]
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Speech-to-text collaborator
    transcriber: Arc<dyn Transcriber>,
    // @field: Muxing steps over the media engine
    muxer: Muxer,
    // @field: Progress display, None when running headless
    progress: Option<MultiProgress>,
}

impl Controller {
    // @method: Create a controller with explicit collaborators
    pub fn new(config: Config, transcriber: Arc<dyn Transcriber>, engine: Arc<dyn MediaEngine>) -> Self {
        let muxer = Muxer::new(engine, config.media.clone());
        Self {
            config,
            transcriber,
            muxer,
            progress: None,
        }
    }

    // @method: Create a controller using whisper.cpp and ffmpeg
    pub fn with_config(config: Config) -> Self {
        info!(
            "Using whisper {} model on {}",
            config.transcription.model_size, config.transcription.device
        );
        let transcriber = Arc::new(WhisperCliBackend::from_config(&config.transcription));
        let engine = Arc::new(FfmpegEngine::from_config(&config.media));
        Self::new(config, transcriber, engine)
    }

    /// Show stage spinners on the terminal
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    fn stage_spinner(&self, source: &Path) -> ProgressBar {
        let Some(multi_progress) = &self.progress else {
            return ProgressBar::hidden();
        };

        let spinner = multi_progress.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {prefix}: {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_prefix(
            source.file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    }

    /// Run the whole pipeline for one source video.
    ///
    /// Stages run in order and the first failure stops the run; artifacts of
    /// completed stages stay on disk. Existing audio is the only thing reused
    /// from a previous run.
    pub async fn run(&self, source: &Path) -> Result<PipelineReport, PipelineError> {
        let start_time = Instant::now();
        let spinner = self.stage_spinner(source);
        let result = self.run_stages(source, &spinner, start_time).await;

        match &result {
            Ok(report) => spinner.finish_with_message(format!(
                "done in {} ({} cues, {})",
                Self::format_duration(report.elapsed),
                report.cue_count,
                report.language
            )),
            Err(e) => spinner.abandon_with_message(format!("failed during {}", e.stage)),
        }

        result
    }

    async fn run_stages(&self, source: &Path, spinner: &ProgressBar, start_time: Instant) -> Result<PipelineReport, PipelineError> {
        use PipelineStage::*;

        if !source.is_file() {
            return Err(PipelineError::at(
                ExtractAudio,
                AppError::io(source, std::io::Error::new(std::io::ErrorKind::NotFound, "source video not found")),
            ));
        }

        let paths = ArtifactPaths::for_source(source, self.config.output_dir.as_deref())
            .map_err(|e| PipelineError::at(ExtractAudio, e))?;
        FileManager::ensure_dir(&paths.dir).map_err(|e| PipelineError::at(ExtractAudio, e))?;

        // A container with no text subtitle codec is refused before any media work
        self.muxer
            .soft_subtitle_codec(&paths.soft_output())
            .map_err(|e| PipelineError::at(EmbedSoft, e))?;

        // 1. Audio, reused when a previous run already extracted it
        spinner.set_message(ExtractAudio.to_string());
        let audio = paths.audio();
        let audio_reused = FileManager::file_exists(&audio);
        if audio_reused {
            info!("Audio already extracted, reusing {:?}", audio);
        } else {
            self.extract_audio(source, &audio).await?;
        }

        // 2. Transcript
        spinner.set_message(Transcribe.to_string());
        info!("Transcribing {:?} with {}", audio, self.transcriber.name());
        let transcript = self.transcriber
            .transcribe(&audio)
            .await
            .map_err(|e| PipelineError::at(Transcribe, e))?;
        if transcript.segments.is_empty() {
            return Err(PipelineError::at(Transcribe, TranscriptionError::EmptyResult));
        }
        let language = Self::normalize_language(&transcript.language)
            .map_err(|e| PipelineError::at(Transcribe, e))?;
        match language_utils::get_language_name(&language) {
            Ok(name) => info!("Detected language: {} ({}), {} segments", name, language, transcript.segments.len()),
            Err(_) => info!("Detected language: {}, {} segments", language, transcript.segments.len()),
        }

        // 3. SubRip document, fully on disk before any muxing reads it
        spinner.set_message(BuildSubtitles.to_string());
        let document = SubtitleDocument::from_segments(&transcript.segments)
            .map_err(|e| PipelineError::at(BuildSubtitles, e))?;
        let content = document.to_string();

        spinner.set_message(PersistSubtitles.to_string());
        let subtitle = paths.subtitle(&language);
        FileManager::write_atomically(&subtitle, &content)
            .map_err(|e| PipelineError::at(PersistSubtitles, e))?;
        Self::verify_persisted(&subtitle, &document)
            .map_err(|e| PipelineError::at(PersistSubtitles, e))?;
        info!("Wrote {} cues to {:?}", document.len(), subtitle);

        // 4 + 5. Soft and hard outputs, independent of each other
        let soft_output = paths.soft_output();
        let hard_output = paths.hard_output();
        let embed = async {
            self.muxer
                .embed_soft(source, &subtitle, &soft_output, &language)
                .await
                .map_err(|e| PipelineError::at(EmbedSoft, e))
        };
        let burn = async {
            self.muxer
                .burn_hard(source, &subtitle, &hard_output)
                .await
                .map_err(|e| PipelineError::at(BurnHard, e))
        };

        if self.config.media.parallel_outputs {
            spinner.set_message(format!("{} + {}", EmbedSoft, BurnHard));
            tokio::try_join!(embed, burn)?;
        } else {
            spinner.set_message(EmbedSoft.to_string());
            embed.await?;
            spinner.set_message(BurnHard.to_string());
            burn.await?;
        }

        Ok(PipelineReport {
            source: source.to_path_buf(),
            audio,
            audio_reused,
            language,
            cue_count: document.len(),
            subtitle,
            subtitle_sha256: FileManager::sha256_hex(content.as_bytes()),
            soft_output,
            hard_output,
            elapsed: start_time.elapsed(),
        })
    }

    /// Extract audio under a temporary name and move it into place, so an
    /// interrupted extraction is never mistaken for a finished one
    async fn extract_audio(&self, source: &Path, audio: &Path) -> Result<(), PipelineError> {
        let stage = PipelineStage::ExtractAudio;
        let partial = audio.with_extension("partial.wav");

        if let Err(e) = self.muxer.extract_audio(source, &partial).await {
            let _ = std::fs::remove_file(&partial);
            return Err(PipelineError::at(stage, e));
        }

        std::fs::rename(&partial, audio).map_err(|e| PipelineError::at(stage, AppError::io(audio, e)))
    }

    /// Read a persisted document back and check it holds exactly the built cues
    fn verify_persisted(path: &Path, expected: &SubtitleDocument) -> Result<(), AppError> {
        let persisted = SubtitleDocument::parse_srt(&FileManager::read_to_string(path)?)?;
        if persisted != *expected {
            return Err(SubtitleError::InvalidInput(format!(
                "{:?} does not read back as the {} cues written",
                path,
                expected.len()
            ))
            .into());
        }
        Ok(())
    }

    /// Check a reported language code and bring it to its shortest ISO form
    fn normalize_language(raw: &str) -> Result<String, TranscriptionError> {
        let code = raw.trim().to_lowercase();
        if !language_utils::is_file_name_safe(&code) {
            return Err(TranscriptionError::UnknownLanguage(raw.to_string()));
        }

        match language_utils::normalize_to_part1_or_part2t(&code) {
            Ok(normalized) => Ok(normalized),
            Err(e) => {
                warn!("Language code issue: {}", e);
                Ok(code)
            }
        }
    }

    /// Run the pipeline for every source video under a directory.
    ///
    /// A failing video is logged and the remaining ones still run.
    pub async fn run_folder(&self, input_dir: &Path) -> Result<FolderSummary, AppError> {
        let start_time = Instant::now();

        if !input_dir.is_dir() {
            return Err(AppError::io(
                input_dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "input directory not found"),
            ));
        }

        let videos = FileManager::find_source_videos(input_dir)?;
        if videos.is_empty() {
            warn!("No video files found in directory: {:?}", input_dir);
        }

        let folder_pb = match &self.progress {
            Some(multi_progress) => {
                let bar = multi_progress.add(ProgressBar::new(videos.len() as u64));
                let style = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                bar.set_style(style);
                bar
            }
            None => ProgressBar::hidden(),
        };

        let mut summary = FolderSummary::default();
        for video in videos {
            match self.run(&video).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!("Error processing {:?}: {}", video, e);
                    summary.failures.push((video, e));
                }
            }
            folder_pb.inc(1);
        }
        folder_pb.finish_and_clear();

        info!(
            "Finished processing {} files ({} failed) in {}",
            summary.reports.len() + summary.failures.len(),
            summary.failures.len(),
            Self::format_duration(start_time.elapsed())
        );

        Ok(summary)
    }

    /// Format a duration for display
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
