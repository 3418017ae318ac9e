/*!
 * End-to-end pipeline tests against recording collaborators
 */

use std::sync::Arc;
use anyhow::Result;
use subpipe::app_config::Config;
use subpipe::errors::{AppError, MuxError, PipelineStage, SubtitleError, TranscriptionError};
use subpipe::media::mock::RecordingEngine;
use subpipe::muxing;
use subpipe::subtitle_processor::{SubtitleDocument, TranscriptSegment};
use subpipe::transcription::mock::MockTranscriber;
use crate::common;

/// Test that a full run writes every artifact under the expected names
#[tokio::test]
async fn test_run_withValidSource_shouldProduceAllArtifacts() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let engine = Arc::new(RecordingEngine::new());
    let transcriber = Arc::new(MockTranscriber::returning("en", common::sample_segments()));
    let controller = common::test_controller(engine.clone(), transcriber.clone());

    let report = controller.run(&source).await?;

    let dir = temp_dir.path();
    assert_eq!(report.audio, dir.join("audio-talk.wav"));
    assert_eq!(report.subtitle, dir.join("sub-talk.en.srt"));
    assert_eq!(report.soft_output, dir.join("subbed-talk.mp4"));
    assert_eq!(report.hard_output, dir.join("hardsubbed-talk.mp4"));
    assert_eq!(report.language, "en");
    assert_eq!(report.cue_count, 3);
    assert!(!report.audio_reused);

    assert!(report.audio.exists());
    assert!(report.soft_output.exists());
    assert!(report.hard_output.exists());
    assert!(!dir.join("audio-talk.partial.wav").exists());
    assert_eq!(transcriber.calls(), vec![report.audio.clone()]);
    Ok(())
}

/// Test that the persisted document is the built document
#[tokio::test]
async fn test_run_withValidSource_shouldPersistParsableSubRip() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let segments = common::sample_segments();
    let controller = common::test_controller(
        Arc::new(RecordingEngine::new()),
        Arc::new(MockTranscriber::returning("en", segments.clone())),
    );

    let report = controller.run(&source).await?;

    let content = std::fs::read_to_string(&report.subtitle)?;
    assert!(content.starts_with("1\n00:00:00,000 --> 00:00:02,500\nNever gonna give you up\n\n"));
    let document = SubtitleDocument::parse_srt(&content)?;
    assert_eq!(document.len(), segments.len());
    assert_eq!(document.cues[2].text, segments[2].text);
    assert_eq!(report.subtitle_sha256, subpipe::file_utils::FileManager::sha256_hex(content.as_bytes()));
    Ok(())
}

/// Test the soft job keeps both the language tag and the title
#[tokio::test]
async fn test_run_withDetectedLanguage_shouldTagSoftTrack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let engine = Arc::new(RecordingEngine::new());
    let controller = common::test_controller(
        engine.clone(),
        Arc::new(MockTranscriber::returning("en", common::sample_segments())),
    );

    controller.run(&source).await?;

    let job = engine.job_for_output("subbed-talk.mp4").expect("soft job recorded");
    assert_eq!(job.inputs, vec![source.clone(), temp_dir.path().join("sub-talk.en.srt")]);
    assert_eq!(job.maps, vec!["0", "1:0"]);
    assert_eq!(job.codec_for(""), Some("copy"));
    assert_eq!(job.codec_for("s"), Some("mov_text"));
    assert_eq!(job.metadata_value("s:s:0", "language"), Some("en"));
    assert_eq!(job.metadata_value("s:s:0", "title"), Some("sub-talk.en"));
    assert!(job.video_filters.is_empty());
    Ok(())
}

/// Test the burn job renders the persisted document and re-encodes video
#[tokio::test]
async fn test_run_withValidSource_shouldBurnPersistedDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let engine = Arc::new(RecordingEngine::new());
    let controller = common::test_controller(
        engine.clone(),
        Arc::new(MockTranscriber::returning("en", common::sample_segments())),
    );

    let report = controller.run(&source).await?;

    let job = engine.job_for_output("hardsubbed-talk.mp4").expect("burn job recorded");
    assert_eq!(job.inputs, vec![source]);
    assert_eq!(
        job.video_filters,
        vec![format!("subtitles={}", muxing::escape_filter_path(&report.subtitle))]
    );
    assert_ne!(job.codec_for("v"), Some("copy"));
    assert_eq!(job.codec_for("a"), Some("copy"));
    assert!(report.subtitle.exists());
    Ok(())
}

/// Test that a rerun reuses the audio and reproduces the same document
#[tokio::test]
async fn test_run_twice_withSameInputs_shouldSkipExtractionAndMatch() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let engine = Arc::new(RecordingEngine::new());
    let controller = common::test_controller(
        engine.clone(),
        Arc::new(MockTranscriber::returning("en", common::sample_segments())),
    );

    let first = controller.run(&source).await?;
    let jobs_after_first = engine.jobs().len();
    let second = controller.run(&source).await?;

    assert_eq!(jobs_after_first, 3);
    assert_eq!(engine.jobs().len(), 5);
    assert!(!first.audio_reused);
    assert!(second.audio_reused);
    assert_eq!(first.subtitle_sha256, second.subtitle_sha256);

    let audio_jobs = engine.jobs().iter().filter(|job| job.output == first.audio.with_extension("partial.wav")).count();
    assert_eq!(audio_jobs, 1);
    Ok(())
}

/// Test that a three-letter language report is shortened for file names and tags
#[tokio::test]
async fn test_run_withThreeLetterLanguage_shouldNormalizeCode() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mkv")?;
    let engine = Arc::new(RecordingEngine::new());
    let controller = common::test_controller(
        engine.clone(),
        Arc::new(MockTranscriber::returning("FRA", vec![TranscriptSegment::new(0.0, 1.0, "Bonjour")])),
    );

    let report = controller.run(&source).await?;

    assert_eq!(report.language, "fr");
    assert_eq!(report.subtitle, temp_dir.path().join("sub-talk.fr.srt"));
    let job = engine.job_for_output("subbed-talk.mkv").expect("soft job recorded");
    assert_eq!(job.codec_for("s"), Some("srt"));
    assert_eq!(job.metadata_value("s:s:0", "language"), Some("fr"));
    Ok(())
}

/// Test that artifacts go to the configured output directory
#[tokio::test]
async fn test_run_withOutputDir_shouldWriteArtifactsThere() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let out_dir = temp_dir.path().join("out");
    let config = Config {
        output_dir: Some(out_dir.clone()),
        ..Config::default()
    };
    let controller = common::test_controller_with_config(
        config,
        Arc::new(RecordingEngine::new()),
        Arc::new(MockTranscriber::returning("en", common::sample_segments())),
    );

    let report = controller.run(&source).await?;

    assert_eq!(report.subtitle, out_dir.join("sub-talk.en.srt"));
    assert!(out_dir.join("audio-talk.wav").exists());
    assert!(out_dir.join("subbed-talk.mp4").exists());
    assert!(out_dir.join("hardsubbed-talk.mp4").exists());
    Ok(())
}

/// Test that a transcription failure stops before any subtitle is written
#[tokio::test]
async fn test_run_withTranscriptionFailure_shouldStopAtTranscribe() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let engine = Arc::new(RecordingEngine::new());
    let controller = common::test_controller(
        engine.clone(),
        Arc::new(MockTranscriber::failing("failed to initialize whisper context")),
    );

    let err = controller.run(&source).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::Transcribe);
    assert!(err.to_string().contains("failed to initialize whisper context"));
    assert!(temp_dir.path().join("audio-talk.wav").exists());
    let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".srt") || name.starts_with("subbed-") || name.starts_with("hardsubbed-"))
        .collect();
    assert!(leftovers.is_empty(), "unexpected artifacts: {:?}", leftovers);
    assert_eq!(engine.jobs().len(), 1);
    Ok(())
}

/// Test that silence is reported as an empty transcription
#[tokio::test]
async fn test_run_withNoSegments_shouldFailWithEmptyResult() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "silence.mp4")?;
    let controller = common::test_controller(
        Arc::new(RecordingEngine::new()),
        Arc::new(MockTranscriber::returning("en", Vec::new())),
    );

    let err = controller.run(&source).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::Transcribe);
    assert!(matches!(err.source, AppError::Transcription(TranscriptionError::EmptyResult)));
    Ok(())
}

/// Test that a language code unfit for a file name is refused
#[tokio::test]
async fn test_run_withUnsafeLanguageCode_shouldFailWithUnknownLanguage() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let controller = common::test_controller(
        Arc::new(RecordingEngine::new()),
        Arc::new(MockTranscriber::returning("../en", common::sample_segments())),
    );

    let err = controller.run(&source).await.expect_err("run should fail");

    assert!(matches!(err.source, AppError::Transcription(TranscriptionError::UnknownLanguage(_))));
    Ok(())
}

/// Test that an invalid segment fails the build stage without persisting anything
#[tokio::test]
async fn test_run_withInvalidSegment_shouldStopAtBuildSubtitles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let controller = common::test_controller(
        Arc::new(RecordingEngine::new()),
        Arc::new(MockTranscriber::returning("en", vec![
            TranscriptSegment::new(0.0, 1.0, "fine"),
            TranscriptSegment::new(3.0, 2.0, "backwards"),
        ])),
    );

    let err = controller.run(&source).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::BuildSubtitles);
    assert!(!temp_dir.path().join("sub-talk.en.srt").exists());
    Ok(())
}

/// Test that a failed extraction leaves no audio to be reused later
#[tokio::test]
async fn test_run_withExtractionFailure_shouldLeaveNoAudio() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let transcriber = Arc::new(MockTranscriber::returning("en", common::sample_segments()));
    let controller = common::test_controller(
        Arc::new(RecordingEngine::new().failing_for("audio-")),
        transcriber.clone(),
    );

    let err = controller.run(&source).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::ExtractAudio);
    assert!(!temp_dir.path().join("audio-talk.wav").exists());
    assert!(!temp_dir.path().join("audio-talk.partial.wav").exists());
    assert!(transcriber.calls().is_empty());
    Ok(())
}

/// Test that a failed burn keeps the soft output and names the stage
#[tokio::test]
async fn test_run_withBurnFailure_shouldKeepSoftOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let controller = common::test_controller(
        Arc::new(RecordingEngine::new().failing_for("hardsubbed-")),
        Arc::new(MockTranscriber::returning("en", common::sample_segments())),
    );

    let err = controller.run(&source).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::BurnHard);
    assert!(matches!(err.source, AppError::Mux(MuxError::EngineFailed { .. })));
    assert!(temp_dir.path().join("subbed-talk.mp4").exists());
    assert!(temp_dir.path().join("sub-talk.en.srt").exists());
    assert!(temp_dir.path().join("audio-talk.wav").exists());
    Ok(())
}

/// Test that sequential mode stops before the burn when embedding fails
#[tokio::test]
async fn test_run_sequential_withEmbedFailure_shouldNotBurn() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let engine = Arc::new(RecordingEngine::new().failing_for("subbed-"));
    let mut config = Config::default();
    config.media.parallel_outputs = false;
    let controller = common::test_controller_with_config(
        config,
        engine.clone(),
        Arc::new(MockTranscriber::returning("en", common::sample_segments())),
    );

    let err = controller.run(&source).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::EmbedSoft);
    assert!(engine.job_for_output("hardsubbed-talk.mp4").is_none());
    Ok(())
}

/// Test that a container without a text subtitle codec is refused
#[tokio::test]
async fn test_run_withAviSource_shouldFailBeforeAnyWork() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "old.avi")?;
    let engine = Arc::new(RecordingEngine::new());
    let transcriber = Arc::new(MockTranscriber::returning("en", common::sample_segments()));
    let controller = common::test_controller(engine.clone(), transcriber.clone());

    let err = controller.run(&source).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::EmbedSoft);
    assert!(matches!(
        err.source,
        AppError::Mux(MuxError::UnsupportedContainer { ref container, .. }) if container == "avi"
    ));
    assert!(engine.jobs().is_empty());
    assert!(transcriber.calls().is_empty());
    assert!(!temp_dir.path().join("audio-old.wav").exists());
    assert!(!temp_dir.path().join("sub-old.en.srt").exists());
    Ok(())
}

/// Test that cue text which cannot survive a SubRip round trip is caught when persisting
#[tokio::test]
async fn test_run_withBlankLineInCueText_shouldFailAtPersist() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let source = common::create_test_video(temp_dir.path(), "talk.mp4")?;
    let engine = Arc::new(RecordingEngine::new());
    let controller = common::test_controller(
        engine.clone(),
        Arc::new(MockTranscriber::returning(
            "en",
            vec![TranscriptSegment::new(0.0, 2.0, "first\n\nsecond")],
        )),
    );

    let err = controller.run(&source).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::PersistSubtitles);
    assert!(matches!(err.source, AppError::Subtitle(SubtitleError::Parse { .. })));
    assert!(engine.job_for_output("subbed-talk.mp4").is_none());
    assert!(engine.job_for_output("hardsubbed-talk.mp4").is_none());
    Ok(())
}

/// Test that a missing source fails before anything runs
#[tokio::test]
async fn test_run_withMissingSource_shouldFailAtExtraction() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let engine = Arc::new(RecordingEngine::new());
    let controller = common::test_controller(
        engine.clone(),
        Arc::new(MockTranscriber::returning("en", common::sample_segments())),
    );

    let err = controller.run(&temp_dir.path().join("missing.mp4")).await.expect_err("run should fail");

    assert_eq!(err.stage, PipelineStage::ExtractAudio);
    assert!(matches!(err.source, AppError::Io { .. }));
    assert!(engine.jobs().is_empty());
    Ok(())
}
