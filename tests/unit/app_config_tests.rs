/*!
 * Tests for application configuration functionality
 */

use std::path::PathBuf;
use anyhow::Result;
use subpipe::app_config::{Config, LogLevel};
use subpipe::transcription::{Device, ModelSize};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_path, None);
    assert_eq!(config.output_dir, None);
    assert_eq!(config.transcription.model_size, ModelSize::Small);
    assert_eq!(config.transcription.device, Device::Cpu);
    assert_eq!(config.transcription.whisper_binary, "whisper-cli");
    assert_eq!(config.transcription.language, None);
    assert_eq!(config.media.ffmpeg_binary, "ffmpeg");
    assert_eq!(config.media.ffprobe_binary, "ffprobe");
    assert_eq!(config.media.audio_sample_rate, 16_000);
    assert_eq!(config.media.audio_channels, 1);
    assert!(config.media.parallel_outputs);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();

    config.transcription.language = Some("xyz".to_string());
    assert!(config.validate().is_err());
    config.transcription.language = Some("fr".to_string());
    assert!(config.validate().is_ok());

    config.transcription.threads = Some(0);
    assert!(config.validate().is_err());
    config.transcription.threads = Some(8);
    assert!(config.validate().is_ok());

    config.media.audio_sample_rate = 0;
    assert!(config.validate().is_err());
    config.media.audio_sample_rate = 16_000;

    config.media.soft_subtitle_codec = Some("dvd_subtitle".to_string());
    assert!(config.validate().is_err());
    config.media.soft_subtitle_codec = Some("mov_text".to_string());
    assert!(config.validate().is_ok());

    config.media.ffmpeg_binary = "  ".to_string();
    assert!(config.validate().is_err());
}

/// Test that a config file written by the binary loads back unchanged
#[test]
fn test_config_serialization_withCustomValues_shouldRoundTripThroughFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;

    let mut config = Config::default();
    config.source_path = Some(PathBuf::from("/videos/talk.mp4"));
    config.transcription.model_size = ModelSize::Large;
    config.transcription.device = Device::Gpu;
    config.media.parallel_outputs = false;
    config.log_level = LogLevel::Debug;

    let json = serde_json::to_string_pretty(&config)?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", &json)?;
    let loaded: Config = serde_json::from_str(&std::fs::read_to_string(path)?)?;

    assert_eq!(loaded, config);
    Ok(())
}

/// Test that an almost empty file falls back to defaults
#[test]
fn test_config_deserialization_withEmptyObject_shouldUseDefaults() -> Result<()> {
    let config: Config = serde_json::from_str(r#"{"log_level": "warn", "transcription": {"device": "gpu"}}"#)?;

    assert_eq!(config.log_level, LogLevel::Warn);
    assert_eq!(config.transcription.device, Device::Gpu);
    assert_eq!(config.transcription.model_size, ModelSize::Small);
    assert_eq!(config.media, Config::default().media);
    Ok(())
}

/// Test the model file location
#[test]
fn test_model_path_withModelSize_shouldPointAtGgmlFile() {
    let mut config = Config::default();
    config.transcription.models_dir = Some(PathBuf::from("/opt/whisper/models"));
    config.transcription.model_size = ModelSize::Large;

    assert_eq!(
        config.transcription.model_path(),
        PathBuf::from("/opt/whisper/models/ggml-large-v3.bin")
    );
}
