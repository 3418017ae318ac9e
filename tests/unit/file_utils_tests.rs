/*!
 * Tests for file utility functions
 */

use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use subpipe::file_utils::{ArtifactPaths, FileManager};
use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "test_file_exists.tmp", "test content")?;

    assert!(FileManager::file_exists(&test_file));
    Ok(())
}

/// Test that file_exists returns false for non-existent files and directories
#[test]
fn test_file_exists_withNonExistentFile_shouldReturnFalse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    assert!(!FileManager::file_exists(temp_dir.path().join("missing.tmp")));
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}

/// Test derived artifact naming next to the source
#[test]
fn test_artifact_paths_withSourceOnly_shouldNameSiblings() -> Result<()> {
    let paths = ArtifactPaths::for_source("/videos/talk.mp4", None)?;

    assert_eq!(paths.audio(), PathBuf::from("/videos/audio-talk.wav"));
    assert_eq!(paths.subtitle("en"), PathBuf::from("/videos/sub-talk.en.srt"));
    assert_eq!(paths.soft_output(), PathBuf::from("/videos/subbed-talk.mp4"));
    assert_eq!(paths.hard_output(), PathBuf::from("/videos/hardsubbed-talk.mp4"));
    Ok(())
}

/// Test that a relative source with no directory keeps artifacts relative
#[test]
fn test_artifact_paths_withBareFileName_shouldStayRelative() -> Result<()> {
    let paths = ArtifactPaths::for_source("talk.mkv", None)?;
    assert_eq!(paths.soft_output(), PathBuf::from("subbed-talk.mkv"));
    Ok(())
}

/// Test that only the last extension is replaced
#[test]
fn test_artifact_paths_withDottedStem_shouldKeepInnerDots() -> Result<()> {
    let paths = ArtifactPaths::for_source(Path::new("/v/my.talk.2024.mp4"), None)?;
    assert_eq!(paths.subtitle("fr"), PathBuf::from("/v/sub-my.talk.2024.fr.srt"));
    Ok(())
}

/// Test that atomic writes leave only the final file behind
#[test]
fn test_write_atomically_withNewFile_shouldWriteContentOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("sub-a.en.srt");

    FileManager::write_atomically(&path, "1\n00:00:00,000 --> 00:00:01,000\nHi\n\n")?;
    FileManager::write_atomically(&path, "replaced")?;

    assert_eq!(FileManager::read_to_string(&path)?, "replaced");
    let entries = fs::read_dir(path.parent().unwrap())?.count();
    assert_eq!(entries, 1);
    Ok(())
}

/// Test folder discovery skips derived outputs and non-videos
#[test]
fn test_find_source_videos_withDerivedFiles_shouldReturnSourcesOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_video(dir, "b.mp4")?;
    common::create_test_video(dir, "a.mkv")?;
    common::create_test_video(dir, "subbed-a.mkv")?;
    common::create_test_video(dir, "hardsubbed-a.mkv")?;
    common::create_test_file(dir, "sub-a.en.srt", "")?;
    common::create_test_file(dir, "notes.txt", "")?;
    fs::create_dir(dir.join("season1"))?;
    common::create_test_video(&dir.join("season1"), "c.MOV")?;

    let videos = FileManager::find_source_videos(dir)?;
    let names: Vec<String> = videos
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["a.mkv", "b.mp4", "c.MOV"]);
    Ok(())
}

/// Test the document fingerprint is stable
#[test]
fn test_sha256_hex_withSameContent_shouldMatch() {
    let first = FileManager::sha256_hex(b"1\n00:00:00,000 --> 00:00:01,500\nHi\n\n");
    let second = FileManager::sha256_hex(b"1\n00:00:00,000 --> 00:00:01,500\nHi\n\n");
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);
    assert_ne!(first, FileManager::sha256_hex(b"other"));
}
