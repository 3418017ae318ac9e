use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::errors::AppError;

// @module: File and directory utilities

// @const: Prefixes of files this tool writes next to a source video
pub const AUDIO_PREFIX: &str = "audio-";
pub const SUBTITLE_PREFIX: &str = "sub-";
pub const SOFT_OUTPUT_PREFIX: &str = "subbed-";
pub const HARD_OUTPUT_PREFIX: &str = "hardsubbed-";

// @const: Video file extensions recognised in folder mode
const VIDEO_EXTENSIONS: [&str; 14] = [
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v",
    "mpg", "mpeg", "ogv", "ts", "mts", "m2ts",
];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<(), AppError> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| AppError::io(path, e))?;
        }
        Ok(())
    }

    /// Write a string to a file so readers never see a partial file.
    ///
    /// Content goes to a temporary file in the destination directory, is
    /// flushed to disk, then renamed over `path`.
    pub fn write_atomically<P: AsRef<Path>>(path: P, content: &str) -> Result<(), AppError> {
        let path = path.as_ref();
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        Self::ensure_dir(dir)?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| AppError::io(dir, e))?;
        temp.write_all(content.as_bytes()).map_err(|e| AppError::io(temp.path(), e))?;
        temp.as_file().sync_all().map_err(|e| AppError::io(temp.path(), e))?;
        temp.persist(path).map_err(|e| AppError::io(path, e.error))?;

        Ok(())
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, AppError> {
        fs::read_to_string(&path).map_err(|e| AppError::io(path.as_ref(), e))
    }

    /// Hex SHA-256 of some content
    pub fn sha256_hex(content: &[u8]) -> String {
        Sha256::digest(content)
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }

    /// Whether a path has a known video extension
    pub fn is_video_file<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Whether a file is an output of a previous run
    pub fn is_derived_artifact<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref()
            .file_name()
            .map(|n| n.to_string_lossy())
            .is_some_and(|name| {
                [AUDIO_PREFIX, SUBTITLE_PREFIX, SOFT_OUTPUT_PREFIX, HARD_OUTPUT_PREFIX]
                    .iter()
                    .any(|prefix| name.starts_with(prefix))
            })
    }

    /// Find source videos under a directory, skipping derived outputs
    pub fn find_source_videos<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>, AppError> {
        let dir = dir.as_ref();
        let mut result = Vec::new();

        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(dir).to_path_buf();
                AppError::io(path, e.into())
            })?;
            let path = entry.path();

            if path.is_file() && Self::is_video_file(path) && !Self::is_derived_artifact(path) {
                result.push(path.to_path_buf());
            }
        }

        Ok(result)
    }
}

/// Paths of every artifact derived from one source video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Source video
    pub source: PathBuf,
    /// Directory the artifacts are written to
    pub dir: PathBuf,
    /// Source file name without extension
    stem: String,
    /// Source extension including the dot, or empty
    extension: String,
}

impl ArtifactPaths {
    // @generates: Artifact naming for a source video
    // @params: source, output_dir (None = next to the source)
    pub fn for_source<P: AsRef<Path>>(source: P, output_dir: Option<&Path>) -> Result<Self, AppError> {
        let source = source.as_ref();

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config(format!("Source path has no file name: {:?}", source)))?;

        let extension = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let dir = match output_dir {
            Some(dir) => dir.to_path_buf(),
            None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
        };

        Ok(Self {
            source: source.to_path_buf(),
            dir,
            stem,
            extension,
        })
    }

    /// `audio-<stem>.wav`
    pub fn audio(&self) -> PathBuf {
        self.dir.join(format!("{}{}.wav", AUDIO_PREFIX, self.stem))
    }

    /// `sub-<stem>.<language>.srt`
    pub fn subtitle(&self, language: &str) -> PathBuf {
        self.dir.join(format!("{}{}.{}.srt", SUBTITLE_PREFIX, self.stem, language))
    }

    /// `subbed-<stem><ext>`
    pub fn soft_output(&self) -> PathBuf {
        self.dir.join(format!("{}{}{}", SOFT_OUTPUT_PREFIX, self.stem, self.extension))
    }

    /// `hardsubbed-<stem><ext>`
    pub fn hard_output(&self) -> PathBuf {
        self.dir.join(format!("{}{}{}", HARD_OUTPUT_PREFIX, self.stem, self.extension))
    }
}
