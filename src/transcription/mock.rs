/*!
 * Scripted transcriber for testing.
 *
 * - `MockTranscriber::returning(...)` - Always yields the same transcript
 * - `MockTranscriber::failing(...)` - Always fails with an engine error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::{Transcriber, Transcript};
use crate::errors::TranscriptionError;
use crate::subtitle_processor::TranscriptSegment;

/// Behavior mode for the mock transcriber
#[derive(Debug, Clone)]
enum MockOutcome {
    Transcript(Transcript),
    Failure(String),
}

/// Transcriber that replays a fixed result
#[derive(Debug)]
pub struct MockTranscriber {
    outcome: MockOutcome,
    /// Audio paths received, in call order
    calls: Mutex<Vec<PathBuf>>,
}

impl MockTranscriber {
    /// Always return this language and these segments
    pub fn returning(language: impl Into<String>, segments: Vec<TranscriptSegment>) -> Self {
        Self {
            outcome: MockOutcome::Transcript(Transcript {
                language: language.into(),
                segments,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with the given engine message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: MockOutcome::Failure(message.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Audio paths this transcriber was called with
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript, TranscriptionError> {
        self.calls.lock().push(audio_path.to_path_buf());

        match &self.outcome {
            MockOutcome::Transcript(transcript) if transcript.segments.is_empty() => {
                Err(TranscriptionError::EmptyResult)
            }
            MockOutcome::Transcript(transcript) => Ok(transcript.clone()),
            MockOutcome::Failure(message) => Err(TranscriptionError::EngineFailed {
                status: Some(1),
                message: message.clone(),
            }),
        }
    }
}
