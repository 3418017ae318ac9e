use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: SubRip timecodes, cue building and parsing

// @const: SubRip timing line regex (hours may exceed two digits)
static TIMING_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})\s+-->\s+(\d{2,}):(\d{2}):(\d{2})[,.](\d{3})").unwrap()
});

const MILLIS_PER_HOUR: u64 = 3_600_000;
const MILLIS_PER_MINUTE: u64 = 60_000;
const MILLIS_PER_SECOND: u64 = 1_000;

/// Convert a seconds offset to whole milliseconds.
///
/// The fractional second is rounded to the nearest millisecond and a rounding
/// that reaches 1000ms carries into the seconds, so `3599.9999` becomes
/// `3_600_000`. Negative, NaN and infinite offsets are rejected, as are offsets
/// too large to count in milliseconds.
pub fn seconds_to_millis(seconds: f64) -> Result<u64, SubtitleError> {
    if !seconds.is_finite() {
        return Err(SubtitleError::InvalidInput(format!(
            "timestamp must be a finite number of seconds, got {}",
            seconds
        )));
    }
    if seconds < 0.0 {
        return Err(SubtitleError::InvalidInput(format!(
            "timestamp must not be negative, got {}",
            seconds
        )));
    }

    let out_of_range = || SubtitleError::InvalidInput(format!("timestamp {}s is out of range", seconds));

    let whole = seconds.floor();
    if whole >= u64::MAX as f64 {
        return Err(out_of_range());
    }
    let millis = ((seconds - whole) * 1000.0).round() as u64;

    (whole as u64)
        .checked_mul(MILLIS_PER_SECOND)
        .and_then(|ms| ms.checked_add(millis))
        .ok_or_else(out_of_range)
}

/// Format whole milliseconds as `HH:MM:SS,mmm`. Hours grow past two digits.
pub fn format_millis(ms: u64) -> String {
    let hours = ms / MILLIS_PER_HOUR;
    let minutes = (ms % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let seconds = (ms % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    let millis = ms % MILLIS_PER_SECOND;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Format a seconds offset as a SubRip timecode (`HH:MM:SS,mmm`)
pub fn format_timecode(seconds: f64) -> Result<String, SubtitleError> {
    seconds_to_millis(seconds).map(format_millis)
}

/// Parse a single SubRip timecode back to milliseconds
pub fn parse_timecode(timecode: &str) -> Result<u64, SubtitleError> {
    let invalid = |message: &str| SubtitleError::InvalidInput(format!("{}: '{}'", message, timecode));

    let parts: Vec<&str> = timecode.trim().split(&[':', ',', '.'][..]).collect();
    if parts.len() != 4 {
        return Err(invalid("invalid timecode format"));
    }

    let mut values = [0u64; 4];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part.parse().map_err(|_| invalid("non-numeric timecode component"))?;
    }
    let [hours, minutes, seconds, millis] = values;

    if minutes >= 60 || seconds >= 60 || millis >= 1000 {
        return Err(invalid("timecode component out of range"));
    }

    Ok(hours * MILLIS_PER_HOUR + minutes * MILLIS_PER_MINUTE + seconds * MILLIS_PER_SECOND + millis)
}

/// One timed chunk of text produced by the speech-to-text engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    /// Spoken text, may span several lines
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self { start, end, text: text.into() }
    }
}

// @struct: Single SubRip cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    // @field: 1-based position in the document
    pub index: usize,

    // @field: Start time in ms
    pub start_ms: u64,

    // @field: End time in ms
    pub end_ms: u64,

    // @field: Cue text, verbatim
    pub text: String,
}

impl SubtitleCue {
    // @creates: Cue from a transcript segment
    // @validates: Finite non-negative times, end after start at ms precision, non-empty text
    pub fn from_segment(index: usize, segment: &TranscriptSegment) -> Result<Self, SubtitleError> {
        let start_ms = seconds_to_millis(segment.start)?;
        let end_ms = seconds_to_millis(segment.end)?;

        // Checked after rounding: distinct offsets may land on the same millisecond
        if end_ms <= start_ms {
            return Err(SubtitleError::InvalidInput(format!(
                "cue {} ends at {} which is not after its start at {}",
                index, format_millis(end_ms), format_millis(start_ms)
            )));
        }

        if segment.text.trim().is_empty() {
            return Err(SubtitleError::InvalidInput(format!("cue {} has empty text", index)));
        }

        Ok(Self {
            index,
            start_ms,
            end_ms,
            text: segment.text.clone(),
        })
    }

    /// Start time in seconds
    pub fn start_seconds(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    /// End time in seconds
    pub fn end_seconds(&self) -> f64 {
        self.end_ms as f64 / 1000.0
    }
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", format_millis(self.start_ms), format_millis(self.end_ms))?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Ordered SubRip cues, rendered with `Display` as the document text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleDocument {
    /// Cues in document order
    pub cues: Vec<SubtitleCue>,
}

impl SubtitleDocument {
    /// Build a document from transcript segments.
    ///
    /// Cues are numbered `1..=N` in input order. Segments are trusted to arrive
    /// ordered by start time: nothing is sorted, merged or deduplicated, and an
    /// out-of-order input is only reported in the log.
    pub fn from_segments(segments: &[TranscriptSegment]) -> Result<Self, SubtitleError> {
        let cues = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| SubtitleCue::from_segment(i + 1, segment))
            .collect::<Result<Vec<_>, _>>()?;

        let out_of_order = cues.windows(2).filter(|pair| pair[1].start_ms < pair[0].start_ms).count();
        if out_of_order > 0 {
            warn!("{} subtitle cue(s) start before the previous cue; keeping transcript order", out_of_order);
        }

        let overlapping = cues.windows(2).filter(|pair| pair[0].end_ms > pair[1].start_ms).count();
        if overlapping > 0 {
            debug!("Found {} overlapping subtitle cues", overlapping);
        }

        Ok(Self { cues })
    }

    /// Number of cues
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    /// Whether the document has no cues
    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Parse SubRip text into a document.
    ///
    /// Accepts CRLF line endings, a leading BOM and `.` as the millisecond
    /// separator. Cue indices are kept as written.
    pub fn parse_srt(content: &str) -> Result<Self, SubtitleError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut lines = content.lines().enumerate().peekable();
        let mut cues = Vec::new();

        loop {
            while lines.peek().is_some_and(|(_, line)| line.trim().is_empty()) {
                lines.next();
            }

            let Some((line_idx, index_line)) = lines.next() else {
                break;
            };

            let index = index_line.trim().parse::<usize>().map_err(|_| SubtitleError::Parse {
                line: line_idx + 1,
                message: format!("expected cue index, found '{}'", index_line.trim()),
            })?;

            let (timing_idx, timing_line) = lines.next().ok_or_else(|| SubtitleError::Parse {
                line: line_idx + 2,
                message: format!("cue {} has no timing line", index),
            })?;

            let caps = TIMING_LINE_REGEX.captures(timing_line.trim()).ok_or_else(|| SubtitleError::Parse {
                line: timing_idx + 1,
                message: format!("invalid timing line '{}'", timing_line.trim()),
            })?;

            let start_ms = Self::millis_from_captures(&caps, 1, timing_idx + 1)?;
            let end_ms = Self::millis_from_captures(&caps, 5, timing_idx + 1)?;

            let mut text_lines = Vec::new();
            while let Some((_, line)) = lines.peek() {
                if line.trim().is_empty() {
                    break;
                }
                text_lines.push(*line);
                lines.next();
            }

            cues.push(SubtitleCue {
                index,
                start_ms,
                end_ms,
                text: text_lines.join("\n"),
            });
        }

        Ok(Self { cues })
    }

    /// Parse one side of a timing line to milliseconds
    fn millis_from_captures(caps: &regex::Captures, start_idx: usize, line: usize) -> Result<u64, SubtitleError> {
        let component = |offset: usize| -> Result<u64, SubtitleError> {
            caps.get(start_idx + offset)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| SubtitleError::Parse {
                    line,
                    message: "timing component is not a number".to_string(),
                })
        };

        let hours = component(0)?;
        let minutes = component(1)?;
        let seconds = component(2)?;
        let millis = component(3)?;

        if minutes >= 60 || seconds >= 60 {
            return Err(SubtitleError::Parse {
                line,
                message: "minutes and seconds must be below 60".to_string(),
            });
        }

        Ok(hours * MILLIS_PER_HOUR + minutes * MILLIS_PER_MINUTE + seconds * MILLIS_PER_SECOND + millis)
    }
}

impl fmt::Display for SubtitleDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for cue in &self.cues {
            write!(f, "{}", cue)?;
        }
        Ok(())
    }
}

/// Render transcript segments as a SubRip document string.
///
/// An empty segment list yields an empty string.
pub fn build_document(segments: &[TranscriptSegment]) -> Result<String, SubtitleError> {
    SubtitleDocument::from_segments(segments).map(|document| document.to_string())
}
