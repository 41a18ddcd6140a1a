//! Loading lyrics from the transcription feed (JSON) or SubRip files.

use super::{LyricsSegment, WordTimestamp};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors while loading lyrics
#[derive(Error, Debug)]
pub enum LyricsError {
    /// File could not be read
    #[error("Failed to read lyrics file {path}: {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON did not match the lyrics schema
    #[error("Invalid lyrics JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lyrics object pushed once per track by the transcription service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricsData {
    /// Full transcript
    #[serde(default)]
    pub text: String,
    /// Flat word list for the whole track
    #[serde(default)]
    pub words: Vec<WordTimestamp>,
    /// Timed lines
    #[serde(default)]
    pub segments: Vec<LyricsSegment>,
}

impl LyricsData {
    /// Parse the JSON feed format
    pub fn from_json_str(json: &str) -> Result<Self, LyricsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON feed file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LyricsError> {
        let content = read(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Build from SubRip text (no word timing)
    pub fn from_srt_str(srt: &str) -> Self {
        let segments = parse_srt(srt);
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            text,
            words: Vec::new(),
            segments,
        }
    }

    /// Load `.srt` files as SubRip and everything else as JSON
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, LyricsError> {
        let path = path.as_ref();
        let is_srt = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("srt"));
        let data = if is_srt {
            Self::from_srt_str(&read(path)?)
        } else {
            Self::from_json_file(path)?
        };
        debug!(
            "Loaded lyrics from {:?}: {} segments, {} words",
            path,
            data.segments.len(),
            data.words.len()
        );
        Ok(data)
    }

    /// Segments ready for the synchronizer.
    ///
    /// Segments without their own word timing receive the top-level words
    /// whose start falls inside them; each word goes to the first such segment.
    pub fn into_segments(self) -> Vec<LyricsSegment> {
        let mut segments = self.segments;
        if self.words.is_empty() {
            return segments;
        }

        let mut distributed: Vec<Vec<WordTimestamp>> = vec![Vec::new(); segments.len()];
        for word in self.words {
            let target = segments
                .iter()
                .position(|s| s.words.is_none() && s.start <= word.start && word.start <= s.end);
            if let Some(index) = target {
                distributed[index].push(word);
            }
        }

        for (segment, words) in segments.iter_mut().zip(distributed) {
            if segment.words.is_none() && !words.is_empty() {
                segment.words = Some(words);
            }
        }
        segments
    }
}

fn read(path: &Path) -> Result<String, LyricsError> {
    fs::read_to_string(path).map_err(|source| LyricsError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parse SubRip subtitles into segments, sorted by start time.
///
/// Malformed blocks are skipped.
pub fn parse_srt(srt: &str) -> Vec<LyricsSegment> {
    let srt = srt.replace('\r', "");
    let mut out = Vec::new();

    for block in srt.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let lines: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let Some(time_line) = lines.iter().copied().find(|l| l.contains("-->")) else {
            warn!("SRT block without timing line skipped");
            continue;
        };
        let mut parts = time_line.split("-->").map(str::trim);
        let (Some(start), Some(end)) = (
            parts.next().and_then(parse_timecode),
            parts.next().and_then(parse_timecode),
        ) else {
            warn!("SRT block with bad timecode skipped: {}", time_line);
            continue;
        };

        let text = lines
            .iter()
            .copied()
            .filter(|l| *l != time_line && l.parse::<u32>().is_err())
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            continue;
        }

        out.push(LyricsSegment::new(text, start, end));
    }

    out.sort_by(|a, b| a.start.total_cmp(&b.start));
    out
}

/// `HH:MM:SS,mmm` (a `.` separator is accepted too) to seconds
fn parse_timecode(tc: &str) -> Option<f64> {
    // Drop trailing cue settings ("00:00:01,000 X1:40")
    let tc = tc.split_whitespace().next()?;
    let (hms, ms) = tc.split_once([',', '.'])?;
    let mut parts = hms.split(':');
    let hh: f64 = parts.next()?.parse().ok()?;
    let mm: f64 = parts.next()?.parse().ok()?;
    let ss: f64 = parts.next()?.parse().ok()?;
    let ms: f64 = ms.parse().ok()?;
    Some(hh * 3600.0 + mm * 60.0 + ss + ms / 1000.0)
}
