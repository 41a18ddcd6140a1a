//! Timestamped lyrics and playback-time synchronization.

pub mod load;
pub mod sync;

pub use load::{parse_srt, LyricsData, LyricsError};
pub use sync::{LyricsConfig, LyricsSubscription, LyricsSynchronizer, SubscriptionId};

use serde::{Deserialize, Serialize};

/// A single word with its own timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTimestamp {
    /// The word as transcribed
    pub word: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

/// A transcribed lyric line
///
/// Segments are assumed chronological and non-overlapping; this is not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsSegment {
    /// Line text
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Word-level timing, when the transcription provides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<WordTimestamp>>,
}

impl LyricsSegment {
    /// Create a segment without word timing
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            words: None,
        }
    }

    /// Attach word timing
    pub fn with_words(mut self, words: Vec<WordTimestamp>) -> Self {
        self.words = Some(words);
        self
    }

    /// Fraction of the segment elapsed at `t`, in [0, 1].
    ///
    /// Zero-length segments report 0.
    pub fn progress(&self, t: f64) -> f32 {
        let span = self.end - self.start;
        if !span.is_finite() || span <= 0.0 || !t.is_finite() {
            return 0.0;
        }
        ((t - self.start) / span).clamp(0.0, 1.0) as f32
    }
}

/// What the lyrics display should show right now
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LyricsState {
    /// Index of the active line (-1 if none)
    pub current_line_index: i32,
    /// Index of the active word within the line (-1 if none)
    pub current_word_index: i32,
    /// Active line text
    pub current_line: String,
    /// Active word text
    pub current_word: String,
    /// Progress through the active line (0.0 - 1.0)
    pub progress: f32,
    /// Whether a line is selected
    pub is_active: bool,
    /// Whether playback is past the end of the last line
    pub ended: bool,
}

impl Default for LyricsState {
    fn default() -> Self {
        Self {
            current_line_index: -1,
            current_word_index: -1,
            current_line: String::new(),
            current_word: String::new(),
            progress: 0.0,
            is_active: false,
            ended: false,
        }
    }
}

/// Anything with a start and end time
pub(crate) trait Timed {
    fn start(&self) -> f64;
    fn end(&self) -> f64;
}

impl Timed for LyricsSegment {
    fn start(&self) -> f64 {
        self.start
    }

    fn end(&self) -> f64 {
        self.end
    }
}

impl Timed for WordTimestamp {
    fn start(&self) -> f64 {
        self.start
    }

    fn end(&self) -> f64 {
        self.end
    }
}

/// Index of the item active at `t`.
///
/// The first item containing `t` wins; otherwise the last item that already
/// started is held (gaps between lines, and everything after the last line).
pub(crate) fn find_active<T: Timed>(items: &[T], t: f64) -> Option<usize> {
    if !t.is_finite() {
        return None;
    }
    items
        .iter()
        .position(|item| item.start() <= t && t <= item.end())
        .or_else(|| items.iter().rposition(|item| item.start() <= t))
}
