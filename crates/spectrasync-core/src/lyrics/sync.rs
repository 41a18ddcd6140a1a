//! Lyrics Synchronizer - maps the playback clock onto lines and words
//!
//! The synchronizer is recomputed from scratch on every `update` call; the
//! only state it carries between calls is the last published state and the
//! notification throttle.

use super::{find_active, LyricsSegment, LyricsState};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Identifier handed out by [`LyricsSynchronizer::subscribe`]
pub type SubscriptionId = u64;

/// Lyrics synchronization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// Track the active word when segments carry word timing
    pub word_highlighting: bool,
    /// Minimum time between two change notifications (milliseconds)
    pub notify_interval_ms: u64,
    /// Queued notifications per subscriber before new ones are dropped
    pub channel_capacity: usize,
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            word_highlighting: true,
            notify_interval_ms: 16,
            channel_capacity: 32,
        }
    }
}

/// Receiving end of a lyrics subscription
#[derive(Debug)]
pub struct LyricsSubscription {
    id: SubscriptionId,
    receiver: Receiver<LyricsState>,
}

impl LyricsSubscription {
    /// Subscription ID (for unsubscribing)
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Underlying channel
    pub fn receiver(&self) -> &Receiver<LyricsState> {
        &self.receiver
    }

    /// Next queued state, if any
    pub fn try_recv(&self) -> Option<LyricsState> {
        self.receiver.try_recv().ok()
    }

    /// Drain the queue and keep only the newest state
    pub fn latest(&self) -> Option<LyricsState> {
        self.receiver.try_iter().last()
    }
}

/// Maps a playback timestamp to the active line, word and progress
#[derive(Debug)]
pub struct LyricsSynchronizer {
    /// Loaded segments (chronological)
    segments: Vec<LyricsSegment>,
    /// Last computed state
    state: LyricsState,
    /// Settings
    config: LyricsConfig,
    /// Live subscribers
    subscribers: Vec<(SubscriptionId, Sender<LyricsState>)>,
    /// Next subscription ID
    next_id: SubscriptionId,
    /// When subscribers were last notified
    last_notified: Option<Instant>,
    /// A change is waiting for the throttle window to pass
    pending: bool,
}

impl LyricsSynchronizer {
    /// Create an empty synchronizer
    pub fn new(config: LyricsConfig) -> Self {
        Self {
            segments: Vec::new(),
            state: LyricsState::default(),
            config,
            subscribers: Vec::new(),
            next_id: 1,
            last_notified: None,
            pending: false,
        }
    }

    /// Replace the segment list and reset to "no active line".
    ///
    /// Subscribers are told about the reset immediately.
    pub fn load(&mut self, segments: Vec<LyricsSegment>) {
        debug!("Lyrics loaded: {} segments", segments.len());
        self.segments = segments;
        self.state = LyricsState::default();
        self.publish();
        // A new track shows its first line without waiting out the throttle
        self.last_notified = None;
    }

    /// Recompute the state for `current_time` seconds of playback
    pub fn update(&mut self, current_time: f64) -> &LyricsState {
        self.update_at(current_time, Instant::now())
    }

    /// [`update`](Self::update) with an explicit wall-clock instant for the throttle
    pub fn update_at(&mut self, current_time: f64, now: Instant) -> &LyricsState {
        let next = self.compute(current_time);
        if next != self.state {
            if next.current_line_index != self.state.current_line_index {
                trace!(
                    "Lyrics line {} -> {} at {:.3}s",
                    self.state.current_line_index,
                    next.current_line_index,
                    current_time
                );
            }
            self.state = next;
            self.pending = true;
        }

        if self.pending && self.throttle_elapsed(now) {
            self.notify(now);
        }

        &self.state
    }

    /// Last computed state
    pub fn state(&self) -> &LyricsState {
        &self.state
    }

    /// Loaded segments
    pub fn segments(&self) -> &[LyricsSegment] {
        &self.segments
    }

    /// Active settings
    pub fn config(&self) -> &LyricsConfig {
        &self.config
    }

    /// Toggle word tracking; takes effect on the next update
    pub fn set_word_highlighting(&mut self, enabled: bool) {
        self.config.word_highlighting = enabled;
    }

    /// Register for change notifications
    pub fn subscribe(&mut self) -> LyricsSubscription {
        let id = self.next_id;
        self.next_id += 1;
        let (tx, rx) = bounded(self.config.channel_capacity.max(1));
        self.subscribers.push((id, tx));
        debug!("Lyrics subscriber {} added", id);
        LyricsSubscription { id, receiver: rx }
    }

    /// Remove a subscriber; returns false if the ID is unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn compute(&self, t: f64) -> LyricsState {
        let Some(line_index) = find_active(&self.segments, t) else {
            return LyricsState::default();
        };
        let segment = &self.segments[line_index];

        let (word_index, word) = if self.config.word_highlighting {
            segment
                .words
                .as_deref()
                .and_then(|words| find_active(words, t).map(|i| (i as i32, words[i].word.clone())))
                .unwrap_or((-1, String::new()))
        } else {
            (-1, String::new())
        };

        let ended = self.segments.last().is_some_and(|last| t > last.end);

        LyricsState {
            current_line_index: line_index as i32,
            current_word_index: word_index,
            current_line: segment.text.clone(),
            current_word: word,
            progress: segment.progress(t),
            is_active: true,
            ended,
        }
    }

    fn throttle_elapsed(&self, now: Instant) -> bool {
        let interval = Duration::from_millis(self.config.notify_interval_ms);
        self.last_notified
            .map_or(true, |last| now.saturating_duration_since(last) >= interval)
    }

    fn notify(&mut self, now: Instant) {
        self.publish();
        self.last_notified = Some(now);
    }

    fn publish(&mut self) {
        let state = &self.state;
        self.subscribers.retain(|(id, tx)| match tx.try_send(state.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => {
                debug!("Lyrics subscriber {} disconnected", id);
                false
            }
        });
        self.pending = false;
    }
}

impl Default for LyricsSynchronizer {
    fn default() -> Self {
        Self::new(LyricsConfig::default())
    }
}
