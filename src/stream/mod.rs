//! Host-facing speak requests.
//!
//! A host hands [`StreamAdapter::speak`] an ordered list of [`Segment`]s and
//! an [`OutputSite`]. The adapter drives the engine once per speakable
//! segment and writes PCM and [`SpeechEvent`]s back through the site, polling
//! the site's [`ActionFlags`] for cancellation and prosody changes.

mod adapter;
mod wav_site;
mod words;

pub use adapter::{SpeakError, SpeakOutcome, StreamAdapter};
pub use wav_site::WavSite;
pub use words::{parse_bookmark_id, word_spans};

use derive_builder::Builder;

/// What the host wants done with a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKind {
    #[default]
    Speak,
    Silence,
    Pronounce,
    Bookmark,
    SpellOut,
}

/// One unit of a speak request.
///
/// Offsets and lengths are counted in characters of the host's source text.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into))]
pub struct Segment {
    #[builder(default)]
    pub text: String,
    #[builder(default)]
    pub action: ActionKind,
    /// Rate adjustment added to the host rate, -10..=10.
    #[builder(default)]
    pub rate_adjust: i32,
    /// Middle-pitch adjustment, -10..=10.
    #[builder(default)]
    pub pitch_adjust: i32,
    /// Segment volume, 0..=100.
    #[builder(default = "100")]
    pub volume: u32,
    /// Position of `text` in the host's source text.
    #[builder(default)]
    pub source_offset: u32,
}

impl Segment {
    /// Length of `text` in characters.
    pub fn source_len(&self) -> u32 {
        self.text.chars().count() as u32
    }
}

/// Requests the host has pending for the running utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionFlags(u32);

impl ActionFlags {
    pub const NONE: ActionFlags = ActionFlags(0);
    pub const ABORT: ActionFlags = ActionFlags(1);
    pub const SKIP: ActionFlags = ActionFlags(2);
    pub const RATE_CHANGED: ActionFlags = ActionFlags(4);
    pub const VOLUME_CHANGED: ActionFlags = ActionFlags(8);

    pub fn from_bits(bits: u32) -> Self {
        ActionFlags(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: ActionFlags) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }
}

impl std::ops::BitOr for ActionFlags {
    type Output = ActionFlags;

    fn bitor(self, rhs: ActionFlags) -> ActionFlags {
        ActionFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Bookmark,
    WordBoundary,
    SentenceBoundary,
}

impl EventKind {
    /// Bit position in the host's event-interest mask.
    pub fn id(&self) -> u32 {
        match self {
            EventKind::Bookmark => 4,
            EventKind::WordBoundary => 5,
            EventKind::SentenceBoundary => 7,
        }
    }
}

/// Event kinds the host asked to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventInterest(u64);

impl EventInterest {
    pub fn none() -> Self {
        EventInterest(0)
    }

    pub fn from_bits(bits: u64) -> Self {
        EventInterest(bits)
    }

    pub fn bits(&self) -> u64 {
        self.0
    }

    pub fn with(self, kind: EventKind) -> Self {
        EventInterest(self.0 | (1u64 << kind.id()))
    }

    pub fn wants(&self, kind: EventKind) -> bool {
        self.0 & (1u64 << kind.id()) != 0
    }
}

/// Event payload, with its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    /// No payload (an empty bookmark).
    Undefined,
    /// A source text position in characters.
    Position(u32),
    /// The bookmark's text.
    Text(String),
}

/// A timing event correlated to the audio stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub kind: EventKind,
    /// Bytes of audio written before the event.
    pub audio_offset: u64,
    pub stream_index: u32,
    /// Bookmark id, or the length of a sentence/word span.
    pub value: i64,
    pub payload: EventPayload,
}

/// The host's side of one utterance.
///
/// All calls happen on the thread that called
/// [`StreamAdapter::speak`], including the ones made while the engine is
/// producing audio.
pub trait OutputSite {
    /// Pending host requests. Polled before every segment and every chunk.
    fn actions(&mut self) -> ActionFlags;

    /// Acknowledge a skip request.
    fn complete_skip(&mut self, skipped: u32);

    /// Accept audio bytes, returning how many were taken.
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize>;

    /// Current host rate, -10..=10.
    fn rate(&mut self) -> i32;

    /// Current host volume, 0..=100.
    fn volume(&mut self) -> u32;

    fn event_interest(&mut self) -> EventInterest;

    /// Deliver an ordered batch of events.
    fn add_events(&mut self, events: &[SpeechEvent]) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_flags_contains() {
        let flags = ActionFlags::ABORT | ActionFlags::RATE_CHANGED;
        assert!(flags.contains(ActionFlags::ABORT));
        assert!(flags.contains(ActionFlags::RATE_CHANGED));
        assert!(!flags.contains(ActionFlags::SKIP));
        assert!(!flags.contains(ActionFlags::NONE));
        assert_eq!(ActionFlags::from_bits(flags.bits()), flags);
    }

    #[test]
    fn event_interest_bits() {
        let interest = EventInterest::none().with(EventKind::WordBoundary);
        assert!(interest.wants(EventKind::WordBoundary));
        assert!(!interest.wants(EventKind::SentenceBoundary));
        assert_eq!(interest.bits(), 1 << 5);
    }

    #[test]
    fn segment_builder_defaults() {
        let segment = SegmentBuilder::default().text("héllo").build().unwrap();
        assert_eq!(segment.action, ActionKind::Speak);
        assert_eq!(segment.volume, 100);
        assert_eq!(segment.rate_adjust, 0);
        assert_eq!(segment.source_len(), 5);
    }
}
