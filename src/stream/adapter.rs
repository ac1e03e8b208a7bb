use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::words::{parse_bookmark_id, word_spans};
use super::{
    ActionFlags, ActionKind, EventKind, EventPayload, OutputSite, Segment, SpeechEvent,
};
use crate::catalog::VoiceSelection;
use crate::config::ConfigStore;
use crate::params;
use crate::{AudioFormat, EngineError, EngineFacade};

#[derive(thiserror::Error, Debug)]
pub enum SpeakError {
    #[error("Voice selection failed: {0}")]
    Voice(#[source] EngineError),
    #[error("Audio output failed: {0}")]
    Write(#[source] io::Error),
    #[error("Synthesis failed: {0}")]
    Synthesis(#[source] EngineError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// How an utterance ended, with the audio bytes the host accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Every segment was processed.
    Completed { bytes_written: u64 },
    /// The host aborted or skipped; segments after that point were dropped.
    Cancelled { bytes_written: u64 },
}

impl SpeakOutcome {
    pub fn bytes_written(&self) -> u64 {
        match self {
            SpeakOutcome::Completed { bytes_written } => *bytes_written,
            SpeakOutcome::Cancelled { bytes_written } => *bytes_written,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SpeakOutcome::Cancelled { .. })
    }
}

/// Per-utterance state, owned by one `speak` call.
struct StreamState<'a> {
    site: &'a mut dyn OutputSite,
    bytes_written: u64,
    aborted: bool,
    write_error: Option<io::Error>,
    host_rate: i32,
    host_volume: u32,
}

impl<'a> StreamState<'a> {
    fn new(site: &'a mut dyn OutputSite) -> Self {
        let host_rate = site.rate();
        let host_volume = site.volume();
        Self {
            site,
            bytes_written: 0,
            aborted: false,
            write_error: None,
            host_rate,
            host_volume,
        }
    }

    /// Poll the host for abort and skip. Returns `true` when the utterance
    /// must stop.
    fn cancellation_requested(&mut self, actions: ActionFlags) -> bool {
        if actions.contains(ActionFlags::ABORT) {
            log::debug!("Abort requested after {} bytes", self.bytes_written);
            self.aborted = true;
        } else if actions.contains(ActionFlags::SKIP) {
            log::debug!("Skip requested after {} bytes, stopping utterance", self.bytes_written);
            self.site.complete_skip(0);
            self.aborted = true;
        }
        self.aborted
    }

    fn refresh_prosody(&mut self, actions: ActionFlags) {
        if actions.contains(ActionFlags::RATE_CHANGED) {
            self.host_rate = self.site.rate();
            log::debug!("Host rate changed to {}", self.host_rate);
        }
        if actions.contains(ActionFlags::VOLUME_CHANGED) {
            self.host_volume = self.site.volume();
            log::debug!("Host volume changed to {}", self.host_volume);
        }

        let current = self.site.rate();
        if current != self.host_rate {
            log::debug!(
                "Host rate {} differs from cached {}, using current",
                current,
                self.host_rate
            );
            self.host_rate = current;
        }
    }

    /// Forward one engine chunk to the host. Returns `false` to stop the
    /// engine.
    fn relay(&mut self, chunk: &[i16]) -> bool {
        let actions = self.site.actions();
        if self.cancellation_requested(actions) {
            return false;
        }

        let bytes: Vec<u8> = chunk.iter().flat_map(|s| s.to_le_bytes()).collect();
        let mut remaining = &bytes[..];
        while !remaining.is_empty() {
            match self.site.write(remaining) {
                Ok(0) => {
                    self.write_error = Some(io::ErrorKind::WriteZero.into());
                    return false;
                }
                Ok(n) if n > remaining.len() => {
                    self.write_error = Some(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("host accepted {n} of {} bytes", remaining.len()),
                    ));
                    return false;
                }
                Ok(n) => {
                    self.bytes_written += n as u64;
                    remaining = &remaining[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.write_error = Some(e);
                    return false;
                }
            }
        }
        log::trace!("Relayed {} samples, {} bytes total", chunk.len(), self.bytes_written);
        true
    }

    fn event(&self, kind: EventKind, value: i64, payload: EventPayload) -> SpeechEvent {
        SpeechEvent {
            kind,
            audio_offset: self.bytes_written,
            stream_index: 0,
            value,
            payload,
        }
    }

    fn emit(&mut self, events: &[SpeechEvent]) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.site.add_events(events) {
            log::warn!("Failed to deliver {} events: {e}", events.len());
        }
    }

    fn outcome(&self) -> SpeakOutcome {
        if self.aborted {
            SpeakOutcome::Cancelled {
                bytes_written: self.bytes_written,
            }
        } else {
            SpeakOutcome::Completed {
                bytes_written: self.bytes_written,
            }
        }
    }
}

/// Bridges host speak requests onto an [`EngineFacade`].
///
/// One utterance runs at a time: `speak` holds an internal lock for the
/// whole call, so concurrent callers block until the running utterance ends.
pub struct StreamAdapter<E: EngineFacade> {
    engine: Arc<E>,
    store: Arc<ConfigStore>,
    utterance: Mutex<()>,
    voice: Mutex<Option<String>>,
}

impl<E: EngineFacade> StreamAdapter<E> {
    /// Create an adapter and initialize the engine.
    ///
    /// An engine that fails to initialize is logged; later calls report the
    /// failure through their own results.
    pub fn new(engine: Arc<E>, store: Arc<ConfigStore>) -> Self {
        if let Err(e) = engine.initialize() {
            log::warn!("Engine initialization failed: {e}");
        }
        Self {
            engine,
            store,
            utterance: Mutex::new(()),
            voice: Mutex::new(None),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn output_format(&self) -> AudioFormat {
        AudioFormat::PCM_22050_MONO_16
    }

    /// Engine name of the last successfully selected voice.
    pub fn current_voice(&self) -> Option<String> {
        self.voice.lock().clone()
    }

    /// Select the voice behind a catalog identifier.
    ///
    /// On failure the engine keeps its previous voice and later `speak`
    /// calls still proceed with it.
    pub fn select_voice(&self, exposed_id: &str) -> Result<(), SpeakError> {
        let selection = VoiceSelection::parse(exposed_id);
        let name = selection.engine_name();
        log::debug!("Selecting voice '{name}' for '{exposed_id}'");

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _turn = self.turn();
            self.engine.select_voice(&name)
        }));
        match result {
            Ok(Ok(())) => {
                *self.voice.lock() = Some(name);
                Ok(())
            }
            Ok(Err(e)) => {
                log::warn!("Failed to select voice '{name}', keeping current voice: {e}");
                Err(SpeakError::Voice(e))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Voice selection panicked: {message}");
                Err(SpeakError::Internal(message))
            }
        }
    }

    /// Speak `segments` into `site`.
    ///
    /// Blocks until every segment is processed, the host cancels, or a
    /// write or synthesis failure occurs. Cancellation is reported as
    /// [`SpeakOutcome::Cancelled`], not as an error.
    ///
    /// `flags` are the host's speak flags. They are logged and otherwise
    /// ignored; markup and punctuation handling stay with the host.
    pub fn speak(
        &self,
        flags: u32,
        segments: &[Segment],
        site: &mut dyn OutputSite,
    ) -> Result<SpeakOutcome, SpeakError> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _turn = self.turn();
            self.run(flags, segments, site)
        }));
        match result {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::error!("Speak panicked: {message}");
                Err(SpeakError::Internal(message))
            }
        }
    }

    fn turn(&self) -> MutexGuard<'_, ()> {
        self.utterance.lock()
    }

    fn run(
        &self,
        flags: u32,
        segments: &[Segment],
        site: &mut dyn OutputSite,
    ) -> Result<SpeakOutcome, SpeakError> {
        let mut state = StreamState::new(site);
        log::debug!(
            "Speak: flags={flags:#x}, {} segments, rate={}, volume={}",
            segments.len(),
            state.host_rate,
            state.host_volume
        );

        for (index, segment) in segments.iter().enumerate() {
            let actions = state.site.actions();
            if state.cancellation_requested(actions) {
                break;
            }
            state.refresh_prosody(actions);

            match segment.action {
                ActionKind::Bookmark => {
                    let event = if segment.text.is_empty() {
                        state.event(EventKind::Bookmark, 0, EventPayload::Undefined)
                    } else {
                        state.event(
                            EventKind::Bookmark,
                            parse_bookmark_id(&segment.text) as i64,
                            EventPayload::Text(segment.text.clone()),
                        )
                    };
                    state.emit(&[event]);
                    continue;
                }
                ActionKind::Speak | ActionKind::SpellOut => {}
                other => {
                    log::debug!("Segment {index}: skipping {other:?}");
                    continue;
                }
            }
            if segment.text.is_empty() {
                continue;
            }

            let interest = state.site.event_interest();
            let mut events = Vec::new();
            if interest.wants(EventKind::SentenceBoundary) {
                events.push(state.event(
                    EventKind::SentenceBoundary,
                    segment.source_len() as i64,
                    EventPayload::Position(segment.source_offset),
                ));
            }
            if interest.wants(EventKind::WordBoundary) {
                for (offset, len) in word_spans(&segment.text) {
                    events.push(state.event(
                        EventKind::WordBoundary,
                        len as i64,
                        EventPayload::Position(segment.source_offset.saturating_add(offset)),
                    ));
                }
            }
            state.emit(&events);

            let config = self.store.config();
            let params = params::map_segment(state.host_rate, state.host_volume, segment, &config);
            log::debug!(
                "Segment {index}: {} chars, rate={}, pitch={}, volume={}",
                segment.source_len(),
                params.rate,
                params.pitch,
                params.volume
            );

            let result = self
                .engine
                .synthesize(&segment.text, &params, &mut |chunk| state.relay(chunk));

            if let Some(e) = state.write_error.take() {
                log::warn!("Host rejected audio after {} bytes: {e}", state.bytes_written);
                return Err(SpeakError::Write(e));
            }
            match result {
                Ok(()) => {}
                Err(EngineError::Aborted) => {
                    state.aborted = true;
                }
                Err(_) if state.aborted => {}
                Err(e) => {
                    log::warn!("Synthesis failed on segment {index}: {e}");
                    return Err(SpeakError::Synthesis(e));
                }
            }
            if state.aborted {
                break;
            }
        }

        let outcome = state.outcome();
        log::debug!("Speak finished: {outcome:?}");
        Ok(outcome)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::engine_voices;
    use crate::config::{Configuration, LocalNotifier};
    use crate::engines::scripted::ScriptedEngine;
    use crate::stream::{EventInterest, SegmentBuilder, WavSite};
    use crate::EngineParams;
    use std::collections::VecDeque;
    use std::io::Cursor;

    type TestSite = WavSite<Cursor<Vec<u8>>>;

    fn setup(engine: ScriptedEngine) -> (StreamAdapter<ScriptedEngine>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::open(dir.path().join("config.json"), Arc::new(LocalNotifier::new()));
        (StreamAdapter::new(Arc::new(engine), Arc::new(store)), dir)
    }

    fn site() -> TestSite {
        WavSite::new(Cursor::new(Vec::new())).unwrap()
    }

    fn speak(text: &str) -> Segment {
        SegmentBuilder::default().text(text).build().unwrap()
    }

    fn bookmark(text: &str) -> Segment {
        SegmentBuilder::default()
            .text(text)
            .action(ActionKind::Bookmark)
            .build()
            .unwrap()
    }

    #[test]
    fn completes_and_counts_bytes() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(3, 100));
        let mut site = site();

        let outcome = adapter
            .speak(0, &[speak("one"), speak("two")], &mut site)
            .unwrap();
        assert_eq!(outcome, SpeakOutcome::Completed { bytes_written: 1200 });
        assert_eq!(site.bytes_accepted(), 1200);
        assert_eq!(adapter.engine().calls().len(), 2);
    }

    #[test]
    fn abort_before_first_segment_never_synthesizes() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()));
        let mut site = site();
        site.set_actions(ActionFlags::ABORT);

        let outcome = adapter.speak(0, &[speak("hello")], &mut site).unwrap();
        assert_eq!(outcome, SpeakOutcome::Cancelled { bytes_written: 0 });
        assert!(adapter.engine().calls().is_empty());
        assert_eq!(site.bytes_accepted(), 0);
    }

    #[test]
    fn skip_is_acknowledged_and_stops() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(1, 10));
        let mut site = site();
        site.queue_actions([ActionFlags::NONE, ActionFlags::NONE, ActionFlags::SKIP]);

        let outcome = adapter
            .speak(0, &[speak("one"), speak("two"), speak("three")], &mut site)
            .unwrap();
        assert_eq!(outcome, SpeakOutcome::Cancelled { bytes_written: 20 });
        assert_eq!(site.skips_acknowledged(), 1);
        assert_eq!(adapter.engine().calls().len(), 1);
    }

    #[test]
    fn cancellation_interrupts_mid_segment() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(3, 256));
        let mut site = site();
        // Segment poll, first chunk, then abort before the second chunk.
        site.queue_actions([ActionFlags::NONE, ActionFlags::NONE]);
        site.set_actions(ActionFlags::ABORT);

        let outcome = adapter
            .speak(0, &[speak("first"), speak("second")], &mut site)
            .unwrap();
        assert_eq!(outcome, SpeakOutcome::Cancelled { bytes_written: 512 });
        assert_eq!(adapter.engine().calls().len(), 1);
    }

    #[test]
    fn word_and_sentence_events_precede_audio() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(1, 50));
        let mut site = site();
        site.set_interest(
            EventInterest::none()
                .with(EventKind::WordBoundary)
                .with(EventKind::SentenceBoundary),
        );
        let first = SegmentBuilder::default()
            .text("Hi")
            .source_offset(3u32)
            .build()
            .unwrap();
        let second = SegmentBuilder::default()
            .text("It's a test-case")
            .source_offset(6u32)
            .build()
            .unwrap();

        adapter.speak(0, &[first, second], &mut site).unwrap();

        let events = site.events();
        assert_eq!(events.len(), 6);
        assert_eq!(events[0].kind, EventKind::SentenceBoundary);
        assert_eq!(events[0].payload, EventPayload::Position(3));
        assert_eq!(events[0].value, 2);
        assert_eq!(events[0].audio_offset, 0);

        assert_eq!(events[2].kind, EventKind::SentenceBoundary);
        assert_eq!(events[2].value, 16);
        let words: Vec<(EventPayload, i64, u64)> = events[3..]
            .iter()
            .map(|e| (e.payload.clone(), e.value, e.audio_offset))
            .collect();
        assert_eq!(
            words,
            vec![
                (EventPayload::Position(6), 4, 100),
                (EventPayload::Position(11), 1, 100),
                (EventPayload::Position(13), 9, 100),
            ]
        );
    }

    #[test]
    fn no_events_without_interest() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()));
        let mut site = site();
        adapter.speak(0, &[speak("quiet words")], &mut site).unwrap();
        assert!(site.events().is_empty());
    }

    #[test]
    fn bookmarks_are_always_emitted() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(1, 10));
        let mut site = site();

        adapter
            .speak(0, &[bookmark("42"), speak("a"), bookmark("intro"), bookmark("")], &mut site)
            .unwrap();

        let events = site.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].value, 42);
        assert_eq!(events[0].payload, EventPayload::Text("42".into()));
        assert_eq!(events[0].audio_offset, 0);
        assert_eq!(events[1].value, 0);
        assert_eq!(events[1].audio_offset, 20);
        assert_eq!(events[2].payload, EventPayload::Undefined);
        assert_eq!(adapter.engine().calls().len(), 1);
    }

    #[test]
    fn skips_silence_and_empty_text() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()));
        let mut site = site();
        let silence = SegmentBuilder::default()
            .text("ignored")
            .action(ActionKind::Silence)
            .build()
            .unwrap();
        let spell = SegmentBuilder::default()
            .text("abc")
            .action(ActionKind::SpellOut)
            .build()
            .unwrap();

        adapter
            .speak(0, &[silence, speak(""), spell], &mut site)
            .unwrap();
        let calls = adapter.engine().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, "abc");
    }

    #[test]
    fn write_failure_fails_utterance() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(3, 100));
        let mut site = site();
        site.limit_bytes(300);

        let err = adapter
            .speak(0, &[speak("one"), speak("two")], &mut site)
            .unwrap_err();
        assert!(matches!(err, SpeakError::Write(_)));
        assert_eq!(adapter.engine().calls().len(), 1);
    }

    #[test]
    fn partial_writes_are_completed() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(2, 100));
        let mut site = site();
        site.max_write(7);

        let outcome = adapter.speak(0, &[speak("one")], &mut site).unwrap();
        assert_eq!(outcome.bytes_written(), 400);
        assert_eq!(site.bytes_accepted(), 400);
    }

    #[test]
    fn synthesis_failure_is_an_error() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).failing_synthesis());
        let mut site = site();

        let err = adapter.speak(0, &[speak("one")], &mut site).unwrap_err();
        assert!(matches!(err, SpeakError::Synthesis(EngineError::Synthesis(_))));
    }

    #[test]
    fn parameters_follow_host_and_config() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()));
        adapter
            .store
            .save(&Configuration {
                intonation: 30,
                word_gap: 5,
                rate_boost: true,
                ..Default::default()
            })
            .unwrap();
        let mut site = site();
        site.set_rate(-10);
        site.set_volume(80);

        adapter.speak(0, &[speak("one")], &mut site).unwrap();
        assert_eq!(
            adapter.engine().calls()[0].params,
            EngineParams {
                rate: 240,
                pitch: 50,
                volume: 120,
                intonation: 30,
                word_gap: 5,
            }
        );
    }

    /// Reports queued rates and volumes, one per query.
    struct DriftingSite {
        inner: TestSite,
        rates: VecDeque<i32>,
        volumes: VecDeque<u32>,
    }

    impl DriftingSite {
        fn rates(rates: impl IntoIterator<Item = i32>) -> Self {
            Self {
                inner: site(),
                rates: rates.into_iter().collect(),
                volumes: VecDeque::new(),
            }
        }

        fn volumes(volumes: impl IntoIterator<Item = u32>) -> Self {
            Self {
                inner: site(),
                rates: VecDeque::new(),
                volumes: volumes.into_iter().collect(),
            }
        }
    }

    impl OutputSite for DriftingSite {
        fn actions(&mut self) -> ActionFlags {
            self.inner.actions()
        }
        fn complete_skip(&mut self, skipped: u32) {
            self.inner.complete_skip(skipped)
        }
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.inner.write(bytes)
        }
        fn rate(&mut self) -> i32 {
            self.rates.pop_front().unwrap_or(0)
        }
        fn volume(&mut self) -> u32 {
            self.volumes
                .pop_front()
                .unwrap_or_else(|| self.inner.volume())
        }
        fn event_interest(&mut self) -> EventInterest {
            self.inner.event_interest()
        }
        fn add_events(&mut self, events: &[SpeechEvent]) -> io::Result<()> {
            self.inner.add_events(events)
        }
    }

    #[test]
    fn current_rate_wins_over_cached() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()));
        // Cached at start, then checked once per segment.
        let mut site = DriftingSite::rates([0, 0, 10]);

        adapter
            .speak(0, &[speak("one"), speak("two")], &mut site)
            .unwrap();
        let calls = adapter.engine().calls();
        assert_eq!(calls[0].params.rate, 175);
        assert_eq!(calls[1].params.rate, 450);
    }

    #[test]
    fn rate_changed_flag_rereads_rate() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()));
        // Start, segment check, flag re-read, segment check.
        let mut site = DriftingSite::rates([0, 0, -10, -10]);
        site.inner
            .queue_actions([ActionFlags::NONE, ActionFlags::NONE, ActionFlags::NONE]);
        site.inner.set_actions(ActionFlags::RATE_CHANGED);

        adapter
            .speak(0, &[speak("one"), speak("two")], &mut site)
            .unwrap();
        let calls = adapter.engine().calls();
        assert_eq!(calls[0].params.rate, 175);
        assert_eq!(calls[1].params.rate, 80);
    }

    #[test]
    fn volume_changed_flag_rereads_volume() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(1, 10));
        // Read once at start, then again only when the flag is raised.
        let mut site = DriftingSite::volumes([100, 75]);
        site.inner.queue_actions([ActionFlags::NONE, ActionFlags::NONE]);
        site.inner.set_actions(ActionFlags::VOLUME_CHANGED);

        adapter
            .speak(0, &[speak("one"), speak("two")], &mut site)
            .unwrap();
        let calls = adapter.engine().calls();
        assert_eq!(calls[0].params.volume, 200);
        assert_eq!(calls[1].params.volume, 100);
        assert!(site.volumes.is_empty());
    }

    #[test]
    fn skip_mid_segment_is_acknowledged_once() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(3, 256));
        let mut site = site();
        // Segment poll, first chunk, then skip before the second chunk.
        site.queue_actions([ActionFlags::NONE, ActionFlags::NONE]);
        site.set_actions(ActionFlags::SKIP);

        let outcome = adapter
            .speak(0, &[speak("first"), speak("second")], &mut site)
            .unwrap();
        assert_eq!(outcome, SpeakOutcome::Cancelled { bytes_written: 512 });
        assert_eq!(site.skips_acknowledged(), 1);
        assert_eq!(adapter.engine().calls().len(), 1);
    }

    #[test]
    fn word_positions_saturate_at_end_of_source() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()).with_chunks(1, 10));
        let mut site = site();
        site.set_interest(EventInterest::none().with(EventKind::WordBoundary));
        let segment = SegmentBuilder::default()
            .text("ab cd")
            .source_offset(u32::MAX - 2)
            .build()
            .unwrap();

        let outcome = adapter.speak(0, &[segment], &mut site).unwrap();
        assert!(!outcome.is_cancelled());
        let positions: Vec<EventPayload> = site.events().iter().map(|e| e.payload.clone()).collect();
        assert_eq!(
            positions,
            vec![
                EventPayload::Position(u32::MAX - 2),
                EventPayload::Position(u32::MAX),
            ]
        );
    }

    #[test]
    fn select_voice_passes_variant_and_tolerates_failure() {
        let (adapter, _dir) =
            setup(ScriptedEngine::new(engine_voices()).with_variants(&["klatt"]));

        adapter.select_voice("en-us+klatt").unwrap();
        assert_eq!(adapter.engine().selected_voice(), "en-us+klatt");
        assert_eq!(adapter.current_voice().as_deref(), Some("en-us+klatt"));

        assert!(matches!(
            adapter.select_voice("xx"),
            Err(SpeakError::Voice(EngineError::VoiceNotFound(_)))
        ));
        assert_eq!(adapter.current_voice().as_deref(), Some("en-us+klatt"));

        let mut site = site();
        adapter.speak(0, &[speak("still works")], &mut site).unwrap();
        assert_eq!(adapter.engine().calls()[0].voice, "en-us+klatt");
    }

    #[test]
    fn output_format_is_fixed() {
        let (adapter, _dir) = setup(ScriptedEngine::new(engine_voices()));
        assert_eq!(adapter.output_format(), AudioFormat::PCM_22050_MONO_16);
    }
}
