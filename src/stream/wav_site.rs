use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::Path;

use hound::WavWriter;

use super::{ActionFlags, EventInterest, OutputSite, SpeechEvent};
use crate::AudioFormat;

/// An [`OutputSite`] that records the utterance into a WAV stream.
///
/// Events are kept in delivery order. Host state (action flags, rate,
/// volume, interest) is set directly, which makes the site usable as a
/// stand-in host.
pub struct WavSite<W: Write + Seek = BufWriter<File>> {
    writer: WavWriter<W>,
    pending_byte: Option<u8>,
    bytes_accepted: u64,
    events: Vec<SpeechEvent>,
    actions: ActionFlags,
    queued_actions: VecDeque<ActionFlags>,
    skips: u32,
    rate: i32,
    volume: u32,
    interest: EventInterest,
    byte_limit: Option<u64>,
    max_write: Option<usize>,
}

impl WavSite<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self, hound::Error> {
        let writer = WavWriter::create(path, AudioFormat::PCM_22050_MONO_16.wav_spec())?;
        Ok(Self::from_writer(writer))
    }
}

impl<W: Write + Seek> WavSite<W> {
    pub fn new(inner: W) -> Result<Self, hound::Error> {
        let writer = WavWriter::new(inner, AudioFormat::PCM_22050_MONO_16.wav_spec())?;
        Ok(Self::from_writer(writer))
    }

    fn from_writer(writer: WavWriter<W>) -> Self {
        Self {
            writer,
            pending_byte: None,
            bytes_accepted: 0,
            events: Vec::new(),
            actions: ActionFlags::NONE,
            queued_actions: VecDeque::new(),
            skips: 0,
            rate: 0,
            volume: 100,
            interest: EventInterest::none(),
            byte_limit: None,
            max_write: None,
        }
    }

    /// Flags reported once the queued flags are used up.
    pub fn set_actions(&mut self, actions: ActionFlags) {
        self.actions = actions;
    }

    /// Flags reported by the next polls, one per poll.
    pub fn queue_actions(&mut self, actions: impl IntoIterator<Item = ActionFlags>) {
        self.queued_actions.extend(actions);
    }

    pub fn set_rate(&mut self, rate: i32) {
        self.rate = rate;
    }

    pub fn set_volume(&mut self, volume: u32) {
        self.volume = volume;
    }

    pub fn set_interest(&mut self, interest: EventInterest) {
        self.interest = interest;
    }

    /// Fail writes once `limit` bytes have been accepted.
    pub fn limit_bytes(&mut self, limit: u64) {
        self.byte_limit = Some(limit);
    }

    /// Accept at most `max` bytes per write call.
    pub fn max_write(&mut self, max: usize) {
        self.max_write = Some(max.max(1));
    }

    pub fn bytes_accepted(&self) -> u64 {
        self.bytes_accepted
    }

    pub fn events(&self) -> &[SpeechEvent] {
        &self.events
    }

    pub fn skips_acknowledged(&self) -> u32 {
        self.skips
    }

    /// Write the WAV header lengths and flush.
    pub fn finalize(self) -> Result<(), hound::Error> {
        if self.pending_byte.is_some() {
            log::warn!("Dropping trailing odd byte of audio");
        }
        self.writer.finalize()
    }
}

impl<W: Write + Seek> OutputSite for WavSite<W> {
    fn actions(&mut self) -> ActionFlags {
        self.queued_actions.pop_front().unwrap_or(self.actions)
    }

    fn complete_skip(&mut self, skipped: u32) {
        log::debug!("Skip acknowledged ({skipped} items)");
        self.skips += 1;
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let mut accept = bytes.len();
        if let Some(max) = self.max_write {
            accept = accept.min(max);
        }
        if let Some(limit) = self.byte_limit {
            let room = limit.saturating_sub(self.bytes_accepted);
            if room == 0 {
                return Err(io::Error::other("byte limit reached"));
            }
            accept = accept.min(room as usize);
        }

        let mut data = &bytes[..accept];
        if let Some(low) = self.pending_byte.take() {
            if let Some((&high, rest)) = data.split_first() {
                self.write_sample(i16::from_le_bytes([low, high]))?;
                data = rest;
            } else {
                self.pending_byte = Some(low);
            }
        }
        let mut pairs = data.chunks_exact(2);
        for pair in &mut pairs {
            self.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        if let [odd] = pairs.remainder() {
            self.pending_byte = Some(*odd);
        }

        self.bytes_accepted += accept as u64;
        Ok(accept)
    }

    fn rate(&mut self) -> i32 {
        self.rate
    }

    fn volume(&mut self) -> u32 {
        self.volume
    }

    fn event_interest(&mut self) -> EventInterest {
        self.interest
    }

    fn add_events(&mut self, events: &[SpeechEvent]) -> io::Result<()> {
        self.events.extend_from_slice(events);
        Ok(())
    }
}

impl<W: Write + Seek> WavSite<W> {
    fn write_sample(&mut self, sample: i16) -> io::Result<()> {
        self.writer.write_sample(sample).map_err(|e| match e {
            hound::Error::IoError(e) => e,
            other => io::Error::other(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn records_samples_split_across_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut site = WavSite::create(&path).unwrap();

        let samples: [i16; 3] = [1, -2, 300];
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        assert_eq!(site.write(&bytes[..3]).unwrap(), 3);
        assert_eq!(site.write(&bytes[3..]).unwrap(), 3);
        assert_eq!(site.bytes_accepted(), 6);
        site.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec(), AudioFormat::PCM_22050_MONO_16.wav_spec());
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn queued_actions_come_first() {
        let mut site = WavSite::new(Cursor::new(Vec::new())).unwrap();
        site.set_actions(ActionFlags::ABORT);
        site.queue_actions([ActionFlags::NONE, ActionFlags::SKIP]);

        assert_eq!(site.actions(), ActionFlags::NONE);
        assert_eq!(site.actions(), ActionFlags::SKIP);
        assert_eq!(site.actions(), ActionFlags::ABORT);
        assert_eq!(site.actions(), ActionFlags::ABORT);
    }

    #[test]
    fn write_limits() {
        let mut site = WavSite::new(Cursor::new(Vec::new())).unwrap();
        site.max_write(3);
        site.limit_bytes(5);

        assert_eq!(site.write(&[0; 8]).unwrap(), 3);
        assert_eq!(site.write(&[0; 8]).unwrap(), 2);
        assert!(site.write(&[0; 8]).is_err());
        assert_eq!(site.bytes_accepted(), 5);
    }
}
