//! # espeak-bridge
//!
//! A Rust library that exposes a configurable catalog of espeak-ng voices to a
//! speech host and streams synthesized audio back to it.
//!
//! ## Features
//!
//! - **Voice catalog**: merges engine voices, enabled-voice settings and named
//!   voice profiles into one deterministic, never-empty list
//! - **Shared settings**: a JSON settings document that several host processes
//!   read and write, with change notification instead of restarts
//! - **Streaming bridge**: drives a synchronous push-callback engine for each
//!   utterance, relaying PCM and timing events while honoring cancellation
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! espeak-bridge = { version = "0.1", features = ["espeak"] }
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use espeak_bridge::catalog::VoiceEnumerator;
//! use espeak_bridge::config::ConfigStore;
//! use espeak_bridge::engines::espeak::EspeakEngine;
//! use espeak_bridge::stream::{SegmentBuilder, StreamAdapter, WavSite};
//!
//! let engine = Arc::new(EspeakEngine::new());
//! let store = Arc::new(ConfigStore::open_default()?);
//!
//! let voices = VoiceEnumerator::from_services(engine.as_ref(), &store);
//! let adapter = StreamAdapter::new(engine, store);
//! adapter.select_voice(&voices.item(0)?.id)?;
//!
//! let segment = SegmentBuilder::default().text("Hello, world!").build()?;
//! let mut site = WavSite::create("output.wav".as_ref())?;
//! adapter.speak(0, &[segment], &mut site)?;
//! site.finalize()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod config;
pub mod engines;
pub mod logging;
pub mod params;
pub mod stream;

/// Output sample rate of the engine, in Hz.
pub const SAMPLE_RATE: u32 = 22050;

/// The one PCM layout the bridge produces.
///
/// The format is fixed: the host is told about it, never asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Raw 16-bit signed little-endian mono samples at 22050 Hz, no header.
    pub const PCM_22050_MONO_16: AudioFormat = AudioFormat {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
    };

    /// Bytes per sample frame.
    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// Bytes of audio per second of speech.
    pub fn avg_bytes_per_sec(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    /// The equivalent WAV description, for hosts that record to a file.
    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

/// A voice as reported by the engine, before any catalog policy is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineVoice {
    /// Human-readable voice name (e.g. `"English (America)"`).
    pub name: String,
    /// Raw engine identifier, usually a data-file path such as `"gmw/en-US"`.
    pub identifier: String,
    /// Raw language field. May carry a leading priority byte.
    pub languages: String,
    /// 0 = unspecified, 1 = male, 2 = female.
    pub gender: u8,
    /// Age in years, 0 when unknown.
    pub age: u8,
}

/// Engine-native synthesis parameters for one call.
///
/// Produced by [`params::map_segment`]; engines take the values as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    /// Words per minute, 80..=1350.
    pub rate: i32,
    /// Base pitch, 0..=99.
    pub pitch: i32,
    /// Amplitude, 0..=200.
    pub volume: i32,
    /// Pitch range, 0..=100.
    pub intonation: i32,
    /// Pause between words in units of 10 ms, 0..=100.
    pub word_gap: i32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            rate: 175,
            pitch: 50,
            volume: 200,
            intonation: 50,
            word_gap: 0,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Engine not initialized. Call initialize() first.")]
    NotInitialized,
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Voice '{0}' could not be selected")]
    VoiceNotFound(String),
    #[error("Synthesis aborted by the audio callback")]
    Aborted,
    #[error("Synthesis failed: {0}")]
    Synthesis(String),
    #[error("Unsupported engine audio format: {0}")]
    Format(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Boundary to a synchronous speech-synthesis engine.
///
/// Engines are process-wide services: construct one, share it behind an
/// `Arc`, and call [`initialize`](EngineFacade::initialize) before use.
/// Only one synthesis may be in flight at a time; callers serialize.
pub trait EngineFacade: Send + Sync {
    /// Prepare the engine. Calling it again after success is a no-op.
    fn initialize(&self) -> Result<(), EngineError>;

    /// Installed voices in engine order. Empty when not initialized.
    fn list_voices(&self) -> Vec<EngineVoice>;

    /// Installed variant names, sorted. Empty when the engine has none.
    fn list_variants(&self) -> Vec<String> {
        Vec::new()
    }

    /// Select the voice used by subsequent synthesis calls.
    ///
    /// `name` is a base voice optionally followed by `+variant`.
    fn select_voice(&self, name: &str) -> Result<(), EngineError>;

    /// Synthesize `text`, pushing each generated chunk of 16-bit mono samples
    /// to `on_chunk` on the calling thread.
    ///
    /// Returning `false` from `on_chunk` stops synthesis and makes this call
    /// return [`EngineError::Aborted`].
    fn synthesize(
        &self,
        text: &str,
        params: &EngineParams,
        on_chunk: &mut dyn FnMut(&[i16]) -> bool,
    ) -> Result<(), EngineError>;

    /// Request best-effort cancellation of an in-flight synthesis.
    fn stop(&self);
}
