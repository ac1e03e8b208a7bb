use std::borrow::Cow;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use parking_lot::Mutex;

use super::voices::{parse_variant_table, parse_voice_table};
use crate::{AudioFormat, EngineError, EngineFacade, EngineParams, EngineVoice};

/// Location of the espeak-ng program and its data.
#[derive(Debug, Clone)]
pub struct EspeakConfig {
    /// Path to the `espeak-ng` binary. `None` uses `espeak-ng` from PATH.
    pub bin_path: Option<PathBuf>,
    /// Directory containing `espeak-ng-data`. `None` uses the compiled-in
    /// location.
    pub data_path: Option<PathBuf>,
    /// Samples handed to the audio callback per chunk.
    pub chunk_samples: usize,
}

impl Default for EspeakConfig {
    fn default() -> Self {
        Self {
            bin_path: None,
            data_path: None,
            // 50 ms at 22050 Hz.
            chunk_samples: 1102,
        }
    }
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let program = self
            .bin_path
            .as_deref()
            .map(|p| p.as_os_str())
            .unwrap_or_else(|| "espeak-ng".as_ref());
        let mut cmd = Command::new(program);
        if let Some(data) = &self.data_path {
            cmd.env("ESPEAK_DATA_PATH", data);
        }
        cmd
    }
}

#[derive(Debug, Default)]
struct State {
    initialized: bool,
    voice: String,
    voices: Option<Vec<EngineVoice>>,
}

/// espeak-ng engine.
///
/// # Quick Start
///
/// ```rust,no_run
/// use espeak_bridge::EngineFacade;
/// use espeak_bridge::engines::espeak::EspeakEngine;
///
/// let engine = EspeakEngine::new();
/// engine.initialize()?;
/// engine.select_voice("en-us")?;
///
/// let mut samples = Vec::new();
/// engine.synthesize("Hello, world!", &Default::default(), &mut |chunk| {
///     samples.extend_from_slice(chunk);
///     true
/// })?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct EspeakEngine {
    config: EspeakConfig,
    state: Mutex<State>,
    stop_requested: AtomicBool,
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EspeakEngine {
    /// Create a new engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self::with_config(EspeakConfig::default())
    }

    /// Create a new engine with explicit espeak-ng binary and data paths.
    ///
    /// Use this when bundling espeak-ng with your application. Either path
    /// can be `None` to fall back to the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self::with_config(EspeakConfig {
            bin_path,
            data_path,
            ..Default::default()
        })
    }

    pub fn with_config(config: EspeakConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
            stop_requested: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EspeakConfig {
        &self.config
    }

    fn run(&self, args: &[&str]) -> Result<String, EngineError> {
        let output = self
            .config
            .command()
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Synthesis(format!(
                "espeak-ng exited with code {:?}: {stderr}",
                output.status.code()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Read WAV from `reader` and hand it to `on_chunk` in chunks.
    ///
    /// The data chunk is read as raw little-endian samples up to its declared
    /// length or the end of the stream, whichever comes first. espeak-ng
    /// writing to a pipe declares a placeholder length of `0x7ffff000`.
    fn stream_samples<R: Read>(
        &self,
        reader: R,
        on_chunk: &mut dyn FnMut(&[i16]) -> bool,
    ) -> Result<u64, EngineError> {
        let mut reader = BufReader::new(reader);
        if reader.fill_buf()?.is_empty() {
            log::debug!("espeak-ng produced no audio");
            return Ok(0);
        }

        let (spec, data_len) = {
            let wav = hound::WavReader::new(&mut reader)
                .map_err(|e| EngineError::Format(e.to_string()))?;
            (wav.spec(), u64::from(wav.len()) * 2)
        };
        if spec != AudioFormat::PCM_22050_MONO_16.wav_spec() {
            return Err(EngineError::Format(format!(
                "{} Hz, {} channels, {} bits",
                spec.sample_rate, spec.channels, spec.bits_per_sample
            )));
        }

        let chunk_samples = self.config.chunk_samples.max(1);
        let mut data = reader.take(data_len);
        let mut bytes = vec![0u8; chunk_samples * 2];
        let mut chunk = Vec::with_capacity(chunk_samples);
        let mut total = 0u64;
        loop {
            let filled = read_full(&mut data, &mut bytes)?;
            if filled % 2 == 1 {
                log::debug!("Dropping trailing odd byte of audio");
            }
            chunk.clear();
            chunk.extend(
                bytes[..filled]
                    .chunks_exact(2)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
            );
            if !chunk.is_empty() {
                self.deliver(&chunk, on_chunk)?;
                total += chunk.len() as u64;
            }
            if filled < bytes.len() {
                return Ok(total);
            }
        }
    }

    fn deliver(
        &self,
        chunk: &[i16],
        on_chunk: &mut dyn FnMut(&[i16]) -> bool,
    ) -> Result<(), EngineError> {
        if self.stop_requested.swap(false, Ordering::AcqRel) {
            log::debug!("Synthesis stopped on request");
            return Err(EngineError::Aborted);
        }
        if !on_chunk(chunk) {
            return Err(EngineError::Aborted);
        }
        Ok(())
    }

    fn spawn_synthesis(&self, voice: &str, params: &EngineParams) -> Result<Child, EngineError> {
        self.config
            .command()
            .args(["--stdout", "--stdin", "-v", voice])
            .arg("-s")
            .arg(params.rate.to_string())
            .arg("-p")
            .arg(params.pitch.to_string())
            .arg("-a")
            .arg(params.volume.to_string())
            .arg("-P")
            .arg(params.intonation.to_string())
            .arg("-g")
            .arg(params.word_gap.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)
    }
}

impl EngineFacade for EspeakEngine {
    fn initialize(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if state.initialized {
            return Ok(());
        }

        let version = self.run(&["--version"])?;
        log::info!("Using {}", version.trim());
        state.initialized = true;
        state.voice = "en".to_string();
        Ok(())
    }

    fn list_voices(&self) -> Vec<EngineVoice> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Vec::new();
        }
        if let Some(voices) = &state.voices {
            return voices.clone();
        }

        match self.run(&["--voices"]) {
            Ok(table) => {
                let voices = parse_voice_table(&table);
                log::debug!("espeak-ng reports {} voices", voices.len());
                state.voices = Some(voices.clone());
                voices
            }
            Err(e) => {
                log::warn!("Failed to list espeak-ng voices: {e}");
                Vec::new()
            }
        }
    }

    fn list_variants(&self) -> Vec<String> {
        if !self.state.lock().initialized {
            return Vec::new();
        }
        match self.run(&["--voices=variant"]) {
            Ok(table) => parse_variant_table(&table),
            Err(e) => {
                log::warn!("Failed to list espeak-ng variants: {e}");
                Vec::new()
            }
        }
    }

    fn select_voice(&self, name: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(EngineError::NotInitialized);
        }

        // espeak-ng exits non-zero when the voice cannot be loaded.
        self.run(&["-q", "-v", name])
            .map_err(|_| EngineError::VoiceNotFound(name.to_string()))?;
        log::debug!("Selected espeak-ng voice '{name}'");
        state.voice = name.to_string();
        Ok(())
    }

    fn synthesize(
        &self,
        text: &str,
        params: &EngineParams,
        on_chunk: &mut dyn FnMut(&[i16]) -> bool,
    ) -> Result<(), EngineError> {
        let voice = {
            let state = self.state.lock();
            if !state.initialized {
                return Err(EngineError::NotInitialized);
            }
            state.voice.clone()
        };
        self.stop_requested.store(false, Ordering::Release);

        let mut child = self.spawn_synthesis(&voice, params)?;

        // Fed from another thread so a long text cannot deadlock against a
        // full stdout pipe.
        let payload = canonicalize_stdin_payload(text).into_owned();
        let feeder = child
            .stdin
            .take()
            .map(|mut stdin| thread::spawn(move || stdin.write_all(payload.as_bytes())));

        let streamed = match child.stdout.take() {
            Some(stdout) => self.stream_samples(stdout, on_chunk),
            None => Err(EngineError::Synthesis("espeak-ng stdout not captured".into())),
        };
        if streamed.is_err() {
            if let Err(e) = child.kill() {
                log::debug!("Failed to kill espeak-ng: {e}");
            }
        }
        let output = child.wait_with_output()?;

        if let Some(feeder) = feeder {
            if let Ok(Err(e)) = feeder.join() {
                if streamed.is_ok() {
                    log::warn!("Failed to send text to espeak-ng: {e}");
                }
            }
        }

        let samples = streamed?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Synthesis(format!(
                "espeak-ng exited with code {:?}: {stderr}",
                output.status.code()
            )));
        }
        log::debug!("Synthesized {samples} samples with voice '{voice}'");
        Ok(())
    }

    fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }
}

fn spawn_error(e: io::Error) -> EngineError {
    if e.kind() == io::ErrorKind::NotFound {
        EngineError::EspeakNotFound
    } else {
        EngineError::Io(e)
    }
}

/// Fill `buf`, stopping early only at end of stream.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// espeak-ng reads stdin line by line; the last line needs its terminator.
fn canonicalize_stdin_payload(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}
