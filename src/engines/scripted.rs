//! Deterministic in-memory engine.
//!
//! Produces a fixed number of constant-valued chunks per call and records
//! every request, so callers can test catalog and streaming behavior without
//! espeak-ng installed.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::catalog::base_voice_name;
use crate::{EngineError, EngineFacade, EngineParams, EngineVoice};

/// One recorded `synthesize` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisCall {
    pub text: String,
    pub voice: String,
    pub params: EngineParams,
}

#[derive(Debug, Default)]
struct State {
    initialized: bool,
    voice: String,
    calls: Vec<SynthesisCall>,
}

#[derive(Debug)]
pub struct ScriptedEngine {
    voices: Vec<EngineVoice>,
    variants: Vec<String>,
    chunks_per_call: usize,
    chunk_samples: usize,
    fail_initialize: bool,
    fail_synthesis: bool,
    stop_requested: AtomicBool,
    state: Mutex<State>,
}

impl ScriptedEngine {
    /// An engine reporting `voices` that emits 3 chunks of 256 samples per
    /// call.
    pub fn new(voices: Vec<EngineVoice>) -> Self {
        Self {
            voices,
            variants: Vec::new(),
            chunks_per_call: 3,
            chunk_samples: 256,
            fail_initialize: false,
            fail_synthesis: false,
            stop_requested: AtomicBool::new(false),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_chunks(mut self, chunks_per_call: usize, chunk_samples: usize) -> Self {
        self.chunks_per_call = chunks_per_call;
        self.chunk_samples = chunk_samples;
        self
    }

    pub fn with_variants(mut self, variants: &[&str]) -> Self {
        self.variants = variants.iter().map(|v| v.to_string()).collect();
        self.variants.sort();
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    pub fn failing_synthesis(mut self) -> Self {
        self.fail_synthesis = true;
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<SynthesisCall> {
        self.state.lock().calls.clone()
    }

    pub fn selected_voice(&self) -> String {
        self.state.lock().voice.clone()
    }
}

impl EngineFacade for ScriptedEngine {
    fn initialize(&self) -> Result<(), EngineError> {
        if self.fail_initialize {
            return Err(EngineError::EspeakNotFound);
        }
        let mut state = self.state.lock();
        if !state.initialized {
            state.initialized = true;
            state.voice = "en".to_string();
        }
        Ok(())
    }

    fn list_voices(&self) -> Vec<EngineVoice> {
        if !self.state.lock().initialized {
            return Vec::new();
        }
        self.voices.clone()
    }

    fn list_variants(&self) -> Vec<String> {
        self.variants.clone()
    }

    fn select_voice(&self, name: &str) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(EngineError::NotInitialized);
        }

        let (base, variant) = name.split_once('+').unwrap_or((name, ""));
        let known_base = self
            .voices
            .iter()
            .any(|v| base_voice_name(&v.identifier, &v.name) == base);
        let known_variant = variant.is_empty() || self.variants.iter().any(|v| v == variant);
        if !known_base || !known_variant {
            return Err(EngineError::VoiceNotFound(name.to_string()));
        }

        state.voice = name.to_string();
        Ok(())
    }

    fn synthesize(
        &self,
        text: &str,
        params: &EngineParams,
        on_chunk: &mut dyn FnMut(&[i16]) -> bool,
    ) -> Result<(), EngineError> {
        let call_index = {
            let mut state = self.state.lock();
            if !state.initialized {
                return Err(EngineError::NotInitialized);
            }
            let voice = state.voice.clone();
            state.calls.push(SynthesisCall {
                text: text.to_string(),
                voice,
                params: *params,
            });
            state.calls.len()
        };

        if self.fail_synthesis {
            return Err(EngineError::Synthesis("scripted failure".to_string()));
        }

        self.stop_requested.store(false, Ordering::Release);
        let chunk = vec![call_index as i16; self.chunk_samples];
        for _ in 0..self.chunks_per_call {
            if self.stop_requested.swap(false, Ordering::AcqRel) || !on_chunk(&chunk) {
                return Err(EngineError::Aborted);
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<EngineVoice> {
        vec![EngineVoice {
            name: "English".into(),
            identifier: "gmw/en".into(),
            ..Default::default()
        }]
    }

    #[test]
    fn reports_nothing_until_initialized() {
        let engine = ScriptedEngine::new(voices());
        assert!(engine.list_voices().is_empty());
        assert!(matches!(
            engine.select_voice("en"),
            Err(EngineError::NotInitialized)
        ));

        engine.initialize().unwrap();
        engine.initialize().unwrap();
        assert_eq!(engine.list_voices().len(), 1);
        assert_eq!(engine.selected_voice(), "en");
    }

    #[test]
    fn select_voice_checks_base_and_variant() {
        let engine = ScriptedEngine::new(voices()).with_variants(&["klatt"]);
        engine.initialize().unwrap();

        engine.select_voice("en+klatt").unwrap();
        assert_eq!(engine.selected_voice(), "en+klatt");
        assert!(engine.select_voice("en+nope").is_err());
        assert!(engine.select_voice("xx").is_err());
        assert_eq!(engine.selected_voice(), "en+klatt");
    }

    #[test]
    fn callback_refusal_aborts() {
        let engine = ScriptedEngine::new(voices()).with_chunks(4, 8);
        engine.initialize().unwrap();

        let mut seen = 0;
        let result = engine.synthesize("hi", &EngineParams::default(), &mut |chunk| {
            assert_eq!(chunk.len(), 8);
            seen += 1;
            seen < 2
        });
        assert!(matches!(result, Err(EngineError::Aborted)));
        assert_eq!(seen, 2);
        assert_eq!(engine.calls().len(), 1);
    }
}
