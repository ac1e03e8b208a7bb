//! User settings shared by every host process on the machine.
//!
//! [`Configuration`] is the in-memory shape; [`ConfigStore`] owns the
//! persisted JSON document, the process-local snapshot and the cross-process
//! change notification.
//!
//! # Document Layout
//!
//! ```text
//! {
//!   "version": "1.0",
//!   "voices": { "default_only": true, "enabled": ["en", "de"] },
//!   "global_settings": { "variant": "", "intonation": 50, "wordgap": 0, "rateboost": false },
//!   "voice_profiles": [
//!     { "id": "profile-1718000000000", "name": "Robot", "base_voice": "en",
//!       "variant": "klatt", "enabled": true }
//!   ]
//! }
//! ```
//!
//! Any missing field takes its default. A document that does not parse is
//! replaced by the full default configuration; a bad file never prevents
//! the bridge from starting.

mod document;
pub mod notify;
pub mod store;

pub use notify::{ChangeNotifier, FileNotifier, LocalNotifier};
pub use store::{ConfigError, ConfigStore};

use std::time::{SystemTime, UNIX_EPOCH};

use derive_builder::Builder;

pub const DEFAULT_VERSION: &str = "1.0";

pub const INTONATION_MIN: i32 = 0;
pub const INTONATION_MAX: i32 = 100;
pub const INTONATION_DEFAULT: i32 = 50;
pub const WORDGAP_MIN: i32 = 0;
pub const WORDGAP_MAX: i32 = 100;

/// A user-defined pairing of a base voice and a variant, exposed as its own
/// catalog entry.
///
/// New profiles go through [`VoiceProfileBuilder`], which rejects
/// definitions without a name or base voice and stamps a time-derived id.
///
/// ```
/// use espeak_bridge::config::VoiceProfileBuilder;
///
/// let profile = VoiceProfileBuilder::default()
///     .name("Robot")
///     .base_voice("en")
///     .variant("klatt")
///     .build()?;
/// assert!(profile.id.starts_with("profile-"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct VoiceProfile {
    #[builder(default = "generate_profile_id()")]
    pub id: String,
    pub name: String,
    pub base_voice: String,
    #[builder(default)]
    pub variant: String,
    #[builder(default = "true")]
    pub enabled: bool,
}

impl VoiceProfileBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.name {
            Some(name) if name.trim().is_empty() => {
                return Err("Please enter a profile name".to_string())
            }
            _ => {}
        }
        match &self.base_voice {
            Some(base) if base.trim().is_empty() => {
                return Err("Please select a base voice".to_string())
            }
            _ => {}
        }
        Ok(())
    }
}

/// `profile-<unix millis>`.
pub fn generate_profile_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("profile-{millis}")
}

/// The complete user settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub version: String,
    /// Expose only the default English voice instead of `enabled_voices`.
    pub default_only: bool,
    /// Enabled base voice identifiers. Order is kept as written.
    pub enabled_voices: Vec<String>,
    /// Variant applied to every enabled voice, empty for none.
    pub global_variant: String,
    /// Pitch range, 0..=100.
    pub intonation: i32,
    /// Pause between words, 0..=100.
    pub word_gap: i32,
    /// Triple the speaking rate (capped by the engine maximum).
    pub rate_boost: bool,
    pub voice_profiles: Vec<VoiceProfile>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            default_only: true,
            enabled_voices: Vec::new(),
            global_variant: String::new(),
            intonation: INTONATION_DEFAULT,
            word_gap: 0,
            rate_boost: false,
            voice_profiles: Vec::new(),
        }
    }
}

impl Configuration {
    /// Force intonation and word gap into their documented ranges.
    pub fn clamp(&mut self) {
        self.intonation = self.intonation.clamp(INTONATION_MIN, INTONATION_MAX);
        self.word_gap = self.word_gap.clamp(WORDGAP_MIN, WORDGAP_MAX);
    }

    pub fn is_voice_enabled(&self, base_voice: &str) -> bool {
        self.enabled_voices.iter().any(|v| v == base_voice)
    }

    /// Enable or disable a base voice. Enabling appends it once.
    pub fn set_voice_enabled(&mut self, base_voice: &str, enabled: bool) {
        if enabled {
            if !self.is_voice_enabled(base_voice) {
                self.enabled_voices.push(base_voice.to_string());
            }
        } else {
            self.enabled_voices.retain(|v| v != base_voice);
        }
    }

    pub fn add_profile(&mut self, profile: VoiceProfile) {
        self.voice_profiles.push(profile);
    }

    /// Remove the profile with `id`, returning it.
    pub fn remove_profile(&mut self, id: &str) -> Option<VoiceProfile> {
        let idx = self.voice_profiles.iter().position(|p| p.id == id)?;
        Some(self.voice_profiles.remove(idx))
    }
}
