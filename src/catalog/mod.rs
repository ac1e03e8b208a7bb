//! The list of voices exposed to the host.
//!
//! [`build_catalog`] merges the engine's installed voices with the user's
//! settings; [`VoiceEnumerator`] walks a fixed snapshot of the result.
//!
//! # Merge Rules
//!
//! 1. With `default_only`, the first engine voice whose base name is `en` or
//!    `en-us` is exposed, and nothing else from the engine list.
//! 2. Otherwise every engine voice whose base name is enabled is exposed, in
//!    engine order.
//! 3. Every enabled profile is exposed under its own name, even when its base
//!    voice already appears from rule 1 or 2.
//! 4. An empty result gets a single built-in `en` entry.
//!
//! The global variant, when set, is appended to voices from rules 1 and 2 as
//! `base+variant` (identifier) and `Name (variant)` (display name).

mod enumerator;

pub use enumerator::{Batch, CatalogError, VoiceEnumerator};

use std::collections::HashSet;

use crate::config::{Configuration, VoiceProfile};
use crate::EngineVoice;

/// Vendor attribute reported for every voice.
pub const VENDOR: &str = "eSpeak-NG";

/// Base names accepted as "the default English voice".
const DEFAULT_VOICE_IDS: &[&str] = &["en", "en-us"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Unspecified,
    Male,
    Female,
}

impl Gender {
    /// Map an espeak-ng gender code.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Gender::Male,
            2 => Gender::Female,
            _ => Gender::Unspecified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Unspecified => "Unspecified",
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    Child,
    Adult,
    Senior,
}

impl AgeBand {
    /// Map an age in years; 0 means unknown and counts as adult.
    pub fn from_age(age: u8) -> Self {
        match age {
            0 => AgeBand::Adult,
            1..=17 => AgeBand::Child,
            18..=59 => AgeBand::Adult,
            _ => AgeBand::Senior,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBand::Child => "Child",
            AgeBand::Adult => "Adult",
            AgeBand::Senior => "Senior",
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDescriptor {
    /// Key of this entry, unique within one catalog.
    pub token: String,
    /// Exposed identifier; hand it back to
    /// [`StreamAdapter::select_voice`](crate::stream::StreamAdapter::select_voice).
    /// An enabled voice and a profile may share it.
    pub id: String,
    pub name: String,
    pub language: String,
    pub gender: Gender,
    pub age: AgeBand,
}

impl VoiceDescriptor {
    /// The built-in entry used when nothing else is exposed.
    pub fn fallback() -> Self {
        Self {
            token: "en".to_string(),
            id: "en".to_string(),
            name: "en".to_string(),
            language: "en".to_string(),
            gender: Gender::Male,
            age: AgeBand::Adult,
        }
    }

    pub fn vendor(&self) -> &'static str {
        VENDOR
    }

    fn from_engine(voice: &EngineVoice, token: String, id: String, name: String) -> Self {
        Self {
            token,
            id,
            name,
            language: clean_languages(&voice.languages),
            gender: Gender::from_code(voice.gender),
            age: AgeBand::from_age(voice.age),
        }
    }
}

/// An exposed identifier split back into base voice and variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    pub base: String,
    pub variant: Option<String>,
}

impl VoiceSelection {
    /// Split `base+variant`. An empty variant part counts as none.
    pub fn parse(exposed_id: &str) -> Self {
        let exposed_id = exposed_id.trim();
        match exposed_id.split_once('+') {
            Some((base, variant)) if !variant.is_empty() => Self {
                base: base.to_string(),
                variant: Some(variant.to_string()),
            },
            Some((base, _)) => Self {
                base: base.to_string(),
                variant: None,
            },
            None => Self {
                base: exposed_id.to_string(),
                variant: None,
            },
        }
    }

    /// The name the engine understands.
    pub fn engine_name(&self) -> String {
        join_variant(&self.base, self.variant.as_deref().unwrap_or_default())
    }
}

/// The trailing path component of an engine identifier.
///
/// espeak-ng identifiers are data-file paths such as `gmw/en-US`; the base
/// name is `en-US`. An empty identifier falls back to the voice name.
pub fn base_voice_name(identifier: &str, name: &str) -> String {
    let id = if identifier.is_empty() { name } else { identifier };
    match id.rsplit(['/', '\\']).next() {
        Some(tail) if !tail.is_empty() => tail.to_string(),
        _ => id.to_string(),
    }
}

/// Strip the leading priority byte and anything after the first language.
pub fn clean_languages(raw: &str) -> String {
    let trimmed = match raw.chars().next() {
        Some(c) if (c as u32) < 0x20 => &raw[c.len_utf8()..],
        _ => raw,
    };
    trimmed.split('\0').next().unwrap_or_default().to_string()
}

fn join_variant(base: &str, variant: &str) -> String {
    if variant.is_empty() {
        base.to_string()
    } else {
        format!("{base}+{variant}")
    }
}

fn enabled_voice(voice: &EngineVoice, global_variant: &str) -> VoiceDescriptor {
    let base = base_voice_name(&voice.identifier, &voice.name);
    let display = if voice.name.is_empty() {
        voice.identifier.clone()
    } else {
        voice.name.clone()
    };
    let display = if global_variant.is_empty() {
        display
    } else {
        format!("{display} ({global_variant})")
    };
    let id = join_variant(&base, global_variant);
    VoiceDescriptor::from_engine(voice, id.clone(), id, display)
}

fn profile_voice(voice: &EngineVoice, profile: &VoiceProfile) -> VoiceDescriptor {
    let base = base_voice_name(&voice.identifier, &voice.name);
    VoiceDescriptor::from_engine(
        voice,
        profile.id.clone(),
        join_variant(&base, &profile.variant),
        profile.name.clone(),
    )
}

/// Suffix repeated tokens with `#2`, `#3`, ... in catalog order.
fn dedup_tokens(catalog: &mut [VoiceDescriptor]) {
    let mut seen = HashSet::new();
    for entry in catalog.iter_mut() {
        if seen.insert(entry.token.clone()) {
            continue;
        }
        let mut n = 2;
        let token = loop {
            let candidate = format!("{}#{n}", entry.token);
            if !seen.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        log::debug!("Catalog token '{}' repeated, using '{token}'", entry.token);
        seen.insert(token.clone());
        entry.token = token;
    }
}

/// Build the ordered catalog for `voices` (engine order) under `config`.
///
/// The result is never empty and depends only on its inputs.
pub fn build_catalog(voices: &[EngineVoice], config: &Configuration) -> Vec<VoiceDescriptor> {
    let bases: Vec<String> = voices
        .iter()
        .map(|v| base_voice_name(&v.identifier, &v.name))
        .collect();
    let mut catalog = Vec::new();

    if config.default_only {
        if let Some((voice, base)) = voices
            .iter()
            .zip(&bases)
            .find(|(_, base)| DEFAULT_VOICE_IDS.contains(&base.as_str()))
        {
            log::debug!("Exposing default voice '{base}'");
            catalog.push(enabled_voice(voice, &config.global_variant));
        }
    } else {
        for (voice, base) in voices.iter().zip(&bases) {
            if config.is_voice_enabled(base) {
                log::debug!("Exposing enabled voice '{base}'");
                catalog.push(enabled_voice(voice, &config.global_variant));
            }
        }
    }

    for profile in config.voice_profiles.iter().filter(|p| p.enabled) {
        match bases.iter().position(|b| *b == profile.base_voice) {
            Some(idx) => {
                log::debug!(
                    "Exposing voice profile '{}' ({}+{})",
                    profile.name,
                    profile.base_voice,
                    profile.variant
                );
                catalog.push(profile_voice(&voices[idx], profile));
            }
            None => log::debug!(
                "Profile '{}' skipped: base voice '{}' not installed",
                profile.name,
                profile.base_voice
            ),
        }
    }

    if catalog.is_empty() {
        log::info!("No voices configured, exposing fallback 'en' voice");
        catalog.push(VoiceDescriptor::fallback());
    }

    dedup_tokens(&mut catalog);
    catalog
}
