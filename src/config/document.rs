use serde::{Deserialize, Serialize};

use super::{Configuration, VoiceProfile, DEFAULT_VERSION, INTONATION_DEFAULT};

/// On-disk shape of the settings document.
///
/// Every field has a serde default so partial documents load; numeric fields
/// are wide so out-of-range values survive parsing and get clamped instead of
/// failing the whole document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ConfigDocument {
    version: String,
    voices: VoicesSection,
    global_settings: GlobalSettings,
    voice_profiles: Vec<ProfileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct VoicesSection {
    default_only: bool,
    enabled: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct GlobalSettings {
    variant: String,
    intonation: i64,
    wordgap: i64,
    rateboost: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct ProfileEntry {
    id: String,
    name: String,
    base_voice: String,
    variant: String,
    enabled: bool,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            voices: VoicesSection::default(),
            global_settings: GlobalSettings::default(),
            voice_profiles: Vec::new(),
        }
    }
}

impl Default for VoicesSection {
    fn default() -> Self {
        Self {
            default_only: true,
            enabled: Vec::new(),
        }
    }
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            variant: String::new(),
            intonation: INTONATION_DEFAULT as i64,
            wordgap: 0,
            rateboost: false,
        }
    }
}

impl Default for ProfileEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            base_voice: String::new(),
            variant: String::new(),
            enabled: true,
        }
    }
}

/// Parse a settings document, applying defaults and clamping.
pub(crate) fn parse(content: &str) -> Result<Configuration, serde_json::Error> {
    let doc: ConfigDocument = serde_json::from_str(content)?;
    Ok(doc.into_configuration())
}

/// Render a configuration as a pretty-printed document.
pub(crate) fn render(config: &Configuration) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ConfigDocument::from_configuration(config))
}

impl ConfigDocument {
    fn into_configuration(self) -> Configuration {
        let voice_profiles = self
            .voice_profiles
            .into_iter()
            .filter(|p| {
                let keep = !p.id.is_empty() && !p.base_voice.is_empty();
                if !keep {
                    log::warn!("Dropping voice profile without id or base voice: {p:?}");
                }
                keep
            })
            .map(|p| VoiceProfile {
                id: p.id,
                name: p.name,
                base_voice: p.base_voice,
                variant: p.variant,
                enabled: p.enabled,
            })
            .collect();

        let mut config = Configuration {
            version: self.version,
            default_only: self.voices.default_only,
            enabled_voices: self.voices.enabled,
            global_variant: self.global_settings.variant,
            intonation: narrow(self.global_settings.intonation),
            word_gap: narrow(self.global_settings.wordgap),
            rate_boost: self.global_settings.rateboost,
            voice_profiles,
        };
        config.clamp();
        config
    }

    fn from_configuration(config: &Configuration) -> Self {
        Self {
            version: config.version.clone(),
            voices: VoicesSection {
                default_only: config.default_only,
                enabled: config.enabled_voices.clone(),
            },
            global_settings: GlobalSettings {
                variant: config.global_variant.clone(),
                intonation: config.intonation as i64,
                wordgap: config.word_gap as i64,
                rateboost: config.rate_boost,
            },
            voice_profiles: config
                .voice_profiles
                .iter()
                .map(|p| ProfileEntry {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    base_voice: p.base_voice.clone(),
                    variant: p.variant.clone(),
                    enabled: p.enabled,
                })
                .collect(),
        }
    }
}

fn narrow(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::{parse, render};
    use crate::config::{Configuration, VoiceProfile};

    #[test]
    fn empty_object_yields_defaults() {
        assert_eq!(parse("{}").unwrap(), Configuration::default());
    }

    #[test]
    fn partial_sections_use_per_field_defaults() {
        let cfg = parse(
            r#"{
                "voices": { "enabled": ["en", "de"] },
                "global_settings": { "wordgap": 12 }
            }"#,
        )
        .unwrap();

        assert!(cfg.default_only);
        assert_eq!(cfg.enabled_voices, vec!["en", "de"]);
        assert_eq!(cfg.intonation, 50);
        assert_eq!(cfg.word_gap, 12);
        assert_eq!(cfg.version, "1.0");
    }

    #[test]
    fn out_of_range_prosody_is_clamped() {
        let cfg = parse(
            r#"{ "global_settings": { "intonation": 9000000000, "wordgap": -40 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.intonation, 100);
        assert_eq!(cfg.word_gap, 0);
    }

    #[test]
    fn incomplete_profiles_are_dropped() {
        let cfg = parse(
            r#"{ "voice_profiles": [
                { "id": "profile-1", "name": "Ok", "base_voice": "en" },
                { "name": "No id", "base_voice": "en" },
                { "id": "profile-3", "name": "No base" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(
            cfg.voice_profiles,
            vec![VoiceProfile {
                id: "profile-1".into(),
                name: "Ok".into(),
                base_voice: "en".into(),
                variant: String::new(),
                enabled: true,
            }]
        );
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(parse("not json").is_err());
        assert!(parse(r#"{ "global_settings": { "intonation": "loud" } }"#).is_err());
    }

    #[test]
    fn render_uses_documented_keys() {
        let text = render(&Configuration::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["voices"]["default_only"], true);
        assert_eq!(value["global_settings"]["wordgap"], 0);
        assert_eq!(value["global_settings"]["rateboost"], false);
        assert!(value["voice_profiles"].as_array().unwrap().is_empty());
        assert!(text.contains("\n  \"voices\""));
    }
}
