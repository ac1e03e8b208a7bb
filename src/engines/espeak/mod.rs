//! espeak-ng synthesis engine.
//!
//! Drives the `espeak-ng` program for voice listing and synthesis. Audio is
//! read from the program's WAV output as it is produced and handed to the
//! caller in fixed-size chunks, so an utterance can be cancelled before
//! espeak-ng finishes.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! A bundled binary and data directory can be used instead through
//! [`EspeakEngine::with_espeak`].
//!
//! # Parameters
//!
//! | Engine parameter | espeak-ng option | Range |
//! |---|---|---|
//! | rate | `-s` | 80–450 words per minute, up to 1350 boosted |
//! | pitch | `-p` | 0–99 |
//! | volume | `-a` | 0–200 |
//! | intonation | `-P` | 0–100 pitch range |
//! | word gap | `-g` | 0–100, units of 10 ms |

mod engine;
mod voices;

pub use engine::{EspeakConfig, EspeakEngine};
pub use voices::{parse_variant_table, parse_voice_table};
