use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use espeak_bridge::catalog::VoiceEnumerator;
use espeak_bridge::config::ConfigStore;
use espeak_bridge::engines::espeak::EspeakEngine;
use espeak_bridge::stream::{EventInterest, EventKind, SegmentBuilder, StreamAdapter, WavSite};
use espeak_bridge::{logging, EngineFacade};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let engine = Arc::new(EspeakEngine::new());
    let store = Arc::new(ConfigStore::open_default()?);
    println!("Settings: {}", store.path().display());

    let voices = VoiceEnumerator::from_services(engine.as_ref(), &store);
    for voice in voices.iter() {
        println!(
            "  {:<16} {:<28} {:<8} {:<11} {}",
            voice.id,
            voice.name,
            voice.language,
            voice.gender.as_str(),
            voice.age.as_str()
        );
    }
    println!("Variants: {:?}", engine.list_variants());

    let adapter = StreamAdapter::new(engine, store);
    let voice = voices.item(0)?;
    adapter.select_voice(&voice.id)?;

    let text = "Hello! This is eSpeak NG, speaking through the streaming bridge.";
    let segment = SegmentBuilder::default().text(text).build()?;

    let output = PathBuf::from("output.wav");
    let mut site = WavSite::create(&output)?;
    site.set_interest(
        EventInterest::none()
            .with(EventKind::WordBoundary)
            .with(EventKind::SentenceBoundary),
    );

    let synth_start = Instant::now();
    let outcome = adapter.speak(0, &[segment], &mut site)?;
    let synth_dur = synth_start.elapsed();

    let format = adapter.output_format();
    let audio_duration = outcome.bytes_written() as f64 / format.avg_bytes_per_sec() as f64;
    println!(
        "Synthesized {:.2}s audio in {:.2?} with voice '{}' ({} events)",
        audio_duration,
        synth_dur,
        voice.name,
        site.events().len()
    );

    site.finalize()?;
    println!("Saved to {}", output.display());
    Ok(())
}
