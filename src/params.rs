//! Host prosody to engine parameter conversion.
//!
//! All functions are pure. Integer arithmetic and clamp order are part of the
//! contract: the boundary values must match what espeak-ng hosts have always
//! produced, so nothing here is computed in floating point.

use crate::config::Configuration;
use crate::stream::Segment;
use crate::EngineParams;

/// Host rate domain.
pub const HOST_RATE_MIN: i32 = -10;
pub const HOST_RATE_MAX: i32 = 10;

/// Host volume domain.
pub const HOST_VOLUME_MAX: u32 = 100;

/// One host rate step is ten percent of the engine's rate scale.
const RATE_TO_ENGINE_SCALE: i32 = 10;

const BASE_RATE: i32 = 175;
const SLOW_RATE_SCALE_FACTOR: i32 = 95;
const FAST_RATE_SCALE_FACTOR: i32 = 275;
const RATE_SCALE_DIVISOR: i32 = 100;
const MIN_RATE: i32 = 80;
const MAX_RATE: i32 = 450;
const RATE_BOOST_MULTIPLIER: i32 = 3;
const MAX_BOOSTED_RATE: i32 = 1350;

const BASE_PITCH: i32 = 50;
const PITCH_ADJ_MULTIPLIER: i32 = 2;
const MIN_PITCH_ADJ: i32 = -50;
const MAX_PITCH_ADJ: i32 = 50;
const MIN_PITCH: i32 = 0;
const MAX_PITCH: i32 = 99;

const FULL_VOLUME: i32 = 100;
const VOLUME_MULTIPLIER: i32 = 2;
const MAX_ENGINE_VOLUME: i32 = 200;

/// Words per minute for a host rate plus a per-segment adjustment.
///
/// Slow rates scale down towards 80 wpm, fast rates up towards 450 wpm. With
/// `rate_boost` the result is tripled, capped at 1350 wpm.
pub fn engine_rate(host_rate: i32, segment_adjust: i32, rate_boost: bool) -> i32 {
    let combined = host_rate
        .saturating_add(segment_adjust)
        .clamp(HOST_RATE_MIN, HOST_RATE_MAX);
    let scaled = combined * RATE_TO_ENGINE_SCALE;

    let rate = if scaled < 0 {
        BASE_RATE + scaled * SLOW_RATE_SCALE_FACTOR / RATE_SCALE_DIVISOR
    } else {
        BASE_RATE + scaled * FAST_RATE_SCALE_FACTOR / RATE_SCALE_DIVISOR
    };
    let rate = rate.clamp(MIN_RATE, MAX_RATE);

    if rate_boost {
        (rate * RATE_BOOST_MULTIPLIER).min(MAX_BOOSTED_RATE)
    } else {
        rate
    }
}

/// Engine base pitch for a segment's middle-pitch adjustment.
pub fn engine_pitch(segment_pitch_adjust: i32) -> i32 {
    let adj = segment_pitch_adjust
        .saturating_mul(PITCH_ADJ_MULTIPLIER)
        .clamp(MIN_PITCH_ADJ, MAX_PITCH_ADJ);
    (BASE_PITCH + adj).clamp(MIN_PITCH, MAX_PITCH)
}

/// Engine amplitude for the host volume combined with a segment volume.
///
/// Both inputs are in 0..=100 where 100 means "unchanged"; any attenuation in
/// either one is applied on top of the host volume.
pub fn engine_volume(host_volume: u32, segment_volume: u32) -> i32 {
    let host = host_volume.min(HOST_VOLUME_MAX) as i32;
    let segment = segment_volume.min(HOST_VOLUME_MAX) as i32;

    let adjust = (host - FULL_VOLUME) + (segment - FULL_VOLUME);
    let intermediate = (host + adjust).clamp(0, FULL_VOLUME);
    (intermediate * VOLUME_MULTIPLIER).clamp(0, MAX_ENGINE_VOLUME)
}

/// Full parameter set for one segment.
///
/// `host_rate` and `host_volume` are the host's current values; prosody
/// defaults come from `config`.
pub fn map_segment(
    host_rate: i32,
    host_volume: u32,
    segment: &Segment,
    config: &Configuration,
) -> EngineParams {
    EngineParams {
        rate: engine_rate(host_rate, segment.rate_adjust, config.rate_boost),
        pitch: engine_pitch(segment.pitch_adjust),
        volume: engine_volume(host_volume, segment.volume),
        intonation: config.intonation,
        word_gap: config.word_gap,
    }
}
