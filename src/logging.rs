//! Logger setup for host processes.
//!
//! The crate logs through the `log` facade. A host that does not install its
//! own logger can call [`init`] once at startup.

use env_logger::Env;

/// Environment variable holding the filter, e.g. `espeak_bridge=debug`.
pub const LOG_ENV: &str = "ESPEAK_BRIDGE_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install `env_logger`, filtered by [`LOG_ENV`] (default `warn`).
///
/// Returns `false` when a logger was already installed, in which case the
/// existing one is kept.
pub fn init() -> bool {
    env_logger::Builder::from_env(Env::default().filter_or(LOG_ENV, DEFAULT_FILTER))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_is_idempotent() {
        super::init();
        assert!(!super::init());
        log::debug!("logger installed");
    }
}
