use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use super::document;
use super::notify::{ChangeNotifier, FileNotifier};
use super::Configuration;

/// Directory under the per-user config dir holding the settings document.
pub const APP_DIR_NAME: &str = "espeak-ng-sapi";

/// File name of the settings document.
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("No per-user configuration directory is available")]
    NoConfigDir,
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Holder of the process's view of the shared settings.
///
/// Construct one per process and share it with `Arc`. [`config`] returns a
/// snapshot, first picking up changes saved by other processes.
///
/// [`config`]: ConfigStore::config
pub struct ConfigStore {
    path: PathBuf,
    notifier: Arc<dyn ChangeNotifier>,
    /// Held for file access; readers of the snapshot never wait on it.
    io: Mutex<()>,
    snapshot: Mutex<Configuration>,
    reloads: AtomicU64,
}

impl ConfigStore {
    /// A store over `path`, starting from the default configuration.
    ///
    /// Nothing is read until [`load`](ConfigStore::load).
    pub fn open(path: impl Into<PathBuf>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            path: path.into(),
            notifier,
            io: Mutex::new(()),
            snapshot: Mutex::new(Configuration::default()),
            reloads: AtomicU64::new(0),
        }
    }

    /// The per-user store with a machine-wide file notifier.
    pub fn open_default() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        let notifier = Arc::new(FileNotifier::beside(&path));
        Ok(Self::open(path, notifier))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of reloads triggered by change notifications.
    pub fn reload_count(&self) -> u64 {
        self.reloads.load(Ordering::Relaxed)
    }

    /// Read the document into the snapshot.
    ///
    /// On any failure the snapshot is reset to defaults and the error is
    /// returned for the caller to log or ignore.
    pub fn load(&self) -> Result<(), ConfigError> {
        let _io = self.io.lock();
        match self.read_document() {
            Ok(config) => {
                log::info!(
                    "Loaded config (default_only={}, enabled_voices={}, profiles={})",
                    config.default_only,
                    config.enabled_voices.len(),
                    config.voice_profiles.len()
                );
                *self.snapshot.lock() = config;
                Ok(())
            }
            Err(e) => {
                log::warn!("Using default config: {e}");
                *self.snapshot.lock() = Configuration::default();
                Err(e)
            }
        }
    }

    /// Persist `config`, adopt it as the snapshot and notify other processes.
    ///
    /// When the write fails the snapshot is left untouched.
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let content = document::render(config)?;
        let _io = self.io.lock();
        self.write_document(&content)?;

        *self.snapshot.lock() = config.clone();
        self.notifier.signal();
        log::info!("Saved config to {}", self.path.display());
        Ok(())
    }

    /// Current settings, reloaded first if another process saved since the
    /// last check. A failed reload keeps the previous snapshot.
    pub fn config(&self) -> Configuration {
        if self.notifier.poll() {
            self.reload();
        }
        self.snapshot.lock().clone()
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::Relaxed);
        log::debug!("Config change signaled, reloading");
        let _io = self.io.lock();
        match self.read_document() {
            Ok(config) => {
                log::debug!(
                    "Config reloaded (intonation={}, wordgap={}, rateboost={})",
                    config.intonation,
                    config.word_gap,
                    config.rate_boost
                );
                *self.snapshot.lock() = config;
            }
            Err(e) => log::warn!("Config reload failed, keeping previous settings: {e}"),
        }
    }

    fn read_document(&self) -> Result<Configuration, ConfigError> {
        let content = std::fs::read_to_string(&self.path).map_err(io_error(&self.path))?;
        Ok(document::parse(&content)?)
    }

    fn write_document(&self, content: &str) -> Result<(), ConfigError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_error(dir))?;

        // Readers in other processes must never see a half-written document.
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
        tmp.write_all(content.as_bytes()).map_err(io_error(tmp.path()))?;
        tmp.persist(&self.path).map_err(|e| io_error(&self.path)(e.error))?;
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.to_path_buf();
    move |source| ConfigError::Io { path, source }
}

/// `<per-user config dir>/espeak-ng-sapi/config.json`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}
