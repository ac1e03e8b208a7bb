//! "Settings changed" signals between processes.
//!
//! A notifier carries no payload. It is set after every successful save and
//! cleared by the first poll that observes it, from whichever process polls
//! first. Any number of saves between two polls collapse into one signal.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub trait ChangeNotifier: Send + Sync {
    /// Mark the settings as changed.
    fn signal(&self);

    /// Consume a pending signal. Never blocks.
    fn poll(&self) -> bool;
}

/// Machine-wide notifier backed by a marker file.
///
/// Creating the file sets the signal; removing it consumes the signal.
/// File removal succeeds for exactly one caller, which gives the
/// auto-reset behavior across processes.
#[derive(Debug, Clone)]
pub struct FileNotifier {
    marker: PathBuf,
}

impl FileNotifier {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// A notifier whose marker sits next to `document`.
    pub fn beside(document: &Path) -> Self {
        let mut name = document
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "config".into());
        name.push(".changed");
        Self::new(document.with_file_name(name))
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }
}

impl ChangeNotifier for FileNotifier {
    fn signal(&self) {
        if let Some(dir) = self.marker.parent() {
            if let Err(e) = std::fs::create_dir_all(dir) {
                log::warn!("Failed to create {}: {e}", dir.display());
            }
        }
        match OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.marker)
        {
            Ok(_) => log::debug!("Config change signaled via {}", self.marker.display()),
            Err(e) => log::warn!(
                "Failed to signal config change via {}: {e}",
                self.marker.display()
            ),
        }
    }

    fn poll(&self) -> bool {
        match std::fs::remove_file(&self.marker) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                log::warn!(
                    "Failed to consume config change marker {}: {e}",
                    self.marker.display()
                );
                false
            }
        }
    }
}

/// In-process notifier; share it with `Arc` between stores.
#[derive(Debug, Default)]
pub struct LocalNotifier {
    pending: AtomicBool,
}

impl LocalNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeNotifier for LocalNotifier {
    fn signal(&self) {
        self.pending.store(true, Ordering::Release);
    }

    fn poll(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_signal_is_consumed_once() {
        let n = LocalNotifier::new();
        assert!(!n.poll());
        n.signal();
        n.signal();
        assert!(n.poll());
        assert!(!n.poll());
    }

    #[test]
    fn file_signal_is_consumed_once() {
        let dir = tempfile::tempdir().unwrap();
        let n = FileNotifier::beside(&dir.path().join("config.json"));
        assert_eq!(n.marker(), dir.path().join("config.json.changed"));

        assert!(!n.poll());
        n.signal();
        n.signal();
        assert!(n.marker().exists());

        let other = FileNotifier::new(n.marker());
        assert!(other.poll());
        assert!(!n.poll());
    }
}
