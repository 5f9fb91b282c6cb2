//! Pure debouncer: timing and event deduplication only.
//!
//! No business logic, no reaction dispatch. A `quiet` window must elapse
//! after the last event before the accumulated change set is released; an
//! optional `cooldown` keeps consecutive releases apart. The script-output
//! watcher reuses the same mechanics with its configured write-quiescence
//! window as `quiet`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashSet;

/// Default debounce window for source watchers.
pub const DEBOUNCE_MS: u64 = 300;

/// Default cooldown between consecutive rebuild releases.
pub const REBUILD_COOLDOWN_MS: u64 = 800;

pub struct Debouncer {
    changes: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    last_release: Option<Instant>,
    quiet: Duration,
    cooldown: Duration,
}

impl Debouncer {
    pub fn new(quiet: Duration, cooldown: Duration) -> Self {
        Self {
            changes: FxHashSet::default(),
            last_event: None,
            last_release: None,
            quiet,
            cooldown,
        }
    }

    /// Record a notify event.
    ///
    /// Metadata-only modifications are ignored (mtime/chmod noise can
    /// trigger endless rebuild loops), as are editor temp files.
    pub fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) => {}
            EventKind::Modify(modify) => {
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
            }
            _ => return,
        }

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.changes.insert(path.clone());
            self.last_event = Some(Instant::now());
        }
    }

    /// Take the accumulated change set if the quiet window and cooldown have
    /// both elapsed.
    pub fn take_if_ready(&mut self) -> Option<FxHashSet<PathBuf>> {
        if !self.is_ready() {
            return None;
        }

        let changes = std::mem::take(&mut self.changes);
        self.last_event = None;

        if changes.is_empty() {
            return None;
        }

        self.last_release = Some(Instant::now());
        Some(changes)
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };

        if last_event.elapsed() < self.quiet {
            return false;
        }

        if let Some(last_release) = self.last_release
            && last_release.elapsed() < self.cooldown
        {
            return false;
        }

        !self.changes.is_empty()
    }

    /// Precise sleep duration until the next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        let quiet_remaining = self.quiet.saturating_sub(last_event.elapsed());

        let cooldown_remaining = self
            .last_release
            .map(|t| self.cooldown.saturating_sub(t.elapsed()))
            .unwrap_or(Duration::ZERO);

        quiet_remaining
            .max(cooldown_remaining)
            .max(Duration::from_millis(1))
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}
