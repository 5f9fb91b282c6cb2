//! Watch composition.
//!
//! `compose()` turns paths + the resolver registry into the full watcher
//! set: which paths are watched, with which debounce policy, and which
//! reaction a change triggers. `install()` binds each spec to a notify
//! watcher and a debounce task feeding reactions back to the project driver.
//!
//! The set is composed exactly once per watch session and replaced
//! wholesale, never patched.
//!
//! Reaction classes:
//! - the canonical document, the static directory and every resolver
//!   dependency directory trigger a full rebuild
//! - the stylesheet input triggers the cheap CSS-only path
//! - the script bundle is rewritten *by* the pipeline, so it only triggers a
//!   passive client reload, and only after a write-quiescence window
//!   (re-invoking the pipeline from its own output would loop)

mod debouncer;

pub use debouncer::{DEBOUNCE_MS, REBUILD_COOLDOWN_MS, Debouncer};

use crate::config::ProjectOptions;
use crate::paths::ProjectPaths;
use crate::resolver::Registry;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// Upper bound on idle sleep so stop flags are polled promptly.
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(250);

/// What a watcher does when its path set changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Full pipeline rebuild
    Rebuild,
    /// Stylesheet-only reassembly + scoped client refresh
    RefreshStyles,
    /// Passive client reload, no pipeline invocation
    ReloadClients,
}

/// Which changed paths a watcher cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFilter {
    /// Anything under the watched roots
    Any,
    /// Exactly this file, with a content-hash gate so rewrites with
    /// identical bytes (and the watcher's own initial scan) never fire
    File(PathBuf),
}

/// One row of the watch table: path set, debounce policy, reaction.
#[derive(Debug, Clone)]
pub struct WatcherSpec {
    pub label: &'static str,
    pub roots: Vec<PathBuf>,
    pub filter: PathFilter,
    /// Quiet window after the last event before the reaction fires
    pub quiet: Duration,
    /// Minimum spacing between consecutive firings
    pub cooldown: Duration,
    pub reaction: Reaction,
}

/// Compose the full watcher set for a watch session.
pub fn compose(
    options: &ProjectOptions,
    paths: &ProjectPaths,
    registry: &Registry,
) -> Vec<WatcherSpec> {
    let debounce = Duration::from_millis(DEBOUNCE_MS);
    let cooldown = Duration::from_millis(REBUILD_COOLDOWN_MS);

    vec![
        WatcherSpec {
            label: "document",
            roots: vec![paths.input_file.clone()],
            filter: PathFilter::File(paths.input_file.clone()),
            quiet: debounce,
            cooldown,
            reaction: Reaction::Rebuild,
        },
        WatcherSpec {
            label: "bundle",
            roots: vec![paths.script_output.clone()],
            filter: PathFilter::File(paths.script_output.clone()),
            quiet: Duration::from_millis(options.stability_ms),
            cooldown: Duration::ZERO,
            reaction: Reaction::ReloadClients,
        },
        WatcherSpec {
            label: "styles",
            roots: vec![paths.stylesheet_input.clone()],
            filter: PathFilter::File(paths.stylesheet_input.clone()),
            quiet: debounce,
            cooldown: Duration::ZERO,
            reaction: Reaction::RefreshStyles,
        },
        WatcherSpec {
            label: "static",
            roots: vec![paths.static_src_dir.clone()],
            filter: PathFilter::Any,
            quiet: debounce,
            cooldown,
            reaction: Reaction::Rebuild,
        },
        WatcherSpec {
            label: "resolvers",
            roots: registry.watch_directories(),
            filter: PathFilter::Any,
            quiet: debounce,
            cooldown,
            reaction: Reaction::Rebuild,
        },
    ]
}

/// A live watcher. Dropping it stops event delivery and winds the debounce
/// task down.
pub struct WatchHandle {
    pub label: &'static str,
    _watcher: RecommendedWatcher,
    stop: Arc<AtomicBool>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Install the full watcher set. Must run inside a tokio runtime.
///
/// Missing roots are skipped rather than failed: a project without a static
/// directory still watches everything else.
pub fn install(
    specs: Vec<WatcherSpec>,
    reactions: mpsc::UnboundedSender<Reaction>,
) -> notify::Result<Vec<WatchHandle>> {
    specs
        .into_iter()
        .map(|spec| install_one(spec, reactions.clone()))
        .collect()
}

fn install_one(
    spec: WatcherSpec,
    reactions: mpsc::UnboundedSender<Reaction>,
) -> notify::Result<WatchHandle> {
    // notify is sync; bridge its events into the async debounce task
    let (raw_tx, raw_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = raw_tx.send(res);
    })?;

    for (root, mode) in watch_roots(&spec) {
        if root.exists() {
            watcher.watch(&root, mode)?;
        }
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Ok(result) = raw_rx.recv() {
            match result {
                Ok(event) => {
                    if event_tx.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => crate::log!("watch"; "notify error: {}", e),
            }
        }
    });

    let stop = Arc::new(AtomicBool::new(false));
    tokio::spawn(debounce_loop(
        spec.clone(),
        event_rx,
        reactions,
        Arc::clone(&stop),
    ));

    Ok(WatchHandle {
        label: spec.label,
        _watcher: watcher,
        stop,
    })
}

/// Actual notify roots for a spec: file filters watch their parent directory
/// non-recursively (editors replace files, which breaks direct file
/// watches), directory filters watch recursively.
fn watch_roots(spec: &WatcherSpec) -> Vec<(PathBuf, RecursiveMode)> {
    match &spec.filter {
        PathFilter::File(file) => file
            .parent()
            .map(|parent| vec![(parent.to_path_buf(), RecursiveMode::NonRecursive)])
            .unwrap_or_default(),
        PathFilter::Any => spec
            .roots
            .iter()
            .map(|root| (root.clone(), RecursiveMode::Recursive))
            .collect(),
    }
}

async fn debounce_loop(
    spec: WatcherSpec,
    mut events: mpsc::UnboundedReceiver<notify::Event>,
    reactions: mpsc::UnboundedSender<Reaction>,
    stop: Arc<AtomicBool>,
) {
    let mut debouncer = Debouncer::new(spec.quiet, spec.cooldown);

    // Content snapshot for file-scoped watchers: firing requires the bytes
    // to actually differ from the last observed state.
    let mut snapshot = match &spec.filter {
        PathFilter::File(file) => hash_file(file),
        PathFilter::Any => None,
    };

    loop {
        if stop.load(Ordering::SeqCst) {
            break;
        }

        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => debouncer.add_event(&event),
                None => break,
            },
            _ = tokio::time::sleep(debouncer.sleep_duration().min(MAX_IDLE_SLEEP)) => {
                let Some(changes) = debouncer.take_if_ready() else {
                    continue;
                };
                if !should_fire(&spec, &changes, &mut snapshot) {
                    continue;
                }
                crate::debug!("watch"; "{}: {} change(s)", spec.label, changes.len());
                if reactions.send(spec.reaction).is_err() {
                    break;
                }
            }
        }
    }
}

/// Apply the spec's path filter and content gate to a released change set.
fn should_fire(
    spec: &WatcherSpec,
    changes: &FxHashSet<PathBuf>,
    snapshot: &mut Option<blake3::Hash>,
) -> bool {
    let PathFilter::File(file) = &spec.filter else {
        return !changes.is_empty();
    };

    if !changes.iter().any(|path| same_file(path, file)) {
        return false;
    }

    match hash_file(file) {
        Some(hash) => {
            if *snapshot == Some(hash) {
                return false;
            }
            *snapshot = Some(hash);
            true
        }
        // unreadable (deleted mid-edit): let the reaction surface it
        None => true,
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || crate::utils::normalize_path(a) == crate::utils::normalize_path(b)
}

fn hash_file(path: &Path) -> Option<blake3::Hash> {
    std::fs::read(path).ok().map(|bytes| blake3::hash(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectOptions;

    fn specs_for(root: &Path, options: &ProjectOptions) -> Vec<WatcherSpec> {
        let paths = ProjectPaths::derive(options, root);
        let registry = Registry::create(options, &paths).unwrap();
        compose(options, &paths, &registry)
    }

    #[test]
    fn test_compose_five_rows() {
        let dir = tempfile::tempdir().unwrap();
        let options = ProjectOptions::default();
        let specs = specs_for(dir.path(), &options);

        assert_eq!(specs.len(), 5);
        let labels: Vec<_> = specs.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            vec!["document", "bundle", "styles", "static", "resolvers"]
        );
    }

    #[test]
    fn test_compose_reactions() {
        let dir = tempfile::tempdir().unwrap();
        let options = ProjectOptions::default();
        let specs = specs_for(dir.path(), &options);

        assert_eq!(specs[0].reaction, Reaction::Rebuild);
        assert_eq!(specs[1].reaction, Reaction::ReloadClients);
        assert_eq!(specs[2].reaction, Reaction::RefreshStyles);
        assert_eq!(specs[3].reaction, Reaction::Rebuild);
        assert_eq!(specs[4].reaction, Reaction::Rebuild);
    }

    #[test]
    fn test_bundle_quiet_window_is_configurable() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = ProjectOptions::default();
        options.stability_ms = 1250;
        let specs = specs_for(dir.path(), &options);
        assert_eq!(specs[1].quiet, Duration::from_millis(1250));
        assert_eq!(specs[1].cooldown, Duration::ZERO);
    }

    #[test]
    fn test_resolver_row_covers_component_and_data_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let options = ProjectOptions::default();
        let paths = ProjectPaths::derive(&options, dir.path());
        let specs = specs_for(dir.path(), &options);

        let resolver_roots = &specs[4].roots;
        assert!(resolver_roots.contains(&paths.default_components_dir));
        assert!(resolver_roots.contains(&paths.components_dir));
        assert!(resolver_roots.contains(&paths.data_dir));
    }

    #[test]
    fn test_watch_roots_for_file_filter_is_parent_dir() {
        let spec = WatcherSpec {
            label: "document",
            roots: vec![PathBuf::from("/proj/index.vel")],
            filter: PathFilter::File(PathBuf::from("/proj/index.vel")),
            quiet: Duration::ZERO,
            cooldown: Duration::ZERO,
            reaction: Reaction::Rebuild,
        };
        assert_eq!(
            watch_roots(&spec),
            vec![(PathBuf::from("/proj"), RecursiveMode::NonRecursive)]
        );
    }

    #[test]
    fn test_should_fire_content_gate() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.vel");
        std::fs::write(&file, "one").unwrap();

        let spec = WatcherSpec {
            label: "document",
            roots: vec![file.clone()],
            filter: PathFilter::File(file.clone()),
            quiet: Duration::ZERO,
            cooldown: Duration::ZERO,
            reaction: Reaction::Rebuild,
        };
        let mut snapshot = hash_file(&file);
        let mut changes = FxHashSet::default();
        changes.insert(file.clone());

        // same bytes: gated
        assert!(!should_fire(&spec, &changes, &mut snapshot));

        // new bytes: fires once, then gated again
        std::fs::write(&file, "two").unwrap();
        assert!(should_fire(&spec, &changes, &mut snapshot));
        assert!(!should_fire(&spec, &changes, &mut snapshot));
    }

    #[test]
    fn test_should_fire_ignores_sibling_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.vel");
        std::fs::write(&file, "one").unwrap();

        let spec = WatcherSpec {
            label: "document",
            roots: vec![file.clone()],
            filter: PathFilter::File(file.clone()),
            quiet: Duration::ZERO,
            cooldown: Duration::ZERO,
            reaction: Reaction::Rebuild,
        };
        let mut snapshot = None;
        let mut changes = FxHashSet::default();
        changes.insert(dir.path().join("other.txt"));
        assert!(!should_fire(&spec, &changes, &mut snapshot));
    }

    #[tokio::test]
    async fn test_install_fires_reaction_on_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.vel");
        std::fs::write(&file, "before").unwrap();

        let spec = WatcherSpec {
            label: "document",
            roots: vec![file.clone()],
            filter: PathFilter::File(file.clone()),
            quiet: Duration::from_millis(50),
            cooldown: Duration::ZERO,
            reaction: Reaction::Rebuild,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handles = install(vec![spec], tx).unwrap();

        // give the watcher a moment to attach, then change content
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&file, "after").unwrap();

        let reaction = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no reaction within timeout")
            .expect("channel closed");
        assert_eq!(reaction, Reaction::Rebuild);

        drop(handles);
    }

    #[tokio::test]
    async fn test_closed_handles_stop_reactions() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.vel");
        std::fs::write(&file, "before").unwrap();

        let spec = WatcherSpec {
            label: "document",
            roots: vec![file.clone()],
            filter: PathFilter::File(file.clone()),
            quiet: Duration::from_millis(50),
            cooldown: Duration::ZERO,
            reaction: Reaction::Rebuild,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handles = install(vec![spec], tx).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        drop(handles);
        tokio::time::sleep(Duration::from_millis(300)).await;

        std::fs::write(&file, "after").unwrap();
        let result = tokio::time::timeout(Duration::from_millis(800), rx.recv()).await;
        // either the channel is already closed or nothing arrives
        assert!(matches!(result, Err(_) | Ok(None)));
    }
}
