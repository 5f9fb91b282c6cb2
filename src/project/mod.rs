//! The project instance: the orchestrator that owns configuration, paths,
//! the live-reload transport, the active watcher set and the lifecycle
//! state.
//!
//! All mutable state of the dev loop lives behind this type; there is no
//! module-level mutable state anywhere in the crate. Build execution runs on
//! a dedicated driver thread (see [`driver`]); `build()` is a fire-and-forget
//! trigger whose completion is observed only through the registered
//! notifications.

mod driver;
mod observer;

pub use observer::Observers;

use anyhow::{Context, Result};
use driver::{Driver, DriverMsg};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

use crate::config::{Overrides, ProjectOptions, ResolvedPlugins};
use crate::paths::ProjectPaths;
use crate::pipeline::{BuildOutput, PipelineError};
use crate::reload::DevServer;
use crate::resolver::{ComponentEntry, DatasetEntry, scan_components, scan_datasets};
use crate::watch::WatchHandle;

/// Lifecycle state of a project instance.
///
/// `Error` is transient, never terminal: it always falls back to `Idle`,
/// ready for another `build()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Building,
    Watching,
    Error,
}

/// State shared between the project handle and its driver.
pub(crate) struct Shared {
    state: Mutex<LifecycleState>,
    pub(crate) observers: Observers,
    pub(crate) transport: Mutex<Option<DevServer>>,
    pub(crate) watchers: Mutex<Vec<WatchHandle>>,
    /// First-time latch for transport + watcher installation. Reset by
    /// `stop_watching()` so a later build starts a fresh session.
    watch_session: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(LifecycleState::Idle),
            observers: Observers::default(),
            transport: Mutex::new(None),
            watchers: Mutex::new(Vec::new()),
            watch_session: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_state(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }

    pub(crate) fn is_watch_session_active(&self) -> bool {
        self.watch_session.load(Ordering::SeqCst)
    }

    pub(crate) fn set_watch_session_active(&self, active: bool) {
        self.watch_session.store(active, Ordering::SeqCst);
    }
}

/// A project instance.
pub struct Project {
    options: Arc<ProjectOptions>,
    paths: Arc<ProjectPaths>,
    plugins: Arc<ResolvedPlugins>,
    shared: Arc<Shared>,
    driver_tx: mpsc::UnboundedSender<DriverMsg>,
    driver_thread: Option<std::thread::JoinHandle<()>>,
}

impl Project {
    /// Construct a project rooted at `root`.
    ///
    /// Merges configuration (fatal on malformed input), derives the path
    /// record, scaffolds the output/static/temp directories (idempotent) and
    /// resolves the plugin set. The driver thread starts immediately but
    /// stays idle until the first `build()`.
    pub fn create(root: &Path, overrides: Overrides) -> Result<Self> {
        let options = Arc::new(ProjectOptions::load(root, &overrides)?);
        let paths = Arc::new(ProjectPaths::derive(&options, root));
        paths.scaffold()?;
        let plugins = Arc::new(ResolvedPlugins::resolve(&options, &paths.input_dir));

        let shared = Arc::new(Shared::new());
        let (driver_tx, driver_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            options: Arc::clone(&options),
            paths: Arc::clone(&paths),
            plugins: Arc::clone(&plugins),
            shared: Arc::clone(&shared),
            rx: driver_rx,
            tx: driver_tx.clone(),
        };

        let driver_thread = std::thread::Builder::new()
            .name("vellum-driver".into())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to create driver runtime");
                rt.block_on(driver.run());
            })
            .context("failed to spawn driver thread")?;

        Ok(Self {
            options,
            paths,
            plugins,
            shared,
            driver_tx,
            driver_thread: Some(driver_thread),
        })
    }

    // ========================================================================
    // build lifecycle
    // ========================================================================

    /// Trigger a build. Fire-and-forget: completion is observed through the
    /// registered notifications.
    pub fn build(&self) -> &Self {
        let _ = self.driver_tx.send(DriverMsg::Build { source: None });
        self
    }

    /// Trigger a build of `source` instead of the configured input.
    pub fn build_with_source(&self, source: impl Into<String>) -> &Self {
        let _ = self.driver_tx.send(DriverMsg::Build {
            source: Some(source.into()),
        });
        self
    }

    /// Close every active watcher and tear the live-reload transport down.
    ///
    /// Only prevents *future* reactions; an in-flight build still runs to
    /// completion.
    pub fn stop_watching(&self) -> &Self {
        self.shared.set_watch_session_active(false);
        self.shared.watchers.lock().clear();
        if let Some(mut transport) = self.shared.transport.lock().take() {
            transport.exit();
        }
        let mut state = self.shared.state.lock();
        if *state == LifecycleState::Watching {
            *state = LifecycleState::Idle;
        }
        self
    }

    // ========================================================================
    // notifications
    // ========================================================================

    /// Observe successful builds; carries the build output payload.
    pub fn on_update(&self, observer: impl Fn(&BuildOutput) + Send + Sync + 'static) -> &Self {
        self.shared.observers.on_update(observer);
        self
    }

    /// Observe build completion (after the update notification).
    pub fn on_complete(&self, observer: impl Fn() + Send + Sync + 'static) -> &Self {
        self.shared.observers.on_complete(observer);
        self
    }

    /// Observe pipeline failures. Without any error observer, failures go to
    /// the default diagnostic channel instead.
    pub fn on_error(&self, observer: impl Fn(&PipelineError) + Send + Sync + 'static) -> &Self {
        self.shared.observers.on_error(observer);
        self
    }

    // ========================================================================
    // read accessors
    // ========================================================================

    pub fn options(&self) -> &ProjectOptions {
        &self.options
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn plugins(&self) -> &ResolvedPlugins {
        &self.plugins
    }

    pub fn state(&self) -> LifecycleState {
        *self.shared.state.lock()
    }

    /// Address of the development HTTP server, once a watch session is up.
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.shared.transport.lock().as_ref().map(DevServer::addr)
    }

    /// Port of the reload WebSocket, once a watch session is up.
    pub fn ws_port(&self) -> Option<u16> {
        self.shared.transport.lock().as_ref().map(DevServer::ws_port)
    }

    // ========================================================================
    // project mutation API
    // ========================================================================

    /// Enumerate components from the default and project directories.
    ///
    /// Missing directories are treated as empty. The reserved `index` stem
    /// is excluded; names are file stems without extension.
    pub fn components(&self) -> Vec<ComponentEntry> {
        self.components_directories()
            .iter()
            .flat_map(|dir| scan_components(dir))
            .collect()
    }

    /// The component directories, defaults first.
    pub fn components_directories(&self) -> Vec<PathBuf> {
        vec![
            self.paths.default_components_dir.clone(),
            self.paths.components_dir.clone(),
        ]
    }

    /// Copy a component module into the project component directory under
    /// its base name. Overwrites an existing file of the same name.
    pub fn add_component(&self, source: &Path) -> Result<PathBuf> {
        copy_into(source, &self.paths.components_dir)
    }

    /// Enumerate datasets in the data directory.
    ///
    /// A missing data directory is a hard failure here (unlike the tolerant
    /// component listing); callers wanting leniency check existence first.
    pub fn datasets(&self) -> Result<Vec<DatasetEntry>> {
        scan_datasets(&self.paths.data_dir).with_context(|| {
            format!(
                "cannot read data directory `{}`",
                self.paths.data_dir.display()
            )
        })
    }

    /// Copy a dataset file into the data directory under its base name.
    /// Overwrites an existing file of the same name.
    pub fn add_dataset(&self, source: &Path) -> Result<PathBuf> {
        copy_into(source, &self.paths.data_dir)
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        self.stop_watching();
        let _ = self.driver_tx.send(DriverMsg::Shutdown);
        if let Some(thread) = self.driver_thread.take() {
            let _ = thread.join();
        }
    }
}

/// Copy `source` into `dir` under its base name, creating `dir` if absent.
/// Last write wins; no merge, no versioning.
fn copy_into(source: &Path, dir: &Path) -> Result<PathBuf> {
    let file_name = source
        .file_name()
        .with_context(|| format!("`{}` has no file name", source.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let dest = dir.join(file_name);
    std::fs::copy(source, &dest)
        .with_context(|| format!("failed to copy {}", source.display()))?;
    Ok(dest)
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    /// Event stream recorded from the notification observers.
    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum Event {
        Update,
        Complete,
        Error,
    }

    fn observe(project: &Project) -> std_mpsc::Receiver<Event> {
        let (tx, rx) = std_mpsc::channel();
        let sender = tx.clone();
        project.on_update(move |_| {
            let _ = sender.send(Event::Update);
        });
        let sender = tx.clone();
        project.on_complete(move || {
            let _ = sender.send(Event::Complete);
        });
        project.on_error(move |_| {
            let _ = tx.send(Event::Error);
        });
        rx
    }

    fn wait_for(rx: &std_mpsc::Receiver<Event>, expected: Event) {
        loop {
            let event = rx
                .recv_timeout(Duration::from_secs(10))
                .unwrap_or_else(|_| panic!("timed out waiting for {expected:?}"));
            if event == expected {
                return;
            }
        }
    }

    fn project_with_source(root: &Path, source: &str) -> Project {
        Project::create(
            root,
            Overrides {
                input_string: Some(source.to_string()),
                ..Overrides::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_create_scaffolds_idempotently() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::create(root.path(), Overrides::default()).unwrap();
        assert!(project.paths().output_dir.is_dir());
        assert!(project.paths().static_output_dir.is_dir());
        assert!(project.paths().temp_dir.is_dir());
        drop(project);

        // re-running construction against an existing project must not fail
        let again = Project::create(root.path(), Overrides::default()).unwrap();
        assert_eq!(again.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_components_empty_when_no_directories() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(
            root.path().join("vellum.toml"),
            "default_components = \"missing-dir\"\n",
        )
        .unwrap();
        let project = Project::create(root.path(), Overrides::default()).unwrap();
        assert!(project.components().is_empty());
    }

    #[test]
    fn test_add_component_then_listed() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::create(root.path(), Overrides::default()).unwrap();

        let outside = tempfile::tempdir().unwrap();
        let module = outside.path().join("fancy-dial.js");
        std::fs::write(&module, "module.exports = function () {};").unwrap();

        let dest = project.add_component(&module).unwrap();
        assert_eq!(dest, project.paths().components_dir.join("fancy-dial.js"));

        let components = project.components();
        let entry = components
            .iter()
            .find(|entry| entry.name == "fancy-dial")
            .expect("added component not listed");
        assert!(entry.path.starts_with(&project.paths().components_dir));
    }

    #[test]
    fn test_add_component_missing_source_fails() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::create(root.path(), Overrides::default()).unwrap();
        assert!(project.add_component(Path::new("/no/such/file.js")).is_err());
    }

    #[test]
    fn test_dataset_roundtrip_and_asymmetry() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::create(root.path(), Overrides::default()).unwrap();

        // missing data directory is a hard failure
        assert!(project.datasets().is_err());

        let outside = tempfile::tempdir().unwrap();
        let dataset = outside.path().join("temps.json");
        std::fs::write(&dataset, "[1,2,3]").unwrap();
        project.add_dataset(&dataset).unwrap();

        let datasets = project.datasets().unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].name, "temps.json");
        assert_eq!(datasets[0].extension, ".json");
        assert_eq!(datasets[0].path, project.paths().data_dir.join("temps.json"));
    }

    #[test]
    fn test_build_emits_update_then_complete_never_error() {
        let root = tempfile::tempdir().unwrap();
        let project = project_with_source(root.path(), "# Title\n");
        let rx = observe(&project);

        project.build();
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), Event::Update);
        assert_eq!(rx.recv_timeout(Duration::from_secs(10)).unwrap(), Event::Complete);
        // settles back to Idle with no further events
        std::thread::sleep(Duration::from_millis(200));
        assert!(rx.try_recv().is_err());
        assert_eq!(project.state(), LifecycleState::Idle);

        // output directory contains the artifact set for the one-line input
        let html = std::fs::read_to_string(&project.paths().html_output).unwrap();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(project.paths().script_output.is_file());
        assert!(project.paths().stylesheet_output.is_file());
    }

    #[test]
    fn test_build_failure_recovers_to_idle() {
        let root = tempfile::tempdir().unwrap();
        // no index.vel and no input_string: the source stage fails
        let project = Project::create(root.path(), Overrides::default()).unwrap();
        let rx = observe(&project);

        project.build();
        wait_for(&rx, Event::Error);
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(project.state(), LifecycleState::Idle);

        // Error is not terminal: the next build succeeds
        project.build_with_source("# Recovered\n");
        wait_for(&rx, Event::Complete);
        let html = std::fs::read_to_string(&project.paths().html_output).unwrap();
        assert!(html.contains("Recovered"));
    }

    #[test]
    fn test_overlapping_builds_coalesce_to_latest() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::create(root.path(), Overrides::default()).unwrap();
        let (tx, rx) = std_mpsc::channel();
        project.on_complete(move || {
            let _ = tx.send(());
        });

        // fire a burst before the first settles; the driver must build the
        // first request plus exactly the latest of the rest
        project
            .build_with_source("# One\n")
            .build_with_source("# Two\n")
            .build_with_source("# Three\n");

        rx.recv_timeout(Duration::from_secs(10)).unwrap();
        // drain any further completions
        while rx.recv_timeout(Duration::from_millis(700)).is_ok() {}

        let html = std::fs::read_to_string(&project.paths().html_output).unwrap();
        assert!(
            html.contains("Three"),
            "final artifact must reflect the most recent request, got: {html}"
        );
    }

    #[test]
    fn test_stop_watching_without_session_is_noop() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::create(root.path(), Overrides::default()).unwrap();
        project.stop_watching();
        assert_eq!(project.state(), LifecycleState::Idle);
        assert!(project.server_addr().is_none());
    }

    #[test]
    fn test_watch_session_reactions() {
        let root = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("index.vel"), "# First\n").unwrap();
        let project = Project::create(
            root.path(),
            Overrides {
                watch: Some(true),
                port: Some(0),
                ..Overrides::default()
            },
        )
        .unwrap();
        let rx = observe(&project);

        project.build();
        wait_for(&rx, Event::Complete);
        assert_eq!(project.state(), LifecycleState::Watching);
        assert!(project.server_addr().is_some());

        // stylesheet change: css-scoped refresh, no new update notification
        std::fs::write(root.path().join("styles.css"), "body { color: teal }").unwrap();
        std::thread::sleep(Duration::from_secs(2));
        assert!(
            rx.try_recv().is_err(),
            "stylesheet change must not emit a pipeline notification"
        );
        let css = std::fs::read_to_string(&project.paths().stylesheet_output).unwrap();
        assert!(css.contains("teal"));

        // document change: full rebuild with a new update notification
        std::fs::write(root.path().join("index.vel"), "# Second\n").unwrap();
        wait_for(&rx, Event::Update);
        wait_for(&rx, Event::Complete);
        let html = std::fs::read_to_string(&project.paths().html_output).unwrap();
        assert!(html.contains("Second"));

        // stop watching: no further notifications for any change
        project.stop_watching();
        assert_eq!(project.state(), LifecycleState::Idle);
        std::thread::sleep(Duration::from_millis(300));
        while rx.try_recv().is_ok() {}
        std::fs::write(root.path().join("index.vel"), "# Third\n").unwrap();
        std::thread::sleep(Duration::from_secs(2));
        assert!(rx.try_recv().is_err());
    }
}
