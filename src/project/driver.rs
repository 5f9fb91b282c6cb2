//! The build driver.
//!
//! A message loop on a dedicated thread that owns all build execution for
//! one project. Because the loop processes one message at a time, builds are
//! naturally serialized; requests that arrive while a build is in flight are
//! drained when it settles and coalesced so only the most recent requested
//! snapshot is built. The output tree therefore always corresponds to
//! exactly one request, never an interleaving of two.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{LifecycleState, Shared};
use crate::config::{ProjectOptions, ResolvedPlugins};
use crate::paths::ProjectPaths;
use crate::pipeline::{self, BuildOutput, PipelineError};
use crate::reload::{DevServer, ServerOptions};
use crate::resolver::{Registry, StyleResolver};
use crate::watch::{self, Reaction};
use crate::{log, logger};

/// Messages processed by the driver loop.
pub(crate) enum DriverMsg {
    /// A `build()` call; `source` is the raw-source override.
    Build { source: Option<String> },
    /// A full-rebuild watch reaction. Ignored outside a watch session.
    WatchBuild,
    /// The stylesheet-input reaction: reassemble CSS, refresh clients.
    RefreshStyles,
    /// The script-output reaction: passive client reload.
    ReloadClients,
    /// Wind the driver down (project dropped).
    Shutdown,
}

/// One requested build snapshot.
struct BuildRequest {
    source: Option<String>,
}

pub(crate) struct Driver {
    pub(crate) options: Arc<ProjectOptions>,
    pub(crate) paths: Arc<ProjectPaths>,
    pub(crate) plugins: Arc<ResolvedPlugins>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) rx: mpsc::UnboundedReceiver<DriverMsg>,
    pub(crate) tx: mpsc::UnboundedSender<DriverMsg>,
}

impl Driver {
    /// Run the driver loop until shutdown.
    pub(crate) async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                DriverMsg::Shutdown => break,
                DriverMsg::Build { source } => {
                    if !self.build_cycle(BuildRequest { source }).await {
                        break;
                    }
                }
                DriverMsg::WatchBuild => {
                    if self.shared.is_watch_session_active()
                        && !self.build_cycle(BuildRequest { source: None }).await
                    {
                        break;
                    }
                }
                DriverMsg::RefreshStyles => {
                    if self.shared.is_watch_session_active() {
                        self.refresh_styles().await;
                    }
                }
                DriverMsg::ReloadClients => {
                    if self.shared.is_watch_session_active() {
                        self.reload_clients();
                    }
                }
            }
        }
    }

    /// Run builds until no request is pending. Returns `false` on shutdown.
    ///
    /// This is the single-slot superseding queue: every build request that
    /// arrived during the in-flight build collapses into at most one pending
    /// request, and only the latest survives.
    async fn build_cycle(&mut self, first: BuildRequest) -> bool {
        let mut pending = Some(first);

        while let Some(request) = pending.take() {
            self.shared.set_state(LifecycleState::Building);
            let result = self.run_pipeline(request).await;

            let mut refresh_styles = false;
            let mut reload_clients = false;
            let mut shutdown = false;
            while let Ok(msg) = self.rx.try_recv() {
                match msg {
                    // latest request wins, whatever its origin
                    DriverMsg::Build { source } => pending = Some(BuildRequest { source }),
                    DriverMsg::WatchBuild => {
                        if self.shared.is_watch_session_active() {
                            pending = Some(BuildRequest { source: None });
                        }
                    }
                    DriverMsg::RefreshStyles => refresh_styles = true,
                    DriverMsg::ReloadClients => reload_clients = true,
                    DriverMsg::Shutdown => {
                        shutdown = true;
                        break;
                    }
                }
            }

            self.route(result);

            if self.shared.is_watch_session_active() {
                if refresh_styles {
                    self.refresh_styles().await;
                }
                if reload_clients {
                    self.reload_clients();
                }
            }
            if shutdown {
                return false;
            }
        }
        true
    }

    /// Invoke the pipeline off the driver task.
    async fn run_pipeline(
        &self,
        request: BuildRequest,
    ) -> Result<(BuildOutput, Registry), PipelineError> {
        let options = Arc::clone(&self.options);
        let paths = Arc::clone(&self.paths);
        let plugins = Arc::clone(&self.plugins);

        let task = tokio::task::spawn_blocking(move || {
            // a fresh registry per build, never reused
            let registry = Registry::create(&options, &paths)?;
            let output = pipeline::build(
                &options,
                &paths,
                &registry,
                &plugins,
                request.source.as_deref(),
            )?;
            Ok((output, registry))
        });

        task.await
            .unwrap_or_else(|e| Err(PipelineError::Bundle(format!("build task panicked: {e}"))))
    }

    /// Route a settled build into notifications and state transitions.
    fn route(&self, result: Result<(BuildOutput, Registry), PipelineError>) {
        match result {
            Ok((output, registry)) => {
                self.shared.observers.notify_update(&output);

                if self.options.watch && !self.shared.is_watch_session_active() {
                    self.start_watch_session(&registry);
                }

                if self.shared.is_watch_session_active() {
                    logger::status_success(&format!(
                        "built in {}ms",
                        output.elapsed.as_millis()
                    ));
                } else {
                    log!("build"; "done in {}ms", output.elapsed.as_millis());
                }

                self.shared.observers.notify_complete();
                self.shared.set_state(if self.shared.is_watch_session_active() {
                    LifecycleState::Watching
                } else {
                    LifecycleState::Idle
                });
            }
            Err(error) => {
                self.shared.set_state(LifecycleState::Error);

                if !self.shared.observers.notify_error(&error) {
                    log!("error"; "build failed: {}", error);
                }
                if let Some(transport) = self.shared.transport.lock().as_ref() {
                    transport.notify_error(&error.to_string());
                }
                if self.shared.is_watch_session_active() {
                    logger::status_error("build failed", &error.to_string());
                }

                // Error is never terminal: ready for the next build() call
                self.shared.set_state(LifecycleState::Idle);
            }
        }
    }

    /// First successful build under watch mode: bring the transport up and
    /// install the watcher set, exactly once per session.
    fn start_watch_session(&self, registry: &Registry) {
        {
            let mut transport = self.shared.transport.lock();
            if transport.is_none() {
                match DevServer::init(&ServerOptions {
                    port: self.options.port,
                    output_dir: self.paths.output_dir.clone(),
                }) {
                    Ok(server) => {
                        if self.options.open {
                            crate::utils::browser::open(&format!("http://{}", server.addr()));
                        }
                        *transport = Some(server);
                    }
                    Err(e) => {
                        log!("serve"; "live-reload transport failed: {}", e);
                        return;
                    }
                }
            }
        }

        let specs = watch::compose(&self.options, &self.paths, registry);
        let (reaction_tx, mut reaction_rx) = mpsc::unbounded_channel();
        match watch::install(specs, reaction_tx) {
            Ok(handles) => {
                *self.shared.watchers.lock() = handles;
                self.shared.set_watch_session_active(true);

                let tx = self.tx.clone();
                tokio::spawn(async move {
                    while let Some(reaction) = reaction_rx.recv().await {
                        let msg = match reaction {
                            Reaction::Rebuild => DriverMsg::WatchBuild,
                            Reaction::RefreshStyles => DriverMsg::RefreshStyles,
                            Reaction::ReloadClients => DriverMsg::ReloadClients,
                        };
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                });

                log!("watch"; "watching for changes");
            }
            Err(e) => log!("watch"; "failed to install watchers: {}", e),
        }
    }

    /// The cheap CSS path: reassemble the stylesheet, refresh only it.
    async fn refresh_styles(&self) {
        let options = Arc::clone(&self.options);
        let paths = Arc::clone(&self.paths);

        let result = tokio::task::spawn_blocking(move || {
            let styles = StyleResolver::new(&options, &paths)?;
            pipeline::update_css(&paths, &styles, options.minify)
        })
        .await
        .unwrap_or_else(|e| Err(PipelineError::Bundle(format!("css task panicked: {e}"))));

        match result {
            Ok(()) => {
                if let Some(transport) = self.shared.transport.lock().as_ref() {
                    transport.reload(Some(self.options.output_css.as_str()));
                }
                logger::status_success("styles refreshed");
            }
            Err(e) => logger::status_error("styles refresh failed", &e.to_string()),
        }
    }

    /// The passive path: the bundle settled on disk, tell clients to reload.
    fn reload_clients(&self) {
        if let Some(transport) = self.shared.transport.lock().as_ref() {
            transport.reload(None);
        }
        logger::status_success("reloaded");
    }
}
