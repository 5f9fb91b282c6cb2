//! Development server command.
//!
//! Builds once with watch mode enabled, then blocks until Ctrl+C. On the
//! first successful build the project brings the live-reload transport up
//! and installs the watcher set; this command only owns the shutdown path.

use super::BuildArgs;
use crate::config::Overrides;
use crate::log;
use crate::project::Project;
use anyhow::Result;
use crossbeam::channel;
use std::path::Path;

pub fn run(
    root: &Path,
    args: &BuildArgs,
    port: Option<u16>,
    watch: Option<bool>,
    open: bool,
) -> Result<()> {
    let overrides = Overrides {
        watch: Some(watch.unwrap_or(true)),
        open: Some(open),
        port,
        minify: args.minify,
        ssr: args.ssr,
        output: args.output.clone(),
        ..Overrides::default()
    };

    let project = Project::create(root, overrides)?;

    let (shutdown_tx, shutdown_rx) = channel::unbounded::<()>();
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))?;

    project.on_error(|error| {
        log!("error"; "build failed: {}", error);
    });
    project.build();

    // Block until Ctrl+C; reactions run on the driver thread meanwhile.
    let _ = shutdown_rx.recv();
    log!("serve"; "shutting down...");
    project.stop_watching();
    Ok(())
}
