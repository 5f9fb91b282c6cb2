//! One-shot build command.

use super::BuildArgs;
use crate::config::Overrides;
use crate::log;
use crate::project::Project;
use anyhow::{Result, bail};
use std::path::Path;
use std::sync::mpsc;

/// Run a single build and wait for its outcome.
pub fn run(root: &Path, args: &BuildArgs) -> Result<()> {
    let overrides = Overrides {
        watch: Some(false),
        minify: args.minify,
        ssr: args.ssr,
        output: args.output.clone(),
        ..Overrides::default()
    };

    let project = Project::create(root, overrides)?;

    // completion is observed only through the notifications
    let (tx, rx) = mpsc::channel();
    let sender = tx.clone();
    project.on_update(|output| {
        log!(
            "build";
            "{} component(s), {} dataset(s) -> {}",
            output.components.len(),
            output.datasets.len(),
            output.html.display()
        );
    });
    project.on_complete(move || {
        let _ = sender.send(Ok(()));
    });
    project.on_error(move |error| {
        let _ = tx.send(Err(error.to_string()));
    });

    project.build();

    match rx.recv()? {
        Ok(()) => Ok(()),
        Err(message) => bail!("build failed: {message}"),
    }
}
