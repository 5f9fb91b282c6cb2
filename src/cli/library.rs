//! Component and dataset commands: the CLI face of the project mutation API.

use super::LibraryAction;
use crate::config::Overrides;
use crate::log;
use crate::project::Project;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn component(root: &Path, action: &LibraryAction) -> Result<()> {
    let project = open_project(root)?;
    match action {
        LibraryAction::Add { path } => {
            let dest = project.add_component(path)?;
            log!("component"; "added {}", dest.display());
        }
        LibraryAction::List => {
            let components = project.components();
            if components.is_empty() {
                log!("component"; "no components found");
                return Ok(());
            }
            for entry in components {
                println!("{}  {}", entry.name, entry.path.display().dimmed());
            }
        }
    }
    Ok(())
}

pub fn dataset(root: &Path, action: &LibraryAction) -> Result<()> {
    let project = open_project(root)?;
    match action {
        LibraryAction::Add { path } => {
            let dest = project.add_dataset(path)?;
            log!("dataset"; "added {}", dest.display());
        }
        LibraryAction::List => {
            let datasets = project
                .datasets()
                .context("no data directory; `vellum dataset add <file>` creates it")?;
            if datasets.is_empty() {
                log!("dataset"; "no datasets found");
                return Ok(());
            }
            for entry in datasets {
                println!(
                    "{}  {}  {}",
                    entry.name,
                    entry.extension.dimmed(),
                    entry.path.display().dimmed()
                );
            }
        }
    }
    Ok(())
}

fn open_project(root: &Path) -> Result<Project> {
    Project::create(
        root,
        Overrides {
            watch: Some(false),
            ..Overrides::default()
        },
    )
}
