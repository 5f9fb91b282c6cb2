//! Vellum - an interactive document compiler with a live-reloading
//! development loop.

#![allow(dead_code)]

mod cli;
mod config;
mod embed;
mod logger;
mod paths;
mod pipeline;
mod project;
mod reload;
mod resolver;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    match &cli.command {
        Commands::Init { name } => cli::init::run(name.as_ref()),
        Commands::Build { build_args } => {
            let root = cli::find_project_root(cli.root.as_ref());
            cli::build::run(&root, build_args)
        }
        Commands::Serve {
            build_args,
            port,
            watch,
            open,
        } => {
            let root = cli::find_project_root(cli.root.as_ref());
            cli::serve::run(&root, build_args, *port, *watch, *open)
        }
        Commands::Component { action } => {
            let root = cli::find_project_root(cli.root.as_ref());
            cli::library::component(&root, action)
        }
        Commands::Dataset { action } => {
            let root = cli::find_project_root(cli.root.as_ref());
            cli::library::dataset(&root, action)
        }
    }
}
