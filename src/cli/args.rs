//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Vellum interactive document compiler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Verbose diagnostic output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Project root directory (default: search upward for vellum.toml)
    #[arg(short = 'C', long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new project
    #[command(visible_alias = "i")]
    Init {
        /// Project directory name (relative to current directory)
        #[arg(value_hint = clap::ValueHint::DirPath)]
        name: Option<PathBuf>,
    },

    /// Build the document once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Start the development server with live reload
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable file watching for auto-rebuild
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,

        /// Open the browser after the first successful build
        #[arg(long)]
        open: bool,
    },

    /// Manage project components
    #[command(visible_alias = "c")]
    Component {
        #[command(subcommand)]
        action: LibraryAction,
    },

    /// Manage project datasets
    #[command(visible_alias = "d")]
    Dataset {
        #[command(subcommand)]
        action: LibraryAction,
    },
}

/// Add/list actions shared by the component and dataset commands.
#[derive(Subcommand, Debug, Clone)]
pub enum LibraryAction {
    /// Copy a file into the project
    Add {
        /// Source file to copy
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },
    /// List what the project can resolve
    List,
}

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Minify the script bundle and stylesheet
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,

    /// Render the document body at build time
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub ssr: Option<bool>,

    /// Output directory path (relative to project root)
    #[arg(short = 'o', long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,
}
