//! Small shared utilities.
//!
//! - [`path`]: filesystem path normalization (`normalize_path`, `resolve_path`)
//! - [`browser`]: platform launcher for `--open`

pub mod browser;
pub mod path;

pub use path::{normalize_path, resolve_path};
