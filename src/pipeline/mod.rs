//! The build pipeline.
//!
//! `build()` turns source + resolved dependencies into the artifact set;
//! `update_css()` re-assembles only the stylesheet. Both are plain staged
//! functions: the concurrency policy around them (queueing, coalescing,
//! notifications) belongs to the project driver.
//!
//! Stages: source → parse → transform → resolve → bundle → post-process.

pub mod ast;
pub mod bundle;
pub mod parse;
pub mod render;
pub mod styles;
pub mod transform;

use crate::config::{ProjectOptions, ResolvedPlugins};
use crate::embed::{self, PageVars};
use crate::paths::ProjectPaths;
use crate::resolver::{Registry, StyleResolver};
use bundle::BundledModule;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

/// A stage failure. Recoverable at the project level: routed to the error
/// notification and the project returns to an idle state.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read source `{0}`")]
    Source(PathBuf, #[source] std::io::Error),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("resolve error: {0}")]
    Resolve(String),

    #[error("bundle error: {0}")]
    Bundle(String),

    #[error("io error")]
    Io(#[from] std::io::Error),
}

/// The payload of a successful build, passed through the update notification
/// unmodified.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub html: PathBuf,
    pub script: PathBuf,
    pub stylesheet: PathBuf,
    /// Component directive names, in document order
    pub components: Vec<String>,
    /// Dataset stems bundled into the artifact
    pub datasets: Vec<String>,
    pub elapsed: Duration,
}

/// Run a full build.
///
/// `source_override` takes precedence over the configured input string,
/// which takes precedence over the canonical input file.
pub fn build(
    options: &ProjectOptions,
    paths: &ProjectPaths,
    registry: &Registry,
    plugins: &ResolvedPlugins,
    source_override: Option<&str>,
) -> Result<BuildOutput, PipelineError> {
    let started = Instant::now();

    // source
    let source = match source_override {
        Some(source) => source.to_string(),
        None => match &options.input_string {
            Some(source) => source.clone(),
            None => std::fs::read_to_string(&paths.input_file)
                .map_err(|e| PipelineError::Source(paths.input_file.clone(), e))?,
        },
    };

    // parse + transform
    let mut doc = parse::parse(&source)?;
    for transform in &plugins.transforms {
        transform.apply(&mut doc);
    }

    // resolve components (each module bundled once, however often it is used)
    let component_names = doc.component_names();
    let mut modules: Vec<BundledModule> = Vec::new();
    for name in &component_names {
        if modules.iter().any(|module| &module.name == name) {
            continue;
        }
        let Some(path) = registry.components.resolve(name) else {
            return Err(PipelineError::Resolve(format!("unknown component `{name}`")));
        };
        let source = std::fs::read_to_string(&path)?;
        modules.push(BundledModule {
            name: name.clone(),
            source,
        });
    }

    // resolve datasets
    let data = registry.data.load()?;
    for reference in doc.data_refs() {
        if !data.contains_key(&reference) {
            return Err(PipelineError::Resolve(format!(
                "unknown dataset `@{reference}`"
            )));
        }
    }

    let context = match &options.compiler.context {
        Some(path) => {
            let path = crate::utils::resolve_path(path, &paths.input_dir);
            Some(std::fs::read_to_string(&path).map_err(|e| PipelineError::Source(path, e))?)
        }
        None => None,
    };

    // bundle
    let doc_json = serde_json::to_string(&doc.nodes)
        .map_err(|e| PipelineError::Bundle(e.to_string()))?;
    let data_json =
        serde_json::to_string(&data).map_err(|e| PipelineError::Bundle(e.to_string()))?;

    // intermediate artifact for debugging and external tooling
    std::fs::create_dir_all(&paths.temp_dir)?;
    std::fs::write(paths.temp_dir.join("document.json"), &doc_json)?;

    let script = bundle::script_bundle(
        &doc_json,
        &data_json,
        context.as_deref(),
        &modules,
        options.minify,
    );
    let css = registry.styles.assemble(options.minify)?;
    let html = render_page(options, paths, &doc)?;

    std::fs::create_dir_all(&paths.output_dir)?;
    std::fs::write(&paths.script_output, script)?;
    std::fs::write(&paths.stylesheet_output, css)?;
    std::fs::write(&paths.html_output, html)?;
    bundle::copy_dir(&paths.static_src_dir, &paths.static_output_dir)?;

    // post-process
    run_post_processors(options, paths, plugins);

    Ok(BuildOutput {
        html: paths.html_output.clone(),
        script: paths.script_output.clone(),
        stylesheet: paths.stylesheet_output.clone(),
        components: component_names,
        datasets: data.keys().cloned().collect(),
        elapsed: started.elapsed(),
    })
}

/// Re-assemble only the stylesheet artifact.
pub fn update_css(
    paths: &ProjectPaths,
    styles: &StyleResolver,
    minify: bool,
) -> Result<(), PipelineError> {
    let css = styles.assemble(minify)?;
    std::fs::create_dir_all(&paths.output_dir)?;
    std::fs::write(&paths.stylesheet_output, css)?;
    Ok(())
}

/// Render the page HTML from the template.
fn render_page(
    options: &ProjectOptions,
    paths: &ProjectPaths,
    doc: &ast::Document,
) -> Result<String, PipelineError> {
    let body = if options.ssr {
        render::render_body(doc)
    } else {
        String::new()
    };

    let title = paths
        .root
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("vellum document");

    let reload_tag = if options.watch {
        format!("\n  <script src=\"{}\"></script>", embed::RELOAD_CLIENT_URL)
    } else {
        String::new()
    };

    let vars = PageVars {
        title,
        styles_href: &options.output_css,
        script_src: &options.output_js,
        body: &body,
        ssr: options.ssr,
        reload_tag: &reload_tag,
    };

    let custom;
    let raw = match &options.template {
        Some(template) => {
            let path = crate::utils::resolve_path(template, &paths.input_dir);
            custom = std::fs::read_to_string(&path).map_err(|e| PipelineError::Source(path, e))?;
            custom.as_str()
        }
        None => embed::PAGE_HTML.raw(),
    };
    Ok(embed::TemplateVars::apply(&vars, raw))
}

/// Run each resolved post-processor on the rendered page.
///
/// Failures are logged, never fatal.
fn run_post_processors(options: &ProjectOptions, paths: &ProjectPaths, plugins: &ResolvedPlugins) {
    for processor in &plugins.post_processors {
        let status = std::process::Command::new(&processor.program)
            .arg(&paths.html_output)
            .current_dir(&paths.root)
            .env("VELLUM_ROOT", &paths.root)
            .env("VELLUM_OUTPUT_DIR", &paths.output_dir)
            .env("VELLUM_MINIFY", options.minify.to_string())
            .status();

        match status {
            Ok(status) if status.success() => {
                crate::debug!("post"; "`{}` ok", processor.name);
            }
            Ok(status) => {
                crate::log!("post"; "`{}` exited with {}", processor.name, status);
            }
            Err(e) => {
                crate::log!("post"; "`{}` failed to start: {}", processor.name, e);
            }
        }
    }
}
