//! Script bundle assembly.
//!
//! The bundle is a single IIFE carrying the document tree, the loaded
//! datasets, the optional evaluation context, every referenced component
//! module (CommonJS-wrapped), and the client runtime. JavaScript
//! minification uses oxc.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use std::fmt::Write as _;
use std::io;
use std::path::Path;

use crate::embed;

/// A component module resolved for bundling: directive name + module source.
pub struct BundledModule {
    pub name: String,
    pub source: String,
}

/// Assemble the script bundle.
///
/// `doc_json` and `data_json` must be valid JSON; `context` is raw module
/// source. Minification failures fall back to the readable bundle.
pub fn script_bundle(
    doc_json: &str,
    data_json: &str,
    context: Option<&str>,
    modules: &[BundledModule],
    minify: bool,
) -> String {
    let mut js = String::new();
    js.push_str("(function () {\n\"use strict\";\n");
    let _ = writeln!(js, "var __VELLUM__ = {{");
    let _ = writeln!(js, "  doc: {doc_json},");
    let _ = writeln!(js, "  data: {data_json},");
    js.push_str("  context: null,\n  components: {}\n};\n");

    for module in modules {
        let _ = writeln!(
            js,
            "__VELLUM__.components[{name}] = (function () {{\nvar module = {{ exports: {{}} }};\nvar exports = module.exports;\n{source}\nreturn module.exports;\n}})();",
            name = js_string(&module.name),
            source = module.source,
        );
    }

    if let Some(context) = context {
        let _ = writeln!(
            js,
            "__VELLUM__.context = (function () {{\nvar module = {{ exports: {{}} }};\nvar exports = module.exports;\n{context}\nreturn module.exports;\n}})();"
        );
    }

    js.push_str(embed::RUNTIME_JS);
    js.push_str("})();\n");

    if minify {
        minify_js(&js).unwrap_or(js)
    } else {
        js
    }
}

/// Quote a string as a JavaScript literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Minify JavaScript source code.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::mjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

/// Recursively copy a directory tree. Missing source is not an error.
pub fn copy_dir(src: &Path, dst: &Path) -> io::Result<()> {
    if !src.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
