//! Script and stylesheet minification.
//!
//! Uses oxc for JavaScript and lightningcss for CSS.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use serde::Deserialize;

use crate::transformer::{TransformError, TransformInput, TransformOutput, Transformer};
use crate::utils::path::resource::extension;

/// Writes a minified `<stem>.min.<ext>` into the asset's output directory.
///
/// ```json
/// { "type": "Minify", "config": { "mangle": false } }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinifyTransformer {
    /// Rename local JavaScript identifiers.
    pub mangle: bool,
}

impl Default for MinifyTransformer {
    fn default() -> Self {
        Self { mangle: true }
    }
}

impl Transformer for MinifyTransformer {
    fn is_applicable(&self, resource_name: &str) -> bool {
        matches!(extension(resource_name).as_deref(), Some("js" | "css"))
    }

    fn execute(
        &self,
        input: &TransformInput<'_>,
        output: &mut TransformOutput,
    ) -> Result<(), TransformError> {
        let bytes = input.read()?;
        let source = String::from_utf8(bytes).map_err(|_| {
            TransformError::Failed(format!("{} is not valid UTF-8", input.resource_name))
        })?;

        let ext = extension(input.resource_name).unwrap_or_default();
        let minified = match ext.as_str() {
            "js" => minify_js(&source, self.mangle),
            "css" => minify_css(&source),
            _ => None,
        }
        .ok_or_else(|| TransformError::Failed(format!("failed to minify {}", input.resource_name)))?;

        let name = input.output_name(&format!("{}.min.{ext}", input.file_stem()));
        output.write(&name, minified.as_bytes())
    }
}

/// Minify JavaScript source code.
pub fn minify_js(source: &str, mangle: bool) -> Option<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: mangle.then(MangleOptions::default),
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

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Option<String> {
    let stylesheet = StyleSheet::parse(source, ParserOptions::default()).ok()?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .ok()?;
    Some(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Flavor;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_applicability() {
        let minify = MinifyTransformer::default();
        assert!(minify.is_applicable("ui/app.js"));
        assert!(minify.is_applicable("ui/STYLE.CSS"));
        assert!(!minify.is_applicable("ui/logo.png"));
    }

    #[test]
    fn test_minify_css() {
        let out = minify_css("body {\n  color: red;\n}\n").unwrap();
        assert!(out.len() < 20);
        assert!(out.contains("body{color:red}") || out.contains("body{color:#f00}"));
    }

    #[test]
    fn test_minify_js_rejects_syntax_error() {
        assert!(minify_js("function (", true).is_none());
        assert!(minify_js("export const answer = 40 + 2;", true).is_some());
    }

    #[test]
    fn test_execute_writes_min_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("site.css");
        fs::write(&source, "a {  margin : 0px ; }").unwrap();
        let cache = dir.path().join("cache");

        let flavor = Flavor::default();
        let input = TransformInput {
            resource_name: "ui/site.css",
            input_file: &source,
            cache_dir: &cache,
            flavor: &flavor,
        };
        let mut output = TransformOutput::new(&cache);
        MinifyTransformer::default()
            .execute(&input, &mut output)
            .unwrap();

        assert_eq!(output.outputs(), ["ui/site.css.d/site.min.css"]);
        assert!(cache.join("ui/site.css.d/site.min.css").is_file());
    }
}
