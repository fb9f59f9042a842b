//! Minification of merged bundle output.
//!
//! Uses oxc for scripts and lightningcss for styles. Unlike filters,
//! a minifier failure is never silently skipped: it aborts the compile.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::core::Format;

/// Minify script source code.
///
/// Bundles are plain concatenated scripts, so the source is parsed as a
/// classic script and top-level names are left alone.
pub fn minify_js(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let source_type = SourceType::cjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        let messages: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        return Err(messages.join("\n"));
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
    Ok(code)
}

/// Minify style source code.
pub fn minify_css(source: &str) -> Result<String, String> {
    let stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

/// Minify merged output for `format`.
///
/// Returns `None` when no minifier exists for the format; the text is then
/// written as-is.
pub fn minify_for(format: &Format, content: &str) -> Option<Result<String, String>> {
    if format.is_script() {
        Some(minify_js(content))
    } else if format.is_style() {
        Some(minify_css(content))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js_shrinks() {
        let src = "function add(first, second) {\n    return first + second;\n}\n";
        let out = minify_js(src).unwrap();
        assert!(out.len() < src.len());
    }

    #[test]
    fn test_minify_js_syntax_error() {
        assert!(minify_js("function (").is_err());
    }

    #[test]
    fn test_minify_css() {
        let out = minify_css("body {\n  color: #ff0000;\n}\n").unwrap();
        assert_eq!(out, "body{color:red}");
    }

    #[test]
    fn test_minify_for_unknown_format() {
        assert!(minify_for(&Format::new("html"), "<p></p>").is_none());
        assert!(minify_for(&Format::style(), "a { }").is_some());
    }
}
