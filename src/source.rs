use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

lazy_static! {
    /// First `<script ...>` region of a template. Attributes are matched
    /// lazily, the body greedily up to the last closing tag.
    static ref SCRIPT_TAG: Regex = Regex::new(r"(?is)<script(\s[^>]*?)?>(.*)</script>").unwrap();

    /// Output files of the Svelte compile step: `Foo.svelte.ts`,
    /// `Foo.svelte.js`, `Foo.svelte.d.ts`.
    static ref SVELTE_OUTPUT_FILE: Regex = Regex::new(r"^(.*\.svelte)\.(?:d\.ts|ts|js)$").unwrap();
}

/// Provides raw template source text by file name.
pub trait SourceHost {
    fn read_file(&self, file: &str) -> Option<String>;
}

impl SourceHost for HashMap<String, String> {
    fn read_file(&self, file: &str) -> Option<String> {
        self.get(file).cloned()
    }
}

/// Reads sources from disk, relative to `root` when the name is relative.
#[derive(Debug, Clone, Default)]
pub struct FsSourceHost {
    root: PathBuf,
}

impl FsSourceHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceHost for FsSourceHost {
    fn read_file(&self, file: &str) -> Option<String> {
        let path = self.root.join(file);
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "failed to read source");
                None
            }
        }
    }
}

/// The position-bearing source diagnostics are reported against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub file_name: String,
    pub text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            file_name: file_name.into(),
            text,
            line_starts,
        }
    }

    /// 1-based line and column of a byte offset. Offsets past the end clamp
    /// to the last line.
    pub fn line_and_column(&self, offset: u32) -> (u32, u32) {
        let offset = (offset as usize).min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let column = offset - self.line_starts[line];
        (line as u32 + 1, column as u32 + 1)
    }
}

/// Name of the template a compiled script file was produced from. Names that
/// do not follow the compile step's pattern are returned unchanged.
pub fn template_file_for_script(script_file: &str) -> String {
    match SVELTE_OUTPUT_FILE.captures(script_file) {
        Some(caps) => caps[1].to_string(),
        None => script_file.to_string(),
    }
}

/// Replaces the template's script region with the compiled script text.
/// A template without a script tag is returned unchanged.
pub fn reconstruct_source(template: &str, compiled_source: &str) -> String {
    let replacement = format!("<script>{}</script>", compiled_source);
    SCRIPT_TAG
        .replace(template, regex::NoExpand(&replacement))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_file_for_script() {
        assert_eq!(template_file_for_script("src/Foo.svelte.ts"), "src/Foo.svelte");
        assert_eq!(template_file_for_script("src/Foo.svelte.d.ts"), "src/Foo.svelte");
        assert_eq!(template_file_for_script("Foo.svelte.js"), "Foo.svelte");
        assert_eq!(template_file_for_script("Foo.svelte"), "Foo.svelte");
        assert_eq!(template_file_for_script("util.ts"), "util.ts");
    }

    #[test]
    fn test_reconstruct_replaces_script_region() {
        let template = "<SCRIPT lang=\"ts\">\n  let a = 1;\n</SCRIPT>\n<p>{a}</p>";
        let source = reconstruct_source(template, "let a: number = 1;");
        assert_eq!(source, "<script>let a: number = 1;</script>\n<p>{a}</p>");
    }

    #[test]
    fn test_reconstruct_keeps_dollar_signs_literal() {
        let source = reconstruct_source("<script></script>", "let $store = $$props;");
        assert_eq!(source, "<script>let $store = $$props;</script>");
    }

    #[test]
    fn test_reconstruct_without_script_is_identity() {
        let template = "<Widget foo=\"bar\" />";
        assert_eq!(reconstruct_source(template, "let x;"), template);
    }

    #[test]
    fn test_line_and_column() {
        let file = SourceFile::new("A.svelte", "ab\ncd\n\nef");
        assert_eq!(file.line_and_column(0), (1, 1));
        assert_eq!(file.line_and_column(1), (1, 2));
        assert_eq!(file.line_and_column(3), (2, 1));
        assert_eq!(file.line_and_column(6), (3, 1));
        assert_eq!(file.line_and_column(8), (4, 2));
        assert_eq!(file.line_and_column(100), (4, 3));
    }

    #[test]
    fn test_hash_map_source_host() {
        let mut sources = HashMap::new();
        sources.insert("A.svelte".to_string(), "<p/>".to_string());
        assert_eq!(sources.read_file("A.svelte").as_deref(), Some("<p/>"));
        assert!(sources.read_file("B.svelte").is_none());
    }
}
