use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compiler::{CssCompiler, PLACEHOLDER_SELECTOR};
use crate::error::TransformError;

static PLACEHOLDER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"__BEMED_VAR_[0-9]+__").unwrap());

/// Session used by the Wasm entry point, which has no other place to keep
/// state between files.
pub static GLOBAL_SESSION: Lazy<Mutex<BuildSession>> = Lazy::new(Default::default);

/// Forget every name, file and compiled css the plugin has seen so far.
pub fn clear_global_session() {
    match GLOBAL_SESSION.lock() {
        Ok(mut session) => session.clear(),
        Err(poisoned) => poisoned.into_inner().clear(),
    }
}

/// Positional marker standing in for the `index`th template expression.
pub fn placeholder_token(index: usize) -> String {
    format!("__BEMED_VAR_{index}__")
}

/// Index of the expression a token stands for, if it is a marker.
pub fn placeholder_index(token: &str) -> Option<usize> {
    token
        .strip_prefix("__BEMED_VAR_")?
        .strip_suffix("__")?
        .parse()
        .ok()
}

pub fn has_placeholders(css: &str) -> bool {
    PLACEHOLDER_TOKEN.is_match(css)
}

/// Split compiled css back into literal text and marker tokens, keeping the
/// markers and any empty text between them.
pub fn split_placeholders(css: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for m in PLACEHOLDER_TOKEN.find_iter(css) {
        tokens.push(css[last..m.start()].to_string());
        tokens.push(m.as_str().to_string());
        last = m.end();
    }
    tokens.push(css[last..].to_string());
    tokens
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub file: String,
    pub line: usize,
}

/// Build-wide state shared by every file a transform process sees.
#[derive(Debug, Default)]
pub struct BuildSession {
    names: HashMap<String, NameRecord>,
    seen_files: HashSet<String>,
    css_cache: HashMap<String, Vec<String>>,
}

impl BuildSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.seen_files.clear();
        self.css_cache.clear();
    }

    // ---------- names ----------

    pub fn name(&self, name: &str) -> Option<&NameRecord> {
        self.names.get(name)
    }

    /// Record the first occurrence of `name`; a second one is an error.
    pub fn register_name(
        &mut self,
        name: &str,
        file: &str,
        line: usize,
    ) -> Result<(), TransformError> {
        if let Some(dup) = self.names.get(name) {
            return Err(TransformError::DuplicateName {
                name: name.to_string(),
                file: dup.file.clone(),
                line: dup.line,
            });
        }
        tracing::debug!("registered bemed component {name} at {file}:{line}");
        self.names.insert(
            name.to_string(),
            NameRecord {
                file: file.to_string(),
                line,
            },
        );
        Ok(())
    }

    // ---------- files ----------

    pub fn is_file_seen(&self, file: &str) -> bool {
        self.seen_files.contains(file)
    }

    pub fn mark_file_seen(&mut self, file: &str) {
        self.seen_files.insert(file.to_string());
    }

    // ---------- css ----------

    pub fn cached_css(&self, source: &str) -> Option<&[String]> {
        self.css_cache.get(source).map(Vec::as_slice)
    }

    /// Token sequence for `source` compiled against the placeholder selector.
    /// The compiler runs at most once per distinct source.
    pub fn compile_css(&mut self, source: &str, compiler: &dyn CssCompiler) -> Vec<String> {
        if let Some(tokens) = self.cached_css(source) {
            tracing::trace!("css cache hit ({} bytes)", source.len());
            return tokens.to_vec();
        }
        tracing::debug!("css cache miss ({} bytes)", source.len());
        let compiled = compiler.compile(PLACEHOLDER_SELECTOR, source);
        let tokens = split_placeholders(&compiled);
        self.css_cache.insert(source.to_string(), tokens.clone());
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn split_keeps_markers_and_boundaries() {
        assert_eq!(
            split_placeholders("color: __BEMED_VAR_0__;"),
            vec!["color: ", "__BEMED_VAR_0__", ";"]
        );
        assert_eq!(
            split_placeholders("__BEMED_VAR_1__"),
            vec!["", "__BEMED_VAR_1__", ""]
        );
        assert_eq!(split_placeholders("a{b:c}"), vec!["a{b:c}"]);
    }

    #[test]
    fn rejoining_tokens_without_markers_is_lossless() {
        let css = "__BEMED__{color:red}__BEMED__:hover{color:blue}";
        assert_eq!(split_placeholders(css).concat(), css);
    }

    #[test]
    fn marker_index_round_trip() {
        assert_eq!(placeholder_index(&placeholder_token(12)), Some(12));
        assert_eq!(placeholder_index("__BEMED_VAR_x__"), None);
        assert_eq!(placeholder_index("color"), None);
    }

    #[test]
    fn compiles_each_source_once() {
        let calls = AtomicUsize::new(0);
        let compiler = |selector: &str, css: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            format!("{selector}{{{css}}}")
        };
        let mut session = BuildSession::new();
        let first = session.compile_css("color: __BEMED_VAR_0__", &compiler);
        let second = session.compile_css("color: __BEMED_VAR_0__", &compiler);
        assert_eq!(first, second);
        assert_eq!(first, vec!["__BEMED__{color: ", "__BEMED_VAR_0__", "}"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(session.cached_css("color: __BEMED_VAR_0__").is_some());
    }

    #[test]
    fn second_registration_reports_the_first() {
        let mut session = BuildSession::new();
        session.register_name("Button", "/src/a.js", 3).unwrap();
        let err = session.register_name("Button", "/src/b.js", 9).unwrap_err();
        assert_eq!(
            err.to_string(),
            "bemed component name \"Button\" already defined in /src/a.js line 3"
        );
    }

    #[test]
    fn clear_forgets_everything() {
        let mut session = BuildSession::new();
        session.register_name("Button", "/src/a.js", 3).unwrap();
        session.mark_file_seen("/src/a.js");
        session.compile_css("a", &|_: &str, css: &str| css.to_string());
        session.clear();
        assert!(session.name("Button").is_none());
        assert!(!session.is_file_seen("/src/a.js"));
        assert!(session.cached_css("a").is_none());
    }
}
