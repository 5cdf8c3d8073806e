use std::sync::{Arc, RwLock};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::session::has_placeholders;

/// Selector the build step compiles against; replaced with the real class
/// selector at runtime.
pub const PLACEHOLDER_SELECTOR: &str = "__BEMED__";

/// `selector + css body -> scoped css`.
pub trait CssCompiler: Send + Sync {
    fn compile(&self, selector: &str, css: &str) -> String;
}

impl<F> CssCompiler for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn compile(&self, selector: &str, css: &str) -> String {
        self(selector, css)
    }
}

// -----------------------------------------------------------------------------
// lightningcss backed preprocessor
// -----------------------------------------------------------------------------

/// Nests the body under the selector and lets lightningcss flatten, minify
/// and (optionally) vendor-prefix it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightningCompiler {
    prefix: bool,
}

impl LightningCompiler {
    pub fn new(prefix: bool) -> Self {
        Self { prefix }
    }

    fn targets(&self) -> Targets {
        // Old engines force vendor prefixes; the modern set still lowers nesting.
        let browsers = if self.prefix {
            Browsers {
                chrome: Some(40 << 16),
                firefox: Some(40 << 16),
                safari: Some(8 << 16),
                ios_saf: Some(8 << 16),
                ..Browsers::default()
            }
        } else {
            Browsers {
                chrome: Some(100 << 16),
                firefox: Some(100 << 16),
                safari: Some(15 << 16),
                ..Browsers::default()
            }
        };
        Targets {
            browsers: Some(browsers),
            ..Targets::default()
        }
    }

    fn try_compile(&self, source: &str, optimize: bool) -> Result<String, String> {
        // Marker identifiers sit where typed values are expected (media feature
        // lengths and the like); recover from those instead of failing the sheet.
        let warnings = Arc::new(RwLock::new(Vec::new()));
        let options = ParserOptions {
            error_recovery: true,
            warnings: Some(warnings.clone()),
            ..ParserOptions::default()
        };
        let mut sheet = StyleSheet::parse(source, options).map_err(|e| e.to_string())?;
        if let Ok(warnings) = warnings.read() {
            for warning in warnings.iter() {
                tracing::debug!("recovered css parse error: {warning}");
            }
        }

        if optimize {
            sheet
                .minify(MinifyOptions {
                    targets: self.targets(),
                    ..MinifyOptions::default()
                })
                .map_err(|e| e.to_string())?;
        }

        // The printer alone still lowers nesting for the targets.
        let printed = sheet
            .to_css(PrinterOptions {
                minify: true,
                targets: self.targets(),
                ..PrinterOptions::default()
            })
            .map_err(|e| e.to_string())?;
        Ok(printed.code)
    }
}

impl CssCompiler for LightningCompiler {
    fn compile(&self, selector: &str, css: &str) -> String {
        let source = format!("{selector}{{{css}}}");
        // A marker stands for a value only known at runtime, so the minifier
        // must not treat it as overriding earlier declarations.
        let optimize = !has_placeholders(css);
        match self.try_compile(&source, optimize) {
            Ok(code) => code,
            Err(err) => {
                tracing::warn!("css for {selector} left unprocessed: {err}");
                source
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Runtime side of precompiled css
// -----------------------------------------------------------------------------

/// The body was already compiled at build time against
/// [`PLACEHOLDER_SELECTOR`]; only the selector needs to be put in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecompiledCompiler;

impl CssCompiler for PrecompiledCompiler {
    fn compile(&self, selector: &str, css: &str) -> String {
        css.replace(PLACEHOLDER_SELECTOR, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_compilers() {
        let compiler = |selector: &str, css: &str| format!("{selector}{{{css}}}");
        assert_eq!(compiler.compile(".a", "color:red"), ".a{color:red}");
    }

    #[test]
    fn precompiled_swaps_placeholder_selector() {
        let css = "__BEMED__{color:red}__BEMED__:hover{color:blue}";
        assert_eq!(
            PrecompiledCompiler.compile(".btn", css),
            ".btn{color:red}.btn:hover{color:blue}"
        );
    }

    #[test]
    fn lightning_scopes_body_under_selector() {
        let out = LightningCompiler::new(false).compile(".btn", "color: red;");
        assert!(out.starts_with(".btn"), "{out}");
        assert!(out.contains("color:red"), "{out}");
    }

    #[test]
    fn lightning_keeps_fallbacks_next_to_placeholders() {
        let out = LightningCompiler::new(false).compile(
            "__BEMED__",
            "margin: __BEMED_VAR_0__ __BEMED_VAR_1__; color: red; color: __BEMED_VAR_2__;",
        );
        assert!(out.contains("color:red"), "{out}");
        assert!(out.contains("color:__BEMED_VAR_2__"), "{out}");
        assert!(out.find("color:red") < out.find("color:__BEMED_VAR_2__"), "{out}");
        assert!(out.contains("__BEMED_VAR_0__ __BEMED_VAR_1__"), "{out}");
    }

    #[test]
    fn lightning_minifies_static_bodies() {
        let out = LightningCompiler::new(false).compile(".btn", "color: blue; color: red;");
        assert_eq!(out, ".btn{color:red}");
    }

    #[test]
    fn lightning_flattens_media_with_placeholder_prelude() {
        let out = LightningCompiler::new(false).compile(
            "__BEMED__",
            "@media (max-width: __BEMED_VAR_0__px) { color: red }",
        );
        assert!(out.starts_with("@media"), "{out}");
        assert!(out.contains("__BEMED_VAR_0__px"), "{out}");
        assert!(out.contains("__BEMED__{color:red}"), "{out}");
        assert!(!out.contains("__BEMED__{@media"), "{out}");
    }

    #[test]
    fn lightning_keeps_unparsable_input() {
        let out = LightningCompiler::new(false).compile(".btn", "color: red; }}} {{{");
        assert!(out.contains("color"), "{out}");
    }
}
