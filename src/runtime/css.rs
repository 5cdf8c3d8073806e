use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::compiler::{CssCompiler, LightningCompiler, PrecompiledCompiler};
use crate::env::Mode;
use crate::runtime::record::RenderContext;
use crate::runtime::render::{CssChunk, Rendered, StyleRenderer};

/// Factory behind the runtime `css` tag. Every description it creates shares
/// its compiler and renderer.
#[derive(Clone)]
pub struct CssTag {
    renderer: StyleRenderer,
    compiler: Arc<dyn CssCompiler>,
}

impl CssTag {
    pub fn new(compiler: Arc<dyn CssCompiler>, mode: Mode) -> Self {
        Self {
            renderer: StyleRenderer::new(compiler.clone(), mode),
            compiler,
        }
    }

    /// Tag used for css that went through the build-time transform.
    pub fn precompiled(mode: Mode) -> Self {
        Self::new(Arc::new(PrecompiledCompiler), mode)
    }

    /// Tag that preprocesses css at runtime.
    pub fn runtime(mode: Mode) -> Self {
        Self::new(Arc::new(LightningCompiler::new(mode.is_production())), mode)
    }

    /// Call form emitted by the transform: `css(style, sourceMap)`.
    pub fn css(&self, style: impl Into<String>, source_map: impl Into<String>) -> BemCss {
        BemCss {
            css_string: style.into(),
            source_map: source_map.into(),
            tag: self.clone(),
        }
    }

    /// Template form: literals interleaved with placeholder values.
    pub fn template(&self, literals: &[&str], placeholders: &[&dyn fmt::Display]) -> BemCss {
        let mut css_string = String::new();
        for (literal, placeholder) in literals.iter().zip(placeholders) {
            css_string.push_str(literal);
            css_string.push_str(&placeholder.to_string());
        }
        if let Some(last) = literals.get(placeholders.len()) {
            css_string.push_str(last);
        }
        self.css(css_string, "")
    }
}

impl fmt::Debug for CssTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CssTag")
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

/// Css description produced by the `css` tag.
#[derive(Debug, Clone)]
pub struct BemCss {
    pub css_string: String,
    pub source_map: String,
    tag: CssTag,
}

impl BemCss {
    /// Css scoped under `selector`, followed by its source map comment.
    pub fn as_css(&self, selector: &str) -> String {
        let compiled = self.tag.compiler.compile(selector, &self.css_string);
        format!("{compiled}\n{}", self.source_map).trim().to_string()
    }

    pub fn as_style_tag(&self, selector: &str) -> StyleTag {
        StyleTag::new(self.as_css(selector))
    }

    /// Pair this css with the class it styles.
    pub fn chunk(&self, class_name: impl Into<String>) -> CssChunk {
        CssChunk::new(class_name, self.css_string.clone(), self.source_map.clone())
    }

    pub fn render<E>(&self, element: E, chunks: &[CssChunk], ctx: RenderContext<'_>) -> Rendered<E> {
        self.tag.renderer.render(element, chunks, ctx)
    }
}

/// `<style>` element with css set as raw inner html.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTag {
    css: String,
    attrs: BTreeMap<String, String>,
}

impl StyleTag {
    pub fn new(css: String) -> Self {
        Self {
            css,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn css(&self) -> &str {
        &self.css
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<style")?;
        for (key, value) in &self.attrs {
            write!(f, " {key}=\"{}\"", value.replace('"', "&quot;"))?;
        }
        write!(f, ">{}</style>", self.css)
    }
}
