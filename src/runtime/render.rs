use std::fmt;
use std::sync::Arc;

use crate::compiler::CssCompiler;
use crate::env::Mode;
use crate::runtime::record::RenderContext;

const STYLE_TEST_ID: &str = "bemed-style";

/// Stringified css of one class, not yet scoped under its selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssChunk {
    pub class_name: String,
    pub css_string: String,
    pub source_map: String,
}

impl CssChunk {
    pub fn new(
        class_name: impl Into<String>,
        css_string: impl Into<String>,
        source_map: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            css_string: css_string.into(),
            source_map: source_map.into(),
        }
    }
}

/// Inline style tag rendered next to an element until the browser mounts it,
/// after which it removes itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisappearingStyle {
    key: String,
    css: String,
    test_id: bool,
    removed: bool,
}

impl DisappearingStyle {
    fn new(key: String, css: String, mode: Mode) -> Self {
        Self {
            key,
            css,
            test_id: !mode.is_production(),
            removed: false,
        }
    }

    /// Sorted class names of the css this tag carries, joined with `,`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Mount completion. Only a browser mount removes the tag; it also ends
    /// the initial render for the whole page.
    pub fn did_mount(&mut self, ctx: RenderContext<'_>) {
        if let RenderContext::Browser(styles) = ctx {
            styles.mark_initial_render_done();
            self.removed = true;
        }
    }
}

impl fmt::Display for DisappearingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.removed {
            return Ok(());
        }
        if self.test_id {
            write!(f, "<style data-testid=\"{STYLE_TEST_ID}\">{}</style>", self.css)
        } else {
            write!(f, "<style>{}</style>", self.css)
        }
    }
}

/// Output of a render: the element alone, or the element preceded by the
/// style tag holding css it needs on first paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<E> {
    Element(E),
    WithStyle { style: DisappearingStyle, element: E },
}

impl<E> Rendered<E> {
    pub fn element(&self) -> &E {
        match self {
            Rendered::Element(element) | Rendered::WithStyle { element, .. } => element,
        }
    }

    pub fn into_element(self) -> E {
        match self {
            Rendered::Element(element) | Rendered::WithStyle { element, .. } => element,
        }
    }

    pub fn style(&self) -> Option<&DisappearingStyle> {
        match self {
            Rendered::Element(_) => None,
            Rendered::WithStyle { style, .. } => Some(style),
        }
    }

    pub fn did_mount(&mut self, ctx: RenderContext<'_>) {
        if let Rendered::WithStyle { style, .. } = self {
            style.did_mount(ctx);
        }
    }
}

impl<E: fmt::Display> fmt::Display for Rendered<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Element(element) => element.fmt(f),
            Rendered::WithStyle { style, element } => write!(f, "{style}{element}"),
        }
    }
}

// -----------------------------------------------------------------------------
// Renderer
// -----------------------------------------------------------------------------

#[derive(Clone)]
pub struct StyleRenderer {
    compiler: Arc<dyn CssCompiler>,
    mode: Mode,
}

impl StyleRenderer {
    pub fn new(compiler: Arc<dyn CssCompiler>, mode: Mode) -> Self {
        Self { compiler, mode }
    }

    /// Whether a class already in the record may be injected again.
    fn allows_reinjection(&self, ctx: RenderContext<'_>) -> bool {
        // Never duplicate styles in production
        if self.mode.is_production() {
            return false;
        }
        // or tests
        if self.mode.is_test() {
            return false;
        }
        // or while rendering on the server
        if !ctx.is_browser() {
            return false;
        }
        // or during the first browser render, which must match the server markup.
        // After it, re-injecting enables style hot reloading.
        ctx.initial_render_done()
    }

    /// Inject every chunk not yet seen in `ctx` and, until the first browser
    /// mount, put the compiled css next to `element` in a style tag.
    pub fn render<E>(&self, element: E, chunks: &[CssChunk], ctx: RenderContext<'_>) -> Rendered<E> {
        let mut compiled: Vec<(&str, String)> = Vec::new();

        for chunk in chunks {
            if ctx.contains(&chunk.class_name) && !self.allows_reinjection(ctx) {
                tracing::trace!("skipping already rendered {}", chunk.class_name);
                continue;
            }

            let css = self
                .compiler
                .compile(&format!(".{}", chunk.class_name), &chunk.css_string);
            ctx.mark(&chunk.class_name);

            if let RenderContext::Browser(styles) = ctx {
                styles.inject(&chunk.class_name, &css, &chunk.source_map);
            }

            compiled.push((chunk.class_name.as_str(), css));
        }

        if compiled.is_empty() || ctx.initial_render_done() {
            return Rendered::Element(element);
        }

        let mut class_names: Vec<&str> = compiled.iter().map(|(name, _)| *name).collect();
        class_names.sort_unstable();
        let key = class_names.join(",");
        let css = compiled
            .iter()
            .map(|(_, css)| css.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        tracing::debug!("rendering inline style tag for {key}");
        Rendered::WithStyle {
            style: DisappearingStyle::new(key, css, self.mode),
            element,
        }
    }
}

impl fmt::Debug for StyleRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyleRenderer")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
