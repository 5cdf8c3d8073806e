use std::cell::{Cell, Ref, RefCell};
use std::collections::HashMap;
use std::fmt;

/// Class names already injected in one rendering context.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderRecord {
    rendered: HashMap<String, u32>,
}

impl RenderRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.rendered.contains_key(class_name)
    }

    /// How many times `class_name` was injected.
    pub fn count(&self, class_name: &str) -> u32 {
        self.rendered.get(class_name).copied().unwrap_or(0)
    }

    pub fn mark(&mut self, class_name: &str) {
        *self.rendered.entry(class_name.to_string()).or_insert(0) += 1;
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }
}

/// Puts compiled css into the live document.
pub trait StyleInjector {
    fn inject(&self, class_name: &str, css: &str, source_map: &str);
}

impl<F> StyleInjector for F
where
    F: Fn(&str, &str, &str),
{
    fn inject(&self, class_name: &str, css: &str, source_map: &str) {
        self(class_name, css, source_map)
    }
}

// -----------------------------------------------------------------------------
// Browser
// -----------------------------------------------------------------------------

/// The single record a page uses for its whole lifetime, plus the flag set
/// once the first style tag has mounted.
pub struct BrowserStyles {
    record: RefCell<RenderRecord>,
    initial_render_done: Cell<bool>,
    injector: Box<dyn StyleInjector>,
}

impl BrowserStyles {
    pub fn new(injector: impl StyleInjector + 'static) -> Self {
        Self {
            record: RefCell::new(RenderRecord::new()),
            initial_render_done: Cell::new(false),
            injector: Box::new(injector),
        }
    }

    pub fn record(&self) -> Ref<'_, RenderRecord> {
        self.record.borrow()
    }

    pub fn initial_render_done(&self) -> bool {
        self.initial_render_done.get()
    }

    pub fn mark_initial_render_done(&self) {
        if !self.initial_render_done.replace(true) {
            tracing::debug!("initial browser render done, inline style tags disabled");
        }
    }

    /// Back to a freshly loaded page. Only meant for tests.
    pub fn reset(&self) {
        *self.record.borrow_mut() = RenderRecord::new();
        self.initial_render_done.set(false);
    }

    pub(crate) fn mark(&self, class_name: &str) {
        self.record.borrow_mut().mark(class_name);
    }

    pub(crate) fn inject(&self, class_name: &str, css: &str, source_map: &str) {
        self.injector.inject(class_name, css, source_map);
    }
}

impl fmt::Debug for BrowserStyles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserStyles")
            .field("record", &self.record)
            .field("initial_render_done", &self.initial_render_done)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Server
// -----------------------------------------------------------------------------

/// Record owned by a single server render. Not `Sync`, so it cannot leak into
/// another request's render.
#[derive(Debug, Default)]
pub struct ServerStyles {
    record: RefCell<RenderRecord>,
}

impl ServerStyles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self) -> Ref<'_, RenderRecord> {
        self.record.borrow()
    }

    pub(crate) fn mark(&self, class_name: &str) {
        self.record.borrow_mut().mark(class_name);
    }
}

/// Run one server render with its own fresh record.
pub fn with_server_styles<R>(render: impl FnOnce(RenderContext<'_>) -> R) -> R {
    let styles = ServerStyles::new();
    render(RenderContext::Server(&styles))
}

// -----------------------------------------------------------------------------
// Context
// -----------------------------------------------------------------------------

/// Where a render happens; picked by the caller and passed down explicitly.
#[derive(Debug, Clone, Copy)]
pub enum RenderContext<'a> {
    Browser(&'a BrowserStyles),
    Server(&'a ServerStyles),
}

impl RenderContext<'_> {
    pub fn is_browser(&self) -> bool {
        matches!(self, RenderContext::Browser(_))
    }

    pub fn contains(&self, class_name: &str) -> bool {
        match self {
            RenderContext::Browser(styles) => styles.record().contains(class_name),
            RenderContext::Server(styles) => styles.record().contains(class_name),
        }
    }

    pub fn initial_render_done(&self) -> bool {
        match self {
            RenderContext::Browser(styles) => styles.initial_render_done(),
            RenderContext::Server(_) => false,
        }
    }

    pub(crate) fn mark(&self, class_name: &str) {
        match self {
            RenderContext::Browser(styles) => styles.mark(class_name),
            RenderContext::Server(styles) => styles.mark(class_name),
        }
    }
}
