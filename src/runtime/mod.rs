//! Runtime half: turns compiled css descriptions into injected styles,
//! at most once per rendering context.

pub mod css;
pub mod record;
pub mod render;

pub use css::{BemCss, CssTag, StyleTag};
pub use record::{with_server_styles, BrowserStyles, RenderContext, RenderRecord, ServerStyles, StyleInjector};
pub use render::{CssChunk, DisappearingStyle, Rendered, StyleRenderer};
