//! Build-time precompilation of `react-bemed` css templates plus the runtime
//! pieces that inject the compiled css at most once per rendering context.
//!
//! As an SWC plugin, the transform
//! - names `bemed()` block declarations after the variable they are bound to,
//!   rejecting duplicate names in production builds;
//! - rewrites css`...` templates into precompiled `css([...].join(""), map)`
//!   calls, preprocessing each distinct css body once per process.

use swc_core::{
    common::{errors::HANDLER, sync::Lrc, SourceMapper},
    ecma::{ast::Program, visit::VisitMutWith},
    plugin::{
        metadata::TransformPluginMetadataContextKind, plugin_transform,
        proxies::TransformPluginProgramMetadata,
    },
};

pub mod compiler;
pub mod config;
pub mod env;
pub mod error;
pub mod pipeline;
pub mod runtime;
pub mod session;
pub mod source_map;
pub mod transform;

pub use compiler::{CssCompiler, LightningCompiler, PrecompiledCompiler, PLACEHOLDER_SELECTOR};
pub use config::{BemedConfig, BemedOptions, NameContext};
pub use env::{BuildEnv, Mode};
pub use error::TransformError;
pub use pipeline::transform_source;
pub use session::{clear_global_session, BuildSession, GLOBAL_SESSION};
pub use transform::{transform_program, BemedTransform};

// -----------------------------------------------------------------------------
// Entrypoint
// -----------------------------------------------------------------------------

#[plugin_transform]
pub fn process_transform(mut program: Program, metadata: TransformPluginProgramMetadata) -> Program {
    let options = metadata
        .get_transform_plugin_config()
        .map(|s| BemedOptions::from_json(&s))
        .unwrap_or_default();

    // The host's env context wins over whatever NODE_ENV the plugin sees.
    let env = match metadata.get_context(&TransformPluginMetadataContextKind::Env) {
        Some(node_env) => BuildEnv::from_process_env().with_mode(Mode::from_node_env(Some(&node_env))),
        None => BuildEnv::from_process_env(),
    };
    let filename = metadata.get_context(&TransformPluginMetadataContextKind::Filename);
    let source_map: Lrc<dyn SourceMapper> = Lrc::new(metadata.source_map);

    let config = BemedConfig::new(options, env);

    // Names and compiled css are remembered across every file this process sees.
    let mut session = match GLOBAL_SESSION.lock() {
        Ok(session) => session,
        Err(poisoned) => poisoned.into_inner(),
    };

    let mut transform = BemedTransform::new(&config, &mut *session, filename, Some(source_map));
    program.visit_mut_with(&mut transform);

    if let Some((err, span)) = transform.take_error() {
        HANDLER.with(|handler| handler.struct_span_err(span, &err.to_string()).emit());
    }

    program
}
