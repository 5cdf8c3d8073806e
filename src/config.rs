use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::compiler::{CssCompiler, LightningCompiler};
use crate::env::BuildEnv;

pub const DEFAULT_TARGET: &str = "react-bemed/css";
pub const FACTORY_MODULE: &str = "react-bemed";
pub const FACTORY_IMPORT: &str = "bemed";
pub const CSS_IMPORT: &str = "css";

/// Plugin options as passed in the SWC plugin config object.
#[derive(Debug, Clone, PartialEq)]
pub struct BemedOptions {
    /// Module whose `css` import is tracked and rewritten.
    pub target: String,
    /// Reserved.
    pub runtime: Option<String>,
    pub precompile: bool,
    /// `None` means "on outside production".
    pub source_map: Option<bool>,
    pub assert_unique_names: Option<bool>,
    /// Vendor prefixing for the default preprocessor. `None` means "on in production".
    pub prefix: Option<bool>,
}

impl Default for BemedOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            runtime: None,
            precompile: true,
            source_map: None,
            assert_unique_names: None,
            prefix: None,
        }
    }
}

impl BemedOptions {
    pub fn from_config(mut config: HashMap<String, serde_json::Value>) -> Self {
        let defaults = Self::default();
        let target = config
            .remove("target")
            .and_then(|v| v.as_str().map(|s| s.to_string()))
            .unwrap_or(defaults.target);
        let runtime = config
            .remove("runtime")
            .and_then(|v| v.as_str().map(|s| s.to_string()));
        let precompile = config
            .remove("precompile")
            .and_then(|v| v.as_bool())
            .unwrap_or(defaults.precompile);
        let source_map = config.remove("sourceMap").and_then(|v| v.as_bool());
        let assert_unique_names = config.remove("assertUniqueNames").and_then(|v| v.as_bool());
        let prefix = config.remove("prefix").and_then(|v| v.as_bool());

        Self {
            target,
            runtime,
            precompile,
            source_map,
            assert_unique_names,
            prefix,
        }
    }

    pub fn from_json(json: &str) -> Self {
        Self::from_config(serde_json::from_str(json).unwrap_or_default())
    }

    /// Import path the `css` tag is redirected to when precompiling.
    pub fn precompiled_target(&self) -> String {
        format!("{}-precompiled", self.target)
    }
}

/// Input handed to a user supplied name generator.
#[derive(Debug, Clone, Copy)]
pub struct NameContext<'a> {
    pub filename: &'a str,
    pub variable_name: &'a str,
}

pub type NameGenerator = dyn Fn(&NameContext<'_>) -> Option<String> + Send + Sync;

/// Everything the transform needs besides the per-build session.
#[derive(Clone)]
pub struct BemedConfig {
    pub options: BemedOptions,
    pub env: BuildEnv,
    pub compiler: Arc<dyn CssCompiler>,
    pub generate_name: Option<Arc<NameGenerator>>,
}

impl BemedConfig {
    pub fn new(options: BemedOptions, env: BuildEnv) -> Self {
        let prefix = options.prefix.unwrap_or(env.mode.is_production());
        Self {
            options,
            env,
            compiler: Arc::new(LightningCompiler::new(prefix)),
            generate_name: None,
        }
    }

    /// Config for the current process, with mode and switches taken from
    /// `NODE_ENV` and `BEMED_DISABLE_DUPLICATE_DETECTION`.
    pub fn from_process_env(options: BemedOptions) -> Self {
        Self::new(options, BuildEnv::from_process_env())
    }

    pub fn with_compiler(mut self, compiler: impl CssCompiler + 'static) -> Self {
        self.compiler = Arc::new(compiler);
        self
    }

    pub fn with_name_generator(
        mut self,
        generate: impl Fn(&NameContext<'_>) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.generate_name = Some(Arc::new(generate));
        self
    }

    pub fn emits_source_maps(&self) -> bool {
        self.options
            .source_map
            .unwrap_or(!self.env.mode.is_production())
    }

    /// The uniqueness check runs only in production and only when
    /// `BEMED_DISABLE_DUPLICATE_DETECTION` is unset. Wasm plugin hosts may not
    /// forward process variables, so `assertUniqueNames: false` in the plugin
    /// config stands in for that switch.
    pub fn checks_unique_names(&self) -> bool {
        self.env.mode.is_production()
            && !self.env.disable_duplicate_detection
            && self.options.assert_unique_names != Some(false)
    }
}

impl fmt::Debug for BemedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BemedConfig")
            .field("options", &self.options)
            .field("env", &self.env)
            .field("generate_name", &self.generate_name.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Mode;

    #[test]
    fn reads_known_keys_and_ignores_the_rest() {
        let options = BemedOptions::from_json(
            r#"{"target":"my-css","precompile":false,"sourceMap":true,"prefix":"yes","other":1}"#,
        );
        assert_eq!(options.target, "my-css");
        assert!(!options.precompile);
        assert_eq!(options.source_map, Some(true));
        assert_eq!(options.prefix, None);
        assert_eq!(options.precompiled_target(), "my-css-precompiled");
    }

    #[test]
    fn invalid_json_falls_back_to_defaults() {
        assert_eq!(BemedOptions::from_json("not json"), BemedOptions::default());
    }

    #[test]
    fn source_maps_default_to_non_production() {
        let dev = BemedConfig::new(BemedOptions::default(), BuildEnv::new(Mode::Development));
        let prod = BemedConfig::new(BemedOptions::default(), BuildEnv::new(Mode::Production));
        assert!(dev.emits_source_maps());
        assert!(!prod.emits_source_maps());

        let forced = BemedConfig::new(
            BemedOptions {
                source_map: Some(true),
                ..Default::default()
            },
            BuildEnv::new(Mode::Production),
        );
        assert!(forced.emits_source_maps());
    }

    #[test]
    fn unique_name_check_policy() {
        let prod = BuildEnv::new(Mode::Production);
        assert!(BemedConfig::new(BemedOptions::default(), prod).checks_unique_names());
        assert!(!BemedConfig::new(BemedOptions::default(), BuildEnv::new(Mode::Development))
            .checks_unique_names());
        assert!(!BemedConfig::new(BemedOptions::default(), BuildEnv::new(Mode::Test))
            .checks_unique_names());
        assert!(!BemedConfig::new(
            BemedOptions::default(),
            prod.with_duplicate_detection_disabled()
        )
        .checks_unique_names());
        assert!(!BemedConfig::new(
            BemedOptions {
                assert_unique_names: Some(false),
                ..Default::default()
            },
            prod
        )
        .checks_unique_names());
    }
}
