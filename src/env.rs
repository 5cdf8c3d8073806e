// -----------------------------------------------------------------------------
// Build / runtime mode switches
// -----------------------------------------------------------------------------

const NODE_ENV: &str = "NODE_ENV";
const DISABLE_DUPLICATE_DETECTION: &str = "BEMED_DISABLE_DUPLICATE_DETECTION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Production,
    Test,
    #[default]
    Development,
}

impl Mode {
    /// Anything that is not "production" or "test" counts as development.
    pub fn from_node_env(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("production") => Mode::Production,
            Some("test") => Mode::Test,
            _ => Mode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        self == Mode::Production
    }

    pub fn is_test(self) -> bool {
        self == Mode::Test
    }
}

/// Environment-derived switches consulted by the transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildEnv {
    pub mode: Mode,
    pub disable_duplicate_detection: bool,
}

impl BuildEnv {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            disable_duplicate_detection: false,
        }
    }

    /// Read `NODE_ENV` and `BEMED_DISABLE_DUPLICATE_DETECTION` from the process.
    /// Any non-empty value of the latter turns the duplicate name check off.
    pub fn from_process_env() -> Self {
        let mode = Mode::from_node_env(std::env::var(NODE_ENV).ok().as_deref());
        let disable_duplicate_detection = std::env::var(DISABLE_DUPLICATE_DETECTION)
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        Self {
            mode,
            disable_duplicate_detection,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_duplicate_detection_disabled(mut self) -> Self {
        self.disable_duplicate_detection = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BemedConfig, BemedOptions};

    struct EnvVarGuard(&'static str);

    impl EnvVarGuard {
        fn set(key: &'static str, value: &str) -> Self {
            std::env::set_var(key, value);
            EnvVarGuard(key)
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            std::env::remove_var(self.0);
        }
    }

    // Single test so nothing else observes these variables mid-change.
    #[test]
    fn reads_switches_from_process_env() {
        let node_env = EnvVarGuard::set(NODE_ENV, "production");

        let disable = EnvVarGuard::set(DISABLE_DUPLICATE_DETECTION, "");
        let env = BuildEnv::from_process_env();
        assert_eq!(env.mode, Mode::Production);
        assert!(!env.disable_duplicate_detection);
        assert!(BemedConfig::new(BemedOptions::default(), env).checks_unique_names());
        drop(disable);

        let disable = EnvVarGuard::set(DISABLE_DUPLICATE_DETECTION, "1");
        let env = BuildEnv::from_process_env();
        assert!(env.disable_duplicate_detection);
        assert!(!BemedConfig::new(BemedOptions::default(), env).checks_unique_names());
        assert!(!BemedConfig::from_process_env(BemedOptions::default()).checks_unique_names());
        drop(disable);

        let env = BuildEnv::from_process_env();
        assert!(!env.disable_duplicate_detection);

        drop(node_env);
        let _node_env = EnvVarGuard::set(NODE_ENV, "test");
        assert_eq!(BuildEnv::from_process_env().mode, Mode::Test);
    }

    #[test]
    fn with_mode_keeps_disable_switch() {
        let env = BuildEnv::new(Mode::Development)
            .with_duplicate_detection_disabled()
            .with_mode(Mode::Production);
        assert!(env.mode.is_production());
        assert!(env.disable_duplicate_detection);
    }

    #[test]
    fn unknown_node_env_is_development() {
        assert_eq!(Mode::from_node_env(Some("production")), Mode::Production);
        assert_eq!(Mode::from_node_env(Some("test")), Mode::Test);
        assert_eq!(Mode::from_node_env(Some("staging")), Mode::Development);
        assert_eq!(Mode::from_node_env(None), Mode::Development);
    }

    #[test]
    fn disable_switch_is_independent_of_mode() {
        let env = BuildEnv::new(Mode::Production).with_duplicate_detection_disabled();
        assert!(env.mode.is_production());
        assert!(env.disable_duplicate_detection);
    }
}
