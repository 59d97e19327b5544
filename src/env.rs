use std::collections::HashMap;
use std::fmt;

use crate::error::{ClusterError, Result};

/// Environment variables the cluster operations read on the master host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvVar {
    Gphome,
    PxfHome,
    PxfRun,
    JavaHome,
    PxfConf,
}

impl EnvVar {
    pub fn name(self) -> &'static str {
        match self {
            EnvVar::Gphome => "GPHOME",
            EnvVar::PxfHome => "PXF_HOME",
            EnvVar::PxfRun => "PXF_RUN",
            EnvVar::JavaHome => "JAVA_HOME",
            EnvVar::PxfConf => "PXF_CONF",
        }
    }
}

impl fmt::Display for EnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view of an environment.
pub trait EnvSource {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The process environment.
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<String> {
        // Non-UTF-8 values still count as set.
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }
}

impl EnvSource for HashMap<String, String> {
    fn lookup(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Returns the value of `var`, distinguishing "never exported" from
/// "exported as empty".
pub fn resolve(env: &dyn EnvSource, var: EnvVar) -> Result<String> {
    match env.lookup(var.name()) {
        None => Err(ClusterError::EnvUnset(var)),
        Some(value) if value.is_empty() => Err(ClusterError::EnvBlank(var)),
        Some(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn returns_value_when_set() {
        let e = env(&[("PXF_RUN", "/test/run")]);
        assert_eq!(resolve(&e, EnvVar::PxfRun).unwrap(), "/test/run");
    }

    #[test]
    fn unset_and_blank_render_differently() {
        let e = env(&[("PXF_HOME", "")]);

        let unset = resolve(&e, EnvVar::Gphome).unwrap_err();
        assert!(matches!(unset, ClusterError::EnvUnset(EnvVar::Gphome)));
        assert_eq!(unset.to_string(), "GPHOME must be set");

        let blank = resolve(&e, EnvVar::PxfHome).unwrap_err();
        assert!(matches!(blank, ClusterError::EnvBlank(EnvVar::PxfHome)));
        assert_eq!(blank.to_string(), "PXF_HOME cannot be blank");
    }

    #[test]
    fn whitespace_is_not_blank() {
        let e = env(&[("JAVA_HOME", " ")]);
        assert_eq!(resolve(&e, EnvVar::JavaHome).unwrap(), " ");
    }
}
