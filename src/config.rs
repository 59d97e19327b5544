use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const CONFIG_FILE: &str = "pxf-cluster.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub ssh: SshSettings,
    pub psql: PsqlConfig,
    /// Per-hostname tweaks layered over `ssh`.
    pub hosts: HashMap<String, HostSettings>,
}

/// How `pxf cluster` reaches a host over ssh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SshSettings {
    pub connect_timeout: u32,
    pub strict_host_key: String,
    /// Fail instead of prompting for a password or passphrase.
    pub batch_mode: bool,
    /// Extra `-o Key=Value` pairs.
    pub options: HashMap<String, String>,
}

impl Default for SshSettings {
    fn default() -> Self {
        Self {
            connect_timeout: 5,
            strict_host_key: "accept-new".to_string(),
            batch_mode: true,
            options: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PsqlConfig {
    pub database: String,
}

impl Default for PsqlConfig {
    fn default() -> Self {
        Self {
            database: "postgres".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    pub ssh: SshPatch,
}

/// Fields left unset keep the cluster-wide value; options are merged by key.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SshPatch {
    pub connect_timeout: Option<u32>,
    pub strict_host_key: Option<String>,
    pub batch_mode: Option<bool>,
    pub options: HashMap<String, String>,
}

impl SshPatch {
    fn apply(&self, ssh: &mut SshSettings) {
        ssh.connect_timeout = self.connect_timeout.unwrap_or(ssh.connect_timeout);
        ssh.batch_mode = self.batch_mode.unwrap_or(ssh.batch_mode);
        if let Some(policy) = &self.strict_host_key {
            ssh.strict_host_key.clone_from(policy);
        }
        ssh.options.extend(
            self.options
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
    }
}

impl ClusterConfig {
    /// Reads `pxf-cluster.yaml` from `dir`; a missing file yields defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ClusterConfig = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Effective ssh settings for `hostname`.
    pub fn ssh_for(&self, hostname: &str) -> SshSettings {
        let mut ssh = self.ssh.clone();
        if let Some(host) = self.hosts.get(hostname) {
            host.ssh.apply(&mut ssh);
        }
        ssh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ClusterConfig::load(dir.path()).unwrap();
        assert_eq!(config.ssh.connect_timeout, 5);
        assert_eq!(config.ssh.strict_host_key, "accept-new");
        assert!(config.ssh.batch_mode);
        assert_eq!(config.psql.database, "postgres");
        assert!(config.hosts.is_empty());
    }

    #[test]
    fn host_overrides_merge_over_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
ssh:
  connect_timeout: 10
  options:
    IdentityFile: /home/gpadmin/.ssh/id_rsa
psql:
  database: template1
hosts:
  sdw2:
    ssh:
      strict_host_key: "no"
      options:
        Port: "2222"
"#,
        )
        .unwrap();

        let config = ClusterConfig::load(dir.path()).unwrap();
        assert_eq!(config.psql.database, "template1");

        let plain = config.ssh_for("sdw1");
        assert_eq!(plain, config.ssh);
        assert_eq!(plain.connect_timeout, 10);
        assert_eq!(plain.strict_host_key, "accept-new");
        assert_eq!(plain.options.len(), 1);

        let sdw2 = config.ssh_for("sdw2");
        assert_eq!(sdw2.connect_timeout, 10);
        assert_eq!(sdw2.strict_host_key, "no");
        assert!(sdw2.batch_mode);
        assert_eq!(
            sdw2.options.get("IdentityFile").map(String::as_str),
            Some("/home/gpadmin/.ssh/id_rsa")
        );
        assert_eq!(sdw2.options.get("Port").map(String::as_str), Some("2222"));
    }

    #[test]
    fn batch_mode_is_on_unless_a_host_opts_out() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "hosts:\n  smdw:\n    ssh:\n      batch_mode: false\n",
        )
        .unwrap();

        let config = ClusterConfig::load(dir.path()).unwrap();
        assert!(config.ssh_for("mdw").batch_mode);
        assert!(!config.ssh_for("smdw").batch_mode);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "ssh: [not, a, map]\n").unwrap();
        let err = ClusterConfig::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
