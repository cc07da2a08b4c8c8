use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sidecar::{OwnerRef, SidecarConfig};

/// A test run's sidecars, as declared in a TOML manifest.
///
/// ```toml
/// chain_id = "chain-1"
/// test_name = "TestOracle"
/// validators = 2
/// network = "oracle-net"
///
/// [[sidecars]]
/// process_name = "oracle"
/// image = { repository = "ghcr.io/acme/oracle", version = "v1", uid_gid = "1025:1025" }
/// ports = ["7171"]
/// start_cmd = ["oracle", "start"]
/// pre_start = true
/// validator_process = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarManifest {
    pub chain_id: String,
    pub test_name: String,
    /// Number of validators; validator sidecars get one instance each.
    #[serde(default)]
    pub validators: usize,
    /// User-defined network to create and join. Unset uses the daemon default.
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub sidecars: Vec<SidecarConfig>,
}

impl SidecarManifest {
    /// Read and validate a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&raw, &path.display().to_string())
    }

    /// Parse and validate manifest text.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Self::parse(raw, "<inline>")
    }

    fn parse(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        let manifest: Self = toml::from_str(raw).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            source: e,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id.trim().is_empty() {
            return Err(invalid("chain_id", "must not be empty"));
        }
        if self.test_name.trim().is_empty() {
            return Err(invalid("test_name", "must not be empty"));
        }
        if matches!(&self.network, Some(n) if n.trim().is_empty()) {
            return Err(invalid("network", "must not be empty when set"));
        }

        for (i, sidecar) in self.sidecars.iter().enumerate() {
            if sidecar.process_name.trim().is_empty() {
                return Err(invalid(
                    &format!("sidecars[{i}].process_name"),
                    "must not be empty",
                ));
            }
            if sidecar.image.repository.trim().is_empty() {
                return Err(invalid(
                    &format!("sidecars[{i}].image.repository"),
                    "must not be empty",
                ));
            }
            if let Some(home) = &sidecar.home_dir
                && !home.starts_with('/')
            {
                return Err(invalid(
                    &format!("sidecars[{i}].home_dir"),
                    "must be an absolute container path",
                ));
            }
        }
        Ok(())
    }

    /// Owner used to name and label every sidecar of the run.
    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(&self.chain_id, &self.test_name)
    }

    /// Network id passed to containers. Empty means the daemon default.
    pub fn network_id(&self) -> &str {
        self.network.as_deref().unwrap_or("")
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
chain_id = "chain-1"
test_name = "TestOracle"
validators = 2

[[sidecars]]
process_name = "oracle"
image = { repository = "ghcr.io/acme/oracle", version = "v1", uid_gid = "1025:1025" }
ports = ["7171"]
pre_start = true
validator_process = true

[sidecars.env]
ORACLE_LOG = "debug"

[[sidecars]]
process_name = "price-feed"
image = { repository = "acme/feed" }
"#;

    #[test]
    fn test_parse_defaults() {
        let manifest = SidecarManifest::from_toml_str(MANIFEST).unwrap();

        assert_eq!(manifest.owner(), OwnerRef::new("chain-1", "TestOracle"));
        assert_eq!(manifest.network_id(), "");
        assert_eq!(manifest.sidecars.len(), 2);

        let oracle = &manifest.sidecars[0];
        assert!(oracle.validator_process);
        assert_eq!(oracle.env_pairs(), vec!["ORACLE_LOG=debug"]);
        assert_eq!(oracle.image.owner_ids(), Some((1025, 1025)));

        let feed = &manifest.sidecars[1];
        assert!(!feed.pre_start);
        assert_eq!(feed.image.tag(), "latest");
        assert!(feed.start_cmd.is_empty());
    }

    #[test]
    fn test_rejects_empty_chain_id() {
        let err = SidecarManifest::from_toml_str("chain_id = \"\"\ntest_name = \"T\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "chain_id"));
    }

    #[test]
    fn test_rejects_relative_home_dir() {
        let raw = r#"
chain_id = "c"
test_name = "T"

[[sidecars]]
process_name = "oracle"
image = { repository = "acme/oracle" }
home_dir = "oracle"
"#;
        let err = SidecarManifest::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("sidecars[0].home_dir"));
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = SidecarManifest::from_toml_str("chain_id = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("<inline>"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SidecarManifest::load(dir.path().join("sidecars.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
