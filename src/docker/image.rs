use serde::{Deserialize, Serialize};

/// A container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DockerImage {
    /// Repository, e.g. `ghcr.io/strangelove-ventures/price-feeder`.
    pub repository: String,
    /// Tag, e.g. `v1.2.0`. Empty means `latest`.
    #[serde(default)]
    pub version: String,
    /// Optional `uid:gid` that files written into volumes should be owned by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid_gid: Option<String>,
}

impl DockerImage {
    /// Image at `repository:version`, with no file owner.
    pub fn new(repository: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            version: version.into(),
            uid_gid: None,
        }
    }

    /// Set the owner for files written on behalf of this image.
    pub fn with_uid_gid(mut self, uid_gid: impl Into<String>) -> Self {
        self.uid_gid = Some(uid_gid.into());
        self
    }

    /// Get the tag, `latest` when no version is set.
    pub fn tag(&self) -> &str {
        if self.version.is_empty() {
            "latest"
        } else {
            &self.version
        }
    }

    /// Full `repository:tag` reference.
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag())
    }

    /// Parsed `(uid, gid)`, if configured and numeric.
    pub fn owner_ids(&self) -> Option<(u64, u64)> {
        let (uid, gid) = self.uid_gid.as_deref()?.split_once(':')?;
        Some((uid.trim().parse().ok()?, gid.trim().parse().ok()?))
    }
}

impl std::fmt::Display for DockerImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag())
    }
}

/// Normalize a declared port to Docker's `<port>/<proto>` form.
pub fn normalize_port(port: &str) -> String {
    let port = port.trim();
    if port.contains('/') {
        port.to_lowercase()
    } else {
        format!("{port}/tcp")
    }
}
