//! Single-file access to named volumes.
//!
//! Files are moved through a throw-away helper container that mounts the
//! volume but is never started, so reads and writes work whether or not the
//! sidecar's own container exists.

use std::collections::HashMap;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, DownloadFromContainerOptions, RemoveContainerOptions,
    UploadToContainerOptions,
};
use bollard::models::HostConfig;
use bytes::Bytes;
use futures::StreamExt;

use crate::config::SidecarRuntimeConfig;
use crate::docker::engine::ensure_image;
use crate::docker::error::{EngineError, Result};
use crate::docker::image::DockerImage;

/// Where the helper container mounts the volume.
const MOUNT_POINT: &str = "/mnt/dockervolume";

/// Reads and writes single files inside a named volume.
#[async_trait]
pub trait VolumeFiles: Send + Sync {
    /// Write `content` at `rel_path`, creating parent directories and
    /// replacing any existing file. `owner` is an optional `(uid, gid)`.
    async fn write_file(
        &self,
        volume: &str,
        rel_path: &str,
        content: &[u8],
        owner: Option<(u64, u64)>,
    ) -> Result<()>;

    /// Full content of the single file at `rel_path`.
    async fn single_file_content(&self, volume: &str, rel_path: &str) -> Result<Vec<u8>>;
}

/// Normalize a volume-relative path to `a/b/c` form.
///
/// Rejects absolute paths and any `..` component.
pub fn volume_path(rel_path: &str) -> Result<String> {
    let invalid = |reason: &str| EngineError::InvalidPath {
        path: rel_path.to_string(),
        reason: reason.to_string(),
    };

    if rel_path.starts_with('/') {
        return Err(invalid("must be relative to the volume root"));
    }

    let mut parts = Vec::new();
    for part in rel_path.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(invalid("must not contain '..'")),
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return Err(invalid("must name a file"));
    }
    Ok(parts.join("/"))
}

/// Build a tar archive placing `content` at `<mount>/<rel_path>` with every
/// parent directory present.
pub(crate) fn build_archive(
    rel_path: &str,
    content: &[u8],
    owner: Option<(u64, u64)>,
) -> Result<Vec<u8>> {
    let archive_err = |e: std::io::Error| EngineError::Archive {
        path: rel_path.to_string(),
        reason: e.to_string(),
    };

    let rel = volume_path(rel_path)?;
    let root = MOUNT_POINT.trim_start_matches('/');
    let mtime = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut builder = tar::Builder::new(Vec::new());

    let segments: Vec<&str> = rel.split('/').collect();
    let mut dir = root.to_string();
    for segment in &segments[..segments.len() - 1] {
        dir = format!("{dir}/{segment}");
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Directory);
        header.set_mode(0o755);
        header.set_size(0);
        header.set_mtime(mtime);
        if let Some((uid, gid)) = owner {
            header.set_uid(uid);
            header.set_gid(gid);
        }
        builder
            .append_data(&mut header, format!("{dir}/"), std::io::empty())
            .map_err(archive_err)?;
    }

    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(content.len() as u64);
    header.set_mtime(mtime);
    if let Some((uid, gid)) = owner {
        header.set_uid(uid);
        header.set_gid(gid);
    }
    builder
        .append_data(&mut header, format!("{root}/{rel}"), content)
        .map_err(archive_err)?;

    builder.into_inner().map_err(archive_err)
}

/// Pull the first entry out of an archive returned by the daemon, which must
/// be a regular file.
pub(crate) fn extract_single_file(archive: &[u8], rel_path: &str) -> Result<Vec<u8>> {
    let archive_err = |reason: String| EngineError::Archive {
        path: rel_path.to_string(),
        reason,
    };

    let mut archive = tar::Archive::new(archive);
    let mut entries = archive.entries().map_err(|e| archive_err(e.to_string()))?;
    let mut entry = match entries.next() {
        Some(entry) => entry.map_err(|e| archive_err(e.to_string()))?,
        None => return Err(archive_err("empty archive".to_string())),
    };

    if !entry.header().entry_type().is_file() {
        return Err(archive_err("not a regular file".to_string()));
    }

    let mut content = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut content)
        .map_err(|e| archive_err(e.to_string()))?;
    Ok(content)
}

/// bollard-backed [`VolumeFiles`].
#[derive(Clone)]
pub struct DockerVolumeFiles {
    docker: Docker,
    helper_image: DockerImage,
    auto_pull: bool,
    labels: HashMap<String, String>,
}

impl DockerVolumeFiles {
    pub fn new(docker: Docker, config: &SidecarRuntimeConfig) -> Self {
        let (repository, version) = match config.helper_image.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => (repo.to_string(), tag.to_string()),
            _ => (config.helper_image.clone(), String::new()),
        };
        Self {
            docker,
            helper_image: DockerImage::new(repository, version),
            auto_pull: config.auto_pull,
            labels: HashMap::new(),
        }
    }

    /// Labels attached to helper containers, so leftovers can be found by
    /// test-run cleanup.
    pub fn with_labels(mut self, labels: HashMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// Create an unstarted helper container with `volume` mounted.
    async fn create_helper(&self, volume: &str) -> Result<String> {
        ensure_image(&self.docker, &self.helper_image, self.auto_pull).await?;

        let name = format!("sidecar-fs-{}", uuid::Uuid::new_v4().simple());
        let config = Config {
            image: Some(self.helper_image.reference()),
            labels: if self.labels.is_empty() {
                None
            } else {
                Some(self.labels.clone())
            },
            host_config: Some(HostConfig {
                binds: Some(vec![format!("{}:{}", volume, MOUNT_POINT)]),
                auto_remove: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        self.docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    ..Default::default()
                }),
                config,
            )
            .await
            .map_err(|e| EngineError::from_docker(&name, e))?;

        Ok(name)
    }

    async fn remove_helper(&self, name: &str) {
        if let Err(e) = self
            .docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            tracing::warn!("Failed to remove volume helper container {}: {}", name, e);
        }
    }

    async fn upload(&self, helper: &str, archive: Vec<u8>) -> Result<()> {
        self.docker
            .upload_to_container(
                helper,
                Some(UploadToContainerOptions {
                    path: "/".to_string(),
                    ..Default::default()
                }),
                Bytes::from(archive),
            )
            .await
            .map_err(|e| EngineError::from_docker(helper, e))
    }

    async fn download(&self, helper: &str, volume: &str, rel: &str) -> Result<Vec<u8>> {
        let stream = self.docker.download_from_container(
            helper,
            Some(DownloadFromContainerOptions {
                path: format!("{}/{}", MOUNT_POINT, rel),
            }),
        );
        let mut stream = std::pin::pin!(stream);

        let mut archive = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => archive.extend_from_slice(&bytes),
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                }) => {
                    return Err(EngineError::FileNotFound {
                        volume: volume.to_string(),
                        path: rel.to_string(),
                    });
                }
                Err(e) => return Err(EngineError::Docker(e)),
            }
        }

        extract_single_file(&archive, rel)
    }
}

#[async_trait]
impl VolumeFiles for DockerVolumeFiles {
    async fn write_file(
        &self,
        volume: &str,
        rel_path: &str,
        content: &[u8],
        owner: Option<(u64, u64)>,
    ) -> Result<()> {
        let archive = build_archive(rel_path, content, owner)?;
        let helper = self.create_helper(volume).await?;

        let result = self.upload(&helper, archive).await;
        self.remove_helper(&helper).await;
        result?;

        tracing::debug!(volume = %volume, path = %rel_path, bytes = content.len(), "Wrote volume file");
        Ok(())
    }

    async fn single_file_content(&self, volume: &str, rel_path: &str) -> Result<Vec<u8>> {
        let rel = volume_path(rel_path)?;
        let helper = self.create_helper(volume).await?;

        let result = self.download(&helper, volume, &rel).await;
        self.remove_helper(&helper).await;
        result
    }
}
