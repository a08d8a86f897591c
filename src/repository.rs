//! Coordinate -> local file resolution against a Maven-layout repository.

use reqwest::blocking::Client;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::Coordinate;

pub const MAVEN_CENTRAL: &str = "https://repo.maven.apache.org/maven2";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

pub trait ArtifactResolver: Send + Sync {
    /// Local file for `coordinate` packaged as `extension` (`jar`, `pom`, ...).
    fn resolve(&self, coordinate: &Coordinate, extension: &str) -> Result<PathBuf>;
}

impl<T: ArtifactResolver + ?Sized> ArtifactResolver for &T {
    fn resolve(&self, coordinate: &Coordinate, extension: &str) -> Result<PathBuf> {
        (**self).resolve(coordinate, extension)
    }
}

/// Repository-relative path, always `/`-separated.
pub fn layout_path(coordinate: &Coordinate, extension: &str) -> String {
    format!(
        "{}/{}/{}/{}-{}.{}",
        coordinate.group_id.replace('.', "/"),
        coordinate.artifact_id,
        coordinate.version,
        coordinate.artifact_id,
        coordinate.version,
        extension
    )
}

/// Local Maven repository with optional remote fallbacks. Files fetched from a
/// remote are written into the local repository so later runs find them.
#[derive(Debug, Clone)]
pub struct MavenRepository {
    local: PathBuf,
    remotes: Vec<String>,
    client: Option<Client>,
}

impl MavenRepository {
    pub fn offline(local: PathBuf) -> Self {
        Self {
            local,
            remotes: Vec::new(),
            client: None,
        }
    }

    pub fn new(local: PathBuf, remotes: Vec<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| Error::Resolution {
                coordinate: "*".to_string(),
                extension: "*".to_string(),
                reason: format!("failed to build http client: {e}"),
            })?;
        Ok(Self {
            local,
            remotes,
            client: Some(client),
        })
    }

    pub fn local(&self) -> &Path {
        &self.local
    }

    fn download(&self, client: &Client, remote: &str, rel: &str, target: &Path) -> Result<(), String> {
        let url = format!("{}/{}", remote.trim_end_matches('/'), rel);
        let response = client.get(&url).send().map_err(|e| format!("{url}: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("{url}: HTTP {}", response.status().as_u16()));
        }
        let body = response.bytes().map_err(|e| format!("{url}: {e}"))?;

        let parent = target
            .parent()
            .ok_or_else(|| format!("{} has no parent directory", target.display()))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;

        // Unique per call: concurrent misses on one coordinate must not share a temp file.
        let mut tmp = NamedTempFile::new_in(parent)
            .map_err(|e| format!("failed to create temp file in {}: {e}", parent.display()))?;
        tmp.write_all(&body)
            .map_err(|e| format!("failed to write {}: {e}", tmp.path().display()))?;
        if let Err(e) = tmp.persist(target) {
            if !target.is_file() {
                return Err(format!("failed to move {} into place: {}", target.display(), e.error));
            }
            debug!(path = %target.display(), "artifact already placed by a concurrent download");
        }

        info!(%url, bytes = body.len(), "downloaded artifact");
        Ok(())
    }
}

impl ArtifactResolver for MavenRepository {
    fn resolve(&self, coordinate: &Coordinate, extension: &str) -> Result<PathBuf> {
        let rel = layout_path(coordinate, extension);
        let path = self.local.join(&rel);
        if path.is_file() {
            return Ok(path);
        }

        let failure = |reason: String| Error::Resolution {
            coordinate: coordinate.to_string(),
            extension: extension.to_string(),
            reason,
        };

        let Some(client) = self.client.as_ref() else {
            return Err(failure(format!(
                "not present in local repository {}",
                self.local.display()
            )));
        };

        let mut reasons = Vec::new();
        for remote in &self.remotes {
            match self.download(client, remote, &rel, &path) {
                Ok(()) => return Ok(path),
                Err(reason) => {
                    debug!(%coordinate, %reason, "remote miss");
                    reasons.push(reason);
                }
            }
        }

        if reasons.is_empty() {
            reasons.push("no remote repositories configured".to_string());
        }
        Err(failure(reasons.join("; ")))
    }
}

/// Memoizes successful resolutions for the lifetime of one run.
pub struct CachingResolver<R> {
    inner: R,
    cache: Mutex<HashMap<(Coordinate, String), PathBuf>>,
}

impl<R: ArtifactResolver> CachingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: ArtifactResolver> ArtifactResolver for CachingResolver<R> {
    fn resolve(&self, coordinate: &Coordinate, extension: &str) -> Result<PathBuf> {
        let key = (coordinate.clone(), extension.to_string());
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(&key).cloned()) {
            return Ok(hit);
        }

        let path = self.inner.resolve(coordinate, extension)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, path.clone());
        }
        Ok(path)
    }
}
