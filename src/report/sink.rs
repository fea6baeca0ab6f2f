//! Durable destinations for finished reports.
//!
//! A sink stores one named artifact per `put`, replacing whatever was
//! stored under that name before. No append, no versioning.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

/// Errors writing a report artifact
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP error uploading {name}: {source}")]
    Http {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upload of {name} rejected with status {status}")]
    Rejected { name: String, status: u16 },

    #[error("invalid artifact name: {0}")]
    InvalidName(String),
}

/// Artifact store with overwrite-by-name semantics
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Human-readable sink description (for logs)
    fn describe(&self) -> String;

    /// Store `content` under `name`, replacing any previous artifact
    async fn put(&self, name: &str, content: &str) -> Result<(), SinkError>;
}

fn validate_name(name: &str) -> Result<(), SinkError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(SinkError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Writes artifacts as files in a directory.
///
/// Content goes to a temporary file in the same directory first and is
/// then renamed over the target, so a reader sees either the previous
/// artifact or the complete new one. The staging file is removed when it
/// is dropped, on every path that does not persist it.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path an artifact is stored at
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Create an empty staging file next to the artifact
    fn stage(&self, name: &str) -> Result<NamedTempFile, SinkError> {
        tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|source| SinkError::Io {
                path: self.dir.clone(),
                source,
            })
    }
}

#[async_trait]
impl ReportSink for DirectorySink {
    fn describe(&self) -> String {
        format!("directory {}", self.dir.display())
    }

    async fn put(&self, name: &str, content: &str) -> Result<(), SinkError> {
        validate_name(name)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SinkError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let target = self.artifact_path(name);
        let staging = self.stage(name)?;

        fs::write(staging.path(), content)
            .await
            .map_err(|source| SinkError::Io {
                path: staging.path().to_path_buf(),
                source,
            })?;
        staging.persist(&target).map_err(|e| SinkError::Io {
            path: target.clone(),
            source: e.error,
        })?;

        info!(path = %target.display(), bytes = content.len(), "Wrote report");
        Ok(())
    }
}

/// Uploads artifacts with `PUT {base_url}/{name}`
pub struct HttpSink {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpSink {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    pub fn artifact_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

#[async_trait]
impl ReportSink for HttpSink {
    fn describe(&self) -> String {
        format!("endpoint {}", self.base_url)
    }

    async fn put(&self, name: &str, content: &str) -> Result<(), SinkError> {
        validate_name(name)?;

        let url = self.artifact_url(name);
        debug!(%url, bytes = content.len(), "Uploading report");

        let mut request = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(content.to_string());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| SinkError::Http {
            name: name.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }

        info!(%url, bytes = content.len(), "Uploaded report");
        Ok(())
    }
}
