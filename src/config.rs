//! Configuration for curriculink.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CURRICULINK_DATABASE, CURRICULINK_KV_URL, ...)
//! 2. Config file (explicit path, or .curriculink/config.yaml)
//! 3. Defaults (~/.curriculink/catalog.db, ./reports)
//!
//! Config file discovery:
//! - Searches current directory and parents for .curriculink/config.yaml
//! - Paths in config file are relative to the project root (the parent of .curriculink/)
//!
//! Environment is read only here, at load time. The resulting [`Config`] is
//! passed explicitly to whatever needs it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::{ExportSettings, Orchestrator, DEFAULT_PAGE_SIZE, DEFAULT_PATTERN};
use crate::keyspace::RestKeyspace;
use crate::report::{DirectorySink, HttpSink, ReportSink};
use crate::store::SqliteTaxonomyStore;

pub const ENV_DATABASE: &str = "CURRICULINK_DATABASE";
pub const ENV_KV_URL: &str = "CURRICULINK_KV_URL";
pub const ENV_KV_TOKEN: &str = "CURRICULINK_KV_TOKEN";
pub const ENV_REPORT_DIR: &str = "CURRICULINK_REPORT_DIR";
pub const ENV_REPORT_URL: &str = "CURRICULINK_REPORT_URL";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    #[serde(default)]
    pub keyspace: KeyspaceConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonomyConfig {
    /// SQLite catalog database (relative to the project root)
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyspaceConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub pattern: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// Local directory for report files
    pub directory: Option<String>,
    /// HTTP endpoint reports are PUT to
    pub url: Option<String>,
    pub token: Option<String>,
}

/// Where finished reports go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportTarget {
    Directory(PathBuf),
    Http { url: String, token: Option<String> },
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path to the catalog database
    pub database: PathBuf,
    /// Keyspace REST endpoint
    pub keyspace_url: Option<String>,
    /// Opaque keyspace token
    pub keyspace_token: Option<String>,
    /// Scan pattern and page size
    pub export: ExportSettings,
    /// Report destination
    pub report: ReportTarget,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(".curriculink").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load from an explicit file, or discover one from the current directory
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let cwd = std::env::current_dir().context("Failed to determine current directory")?;
                find_config_file(&cwd)
            }
        };

        let file = match &config_file {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        Self::resolve(file, config_file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with environment overrides and defaults
    pub fn resolve(
        file: ConfigFile,
        config_file: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        // Relative paths are anchored at the parent of .curriculink/
        let base_dir = match &config_file {
            Some(path) => {
                let dir = path.parent().unwrap_or(Path::new("."));
                if dir.file_name().map(|n| n == ".curriculink").unwrap_or(false) {
                    dir.parent().unwrap_or(Path::new(".")).to_path_buf()
                } else {
                    dir.to_path_buf()
                }
            }
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };

        let database = if let Some(db) = non_empty(env(ENV_DATABASE)) {
            PathBuf::from(db)
        } else if let Some(db) = non_empty(file.taxonomy.database) {
            resolve_path(&base_dir, &db)
        } else {
            dirs::home_dir()
                .context("Failed to determine home directory")?
                .join(".curriculink")
                .join("catalog.db")
        };

        let keyspace_url = non_empty(env(ENV_KV_URL)).or(non_empty(file.keyspace.url));
        let keyspace_token = non_empty(env(ENV_KV_TOKEN)).or(non_empty(file.keyspace.token));

        let export = ExportSettings {
            pattern: file
                .keyspace
                .pattern
                .unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
            page_size: file.keyspace.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };

        let env_dir = non_empty(env(ENV_REPORT_DIR));
        let env_url = non_empty(env(ENV_REPORT_URL));
        let report = match (env_dir, env_url) {
            (Some(_), Some(_)) => {
                anyhow::bail!("Set only one of {} and {}", ENV_REPORT_DIR, ENV_REPORT_URL)
            }
            (Some(dir), None) => ReportTarget::Directory(PathBuf::from(dir)),
            (None, Some(url)) => ReportTarget::Http {
                url,
                token: non_empty(file.report.token),
            },
            (None, None) => match (non_empty(file.report.directory), non_empty(file.report.url)) {
                (Some(_), Some(_)) => {
                    anyhow::bail!("report.directory and report.url are mutually exclusive")
                }
                (None, Some(url)) => ReportTarget::Http {
                    url,
                    token: non_empty(file.report.token),
                },
                (Some(dir), None) => ReportTarget::Directory(resolve_path(&base_dir, &dir)),
                (None, None) => ReportTarget::Directory(base_dir.join("reports")),
            },
        };

        let config = Self {
            database,
            keyspace_url,
            keyspace_token,
            export,
            report,
            config_file,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.export.page_size == 0 {
            anyhow::bail!("keyspace.page_size must be greater than zero");
        }
        if self.export.pattern.trim().is_empty() {
            anyhow::bail!("keyspace.pattern cannot be empty");
        }
        Ok(())
    }

    /// Open the catalog database
    pub fn taxonomy_store(&self) -> Result<SqliteTaxonomyStore> {
        if !self.database.exists() {
            anyhow::bail!("Catalog database not found: {}", self.database.display());
        }
        SqliteTaxonomyStore::open(&self.database)
            .with_context(|| format!("Failed to open catalog: {}", self.database.display()))
    }

    /// Client for the ratings keyspace
    pub fn keyspace_client(&self) -> Result<RestKeyspace> {
        let url = self
            .keyspace_url
            .clone()
            .with_context(|| {
                format!("No keyspace URL configured (set keyspace.url or {})", ENV_KV_URL)
            })?;
        Ok(RestKeyspace::new(url, self.keyspace_token.clone()))
    }

    pub fn report_sink(&self) -> Arc<dyn ReportSink> {
        match &self.report {
            ReportTarget::Directory(dir) => Arc::new(DirectorySink::new(dir.clone())),
            ReportTarget::Http { url, token } => {
                Arc::new(HttpSink::new(url.clone(), token.clone()))
            }
        }
    }

    /// Wire an orchestrator from this configuration
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        Ok(Orchestrator::new(
            Arc::new(self.taxonomy_store()?),
            Arc::new(self.keyspace_client()?),
            self.report_sink(),
            self.export.clone(),
        ))
    }
}
