//! Command-line interface for curriculink.
//!
//! Provides commands for checking taxonomy relationships between two
//! resources, exporting the ratings report and inspecting configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{Config, ReportTarget};
use crate::core::RelationshipMatcher;
use crate::domain::{Dimension, ResourceId};

/// curriculink - taxonomy matching and ratings export for the content catalog
#[derive(Parser, Debug)]
#[command(name = "curriculink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .curriculink/config.yaml in this or a parent directory)
    #[arg(short, long, global = true, env = "CURRICULINK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check whether two resources share taxonomy along one dimension
    Shares {
        /// Taxonomy dimension to compare
        #[arg(value_enum)]
        dimension: DimensionArg,

        /// First resource ID
        a: i64,

        /// Second resource ID
        b: i64,
    },

    /// Check two resources along every dimension
    Related {
        /// First resource ID
        a: i64,

        /// Second resource ID
        b: i64,
    },

    /// Export every resource's standard ratings as one report
    Export {
        /// Run selector used to name the report (e.g. a grade)
        #[arg(short, long, default_value = "all")]
        grade: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Taxonomy dimension for CLI (maps to Dimension)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DimensionArg {
    /// Aligned standards
    Standard,

    /// Categories of aligned standards
    Category,

    /// Subjects
    Subject,
}

impl From<DimensionArg> for Dimension {
    fn from(d: DimensionArg) -> Self {
        match d {
            DimensionArg::Standard => Dimension::Standard,
            DimensionArg::Category => Dimension::Category,
            DimensionArg::Subject => Dimension::Subject,
        }
    }
}

fn resource_id(raw: i64) -> Result<ResourceId> {
    if raw <= 0 {
        anyhow::bail!("Resource IDs are positive integers, got {}", raw);
    }
    Ok(ResourceId(raw))
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match self.command {
            Commands::Shares { dimension, a, b } => {
                shares(&config, dimension.into(), a, b).await
            }
            Commands::Related { a, b } => {
                related(&config, a, b).await
            }
            Commands::Export { grade } => {
                export(&config, &grade).await
            }
            Commands::Config => {
                show_config(&config)
            }
        }
    }
}

fn matcher(config: &Config) -> Result<RelationshipMatcher> {
    Ok(RelationshipMatcher::new(Arc::new(config.taxonomy_store()?)))
}

/// Check one dimension
async fn shares(config: &Config, dimension: Dimension, a: i64, b: i64) -> Result<()> {
    let (a, b) = (resource_id(a)?, resource_id(b)?);
    let relation = matcher(config)?.shares(dimension, a, b).await;

    let shared = relation
        .into_result()
        .with_context(|| format!("Couldn't compare {} of {} and {}", dimension, a, b))?;
    println!("{}", shared);
    Ok(())
}

/// Check every dimension
async fn related(config: &Config, a: i64, b: i64) -> Result<()> {
    let (a, b) = (resource_id(a)?, resource_id(b)?);
    let profile = matcher(config)?.profile(a, b).await;

    let mut failed = false;
    for dimension in Dimension::ALL {
        let relation = profile.get(dimension);
        match &relation.error {
            Some(e) => {
                failed = true;
                println!("{:<10} error: {}", dimension, e);
            }
            None => println!("{:<10} {}", dimension, relation.shared),
        }
    }

    if failed {
        anyhow::bail!("Some lookups failed; negative answers above may be incomplete");
    }
    Ok(())
}

/// Run the ratings export
async fn export(config: &Config, grade: &str) -> Result<()> {
    let orchestrator = config.orchestrator()?;

    match orchestrator.export_ratings(grade).await {
        Ok(summary) => {
            println!("Processed: {}", summary.processed);
            println!("Report:    {}", summary.artifact);
            println!("Bytes:     {}", summary.bytes);
            if summary.unresolved > 0 {
                println!("Unresolved fields: {}", summary.unresolved);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Processed before failure: {}", e.processed());
            Err(e).context("Ratings export failed")
        }
    }
}

/// Show resolved configuration
fn show_config(config: &Config) -> Result<()> {
    println!("Configuration:");
    println!(
        "  Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    println!("  Catalog:     {}", config.database.display());
    println!(
        "  Keyspace:    {}",
        config.keyspace_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  Token:       {}",
        if config.keyspace_token.is_some() { "(set)" } else { "(not set)" }
    );
    println!("  Pattern:     {}", config.export.pattern);
    println!("  Page size:   {}", config.export.page_size);
    match &config.report {
        ReportTarget::Directory(dir) => println!("  Reports:     {}", dir.display()),
        ReportTarget::Http { url, .. } => println!("  Reports:     {}", url),
    }
    Ok(())
}
