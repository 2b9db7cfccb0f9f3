//! `ironpost vulns` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ironpost_core::config::IronpostConfig;
use ironpost_core::types::{IndexRecord, Vulnerability};
use ironpost_vulnstore::{GetOpts, VulnMap, VulnStore, VulnStoreConfig};

use crate::cli::{VulnsAction, VulnsArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `vulns` command.
pub async fn execute(
    args: VulnsArgs,
    config_path: &Path,
    writer: &OutputWriter,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let config = IronpostConfig::load(config_path).await?;
    let store = open_store(&config).await?;

    match args.action {
        VulnsAction::Load { file } => execute_load(&store, &file, writer, cancel).await,
        VulnsAction::Get { file, matchers } => {
            execute_get(&store, &file, &matchers, writer, cancel).await
        }
    }
}

/// Open the vulnerability store described by the `[vuln]` section.
pub async fn open_store(config: &IronpostConfig) -> Result<VulnStore, CliError> {
    let store_config = VulnStoreConfig::from_core(&config.vuln)?;
    Ok(VulnStore::open(store_config).await?)
}

/// Read a JSON input file into `T`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| CliError::Input {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

async fn execute_load(
    store: &VulnStore,
    file: &Path,
    writer: &OutputWriter,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let vulns: Vec<Vulnerability> = read_json(file).await?;
    info!(path = %file.display(), count = vulns.len(), "loading vulnerabilities");

    let inserted = store.load(vulns, cancel).await?;
    let total = store.count(cancel).await?;

    writer.render(&LoadReport {
        source: file.display().to_string(),
        db_path: store.config().db_path.clone(),
        inserted,
        total,
    })?;
    Ok(())
}

async fn execute_get(
    store: &VulnStore,
    file: &Path,
    matchers: &[String],
    writer: &OutputWriter,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let opts = if matchers.is_empty() {
        GetOpts::from_config(store.config())
    } else {
        GetOpts::from_names(matchers)?
    };
    let records: Vec<IndexRecord> = read_json(file).await?;
    info!(path = %file.display(), records = records.len(), "matching index records");

    let mapping = store.get(&records, &opts, cancel).await?;
    writer.render(&MatchReport::new(records.len(), &opts, mapping))?;
    Ok(())
}

/// Result of `vulns load`.
#[derive(Serialize)]
pub struct LoadReport {
    /// Input file
    pub source: String,
    /// Database file
    pub db_path: String,
    /// Rows inserted by this run
    pub inserted: usize,
    /// Rows in the store after the run
    pub total: u64,
}

impl Render for LoadReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Vulnerability Load: {}", self.source.bold())?;
        writeln!(w, "  Database: {}", self.db_path)?;
        writeln!(w, "  Inserted: {}", self.inserted.to_string().green())?;
        writeln!(w, "  Total:    {}", self.total)?;
        Ok(())
    }
}

/// Result of a match run, keyed by package identity.
#[derive(Serialize)]
pub struct MatchReport {
    /// Number of records submitted
    pub records: usize,
    /// Matchers in effect (canonical order)
    pub matchers: Vec<String>,
    /// Matched vulnerabilities per package id, ascending
    pub packages: BTreeMap<i64, Vec<Vulnerability>>,
}

impl MatchReport {
    pub fn new(records: usize, opts: &GetOpts, mapping: VulnMap) -> Self {
        let mut matchers: Vec<_> = opts.matchers.clone();
        matchers.sort();
        matchers.dedup();
        Self {
            records,
            matchers: matchers.iter().map(|m| m.as_str().to_owned()).collect(),
            packages: mapping.into_iter().collect(),
        }
    }

    fn total(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }
}

impl Render for MatchReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let matchers = if self.matchers.is_empty() {
            "(package name only)".to_owned()
        } else {
            self.matchers.join(", ")
        };
        writeln!(w, "Matchers: {}", matchers)?;
        writeln!(
            w,
            "Records: {}  Packages affected: {}  Vulnerabilities: {}",
            self.records,
            self.packages.len(),
            self.total()
        )?;

        if self.packages.is_empty() {
            writeln!(w, "{}", "No vulnerabilities found.".green())?;
            return Ok(());
        }

        writeln!(w)?;
        writeln!(
            w,
            "{:<10} {:<20} {:<20} {:<12} {:<15}",
            "PKG ID", "VULNERABILITY", "PACKAGE", "SEVERITY", "FIXED IN"
        )?;
        writeln!(w, "{}", "-".repeat(80))?;
        for (id, vulns) in &self.packages {
            for v in vulns {
                let fixed = if v.fixed_in_version.is_empty() {
                    "-"
                } else {
                    v.fixed_in_version.as_str()
                };
                writeln!(
                    w,
                    "{:<10} {:<20} {:<20} {:<12} {:<15}",
                    id,
                    v.name,
                    v.package.name,
                    v.severity.yellow(),
                    fixed
                )?;
            }
        }
        Ok(())
    }
}
