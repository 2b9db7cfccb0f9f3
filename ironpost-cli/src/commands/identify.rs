//! `ironpost identify` command handler

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ironpost_core::config::{IndexerConfig, IronpostConfig};
use ironpost_core::types::{Distribution, Package, Vulnerability};
use ironpost_indexer::{IndexerOptions, Layer, LayerReport, default_controller_factory};
use ironpost_vulnstore::GetOpts;

use crate::cli::IdentifyArgs;
use crate::commands::vulns::{open_store, read_json};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `identify` command.
pub async fn execute(
    args: IdentifyArgs,
    config_path: &Path,
    writer: &OutputWriter,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let config = IronpostConfig::load(config_path).await?;
    ensure_enabled(&config.indexer)?;

    // 패키지 목록이 있을 때만 저장소가 필요
    let store = match args.packages {
        Some(_) => Some(open_store(&config).await?),
        None => None,
    };
    let opts = IndexerOptions::from_config(&config.indexer, store)?;
    let controller = default_controller_factory(&opts)?;

    let layers = to_layers(&args.layers);
    info!(layers = layers.len(), "identifying layer distributions");
    let reports = controller.index(&layers, cancel).await?;

    let mut report = IdentifyReport::new(&args.layers, reports);

    if let (Some(path), Some(store)) = (args.packages.as_deref(), controller.store()) {
        let packages: Vec<Package> = read_json(path).await?;
        let records = controller.records(&packages, &report.reports);
        let get_opts = GetOpts::from_config(store.config());
        let mapping = controller.vulnerabilities(&records, &get_opts, cancel).await?;
        report.packages = Some(packages.len());
        report.vulnerabilities = Some(mapping.into_iter().collect());
    }

    writer.render(&report)?;
    Ok(())
}

fn ensure_enabled(indexer: &IndexerConfig) -> Result<(), CliError> {
    if !indexer.enabled {
        return Err(CliError::Config(
            "indexer is disabled (set [indexer] enabled = true)".to_owned(),
        ));
    }
    Ok(())
}

/// 레이어 디렉토리를 레이어로 변환합니다. 다이제스트는 디렉토리 이름입니다.
fn to_layers(dirs: &[PathBuf]) -> Vec<Layer> {
    dirs.iter()
        .enumerate()
        .map(|(i, dir)| {
            let digest = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("layer-{i}"));
            Layer::new(digest, dir)
        })
        .collect()
}

/// Result of `identify`.
#[derive(Serialize)]
pub struct IdentifyReport {
    /// Per-layer results, bottom layer first
    pub layers: Vec<LayerEntry>,
    /// Distribution of the image (topmost identified layer)
    pub distribution: Option<Distribution>,
    /// Number of packages matched, when `--packages` is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages: Option<usize>,
    /// Matched vulnerabilities per package id, when `--packages` is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<BTreeMap<i64, Vec<Vulnerability>>>,
    #[serde(skip)]
    reports: Vec<LayerReport>,
}

/// One layer in an [`IdentifyReport`].
#[derive(Serialize)]
pub struct LayerEntry {
    pub digest: String,
    pub path: String,
    pub distributions: Vec<Distribution>,
}

impl IdentifyReport {
    fn new(dirs: &[PathBuf], reports: Vec<LayerReport>) -> Self {
        let layers = dirs
            .iter()
            .zip(&reports)
            .map(|(dir, r)| LayerEntry {
                digest: r.digest.clone(),
                path: dir.display().to_string(),
                distributions: r.distributions.clone(),
            })
            .collect();
        let distribution = reports
            .iter()
            .rev()
            .find_map(|r| r.distributions.first())
            .cloned();

        Self {
            layers,
            distribution,
            packages: None,
            vulnerabilities: None,
            reports,
        }
    }
}

impl Render for IdentifyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        match &self.distribution {
            Some(dist) => writeln!(w, "Distribution: {}", dist.to_string().bold())?,
            None => writeln!(w, "Distribution: {}", "unknown".yellow())?,
        }
        writeln!(w)?;
        writeln!(w, "{:<24} {:<40} {}", "LAYER", "PATH", "DETECTED")?;
        writeln!(w, "{}", "-".repeat(80))?;
        for layer in &self.layers {
            let detected = if layer.distributions.is_empty() {
                "-".to_owned()
            } else {
                layer
                    .distributions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            writeln!(w, "{:<24} {:<40} {}", layer.digest, layer.path, detected)?;
        }

        if let (Some(packages), Some(vulns)) = (self.packages, &self.vulnerabilities) {
            let total: usize = vulns.values().map(Vec::len).sum();
            writeln!(w)?;
            writeln!(
                w,
                "Packages: {}  Affected: {}  Vulnerabilities: {}",
                packages,
                vulns.len(),
                total
            )?;
            for (id, list) in vulns {
                for v in list {
                    writeln!(w, "  [{}] {} {} ({})", id, v.name.red(), v.package.name, v.severity)?;
                }
            }
        }
        Ok(())
    }
}
