//! 인덱싱 컨트롤러
//!
//! [`LayerScanner`]는 등록된 배포판 스캐너를 레이어마다 실행하며, 동시에
//! 스캔하는 레이어 수를 세마포어로 제한합니다. [`Controller`]는 스캔 결과를
//! 패키지와 결합하여 [`IndexRecord`]를 만들고 취약점 저장소에 조회를 위임합니다.
//!
//! # 흐름
//!
//! ```text
//! layers -> LayerScanner::scan -> Vec<LayerReport>
//!                                      |
//! packages ---------------------> Controller::records -> Vec<IndexRecord>
//!                                                              |
//!                                   Controller::vulnerabilities -> VulnMap
//! ```

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ironpost_core::metrics as m;
use ironpost_core::types::{Distribution, IndexRecord, Package, Repository};
use ironpost_vulnstore::{GetOpts, VulnMap, VulnStore};

use crate::error::IndexerError;
use crate::layer::Layer;
use crate::scanner::DistributionScanner;

/// 레이어 하나의 스캔 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    /// 레이어 다이제스트
    pub digest: String,
    /// 식별된 배포판 (스캐너 등록 순서)
    pub distributions: Vec<Distribution>,
}

/// 동시성 제한이 있는 레이어 스캐너
#[derive(Clone)]
pub struct LayerScanner {
    scanners: Arc<[Arc<dyn DistributionScanner>]>,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl LayerScanner {
    /// 새 레이어 스캐너를 생성합니다. `concurrency`는 1 이상이어야 합니다.
    pub fn new(
        scanners: Vec<Arc<dyn DistributionScanner>>,
        concurrency: usize,
    ) -> Result<Self, IndexerError> {
        if concurrency == 0 {
            return Err(IndexerError::Config {
                field: "layer_scan_concurrency".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(Self {
            scanners: scanners.into(),
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        })
    }

    /// 동시 스캔 한도
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 등록된 스캐너 이름 목록
    pub fn scanner_names(&self) -> Vec<&'static str> {
        self.scanners.iter().map(|s| s.name()).collect()
    }

    /// 모든 레이어를 스캔합니다. 결과는 입력 레이어 순서입니다.
    ///
    /// 한 레이어라도 실패하면 남은 작업을 중단하고 에러를 반환합니다.
    pub async fn scan(
        &self,
        layers: &[Layer],
        cancel: &CancellationToken,
    ) -> Result<Vec<LayerReport>, IndexerError> {
        let mut tasks = JoinSet::new();

        for (idx, layer) in layers.iter().cloned().enumerate() {
            let scanners = Arc::clone(&self.scanners);
            let permits = Arc::clone(&self.permits);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(IndexerError::Cancelled),
                    permit = permits.acquire_owned() => permit
                        .map_err(|e| IndexerError::Task(format!("semaphore closed: {e}")))?,
                };

                let report = tokio::task::spawn_blocking(move || scan_layer(&scanners, &layer))
                    .await
                    .map_err(|e| IndexerError::Task(format!("spawn_blocking failed: {e}")))??;
                Ok((idx, report))
            });
        }

        let mut slots: Vec<Option<LayerReport>> = vec![None; layers.len()];
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| IndexerError::Task(format!("join failed: {e}")));
            match result.and_then(|r| r) {
                Ok((idx, report)) => slots[idx] = Some(report),
                Err(e) => {
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        slots
            .into_iter()
            .map(|slot| slot.ok_or_else(|| IndexerError::Task("layer scan result missing".to_owned())))
            .collect()
    }
}

/// 한 레이어에 모든 스캐너를 실행합니다 (blocking).
fn scan_layer(
    scanners: &[Arc<dyn DistributionScanner>],
    layer: &Layer,
) -> Result<LayerReport, IndexerError> {
    let started = Instant::now();
    let mut distributions = Vec::new();

    for scanner in scanners {
        match scanner.identify(layer)? {
            Some(dist) => {
                metrics::counter!(m::INDEXER_DISTRIBUTIONS_FOUND_TOTAL, m::LABEL_SCANNER => scanner.name())
                    .increment(1);
                distributions.push(dist);
            }
            None => debug!(scanner = scanner.name(), layer = %layer.digest, "no distribution"),
        }
    }

    metrics::counter!(m::INDEXER_LAYERS_SCANNED_TOTAL).increment(1);
    metrics::histogram!(m::INDEXER_LAYER_SCAN_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());

    Ok(LayerReport {
        digest: layer.digest.clone(),
        distributions,
    })
}

/// 인덱싱 컨트롤러
pub struct Controller {
    layer_scanner: LayerScanner,
    store: Option<VulnStore>,
}

impl Controller {
    /// 새 컨트롤러를 생성합니다.
    pub fn new(layer_scanner: LayerScanner, store: Option<VulnStore>) -> Self {
        Self {
            layer_scanner,
            store,
        }
    }

    /// 레이어 스캐너
    pub fn layer_scanner(&self) -> &LayerScanner {
        &self.layer_scanner
    }

    /// 연결된 취약점 저장소
    pub fn store(&self) -> Option<&VulnStore> {
        self.store.as_ref()
    }

    /// 레이어별 배포판을 식별합니다.
    pub async fn index(
        &self,
        layers: &[Layer],
        cancel: &CancellationToken,
    ) -> Result<Vec<LayerReport>, IndexerError> {
        let reports = self.layer_scanner.scan(layers, cancel).await?;
        let found = reports.iter().filter(|r| !r.distributions.is_empty()).count();
        info!(
            layers = layers.len(),
            layers_with_distribution = found,
            concurrency = self.layer_scanner.concurrency(),
            "layer indexing complete"
        );
        Ok(reports)
    }

    /// 패키지와 식별된 배포판을 결합하여 인덱스 레코드를 만듭니다.
    ///
    /// 배포판은 배포판이 식별된 가장 위(마지막) 레이어의 첫 번째 결과를
    /// 사용합니다. 식별된 배포판이 없으면 빈 배포판입니다.
    pub fn records(&self, packages: &[Package], reports: &[LayerReport]) -> Vec<IndexRecord> {
        let distribution = reports
            .iter()
            .rev()
            .find_map(|r| r.distributions.first())
            .cloned()
            .unwrap_or_default();

        if distribution == Distribution::default() && !packages.is_empty() {
            warn!(packages = packages.len(), "no distribution identified for packages");
        }

        packages
            .iter()
            .map(|package| IndexRecord {
                package: package.clone(),
                distribution: distribution.clone(),
                repository: Repository::default(),
            })
            .collect()
    }

    /// 인덱스 레코드에 적용되는 취약점을 조회합니다.
    pub async fn vulnerabilities(
        &self,
        records: &[IndexRecord],
        opts: &GetOpts,
        cancel: &CancellationToken,
    ) -> Result<VulnMap, IndexerError> {
        let store = self.store.as_ref().ok_or(IndexerError::NoStore)?;
        Ok(store.get(records, opts, cancel).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::scanner::{ScanOutcome, VersionedScanner};

    /// 동시 실행 수를 기록하는 테스트용 스캐너
    struct CountingScanner {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl CountingScanner {
        fn new() -> Self {
            Self {
                current: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl VersionedScanner for CountingScanner {
        fn name(&self) -> &'static str {
            "counting"
        }
        fn version(&self) -> &'static str {
            "v0"
        }
        fn kind(&self) -> &'static str {
            "distribution"
        }
    }

    impl DistributionScanner for CountingScanner {
        fn scan(&self, layer: &Layer) -> Result<ScanOutcome, IndexerError> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(ScanOutcome::Found(Distribution {
                did: "test".to_owned(),
                version_id: layer.digest.clone(),
                ..Default::default()
            }))
        }
    }

    struct FailingScanner;

    impl VersionedScanner for FailingScanner {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn version(&self) -> &'static str {
            "v0"
        }
        fn kind(&self) -> &'static str {
            "distribution"
        }
    }

    impl DistributionScanner for FailingScanner {
        fn scan(&self, _layer: &Layer) -> Result<ScanOutcome, IndexerError> {
            Err(IndexerError::Scanner {
                scanner: "failing".to_owned(),
                reason: "boom".to_owned(),
            })
        }
    }

    fn layers(n: usize) -> Vec<Layer> {
        (0..n)
            .map(|i| Layer::new(format!("sha256:{i}"), "/nonexistent"))
            .collect()
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let result = LayerScanner::new(Vec::new(), 0);
        assert!(matches!(result, Err(IndexerError::Config { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn scan_respects_concurrency_limit() {
        let counting = Arc::new(CountingScanner::new());
        let scanner = LayerScanner::new(vec![counting.clone() as Arc<dyn DistributionScanner>], 2).unwrap();

        let reports = scanner
            .scan(&layers(8), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reports.len(), 8);
        assert!(counting.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn reports_follow_input_order() {
        let scanner = LayerScanner::new(vec![Arc::new(CountingScanner::new()) as Arc<dyn DistributionScanner>], 3).unwrap();
        let reports = scanner
            .scan(&layers(5), &CancellationToken::new())
            .await
            .unwrap();

        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.digest, format!("sha256:{i}"));
            assert_eq!(report.distributions[0].version_id, format!("sha256:{i}"));
        }
    }

    #[tokio::test]
    async fn scanner_failure_aborts_scan() {
        let scanner = LayerScanner::new(vec![Arc::new(FailingScanner) as Arc<dyn DistributionScanner>], 2).unwrap();
        let err = scanner
            .scan(&layers(3), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::Scanner { .. }));
    }

    #[tokio::test]
    async fn cancelled_scan_returns_cancelled() {
        let scanner = LayerScanner::new(vec![Arc::new(CountingScanner::new()) as Arc<dyn DistributionScanner>], 1).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = scanner.scan(&layers(2), &cancel).await.unwrap_err();
        assert!(matches!(err, IndexerError::Cancelled));
    }

    #[tokio::test]
    async fn empty_layers_yield_empty_reports() {
        let scanner = LayerScanner::new(Vec::new(), 1).unwrap();
        let reports = scanner.scan(&[], &CancellationToken::new()).await.unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn records_use_topmost_identified_distribution() {
        let controller = Controller::new(LayerScanner::new(Vec::new(), 1).unwrap(), None);
        let base = Distribution {
            did: "rhel".to_owned(),
            version_id: "7".to_owned(),
            ..Default::default()
        };
        let upper = Distribution {
            did: "rhel".to_owned(),
            version_id: "8".to_owned(),
            ..Default::default()
        };
        let reports = vec![
            LayerReport {
                digest: "sha256:base".to_owned(),
                distributions: vec![base],
            },
            LayerReport {
                digest: "sha256:upper".to_owned(),
                distributions: vec![upper.clone()],
            },
            LayerReport {
                digest: "sha256:app".to_owned(),
                distributions: Vec::new(),
            },
        ];
        let packages = vec![Package {
            id: 1,
            name: "bash".to_owned(),
            ..Default::default()
        }];

        let records = controller.records(&packages, &reports);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].distribution, upper);
        assert_eq!(records[0].package_id(), 1);
    }

    #[test]
    fn records_without_distribution_use_empty() {
        let controller = Controller::new(LayerScanner::new(Vec::new(), 1).unwrap(), None);
        let packages = vec![Package::default()];
        let records = controller.records(&packages, &[]);
        assert_eq!(records[0].distribution, Distribution::default());
    }

    #[tokio::test]
    async fn vulnerabilities_without_store_fails() {
        let controller = Controller::new(LayerScanner::new(Vec::new(), 1).unwrap(), None);
        let err = controller
            .vulnerabilities(&[], &GetOpts::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::NoStore));
    }
}
