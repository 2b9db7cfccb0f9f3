//! 컨트롤러 팩토리
//!
//! [`IndexerOptions`]로부터 [`Controller`]를 구성합니다. 기본 팩토리
//! [`default_controller_factory`]는 동시성 한도를 검증하고 [`LayerScanner`]를
//! 만든 뒤 컨트롤러를 반환합니다. 테스트나 임베딩 환경에서는 같은 시그니처의
//! 다른 팩토리를 주입할 수 있습니다.

use std::sync::Arc;

use ironpost_core::config::IndexerConfig;
use ironpost_vulnstore::VulnStore;

use crate::controller::{Controller, LayerScanner};
use crate::error::IndexerError;
use crate::rhel::RhelDistributionScanner;
use crate::scanner::DistributionScanner;

/// 컨트롤러 구성 옵션
#[derive(Clone)]
pub struct IndexerOptions {
    /// 취약점 저장소 (없으면 `Controller::vulnerabilities`가 실패)
    pub store: Option<VulnStore>,
    /// 배포판 스캐너 목록 (등록 순서대로 실행)
    pub scanners: Vec<Arc<dyn DistributionScanner>>,
    /// 동시에 스캔할 최대 레이어 수
    pub layer_scan_concurrency: usize,
}

impl IndexerOptions {
    /// `[indexer]` 설정 섹션에서 옵션을 생성합니다.
    ///
    /// 스캐너 이름은 [`scanner_by_name`]으로 해석합니다.
    pub fn from_config(
        config: &IndexerConfig,
        store: Option<VulnStore>,
    ) -> Result<Self, IndexerError> {
        let scanners = config
            .scanners
            .iter()
            .map(|name| scanner_by_name(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            store,
            scanners,
            layer_scan_concurrency: config.layer_scan_concurrency,
        })
    }
}

impl std::fmt::Debug for IndexerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.scanners.iter().map(|s| s.name()).collect();
        f.debug_struct("IndexerOptions")
            .field("store", &self.store.is_some())
            .field("scanners", &names)
            .field("layer_scan_concurrency", &self.layer_scan_concurrency)
            .finish()
    }
}

/// 옵션으로부터 컨트롤러를 만드는 팩토리
pub type ControllerFactory = fn(&IndexerOptions) -> Result<Controller, IndexerError>;

/// 기본 컨트롤러 팩토리
pub fn default_controller_factory(opts: &IndexerOptions) -> Result<Controller, IndexerError> {
    let layer_scanner = LayerScanner::new(opts.scanners.clone(), opts.layer_scan_concurrency)?;
    Ok(Controller::new(layer_scanner, opts.store.clone()))
}

/// 이름으로 배포판 스캐너를 생성합니다.
pub fn scanner_by_name(name: &str) -> Result<Arc<dyn DistributionScanner>, IndexerError> {
    match name {
        "rhel" => Ok(Arc::new(RhelDistributionScanner::new()?)),
        other => Err(IndexerError::UnknownScanner(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_resolves_scanners() {
        let opts = IndexerOptions::from_config(&IndexerConfig::default(), None).unwrap();
        assert_eq!(opts.scanners.len(), 1);
        assert_eq!(opts.scanners[0].name(), "rhel");
        assert_eq!(opts.layer_scan_concurrency, 10);
    }

    #[test]
    fn from_config_rejects_unknown_scanner() {
        let config = IndexerConfig {
            scanners: vec!["rhel".to_owned(), "alpine".to_owned()],
            ..Default::default()
        };
        let err = IndexerOptions::from_config(&config, None).unwrap_err();
        assert!(matches!(err, IndexerError::UnknownScanner(ref n) if n == "alpine"));
    }

    #[test]
    fn default_factory_builds_controller() {
        let opts = IndexerOptions::from_config(&IndexerConfig::default(), None).unwrap();
        let factory: ControllerFactory = default_controller_factory;
        let controller = factory(&opts).unwrap();
        assert_eq!(controller.layer_scanner().concurrency(), 10);
        assert_eq!(controller.layer_scanner().scanner_names(), vec!["rhel"]);
        assert!(controller.store().is_none());
    }

    #[test]
    fn default_factory_rejects_zero_concurrency() {
        let opts = IndexerOptions {
            store: None,
            scanners: Vec::new(),
            layer_scan_concurrency: 0,
        };
        assert!(matches!(
            default_controller_factory(&opts),
            Err(IndexerError::Config { .. })
        ));
    }

    #[test]
    fn debug_lists_scanner_names() {
        let opts = IndexerOptions::from_config(&IndexerConfig::default(), None).unwrap();
        let debug = format!("{opts:?}");
        assert!(debug.contains("rhel"));
    }
}
