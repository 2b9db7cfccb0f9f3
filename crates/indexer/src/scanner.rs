//! 스캐너 trait
//!
//! 모든 스캐너는 [`VersionedScanner`]로 이름/버전/종류를 노출하고,
//! 배포판 스캐너는 [`DistributionScanner`]를 구현합니다.
//!
//! # 확장
//!
//! 새로운 배포판을 지원하려면 `DistributionScanner`를 구현하고
//! [`scanner_by_name`](crate::factory::scanner_by_name)에 등록합니다.

use ironpost_core::types::Distribution;

use crate::error::IndexerError;
use crate::layer::Layer;

/// 버전이 있는 스캐너
pub trait VersionedScanner: Send + Sync {
    /// 스캐너 이름 (예: `rhel`)
    fn name(&self) -> &'static str;

    /// 스캐너 구현 버전
    fn version(&self) -> &'static str;

    /// 스캐너 종류 (예: `distribution`)
    fn kind(&self) -> &'static str;
}

/// 배포판 스캔 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// 릴리스 파일이 레이어에 없음
    NotFound,
    /// 릴리스 파일은 있으나 인식된 배포판이 없음
    Unmatched,
    /// 배포판 식별됨
    Found(Distribution),
}

/// 레이어에서 배포판을 식별하는 스캐너
///
/// `scan`은 blocking I/O를 수행합니다.
pub trait DistributionScanner: VersionedScanner {
    /// 레이어를 검사합니다.
    fn scan(&self, layer: &Layer) -> Result<ScanOutcome, IndexerError>;

    /// 레이어의 배포판을 반환합니다. 식별하지 못하면 `None`입니다.
    fn identify(&self, layer: &Layer) -> Result<Option<Distribution>, IndexerError> {
        Ok(match self.scan(layer)? {
            ScanOutcome::Found(dist) => Some(dist),
            ScanOutcome::NotFound | ScanOutcome::Unmatched => None,
        })
    }
}
