//! RHEL 배포판 스캐너
//!
//! `etc/os-release`의 PRETTY_NAME(예: `Red Hat Enterprise Linux Server 7.7 (Maipo)`)과
//! `etc/redhat-release`의 릴리스 문자열(예: `Red Hat Enterprise Linux Server release 7.7 (Maipo)`)
//! 모두에 매칭되는 정규식으로 RHEL 3~8을 식별합니다.

use regex::bytes::Regex;
use tracing::debug;

use ironpost_core::types::Distribution;

use crate::error::IndexerError;
use crate::layer::Layer;
use crate::scanner::{DistributionScanner, ScanOutcome, VersionedScanner};

const OS_RELEASE_PATH: &str = "etc/os-release";
const RH_RELEASE_PATH: &str = "etc/redhat-release";

const SCANNER_NAME: &str = "rhel";
const SCANNER_VERSION: &str = "v0.0.1";
const SCANNER_KIND: &str = "distribution";

/// 지원하는 RHEL 메이저 릴리스
const RELEASES: [u8; 6] = [3, 4, 5, 6, 7, 8];

/// RHEL 배포판 스캐너
pub struct RhelDistributionScanner {
    /// (메이저 릴리스, 정규식) 목록. 릴리스 오름차순.
    patterns: Vec<(u8, Regex)>,
}

impl RhelDistributionScanner {
    /// 릴리스별 정규식을 컴파일하여 스캐너를 생성합니다.
    pub fn new() -> Result<Self, IndexerError> {
        let patterns = RELEASES
            .iter()
            .map(|&release| {
                let pattern =
                    format!(r"Red Hat Enterprise Linux (Server)?\s*(release)?\s*{release}(\.\d)?");
                Regex::new(&pattern)
                    .map(|re| (release, re))
                    .map_err(|e| IndexerError::Scanner {
                        scanner: SCANNER_NAME.to_owned(),
                        reason: format!("invalid release pattern: {e}"),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// 파일 내용에서 RHEL 릴리스를 찾아 배포판으로 변환합니다.
    pub fn parse(&self, contents: &[u8]) -> Option<Distribution> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(contents))
            .map(|(release, _)| release_to_dist(*release))
    }
}

impl VersionedScanner for RhelDistributionScanner {
    fn name(&self) -> &'static str {
        SCANNER_NAME
    }

    fn version(&self) -> &'static str {
        SCANNER_VERSION
    }

    fn kind(&self) -> &'static str {
        SCANNER_KIND
    }
}

impl DistributionScanner for RhelDistributionScanner {
    fn scan(&self, layer: &Layer) -> Result<ScanOutcome, IndexerError> {
        let files = layer.files(&[OS_RELEASE_PATH, RH_RELEASE_PATH])?;
        if files.is_empty() {
            debug!(
                scanner = SCANNER_NAME,
                layer = %layer.digest,
                "didn't find an os-release or redhat-release file"
            );
            return Ok(ScanOutcome::NotFound);
        }

        for file in &files {
            if let Some(dist) = self.parse(&file.contents) {
                debug!(
                    scanner = SCANNER_NAME,
                    layer = %layer.digest,
                    path = %file.path,
                    version_id = %dist.version_id,
                    "identified distribution"
                );
                return Ok(ScanOutcome::Found(dist));
            }
        }

        Ok(ScanOutcome::Unmatched)
    }
}

fn release_to_dist(release: u8) -> Distribution {
    Distribution {
        did: "rhel".to_owned(),
        name: "Red Hat Enterprise Linux Server".to_owned(),
        version: release.to_string(),
        version_id: release.to_string(),
        cpe: format!("cpe:/o:redhat:enterprise_linux:{release}"),
        pretty_name: format!("Red Hat Enterprise Linux Server {release}"),
        ..Default::default()
    }
}
