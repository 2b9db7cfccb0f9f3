//! 매칭 어휘 -- 쿼리 조건으로 사용할 수 있는 배포판 속성
//!
//! [`Matcher`]의 선언 순서가 정규(canonical) 순서입니다.
//! 쿼리 빌더는 요청 순서와 관계없이 이 순서로 WHERE 절을 생성합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ironpost_core::types::IndexRecord;

use crate::error::VulnStoreError;

/// 배포판 속성 matcher
///
/// `Ord` 구현은 선언 순서를 따르며, 정규 순서로 사용됩니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    /// 배포판 식별자 (`did`)
    DistributionDid,
    /// 배포판 이름
    DistributionName,
    /// 배포판 버전
    DistributionVersion,
    /// 버전 코드명
    DistributionVersionCodeName,
    /// 버전 ID
    DistributionVersionId,
    /// 아키텍처
    DistributionArch,
    /// CPE
    DistributionCpe,
    /// 사람이 읽기 위한 이름
    DistributionPrettyName,
}

impl Matcher {
    /// 정규 순서의 전체 어휘
    pub const ALL: [Matcher; 8] = [
        Matcher::DistributionDid,
        Matcher::DistributionName,
        Matcher::DistributionVersion,
        Matcher::DistributionVersionCodeName,
        Matcher::DistributionVersionId,
        Matcher::DistributionArch,
        Matcher::DistributionCpe,
        Matcher::DistributionPrettyName,
    ];

    /// 설정 파일에서 사용하는 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DistributionDid => "distribution_did",
            Self::DistributionName => "distribution_name",
            Self::DistributionVersion => "distribution_version",
            Self::DistributionVersionCodeName => "distribution_version_code_name",
            Self::DistributionVersionId => "distribution_version_id",
            Self::DistributionArch => "distribution_arch",
            Self::DistributionCpe => "distribution_cpe",
            Self::DistributionPrettyName => "distribution_pretty_name",
        }
    }

    /// `vuln` 테이블의 대응 컬럼
    pub fn column(self) -> &'static str {
        match self {
            Self::DistributionDid => "dist_id",
            Self::DistributionName => "dist_name",
            Self::DistributionVersion => "dist_version",
            Self::DistributionVersionCodeName => "dist_version_code_name",
            Self::DistributionVersionId => "dist_version_id",
            Self::DistributionArch => "dist_arch",
            Self::DistributionCpe => "dist_cpe",
            Self::DistributionPrettyName => "dist_pretty_name",
        }
    }

    /// 레코드의 배포판에서 이 matcher에 해당하는 값을 꺼냅니다.
    pub fn value_of(self, record: &IndexRecord) -> &str {
        let dist = &record.distribution;
        match self {
            Self::DistributionDid => &dist.did,
            Self::DistributionName => &dist.name,
            Self::DistributionVersion => &dist.version,
            Self::DistributionVersionCodeName => &dist.version_code_name,
            Self::DistributionVersionId => &dist.version_id,
            Self::DistributionArch => &dist.arch,
            Self::DistributionCpe => &dist.cpe,
            Self::DistributionPrettyName => &dist.pretty_name,
        }
    }

    /// 이름 목록을 matcher 목록으로 변환합니다. 순서와 중복은 그대로 유지합니다.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Matcher>, VulnStoreError> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl FromStr for Matcher {
    type Err = VulnStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| VulnStoreError::UnknownMatcher(s.to_owned()))
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
