//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 레이어 인덱싱 결과([`IndexRecord`])와 취약점 저장소 행([`Vulnerability`])을
//! 정의합니다. 인덱서와 취약점 저장소는 이 타입들로 데이터를 교환합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 소프트웨어 패키지
///
/// 인덱싱 파이프라인이 레이어에서 발견한 패키지입니다.
/// `id`는 인덱싱 파이프라인이 부여한 패키지 식별자이며 결과 매핑의 키로 쓰입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    /// 패키지 식별자 (인덱싱 파이프라인이 부여)
    pub id: i64,
    /// 패키지 이름
    pub name: String,
    /// 패키지 버전
    pub version: String,
    /// 패키지 종류 (binary, source 등)
    pub kind: String,
    /// 소스 패키지 (있을 경우)
    pub source: Option<Box<Package>>,
}

impl Package {
    /// 소스 패키지 이름을 반환합니다. 소스 패키지가 없으면 빈 문자열입니다.
    pub fn source_name(&self) -> &str {
        self.source.as_deref().map_or("", |s| s.name.as_str())
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)?;
        if !self.kind.is_empty() {
            write!(f, " ({})", self.kind)?;
        }
        Ok(())
    }
}

/// 리눅스 배포판 정보
///
/// os-release 계열 파일에서 식별된 배포판 속성입니다.
/// 각 필드는 취약점 매칭 조건(matcher)으로 사용될 수 있습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Distribution {
    /// 배포판 식별자 (os-release `ID`, 예: `rhel`)
    pub did: String,
    /// 배포판 이름
    pub name: String,
    /// 배포판 버전
    pub version: String,
    /// 버전 코드명 (예: `bookworm`)
    pub version_code_name: String,
    /// 버전 ID (예: `8`)
    pub version_id: String,
    /// 아키텍처
    pub arch: String,
    /// CPE 식별자
    pub cpe: String,
    /// 사람이 읽기 위한 전체 이름
    pub pretty_name: String,
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pretty_name.is_empty() {
            write!(f, "{} {}", self.did, self.version_id)
        } else {
            write!(f, "{}", self.pretty_name)
        }
    }
}

/// 패키지 저장소 정보
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    /// 저장소 이름
    pub name: String,
    /// 저장소 키
    pub key: String,
    /// 저장소 URI
    pub uri: String,
}

/// 인덱스 레코드
///
/// 레이어 인덱싱에서 관찰된 (패키지, 배포판, 저장소) 조합입니다.
/// 취약점 저장소에 전달된 이후에는 변경되지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexRecord {
    /// 관찰된 패키지
    pub package: Package,
    /// 패키지가 관찰된 배포판
    pub distribution: Distribution,
    /// 패키지가 관찰된 저장소
    pub repository: Repository,
}

impl IndexRecord {
    /// 결과 매핑 키로 사용되는 패키지 식별자를 반환합니다.
    pub fn package_id(&self) -> i64 {
        self.package.id
    }
}

/// 취약점 저장소의 한 행
///
/// 영향받는 패키지/배포판/저장소와 수정 버전을 포함합니다.
/// 수정되지 않은 취약점은 `fixed_in_version`이 빈 문자열입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vulnerability {
    /// 저장소 내 행 ID
    pub id: i64,
    /// 취약점 이름 (예: CVE-2024-1234, RHSA-2024:0001)
    pub name: String,
    /// 취약점 설명
    pub description: String,
    /// 참고 링크 (공백 구분)
    pub links: String,
    /// 공급자가 부여한 심각도 원문
    pub severity: String,
    /// 영향받는 패키지 (name, version, kind)
    pub package: Package,
    /// 영향받는 배포판
    pub dist: Distribution,
    /// 영향받는 저장소
    pub repo: Repository,
    /// 수정된 버전 (미수정이면 빈 문자열)
    pub fixed_in_version: String,
}

impl Vulnerability {
    /// 공급자 심각도 문자열을 정규화된 [`Severity`]로 변환합니다.
    ///
    /// 알 수 없는 값은 `Severity::Info`로 취급합니다.
    pub fn normalized_severity(&self) -> Severity {
        Severity::from_str_loose(&self.severity).unwrap_or_default()
    }

    /// 수정 버전이 존재하는지 반환합니다.
    pub fn is_fixed(&self) -> bool {
        !self.fixed_in_version.is_empty()
    }
}

impl fmt::Display for Vulnerability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} (fixed: {})",
            self.name,
            self.normalized_severity(),
            self.package,
            if self.is_fixed() {
                self.fixed_in_version.as_str()
            } else {
                "N/A"
            },
        )
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Info < Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Severity {
    /// 정보성
    #[default]
    Info,
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    Medium,
    /// 높은 심각도
    High,
    /// 치명적 -- 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 문자열에서 심각도를 파싱합니다.
    ///
    /// 대소문자를 구분하지 않으며, 배포판 공급자 용어(Important, Moderate 등)도 허용합니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" | "informational" | "negligible" => Some(Self::Info),
            "low" => Some(Self::Low),
            "medium" | "med" | "moderate" => Some(Self::Medium),
            "high" | "important" => Some(Self::High),
            "critical" | "crit" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "Info"),
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}
