//! 취약점 저장소 설정
//!
//! [`VulnStoreConfig`]는 core의 [`VulnConfig`](ironpost_core::config::VulnConfig)에서
//! 파생되며, matcher 이름을 [`Matcher`] 어휘로 검증한 형태를 보유합니다.
//!
//! # 사용 예시
//!
//! ```
//! use ironpost_vulnstore::{Matcher, VulnStoreConfigBuilder};
//!
//! let config = VulnStoreConfigBuilder::new()
//!     .db_path("/tmp/vuln.db")
//!     .pool_size(2)
//!     .matchers(vec![Matcher::DistributionDid])
//!     .build()
//!     .unwrap();
//! assert_eq!(config.pool_size, 2);
//! ```

use std::path::{Component, Path};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ironpost_core::config::VulnConfig;

use crate::error::VulnStoreError;
use crate::matcher::Matcher;

/// 커넥션 풀 최대 크기
const MAX_POOL_SIZE: usize = 64;

/// 배치 데드라인 최대값 (초)
const MAX_BATCH_TIMEOUT_SECS: u64 = 600;

/// 경로 길이 제한
const MAX_PATH_LEN: usize = 4096;

/// 취약점 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnStoreConfig {
    /// SQLite 데이터베이스 경로
    pub db_path: String,
    /// 커넥션 풀 크기
    pub pool_size: usize,
    /// 기본 matcher 목록 (요청 순서, 중복 허용)
    pub matchers: Vec<Matcher>,
    /// 배치 전송 데드라인 (초). 호출자 취소와 독립적으로 적용됩니다.
    pub batch_timeout_secs: u64,
    /// SQLite busy_timeout (밀리초)
    pub busy_timeout_ms: u64,
}

impl Default for VulnStoreConfig {
    fn default() -> Self {
        Self {
            db_path: "/var/lib/ironpost/vuln.db".to_owned(),
            pool_size: 4,
            matchers: vec![Matcher::DistributionDid, Matcher::DistributionVersionId],
            batch_timeout_secs: 30,
            busy_timeout_ms: 5000,
        }
    }
}

impl VulnStoreConfig {
    /// core의 `VulnConfig`에서 저장소 설정을 생성합니다.
    ///
    /// matcher 이름이 어휘에 없으면 I/O 이전에 `UnknownMatcher`를 반환합니다.
    pub fn from_core(core: &VulnConfig) -> Result<Self, VulnStoreError> {
        let config = Self {
            db_path: core.db_path.clone(),
            pool_size: core.pool_size,
            matchers: Matcher::parse_all(&core.matchers)?,
            batch_timeout_secs: core.batch_timeout_secs,
            busy_timeout_ms: core.busy_timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// 배치 데드라인
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_secs(self.batch_timeout_secs)
    }

    /// SQLite busy_timeout
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `db_path`: 비어있지 않고 `..` 컴포넌트가 없어야 함
    /// - `pool_size`: 1-64
    /// - `batch_timeout_secs`: 1-600
    pub fn validate(&self) -> Result<(), VulnStoreError> {
        if self.db_path.is_empty() {
            return Err(VulnStoreError::Config {
                field: "db_path".to_owned(),
                reason: "db_path must not be empty".to_owned(),
            });
        }

        if Path::new(&self.db_path)
            .components()
            .any(|c| c == Component::ParentDir)
        {
            return Err(VulnStoreError::Config {
                field: "db_path".to_owned(),
                reason: "db_path contains path traversal pattern '..'".to_owned(),
            });
        }

        if self.db_path.len() > MAX_PATH_LEN {
            return Err(VulnStoreError::Config {
                field: "db_path".to_owned(),
                reason: format!("db_path exceeds maximum length {MAX_PATH_LEN}"),
            });
        }

        if self.pool_size == 0 || self.pool_size > MAX_POOL_SIZE {
            return Err(VulnStoreError::Config {
                field: "pool_size".to_owned(),
                reason: format!("must be 1-{MAX_POOL_SIZE}"),
            });
        }

        if self.batch_timeout_secs == 0 || self.batch_timeout_secs > MAX_BATCH_TIMEOUT_SECS {
            return Err(VulnStoreError::Config {
                field: "batch_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_BATCH_TIMEOUT_SECS}"),
            });
        }

        Ok(())
    }
}

/// [`VulnStoreConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct VulnStoreConfigBuilder {
    config: VulnStoreConfig,
}

impl VulnStoreConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 데이터베이스 경로를 설정합니다.
    pub fn db_path(mut self, path: impl Into<String>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// 커넥션 풀 크기를 설정합니다.
    pub fn pool_size(mut self, size: usize) -> Self {
        self.config.pool_size = size;
        self
    }

    /// 기본 matcher 목록을 설정합니다.
    pub fn matchers(mut self, matchers: Vec<Matcher>) -> Self {
        self.config.matchers = matchers;
        self
    }

    /// 배치 데드라인(초)을 설정합니다.
    pub fn batch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.batch_timeout_secs = secs;
        self
    }

    /// busy_timeout(밀리초)을 설정합니다.
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.busy_timeout_ms = ms;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `VulnStoreError::Config` 반환
    pub fn build(self) -> Result<VulnStoreConfig, VulnStoreError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// 호출 단위 옵션
///
/// 요청된 matcher 목록만 의미를 가집니다. 순서와 중복은 쿼리 빌더가 정규화합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetOpts {
    /// 요청된 matcher (순서 무관, 중복 허용)
    pub matchers: Vec<Matcher>,
}

impl GetOpts {
    /// matcher 목록으로 옵션을 생성합니다.
    pub fn new(matchers: Vec<Matcher>) -> Self {
        Self { matchers }
    }

    /// 저장소 설정의 기본 matcher로 옵션을 생성합니다.
    pub fn from_config(config: &VulnStoreConfig) -> Self {
        Self {
            matchers: config.matchers.clone(),
        }
    }

    /// matcher 이름 목록으로 옵션을 생성합니다.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, VulnStoreError> {
        Ok(Self {
            matchers: Matcher::parse_all(names)?,
        })
    }
}
