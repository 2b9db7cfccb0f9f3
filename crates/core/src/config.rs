//! 설정 관리 -- ironpost.toml 파싱 및 런타임 설정
//!
//! [`IronpostConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`IRONPOST_VULN_POOL_SIZE=8` 형식)
//! 3. 설정 파일 (`ironpost.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ironpost_core::error::IronpostError> {
//! use ironpost_core::config::IronpostConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = IronpostConfig::load("ironpost.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = IronpostConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, IronpostError};

/// 커넥션 풀 최대 크기
const MAX_POOL_SIZE: usize = 64;

/// 배치 데드라인 최대값 (초)
const MAX_BATCH_TIMEOUT_SECS: u64 = 600;

/// 레이어 스캔 동시성 최대값
const MAX_LAYER_SCAN_CONCURRENCY: usize = 256;

/// Ironpost 통합 설정
///
/// `ironpost.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IronpostConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 취약점 저장소 설정
    #[serde(default)]
    pub vuln: VulnConfig,
    /// 레이어 인덱서 설정
    #[serde(default)]
    pub indexer: IndexerConfig,
}

impl IronpostConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IronpostError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IronpostError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IronpostError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                IronpostError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, IronpostError> {
        toml::from_str(toml_str).map_err(|e| {
            IronpostError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `IRONPOST_{SECTION}_{FIELD}`
    /// 예: `IRONPOST_VULN_DB_PATH=/data/vuln.db`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "IRONPOST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "IRONPOST_GENERAL_LOG_FORMAT");

        // Vuln store
        override_string(&mut self.vuln.db_path, "IRONPOST_VULN_DB_PATH");
        override_usize(&mut self.vuln.pool_size, "IRONPOST_VULN_POOL_SIZE");
        override_csv(&mut self.vuln.matchers, "IRONPOST_VULN_MATCHERS");
        override_u64(
            &mut self.vuln.batch_timeout_secs,
            "IRONPOST_VULN_BATCH_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.vuln.busy_timeout_ms,
            "IRONPOST_VULN_BUSY_TIMEOUT_MS",
        );

        // Indexer
        override_bool(&mut self.indexer.enabled, "IRONPOST_INDEXER_ENABLED");
        override_usize(
            &mut self.indexer.layer_scan_concurrency,
            "IRONPOST_INDEXER_LAYER_SCAN_CONCURRENCY",
        );
        override_csv(&mut self.indexer.scanners, "IRONPOST_INDEXER_SCANNERS");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// matcher 이름은 어휘(vocabulary)를 아는 `ironpost-vulnstore`에서 검증합니다.
    pub fn validate(&self) -> Result<(), IronpostError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.vuln.db_path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "vuln.db_path".to_owned(),
                reason: "db_path must not be empty".to_owned(),
            }
            .into());
        }

        if self.vuln.pool_size == 0 || self.vuln.pool_size > MAX_POOL_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "vuln.pool_size".to_owned(),
                reason: format!("must be 1-{MAX_POOL_SIZE}"),
            }
            .into());
        }

        // 배치 데드라인은 반드시 유한하고 0보다 커야 함
        if self.vuln.batch_timeout_secs == 0
            || self.vuln.batch_timeout_secs > MAX_BATCH_TIMEOUT_SECS
        {
            return Err(ConfigError::InvalidValue {
                field: "vuln.batch_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_BATCH_TIMEOUT_SECS}"),
            }
            .into());
        }

        if self.indexer.enabled {
            if self.indexer.layer_scan_concurrency == 0
                || self.indexer.layer_scan_concurrency > MAX_LAYER_SCAN_CONCURRENCY
            {
                return Err(ConfigError::InvalidValue {
                    field: "indexer.layer_scan_concurrency".to_owned(),
                    reason: format!("must be 1-{MAX_LAYER_SCAN_CONCURRENCY}"),
                }
                .into());
            }

            if self.indexer.scanners.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "indexer.scanners".to_owned(),
                    reason: "at least one scanner required when enabled".to_owned(),
                }
                .into());
            }
        }

        Ok(())
    }
}

// Default는 derive 매크로로 자동 생성 (각 필드가 Default를 구현하므로)

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 취약점 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VulnConfig {
    /// SQLite 취약점 DB 파일 경로
    pub db_path: String,
    /// 커넥션 풀 크기
    pub pool_size: usize,
    /// 매칭에 사용할 배포판 속성 이름 목록 (예: `distribution_did`)
    pub matchers: Vec<String>,
    /// 배치 송신/수신 데드라인 (초). 호출자 취소와 무관하게 적용됨
    pub batch_timeout_secs: u64,
    /// SQLite busy_timeout (밀리초)
    pub busy_timeout_ms: u64,
}

impl Default for VulnConfig {
    fn default() -> Self {
        Self {
            db_path: "/var/lib/ironpost/vuln.db".to_owned(),
            pool_size: 4,
            matchers: vec![
                "distribution_did".to_owned(),
                "distribution_version_id".to_owned(),
            ],
            batch_timeout_secs: 30,
            busy_timeout_ms: 5000,
        }
    }
}

/// 레이어 인덱서 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 동시에 스캔할 최대 레이어 수
    pub layer_scan_concurrency: usize,
    /// 사용할 배포판 스캐너 이름 목록
    pub scanners: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            layer_scan_concurrency: 10,
            scanners: vec!["rhel".to_owned()],
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
