//! 취약점 저장소 에러 타입
//!
//! [`VulnStoreError`]는 매칭 쿼리 엔진의 각 처리 단계에서 발생하는 에러를 나타냅니다.
//! `From<VulnStoreError> for IronpostError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **설정**: `UnknownMatcher`, `Config`
//! - **취소**: `Cancelled`
//! - **트랜잭션**: `Acquire`, `Begin`, `Commit`
//! - **배치 프로토콜**: `Prepare`, `BatchSend`, `BatchProtocol`, `Scan`, `BatchClose`
//! - **스키마/적재**: `Schema`
//! - **런타임**: `Task`

use ironpost_core::error::{ConfigError, IronpostError, StorageError};

/// 취약점 저장소 도메인 에러
///
/// 설정 에러를 제외한 모든 변형은 트랜잭션 롤백을 동반합니다.
#[derive(Debug, thiserror::Error)]
pub enum VulnStoreError {
    /// 매칭 어휘에 없는 matcher 이름
    #[error("unknown matcher: '{0}'")]
    UnknownMatcher(String),

    /// 호출자 취소 (acquire / begin / prepare 이전)
    #[error("cancelled before {stage}")]
    Cancelled {
        /// 취소가 관찰된 단계
        stage: &'static str,
    },

    /// 커넥션 획득 실패
    #[error("acquire connection: {0}")]
    Acquire(String),

    /// 트랜잭션 시작 실패
    #[error("begin transaction: {0}")]
    Begin(String),

    /// statement 준비 실패
    #[error("prepare statement {name}: {reason}")]
    Prepare {
        /// statement 이름 (fingerprint)
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 배치 전송 실패
    #[error("batch send: {0}")]
    BatchSend(String),

    /// 큐잉 순서와 결과 소비 순서 불일치
    #[error("batch protocol violation: {0}")]
    BatchProtocol(String),

    /// 행 스캔 실패
    #[error("scan row: column {column}: {reason}")]
    Scan {
        /// 실패한 컬럼 인덱스
        column: usize,
        /// 실패 사유
        reason: String,
    },

    /// 배치 종료 실패
    #[error("batch close: {0}")]
    BatchClose(String),

    /// 커밋 실패
    #[error("commit: {0}")]
    Commit(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 스키마 생성 또는 적재 실패
    #[error("schema: {0}")]
    Schema(String),

    /// blocking 태스크 join 실패
    #[error("task: {0}")]
    Task(String),
}

impl VulnStoreError {
    /// 메트릭 레이블 및 로그에 사용하는 단계 이름을 반환합니다.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnknownMatcher(_) => "unknown_matcher",
            Self::Cancelled { .. } => "cancelled",
            Self::Acquire(_) => "acquire",
            Self::Begin(_) => "begin",
            Self::Prepare { .. } => "prepare",
            Self::BatchSend(_) => "batch_send",
            Self::BatchProtocol(_) => "batch_protocol",
            Self::Scan { .. } => "scan",
            Self::BatchClose(_) => "batch_close",
            Self::Commit(_) => "commit",
            Self::Config { .. } => "config",
            Self::Schema(_) => "schema",
            Self::Task(_) => "task",
        }
    }
}

impl From<VulnStoreError> for IronpostError {
    fn from(err: VulnStoreError) -> Self {
        let stage = err.stage();
        match err {
            VulnStoreError::UnknownMatcher(name) => IronpostError::Config(ConfigError::InvalidValue {
                field: "vuln.matchers".to_owned(),
                reason: format!("unknown matcher '{name}'"),
            }),
            VulnStoreError::Config { field, reason } => {
                IronpostError::Config(ConfigError::InvalidValue { field, reason })
            }
            VulnStoreError::Cancelled { stage } => {
                IronpostError::Storage(StorageError::Cancelled(stage.to_owned()))
            }
            VulnStoreError::Acquire(msg) => IronpostError::Storage(StorageError::Connection(msg)),
            VulnStoreError::Begin(msg) | VulnStoreError::Commit(msg) => {
                IronpostError::Storage(StorageError::Transaction(format!("{stage}: {msg}")))
            }
            other => IronpostError::Storage(StorageError::Query {
                stage: stage.to_owned(),
                reason: other.to_string(),
            }),
        }
    }
}
