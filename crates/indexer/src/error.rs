//! 인덱서 에러 타입
//!
//! [`IndexerError`]는 레이어 읽기, 배포판 스캐너, 컨트롤러 구성에서 발생하는
//! 에러를 나타냅니다. `From<IndexerError> for IronpostError` 구현을 통해
//! 상위 에러 타입으로 전파됩니다.

use ironpost_core::error::{ConfigError, IndexError, IronpostError};
use ironpost_vulnstore::VulnStoreError;

/// 인덱서 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    /// 레이어 파일 읽기 실패
    #[error("layer read error: {path}: {source}")]
    LayerRead {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },

    /// 레이어 밖을 가리키는 경로
    #[error("path escapes layer root: '{0}'")]
    PathTraversal(String),

    /// 파일 크기 초과
    #[error("file too large: {path}: {size} bytes (max: {max})")]
    FileTooBig {
        /// 파일 경로
        path: String,
        /// 실제 파일 크기 (바이트)
        size: u64,
        /// 최대 허용 크기 (바이트)
        max: u64,
    },

    /// 스캐너 실행 실패
    #[error("scanner {scanner} failed: {reason}")]
    Scanner {
        /// 스캐너 이름
        scanner: String,
        /// 실패 사유
        reason: String,
    },

    /// 등록되지 않은 스캐너 이름
    #[error("unknown scanner: '{0}'")]
    UnknownScanner(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 호출자 취소
    #[error("indexing cancelled")]
    Cancelled,

    /// 취약점 저장소가 연결되지 않음
    #[error("no vulnerability store configured")]
    NoStore,

    /// 취약점 저장소 에러
    #[error(transparent)]
    Store(#[from] VulnStoreError),

    /// 태스크 join 실패
    #[error("task error: {0}")]
    Task(String),
}

impl From<IndexerError> for IronpostError {
    fn from(err: IndexerError) -> Self {
        match err {
            IndexerError::Store(e) => e.into(),
            IndexerError::UnknownScanner(name) => IronpostError::Config(ConfigError::InvalidValue {
                field: "indexer.scanners".to_owned(),
                reason: format!("unknown scanner '{name}'"),
            }),
            IndexerError::Config { field, reason } => {
                IronpostError::Config(ConfigError::InvalidValue { field, reason })
            }
            e @ (IndexerError::LayerRead { .. }
            | IndexerError::PathTraversal(_)
            | IndexerError::FileTooBig { .. }) => {
                IronpostError::Index(IndexError::LayerRead(e.to_string()))
            }
            other => IronpostError::Index(IndexError::ScanFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_read_error_display() {
        let err = IndexerError::LayerRead {
            path: "etc/os-release".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("etc/os-release"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn store_error_is_transparent() {
        let err: IndexerError = VulnStoreError::Cancelled { stage: "acquire" }.into();
        assert_eq!(err.to_string(), "cancelled before acquire");
    }

    #[test]
    fn path_traversal_converts_to_layer_read() {
        let err: IronpostError = IndexerError::PathTraversal("../etc/shadow".to_owned()).into();
        assert!(matches!(err, IronpostError::Index(IndexError::LayerRead(_))));
    }

    #[test]
    fn unknown_scanner_converts_to_config_error() {
        let err: IronpostError = IndexerError::UnknownScanner("alpine".to_owned()).into();
        assert!(matches!(err, IronpostError::Config(_)));
        assert!(err.to_string().contains("alpine"));
    }

    #[test]
    fn scanner_error_converts_to_scan_failed() {
        let err: IronpostError = IndexerError::Scanner {
            scanner: "rhel".to_owned(),
            reason: "boom".to_owned(),
        }
        .into();
        assert!(matches!(err, IronpostError::Index(IndexError::ScanFailed(_))));
    }
}
