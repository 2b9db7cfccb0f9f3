//! 에러 타입 -- 도메인별 에러 정의

/// Ironpost 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum IronpostError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 취약점 저장소 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 레이어 인덱싱 에러
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스토리지 에러
///
/// 취약점 저장소의 각 처리 단계(stage)를 구분하여 보고합니다.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 연결 획득 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쿼리 구성 또는 실행 실패
    #[error("query failed: {stage}: {reason}")]
    Query { stage: String, reason: String },

    /// 트랜잭션 처리 실패 (begin / commit)
    #[error("transaction failed: {0}")]
    Transaction(String),

    /// 호출자 취소
    #[error("cancelled before {0}")]
    Cancelled(String),
}

/// 레이어 인덱싱 에러
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// 레이어 파일 읽기 실패
    #[error("layer read failed: {0}")]
    LayerRead(String),

    /// 스캐너 실행 실패
    #[error("scanner failed: {0}")]
    ScanFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_ironpost_error() {
        let err: IronpostError = ConfigError::InvalidValue {
            field: "vuln.pool_size".to_owned(),
            reason: "must be 1-64".to_owned(),
        }
        .into();
        assert!(matches!(err, IronpostError::Config(_)));
        assert!(err.to_string().contains("vuln.pool_size"));
    }

    #[test]
    fn storage_query_error_display_includes_stage() {
        let err = StorageError::Query {
            stage: "batch send".to_owned(),
            reason: "interrupted".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("batch send"));
        assert!(msg.contains("interrupted"));
    }

    #[test]
    fn cancelled_error_display() {
        let err = StorageError::Cancelled("prepare".to_owned());
        assert_eq!(err.to_string(), "cancelled before prepare");
    }

    #[test]
    fn io_error_converts_to_ironpost_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: IronpostError = io_err.into();
        assert!(matches!(err, IronpostError::Io(_)));
    }

    #[test]
    fn index_error_display() {
        let err = IndexError::ScanFailed("rhel: bad regex".to_owned());
        assert!(err.to_string().contains("rhel"));
    }
}
