//! 메트릭 상수
//!
//! 모든 메트릭의 이름과 레이블 키를 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ironpost_`
//! - 모듈명: `vulnstore_`, `indexer_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(ironpost_core::metrics::VULNSTORE_GET_CALLS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 실패 단계 레이블 키 (prepare, batch_send, scan, ...)
pub const LABEL_STAGE: &str = "stage";

/// 스캐너 이름 레이블 키
pub const LABEL_SCANNER: &str = "scanner";

// ─── Vuln Store 메트릭 ─────────────────────────────────────────────

/// Vuln Store: get 호출 수 (counter, label: result)
pub const VULNSTORE_GET_CALLS_TOTAL: &str = "ironpost_vulnstore_get_calls_total";

/// Vuln Store: 중단된 get 호출 수 (counter, label: stage)
pub const VULNSTORE_GET_ABORTS_TOTAL: &str = "ironpost_vulnstore_get_aborts_total";

/// Vuln Store: 배치에 큐잉된 인덱스 레코드 수 (counter)
pub const VULNSTORE_RECORDS_QUERIED_TOTAL: &str = "ironpost_vulnstore_records_queried_total";

/// Vuln Store: 매칭된 취약점 수 (counter)
pub const VULNSTORE_VULNERABILITIES_MATCHED_TOTAL: &str =
    "ironpost_vulnstore_vulnerabilities_matched_total";

/// Vuln Store: get 호출 소요 시간 (histogram, 초)
pub const VULNSTORE_GET_DURATION_SECONDS: &str = "ironpost_vulnstore_get_duration_seconds";

/// Vuln Store: 적재된 취약점 수 (counter)
pub const VULNSTORE_VULNERABILITIES_LOADED_TOTAL: &str =
    "ironpost_vulnstore_vulnerabilities_loaded_total";

// ─── Indexer 메트릭 ────────────────────────────────────────────────

/// Indexer: 스캔된 레이어 수 (counter)
pub const INDEXER_LAYERS_SCANNED_TOTAL: &str = "ironpost_indexer_layers_scanned_total";

/// Indexer: 식별된 배포판 수 (counter, label: scanner)
pub const INDEXER_DISTRIBUTIONS_FOUND_TOTAL: &str = "ironpost_indexer_distributions_found_total";

/// Indexer: 레이어 스캔 소요 시간 (histogram, 초)
pub const INDEXER_LAYER_SCAN_DURATION_SECONDS: &str =
    "ironpost_indexer_layer_scan_duration_seconds";

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        VULNSTORE_GET_CALLS_TOTAL,
        VULNSTORE_GET_ABORTS_TOTAL,
        VULNSTORE_RECORDS_QUERIED_TOTAL,
        VULNSTORE_VULNERABILITIES_MATCHED_TOTAL,
        VULNSTORE_GET_DURATION_SECONDS,
        VULNSTORE_VULNERABILITIES_LOADED_TOTAL,
        INDEXER_LAYERS_SCANNED_TOTAL,
        INDEXER_DISTRIBUTIONS_FOUND_TOTAL,
        INDEXER_LAYER_SCAN_DURATION_SECONDS,
    ];

    #[test]
    fn all_metrics_start_with_ironpost_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("ironpost_"),
                "Metric '{}' does not start with 'ironpost_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.ends_with("_total") || name.ends_with("_seconds"),
                "Metric '{}' has no recognised suffix",
                name
            );
        }
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_RESULT, LABEL_STAGE, LABEL_SCANNER] {
            assert_eq!(label.to_lowercase(), label);
        }
    }
}
