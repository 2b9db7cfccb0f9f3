//! Ironpost 공통 크레이트
//!
//! 모든 모듈이 공유하는 도메인 타입, 에러, 설정, 메트릭 상수를 정의합니다.
//!
//! # 모듈 구조
//!
//! - [`types`]: 인덱스 레코드, 패키지, 배포판, 저장소, 취약점 타입
//! - [`error`]: 최상위 에러 (`IronpostError`)와 도메인별 에러
//! - [`config`]: `ironpost.toml` 파싱 및 환경변수 오버라이드
//! - [`metrics`]: 메트릭 이름 상수 및 설명 등록

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, IndexError, IronpostError, StorageError};

// 설정
pub use config::IronpostConfig;

// 도메인 타입
pub use types::{Distribution, IndexRecord, Package, Repository, Severity, Vulnerability};
