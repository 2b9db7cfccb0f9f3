//! Ironpost 취약점 저장소
//!
//! 인덱스 레코드(패키지 + 배포판 + 저장소)를 받아, 레코드마다 적용되는 취약점을
//! 하나의 트랜잭션 안에서 배치로 조회합니다.
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 (`VulnStoreError`)
//! - [`config`]: 저장소 설정 (`VulnStoreConfig`, 빌더), 호출 옵션 (`GetOpts`)
//! - [`matcher`]: 매칭 어휘 (`Matcher`)
//! - [`query`]: 정규 쿼리 빌더 (`build`, `BuiltQuery`)
//! - [`fingerprint`]: statement 이름 생성
//! - [`pool`]: SQLite 커넥션 풀 (`ConnPool`)
//! - [`batch`]: 트랜잭션과 배치 프로토콜 (`StoreTx`, `Batch`, `BatchResults`)
//! - [`schema`]: `vuln` 테이블 스키마와 적재
//! - [`store`]: 저장소 핸들 (`VulnStore`)
//!
//! # Architecture
//!
//! ```text
//! GetOpts.matchers --> query::build --> BuiltQuery --> fingerprint --> name
//!                                            |
//! ConnPool::acquire --> StoreTx::begin --> prepare(name, sql)
//!                                            |
//!                         Batch::queue(name, args) x N --> send_batch(deadline)
//!                                            |
//!                         next_cursor() x N --> VulnMap --> close --> commit
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod fingerprint;
mod get;
pub mod matcher;
pub mod pool;
pub mod query;
pub mod schema;
pub mod store;

// --- Public API Re-exports ---

// Store
pub use store::VulnStore;

// Configuration
pub use config::{GetOpts, VulnStoreConfig, VulnStoreConfigBuilder};

// Error
pub use error::VulnStoreError;

// Query
pub use fingerprint::{Fingerprint, fingerprint};
pub use get::VulnMap;
pub use matcher::Matcher;
pub use query::{BuiltQuery, build, build_from_names};
