//! Ironpost 인덱서
//!
//! 압축이 풀린 이미지 레이어에서 배포판을 식별하고, 패키지와 결합한
//! 인덱스 레코드를 취약점 저장소에 전달합니다.
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 (`IndexerError`)
//! - [`layer`]: 이미지 레이어와 파일 접근 (`Layer`)
//! - [`scanner`]: 스캐너 trait (`VersionedScanner`, `DistributionScanner`)
//! - [`rhel`]: RHEL 배포판 스캐너
//! - [`controller`]: 레이어 스캐너와 컨트롤러 (`LayerScanner`, `Controller`)
//! - [`factory`]: 컨트롤러 팩토리 (`IndexerOptions`, `default_controller_factory`)
//!
//! # Architecture
//!
//! ```text
//! IndexerConfig --> IndexerOptions::from_config --> ControllerFactory --> Controller
//!                                                                          |
//! Vec<Layer> --> Controller::index (semaphore, spawn_blocking) --> Vec<LayerReport>
//!                                                                          |
//! packages --> Controller::records --> Vec<IndexRecord> --> VulnStore::get
//! ```

pub mod controller;
pub mod error;
pub mod factory;
pub mod layer;
pub mod rhel;
pub mod scanner;

// --- Public API Re-exports ---

// Controller
pub use controller::{Controller, LayerReport, LayerScanner};
pub use factory::{ControllerFactory, IndexerOptions, default_controller_factory, scanner_by_name};

// Error
pub use error::IndexerError;

// Scanners
pub use layer::{Layer, LayerFile};
pub use rhel::RhelDistributionScanner;
pub use scanner::{DistributionScanner, ScanOutcome, VersionedScanner};
