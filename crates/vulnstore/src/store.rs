//! 취약점 저장소 핸들
//!
//! [`VulnStore`]는 커넥션 풀과 설정을 보유하며, 비동기 조회([`VulnStore::get`])와
//! 적재([`VulnStore::load`])를 제공합니다. 데이터베이스 작업은
//! `spawn_blocking` 안에서 실행됩니다.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info, info_span, warn};
use uuid::Uuid;

use ironpost_core::metrics as m;
use ironpost_core::types::{IndexRecord, Vulnerability};

use crate::config::{GetOpts, VulnStoreConfig};
use crate::error::VulnStoreError;
use crate::fingerprint::fingerprint;
use crate::get::{self, VulnMap};
use crate::pool::ConnPool;
use crate::query;
use crate::schema;

/// 취약점 저장소
///
/// `Clone`은 같은 커넥션 풀을 공유합니다.
#[derive(Clone)]
pub struct VulnStore {
    pool: ConnPool,
    config: Arc<VulnStoreConfig>,
}

impl VulnStore {
    /// 설정을 검증하고 풀을 연 뒤 스키마를 준비합니다.
    pub async fn open(config: VulnStoreConfig) -> Result<Self, VulnStoreError> {
        config.validate()?;

        let cfg = config.clone();
        let pool = tokio::task::spawn_blocking(move || {
            ConnPool::open(&cfg.db_path, cfg.pool_size, cfg.busy_timeout())
        })
        .await
        .map_err(|e| VulnStoreError::Task(format!("spawn_blocking failed: {e}")))??;

        let conn = pool.acquire(&CancellationToken::new()).await?;
        tokio::task::spawn_blocking(move || schema::ensure_schema(&conn))
            .await
            .map_err(|e| VulnStoreError::Task(format!("spawn_blocking failed: {e}")))??;

        info!(
            db_path = %config.db_path,
            pool_size = config.pool_size,
            "vulnerability store opened"
        );

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    /// 저장소 설정
    pub fn config(&self) -> &VulnStoreConfig {
        &self.config
    }

    /// 커넥션 풀
    pub fn pool(&self) -> &ConnPool {
        &self.pool
    }

    /// 레코드마다 적용되는 취약점을 조회합니다.
    ///
    /// 결과는 패키지 식별자를 키로 하며, 아무것도 매칭되지 않은 레코드는
    /// 키가 없습니다. 실패 시 부분 결과 없이 에러만 반환합니다.
    ///
    /// `cancel`은 커넥션 획득과 statement 준비까지만 관찰됩니다.
    pub async fn get(
        &self,
        records: &[IndexRecord],
        opts: &GetOpts,
        cancel: &CancellationToken,
    ) -> Result<VulnMap, VulnStoreError> {
        let call_id = Uuid::new_v4();
        let span = info_span!(
            "vulnstore.get",
            component = "vulnstore.get",
            %call_id,
            records = records.len()
        );

        async move {
            let started = Instant::now();
            let result = self.get_inner(records, opts, cancel).await;
            let elapsed = started.elapsed();
            metrics::histogram!(m::VULNSTORE_GET_DURATION_SECONDS).record(elapsed.as_secs_f64());

            match &result {
                Ok(mapping) => {
                    let vulnerabilities: usize = mapping.values().map(Vec::len).sum();
                    metrics::counter!(m::VULNSTORE_GET_CALLS_TOTAL, m::LABEL_RESULT => "success")
                        .increment(1);
                    metrics::counter!(m::VULNSTORE_VULNERABILITIES_MATCHED_TOTAL)
                        .increment(vulnerabilities as u64);
                    info!(
                        records = records.len(),
                        packages = mapping.len(),
                        vulnerabilities,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "vulnerability lookup complete"
                    );
                }
                Err(e) => {
                    metrics::counter!(m::VULNSTORE_GET_CALLS_TOTAL, m::LABEL_RESULT => "failure")
                        .increment(1);
                    metrics::counter!(m::VULNSTORE_GET_ABORTS_TOTAL, m::LABEL_STAGE => e.stage())
                        .increment(1);
                    warn!(stage = e.stage(), error = %e, "vulnerability lookup aborted");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get_inner(
        &self,
        records: &[IndexRecord],
        opts: &GetOpts,
        cancel: &CancellationToken,
    ) -> Result<VulnMap, VulnStoreError> {
        let built = query::build(&opts.matchers);
        let name = fingerprint(&built.sql);
        debug!(name = %name, matchers = built.matchers.len(), "built query");

        let mut conn = self.pool.acquire(cancel).await?;

        let records = records.to_vec();
        let deadline = self.config.batch_timeout();
        let cancel = cancel.clone();
        let span = Span::current();

        tokio::task::spawn_blocking(move || {
            span.in_scope(|| get::execute(&mut conn, &records, &built, &name, deadline, &cancel))
        })
        .await
        .map_err(|e| VulnStoreError::Task(format!("spawn_blocking failed: {e}")))?
    }

    /// 취약점 목록을 하나의 트랜잭션으로 적재하고 적재된 행 수를 반환합니다.
    pub async fn load(
        &self,
        vulns: Vec<Vulnerability>,
        cancel: &CancellationToken,
    ) -> Result<usize, VulnStoreError> {
        let mut conn = self.pool.acquire(cancel).await?;
        let inserted = tokio::task::spawn_blocking(move || {
            schema::insert_vulnerabilities(&mut conn, &vulns)
        })
        .await
        .map_err(|e| VulnStoreError::Task(format!("spawn_blocking failed: {e}")))??;

        metrics::counter!(m::VULNSTORE_VULNERABILITIES_LOADED_TOTAL).increment(inserted as u64);
        info!(inserted, "vulnerabilities loaded");
        Ok(inserted)
    }

    /// 저장된 취약점 행 수
    pub async fn count(&self, cancel: &CancellationToken) -> Result<u64, VulnStoreError> {
        let conn = self.pool.acquire(cancel).await?;
        tokio::task::spawn_blocking(move || schema::count_vulnerabilities(&conn))
            .await
            .map_err(|e| VulnStoreError::Task(format!("spawn_blocking failed: {e}")))?
    }
}
