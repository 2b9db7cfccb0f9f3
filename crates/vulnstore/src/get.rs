//! 배치 실행기와 결과 조립기
//!
//! 레코드마다 하나의 statement 호출을 큐잉하고, 큐잉 순서대로 결과 커서를
//! 소비하여 패키지 식별자 기준의 매핑을 만듭니다. 어떤 단계든 실패하면
//! 트랜잭션은 롤백되고 부분 결과는 반환되지 않습니다.

use std::collections::HashMap;
use std::time::Duration;

use ironpost_core::metrics as m;
use ironpost_core::types::{Distribution, IndexRecord, Package, Repository, Vulnerability};
use rusqlite::Connection;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::batch::{Batch, BatchResults, BatchRow, StoreTx};
use crate::error::VulnStoreError;
use crate::query::BuiltQuery;

/// 패키지 식별자 -> 취약점 목록
pub type VulnMap = HashMap<i64, Vec<Vulnerability>>;

/// 한 번의 조회를 하나의 트랜잭션 안에서 실행합니다.
///
/// 취소는 트랜잭션 시작 전과 statement 준비 전에만 관찰합니다.
/// 준비가 끝난 뒤에는 `deadline`만 적용됩니다.
pub(crate) fn execute(
    conn: &mut Connection,
    records: &[IndexRecord],
    built: &BuiltQuery,
    name: &str,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<VulnMap, VulnStoreError> {
    if cancel.is_cancelled() {
        return Err(VulnStoreError::Cancelled { stage: "begin" });
    }
    let mut tx = StoreTx::begin(conn)?;
    prepare(&mut tx, built, name, cancel)?;
    send_and_assemble(tx, records, built, name, deadline)
}

/// 취소되지 않았으면 조회 statement를 트랜잭션에 등록합니다.
fn prepare(
    tx: &mut StoreTx<'_>,
    built: &BuiltQuery,
    name: &str,
    cancel: &CancellationToken,
) -> Result<(), VulnStoreError> {
    if cancel.is_cancelled() {
        return Err(VulnStoreError::Cancelled { stage: "prepare" });
    }
    tx.prepare(name, &built.sql)
}

/// 배치를 보내고 결과를 조립한 뒤 커밋합니다. 호출자 취소는 보지 않습니다.
fn send_and_assemble(
    tx: StoreTx<'_>,
    records: &[IndexRecord],
    built: &BuiltQuery,
    name: &str,
    deadline: Duration,
) -> Result<VulnMap, VulnStoreError> {
    let mut batch = Batch::with_capacity(records.len());
    for record in records {
        batch.queue(name, built.bind_args(record));
    }
    debug!(
        queued = batch.len(),
        deadline_secs = deadline.as_secs_f64(),
        "sending batch"
    );
    metrics::counter!(m::VULNSTORE_RECORDS_QUERIED_TOTAL)
        .increment(records.len() as u64);

    let mut results = tx.send_batch(batch, deadline)?;
    let mapping = assemble(records, &mut results)?;
    results.close()?;
    tx.commit()?;

    Ok(mapping)
}

/// 큐잉 순서대로 커서를 하나씩 꺼내 매핑을 만듭니다.
///
/// 같은 패키지 식별자를 가진 레코드들의 결과는 하나의 목록에
/// 큐잉 순서대로 이어 붙습니다. 아무 행도 없는 레코드는 키를 만들지 않습니다.
pub(crate) fn assemble(
    records: &[IndexRecord],
    results: &mut BatchResults,
) -> Result<VulnMap, VulnStoreError> {
    let mut mapping = VulnMap::new();

    for (i, record) in records.iter().enumerate() {
        let mut cursor = results.next_cursor().ok_or_else(|| {
            VulnStoreError::BatchProtocol(format!(
                "no result set for queued statement {i} of {}",
                records.len()
            ))
        })?;

        while let Some(row) = cursor.next_row() {
            let vuln = scan_vulnerability(&row)?;
            mapping.entry(record.package_id()).or_default().push(vuln);
        }
    }

    Ok(mapping)
}

/// 행 하나를 독립적으로 소유하는 [`Vulnerability`]로 변환합니다.
///
/// 컬럼 순서는 [`SCAN_COLUMNS`](crate::query::SCAN_COLUMNS)를 따릅니다.
fn scan_vulnerability(row: &BatchRow<'_>) -> Result<Vulnerability, VulnStoreError> {
    Ok(Vulnerability {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        links: row.get(3)?,
        severity: row.get(4)?,
        package: Package {
            name: row.get(5)?,
            version: row.get(6)?,
            kind: row.get(7)?,
            ..Default::default()
        },
        dist: Distribution {
            did: row.get(8)?,
            name: row.get(9)?,
            version: row.get(10)?,
            version_code_name: row.get(11)?,
            version_id: row.get(12)?,
            arch: row.get(13)?,
            cpe: row.get(14)?,
            pretty_name: row.get(18)?,
        },
        repo: Repository {
            name: row.get(15)?,
            key: row.get(16)?,
            uri: row.get(17)?,
        },
        fixed_in_version: row.get(19)?,
    })
}
