//! `vuln` 테이블 스키마와 적재
//!
//! 매칭 쿼리가 읽는 테이블을 생성하고, 취약점 목록을 한 트랜잭션으로 적재합니다.

use rusqlite::{Connection, params};
use tracing::debug;

use ironpost_core::types::Vulnerability;

use crate::error::VulnStoreError;

/// 테이블 및 인덱스 생성 DDL
const CREATE_VULN_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS vuln (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        name                    TEXT NOT NULL,
        description             TEXT DEFAULT '',
        links                   TEXT DEFAULT '',
        severity                TEXT DEFAULT '',
        package_name            TEXT NOT NULL,
        package_version         TEXT DEFAULT '',
        package_kind            TEXT DEFAULT '',
        dist_id                 TEXT DEFAULT '',
        dist_name               TEXT DEFAULT '',
        dist_version            TEXT DEFAULT '',
        dist_version_code_name  TEXT DEFAULT '',
        dist_version_id         TEXT DEFAULT '',
        dist_arch               TEXT DEFAULT '',
        dist_cpe                TEXT DEFAULT '',
        dist_pretty_name        TEXT DEFAULT '',
        repo_name               TEXT DEFAULT '',
        repo_key                TEXT DEFAULT '',
        repo_uri                TEXT DEFAULT '',
        fixed_in_version        TEXT DEFAULT ''
    );

    CREATE INDEX IF NOT EXISTS idx_vuln_lookup
        ON vuln(package_name, dist_id, dist_version_id);
";

const INSERT_VULN: &str = "
    INSERT INTO vuln (
        id, name, description, links, severity,
        package_name, package_version, package_kind,
        dist_id, dist_name, dist_version, dist_version_code_name,
        dist_version_id, dist_arch, dist_cpe, dist_pretty_name,
        repo_name, repo_key, repo_uri, fixed_in_version
    ) VALUES (
        ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
        ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20
    )";

/// `vuln` 테이블과 조회 인덱스가 없으면 생성합니다.
pub fn ensure_schema(conn: &Connection) -> Result<(), VulnStoreError> {
    conn.execute_batch(CREATE_VULN_TABLE)
        .map_err(|e| VulnStoreError::Schema(e.to_string()))
}

/// 취약점 목록을 하나의 트랜잭션으로 적재하고 적재된 행 수를 반환합니다.
///
/// `id`가 0이면 데이터베이스가 행 ID를 부여합니다.
pub fn insert_vulnerabilities(
    conn: &mut Connection,
    vulns: &[Vulnerability],
) -> Result<usize, VulnStoreError> {
    let tx = conn
        .transaction()
        .map_err(|e| VulnStoreError::Schema(e.to_string()))?;
    let mut inserted = 0;
    {
        let mut stmt = tx
            .prepare(INSERT_VULN)
            .map_err(|e| VulnStoreError::Schema(e.to_string()))?;
        for v in vulns {
            let id = (v.id != 0).then_some(v.id);
            inserted += stmt
                .execute(params![
                    id,
                    v.name,
                    v.description,
                    v.links,
                    v.severity,
                    v.package.name,
                    v.package.version,
                    v.package.kind,
                    v.dist.did,
                    v.dist.name,
                    v.dist.version,
                    v.dist.version_code_name,
                    v.dist.version_id,
                    v.dist.arch,
                    v.dist.cpe,
                    v.dist.pretty_name,
                    v.repo.name,
                    v.repo.key,
                    v.repo.uri,
                    v.fixed_in_version,
                ])
                .map_err(|e| VulnStoreError::Schema(format!("insert '{}': {e}", v.name)))?;
        }
    }
    tx.commit()
        .map_err(|e| VulnStoreError::Schema(e.to_string()))?;
    debug!(inserted, "vulnerabilities inserted");
    Ok(inserted)
}

/// 저장된 취약점 행 수
pub fn count_vulnerabilities(conn: &Connection) -> Result<u64, VulnStoreError> {
    conn.query_row("SELECT count(*) FROM vuln", [], |row| row.get::<_, i64>(0))
        .map(|n| n.max(0) as u64)
        .map_err(|e| VulnStoreError::Schema(e.to_string()))
}
