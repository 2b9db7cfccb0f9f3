//! 쿼리 빌더 -- matcher 집합으로부터 정규 매칭 쿼리 생성
//!
//! 같은 matcher *집합*은 요청 순서나 중복과 관계없이 바이트 단위로 동일한
//! SQL을 만듭니다. 덕분에 statement 이름([`Fingerprint`](crate::fingerprint::Fingerprint))이
//! 안정적으로 유지됩니다.
//!
//! # 생성되는 쿼리 형태
//!
//! ```text
//! SELECT <SCAN_COLUMNS> FROM vuln
//! WHERE (package_name = ?1 OR package_name = ?2)
//!   AND dist_id = ?3
//!   AND dist_version_id = ?4
//! ```
//!
//! `?1`은 소스 패키지 이름, `?2`는 패키지 이름이며
//! 이후 바인드 슬롯은 정규 순서의 matcher 값입니다.

use std::fmt::Write as _;

use ironpost_core::types::IndexRecord;
use rusqlite::types::Value;

use crate::error::VulnStoreError;
use crate::matcher::Matcher;

/// 결과 행의 컬럼 순서. 행 스캔은 이 순서를 그대로 따릅니다.
pub const SCAN_COLUMNS: [&str; 20] = [
    "id",
    "name",
    "description",
    "links",
    "severity",
    "package_name",
    "package_version",
    "package_kind",
    "dist_id",
    "dist_name",
    "dist_version",
    "dist_version_code_name",
    "dist_version_id",
    "dist_arch",
    "dist_cpe",
    "repo_name",
    "repo_key",
    "repo_uri",
    "dist_pretty_name",
    "fixed_in_version",
];

/// 패키지 이름 조건에 쓰이는 선행 바인드 슬롯 수
const LEADING_BINDS: usize = 2;

/// 빌드된 쿼리
///
/// `matchers`는 중복이 제거된 정규 순서이며, WHERE 절의 바인드 순서와 같습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    /// 파라미터화된 SQL 텍스트
    pub sql: String,
    /// WHERE 절에 포함된 matcher (정규 순서)
    pub matchers: Vec<Matcher>,
}

impl BuiltQuery {
    /// 레코드 하나에 대한 바인드 인자 벡터를 만듭니다.
    ///
    /// `[소스 패키지 이름, 패키지 이름, matcher 값...]` 순서입니다.
    /// 소스 패키지가 없으면 빈 문자열을 바인딩합니다.
    pub fn bind_args(&self, record: &IndexRecord) -> Vec<Value> {
        let mut args = Vec::with_capacity(self.param_count());
        args.push(Value::Text(record.package.source_name().to_owned()));
        args.push(Value::Text(record.package.name.clone()));
        args.extend(
            self.matchers
                .iter()
                .map(|m| Value::Text(m.value_of(record).to_owned())),
        );
        args
    }

    /// 바인드 슬롯 수
    pub fn param_count(&self) -> usize {
        LEADING_BINDS + self.matchers.len()
    }
}

/// matcher 목록으로 정규 쿼리를 빌드합니다.
///
/// 빈 목록도 허용되며, 이 경우 패키지 이름만으로 매칭합니다.
pub fn build(matchers: &[Matcher]) -> BuiltQuery {
    let mut deduped = matchers.to_vec();
    deduped.sort_unstable();
    deduped.dedup();

    let mut sql = String::with_capacity(512);
    sql.push_str("SELECT ");
    sql.push_str(&SCAN_COLUMNS.join(", "));
    sql.push_str(" FROM vuln WHERE (package_name = ?1 OR package_name = ?2)");
    for (i, m) in deduped.iter().enumerate() {
        // String에 대한 write!는 실패하지 않음
        let _ = write!(sql, " AND {} = ?{}", m.column(), LEADING_BINDS + i + 1);
    }

    BuiltQuery {
        sql,
        matchers: deduped,
    }
}

/// matcher 이름 목록으로 쿼리를 빌드합니다.
///
/// 어휘에 없는 이름이 있으면 `UnknownMatcher`를 반환합니다.
pub fn build_from_names<S: AsRef<str>>(names: &[S]) -> Result<BuiltQuery, VulnStoreError> {
    let matchers = Matcher::parse_all(names)?;
    Ok(build(&matchers))
}
