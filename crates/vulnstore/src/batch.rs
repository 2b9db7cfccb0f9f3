//! 배치 프로토콜 -- 트랜잭션, statement 등록, 큐잉, 결과 소비
//!
//! 하나의 조회 호출은 다음 순서를 따릅니다.
//!
//! ```text
//! StoreTx::begin -> prepare(name, sql) -> Batch::queue(name, args) x N
//!   -> send_batch(deadline) -> BatchResults::next_cursor() x N -> close() -> commit()
//! ```
//!
//! 큐잉 순서와 소비 순서는 1:1로 대응합니다. 소비되지 않은 커서나 읽지 않은 행이
//! 남아 있으면 [`BatchResults::close`]가 실패하고, 커밋에 도달하지 않은
//! 트랜잭션은 drop 시 롤백됩니다.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rusqlite::types::{FromSql, Value, ValueRef};
use rusqlite::{Connection, ErrorCode, Statement, Transaction, TransactionBehavior};

use crate::error::VulnStoreError;

/// 데드라인 확인 주기 (SQLite VM 명령 수)
const PROGRESS_OPS: i32 = 1000;

/// 트랜잭션에 등록된 statement
#[derive(Debug, Clone)]
struct Registered {
    sql: String,
    param_count: usize,
}

/// 조회 호출 하나가 소유하는 트랜잭션
///
/// statement 등록은 이 트랜잭션 안에서만 유효합니다.
pub struct StoreTx<'c> {
    tx: Transaction<'c>,
    registered: HashMap<String, Registered>,
}

impl<'c> StoreTx<'c> {
    /// 트랜잭션을 시작합니다.
    pub fn begin(conn: &'c mut Connection) -> Result<Self, VulnStoreError> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(|e| VulnStoreError::Begin(e.to_string()))?;
        Ok(Self {
            tx,
            registered: HashMap::new(),
        })
    }

    /// SQL을 컴파일해 검증하고 `name`으로 등록합니다.
    pub fn prepare(&mut self, name: &str, sql: &str) -> Result<(), VulnStoreError> {
        let stmt = self.tx.prepare(sql).map_err(|e| VulnStoreError::Prepare {
            name: name.to_owned(),
            reason: e.to_string(),
        })?;
        let param_count = stmt.parameter_count();
        self.registered.insert(
            name.to_owned(),
            Registered {
                sql: sql.to_owned(),
                param_count,
            },
        );
        Ok(())
    }

    /// 등록된 statement의 바인드 슬롯 수
    pub fn param_count(&self, name: &str) -> Option<usize> {
        self.registered.get(name).map(|r| r.param_count)
    }

    /// 큐잉된 호출을 순서대로 실행하고 결과 집합을 모읍니다.
    ///
    /// `timeout`은 호출자 취소와 무관한 데드라인입니다. 데드라인이 지나면
    /// SQLite 실행이 중단되고 `BatchSend` 에러가 반환됩니다.
    pub fn send_batch(&self, batch: Batch, timeout: Duration) -> Result<BatchResults, VulnStoreError> {
        let deadline = Instant::now() + timeout;
        let _guard = DeadlineGuard::install(&self.tx, deadline);

        let mut compiled: HashMap<&str, Statement<'_>> = HashMap::new();
        let mut sets = Vec::with_capacity(batch.queued.len());

        for (i, queued) in batch.queued.iter().enumerate() {
            let registered = self.registered.get(&queued.name).ok_or_else(|| {
                VulnStoreError::BatchSend(format!(
                    "statement '{}' is not prepared in this transaction",
                    queued.name
                ))
            })?;
            if queued.args.len() != registered.param_count {
                return Err(VulnStoreError::BatchSend(format!(
                    "queued statement {i} ('{}') has {} arguments, expected {}",
                    queued.name,
                    queued.args.len(),
                    registered.param_count
                )));
            }

            let stmt = match compiled.entry(queued.name.as_str()) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    let stmt = self
                        .tx
                        .prepare(&registered.sql)
                        .map_err(|err| send_error(&err, deadline))?;
                    e.insert(stmt)
                }
            };

            sets.push(run_statement(stmt, &queued.args, deadline)?);
        }

        Ok(BatchResults { sets, next: 0 })
    }

    /// 트랜잭션을 커밋합니다.
    pub fn commit(self) -> Result<(), VulnStoreError> {
        self.tx
            .commit()
            .map_err(|e| VulnStoreError::Commit(e.to_string()))
    }
}

fn run_statement(
    stmt: &mut Statement<'_>,
    args: &[Value],
    deadline: Instant,
) -> Result<ResultSet, VulnStoreError> {
    let column_count = stmt.column_count();
    let mut rows = stmt
        .query(rusqlite::params_from_iter(args.iter()))
        .map_err(|e| send_error(&e, deadline))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| send_error(&e, deadline))? {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(
                row.get::<_, Value>(idx)
                    .map_err(|e| send_error(&e, deadline))?,
            );
        }
        out.push(values);
    }

    Ok(ResultSet { rows: out, pos: 0 })
}

fn send_error(err: &rusqlite::Error, deadline: Instant) -> VulnStoreError {
    if err.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) && Instant::now() >= deadline
    {
        VulnStoreError::BatchSend("deadline exceeded".to_owned())
    } else {
        VulnStoreError::BatchSend(err.to_string())
    }
}

/// 배치 실행 동안 progress handler로 데드라인을 강제합니다.
struct DeadlineGuard<'a> {
    conn: &'a Connection,
}

impl<'a> DeadlineGuard<'a> {
    fn install(conn: &'a Connection, deadline: Instant) -> Self {
        conn.progress_handler(PROGRESS_OPS, Some(move || Instant::now() >= deadline));
        Self { conn }
    }
}

impl Drop for DeadlineGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

/// 전송 대기 중인 statement 호출
#[derive(Debug, Clone)]
struct Queued {
    name: String,
    args: Vec<Value>,
}

/// statement 호출 묶음
///
/// 큐잉 순서가 결과 소비 순서입니다.
#[derive(Debug, Default)]
pub struct Batch {
    queued: Vec<Queued>,
}

impl Batch {
    /// 빈 배치를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 예상 크기로 빈 배치를 생성합니다.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queued: Vec::with_capacity(capacity),
        }
    }

    /// 등록된 statement 호출 하나를 큐에 넣습니다.
    pub fn queue(&mut self, name: impl Into<String>, args: Vec<Value>) {
        self.queued.push(Queued {
            name: name.into(),
            args,
        });
    }

    /// 큐잉된 호출 수
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

#[derive(Debug)]
struct ResultSet {
    rows: Vec<Vec<Value>>,
    pos: usize,
}

impl ResultSet {
    fn remaining(&self) -> usize {
        self.rows.len() - self.pos
    }
}

/// 전송된 배치의 결과 집합들
pub struct BatchResults {
    sets: Vec<ResultSet>,
    next: usize,
}

impl BatchResults {
    /// 다음 커서를 꺼냅니다. 모든 커서를 꺼냈으면 `None`입니다.
    pub fn next_cursor(&mut self) -> Option<BatchRows<'_>> {
        let set = self.sets.get_mut(self.next)?;
        self.next += 1;
        Some(BatchRows { set })
    }

    /// 결과 집합 수 (큐잉된 호출 수와 같음)
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// 배치를 닫습니다.
    ///
    /// 꺼내지 않은 커서나 끝까지 읽지 않은 행이 있으면 `BatchClose`를 반환합니다.
    pub fn close(self) -> Result<(), VulnStoreError> {
        if self.next < self.sets.len() {
            return Err(VulnStoreError::BatchClose(format!(
                "{} of {} result sets were never retrieved",
                self.sets.len() - self.next,
                self.sets.len()
            )));
        }
        if let Some((i, set)) = self
            .sets
            .iter()
            .enumerate()
            .find(|(_, s)| s.remaining() > 0)
        {
            return Err(VulnStoreError::BatchClose(format!(
                "result set {i} has {} unread rows",
                set.remaining()
            )));
        }
        Ok(())
    }
}

/// 결과 집합 하나에 대한 커서
pub struct BatchRows<'a> {
    set: &'a mut ResultSet,
}

impl BatchRows<'_> {
    /// 다음 행을 꺼냅니다.
    pub fn next_row(&mut self) -> Option<BatchRow<'_>> {
        let values = self.set.rows.get(self.set.pos)?;
        self.set.pos += 1;
        Some(BatchRow { values })
    }

    /// 남은 행 수
    pub fn remaining(&self) -> usize {
        self.set.remaining()
    }
}

/// 결과 행 하나
pub struct BatchRow<'a> {
    values: &'a [Value],
}

impl BatchRow<'_> {
    /// `idx` 컬럼을 `T`로 변환합니다. 실패 시 `Scan` 에러입니다.
    pub fn get<T: FromSql>(&self, idx: usize) -> Result<T, VulnStoreError> {
        let value = self.values.get(idx).ok_or_else(|| VulnStoreError::Scan {
            column: idx,
            reason: format!("row has only {} columns", self.values.len()),
        })?;
        T::column_result(ValueRef::from(value)).map_err(|e| VulnStoreError::Scan {
            column: idx,
            reason: e.to_string(),
        })
    }

    /// 컬럼 수
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
