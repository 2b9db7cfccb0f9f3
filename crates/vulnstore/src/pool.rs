//! SQLite 커넥션 풀
//!
//! 고정 크기의 커넥션을 미리 열어 두고 `tokio` 세마포어로 동시 사용 수를 제한합니다.
//! 커넥션 획득만 호출자 취소를 관찰하며, 획득한 커넥션은 [`PooledConn`]이
//! drop될 때 풀로 반환됩니다.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::VulnStoreError;

/// 커넥션 풀
///
/// `Clone`은 같은 풀을 공유하는 핸들을 만듭니다.
#[derive(Clone)]
pub struct ConnPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    path: PathBuf,
    size: usize,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
}

impl ConnPool {
    /// 데이터베이스 파일에 `size`개의 커넥션을 엽니다.
    ///
    /// 각 커넥션에 busy_timeout과 WAL 모드를 적용합니다.
    pub fn open(
        path: impl AsRef<Path>,
        size: usize,
        busy_timeout: Duration,
    ) -> Result<Self, VulnStoreError> {
        let path = path.as_ref().to_path_buf();
        let size = size.max(1);

        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            connections.push(open_connection(&path, busy_timeout)?);
        }
        debug!(path = %path.display(), size, "connection pool opened");

        Ok(Self {
            inner: Arc::new(PoolInner {
                path,
                size,
                idle: Mutex::new(connections),
                permits: Arc::new(Semaphore::new(size)),
            }),
        })
    }

    /// 커넥션 하나를 획득합니다.
    ///
    /// 풀이 비어 있으면 반환될 때까지 대기합니다.
    /// 대기 중 `cancel`이 취소되면 `Cancelled { stage: "acquire" }`를 반환합니다.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<PooledConn, VulnStoreError> {
        if cancel.is_cancelled() {
            return Err(VulnStoreError::Cancelled { stage: "acquire" });
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(VulnStoreError::Cancelled { stage: "acquire" });
            }
            permit = Arc::clone(&self.inner.permits).acquire_owned() => {
                permit.map_err(|e| VulnStoreError::Acquire(e.to_string()))?
            }
        };

        let conn = self
            .inner
            .idle
            .lock()
            .map_err(|e| VulnStoreError::Acquire(format!("pool lock poisoned: {e}")))?
            .pop()
            .ok_or_else(|| VulnStoreError::Acquire("no idle connection for permit".to_owned()))?;

        Ok(PooledConn {
            conn: Some(conn),
            pool: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// 풀 크기
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// 현재 사용 가능한 커넥션 수
    pub fn available(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// 데이터베이스 경로
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

/// 풀에서 빌린 커넥션
///
/// drop 시 커넥션을 풀에 반환한 뒤 permit을 해제합니다.
pub struct PooledConn {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConn {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // conn은 drop 전까지 항상 Some
        match &self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl DerefMut for PooledConn {
    fn deref_mut(&mut self) -> &mut Connection {
        match &mut self.conn {
            Some(conn) => conn,
            None => unreachable!("pooled connection used after release"),
        }
    }
}

impl Drop for PooledConn {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.push(conn);
            }
        }
    }
}

fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection, VulnStoreError> {
    let conn = Connection::open(path)
        .map_err(|e| VulnStoreError::Acquire(format!("open {}: {e}", path.display())))?;
    conn.busy_timeout(busy_timeout)
        .map_err(|e| VulnStoreError::Acquire(format!("busy_timeout: {e}")))?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .map_err(|e| VulnStoreError::Acquire(format!("journal_mode: {e}")))?;
    conn.execute_batch("PRAGMA synchronous = NORMAL;")
        .map_err(|e| VulnStoreError::Acquire(format!("synchronous: {e}")))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_pool(size: usize) -> (tempfile::TempDir, ConnPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = ConnPool::open(dir.path().join("vuln.db"), size, Duration::from_millis(100))
            .unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn acquire_and_release_returns_permit() {
        let (_dir, pool) = temp_pool(2);
        let cancel = CancellationToken::new();
        assert_eq!(pool.available(), 2);

        let conn = pool.acquire(&cancel).await.unwrap();
        assert_eq!(pool.available(), 1);
        let one: i64 = conn.query_row("SELECT 1", [], |r| r.get(0)).unwrap();
        assert_eq!(one, 1);

        drop(conn);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn acquire_honours_cancellation_when_exhausted() {
        let (_dir, pool) = temp_pool(1);
        let cancel = CancellationToken::new();
        let _held = pool.acquire(&cancel).await.unwrap();

        let waiter_cancel = CancellationToken::new();
        let pool2 = pool.clone();
        let token = waiter_cancel.clone();
        let waiter = tokio::spawn(async move { pool2.acquire(&token).await.map(|_| ()) });

        waiter_cancel.cancel();
        let result = waiter.await.unwrap();
        assert!(matches!(
            result,
            Err(VulnStoreError::Cancelled { stage: "acquire" })
        ));
    }

    #[tokio::test]
    async fn acquire_with_already_cancelled_token_fails_fast() {
        let (_dir, pool) = temp_pool(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(pool.acquire(&cancel).await.is_err());
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn connections_use_wal_mode() {
        let (_dir, pool) = temp_pool(1);
        let conn = pool.acquire(&CancellationToken::new()).await.unwrap();
        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert!(mode.eq_ignore_ascii_case("wal"));
    }

    #[test]
    fn zero_size_is_clamped_to_one() {
        let (_dir, pool) = temp_pool(0);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn open_fails_for_missing_directory() {
        let result = ConnPool::open(
            "/nonexistent/ironpost/dir/vuln.db",
            1,
            Duration::from_millis(10),
        );
        assert!(matches!(result, Err(VulnStoreError::Acquire(_))));
    }
}
