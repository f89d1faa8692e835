//! Unit-of-work coordinator.

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::exec::backend::{BackendConnection, ConnectionProvider};

/// One unit of work bound to one backend connection.
///
/// Every engine operation handed this transaction executes on the same
/// connection and sees its uncommitted writes; operations without it use an
/// independent auto-committed connection and do not. Nested transactions are
/// not supported — opening a second transaction yields an independent unit
/// of work.
///
/// A transaction dropped while still active is rolled back and logged; after
/// a transport error the transaction is in an indeterminate state and the
/// caller must roll it back explicitly.
pub struct Transaction {
    conn: Mutex<Option<Box<dyn BackendConnection>>>,
}

impl Transaction {
    pub(crate) fn open(provider: &dyn ConnectionProvider) -> Result<Self> {
        let mut conn = provider.connection()?;
        conn.begin()?;
        debug!("transaction started");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Runs `f` on the transaction's connection.
    pub(crate) fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut dyn BackendConnection) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(EngineError::TransactionInactive)?;
        f(conn.as_mut())
    }

    /// Commits the unit of work and releases its connection.
    pub fn commit(self) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .take()
            .ok_or(EngineError::TransactionInactive)?;
        conn.commit()?;
        info!("transaction committed");
        Ok(())
    }

    /// Discards the unit of work and releases its connection.
    pub fn rollback(self) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .take()
            .ok_or(EngineError::TransactionInactive)?;
        conn.rollback()?;
        warn!("transaction rolled back");
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.lock().take() {
            warn!("transaction dropped without commit or rollback; rolling back");
            let _ = conn.rollback();
        }
    }
}
