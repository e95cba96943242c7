use std::time::Duration;

use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use tokio::{sync::OwnedMutexGuard, time::timeout};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, locks::SafeLocks};

mod banks;
mod list;
mod reconcile;
mod record;
mod replay;
mod safes;
mod summary;

pub use list::SafeTxFilter;
pub use reconcile::SafeReconciliation;
pub use summary::{InflowTotals, LedgerLine, OutflowTotals, PeriodSummary};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    locks: SafeLocks,
    lock_timeout: Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Opens a unit of work spanning several writes.
    ///
    /// Ledger writes made through [`Engine::record_transaction_in`] join the
    /// same database transaction, and so can writes of the caller's own
    /// aggregates through [`UnitOfWork::connection`]. Nothing is visible until
    /// [`UnitOfWork::commit`]; dropping the unit of work rolls everything back.
    ///
    /// Waits at most the engine's lock timeout for a free connection, then
    /// fails with [`EngineError::ConcurrencyConflict`].
    pub async fn begin(&self) -> ResultEngine<UnitOfWork> {
        let db_tx = timeout(self.lock_timeout, self.database.begin())
            .await
            .map_err(|_| {
                EngineError::ConcurrencyConflict("database is busy, retry later".to_string())
            })??;
        Ok(UnitOfWork {
            db_tx,
            held: Vec::new(),
        })
    }

    /// Opens a unit of work that already holds the write lock of `safe_id`.
    ///
    /// The safe lock is taken before the connection.
    async fn begin_locked(&self, safe_id: Uuid) -> ResultEngine<UnitOfWork> {
        let guard = self.locks.acquire(safe_id, self.lock_timeout).await?;
        let mut uow = self.begin().await?;
        uow.held.push((safe_id, guard));
        Ok(uow)
    }

    /// Takes the write lock of `safe_id` for the lifetime of `uow`.
    async fn lock_safe(&self, uow: &mut UnitOfWork, safe_id: Uuid) -> ResultEngine<()> {
        if uow.holds(safe_id) {
            return Ok(());
        }
        let guard = self.locks.acquire(safe_id, self.lock_timeout).await?;
        uow.held.push((safe_id, guard));
        Ok(())
    }
}

/// Explicit transactional context for cross-aggregate writes.
#[derive(Debug)]
pub struct UnitOfWork {
    db_tx: DatabaseTransaction,
    held: Vec<(Uuid, OwnedMutexGuard<()>)>,
}

impl UnitOfWork {
    /// Connection bound to this unit of work.
    pub fn connection(&self) -> &DatabaseTransaction {
        &self.db_tx
    }

    fn holds(&self, safe_id: Uuid) -> bool {
        self.held.iter().any(|(id, _)| *id == safe_id)
    }

    /// Commits every write, then releases the safe locks.
    pub async fn commit(self) -> ResultEngine<()> {
        let Self { db_tx, held } = self;
        db_tx.commit().await?;
        drop(held);
        Ok(())
    }

    /// Discards every write, then releases the safe locks.
    pub async fn rollback(self) -> ResultEngine<()> {
        let Self { db_tx, held } = self;
        db_tx.rollback().await?;
        drop(held);
        Ok(())
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    lock_timeout: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How long a writer waits for a busy safe before giving up.
    pub fn lock_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            locks: SafeLocks::default(),
            lock_timeout: self.lock_timeout.unwrap_or(DEFAULT_LOCK_TIMEOUT),
        })
    }
}
