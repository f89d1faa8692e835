//! The engine facade: one entry point per operation.

use std::sync::Arc;

use crate::error::Result;
use crate::exec::backend::{BackendConnection, ConnectionProvider};
use crate::exec::config::EngineConfig;
use crate::exec::stats::{QueryStats, StatsSnapshot};
use crate::exec::transaction::Transaction;
use crate::exec::{delete, insert, read, update};
use crate::model::MetaInstance;
use crate::query::inputs::{
    AggregateInput, AggregateOutput, CountInput, CountOutput, DeleteInput, DeleteOutput,
    InsertInput, InsertOutput, QueryInput, QueryOutput, UpdateInput, UpdateOutput,
};
use crate::session::Session;
use crate::sql::dialect::Dialect;

/// Compiles and executes metadata-described requests against one backend.
///
/// The engine is freely shareable across threads: the metadata instance is
/// immutable, sessions are per-call, statistics counters are atomic, and
/// every operation either borrows a [`Transaction`]'s connection or checks
/// its own out of the provider. Operations without a transaction auto-commit
/// statement by statement, which is what gives batch mutations their
/// partial-success semantics.
pub struct Engine {
    meta: Arc<MetaInstance>,
    provider: Arc<dyn ConnectionProvider>,
    dialect: Arc<dyn Dialect>,
    config: EngineConfig,
    stats: QueryStats,
}

impl Engine {
    /// Creates an engine over the given metadata and connection provider.
    pub fn new(meta: Arc<MetaInstance>, provider: Arc<dyn ConnectionProvider>) -> Self {
        let dialect = provider.dialect();
        Self {
            meta,
            provider,
            dialect,
            config: EngineConfig::default(),
            stats: QueryStats::new(),
        }
    }

    /// Overrides the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The metadata instance this engine operates over.
    pub fn meta(&self) -> &MetaInstance {
        &self.meta
    }

    /// Copies the execution statistics counters.
    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Zeroes the execution statistics counters.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Opens a unit of work on its own connection.
    pub fn open_transaction(&self) -> Result<Transaction> {
        Transaction::open(self.provider.as_ref())
    }

    /// Runs a record query.
    pub fn query(
        &self,
        session: &Session,
        input: &QueryInput,
        tx: Option<&Transaction>,
    ) -> Result<QueryOutput> {
        self.with_connection(tx, |conn| {
            read::query(&self.meta, self.dialect.as_ref(), session, input, conn, &self.stats)
        })
    }

    /// Counts matching rows.
    pub fn count(
        &self,
        session: &Session,
        input: &CountInput,
        tx: Option<&Transaction>,
    ) -> Result<CountOutput> {
        self.with_connection(tx, |conn| {
            read::count(&self.meta, self.dialect.as_ref(), session, input, conn, &self.stats)
        })
    }

    /// Runs an aggregate query.
    pub fn aggregate(
        &self,
        session: &Session,
        input: &AggregateInput,
        tx: Option<&Transaction>,
    ) -> Result<AggregateOutput> {
        self.with_connection(tx, |conn| {
            read::aggregate(&self.meta, self.dialect.as_ref(), session, input, conn, &self.stats)
        })
    }

    /// Inserts records, nested associations included.
    pub fn insert(
        &self,
        session: &Session,
        input: InsertInput,
        tx: Option<&Transaction>,
    ) -> Result<InsertOutput> {
        self.with_connection(tx, |conn| {
            insert::insert(
                &self.meta,
                self.dialect.as_ref(),
                session,
                &self.config,
                conn,
                &self.stats,
                input,
            )
        })
    }

    /// Updates records by primary key.
    pub fn update(
        &self,
        session: &Session,
        input: UpdateInput,
        tx: Option<&Transaction>,
    ) -> Result<UpdateOutput> {
        self.with_connection(tx, |conn| {
            update::update(
                &self.meta,
                self.dialect.as_ref(),
                session,
                &self.config,
                conn,
                &self.stats,
                input,
            )
        })
    }

    /// Deletes rows by primary key.
    pub fn delete(
        &self,
        session: &Session,
        input: DeleteInput,
        tx: Option<&Transaction>,
    ) -> Result<DeleteOutput> {
        self.with_connection(tx, |conn| {
            delete::delete(
                &self.meta,
                self.dialect.as_ref(),
                session,
                &self.config,
                conn,
                &self.stats,
                input,
            )
        })
    }

    fn with_connection<R>(
        &self,
        tx: Option<&Transaction>,
        f: impl FnOnce(&mut dyn BackendConnection) -> Result<R>,
    ) -> Result<R> {
        match tx {
            Some(tx) => tx.with_connection(f),
            None => {
                let mut conn = self.provider.connection()?;
                f(conn.as_mut())
            }
        }
    }
}
