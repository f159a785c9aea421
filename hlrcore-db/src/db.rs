//! Database handle and schema bootstrap

use std::path::Path;

use hlrcore_common::DbConfig;
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::auc::AucStore;
use crate::error::{DbError, DbResult};
use crate::schema::SCHEMA;
use crate::subscriber::SubscriberStore;

/// HLR database context.
///
/// Owns the SQLite connection. Subscriber and credential operations are
/// reached through [`HlrDb::subscribers`] and [`HlrDb::auc`].
pub struct HlrDb {
    conn: Connection,
}

impl HlrDb {
    /// Opens (or creates) the database file and installs the schema.
    pub fn open(config: &DbConfig) -> DbResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&config.path, flags)
            .map_err(|e| DbError::from_sql(format!("open {}", config.path.display()), e))?;

        conn.busy_timeout(config.busy_timeout())
            .map_err(|e| DbError::from_sql("set busy_timeout", e))?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| DbError::from_sql("set journal_mode", e))?;
        debug!("journal_mode = {}", mode);

        let db = Self::with_connection(conn)?;
        info!("Opened HLR database {}", config.path.display());
        Ok(db)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DbError::from_sql("open :memory:", e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| DbError::from_sql("create schema", e))?;
        Ok(Self { conn })
    }

    /// Database file path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.conn.path().filter(|p| !p.is_empty()).map(Path::new)
    }

    pub fn subscribers(&self) -> SubscriberStore<'_> {
        SubscriberStore::new(&self.conn)
    }

    pub fn auc(&self) -> AucStore<'_> {
        AucStore::new(&self.conn)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Starts a write transaction on a shared connection.
///
/// `IMMEDIATE` takes the write lock up front so the row-count checks inside
/// the transaction only ever observe this transaction's own statements.
pub(crate) fn begin<'c>(conn: &'c Connection, what: &str) -> DbResult<Transaction<'c>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| DbError::from_sql(format!("{what}: begin transaction"), e))
}

pub(crate) fn commit(tx: Transaction<'_>, what: &str) -> DbResult<()> {
    tx.commit()
        .map_err(|e| DbError::from_sql(format!("{what}: commit"), e))
}
