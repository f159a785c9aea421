//! Subscriber and authentication data store for hlrcore
//!
//! SQLite-backed storage of subscriber records and their 2G/3G credential
//! sets. Inputs are validated with `hlrcore_common` before any statement
//! runs, and every single-row mutation checks the changed-row count the
//! engine reports for that statement.
//!
//! ```no_run
//! use hlrcore_common::DbConfig;
//! use hlrcore_db::HlrDb;
//!
//! let db = HlrDb::open(&DbConfig::new("/var/lib/hlrcore/hlr.db"))?;
//! let id = db.subscribers().create("901700000000001")?;
//! db.subscribers().update_msisdn("901700000000001", "4917012345")?;
//! db.subscribers().delete_subscriber_and_credentials(id)?;
//! # Ok::<(), hlrcore_db::DbError>(())
//! ```

pub mod auc;
pub mod db;
pub mod error;
mod schema;
pub mod subscriber;

pub use auc::{AucStore, AuthData};
pub use db::HlrDb;
pub use error::{DbError, DbResult};
pub use subscriber::{Subscriber, SubscriberStore};
