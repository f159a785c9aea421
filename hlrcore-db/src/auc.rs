//! 2G/3G authentication data (`auc_2g` / `auc_3g`)

use hlrcore_common::constants::MAX_SQN;
use hlrcore_common::{
    algorithm_is_compatible, validate_vector, Aud2g, Aud3g, AuthAlgorithm, AuthDomain,
    AuthVector, OpType,
};
use rusqlite::{named_params, Connection, OptionalExtension};
use tracing::{debug, error, info};

use crate::db::{begin, commit};
use crate::error::{expect_one_row, DbError, DbResult};
use crate::schema;

/// Both credential slots of one subscriber as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthData {
    pub aud2g: Option<Aud2g>,
    pub aud3g: Option<Aud3g>,
    /// Current 3G sequence number, present with `aud3g`
    pub sqn: Option<u64>,
}

impl AuthData {
    pub fn is_empty(&self) -> bool {
        self.aud2g.is_none() && self.aud3g.is_none()
    }
}

/// Removes the `domain` row of a subscriber. Returns the number of rows
/// removed, which is 0 or 1.
pub(crate) fn clear_slot(conn: &Connection, subscriber_id: i64, domain: AuthDomain) -> DbResult<usize> {
    let sql = match domain {
        AuthDomain::Gsm => schema::AUC_2G_DELETE,
        AuthDomain::Umts => schema::AUC_3G_DELETE,
    };
    let what = || {
        format!(
            "delete {domain} auth data from {} for subscriber ID={subscriber_id}",
            domain.table()
        )
    };
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| DbError::from_sql(what(), e))?;
    let changed = stmt
        .execute(named_params! { ":subscriber_id": subscriber_id })
        .map_err(|e| DbError::from_sql(what(), e))?;

    if changed > 1 {
        error!("{}: SQL modified {} rows (expected 0 or 1)", what(), changed);
        return Err(DbError::StorageConsistency(format!(
            "{}: SQL modified {changed} rows (expected 0 or 1)",
            what()
        )));
    }
    Ok(changed)
}

fn insert_vector(conn: &Connection, subscriber_id: i64, vector: &AuthVector) -> DbResult<()> {
    let domain = vector.domain();
    let what = format!(
        "insert {domain} auth data into {} for subscriber ID={subscriber_id}",
        domain.table()
    );
    let changed = match vector {
        AuthVector::Gsm(aud) => {
            let ki = aud.ki.to_ascii_lowercase();
            let mut stmt = conn
                .prepare_cached(schema::AUC_2G_INSERT)
                .map_err(|e| DbError::from_sql(what.clone(), e))?;
            stmt.execute(named_params! {
                ":subscriber_id": subscriber_id,
                ":algo_id_2g": aud.algorithm.id(),
                ":ki": ki,
            })
            .map_err(|e| DbError::from_sql(what.clone(), e))?
        }
        AuthVector::Umts(aud) => {
            let k = aud.k.to_ascii_lowercase();
            let key = aud.op_or_opc.to_ascii_lowercase();
            let (op, opc) = match aud.op_type {
                OpType::Op => (Some(key), None),
                OpType::Opc => (None, Some(key)),
            };
            let mut stmt = conn
                .prepare_cached(schema::AUC_3G_INSERT)
                .map_err(|e| DbError::from_sql(what.clone(), e))?;
            stmt.execute(named_params! {
                ":subscriber_id": subscriber_id,
                ":algo_id_3g": aud.algorithm.id(),
                ":k": k,
                ":op": op,
                ":opc": opc,
                ":ind_bitlen": aud.ind_bitlen,
            })
            .map_err(|e| DbError::from_sql(what.clone(), e))?
        }
    };
    expect_one_row(changed, || what.clone())
}

fn stored_algorithm(domain: AuthDomain, id: i64, subscriber_id: i64) -> DbResult<AuthAlgorithm> {
    match AuthAlgorithm::from_id(id) {
        Some(algo) if algo.is_some() && algorithm_is_compatible(domain, algo) => Ok(algo),
        _ => {
            error!(
                subscriber_id,
                "Stored {} algorithm id {} is not usable", domain, id
            );
            Err(DbError::StorageConsistency(format!(
                "subscriber ID={subscriber_id}: invalid {domain} algorithm id {id}"
            )))
        }
    }
}

/// Access to the `auc_2g` and `auc_3g` tables.
///
/// Every operation is scoped to a subscriber id; rows have no lifecycle of
/// their own.
pub struct AucStore<'a> {
    conn: &'a Connection,
}

impl<'a> AucStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Replaces the credential slot named by `vector`'s domain.
    ///
    /// The vector is validated before any statement runs. The existing row,
    /// if any, is removed and the new one inserted in the same transaction,
    /// so at most one row per slot is ever visible. A vector with algorithm
    /// `None` leaves the slot empty; an already-empty slot is not an error.
    pub fn replace_vector(&self, subscriber_id: i64, vector: &AuthVector) -> DbResult<()> {
        validate_vector(vector)?;

        let domain = vector.domain();
        let what = format!("update {domain} auth data for subscriber ID={subscriber_id}");
        let tx = begin(self.conn, &what)?;

        let exists = tx
            .prepare_cached(schema::SUBSCR_EXISTS_BY_ID)
            .and_then(|mut stmt| {
                stmt.query_row(named_params! { ":subscriber_id": subscriber_id }, |_| Ok(()))
                    .optional()
            })
            .map_err(|e| DbError::from_sql(what.clone(), e))?;
        if exists.is_none() {
            debug!("{}: no such subscriber", what);
            return Err(DbError::NotFound(format!("{what}: no such subscriber")));
        }

        let removed = clear_slot(&tx, subscriber_id, domain)?;
        if vector.algorithm().is_some() {
            insert_vector(&tx, subscriber_id, vector)?;
        }
        commit(tx, &what)?;

        info!(
            subscriber_id,
            "{} auth data: {} (replaced {} row)",
            domain,
            vector.algorithm(),
            removed
        );
        Ok(())
    }

    /// Deletes one credential slot. Unlike [`Self::replace_vector`] with a
    /// `None` vector, an empty slot is reported as `NotFound`.
    pub fn delete_vector(&self, subscriber_id: i64, domain: AuthDomain) -> DbResult<()> {
        let removed = clear_slot(self.conn, subscriber_id, domain)?;
        expect_one_row(removed, || {
            format!("no {domain} auth data for subscriber ID={subscriber_id}")
        })?;
        info!(subscriber_id, "Deleted {} auth data", domain);
        Ok(())
    }

    /// Reads both credential slots of a subscriber.
    pub fn get_auth_data(&self, subscriber_id: i64) -> DbResult<AuthData> {
        let mut data = AuthData::default();

        let what = || format!("select 2G auth data for subscriber ID={subscriber_id}");
        let row_2g = self
            .conn
            .prepare_cached(schema::AUC_2G_SELECT)
            .and_then(|mut stmt| {
                stmt.query_row(named_params! { ":subscriber_id": subscriber_id }, |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })
                .optional()
            })
            .map_err(|e| DbError::from_sql(what(), e))?;
        if let Some((algo_id, ki)) = row_2g {
            let algorithm = stored_algorithm(AuthDomain::Gsm, algo_id, subscriber_id)?;
            data.aud2g = Some(Aud2g::new(algorithm, ki));
        }

        let what = || format!("select 3G auth data for subscriber ID={subscriber_id}");
        let row_3g = self
            .conn
            .prepare_cached(schema::AUC_3G_SELECT)
            .and_then(|mut stmt| {
                stmt.query_row(named_params! { ":subscriber_id": subscriber_id }, |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, u8>(5)?,
                    ))
                })
                .optional()
            })
            .map_err(|e| DbError::from_sql(what(), e))?;
        if let Some((algo_id, k, op, opc, sqn, ind_bitlen)) = row_3g {
            let algorithm = stored_algorithm(AuthDomain::Umts, algo_id, subscriber_id)?;
            let (op_or_opc, op_type) = match (op, opc) {
                (Some(op), None) => (op, OpType::Op),
                (None, Some(opc)) => (opc, OpType::Opc),
                _ => {
                    error!(subscriber_id, "3G auth data must hold exactly one of OP and OPC");
                    return Err(DbError::StorageConsistency(format!(
                        "subscriber ID={subscriber_id}: 3G auth data must hold exactly one of OP and OPC"
                    )));
                }
            };
            let sqn = u64::try_from(sqn).map_err(|_| {
                DbError::StorageConsistency(format!(
                    "subscriber ID={subscriber_id}: negative SQN {sqn}"
                ))
            })?;
            data.aud3g =
                Some(Aud3g::new(algorithm, k, op_or_opc, op_type).with_ind_bitlen(ind_bitlen));
            data.sqn = Some(sqn);
        }

        Ok(data)
    }

    /// Stores the 3G sequence number of a subscriber.
    pub fn update_sqn(&self, subscriber_id: i64, sqn: u64) -> DbResult<()> {
        if sqn > MAX_SQN {
            return Err(DbError::InvalidInput(format!(
                "SQN {sqn} exceeds 48 bits"
            )));
        }

        let what = format!("update SQN for subscriber ID={subscriber_id}");
        let mut stmt = self
            .conn
            .prepare_cached(schema::AUC_3G_UPDATE_SQN)
            .map_err(|e| DbError::from_sql(what.clone(), e))?;
        // MAX_SQN fits in i64.
        let changed = stmt
            .execute(named_params! { ":subscriber_id": subscriber_id, ":sqn": sqn as i64 })
            .map_err(|e| DbError::from_sql(what.clone(), e))?;
        expect_one_row(changed, || format!("{what}: no 3G auth data"))?;

        debug!(subscriber_id, sqn, "Updated SQN");
        Ok(())
    }
}
