//! Subscriber records
//!
//! Every mutation is a single statement followed by the one-row check from
//! [`expect_one_row`]. The only multi-statement mutation is
//! [`SubscriberStore::delete_subscriber_and_credentials`], which runs in one
//! transaction together with the credential cleanup.

use hlrcore_common::constants::{MAX_SERVING_NODE_NUMBER_LEN, MAX_SGSN_ADDRESS_LEN};
use hlrcore_common::{
    is_valid_imsi, is_valid_msisdn, validate_address, AuthDomain, CnDomain, ValidationError,
};
use rusqlite::{named_params, Connection, Row, ToSql};
use tracing::{debug, error, info};

use crate::auc::clear_slot;
use crate::db::{begin, commit};
use crate::error::{expect_one_row, DbError, DbResult};
use crate::schema;

/// A subscriber as stored in the `subscriber` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub id: i64,
    pub imsi: String,
    pub msisdn: Option<String>,
    pub vlr_number: Option<String>,
    pub sgsn_number: Option<String>,
    pub sgsn_address: Option<String>,
    /// Periodic location update timer in seconds
    pub periodic_lu_timer: Option<u32>,
    /// Periodic routing/tracking area update timer in seconds
    pub periodic_rau_tau_timer: Option<u32>,
    /// Network access mode: CS service enabled
    pub nam_cs: bool,
    /// Network access mode: PS service enabled
    pub nam_ps: bool,
    pub lmsi: Option<u32>,
    pub ms_purged_cs: bool,
    pub ms_purged_ps: bool,
}

impl Subscriber {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            imsi: row.get(1)?,
            msisdn: row.get(2)?,
            vlr_number: row.get(3)?,
            sgsn_number: row.get(4)?,
            sgsn_address: row.get(5)?,
            periodic_lu_timer: row.get(6)?,
            periodic_rau_tau_timer: row.get(7)?,
            nam_cs: row.get(8)?,
            nam_ps: row.get(9)?,
            lmsi: row.get(10)?,
            ms_purged_cs: row.get(11)?,
            ms_purged_ps: row.get(12)?,
        })
    }

    /// Whether service is enabled in `domain`.
    pub fn nam(&self, domain: CnDomain) -> bool {
        match domain {
            CnDomain::Cs => self.nam_cs,
            CnDomain::Ps => self.nam_ps,
        }
    }

    /// Whether the subscriber is marked purged in `domain`.
    pub fn purged(&self, domain: CnDomain) -> bool {
        match domain {
            CnDomain::Cs => self.ms_purged_cs,
            CnDomain::Ps => self.ms_purged_ps,
        }
    }
}

fn check_imsi(imsi: &str) -> DbResult<()> {
    if !is_valid_imsi(imsi) {
        return Err(ValidationError::InvalidImsi(imsi.escape_default().to_string()).into());
    }
    Ok(())
}

fn check_msisdn(msisdn: &str) -> DbResult<()> {
    if !is_valid_msisdn(msisdn) {
        return Err(ValidationError::InvalidMsisdn(msisdn.escape_default().to_string()).into());
    }
    Ok(())
}

/// Access to the `subscriber` table.
pub struct SubscriberStore<'a> {
    conn: &'a Connection,
}

impl<'a> SubscriberStore<'a> {
    pub(crate) fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Creates a subscriber with only an IMSI set and returns its id.
    ///
    /// All other fields take their column defaults, and no credentials exist.
    pub fn create(&self, imsi: &str) -> DbResult<i64> {
        check_imsi(imsi)?;

        let what = || format!("create subscriber IMSI={imsi}");
        let mut stmt = self
            .conn
            .prepare_cached(schema::SUBSCR_CREATE)
            .map_err(|e| DbError::from_sql(what(), e))?;
        let id = stmt
            .insert(named_params! { ":imsi": imsi })
            .map_err(|e| DbError::from_sql(what(), e))?;

        info!(imsi = %imsi, subscriber_id = id, "Created subscriber");
        Ok(id)
    }

    /// Deletes a subscriber together with both of its credential slots.
    ///
    /// Runs as one transaction: either the subscriber row and all of its
    /// credential rows are gone, or nothing changed.
    pub fn delete_subscriber_and_credentials(&self, subscriber_id: i64) -> DbResult<()> {
        let what = format!("delete subscriber ID={subscriber_id}");
        let tx = begin(self.conn, &what)?;

        let changed = {
            let mut stmt = tx
                .prepare_cached(schema::DEL_BY_ID)
                .map_err(|e| DbError::from_sql(what.clone(), e))?;
            stmt.execute(named_params! { ":subscriber_id": subscriber_id })
                .map_err(|e| DbError::from_sql(what.clone(), e))?
        };
        // An error return drops `tx`, which rolls back.
        expect_one_row(changed, || format!("{what}: no such subscriber"))?;

        let removed_2g = clear_slot(&tx, subscriber_id, AuthDomain::Gsm)?;
        let removed_3g = clear_slot(&tx, subscriber_id, AuthDomain::Umts)?;

        commit(tx, &what)?;
        info!(
            subscriber_id,
            removed_2g, removed_3g, "Deleted subscriber and credentials"
        );
        Ok(())
    }

    /// Sets the MSISDN of the subscriber with `imsi`.
    pub fn update_msisdn(&self, imsi: &str, msisdn: &str) -> DbResult<()> {
        check_imsi(imsi)?;
        check_msisdn(msisdn)?;

        let what = format!("update MSISDN of IMSI={imsi}");
        self.execute_one(
            schema::SET_MSISDN_BY_IMSI,
            named_params! { ":imsi": imsi, ":msisdn": msisdn },
            &what,
        )?;
        info!(imsi = %imsi, msisdn = %msisdn, "Updated MSISDN");
        Ok(())
    }

    pub fn get_by_imsi(&self, imsi: &str) -> DbResult<Subscriber> {
        check_imsi(imsi)?;
        self.select_one(
            &schema::sel_by_imsi(),
            named_params! { ":imsi": imsi },
            format!("IMSI={imsi}"),
        )
    }

    pub fn get_by_msisdn(&self, msisdn: &str) -> DbResult<Subscriber> {
        check_msisdn(msisdn)?;
        self.select_one(
            &schema::sel_by_msisdn(),
            named_params! { ":msisdn": msisdn },
            format!("MSISDN={msisdn}"),
        )
    }

    pub fn get_by_id(&self, subscriber_id: i64) -> DbResult<Subscriber> {
        self.select_one(
            &schema::sel_by_id(),
            named_params! { ":subscriber_id": subscriber_id },
            format!("ID={subscriber_id}"),
        )
    }

    /// Enables or disables CS or PS service (network access mode).
    pub fn set_service_enabled(&self, imsi: &str, domain: CnDomain, enabled: bool) -> DbResult<()> {
        check_imsi(imsi)?;
        let sql = match domain {
            CnDomain::Cs => schema::UPD_NAM_CS_BY_IMSI,
            CnDomain::Ps => schema::UPD_NAM_PS_BY_IMSI,
        };
        let what = format!("set {domain} NAM of IMSI={imsi}");
        self.execute_one(sql, named_params! { ":imsi": imsi, ":val": enabled }, &what)?;
        info!(
            imsi = %imsi,
            "{} {} service",
            if enabled { "Enabled" } else { "Disabled" },
            domain
        );
        Ok(())
    }

    /// Records the VLR (CS) or SGSN (PS) number currently serving the subscriber.
    pub fn update_serving_node(
        &self,
        subscriber_id: i64,
        number: &str,
        domain: CnDomain,
    ) -> DbResult<()> {
        let (field, sql) = match domain {
            CnDomain::Cs => ("VLR number", schema::UPD_VLR_BY_ID),
            CnDomain::Ps => ("SGSN number", schema::UPD_SGSN_BY_ID),
        };
        validate_address(field, number, MAX_SERVING_NODE_NUMBER_LEN)?;

        let what = format!("update {field} of ID={subscriber_id}");
        self.execute_one(
            sql,
            named_params! { ":subscriber_id": subscriber_id, ":number": number },
            &what,
        )?;
        debug!(subscriber_id, number = %number, "Updated {}", field);
        Ok(())
    }

    /// Records the SGSN address currently serving the subscriber.
    pub fn update_sgsn_address(&self, subscriber_id: i64, address: &str) -> DbResult<()> {
        validate_address("SGSN address", address, MAX_SGSN_ADDRESS_LEN)?;

        let what = format!("update SGSN address of ID={subscriber_id}");
        self.execute_one(
            schema::UPD_SGSN_ADDR_BY_ID,
            named_params! { ":subscriber_id": subscriber_id, ":address": address },
            &what,
        )?;
        debug!(subscriber_id, address = %address, "Updated SGSN address");
        Ok(())
    }

    /// Sets the periodic LU (CS) or RAU/TAU (PS) timer, in seconds.
    pub fn update_periodic_timer(
        &self,
        subscriber_id: i64,
        domain: CnDomain,
        seconds: u32,
    ) -> DbResult<()> {
        let sql = match domain {
            CnDomain::Cs => schema::UPD_LU_TMR_BY_ID,
            CnDomain::Ps => schema::UPD_RAU_TAU_TMR_BY_ID,
        };
        let what = format!("update {domain} periodic timer of ID={subscriber_id}");
        self.execute_one(
            sql,
            named_params! { ":subscriber_id": subscriber_id, ":val": seconds },
            &what,
        )?;
        debug!(subscriber_id, seconds, "Updated {} periodic timer", domain);
        Ok(())
    }

    /// Marks the subscriber purged (or no longer purged) in `domain`.
    pub fn set_purged(&self, imsi: &str, domain: CnDomain, purged: bool) -> DbResult<()> {
        check_imsi(imsi)?;
        let sql = match domain {
            CnDomain::Cs => schema::UPD_PURGE_CS_BY_IMSI,
            CnDomain::Ps => schema::UPD_PURGE_PS_BY_IMSI,
        };
        let what = format!("set {domain} purge flag of IMSI={imsi}");
        self.execute_one(sql, named_params! { ":imsi": imsi, ":val": purged }, &what)?;
        info!(
            imsi = %imsi,
            "{} in {}",
            if purged { "Purged" } else { "Un-purged" },
            domain
        );
        Ok(())
    }

    /// Runs one mutation and applies the one-row rule to its changed count.
    fn execute_one(&self, sql: &str, params: &[(&str, &dyn ToSql)], what: &str) -> DbResult<()> {
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| DbError::from_sql(what, e))?;
        let changed = stmt
            .execute(params)
            .map_err(|e| DbError::from_sql(what, e))?;

        expect_one_row(changed, || format!("{what}: no such subscriber")).map_err(|e| {
            if e.is_not_found() {
                debug!("{}", e);
            }
            e
        })
    }

    /// Shared read-and-decode routine behind all lookups.
    fn select_one(
        &self,
        sql: &str,
        params: &[(&str, &dyn ToSql)],
        key: String,
    ) -> DbResult<Subscriber> {
        let context = || format!("select subscriber {key}");
        let mut stmt = self
            .conn
            .prepare_cached(sql)
            .map_err(|e| DbError::from_sql(context(), e))?;
        let mut rows = stmt
            .query(params)
            .map_err(|e| DbError::from_sql(context(), e))?;

        let subscr = match rows.next().map_err(|e| DbError::from_sql(context(), e))? {
            Some(row) => Subscriber::from_row(row).map_err(|e| DbError::from_sql(context(), e))?,
            None => {
                debug!("No such subscriber: {}", key);
                return Err(DbError::NotFound(format!("no such subscriber: {key}")));
            }
        };

        if rows
            .next()
            .map_err(|e| DbError::from_sql(context(), e))?
            .is_some()
        {
            error!("Lookup of subscriber {} matched more than one row", key);
            return Err(DbError::StorageConsistency(format!(
                "lookup of subscriber {key} matched more than one row"
            )));
        }

        Ok(subscr)
    }
}
