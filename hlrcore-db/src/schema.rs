//! HLR database schema
//!
//! `subscriber_id` is the primary key of both credential tables, so each
//! subscriber has at most one 2G and one 3G row.

pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS subscriber (
    id                   INTEGER PRIMARY KEY,
    imsi                 VARCHAR(15) UNIQUE NOT NULL,
    msisdn               VARCHAR(15) UNIQUE,
    vlr_number           VARCHAR(31),
    sgsn_number          VARCHAR(31),
    sgsn_address         VARCHAR(15),
    periodic_lu_tmr      INTEGER,
    periodic_rau_tau_tmr INTEGER,
    nam_cs               BOOLEAN NOT NULL DEFAULT 1,
    nam_ps               BOOLEAN NOT NULL DEFAULT 1,
    lmsi                 INTEGER,
    ms_purged_cs         BOOLEAN NOT NULL DEFAULT 0,
    ms_purged_ps         BOOLEAN NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS auc_2g (
    subscriber_id INTEGER PRIMARY KEY,
    algo_id_2g    INTEGER NOT NULL,
    ki            VARCHAR(32) NOT NULL
);

CREATE TABLE IF NOT EXISTS auc_3g (
    subscriber_id INTEGER PRIMARY KEY,
    algo_id_3g    INTEGER NOT NULL,
    k             VARCHAR(32) NOT NULL,
    op            VARCHAR(32),
    opc           VARCHAR(32),
    sqn           INTEGER NOT NULL DEFAULT 0,
    ind_bitlen    INTEGER NOT NULL DEFAULT 5
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_subscr_imsi ON subscriber (imsi);
";

// Subscriber statements

pub(crate) const SUBSCR_CREATE: &str = "INSERT INTO subscriber (imsi) VALUES (:imsi)";

const SEL_COLUMNS: &str = "SELECT id, imsi, msisdn, vlr_number, sgsn_number, sgsn_address, \
    periodic_lu_tmr, periodic_rau_tau_tmr, nam_cs, nam_ps, lmsi, ms_purged_cs, ms_purged_ps \
    FROM subscriber";

pub(crate) fn sel_by_imsi() -> String {
    format!("{SEL_COLUMNS} WHERE imsi = :imsi")
}

pub(crate) fn sel_by_msisdn() -> String {
    format!("{SEL_COLUMNS} WHERE msisdn = :msisdn")
}

pub(crate) fn sel_by_id() -> String {
    format!("{SEL_COLUMNS} WHERE id = :subscriber_id")
}

pub(crate) const DEL_BY_ID: &str = "DELETE FROM subscriber WHERE id = :subscriber_id";

pub(crate) const SET_MSISDN_BY_IMSI: &str =
    "UPDATE subscriber SET msisdn = :msisdn WHERE imsi = :imsi";

pub(crate) const UPD_NAM_CS_BY_IMSI: &str = "UPDATE subscriber SET nam_cs = :val WHERE imsi = :imsi";
pub(crate) const UPD_NAM_PS_BY_IMSI: &str = "UPDATE subscriber SET nam_ps = :val WHERE imsi = :imsi";

pub(crate) const UPD_VLR_BY_ID: &str =
    "UPDATE subscriber SET vlr_number = :number WHERE id = :subscriber_id";
pub(crate) const UPD_SGSN_BY_ID: &str =
    "UPDATE subscriber SET sgsn_number = :number WHERE id = :subscriber_id";
pub(crate) const UPD_SGSN_ADDR_BY_ID: &str =
    "UPDATE subscriber SET sgsn_address = :address WHERE id = :subscriber_id";

pub(crate) const UPD_LU_TMR_BY_ID: &str =
    "UPDATE subscriber SET periodic_lu_tmr = :val WHERE id = :subscriber_id";
pub(crate) const UPD_RAU_TAU_TMR_BY_ID: &str =
    "UPDATE subscriber SET periodic_rau_tau_tmr = :val WHERE id = :subscriber_id";

pub(crate) const UPD_PURGE_CS_BY_IMSI: &str =
    "UPDATE subscriber SET ms_purged_cs = :val WHERE imsi = :imsi";
pub(crate) const UPD_PURGE_PS_BY_IMSI: &str =
    "UPDATE subscriber SET ms_purged_ps = :val WHERE imsi = :imsi";

pub(crate) const SUBSCR_EXISTS_BY_ID: &str = "SELECT 1 FROM subscriber WHERE id = :subscriber_id";

// Authentication data statements

pub(crate) const AUC_2G_DELETE: &str = "DELETE FROM auc_2g WHERE subscriber_id = :subscriber_id";
pub(crate) const AUC_3G_DELETE: &str = "DELETE FROM auc_3g WHERE subscriber_id = :subscriber_id";

pub(crate) const AUC_2G_INSERT: &str = "INSERT INTO auc_2g (subscriber_id, algo_id_2g, ki) \
    VALUES (:subscriber_id, :algo_id_2g, :ki)";
pub(crate) const AUC_3G_INSERT: &str =
    "INSERT INTO auc_3g (subscriber_id, algo_id_3g, k, op, opc, ind_bitlen) \
    VALUES (:subscriber_id, :algo_id_3g, :k, :op, :opc, :ind_bitlen)";

pub(crate) const AUC_2G_SELECT: &str =
    "SELECT algo_id_2g, ki FROM auc_2g WHERE subscriber_id = :subscriber_id";
pub(crate) const AUC_3G_SELECT: &str =
    "SELECT algo_id_3g, k, op, opc, sqn, ind_bitlen FROM auc_3g WHERE subscriber_id = :subscriber_id";

pub(crate) const AUC_3G_UPDATE_SQN: &str =
    "UPDATE auc_3g SET sqn = :sqn WHERE subscriber_id = :subscriber_id";
