//! Test fixtures and configuration helpers
//!
//! Provides sample subscribers, credential sets and client configurations.

use hlrcore_common::{
    Aud2g, Aud3g, AuthAlgorithm, AuthVector, DbConfig, GsupClientConfig, OpType,
};
use hlrcore_db::{DbResult, HlrDb};
use tempfile::TempDir;

use crate::test_utils::TestResult;

/// A subscriber to provision in a test database
#[derive(Debug, Clone)]
pub struct TestSubscriber {
    pub imsi: String,
    pub msisdn: Option<String>,
    pub aud2g: Option<Aud2g>,
    pub aud3g: Option<Aud3g>,
}

impl Default for TestSubscriber {
    fn default() -> Self {
        Self {
            imsi: "001010000000001".to_string(),
            msisdn: Some("4910001".to_string()),
            aud2g: Some(Aud2g::new(
                AuthAlgorithm::Comp128v1,
                "000102030405060708090a0b0c0d0e0f",
            )),
            aud3g: Some(Aud3g::new(
                AuthAlgorithm::Milenage,
                "465b5ce8b199b49faa5f0a2ee238a6bc",
                "cdc202d5123e20f62b6d676ac72cb318",
                OpType::Op,
            )),
        }
    }
}

impl TestSubscriber {
    /// Create a new test subscriber with custom IMSI
    pub fn with_imsi(mut self, imsi: &str) -> Self {
        self.imsi = imsi.to_string();
        self
    }

    pub fn with_msisdn(mut self, msisdn: Option<&str>) -> Self {
        self.msisdn = msisdn.map(str::to_string);
        self
    }

    /// Drop both credential sets
    pub fn without_credentials(mut self) -> Self {
        self.aud2g = None;
        self.aud3g = None;
        self
    }

    /// Writes the subscriber and its credentials, returning its id
    pub fn provision(&self, db: &HlrDb) -> DbResult<i64> {
        let id = db.subscribers().create(&self.imsi)?;
        if let Some(msisdn) = &self.msisdn {
            db.subscribers().update_msisdn(&self.imsi, msisdn)?;
        }
        if let Some(aud) = &self.aud2g {
            db.auc().replace_vector(id, &AuthVector::Gsm(aud.clone()))?;
        }
        if let Some(aud) = &self.aud3g {
            db.auc().replace_vector(id, &AuthVector::Umts(aud.clone()))?;
        }
        Ok(id)
    }
}

/// A file-backed database in a temporary directory
///
/// The directory is removed when the fixture is dropped.
pub struct TestDb {
    pub db: HlrDb,
    pub config: DbConfig,
    _dir: TempDir,
}

impl TestDb {
    pub fn new() -> TestResult<Self> {
        let dir = tempfile::tempdir()?;
        let config = DbConfig::new(dir.path().join("hlr.db"));
        let db = HlrDb::open(&config)?;
        Ok(Self {
            db,
            config,
            _dir: dir,
        })
    }

    /// Opens a second connection to the same file
    pub fn reopen(&self) -> DbResult<HlrDb> {
        HlrDb::open(&self.config)
    }
}

/// Client configuration pointing at the mock peer, with default timers
pub fn test_client_config(unit_name: &str) -> GsupClientConfig {
    GsupClientConfig::new(unit_name, "mock-peer", 4222)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_subscriber_is_valid() {
        let sub = TestSubscriber::default();
        assert!(hlrcore_common::is_valid_imsi(&sub.imsi));
        let vector = AuthVector::Umts(sub.aud3g.clone().unwrap());
        assert!(hlrcore_common::validate_vector(&vector).is_ok());
    }

    #[test]
    fn test_provision_in_memory() {
        let db = HlrDb::open_in_memory().unwrap();
        let id = TestSubscriber::default().provision(&db).unwrap();
        let data = db.auc().get_auth_data(id).unwrap();
        assert!(data.aud2g.is_some());
        assert!(data.aud3g.is_some());
    }
}
