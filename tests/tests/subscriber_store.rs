//! Subscriber store scenarios on a file-backed database

use hlrcore_common::{Aud2g, AuthAlgorithm, AuthDomain, AuthVector, CnDomain, OpType};
use hlrcore_db::DbError;
use integration_tests::{init_test_logging, TestDb, TestSubscriber};

#[test]
fn test_provisioned_subscriber_survives_reopen() {
    init_test_logging();
    let fixture = TestDb::new().unwrap();
    let sub = TestSubscriber::default();
    let id = sub.provision(&fixture.db).unwrap();

    let db = fixture.reopen().unwrap();
    let stored = db.subscribers().get_by_msisdn("4910001").unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.imsi, sub.imsi);
    assert!(stored.nam(CnDomain::Cs));
    assert!(stored.nam(CnDomain::Ps));

    let data = db.auc().get_auth_data(id).unwrap();
    assert_eq!(data.aud2g, sub.aud2g);
    let aud3g = data.aud3g.unwrap();
    assert_eq!(aud3g.op_type, OpType::Op);
    assert_eq!(Some(aud3g), sub.aud3g);
    assert_eq!(data.sqn, Some(0));
}

#[test]
fn test_cascade_delete_removes_credentials() {
    let fixture = TestDb::new().unwrap();
    let db = &fixture.db;
    let keep = TestSubscriber::default()
        .with_imsi("001010000000002")
        .with_msisdn(Some("4910002"))
        .provision(db)
        .unwrap();
    let gone = TestSubscriber::default().provision(db).unwrap();

    db.subscribers()
        .delete_subscriber_and_credentials(gone)
        .unwrap();

    assert!(db.subscribers().get_by_id(gone).unwrap_err().is_not_found());
    assert!(db.auc().get_auth_data(gone).unwrap().is_empty());
    assert!(matches!(
        db.auc().delete_vector(gone, AuthDomain::Gsm),
        Err(DbError::NotFound(_))
    ));

    // The other subscriber is untouched.
    let data = db.auc().get_auth_data(keep).unwrap();
    assert!(data.aud2g.is_some());
    assert!(data.aud3g.is_some());

    // Deleting again is a miss.
    assert!(matches!(
        db.subscribers().delete_subscriber_and_credentials(gone),
        Err(DbError::NotFound(_))
    ));
}

#[test]
fn test_duplicate_imsi_and_msisdn_conflict() {
    let fixture = TestDb::new().unwrap();
    let db = &fixture.db;
    let first = TestSubscriber::default();
    first.provision(db).unwrap();

    assert!(matches!(
        db.subscribers().create(&first.imsi),
        Err(DbError::Conflict(_))
    ));

    let second = TestSubscriber::default()
        .with_imsi("001010000000002")
        .with_msisdn(None)
        .without_credentials();
    second.provision(db).unwrap();
    assert!(matches!(
        db.subscribers().update_msisdn(&second.imsi, "4910001"),
        Err(DbError::Conflict(_))
    ));
    assert_eq!(
        db.subscribers().get_by_imsi(&second.imsi).unwrap().msisdn,
        None
    );
}

#[test]
fn test_location_and_purge_updates() {
    let fixture = TestDb::new().unwrap();
    let db = &fixture.db;
    let sub = TestSubscriber::default().without_credentials();
    let id = sub.provision(db).unwrap();
    let subscribers = db.subscribers();

    subscribers
        .update_serving_node(id, "49161", CnDomain::Cs)
        .unwrap();
    subscribers
        .update_serving_node(id, "49162", CnDomain::Ps)
        .unwrap();
    subscribers.update_sgsn_address(id, "10.0.0.1").unwrap();
    subscribers.update_periodic_timer(id, CnDomain::Cs, 3240).unwrap();
    subscribers.set_purged(&sub.imsi, CnDomain::Ps, true).unwrap();
    subscribers
        .set_service_enabled(&sub.imsi, CnDomain::Cs, false)
        .unwrap();

    let stored = fixture.reopen().unwrap().subscribers().get_by_id(id).unwrap();
    assert_eq!(stored.vlr_number.as_deref(), Some("49161"));
    assert_eq!(stored.sgsn_number.as_deref(), Some("49162"));
    assert_eq!(stored.sgsn_address.as_deref(), Some("10.0.0.1"));
    assert_eq!(stored.periodic_lu_timer, Some(3240));
    assert_eq!(stored.periodic_rau_tau_timer, None);
    assert!(stored.purged(CnDomain::Ps));
    assert!(!stored.purged(CnDomain::Cs));
    assert!(!stored.nam(CnDomain::Cs));
    assert!(stored.nam(CnDomain::Ps));
}

#[test]
fn test_cross_domain_vector_rejected_without_side_effects() {
    let fixture = TestDb::new().unwrap();
    let db = &fixture.db;
    let sub = TestSubscriber::default();
    let id = sub.provision(db).unwrap();

    let bad = AuthVector::Gsm(Aud2g::new(
        AuthAlgorithm::Milenage,
        "000102030405060708090a0b0c0d0e0f",
    ));
    assert!(matches!(
        db.auc().replace_vector(id, &bad),
        Err(DbError::InvalidInput(_))
    ));
    assert_eq!(db.auc().get_auth_data(id).unwrap().aud2g, sub.aud2g);

    // Storing "none" empties the slot; deleting it afterwards is a miss.
    db.auc()
        .replace_vector(id, &AuthVector::none(AuthDomain::Gsm))
        .unwrap();
    assert!(db.auc().get_auth_data(id).unwrap().aud2g.is_none());
    assert!(db
        .auc()
        .delete_vector(id, AuthDomain::Gsm)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_sqn_update_persists() {
    let fixture = TestDb::new().unwrap();
    let id = TestSubscriber::default().provision(&fixture.db).unwrap();

    fixture.db.auc().update_sqn(id, 0x1234).unwrap();
    let data = fixture.reopen().unwrap().auc().get_auth_data(id).unwrap();
    assert_eq!(data.sqn, Some(0x1234));
    assert!(matches!(
        fixture.db.auc().update_sqn(id, 1 << 48),
        Err(DbError::InvalidInput(_))
    ));
}
