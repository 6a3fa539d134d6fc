//! End-to-end lifecycle through the wrapper against the scripted driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use ibmdb::testing::{MockDriver, MockResult};
use ibmdb::{CasePolicy, ConnectTarget, Dialect, Value};
use ibmdb_orm::{
    ConnectionCreated, DatabaseWrapper, ObserverResult, SchemaGeneration, SettingsMap,
    SettingsRecord,
};
use serde_json::json;

const EMPLOYEE_SQL: &str = "SELECT empno FROM employee";

fn settings(value: serde_json::Value) -> SettingsMap {
    let serde_json::Value::Object(map) = value else {
        panic!("expected object");
    };
    map
}

fn employee_driver() -> MockDriver {
    MockDriver::new("DB2/LINUXX8664", "11.05.0900").with_result(
        EMPLOYEE_SQL,
        MockResult::rows(&["empno"], vec![vec![Value::from("000010")]]),
    )
}

#[test]
fn test_end_to_end_upper_case_row() {
    let driver = employee_driver();
    let record =
        SettingsRecord::infer(settings(json!({"NAME": "SAMPLE", "USER": "u", "PASSWORD": "p"})))
            .unwrap();
    let mut db = DatabaseWrapper::new(record, Arc::new(driver.clone()));

    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    db.on_connection_created(Arc::new(move |event: &ConnectionCreated| -> ObserverResult {
        assert_eq!(event.database, "SAMPLE");
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    let _first = db.cursor().unwrap();
    assert_eq!(driver.connect_calls(), 1);
    assert_eq!(
        driver.last_target(),
        Some(ConnectTarget::Catalogued("SAMPLE".to_string()))
    );
    let credentials = driver.last_credentials().unwrap();
    assert_eq!(credentials.user.as_deref(), Some("u"));
    assert_eq!(credentials.password.as_deref(), Some("p"));
    assert_eq!(db.connection().unwrap().dialect(), Dialect::Primary);

    db.set_case_policy(CasePolicy::Upper).unwrap();
    let mut cursor = db.cursor().unwrap();
    cursor.execute(EMPLOYEE_SQL, &[]).unwrap();
    let row = cursor.fetch_row().unwrap().unwrap();

    assert_eq!(row.get_by_name("EMPNO"), Some(&Value::from("000010")));
    assert!(!row.contains("empno"));
    assert_eq!(driver.connect_calls(), 1);
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_natural_policy_restores_original_names() {
    let driver = employee_driver();
    let record = SettingsRecord::infer(settings(json!({"DATABASE_NAME": "SAMPLE"}))).unwrap();
    let mut db = DatabaseWrapper::new(record, Arc::new(driver));

    db.set_case_policy(CasePolicy::Upper).unwrap();
    db.set_case_policy(CasePolicy::Natural).unwrap();

    let mut cursor = db.cursor().unwrap();
    cursor.execute(EMPLOYEE_SQL, &[]).unwrap();
    let row = cursor.fetch_row().unwrap().unwrap();
    assert!(row.contains("empno"));
    assert!(!row.contains("EMPNO"));
}

#[test]
fn test_generations_connect_identically() {
    let database = json!({
        "DATABASE_NAME": "SAMPLE",
        "DATABASE_USER": "u",
        "DATABASE_PASSWORD": "p",
    });
    let records = [
        SettingsRecord::with_generation(SchemaGeneration::Legacy, settings(database.clone()))
            .unwrap(),
        SettingsRecord::with_generation(SchemaGeneration::Intermediate, settings(database))
            .unwrap(),
        SettingsRecord::infer(settings(json!({"NAME": "SAMPLE", "USER": "u", "PASSWORD": "p"})))
            .unwrap(),
    ];

    for record in records {
        let driver = employee_driver();
        let mut db = DatabaseWrapper::new(record, Arc::new(driver.clone()));
        db.cursor().unwrap();

        assert_eq!(
            driver.last_target(),
            Some(ConnectTarget::Catalogued("SAMPLE".to_string()))
        );
        let credentials = driver.last_credentials().unwrap();
        assert_eq!(credentials.user.as_deref(), Some("u"));
        assert_eq!(credentials.password.as_deref(), Some("p"));
    }
}

#[test]
fn test_close_then_operations_fail() {
    let driver = employee_driver();
    let record = SettingsRecord::infer(settings(json!({"NAME": "SAMPLE"}))).unwrap();
    let mut db = DatabaseWrapper::new(record, Arc::new(driver.clone()));

    let mut cursor = db.cursor().unwrap();
    db.close().unwrap();
    db.close().unwrap();

    let err = cursor.execute(EMPLOYEE_SQL, &[]).unwrap_err();
    assert!(err.is_connection());
    assert_eq!(driver.close_calls(), 1);
}

#[test]
fn test_remote_host_builds_connection_string() {
    let driver = employee_driver();
    let record = SettingsRecord::infer(settings(json!({
        "NAME": "SAMPLE",
        "USER": "u",
        "PASSWORD": "p",
        "HOST": "db.example.com",
        "PORT": "50000",
    })))
    .unwrap();
    let mut db = DatabaseWrapper::new(record, Arc::new(driver.clone()));
    db.cursor().unwrap();

    let Some(ConnectTarget::ConnectionString(dsn)) = driver.last_target() else {
        panic!("expected connection string target");
    };
    assert!(dsn.starts_with("DATABASE=SAMPLE;HOSTNAME=db.example.com;PORT=50000;"));
    assert!(dsn.contains("UID=u;PWD=p;"));
}

#[test]
fn test_informix_server_version_and_features() {
    let driver = MockDriver::new("IDS/UNIX64", "11.50.FC1");
    let record = SettingsRecord::infer(settings(json!({"NAME": "stores"}))).unwrap();
    let mut db = DatabaseWrapper::new(record, Arc::new(driver));

    let version = db.get_server_version().unwrap();
    assert_eq!((version.major, version.minor), (11, 50));

    let features = db.features().unwrap();
    assert!(!features.supports_native_xml);
    assert!(features.uses_savepoints);

    let ops = db.ops().unwrap();
    assert_eq!(
        ops.limit_query("SELECT * FROM customer", 1),
        "SELECT FIRST 1 * FROM customer"
    );
}
