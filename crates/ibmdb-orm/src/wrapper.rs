//! ORM-facing database wrapper with lazy connection.

use std::sync::Arc;

use ibmdb::{CasePolicy, Connection, Cursor, Error, NativeDriver, Result, VersionInfo};
use tracing::{debug, info};

use crate::features::DatabaseFeatures;
use crate::operations::DatabaseOperations;
use crate::settings::SettingsRecord;
use crate::signals::{ConnectionCreated, ConnectionObserver, ConnectionSignal};

/// Internal wrapper state.
#[derive(Debug)]
enum WrapperState {
    /// No connection attempted yet.
    Unconnected,
    Connected(Connection),
    /// Closed by `close()`; the next `cursor()` reconnects.
    Closed,
}

/// Database backend wrapper.
///
/// Owns at most one live connection, opened on the first `cursor()` call
/// and reused afterwards. Failed connects leave the wrapper unconnected and
/// are not retried.
#[derive(Debug)]
pub struct DatabaseWrapper {
    settings: SettingsRecord,
    driver: Arc<dyn NativeDriver>,
    state: WrapperState,
    case_policy: Option<CasePolicy>,
    signal: ConnectionSignal,
}

impl DatabaseWrapper {
    #[must_use]
    pub fn new(settings: SettingsRecord, driver: Arc<dyn NativeDriver>) -> Self {
        Self {
            settings,
            driver,
            state: WrapperState::Unconnected,
            case_policy: None,
            signal: ConnectionSignal::new(),
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &SettingsRecord {
        &self.settings
    }

    /// Register an observer of "connection created".
    pub fn on_connection_created(&mut self, observer: Arc<dyn ConnectionObserver>) {
        self.signal.connect(observer);
    }

    /// Cursor on the live connection, connecting first if needed.
    pub fn cursor(&mut self) -> Result<Cursor> {
        self.ensure_connection()?.cursor()
    }

    /// Release the live connection. A no-op unless connected.
    pub fn close(&mut self) -> Result<()> {
        let WrapperState::Connected(connection) = &self.state else {
            return Ok(());
        };
        let result = connection.close();
        self.state = WrapperState::Closed;
        result
    }

    /// Server version, connecting first if needed.
    pub fn get_server_version(&mut self) -> Result<VersionInfo> {
        self.ensure_connection()?.server_version()
    }

    /// Feature flags of the connected server, connecting first if needed.
    pub fn features(&mut self) -> Result<DatabaseFeatures> {
        Ok(DatabaseFeatures::for_dialect(
            self.ensure_connection()?.dialect(),
        ))
    }

    /// SQL helpers for the connected server, connecting first if needed.
    pub fn ops(&mut self) -> Result<DatabaseOperations> {
        Ok(DatabaseOperations::new(self.ensure_connection()?.dialect()))
    }

    /// Set column-name folding for this wrapper.
    ///
    /// Applied to the live connection if any and to every connection the
    /// wrapper opens later.
    pub fn set_case_policy(&mut self, policy: CasePolicy) -> Result<()> {
        self.case_policy = Some(policy);
        if let WrapperState::Connected(connection) = &self.state {
            connection.set_case_policy(policy)?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn case_policy(&self) -> Option<CasePolicy> {
        self.case_policy
    }

    /// The live connection, if any.
    #[must_use]
    pub const fn connection(&self) -> Option<&Connection> {
        match &self.state {
            WrapperState::Connected(connection) => Some(connection),
            WrapperState::Unconnected | WrapperState::Closed => None,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, WrapperState::Connected(_))
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, WrapperState::Closed)
    }

    fn ensure_connection(&mut self) -> Result<&Connection> {
        if !self.is_connected() {
            let connection = self.connect()?;
            self.state = WrapperState::Connected(connection);
        }
        self.connection().ok_or_else(Error::closed)
    }

    fn connect(&self) -> Result<Connection> {
        let params = self.settings.resolve()?;
        debug!(
            generation = %self.settings.generation(),
            database = params.name(),
            "resolving lazy connection"
        );

        let connection = Connection::open(self.driver.as_ref(), &params)?;
        if let Some(policy) = self.case_policy {
            connection.set_case_policy(policy)?;
        }

        let event = ConnectionCreated {
            database: params.name().to_string(),
            dialect: connection.dialect(),
            server: connection.server_info().clone(),
        };
        let delivered = self.signal.send(&event);
        info!(
            database = params.name(),
            dialect = %event.dialect,
            observers = self.signal.len(),
            delivered,
            "connection created"
        );
        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ibmdb::testing::MockDriver;
    use ibmdb::{Dialect, NativeError};
    use serde_json::json;

    use super::*;
    use crate::settings::SettingsMap;
    use crate::signals::ObserverResult;

    fn current(value: serde_json::Value) -> SettingsRecord {
        let serde_json::Value::Object(map) = value else {
            panic!("expected object");
        };
        SettingsRecord::Current(map)
    }

    fn wrapper(driver: &MockDriver) -> DatabaseWrapper {
        DatabaseWrapper::new(
            current(json!({"NAME": "SAMPLE", "USER": "u", "PASSWORD": "p"})),
            Arc::new(driver.clone()),
        )
    }

    #[test]
    fn test_lazy_connect_once() {
        let driver = MockDriver::new("DB2/LINUXX8664", "11.05.0900");
        let mut db = wrapper(&driver);
        assert!(!db.is_connected());
        assert_eq!(driver.connect_calls(), 0);

        let _c1 = db.cursor().unwrap();
        let _c2 = db.cursor().unwrap();
        assert_eq!(driver.connect_calls(), 1);
        assert_eq!(db.connection().unwrap().dialect(), Dialect::Primary);
    }

    #[test]
    fn test_invalid_settings_fail_before_connect() {
        let driver = MockDriver::new("DB2/LINUXX8664", "11.05.0900");
        let mut db = DatabaseWrapper::new(
            SettingsRecord::Current(SettingsMap::new()),
            Arc::new(driver.clone()),
        );
        assert!(db.cursor().unwrap_err().is_configuration());
        assert_eq!(driver.connect_calls(), 0);
        assert!(!db.is_connected());
    }

    #[test]
    fn test_close_twice_and_reconnect() {
        let driver = MockDriver::new("DB2/LINUXX8664", "11.05.0900");
        let mut db = wrapper(&driver);

        db.close().unwrap();
        assert!(!db.is_closed());

        let mut cursor = db.cursor().unwrap();
        db.close().unwrap();
        db.close().unwrap();
        assert!(db.is_closed());
        assert_eq!(driver.close_calls(), 1);
        let err = cursor.execute("SELECT 1 FROM SYSIBM.SYSDUMMY1", &[]).unwrap_err();
        assert!(err.is_connection());

        db.cursor().unwrap();
        assert!(db.is_connected());
        assert_eq!(driver.connect_calls(), 2);
    }

    #[test]
    fn test_server_version_connects_lazily() {
        let driver = MockDriver::new("DB2", "09.07.0000");
        let mut db = wrapper(&driver);
        assert_eq!(db.get_server_version().unwrap(), VersionInfo::new(9, 7, 0));
        assert_eq!(driver.connect_calls(), 1);
        assert_eq!(db.connection().unwrap().dialect(), Dialect::Mainframe);
    }

    #[test]
    fn test_server_version_propagates_connect_failure() {
        let driver = MockDriver::new("DB2/LINUXX8664", "11.05.0900").failing_connect(
            NativeError::new("SQL30081N A communication error has been detected")
                .with_sqlstate("08001"),
        );
        let mut db = wrapper(&driver);
        let err = db.get_server_version().unwrap_err();
        assert!(err.is_connection());
        assert!(err.to_string().contains("SQL30081N"));
        assert!(!db.is_connected());
    }

    #[test]
    fn test_case_policy_survives_reconnect() {
        let driver = MockDriver::new("DB2/LINUXX8664", "11.05.0900");
        let mut db = wrapper(&driver);
        db.set_case_policy(CasePolicy::Upper).unwrap();

        db.cursor().unwrap();
        assert_eq!(
            db.connection().unwrap().case_policy().unwrap(),
            CasePolicy::Upper
        );

        db.close().unwrap();
        db.cursor().unwrap();
        assert_eq!(
            db.connection().unwrap().case_policy().unwrap(),
            CasePolicy::Upper
        );
    }

    #[test]
    fn test_signal_sent_once_per_connect() {
        let driver = MockDriver::new("IDS/UNIX64", "11.50.FC1");
        let mut db = wrapper(&driver);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        db.on_connection_created(Arc::new(move |event: &ConnectionCreated| -> ObserverResult {
            assert_eq!(event.dialect, Dialect::InformixFamily);
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        db.cursor().unwrap();
        db.cursor().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_observer_is_ignored() {
        let driver = MockDriver::new("DB2/LINUXX8664", "11.05.0900");
        let mut db = wrapper(&driver);
        db.on_connection_created(Arc::new(|_: &ConnectionCreated| -> ObserverResult {
            Err("observer exploded".into())
        }));
        assert!(db.cursor().is_ok());
    }

    #[test]
    fn test_panicking_observer_keeps_connection() {
        let driver = MockDriver::new("DB2/LINUXX8664", "11.05.0900");
        let mut db = wrapper(&driver);
        db.on_connection_created(Arc::new(|_: &ConnectionCreated| -> ObserverResult {
            panic!("observer bug")
        }));

        assert!(db.cursor().is_ok());
        assert!(db.is_connected());
        assert_eq!(driver.connect_calls(), 1);
        assert_eq!(driver.close_calls(), 0);
    }

    #[test]
    fn test_features_follow_dialect() {
        let driver = MockDriver::new("AS", "07.03.0000");
        let mut db = wrapper(&driver);
        let features = db.features().unwrap();
        assert!(!features.supports_native_xml);
        assert!(!features.can_use_chunked_reads);
    }
}
