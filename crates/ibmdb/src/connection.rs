//! Connection owning one native session.
//!
//! Session state lives behind `Arc<Mutex>`; cursors hold a `Weak` handle so
//! that closing or dropping the connection invalidates every cursor at once.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::case::CasePolicy;
use crate::cursor::Cursor;
use crate::dialect::{Dialect, DialectCapabilities, Feature};
use crate::error::{Error, Result};
use crate::native::{CursorType, NativeDriver, NativeError, NativeOptions, NativeSession};
use crate::params::ConnectionParameters;
use crate::row::ResultRow;
use crate::types::{ServerInfo, VersionInfo};

/// Shared session type for thread-safe access.
pub(crate) type SharedSession = Arc<Mutex<ConnectionInner>>;

/// Internal connection state.
#[derive(Debug)]
pub(crate) enum ConnectionInner {
    /// Active session.
    Connected(Session),
    /// Closed, explicitly or on drop.
    Closed,
}

impl ConnectionInner {
    /// Borrow the live session or fail with "connection is closed".
    pub(crate) fn session_mut(&mut self) -> Result<&mut Session> {
        match self {
            Self::Connected(session) => Ok(session),
            Self::Closed => Err(Error::closed()),
        }
    }
}

/// Live native session plus the per-connection settings cursors read.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) native: Box<dyn NativeSession>,
    pub(crate) dialect: Dialect,
    pub(crate) case_policy: CasePolicy,
    pub(crate) autocommit: bool,
}

impl Session {
    /// Cursor type actually requested from the native layer.
    pub(crate) fn effective_cursor_type(&self, requested: CursorType) -> CursorType {
        if requested == CursorType::KeysetDriven && !self.dialect.supports(Feature::KeysetCursors)
        {
            debug!(dialect = %self.dialect, "keyset cursor unavailable, using forward-only");
            return CursorType::ForwardOnly;
        }
        requested
    }
}

/// Options consumed by the connection itself rather than the native client.
#[derive(Debug, Default, PartialEq)]
struct ConnectOptions {
    case_policy: CasePolicy,
    autocommit: Option<bool>,
    native: NativeOptions,
}

impl ConnectOptions {
    fn split(options: Option<&NativeOptions>) -> Result<Self> {
        let mut parsed = Self::default();
        for (key, value) in options.into_iter().flatten() {
            if key.eq_ignore_ascii_case("ATTR_CASE") || key.eq_ignore_ascii_case("case") {
                let text = value.as_str().ok_or_else(|| {
                    Error::configuration(format!("option '{key}' must be a string"))
                })?;
                parsed.case_policy = text.parse()?;
            } else if key.eq_ignore_ascii_case("autocommit") {
                let enabled = value.as_bool().ok_or_else(|| {
                    Error::configuration(format!("option '{key}' must be a boolean"))
                })?;
                parsed.autocommit = Some(enabled);
            } else {
                parsed.native.insert(key.clone(), value.clone());
            }
        }
        Ok(parsed)
    }
}

/// One connection to a DB2-family server.
///
/// The dialect and server identification are detected once at open time and
/// never change for the lifetime of the connection.
#[derive(Debug)]
pub struct Connection {
    inner: SharedSession,
    dialect: Dialect,
    server: ServerInfo,
}

impl Connection {
    /// Connect through `driver` and detect the server dialect.
    ///
    /// Every failure before the session is usable is a connection error. A
    /// malformed `case` or `autocommit` option is a configuration error and
    /// is reported before any native call.
    pub fn open(driver: &dyn NativeDriver, params: &ConnectionParameters) -> Result<Self> {
        let options = ConnectOptions::split(params.options())?;
        let target = params.target();

        debug!(target = ?target, "opening native connection");
        let mut native = driver
            .connect(&target, &params.credentials(), &options.native)
            .map_err(|e| Error::connect_failed(&e))?;

        let server = match initialize(native.as_mut(), options.autocommit) {
            Ok(server) => server,
            Err(e) => {
                if let Err(close_err) = native.close() {
                    warn!(error = %close_err, "failed to release half-open connection");
                }
                return Err(Error::connect_failed(&e));
            }
        };

        let dialect = Dialect::detect(&server.dbms_name);
        info!(
            dbms_name = %server.dbms_name,
            dbms_version = %server.dbms_version,
            dialect = %dialect,
            "connected"
        );

        let session = Session {
            native,
            dialect,
            case_policy: options.case_policy,
            autocommit: options.autocommit.unwrap_or(true),
        };

        Ok(Self {
            inner: Arc::new(Mutex::new(ConnectionInner::Connected(session))),
            dialect,
            server,
        })
    }

    /// Create a new cursor bound to this connection.
    pub fn cursor(&self) -> Result<Cursor> {
        if !self.is_connected() {
            return Err(Error::closed());
        }
        Ok(Cursor::new(Arc::downgrade(&self.inner)))
    }

    /// Release the native session. Closing a closed connection is a no-op.
    pub fn close(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *self.inner.lock(), ConnectionInner::Closed);
        match previous {
            ConnectionInner::Connected(mut session) => {
                session.native.close()?;
                info!(dialect = %self.dialect, "connection closed");
                Ok(())
            }
            ConnectionInner::Closed => Ok(()),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.inner.lock(), ConnectionInner::Connected(_))
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn capabilities(&self) -> &'static DialectCapabilities {
        self.dialect.capabilities()
    }

    /// Fail with [`Error::DialectUnsupported`] unless the server has `feature`.
    pub fn require(&self, feature: Feature) -> Result<()> {
        if self.dialect.supports(feature) {
            Ok(())
        } else {
            Err(Error::dialect_unsupported(self.dialect, feature))
        }
    }

    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server
    }

    pub fn server_version(&self) -> Result<VersionInfo> {
        self.server.version()
    }

    pub fn case_policy(&self) -> Result<CasePolicy> {
        Ok(self.inner.lock().session_mut()?.case_policy)
    }

    /// Change column-name folding for fetches and descriptions made after
    /// this call. Rows already fetched keep their names.
    pub fn set_case_policy(&self, policy: CasePolicy) -> Result<()> {
        self.inner.lock().session_mut()?.case_policy = policy;
        debug!(policy = %policy, "case policy changed");
        Ok(())
    }

    pub fn autocommit(&self) -> Result<bool> {
        Ok(self.inner.lock().session_mut()?.autocommit)
    }

    pub fn set_autocommit(&self, enabled: bool) -> Result<()> {
        let mut guard = self.inner.lock();
        let session = guard.session_mut()?;
        session.native.set_autocommit(enabled)?;
        session.autocommit = enabled;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.inner.lock().session_mut()?.native.commit()?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<()> {
        self.inner.lock().session_mut()?.native.rollback()?;
        Ok(())
    }

    /// Run the dialect's validation query. `false` when closed or failing.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let mut guard = self.inner.lock();
        let ConnectionInner::Connected(session) = &mut *guard else {
            return false;
        };
        let query = self.dialect.capabilities().validation_query;
        session
            .native
            .prepare(query, CursorType::ForwardOnly)
            .and_then(|mut stmt| {
                stmt.execute(&[])?;
                stmt.fetch()
            })
            .is_ok()
    }

    /// Tables matching the catalog patterns, folded per the dialect.
    pub fn tables(&self, schema: Option<&str>, table: Option<&str>) -> Result<Vec<ResultRow>> {
        let mut cursor = self.cursor()?;
        cursor.tables(schema, table)?;
        cursor.fetch_all()
    }

    /// Columns of the matching tables, folded per the dialect.
    pub fn columns(&self, schema: Option<&str>, table: Option<&str>) -> Result<Vec<ResultRow>> {
        let mut cursor = self.cursor()?;
        cursor.columns(schema, table, None)?;
        cursor.fetch_all()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close connection on drop");
        }
    }
}

fn initialize(
    native: &mut dyn NativeSession,
    autocommit: Option<bool>,
) -> std::result::Result<ServerInfo, NativeError> {
    let server = native.server_info()?;
    if let Some(enabled) = autocommit {
        native.set_autocommit(enabled)?;
    }
    Ok(server)
}
