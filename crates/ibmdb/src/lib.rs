//! Uniform connection and cursor surface over DB2-family CLI clients.
//!
//! One API for DB2 for LUW, DB2 for z/OS, DB2 for i and Informix. The
//! server dialect is detected once per connection from the reported DBMS
//! name; dialect-sensitive behavior consults a static capability table.
//!
//! # Features
//!
//! - Dialect detection with per-dialect capabilities
//! - Runtime-settable column-name case folding
//! - Result rows with positional and name-keyed access
//! - SQLSTATE-based error categories
//! - Native client modelled as injected traits
//!
//! # Example
//!
//! ```rust,ignore
//! use ibmdb::{CasePolicy, ConnectionParameters};
//!
//! let params = ConnectionParameters::new("SAMPLE")?
//!     .with_user("db2inst1")
//!     .with_password("secret");
//! let conn = ibmdb::connect(&driver, &params)?;
//! conn.set_case_policy(CasePolicy::Upper)?;
//!
//! let mut cursor = conn.cursor()?;
//! cursor.execute("SELECT empno FROM employee", &[])?;
//! while let Some(row) = cursor.fetch_row()? {
//!     println!("{}", row.get_by_name("EMPNO").unwrap());
//! }
//! ```

pub mod case;
pub mod connection;
pub mod cursor;
pub mod dialect;
pub mod error;
pub mod native;
pub mod params;
pub mod row;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod types;

pub use case::CasePolicy;
pub use connection::Connection;
pub use cursor::Cursor;
pub use dialect::{Dialect, DialectCapabilities, Feature, RowLimitStyle};
pub use error::{Error, QueryCategory, Result};
pub use native::{
    CatalogRequest, ConnectTarget, Credentials, CursorType, NativeDriver, NativeError,
    NativeOptions, NativeSession, NativeStatement,
};
pub use params::ConnectionParameters;
pub use row::{ResultRow, RowLayout};
pub use types::{ColumnDescription, ServerInfo, SqlType, Value, VersionInfo};

/// Open a connection through `driver`.
pub fn connect(driver: &dyn NativeDriver, params: &ConnectionParameters) -> Result<Connection> {
    Connection::open(driver, params)
}
