//! Cursor bound to one connection.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::case::CasePolicy;
use crate::connection::{ConnectionInner, Session};
use crate::error::{Error, QueryCategory, Result};
use crate::native::{CatalogRequest, CursorType, NativeStatement};
use crate::row::{ResultRow, RowLayout};
use crate::types::{ColumnDescription, Value};

/// Internal cursor state.
#[derive(Debug)]
enum CursorInner {
    /// No active result set.
    Idle,
    /// Result set from `execute()` or a catalog call.
    Active {
        statement: Box<dyn NativeStatement>,
        columns: Vec<ColumnDescription>,
        /// Layout built for the last policy seen, reused while it holds.
        layout: Option<Arc<RowLayout>>,
    },
    Closed,
}

/// Statement cursor.
///
/// Holds a non-owning handle to its connection: once the connection is
/// closed or dropped every operation fails with a connection error.
#[derive(Debug)]
pub struct Cursor {
    connection: Weak<Mutex<ConnectionInner>>,
    inner: CursorInner,
    case_override: Option<CasePolicy>,
    cursor_type: CursorType,
    rowcount: i64,
}

impl Cursor {
    pub(crate) const fn new(connection: Weak<Mutex<ConnectionInner>>) -> Self {
        Self {
            connection,
            inner: CursorInner::Idle,
            case_override: None,
            cursor_type: CursorType::ForwardOnly,
            rowcount: -1,
        }
    }

    /// Rows affected by the last DML, `-1` for queries.
    #[must_use]
    pub const fn rowcount(&self) -> i64 {
        self.rowcount
    }

    #[must_use]
    pub const fn case_override(&self) -> Option<CasePolicy> {
        self.case_override
    }

    /// Override the connection's case policy for this cursor only.
    /// `None` falls back to the connection policy.
    pub const fn set_case_policy(&mut self, policy: Option<CasePolicy>) {
        self.case_override = policy;
    }

    #[must_use]
    pub const fn cursor_type(&self) -> CursorType {
        self.cursor_type
    }

    /// Request a cursor type for subsequent statements. Keyset-driven
    /// cursors fall back to forward-only on servers without them.
    pub const fn set_cursor_type(&mut self, cursor_type: CursorType) {
        self.cursor_type = cursor_type;
    }

    /// Prepare and execute `sql` with positional `params`.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> Result<()> {
        self.ensure_open()?;
        self.reset();
        let requested = self.cursor_type;
        let statement = with_session(&self.connection, |session| {
            let cursor_type = session.effective_cursor_type(requested);
            let mut statement = session.native.prepare(sql, cursor_type)?;
            statement.execute(params)?;
            Ok(statement)
        })?;
        debug!(sql, "statement executed");
        self.activate(statement);
        Ok(())
    }

    /// Execute `sql` once per parameter set. `rowcount` is the total.
    pub fn execute_many(&mut self, sql: &str, batches: &[Vec<Value>]) -> Result<()> {
        self.ensure_open()?;
        self.reset();
        let total = with_session(&self.connection, |session| {
            let mut statement = session.native.prepare(sql, CursorType::ForwardOnly)?;
            let mut total = 0;
            for params in batches {
                statement.execute(params)?;
                total += statement.row_count().max(0);
            }
            Ok(total)
        })?;
        debug!(sql, batches = batches.len(), rows = total, "batch executed");
        self.rowcount = total;
        Ok(())
    }

    /// Catalog query over tables.
    pub fn tables(&mut self, schema: Option<&str>, table: Option<&str>) -> Result<()> {
        self.catalog(|fold| CatalogRequest::Tables {
            schema: schema.map(fold),
            table: table.map(fold),
        })
    }

    /// Catalog query over columns.
    pub fn columns(
        &mut self,
        schema: Option<&str>,
        table: Option<&str>,
        column: Option<&str>,
    ) -> Result<()> {
        self.catalog(|fold| CatalogRequest::Columns {
            schema: schema.map(fold),
            table: table.map(fold),
            column: column.map(fold),
        })
    }

    fn catalog(
        &mut self,
        build: impl FnOnce(&dyn Fn(&str) -> String) -> CatalogRequest,
    ) -> Result<()> {
        self.ensure_open()?;
        self.reset();
        let statement = with_session(&self.connection, |session| {
            let folding = session.dialect.capabilities().catalog_case;
            let request = build(&|ident: &str| catalog_identifier(folding, ident));
            Ok(session.native.catalog(&request)?)
        })?;
        self.activate(statement);
        Ok(())
    }

    /// Next row, `None` once the result set is exhausted.
    ///
    /// Column names are folded with the policy active at this call.
    pub fn fetch_row(&mut self) -> Result<Option<ResultRow>> {
        self.ensure_open()?;
        let connection_policy = with_session(&self.connection, |session| Ok(session.case_policy))?;
        let policy = self.case_override.unwrap_or(connection_policy);

        let CursorInner::Active {
            statement,
            columns,
            layout,
        } = &mut self.inner
        else {
            return Err(no_result_set());
        };

        let Some(values) = statement.fetch()? else {
            return Ok(None);
        };

        let reusable = layout
            .as_ref()
            .filter(|cached| cached.policy() == policy)
            .cloned();
        let current = if let Some(cached) = reusable {
            cached
        } else {
            let built = Arc::new(RowLayout::new(columns, policy));
            *layout = Some(Arc::clone(&built));
            built
        };
        Ok(Some(ResultRow::new(current, values)))
    }

    /// Up to `size` rows.
    pub fn fetch_many(&mut self, size: usize) -> Result<Vec<ResultRow>> {
        let mut rows = Vec::with_capacity(size);
        while rows.len() < size {
            match self.fetch_row()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// All remaining rows.
    pub fn fetch_all(&mut self) -> Result<Vec<ResultRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Column metadata of the active result set, names folded with the
    /// active policy. `None` when there is no result set.
    pub fn description(&self) -> Result<Option<Vec<ColumnDescription>>> {
        self.ensure_open()?;
        let connection_policy = with_session(&self.connection, |session| Ok(session.case_policy))?;
        let policy = self.case_override.unwrap_or(connection_policy);

        let CursorInner::Active { columns, .. } = &self.inner else {
            return Ok(None);
        };
        Ok(Some(
            columns
                .iter()
                .map(|column| ColumnDescription {
                    name: policy.apply(&column.name),
                    ..column.clone()
                })
                .collect(),
        ))
    }

    /// Release the active result set. Further use fails.
    pub fn close(&mut self) {
        self.inner = CursorInner::Closed;
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.inner, CursorInner::Closed)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::connection("cursor is closed"));
        }
        Ok(())
    }

    /// Drop the previous result set before running another statement.
    fn reset(&mut self) {
        self.inner = CursorInner::Idle;
        self.rowcount = -1;
    }

    fn activate(&mut self, statement: Box<dyn NativeStatement>) {
        let columns = statement.columns();
        self.rowcount = if columns.is_empty() {
            statement.row_count()
        } else {
            -1
        };
        self.inner = if columns.is_empty() {
            CursorInner::Idle
        } else {
            CursorInner::Active {
                statement,
                columns,
                layout: None,
            }
        };
    }
}

fn no_result_set() -> Error {
    Error::query(QueryCategory::Programming, "no result set to fetch from")
}

/// Run `f` against the live session behind `connection`.
/// Delimited identifiers (`"MixedCase"`) are passed without their quotes
/// and never folded.
fn catalog_identifier(folding: CasePolicy, ident: &str) -> String {
    match ident.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(delimited) => delimited.to_string(),
        None => folding.apply(ident),
    }
}

fn with_session<T>(
    connection: &Weak<Mutex<ConnectionInner>>,
    f: impl FnOnce(&mut Session) -> Result<T>,
) -> Result<T> {
    let shared = connection.upgrade().ok_or_else(Error::closed)?;
    let mut guard = shared.lock();
    f(guard.session_mut()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::params::ConnectionParameters;
    use crate::testing::{MockDriver, MockResult};

    const EMPLOYEE_SQL: &str = "SELECT empno, lastname FROM employee";

    fn employee_driver(server: &str) -> MockDriver {
        MockDriver::new(server, "11.05.0900").with_result(
            EMPLOYEE_SQL,
            MockResult::rows(
                &["empno", "LastName"],
                vec![
                    vec![Value::from("000010"), Value::from("HAAS")],
                    vec![Value::from("000020"), Value::from("THOMPSON")],
                    vec![Value::from("000030"), Value::from("KWAN")],
                ],
            ),
        )
    }

    fn open(driver: &MockDriver) -> Connection {
        Connection::open(driver, &ConnectionParameters::new("SAMPLE").unwrap()).unwrap()
    }

    #[test]
    fn test_fetch_reads_policy_at_fetch_time() {
        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();

        let first = cursor.fetch_row().unwrap().unwrap();
        assert!(first.contains("empno"));

        conn.set_case_policy(CasePolicy::Upper).unwrap();
        let second = cursor.fetch_row().unwrap().unwrap();
        assert_eq!(second.get_by_name("EMPNO"), Some(&Value::from("000020")));
        assert_eq!(second.get_by_name("empno"), None);

        // Already materialized rows keep their names.
        assert!(first.contains("empno"));

        conn.set_case_policy(CasePolicy::Natural).unwrap();
        let third = cursor.fetch_row().unwrap().unwrap();
        assert_eq!(third.get_by_name("LastName"), Some(&Value::from("KWAN")));

        assert!(cursor.fetch_row().unwrap().is_none());
    }

    #[test]
    fn test_cursor_override_wins() {
        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        conn.set_case_policy(CasePolicy::Upper).unwrap();

        let mut cursor = conn.cursor().unwrap();
        cursor.set_case_policy(Some(CasePolicy::Lower));
        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();

        let row = cursor.fetch_row().unwrap().unwrap();
        assert!(row.contains("lastname"));
        assert!(!row.contains("LASTNAME"));

        cursor.set_case_policy(None);
        let row = cursor.fetch_row().unwrap().unwrap();
        assert!(row.contains("LASTNAME"));
    }

    #[test]
    fn test_description_folded() {
        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        assert!(cursor.description().unwrap().is_none());

        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();
        conn.set_case_policy(CasePolicy::Lower).unwrap();
        let names: Vec<_> = cursor
            .description()
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["empno", "lastname"]);
    }

    #[test]
    fn test_fetch_many_and_all() {
        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();

        assert_eq!(cursor.fetch_many(2).unwrap().len(), 2);
        assert_eq!(cursor.fetch_all().unwrap().len(), 1);
        assert!(cursor.fetch_many(5).unwrap().is_empty());
    }

    #[test]
    fn test_fetch_without_result_set() {
        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        let err = cursor.fetch_row().unwrap_err();
        assert_eq!(err.query_category(), Some(QueryCategory::Programming));
    }

    #[test]
    fn test_dml_rowcount() {
        let sql = "UPDATE staff SET salary = salary * 1.1";
        let driver =
            MockDriver::new("DB2/LINUXX8664", "11.05.0900").with_result(sql, MockResult::affected(4));
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute(sql, &[]).unwrap();
        assert_eq!(cursor.rowcount(), 4);
    }

    #[test]
    fn test_execute_many_sums_rowcount() {
        let sql = "INSERT INTO animals (id, name) VALUES (?, ?)";
        let driver =
            MockDriver::new("DB2/LINUXX8664", "11.05.0900").with_result(sql, MockResult::affected(1));
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor
            .execute_many(
                sql,
                &[
                    vec![Value::from(0), Value::from("Pook")],
                    vec![Value::from(1), Value::from("Sweet Pea")],
                ],
            )
            .unwrap();
        assert_eq!(cursor.rowcount(), 2);
        assert_eq!(driver.executed_params().len(), 2);
    }

    #[test]
    fn test_query_error_category() {
        let sql = "SELECT * FROM missing";
        let driver = MockDriver::new("DB2/LINUXX8664", "11.05.0900").with_statement_error(
            sql,
            crate::native::NativeError::new("SQL0204N \"MISSING\" is an undefined name.")
                .with_sqlstate("42704"),
        );
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        let err = cursor.execute(sql, &[]).unwrap_err();
        assert_eq!(err.query_category(), Some(QueryCategory::Programming));
    }

    #[test]
    fn test_failed_execute_discards_previous_result() {
        let missing = "SELECT * FROM missing";
        let driver = employee_driver("DB2/LINUXX8664").with_statement_error(
            missing,
            crate::native::NativeError::new("SQL0204N \"MISSING\" is an undefined name.")
                .with_sqlstate("42704"),
        );
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();
        assert!(cursor.fetch_row().unwrap().is_some());

        assert!(cursor.execute(missing, &[]).is_err());
        assert_eq!(cursor.rowcount(), -1);
        assert!(cursor.description().unwrap().is_none());
        let err = cursor.fetch_row().unwrap_err();
        assert_eq!(err.query_category(), Some(QueryCategory::Programming));
    }

    #[test]
    fn test_failed_execute_many_discards_previous_result() {
        let insert = "INSERT INTO missing VALUES (?)";
        let driver = employee_driver("DB2/LINUXX8664").with_statement_error(
            insert,
            crate::native::NativeError::new("SQL0204N \"MISSING\" is an undefined name.")
                .with_sqlstate("42704"),
        );
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();

        assert!(cursor.execute_many(insert, &[vec![Value::from(1)]]).is_err());
        assert!(cursor.description().unwrap().is_none());
        assert!(cursor.fetch_row().is_err());
    }

    #[test]
    fn test_delimited_catalog_identifiers_kept() {
        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor
            .columns(Some("db2inst1"), Some("\"MixedCase\""), None)
            .unwrap();

        assert_eq!(
            driver.catalog_requests(),
            vec![CatalogRequest::Columns {
                schema: Some("DB2INST1".to_string()),
                table: Some("MixedCase".to_string()),
                column: None,
            }]
        );
    }

    #[test]
    fn test_keyset_downgraded_on_informix() {
        let driver = employee_driver("IDS/UNIX64");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.set_cursor_type(CursorType::KeysetDriven);
        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();
        assert_eq!(driver.executed_cursor_types(), vec![CursorType::ForwardOnly]);

        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.set_cursor_type(CursorType::KeysetDriven);
        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();
        assert_eq!(driver.executed_cursor_types(), vec![CursorType::KeysetDriven]);
    }

    #[test]
    fn test_operations_after_connection_close() {
        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.execute(EMPLOYEE_SQL, &[]).unwrap();

        conn.close().unwrap();
        let err = cursor.fetch_row().unwrap_err();
        assert!(err.is_connection());
        assert_eq!(err.to_string(), "Connection error: connection is closed");
        assert!(cursor.execute(EMPLOYEE_SQL, &[]).unwrap_err().is_connection());
    }

    #[test]
    fn test_operations_after_connection_drop() {
        let driver = employee_driver("DB2/LINUXX8664");
        let mut cursor = {
            let conn = open(&driver);
            conn.cursor().unwrap()
        };
        assert!(cursor.execute(EMPLOYEE_SQL, &[]).unwrap_err().is_connection());
    }

    #[test]
    fn test_closed_cursor() {
        let driver = employee_driver("DB2/LINUXX8664");
        let conn = open(&driver);
        let mut cursor = conn.cursor().unwrap();
        cursor.close();
        assert!(cursor.is_closed());
        assert!(cursor.execute(EMPLOYEE_SQL, &[]).unwrap_err().is_connection());
        assert!(conn.is_connected());
    }
}
