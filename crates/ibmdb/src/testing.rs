//! Scripted in-memory native driver.
//!
//! Lets the connection stack run without a live server. Clones of a
//! [`MockDriver`] share their call log, so a test keeps one clone for
//! assertions and hands another to the code under test.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::native::{
    CatalogRequest, ConnectTarget, Credentials, CursorType, NativeDriver, NativeError,
    NativeOptions, NativeSession, NativeStatement,
};
use crate::types::{ColumnDescription, ServerInfo, SqlType, Value};

/// Canned outcome of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockResult {
    pub columns: Vec<ColumnDescription>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: i64,
}

impl MockResult {
    /// Result set with `VARCHAR` columns.
    #[must_use]
    pub fn rows(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|name| ColumnDescription::new(*name, SqlType::VarChar))
                .collect(),
            rows,
            row_count: -1,
        }
    }

    /// DML outcome with no result set.
    #[must_use]
    pub fn affected(row_count: i64) -> Self {
        Self {
            row_count,
            ..Self::default()
        }
    }
}

/// One `execute` call seen by the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub cursor_type: CursorType,
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
struct MockState {
    connect_calls: usize,
    close_calls: usize,
    commits: usize,
    rollbacks: usize,
    last_target: Option<ConnectTarget>,
    last_credentials: Option<Credentials>,
    last_options: Option<NativeOptions>,
    autocommit_calls: Vec<bool>,
    executed: Vec<ExecutedStatement>,
    catalog_requests: Vec<CatalogRequest>,
}

#[derive(Debug, Default)]
struct Script {
    results: HashMap<String, MockResult>,
    statement_errors: HashMap<String, NativeError>,
    catalog: MockResult,
    connect_error: Option<NativeError>,
    server_info_error: Option<NativeError>,
}

/// Native driver answering from a fixed script.
#[derive(Debug, Clone)]
pub struct MockDriver {
    server: ServerInfo,
    script: Arc<Mutex<Script>>,
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Driver whose sessions report `dbms_name` and `dbms_version`.
    #[must_use]
    pub fn new(dbms_name: &str, dbms_version: &str) -> Self {
        Self {
            server: ServerInfo::new(dbms_name, dbms_version),
            script: Arc::default(),
            state: Arc::default(),
        }
    }

    /// Answer `sql` with `result`. Unscripted statements affect zero rows.
    #[must_use]
    pub fn with_result(self, sql: &str, result: MockResult) -> Self {
        self.script.lock().results.insert(sql.to_string(), result);
        self
    }

    /// Fail `sql` at execute time.
    #[must_use]
    pub fn with_statement_error(self, sql: &str, error: NativeError) -> Self {
        self.script
            .lock()
            .statement_errors
            .insert(sql.to_string(), error);
        self
    }

    /// Answer every catalog call with `result`.
    #[must_use]
    pub fn with_catalog_result(self, result: MockResult) -> Self {
        self.script.lock().catalog = result;
        self
    }

    /// Fail every connect attempt.
    #[must_use]
    pub fn failing_connect(self, error: NativeError) -> Self {
        self.script.lock().connect_error = Some(error);
        self
    }

    /// Connect succeeds but reading the server attributes fails.
    #[must_use]
    pub fn failing_server_info(self, error: NativeError) -> Self {
        self.script.lock().server_info_error = Some(error);
        self
    }

    #[must_use]
    pub fn connect_calls(&self) -> usize {
        self.state.lock().connect_calls
    }

    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    #[must_use]
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }

    #[must_use]
    pub fn last_target(&self) -> Option<ConnectTarget> {
        self.state.lock().last_target.clone()
    }

    #[must_use]
    pub fn last_credentials(&self) -> Option<Credentials> {
        self.state.lock().last_credentials.clone()
    }

    #[must_use]
    pub fn last_options(&self) -> Option<NativeOptions> {
        self.state.lock().last_options.clone()
    }

    #[must_use]
    pub fn autocommit_calls(&self) -> Vec<bool> {
        self.state.lock().autocommit_calls.clone()
    }

    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.state.lock().executed.clone()
    }

    #[must_use]
    pub fn executed_sql(&self) -> Vec<String> {
        self.state
            .lock()
            .executed
            .iter()
            .map(|e| e.sql.clone())
            .collect()
    }

    #[must_use]
    pub fn executed_params(&self) -> Vec<Vec<Value>> {
        self.state
            .lock()
            .executed
            .iter()
            .map(|e| e.params.clone())
            .collect()
    }

    #[must_use]
    pub fn executed_cursor_types(&self) -> Vec<CursorType> {
        self.state
            .lock()
            .executed
            .iter()
            .map(|e| e.cursor_type)
            .collect()
    }

    #[must_use]
    pub fn catalog_requests(&self) -> Vec<CatalogRequest> {
        self.state.lock().catalog_requests.clone()
    }
}

impl NativeDriver for MockDriver {
    fn connect(
        &self,
        target: &ConnectTarget,
        credentials: &Credentials,
        options: &NativeOptions,
    ) -> Result<Box<dyn NativeSession>, NativeError> {
        {
            let mut state = self.state.lock();
            state.connect_calls += 1;
            state.last_target = Some(target.clone());
            state.last_credentials = Some(credentials.clone());
            state.last_options = Some(options.clone());
        }
        if let Some(err) = &self.script.lock().connect_error {
            return Err(err.clone());
        }
        Ok(Box::new(MockSession {
            server: self.server.clone(),
            script: Arc::clone(&self.script),
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

#[derive(Debug)]
struct MockSession {
    server: ServerInfo,
    script: Arc<Mutex<Script>>,
    state: Arc<Mutex<MockState>>,
    closed: bool,
}

impl MockSession {
    fn check_open(&self) -> Result<(), NativeError> {
        if self.closed {
            return Err(NativeError::new("connection handle released").with_sqlstate("08003"));
        }
        Ok(())
    }
}

impl NativeSession for MockSession {
    fn server_info(&mut self) -> Result<ServerInfo, NativeError> {
        self.check_open()?;
        if let Some(error) = self.script.lock().server_info_error.clone() {
            return Err(error);
        }
        Ok(self.server.clone())
    }

    fn prepare(
        &mut self,
        sql: &str,
        cursor_type: CursorType,
    ) -> Result<Box<dyn NativeStatement>, NativeError> {
        self.check_open()?;
        let script = self.script.lock();
        Ok(Box::new(MockStatement {
            sql: sql.to_string(),
            cursor_type,
            result: script.results.get(sql).cloned().unwrap_or_default(),
            error: script.statement_errors.get(sql).cloned(),
            state: Arc::clone(&self.state),
            cursor: 0,
        }))
    }

    fn catalog(
        &mut self,
        request: &CatalogRequest,
    ) -> Result<Box<dyn NativeStatement>, NativeError> {
        self.check_open()?;
        self.state.lock().catalog_requests.push(request.clone());
        Ok(Box::new(MockStatement {
            sql: String::new(),
            cursor_type: CursorType::ForwardOnly,
            result: self.script.lock().catalog.clone(),
            error: None,
            state: Arc::clone(&self.state),
            cursor: 0,
        }))
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<(), NativeError> {
        self.check_open()?;
        self.state.lock().autocommit_calls.push(enabled);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), NativeError> {
        self.check_open()?;
        self.state.lock().commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), NativeError> {
        self.check_open()?;
        self.state.lock().rollbacks += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), NativeError> {
        self.check_open()?;
        self.closed = true;
        self.state.lock().close_calls += 1;
        Ok(())
    }
}

#[derive(Debug)]
struct MockStatement {
    sql: String,
    cursor_type: CursorType,
    result: MockResult,
    error: Option<NativeError>,
    state: Arc<Mutex<MockState>>,
    cursor: usize,
}

impl NativeStatement for MockStatement {
    fn execute(&mut self, params: &[Value]) -> Result<(), NativeError> {
        self.state.lock().executed.push(ExecutedStatement {
            sql: self.sql.clone(),
            cursor_type: self.cursor_type,
            params: params.to_vec(),
        });
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        self.cursor = 0;
        Ok(())
    }

    fn columns(&self) -> Vec<ColumnDescription> {
        self.result.columns.clone()
    }

    fn fetch(&mut self) -> Result<Option<Vec<Value>>, NativeError> {
        let row = self.result.rows.get(self.cursor).cloned();
        if row.is_some() {
            self.cursor += 1;
        }
        Ok(row)
    }

    fn row_count(&self) -> i64 {
        self.result.row_count
    }
}
