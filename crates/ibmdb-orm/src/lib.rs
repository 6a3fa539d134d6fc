//! ORM backend adapter for DB2-family servers.
//!
//! Normalizes the three historical settings shapes of the framework into
//! one set of connection parameters and exposes a lazily connecting
//! [`DatabaseWrapper`] with the narrow surface the ORM calls into.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use ibmdb::CasePolicy;
//! use ibmdb_orm::{DatabaseWrapper, SettingsRecord};
//!
//! let settings = SettingsRecord::infer(map)?;
//! let mut db = DatabaseWrapper::new(settings, Arc::new(driver));
//! db.set_case_policy(CasePolicy::Upper)?;
//!
//! let mut cursor = db.cursor()?; // connects on first use
//! cursor.execute("SELECT empno FROM employee", &[])?;
//! ```

pub mod client;
pub mod config;
pub mod features;
pub mod introspection;
pub mod observability;
pub mod operations;
pub mod settings;
pub mod signals;
pub mod wrapper;

pub use client::DatabaseClient;
pub use features::DatabaseFeatures;
pub use introspection::DatabaseIntrospection;
pub use operations::DatabaseOperations;
pub use settings::{SchemaGeneration, SettingsMap, SettingsRecord};
pub use signals::{ConnectionCreated, ConnectionObserver, ConnectionSignal, ObserverResult};
pub use wrapper::DatabaseWrapper;
