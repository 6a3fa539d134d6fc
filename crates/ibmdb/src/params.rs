//! Canonical connection parameters.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::native::{ConnectTarget, Credentials, NativeOptions};

/// Canonical connection parameters.
///
/// `name` is a catalogued database alias or a complete `KEY=value;`
/// connection string. It is never empty.
#[derive(Clone, PartialEq, Serialize)]
pub struct ConnectionParameters {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing)]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<NativeOptions>,
}

impl ConnectionParameters {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::configuration("missing database name"));
        }
        Ok(Self {
            name,
            user: None,
            password: None,
            host: None,
            port: None,
            options: None,
        })
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: NativeOptions) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[must_use]
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    #[must_use]
    pub const fn options(&self) -> Option<&NativeOptions> {
        self.options.as_ref()
    }

    /// Native connect target.
    ///
    /// A name containing `=` is already a connection string. A host turns the
    /// parameters into a TCP/IP connection string carrying the credentials.
    /// Otherwise the name is a catalogued alias.
    #[must_use]
    pub fn target(&self) -> ConnectTarget {
        if self.name.contains('=') {
            return ConnectTarget::ConnectionString(self.name.clone());
        }

        let Some(host) = &self.host else {
            return ConnectTarget::Catalogued(self.name.clone());
        };

        let mut dsn = format!("DATABASE={};HOSTNAME={host};", self.name);
        if let Some(port) = &self.port {
            dsn.push_str(&format!("PORT={port};"));
        }
        dsn.push_str("PROTOCOL=TCPIP;");
        if let Some(user) = &self.user {
            dsn.push_str(&format!("UID={user};"));
        }
        if let Some(password) = &self.password {
            dsn.push_str(&format!("PWD={password};"));
        }
        ConnectTarget::ConnectionString(dsn)
    }

    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials {
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("options", &self.options)
            .finish()
    }
}
