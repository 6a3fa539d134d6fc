//! Interactive shell through the DB2 command line processor.

use std::process::Command;

use ibmdb::ConnectionParameters;

/// Command line processor executable.
pub const CLP_PROGRAM: &str = "db2";

/// Builds `db2` invocations for a resolved set of parameters.
///
/// The CLP back-end keeps the connection between invocations of the same
/// shell session, so the shell is a `connect` followed by an interactive
/// `db2` run.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    params: ConnectionParameters,
}

impl DatabaseClient {
    #[must_use]
    pub const fn new(params: ConnectionParameters) -> Self {
        Self { params }
    }

    /// Arguments of `db2 connect to NAME [user U [using P]]`.
    #[must_use]
    pub fn connect_args(&self) -> Vec<String> {
        let mut args = vec![
            "connect".to_string(),
            "to".to_string(),
            self.params.name().to_string(),
        ];
        if let Some(user) = self.params.user() {
            args.extend(["user".to_string(), user.to_string()]);
            if let Some(password) = self.params.password() {
                args.extend(["using".to_string(), password.to_string()]);
            }
        }
        args
    }

    #[must_use]
    pub fn connect_command(&self) -> Command {
        let mut command = Command::new(CLP_PROGRAM);
        command.args(self.connect_args());
        command
    }

    /// Interactive CLP with `;` as statement terminator.
    #[must_use]
    pub fn shell_command() -> Command {
        let mut command = Command::new(CLP_PROGRAM);
        command.arg("-t");
        command
    }
}
