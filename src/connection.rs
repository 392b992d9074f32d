//! Connection details for a running instance.

use std::fmt;

use crate::Config;

/// Host every instance binds to.
pub(crate) const HOST: &str = "localhost";

/// Describes how to reach a started instance.
///
/// # Examples
/// ```
/// use pg_embed_lifecycle::{Config, ConnectionMetadata};
///
/// let metadata = ConnectionMetadata::from_config(&Config::default().with_port(15_432));
/// assert_eq!(
///     metadata.connection_string("postgres"),
///     "host=localhost port=15432 user=postgres password=postgres dbname=postgres sslmode=disable",
/// );
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    port: u16,
    username: String,
    password: String,
    database: String,
}

impl ConnectionMetadata {
    /// Captures the connection fields of `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: config.port(),
            username: config.username().to_owned(),
            password: config.password().to_owned(),
            database: config.database().to_owned(),
        }
    }

    /// Host name clients should connect to.
    #[must_use]
    pub const fn host(&self) -> &'static str {
        HOST
    }

    /// TCP port the server listens on.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Superuser account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Superuser password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Database provisioned for the caller.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Renders a libpq key/value connection string targeting `database`.
    ///
    /// Values containing whitespace, quotes, or backslashes are quoted.
    #[must_use]
    pub fn connection_string(&self, database: &str) -> String {
        format!(
            "host={HOST} port={} user={} password={} dbname={} sslmode=disable",
            self.port,
            quote_value(&self.username),
            quote_value(&self.password),
            quote_value(database),
        )
    }

    /// Connection string for the provisioned database.
    #[must_use]
    pub fn database_connection_string(&self) -> String {
        self.connection_string(&self.database)
    }
}

impl fmt::Debug for ConnectionMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionMetadata")
            .field("host", &HOST)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|ch| ch.is_whitespace() || ch == '\'' || ch == '\\');
    if !needs_quotes {
        return value.to_owned();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        if ch == '\'' || ch == '\\' {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('\'');
    quoted
}

/// Escapes `"` in an SQL identifier for use inside double quotes.
pub(crate) fn escape_identifier(identifier: &str) -> String {
    identifier.replace('"', "\"\"")
}
