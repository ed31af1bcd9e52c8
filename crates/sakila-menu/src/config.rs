// SPDX-License-Identifier: Apache-2.0

//! Configuration for the Sakila query menu

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MenuError, MenuResult};

/// Configuration for the query menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    /// Database connection
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Number of rows printed for a result table
    #[serde(default = "default_show_rows")]
    pub show_rows: usize,
}

/// Connection to the Sakila database
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// JDBC driver class sent along with the credentials
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Maximum rows per record batch
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    /// Extra JDBC properties applied to every read
    #[serde(default, skip_serializing)]
    pub jdbc_properties: HashMap<String, String>,

    /// Extra JDBC properties applied to reads of one table, keyed by table
    #[serde(default, skip_serializing)]
    pub table_properties: HashMap<String, HashMap<String, String>>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: default_database(),
            username: None,
            password: None,
            driver: default_driver(),
            fetch_size: default_fetch_size(),
            jdbc_properties: HashMap::new(),
            table_properties: HashMap::new(),
        }
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            connection: Default::default(),
            show_rows: default_show_rows(),
        }
    }
}

impl ConnectionConfig {
    /// JDBC URL of the database (e.g., "jdbc:mysql://localhost:3306/sakila")
    pub fn jdbc_url(&self) -> String {
        format!("jdbc:mysql://{}:{}/{}", self.host, self.port, self.database)
    }

    /// JDBC connection properties: user, password, driver and fetch size,
    /// overridden by any extra properties
    pub fn properties(&self) -> HashMap<String, String> {
        let mut properties = HashMap::from([
            ("driver".to_string(), self.driver.clone()),
            ("fetchsize".to_string(), self.fetch_size.to_string()),
        ]);
        if let Some(username) = &self.username {
            properties.insert("user".to_string(), username.clone());
        }
        if let Some(password) = &self.password {
            properties.insert("password".to_string(), password.clone());
        }
        properties.extend(self.jdbc_properties.clone());
        properties
    }

    /// Extra properties scoped to `dbtable`; empty unless it names a table
    /// that has some
    pub fn table_properties(&self, dbtable: &str) -> HashMap<String, String> {
        self.table_properties
            .get(dbtable.trim())
            .cloned()
            .unwrap_or_default()
    }
}

// Implement Debug manually to avoid printing the password
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.jdbc_url())
            .field("username", &self.username)
            .field("driver", &self.driver)
            .field("fetch_size", &self.fetch_size)
            .field("jdbc_properties", &property_keys(&self.jdbc_properties))
            .field(
                "table_properties",
                &self
                    .table_properties
                    .iter()
                    .map(|(table, properties)| (table, property_keys(properties)))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}

// Values may carry credentials, so only keys are shown
fn property_keys(properties: &HashMap<String, String>) -> Vec<&String> {
    let mut keys: Vec<_> = properties.keys().collect();
    keys.sort();
    keys
}

impl MenuConfig {
    /// Load configuration from the environment, reading `.env` first if present.
    ///
    /// `USERNAME` and `PASSWORD` hold the credentials; `SAKILA_HOST`,
    /// `SAKILA_PORT`, `SAKILA_DATABASE`, `SAKILA_DRIVER`, `SAKILA_FETCH_SIZE`
    /// and `SAKILA_SHOW_ROWS` override the defaults. `SAKILA_JDBC_PROPERTIES`
    /// adds JDBC properties, see [`parse_jdbc_properties`].
    pub fn from_env() -> MenuResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => debug!("No .env file found"),
            Err(e) => return Err(MenuError::Config(format!("failed to read .env: {}", e))),
        }

        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> MenuResult<Self> {
        let mut config = Self::default();
        let connection = &mut config.connection;

        connection.username = lookup("USERNAME");
        connection.password = lookup("PASSWORD");

        if let Some(host) = lookup("SAKILA_HOST") {
            connection.host = host;
        }
        if let Some(port) = lookup("SAKILA_PORT") {
            connection.port = parse_var("SAKILA_PORT", &port)?;
        }
        if let Some(database) = lookup("SAKILA_DATABASE") {
            connection.database = database;
        }
        if let Some(driver) = lookup("SAKILA_DRIVER") {
            connection.driver = driver;
        }
        if let Some(fetch_size) = lookup("SAKILA_FETCH_SIZE") {
            connection.fetch_size = parse_var("SAKILA_FETCH_SIZE", &fetch_size)?;
        }
        if let Some(show_rows) = lookup("SAKILA_SHOW_ROWS") {
            config.show_rows = parse_var("SAKILA_SHOW_ROWS", &show_rows)?;
        }
        if let Some(properties) = lookup("SAKILA_JDBC_PROPERTIES") {
            let (global, scoped) = parse_jdbc_properties(&properties)?;
            config.connection.jdbc_properties = global;
            config.connection.table_properties = scoped;
        }

        Ok(config)
    }
}

/// Global and per-table JDBC properties
pub type JdbcProperties = (
    HashMap<String, String>,
    HashMap<String, HashMap<String, String>>,
);

/// Parse `key=value` pairs separated by `;`.
///
/// Keys are case-insensitive and stored lowercase. A key of the form
/// `table.key` applies only to reads of `table`, e.g.
/// `fetchsize=500;actor.partitionColumn=actor_id;actor.numPartitions=4`.
/// Values may contain `=` and `,`.
pub fn parse_jdbc_properties(value: &str) -> MenuResult<JdbcProperties> {
    let mut global = HashMap::new();
    let mut scoped: HashMap<String, HashMap<String, String>> = HashMap::new();

    for pair in value.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            MenuError::Config(format!("invalid JDBC property '{}', expected key=value", pair))
        })?;
        let (key, value) = (key.trim(), value.trim().to_string());
        match key.split_once('.') {
            Some((table, key)) if !table.is_empty() && !key.is_empty() => {
                scoped
                    .entry(table.to_string())
                    .or_default()
                    .insert(key.to_lowercase(), value);
            }
            None if !key.is_empty() => {
                global.insert(key.to_lowercase(), value);
            }
            _ => {
                return Err(MenuError::Config(format!(
                    "invalid JDBC property key '{}'",
                    key
                )))
            }
        }
    }

    Ok((global, scoped))
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> MenuResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MenuError::Config(format!("invalid value for {}: {}", key, value)))
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_database() -> String {
    "sakila".to_string()
}

fn default_driver() -> String {
    "com.mysql.cj.jdbc.Driver".to_string()
}

fn default_fetch_size() -> usize {
    10_000
}

fn default_show_rows() -> usize {
    20
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MenuConfig::default();
        assert_eq!(config.connection.jdbc_url(), "jdbc:mysql://localhost:3306/sakila");
        assert_eq!(config.connection.driver, "com.mysql.cj.jdbc.Driver");
        assert!(config.connection.username.is_none());
        assert_eq!(config.show_rows, 20);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: MenuConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.show_rows, 20);
        assert_eq!(config.connection.port, 3306);
    }

    #[test]
    fn test_from_vars() {
        let config = MenuConfig::from_vars(vars(&[
            ("USERNAME", "root"),
            ("PASSWORD", "secret"),
            ("SAKILA_HOST", "db.internal"),
            ("SAKILA_PORT", "3307"),
            ("SAKILA_SHOW_ROWS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.connection.jdbc_url(), "jdbc:mysql://db.internal:3307/sakila");
        assert_eq!(config.show_rows, 5);

        let properties = config.connection.properties();
        assert_eq!(properties.get("user").map(String::as_str), Some("root"));
        assert_eq!(properties.get("password").map(String::as_str), Some("secret"));
        assert_eq!(
            properties.get("driver").map(String::as_str),
            Some("com.mysql.cj.jdbc.Driver")
        );
    }

    #[test]
    fn test_jdbc_properties() {
        let config = MenuConfig::from_vars(vars(&[(
            "SAKILA_JDBC_PROPERTIES",
            "fetchsize=500; actor.partitionColumn=actor_id;actor.lowerBound=1;\
             actor.upperBound=201;actor.numPartitions=4;film.predicates=`length` < 60,`length` >= 60",
        )]))
        .unwrap();
        let connection = &config.connection;

        assert_eq!(
            connection.properties().get("fetchsize").map(String::as_str),
            Some("500")
        );
        let actor = connection.table_properties("actor");
        assert_eq!(actor.len(), 4);
        assert_eq!(actor.get("partitioncolumn").map(String::as_str), Some("actor_id"));
        assert_eq!(
            connection.table_properties("film").get("predicates").map(String::as_str),
            Some("`length` < 60,`length` >= 60")
        );
        assert!(connection.table_properties("category").is_empty());
    }

    #[test]
    fn test_invalid_jdbc_properties() {
        for value in ["partitionColumn", "=1", "actor.=1", ".numPartitions=4"] {
            assert!(
                matches!(parse_jdbc_properties(value), Err(MenuError::Config(_))),
                "{}",
                value
            );
        }
        let (global, scoped) = parse_jdbc_properties(" ; ").unwrap();
        assert!(global.is_empty() && scoped.is_empty());
    }

    #[test]
    fn test_invalid_port() {
        let result = MenuConfig::from_vars(vars(&[("SAKILA_PORT", "mysql")]));
        assert!(matches!(result, Err(MenuError::Config(_))));
    }

    #[test]
    fn test_debug_and_serialize_hide_password() {
        let config = MenuConfig::from_vars(vars(&[
            ("USERNAME", "root"),
            ("PASSWORD", "hunter2"),
            ("SAKILA_JDBC_PROPERTIES", "password=hunter2;actor.password=hunter2"),
        ]))
        .unwrap();
        assert!(!format!("{:?}", config).contains("hunter2"));
        assert!(!serde_json::to_string(&config).unwrap().contains("hunter2"));
    }
}
