// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{JdbcError, Result};

/// Driver classes accepted for a MySQL-compatible URL
pub const MYSQL_DRIVERS: &[&str] = &[
    "com.mysql.cj.jdbc.Driver",
    "com.mysql.jdbc.Driver",
    "org.mariadb.jdbc.Driver",
];

const URL_SCHEMES: &[&str] = &["jdbc:mysql://", "jdbc:mariadb://"];

/// JDBC connection and read options
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct JdbcOptions {
    /// JDBC URL (e.g., "jdbc:mysql://localhost:3306/sakila")
    pub url: String,

    /// Table name or parenthesised subquery with an alias
    pub dbtable: Option<String>,

    /// Database user
    pub user: Option<String>,

    /// Database password
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Driver class name, kept for compatibility with JDBC property sets
    pub driver: Option<String>,

    /// Partition column for parallel reads
    pub partition_column: Option<String>,

    /// Lower bound for partitioning
    pub lower_bound: Option<i64>,

    /// Upper bound for partitioning
    pub upper_bound: Option<i64>,

    /// Number of partitions
    pub num_partitions: usize,

    /// Maximum number of rows per record batch
    pub fetch_size: usize,

    /// Explicit partition predicates (comma-separated)
    pub predicates: Option<String>,
}

impl Default for JdbcOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            dbtable: None,
            user: None,
            password: None,
            driver: None,
            partition_column: None,
            lower_bound: None,
            upper_bound: None,
            num_partitions: 1,
            fetch_size: 10000,
            predicates: None,
        }
    }
}

impl JdbcOptions {
    /// Parse JDBC options from a hashmap whose keys are already lowercase
    pub fn from_hashmap(options: &HashMap<String, String>) -> Result<Self> {
        let mut jdbc_opts = Self::default();

        jdbc_opts.url = options
            .get("url")
            .ok_or_else(|| JdbcError::InvalidOptions("missing 'url' option".to_string()))?
            .clone();

        if options.contains_key("query") {
            return Err(JdbcError::InvalidOptions(
                "'query' is not supported, pass a parenthesised subquery with an alias as 'dbtable'"
                    .to_string(),
            ));
        }

        jdbc_opts.dbtable = Some(
            options
                .get("dbtable")
                .ok_or_else(|| JdbcError::InvalidOptions("missing 'dbtable' option".to_string()))?
                .clone(),
        );

        jdbc_opts.user = options.get("user").cloned();
        jdbc_opts.password = options.get("password").cloned();
        jdbc_opts.driver = options.get("driver").cloned();

        jdbc_opts.partition_column = options.get("partitioncolumn").cloned();
        jdbc_opts.lower_bound = parse_optional(options, "lowerbound")?;
        jdbc_opts.upper_bound = parse_optional(options, "upperbound")?;

        if let Some(num_partitions) = parse_optional(options, "numpartitions")? {
            jdbc_opts.num_partitions = num_partitions;
        }

        if let Some(fetch_size) = parse_optional(options, "fetchsize")? {
            jdbc_opts.fetch_size = fetch_size;
        }

        jdbc_opts.predicates = options.get("predicates").cloned();

        Ok(jdbc_opts)
    }

    /// Build options the way `spark.read.jdbc(url, table, properties)` does:
    /// property sets are merged in order and the explicit url and table win.
    pub fn from_properties(
        url: &str,
        dbtable: &str,
        properties: Vec<HashMap<String, String>>,
    ) -> Result<Self> {
        let mut merged = merge_options(properties);
        merged.insert("url".to_string(), url.to_string());
        merged.insert("dbtable".to_string(), dbtable.to_string());
        Self::from_hashmap(&merged)
    }

    /// Validate options
    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(JdbcError::InvalidOptions("empty URL".to_string()));
        }

        if !URL_SCHEMES.iter().any(|scheme| self.url.starts_with(scheme)) {
            return Err(JdbcError::InvalidOptions(format!(
                "unsupported JDBC URL: {}",
                self.url
            )));
        }

        if let Some(driver) = &self.driver {
            if !MYSQL_DRIVERS.contains(&driver.as_str()) {
                return Err(JdbcError::InvalidOptions(format!(
                    "unsupported driver: {}",
                    driver
                )));
            }
        }

        match &self.dbtable {
            Some(table) if table.trim().is_empty() => {
                return Err(JdbcError::InvalidOptions("empty 'dbtable'".to_string()));
            }
            Some(_) => {}
            None => {
                return Err(JdbcError::InvalidOptions("missing 'dbtable' option".to_string()));
            }
        }

        if self.num_partitions == 0 {
            return Err(JdbcError::InvalidOptions(
                "numPartitions must be > 0".to_string(),
            ));
        }

        if self.fetch_size == 0 {
            return Err(JdbcError::InvalidOptions("fetchsize must be > 0".to_string()));
        }

        // If partition column specified, must have bounds
        if self.partition_column.is_some()
            && (self.lower_bound.is_none() || self.upper_bound.is_none())
        {
            return Err(JdbcError::InvalidOptions(
                "partitionColumn requires lowerBound and upperBound".to_string(),
            ));
        }

        if let (Some(lower), Some(upper)) = (self.lower_bound, self.upper_bound) {
            if lower > upper {
                return Err(JdbcError::InvalidOptions(format!(
                    "lowerBound ({}) must not exceed upperBound ({})",
                    lower, upper
                )));
            }
        }

        if self.partition_column.is_some() && self.predicates.is_some() {
            return Err(JdbcError::InvalidOptions(
                "cannot specify both partitionColumn and predicates".to_string(),
            ));
        }

        Ok(())
    }

    /// The relation to read from, usable after `FROM`
    pub fn relation(&self) -> Result<String> {
        self.dbtable
            .as_deref()
            .map(|table| table.trim().to_string())
            .ok_or_else(|| JdbcError::InvalidOptions("missing 'dbtable' option".to_string()))
    }

    /// The URL with its `jdbc:` prefix removed, as understood by the MySQL driver
    pub fn driver_url(&self) -> Result<String> {
        let url = self
            .url
            .strip_prefix("jdbc:")
            .ok_or_else(|| JdbcError::InvalidOptions(format!("not a JDBC URL: {}", self.url)))?;
        Ok(url.replacen("mariadb://", "mysql://", 1))
    }
}

// Implement Debug manually to avoid printing the password
impl std::fmt::Debug for JdbcOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdbcOptions")
            .field("url", &self.url)
            .field("dbtable", &self.dbtable)
            .field("user", &self.user)
            .field("driver", &self.driver)
            .field("partition_column", &self.partition_column)
            .field("lower_bound", &self.lower_bound)
            .field("upper_bound", &self.upper_bound)
            .field("num_partitions", &self.num_partitions)
            .field("fetch_size", &self.fetch_size)
            .field("predicates", &self.predicates)
            .finish()
    }
}

/// Merge multiple option sets into a single HashMap.
/// Later options override earlier ones and keys are lowercased.
pub fn merge_options(options_vec: Vec<HashMap<String, String>>) -> HashMap<String, String> {
    let mut merged = HashMap::new();

    for options in options_vec {
        for (key, value) in options {
            merged.insert(key.to_lowercase(), value);
        }
    }

    merged
}

fn parse_optional<T: std::str::FromStr>(
    options: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>> {
    options
        .get(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| {
                JdbcError::InvalidOptions(format!("invalid {}: {}", key, value))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sakila_options() -> JdbcOptions {
        JdbcOptions {
            url: "jdbc:mysql://localhost:3306/sakila".to_string(),
            dbtable: Some("actor".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_options() {
        let opts1 = HashMap::from([
            ("url".to_string(), "jdbc:mysql://localhost/db1".to_string()),
            ("User".to_string(), "admin".to_string()),
        ]);

        let opts2 = HashMap::from([
            ("URL".to_string(), "jdbc:mysql://localhost/db2".to_string()),
            ("password".to_string(), "secret".to_string()),
        ]);

        let merged = merge_options(vec![opts1, opts2]);

        assert_eq!(merged.get("url"), Some(&"jdbc:mysql://localhost/db2".to_string()));
        assert_eq!(merged.get("user"), Some(&"admin".to_string()));
        assert_eq!(merged.get("password"), Some(&"secret".to_string()));
    }

    #[test]
    fn test_from_properties() {
        let properties = HashMap::from([
            ("user".to_string(), "root".to_string()),
            ("password".to_string(), "pw".to_string()),
            ("driver".to_string(), "com.mysql.cj.jdbc.Driver".to_string()),
        ]);
        let opts = JdbcOptions::from_properties(
            "jdbc:mysql://localhost:3306/sakila",
            "film",
            vec![properties],
        )
        .unwrap();

        assert_eq!(opts.dbtable.as_deref(), Some("film"));
        assert_eq!(opts.user.as_deref(), Some("root"));
        assert_eq!(opts.password.as_deref(), Some("pw"));
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_requires_dbtable() {
        let opts = HashMap::from([("url".to_string(), "jdbc:mysql://h/db".to_string())]);
        assert!(matches!(
            JdbcOptions::from_hashmap(&opts),
            Err(JdbcError::InvalidOptions(_))
        ));

        let opts = HashMap::from([
            ("url".to_string(), "jdbc:mysql://h/db".to_string()),
            ("dbtable".to_string(), "actor".to_string()),
            ("query".to_string(), "SELECT * FROM actor".to_string()),
        ]);
        assert!(matches!(
            JdbcOptions::from_hashmap(&opts),
            Err(JdbcError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_from_properties_with_partitioning() {
        let properties = HashMap::from([
            ("partitionColumn".to_string(), "actor_id".to_string()),
            ("lowerBound".to_string(), "1".to_string()),
            ("upperBound".to_string(), "201".to_string()),
            ("numPartitions".to_string(), "4".to_string()),
        ]);
        let opts = JdbcOptions::from_properties(
            "jdbc:mysql://localhost:3306/sakila",
            "actor",
            vec![properties],
        )
        .unwrap();

        assert_eq!(opts.partition_column.as_deref(), Some("actor_id"));
        assert_eq!(opts.lower_bound, Some(1));
        assert_eq!(opts.upper_bound, Some(201));
        assert_eq!(opts.num_partitions, 4);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_invalid_numeric_option() {
        let opts = HashMap::from([
            ("url".to_string(), "jdbc:mysql://h/db".to_string()),
            ("dbtable".to_string(), "actor".to_string()),
            ("numpartitions".to_string(), "many".to_string()),
        ]);
        assert!(JdbcOptions::from_hashmap(&opts).is_err());
    }

    #[test]
    fn test_validate_rejects_foreign_url_and_driver() {
        let opts = JdbcOptions {
            url: "jdbc:postgresql://localhost:5432/db".to_string(),
            ..sakila_options()
        };
        assert!(opts.validate().is_err());

        let opts = JdbcOptions {
            driver: Some("org.postgresql.Driver".to_string()),
            ..sakila_options()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_validate_partitioning() {
        let opts = JdbcOptions {
            partition_column: Some("actor_id".to_string()),
            lower_bound: Some(1),
            ..sakila_options()
        };
        assert!(opts.validate().is_err());

        let opts = JdbcOptions {
            partition_column: Some("actor_id".to_string()),
            lower_bound: Some(1),
            upper_bound: Some(200),
            predicates: Some("actor_id < 10".to_string()),
            ..sakila_options()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_relation() {
        assert_eq!(sakila_options().relation().unwrap(), "actor");

        let opts = JdbcOptions {
            dbtable: Some(" (SELECT * FROM actor) as t ".to_string()),
            ..sakila_options()
        };
        assert_eq!(opts.relation().unwrap(), "(SELECT * FROM actor) as t");

        let opts = JdbcOptions {
            dbtable: None,
            ..sakila_options()
        };
        assert!(opts.relation().is_err());
    }

    #[test]
    fn test_driver_url() {
        assert_eq!(
            sakila_options().driver_url().unwrap(),
            "mysql://localhost:3306/sakila"
        );

        let opts = JdbcOptions {
            url: "jdbc:mariadb://db:3307/sakila".to_string(),
            ..sakila_options()
        };
        assert_eq!(opts.driver_url().unwrap(), "mysql://db:3307/sakila");
    }

    #[test]
    fn test_password_not_serialized() {
        let opts = JdbcOptions {
            password: Some("secret".to_string()),
            ..sakila_options()
        };
        let json = serde_json::to_string(&opts).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_debug_hides_password() {
        let opts = JdbcOptions {
            user: Some("root".to_string()),
            password: Some("hunter2".to_string()),
            ..sakila_options()
        };
        let rendered = format!("{:?}", opts);
        assert!(rendered.contains("root"));
        assert!(!rendered.contains("hunter2"));
    }
}
