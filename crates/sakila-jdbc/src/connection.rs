// SPDX-License-Identifier: Apache-2.0

//! Connection handle for the MySQL side of the bridge.

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder, Pool};
use tracing::{debug, info};

use crate::error::{JdbcError, Result};
use crate::options::JdbcOptions;

/// A long-lived handle to one database, shared by every table read through it.
///
/// Cloning is cheap and every clone talks to the same server session set;
/// call [`JdbcConnection::disconnect`] once when the owner is done.
#[derive(Clone)]
pub struct JdbcConnection {
    pool: Pool,
    url: String,
    user: Option<String>,
}

impl JdbcConnection {
    /// Open a handle from the URL and credentials in `options`.
    ///
    /// No network traffic happens here; use [`JdbcConnection::ping`] to
    /// check that the server is reachable.
    pub fn open(options: &JdbcOptions) -> Result<Self> {
        let driver_url = options.driver_url()?;
        let opts = Opts::from_url(&driver_url)
            .map_err(|e| JdbcError::InvalidOptions(format!("invalid JDBC URL: {}", e)))?;

        let builder = OptsBuilder::from_opts(opts)
            .user(options.user.clone())
            .pass(options.password.clone());

        info!("Opening JDBC connection to {}", options.url);

        Ok(Self {
            pool: Pool::new(Opts::from(builder)),
            url: options.url.clone(),
            user: options.user.clone(),
        })
    }

    /// Borrow a server connection
    pub async fn get(&self) -> Result<Conn> {
        debug!("Acquiring connection to {}", self.url);
        Ok(self.pool.get_conn().await?)
    }

    /// Round-trip to the server
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.get().await?;
        conn.ping().await?;
        info!("JDBC connection to {} is alive", self.url);
        Ok(())
    }

    /// Close every server connection held by this handle
    pub async fn disconnect(self) -> Result<()> {
        info!("Closing JDBC connection to {}", self.url);
        self.pool.disconnect().await?;
        Ok(())
    }

    /// The JDBC URL this handle was opened with
    pub fn url(&self) -> &str {
        &self.url
    }
}

// Implement Debug manually to avoid printing credentials
impl std::fmt::Debug for JdbcConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JdbcConnection")
            .field("url", &self.url)
            .field("user", &self.user)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(url: &str) -> JdbcOptions {
        JdbcOptions {
            url: url.to_string(),
            dbtable: Some("actor".to_string()),
            user: Some("sakila".to_string()),
            password: Some("p_ssW0rd".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_open_does_not_connect() {
        let conn = JdbcConnection::open(&options("jdbc:mysql://localhost:3306/sakila")).unwrap();
        assert_eq!(conn.url(), "jdbc:mysql://localhost:3306/sakila");
    }

    #[tokio::test]
    async fn test_debug_hides_password() {
        let conn = JdbcConnection::open(&options("jdbc:mysql://localhost:3306/sakila")).unwrap();
        let rendered = format!("{:?}", conn);
        assert!(rendered.contains("sakila"));
        assert!(!rendered.contains("p_ssW0rd"));
    }

    #[test]
    fn test_open_rejects_non_jdbc_url() {
        let result = JdbcConnection::open(&options("mysql://localhost:3306/sakila"));
        assert!(matches!(result, Err(JdbcError::InvalidOptions(_))));
    }
}
