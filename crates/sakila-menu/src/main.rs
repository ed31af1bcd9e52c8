// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use sakila_menu::{JdbcSource, MenuConfig, QueryMenu, SakilaSession};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = MenuConfig::from_env()?;
    info!("Connecting with {:?}", config.connection);

    let source = JdbcSource::open(&config.connection, "actor")?;
    source.ping().await?;
    let session = SakilaSession::new(Arc::new(source));

    let outcome = {
        let menu = QueryMenu::new(&session, config.show_rows);
        let input = BufReader::new(tokio::io::stdin());
        let mut out = std::io::stdout();
        tokio::select! {
            result = menu.run(input, &mut out) => result,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted");
                Ok(())
            }
        }
    };

    session.close().await?;
    outcome?;
    Ok(())
}
