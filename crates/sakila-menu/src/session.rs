// SPDX-License-Identifier: Apache-2.0

//! The query session: one DataFusion context plus one table source,
//! created at startup and closed when the menu exits.

use std::fmt;
use std::sync::Arc;

use datafusion::prelude::{DataFrame, SessionConfig, SessionContext};
use tracing::{debug, info};

use crate::error::{MenuResult, QueryError, QueryErrorKind};
use crate::source::TableSource;

/// Tables of the Sakila schema used by the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SakilaTable {
    Actor,
    Film,
    FilmCategory,
    Category,
}

impl SakilaTable {
    pub fn name(self) -> &'static str {
        match self {
            SakilaTable::Actor => "actor",
            SakilaTable::Film => "film",
            SakilaTable::FilmCategory => "film_category",
            SakilaTable::Category => "category",
        }
    }
}

impl fmt::Display for SakilaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub struct SakilaSession {
    ctx: SessionContext,
    source: Arc<dyn TableSource>,
}

impl SakilaSession {
    pub fn new(source: Arc<dyn TableSource>) -> Self {
        let config = SessionConfig::new().with_information_schema(false);
        let ctx = SessionContext::new_with_config(config);
        info!("Created query session {}", ctx.session_id());
        Self { ctx, source }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Load `table` fresh from the source and register it under its own
    /// name, replacing any earlier load, so joins see qualified columns.
    pub async fn table(&self, table: SakilaTable) -> MenuResult<DataFrame> {
        debug!("Fetching table {}", table);
        let provider = self.source.load(table.name()).await?;
        self.ctx.deregister_table(table.name())?;
        self.ctx.register_table(table.name(), provider)?;
        Ok(self.ctx.table(table.name()).await?)
    }

    /// Read a free-form relation, e.g. `(SELECT * FROM actor) as t`.
    ///
    /// Only the relation's schema is resolved here; rows are read when the
    /// returned frame is executed.
    pub async fn custom_query(&self, dbtable: &str) -> Result<DataFrame, QueryError> {
        let dbtable = dbtable.trim();
        if dbtable.is_empty() {
            return Err(QueryError::new(QueryErrorKind::Value, "empty query"));
        }
        debug!("Running custom query {}", dbtable);
        let provider = self.source.load(dbtable).await?;
        Ok(self.ctx.read_table(provider)?)
    }

    /// Release the source's connections
    pub async fn close(self) -> MenuResult<()> {
        info!("Closing query session {}", self.ctx.session_id());
        self.source.close().await?;
        Ok(())
    }
}

impl fmt::Debug for SakilaSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SakilaSession")
            .field("session_id", &self.ctx.session_id())
            .field("source", &self.source)
            .finish()
    }
}
