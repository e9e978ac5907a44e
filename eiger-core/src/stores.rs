use std::path::Path;

use tracing::info;

use crate::catalog::SqliteCatalogStore;
use crate::completion::{CompletionRecorder, FanoutConfig, MetricFanout, SqliteOutboxStore};
use crate::config::EigerConfig;
use crate::error::EigerResult;
use crate::plan::{PlanBuilder, SqlitePlanStore};
use crate::sqlite::SqliteDatabase;

/// Every store over one database file, so cross-entity writes share a
/// transaction.
#[derive(Debug, Clone)]
pub struct EigerStores {
    pub db: SqliteDatabase,
    pub catalog: SqliteCatalogStore,
    pub plans: SqlitePlanStore,
    pub completions: CompletionRecorder,
    pub outbox: SqliteOutboxStore,
}

impl EigerStores {
    pub fn new(db: SqliteDatabase) -> Self {
        Self {
            catalog: SqliteCatalogStore::new(db.clone()),
            plans: SqlitePlanStore::new(db.clone()),
            completions: CompletionRecorder::new(db.clone()),
            outbox: SqliteOutboxStore::new(db.clone()),
            db,
        }
    }

    pub fn open(path: impl AsRef<Path>) -> EigerResult<Self> {
        Ok(Self::new(SqliteDatabase::new(path)?))
    }

    pub fn from_config(config: &EigerConfig) -> EigerResult<Self> {
        Ok(Self::open(config.database_path())?
            .with_plan_builder(PlanBuilder::new(config.planning.max_duration_weeks)))
    }

    pub fn with_plan_builder(mut self, builder: PlanBuilder) -> Self {
        self.plans = self.plans.with_builder(builder);
        self
    }

    /// Creates the schema. Completion tables reference plan and catalog rows,
    /// so they go last.
    pub fn initialize(&self) -> EigerResult<()> {
        self.catalog.initialize()?;
        self.plans.initialize()?;
        self.completions.initialize()?;
        info!(path = %self.db.path().display(), "database schema ready");
        Ok(())
    }

    pub fn fanout(&self, config: FanoutConfig) -> MetricFanout {
        MetricFanout::new(self.outbox.clone(), config)
    }
}
