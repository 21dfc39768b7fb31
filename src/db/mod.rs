use anyhow::Result as AnyResult;
use async_trait::async_trait;
use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::time::Duration;

use crate::error::Result;
use crate::models::contract::{
    Category, ContractId, ContractPatch, ContractRecord, NewContract, PrincipalId,
};

pub mod contract_store;
pub mod memory_store;

pub use contract_store::SqliteContractStore;
pub use memory_store::MemoryContractStore;

pub type DbPool = Pool<Sqlite>;

/// Document store holding contract records.
///
/// Every call is scoped to an owner: records of other principals are
/// neither returned nor modified.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Persists a new record, assigning `id` and `created_at`
    async fn insert(&self, contract: NewContract) -> Result<ContractId>;

    /// Equality filter on owner and, when given, category. No ordering.
    async fn query_by_owner_and_category(
        &self,
        owner_id: &PrincipalId,
        category: Option<Category>,
    ) -> Result<Vec<ContractRecord>>;

    /// Merges `patch` into the record
    async fn update(&self, owner_id: &PrincipalId, id: &ContractId, patch: &ContractPatch)
        -> Result<()>;

    /// Hard delete
    async fn delete(&self, owner_id: &PrincipalId, id: &ContractId) -> Result<()>;
}

/// Initialize the database connection pool
pub async fn init_db_pool(database_url: &str) -> AnyResult<DbPool> {
    // Create the database if it doesn't exist
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        Sqlite::create_database(database_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    setup_database(&pool).await?;

    Ok(pool)
}

/// Set up the database schema
pub async fn setup_database(pool: &DbPool) -> AnyResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contracts (
            id TEXT PRIMARY KEY NOT NULL,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            contact TEXT,
            category TEXT NOT NULL,
            expires_at TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contracts_owner_category ON contracts (owner_id, category);",
    )
    .execute(pool)
    .await?;

    Ok(())
}
