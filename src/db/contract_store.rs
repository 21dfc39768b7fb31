use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use crate::{
    db::{ContractStore, DbPool},
    error::{AppError, Result},
    models::contract::{
        Category, ContractId, ContractPatch, ContractRecord, NewContract, PrincipalId,
    },
};

/// Row as stored. `expires_at` stays raw so a malformed value can be
/// surfaced as "unknown" instead of failing the whole query.
#[derive(Debug, FromRow)]
struct ContractRow {
    id: String,
    owner_id: String,
    name: String,
    contact: Option<String>,
    category: String,
    expires_at: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for ContractRecord {
    type Error = AppError;

    fn try_from(row: ContractRow) -> Result<Self> {
        let category: Category = row
            .category
            .parse()
            .map_err(|e| AppError::Internal(format!("contract {}: {}", row.id, e)))?;
        let expires_at = row
            .expires_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc));

        Ok(ContractRecord {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            contact: row.contact,
            category,
            expires_at,
            created_at: row.created_at,
        })
    }
}

/// SQLite backed contract store
#[derive(Clone)]
pub struct SqliteContractStore {
    pool: DbPool,
}

impl SqliteContractStore {
    /// Create a new store with the provided database pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl ContractStore for SqliteContractStore {
    async fn insert(&self, contract: NewContract) -> Result<ContractId> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO contracts (id, owner_id, name, contact, category, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&contract.owner_id)
        .bind(&contract.name)
        .bind(&contract.contact)
        .bind(contract.category.as_str())
        .bind(contract.expires_at.to_rfc3339())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(id)
    }

    async fn query_by_owner_and_category(
        &self,
        owner_id: &PrincipalId,
        category: Option<Category>,
    ) -> Result<Vec<ContractRecord>> {
        let mut query =
            QueryBuilder::<Sqlite>::new("SELECT * FROM contracts WHERE owner_id = ");
        query.push_bind(owner_id);
        if let Some(category) = category {
            query.push(" AND category = ").push_bind(category.as_str());
        }
        query.push(" ORDER BY rowid");

        let rows = query
            .build_query_as::<ContractRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        rows.into_iter().map(ContractRecord::try_from).collect()
    }

    async fn update(
        &self,
        owner_id: &PrincipalId,
        id: &ContractId,
        patch: &ContractPatch,
    ) -> Result<()> {
        if patch.is_empty() {
            return Err(AppError::BadRequest("Nothing to update".into()));
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE contracts SET ");
        {
            let mut fields = query.separated(", ");
            if let Some(name) = &patch.name {
                fields.push("name = ").push_bind_unseparated(name.clone());
            }
            if let Some(contact) = &patch.contact {
                fields.push("contact = ").push_bind_unseparated(contact.clone());
            }
            if let Some(category) = patch.category {
                fields
                    .push("category = ")
                    .push_bind_unseparated(category.as_str());
            }
            if let Some(expires_at) = patch.expires_at {
                fields
                    .push("expires_at = ")
                    .push_bind_unseparated(expires_at.to_rfc3339());
            }
        }
        query.push(" WHERE id = ").push_bind(id);
        query.push(" AND owner_id = ").push_bind(owner_id);

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::ContractNotFound);
        }

        Ok(())
    }

    async fn delete(&self, owner_id: &PrincipalId, id: &ContractId) -> Result<()> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::ContractNotFound);
        }

        Ok(())
    }
}
