use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    db::ContractStore,
    error::{AppError, Result},
    models::contract::{
        Category, ContractId, ContractPatch, ContractRecord, NewContract, PrincipalId,
    },
};

/// Store kept in process memory, in insertion order
#[derive(Default)]
pub struct MemoryContractStore {
    records: RwLock<Vec<ContractRecord>>,
}

impl MemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts a record in place as-is, keeping its id and timestamps
    pub async fn seed(&self, record: ContractRecord) {
        self.records.write().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ContractStore for MemoryContractStore {
    async fn insert(&self, contract: NewContract) -> Result<ContractId> {
        let id = uuid::Uuid::new_v4().to_string();
        self.records.write().await.push(ContractRecord {
            id: id.clone(),
            owner_id: contract.owner_id,
            name: contract.name,
            contact: contract.contact,
            category: contract.category,
            expires_at: Some(contract.expires_at),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn query_by_owner_and_category(
        &self,
        owner_id: &PrincipalId,
        category: Option<Category>,
    ) -> Result<Vec<ContractRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| &r.owner_id == owner_id)
            .filter(|r| category.is_none_or(|c| r.category == c))
            .cloned()
            .collect())
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
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id && &r.owner_id == owner_id)
            .ok_or(AppError::ContractNotFound)?;
        patch.apply_to(record);
        Ok(())
    }

    async fn delete(&self, owner_id: &PrincipalId, id: &ContractId) -> Result<()> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| !(&r.id == id && &r.owner_id == owner_id));
        if records.len() == before {
            return Err(AppError::ContractNotFound);
        }
        Ok(())
    }
}
