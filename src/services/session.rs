use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::{self, Clock};
use crate::db::ContractStore;
use crate::error::{AppError, Result};
use crate::models::{
    Category, ContractId, ContractPatch, DecoratedContract, NewContract, PrincipalId,
    RequestContext,
};
use crate::services::interaction::{
    Confirm, EditDraft, InteractionState, InteractionStore, QuickRenewal,
};
use crate::services::listing::{self, ListingService};
use crate::validation::{self, ContractInput, Mode, ValidationError};

/// Shown on the open action when a write fails for reasons outside the input
const SAVE_FAILED: &str = "Could not save changes, please try again";

/// Result of an operation that may write to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The write went through and the listing was fetched again
    Committed,
    /// The user did not confirm; nothing was written
    Declined,
    /// No authenticated principal; nothing was attempted
    Suppressed,
}

/// One client's view of its contracts: the current listing, its category
/// scope, and the single action in progress.
pub struct ContractSession {
    listing: ListingService,
    store: Arc<dyn ContractStore>,
    clock: Arc<dyn Clock>,
    default_category: Category,
    scope: Option<Category>,
    contracts: Vec<DecoratedContract>,
    interactions: InteractionStore,
}

impl ContractSession {
    pub fn new(
        store: Arc<dyn ContractStore>,
        clock: Arc<dyn Clock>,
        default_category: Category,
    ) -> Self {
        Self {
            listing: ListingService::new(store.clone(), clock.clone()),
            store,
            clock,
            default_category,
            scope: None,
            contracts: Vec::new(),
            interactions: InteractionStore::new(),
        }
    }

    pub fn contracts(&self) -> &[DecoratedContract] {
        &self.contracts
    }

    pub fn scope(&self) -> Option<Category> {
        self.scope
    }

    pub fn alerts(&self) -> Vec<DecoratedContract> {
        listing::alert_subset(&self.contracts)
    }

    pub fn expired(&self) -> Vec<DecoratedContract> {
        listing::expired_subset(&self.contracts)
    }

    pub fn state_of(&self, id: &str) -> InteractionState {
        self.interactions.state_of(id)
    }

    pub fn active_interaction(&self) -> Option<(&ContractId, &InteractionState)> {
        self.interactions.active()
    }

    /// Re-fetches the listing for `scope`. Actions on contracts that are
    /// gone from the store are dropped.
    pub async fn refresh(
        &mut self,
        ctx: &RequestContext,
        scope: Option<Category>,
    ) -> Result<&[DecoratedContract]> {
        self.scope = scope;
        self.contracts = self.listing.list_for_owner(ctx, scope).await?;
        if self.scope.is_none() {
            self.interactions
                .retain_known(self.contracts.iter().map(|c| c.id()));
        }
        Ok(&self.contracts)
    }

    pub fn find(&self, id: &str) -> Result<&DecoratedContract> {
        self.contracts
            .iter()
            .find(|c| c.id() == id)
            .ok_or(AppError::ContractNotFound)
    }

    /// Validates and stores a new contract. The category defaults to the
    /// session scope, then to the configured default.
    pub async fn create(&mut self, ctx: &RequestContext, input: &ContractInput) -> Result<Outcome> {
        let Some(owner_id) = ctx.principal() else {
            tracing::warn!("create suppressed: no authenticated principal");
            return Ok(Outcome::Suppressed);
        };

        let input = ContractInput {
            contact: input
                .contact
                .as_deref()
                .map(validation::normalize_contact_input),
            ..input.clone()
        };
        let default_category = self.scope.unwrap_or(self.default_category);
        let validated =
            validation::validate_contract(&input, Mode::Create, default_category, self.clock.today())?;

        let id = self
            .store
            .insert(NewContract {
                owner_id: owner_id.clone(),
                name: validated.name,
                contact: validated.contact,
                category: validated.category,
                expires_at: validated.expires_at,
            })
            .await
            .inspect_err(|e| tracing::error!("Error adding contract: {}", e))?;

        tracing::info!(contract_id = %id, "contract created");
        self.refresh(ctx, self.scope).await?;
        Ok(Outcome::Committed)
    }

    pub fn start_edit(&mut self, id: &str) -> Result<InteractionState> {
        let contract = self.find(id)?;
        let id = contract.record.id.clone();
        let state = InteractionState::Editing {
            draft: EditDraft::from(&contract.record),
            error: None,
        };
        Ok(self.open(&id, state))
    }

    pub fn start_manual_renewal(&mut self, id: &str) -> Result<InteractionState> {
        let contract = self.find(id)?;
        let id = contract.record.id.clone();
        let draft_date = match contract.record.expires_at {
            Some(at) => dates::format_date_input(at),
            None => dates::minimum_allowed_date(self.clock.today())
                .format("%Y-%m-%d")
                .to_string(),
        };
        let state = InteractionState::ManualRenewal {
            draft_date,
            error: None,
        };
        Ok(self.open(&id, state))
    }

    pub fn preview_quick_renewal(
        &mut self,
        id: &str,
        renewal: QuickRenewal,
    ) -> Result<InteractionState> {
        let id = self.find(id)?.record.id.clone();
        let state = InteractionState::QuickRenewalPreview {
            proposed: dates::add_months(self.clock.now(), renewal.months()),
            renewal,
            label: renewal.label().to_string(),
            error: None,
        };
        Ok(self.open(&id, state))
    }

    /// Discards whatever action is in progress
    pub fn cancel(&mut self) {
        self.interactions.clear_all();
    }

    pub async fn confirm_edit(
        &mut self,
        ctx: &RequestContext,
        id: &str,
        mut draft: EditDraft,
    ) -> Result<Outcome> {
        let Some(owner_id) = ctx.principal().cloned() else {
            tracing::warn!("edit suppressed: no authenticated principal");
            return Ok(Outcome::Suppressed);
        };

        draft.contact = validation::normalize_contact_input(&draft.contact);
        let state = self.active_state(id)?;
        let InteractionState::Editing { draft: current, .. } = state else {
            return Err(AppError::InteractionMismatch);
        };
        *current = draft.clone();

        let input = ContractInput {
            name: draft.name,
            contact: Some(draft.contact),
            expires_at: draft.expires_at,
            category: Some(draft.category.as_str().to_string()),
        };
        let validated = self.validate_or_record(id, |today| {
            validation::validate_contract(&input, Mode::Edit, draft.category, today)
        })?;

        let patch = ContractPatch {
            name: Some(validated.name),
            contact: Some(validated.contact),
            category: Some(validated.category),
            expires_at: Some(validated.expires_at),
        };
        self.commit(ctx, &owner_id, id, &patch).await
    }

    /// Requires the user's confirmation once the date is valid
    pub async fn confirm_manual_renewal(
        &mut self,
        ctx: &RequestContext,
        id: &str,
        draft_date: &str,
        confirm: &dyn Confirm,
    ) -> Result<Outcome> {
        let Some(owner_id) = ctx.principal().cloned() else {
            tracing::warn!("renewal suppressed: no authenticated principal");
            return Ok(Outcome::Suppressed);
        };

        let state = self.active_state(id)?;
        let InteractionState::ManualRenewal {
            draft_date: current,
            ..
        } = state
        else {
            return Err(AppError::InteractionMismatch);
        };
        *current = draft_date.to_string();

        let expires_at =
            self.validate_or_record(id, |today| validation::validate_expiration(draft_date, today))?;

        let message = format!(
            "Renew {} until {}?",
            self.display_name(id),
            dates::format_display_date(expires_at)
        );
        if !confirm.confirm(&message) {
            return Ok(Outcome::Declined);
        }

        self.commit(ctx, &owner_id, id, &ContractPatch::expiration_only(expires_at))
            .await
    }

    /// Writes the previewed date; it was computed, so it is not validated
    pub async fn confirm_quick_renewal(
        &mut self,
        ctx: &RequestContext,
        id: &str,
        confirm: &dyn Confirm,
    ) -> Result<Outcome> {
        let Some(owner_id) = ctx.principal().cloned() else {
            tracing::warn!("renewal suppressed: no authenticated principal");
            return Ok(Outcome::Suppressed);
        };

        let state = self.active_state(id)?;
        let InteractionState::QuickRenewalPreview {
            proposed, label, ..
        } = state
        else {
            return Err(AppError::InteractionMismatch);
        };
        let (proposed, label) = (*proposed, label.clone());

        let message = format!(
            "Renew {} ({}) until {}?",
            self.display_name(id),
            label,
            dates::format_display_date(proposed)
        );
        if !confirm.confirm(&message) {
            return Ok(Outcome::Declined);
        }

        self.commit(ctx, &owner_id, id, &ContractPatch::expiration_only(proposed))
            .await
    }

    /// Deletes a contract after confirmation. Any action open on it is
    /// dropped with it.
    pub async fn remove(
        &mut self,
        ctx: &RequestContext,
        id: &str,
        confirm: &dyn Confirm,
    ) -> Result<Outcome> {
        let Some(owner_id) = ctx.principal().cloned() else {
            tracing::warn!("delete suppressed: no authenticated principal");
            return Ok(Outcome::Suppressed);
        };

        let contract = self.find(id)?;
        let id = contract.record.id.clone();
        if !confirm.confirm(&format!("Delete {}?", contract.record.name)) {
            return Ok(Outcome::Declined);
        }

        self.store
            .delete(&owner_id, &id)
            .await
            .inspect_err(|e| tracing::error!("Error deleting contract {}: {}", id, e))?;

        tracing::info!(contract_id = %id, "contract deleted");
        self.interactions.clear(&id);
        self.refresh(ctx, self.scope).await?;
        Ok(Outcome::Committed)
    }

    fn open(&mut self, id: &ContractId, state: InteractionState) -> InteractionState {
        self.interactions.open(id, state);
        self.interactions.state_of(id)
    }

    /// Name for confirmation prompts. The contract may sit outside the
    /// current scope while its action stays open, so the id stands in.
    fn display_name(&self, id: &str) -> String {
        self.contracts
            .iter()
            .find(|c| c.id() == id)
            .map_or_else(|| id.to_string(), |c| c.record.name.clone())
    }

    fn active_state(&mut self, id: &str) -> Result<&mut InteractionState> {
        self.interactions
            .get_mut(id)
            .ok_or(AppError::NoActiveInteraction)
    }

    /// Runs a validation and keeps its message on the open state when it fails
    fn validate_or_record<T>(
        &mut self,
        id: &str,
        check: impl FnOnce(NaiveDate) -> std::result::Result<T, ValidationError>,
    ) -> Result<T> {
        let result = check(self.clock.today());
        let message = result.as_ref().err().map(ToString::to_string);
        if let Some(state) = self.interactions.get_mut(id) {
            state.set_error(message);
        }
        result.map_err(AppError::from)
    }

    async fn commit(
        &mut self,
        ctx: &RequestContext,
        owner_id: &PrincipalId,
        id: &str,
        patch: &ContractPatch,
    ) -> Result<Outcome> {
        let id = id.to_string();
        if let Err(e) = self.store.update(owner_id, &id, patch).await {
            tracing::error!("Error updating contract {}: {}", id, e);
            if let Some(state) = self.interactions.get_mut(&id) {
                let message = if e.is_persistence() {
                    SAVE_FAILED.to_string()
                } else {
                    e.user_message()
                };
                state.set_error(Some(message));
            }
            return Err(e);
        }

        tracing::info!(contract_id = %id, "contract updated");
        self.interactions.clear(&id);
        self.refresh(ctx, self.scope).await?;
        Ok(Outcome::Committed)
    }
}
