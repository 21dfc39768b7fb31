use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dates;
use crate::models::{Category, ContractId, ContractRecord};

/// Asks the user to acknowledge an irreversible action
pub trait Confirm: Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

/// Renewal shortcuts, counted from the current moment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickRenewal {
    SixMonths,
    OneYear,
}

impl QuickRenewal {
    pub fn months(&self) -> u32 {
        match self {
            QuickRenewal::SixMonths => 6,
            QuickRenewal::OneYear => 12,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickRenewal::SixMonths => "+6 months",
            QuickRenewal::OneYear => "+1 year",
        }
    }
}

impl TryFrom<u32> for QuickRenewal {
    type Error = u32;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            6 => Ok(QuickRenewal::SixMonths),
            12 => Ok(QuickRenewal::OneYear),
            other => Err(other),
        }
    }
}

/// Form fields of a full edit, as strings the user can freely change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDraft {
    pub name: String,
    #[serde(default)]
    pub contact: String,
    pub category: Category,
    pub expires_at: String,
}

impl From<&ContractRecord> for EditDraft {
    fn from(record: &ContractRecord) -> Self {
        Self {
            name: record.name.clone(),
            contact: record.contact.clone().unwrap_or_default(),
            category: record.category,
            expires_at: record
                .expires_at
                .map(dates::format_date_input)
                .unwrap_or_default(),
        }
    }
}

/// What the user is currently doing with one contract. `error` holds the
/// message of the last failed confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    Idle,
    Editing {
        draft: EditDraft,
        error: Option<String>,
    },
    ManualRenewal {
        draft_date: String,
        error: Option<String>,
    },
    QuickRenewalPreview {
        proposed: DateTime<Utc>,
        renewal: QuickRenewal,
        label: String,
        error: Option<String>,
    },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Editing { error, .. }
            | InteractionState::ManualRenewal { error, .. }
            | InteractionState::QuickRenewalPreview { error, .. } => error.as_deref(),
        }
    }

    pub fn set_error(&mut self, message: Option<String>) {
        match self {
            InteractionState::Idle => {}
            InteractionState::Editing { error, .. }
            | InteractionState::ManualRenewal { error, .. }
            | InteractionState::QuickRenewalPreview { error, .. } => *error = message,
        }
    }
}

/// Interaction states keyed by contract id. At most one contract is in
/// action at a time: opening a state drops every other one.
#[derive(Debug, Default)]
pub struct InteractionStore {
    states: HashMap<ContractId, InteractionState>,
}

impl InteractionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, id: &ContractId, state: InteractionState) {
        self.states.clear();
        if !state.is_idle() {
            self.states.insert(id.clone(), state);
        }
    }

    pub fn state_of(&self, id: &str) -> InteractionState {
        self.states
            .get(id)
            .cloned()
            .unwrap_or(InteractionState::Idle)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut InteractionState> {
        self.states.get_mut(id)
    }

    pub fn active(&self) -> Option<(&ContractId, &InteractionState)> {
        self.states.iter().next()
    }

    pub fn clear(&mut self, id: &str) {
        self.states.remove(id);
    }

    pub fn clear_all(&mut self) {
        self.states.clear();
    }

    /// Drops states whose contract is no longer known
    pub fn retain_known<'a>(&mut self, known: impl IntoIterator<Item = &'a str>) {
        let known: Vec<&str> = known.into_iter().collect();
        self.states.retain(|id, _| known.contains(&id.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editing() -> InteractionState {
        InteractionState::Editing {
            draft: EditDraft {
                name: "Ana Reis".into(),
                contact: String::new(),
                category: Category::PoolService,
                expires_at: "2025-01-01".into(),
            },
            error: None,
        }
    }

    #[test]
    fn opening_a_state_clears_the_others() {
        let mut store = InteractionStore::new();
        store.open(&"a".to_string(), editing());
        store.open(
            &"b".to_string(),
            InteractionState::ManualRenewal {
                draft_date: "2025-02-01".into(),
                error: None,
            },
        );
        assert!(store.state_of("a").is_idle());
        assert!(matches!(store.state_of("b"), InteractionState::ManualRenewal { .. }));
        assert_eq!(store.active().map(|(id, _)| id.as_str()), Some("b"));
    }

    #[test]
    fn reopening_the_same_contract_replaces_its_state() {
        let mut store = InteractionStore::new();
        let id = "a".to_string();
        store.open(&id, editing());
        store.open(
            &id,
            InteractionState::ManualRenewal {
                draft_date: "2025-02-01".into(),
                error: None,
            },
        );
        assert!(matches!(store.state_of("a"), InteractionState::ManualRenewal { .. }));
    }

    #[test]
    fn errors_attach_to_active_states_only() {
        let mut state = editing();
        state.set_error(Some("boom".into()));
        assert_eq!(state.error(), Some("boom"));

        let mut idle = InteractionState::Idle;
        idle.set_error(Some("boom".into()));
        assert_eq!(idle.error(), None);
    }

    #[test]
    fn retain_known_drops_vanished_contracts() {
        let mut store = InteractionStore::new();
        store.open(&"gone".to_string(), editing());
        store.retain_known(["other"]);
        assert!(store.active().is_none());
    }

    #[test]
    fn quick_renewal_periods() {
        assert_eq!(QuickRenewal::try_from(6), Ok(QuickRenewal::SixMonths));
        assert_eq!(QuickRenewal::try_from(12).map(|r| r.label()), Ok("+1 year"));
        assert_eq!(QuickRenewal::try_from(3), Err(3));
    }

    #[test]
    fn closures_confirm() {
        let yes = |_: &str| true;
        let no = |message: &str| message.is_empty();
        assert!(yes.confirm("Delete?"));
        assert!(!no.confirm("Delete?"));
    }
}
