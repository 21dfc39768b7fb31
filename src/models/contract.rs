use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::dates;

/// Identifier of the authenticated owner of a set of contracts
pub type PrincipalId = String;

/// Store-assigned contract identifier
pub type ContractId = String;

/// Service line a contract belongs to. Stored and serialized under the
/// names used by the existing client data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(rename = "Piscinas")]
    PoolService,
    #[serde(rename = "Jardins")]
    GardenService,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::PoolService, Category::GardenService];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PoolService => "Piscinas",
            Category::GardenService => "Jardins",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Piscinas" | "PoolService" => Ok(Category::PoolService),
            "Jardins" | "GardenService" => Ok(Category::GardenService),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// A tracked client service agreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub id: ContractId,
    pub owner_id: PrincipalId,
    pub name: String,
    pub contact: Option<String>,
    pub category: Category,
    /// `None` when the stored value is missing or cannot be parsed
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a contract about to be inserted; the store assigns `id`
/// and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    pub owner_id: PrincipalId,
    pub name: String,
    pub contact: Option<String>,
    pub category: Category,
    pub expires_at: DateTime<Utc>,
}

/// Merge-style partial update. `None` leaves a field untouched; for
/// `contact`, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractPatch {
    pub name: Option<String>,
    pub contact: Option<Option<String>>,
    pub category: Option<Category>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ContractPatch {
    pub fn expiration_only(expires_at: DateTime<Utc>) -> Self {
        Self {
            expires_at: Some(expires_at),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.contact.is_none()
            && self.category.is_none()
            && self.expires_at.is_none()
    }

    /// Applies the patch in place. Identity fields are never touched.
    pub fn apply_to(&self, record: &mut ContractRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
        }
        if let Some(contact) = &self.contact {
            record.contact = contact.clone();
        }
        if let Some(category) = self.category {
            record.category = category;
        }
        if let Some(expires_at) = self.expires_at {
            record.expires_at = Some(expires_at);
        }
    }
}

/// Proximity of a contract to its expiration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Expired,
    Critical,
    Warning,
    Normal,
    Unknown,
}

impl Urgency {
    pub fn from_days(days_remaining: Option<i64>) -> Self {
        match days_remaining {
            None => Urgency::Unknown,
            Some(days) if days < 0 => Urgency::Expired,
            Some(0..=2) => Urgency::Critical,
            Some(3..=5) => Urgency::Warning,
            Some(_) => Urgency::Normal,
        }
    }
}

/// A contract with the fields derived at listing time
#[derive(Debug, Clone, PartialEq)]
pub struct DecoratedContract {
    pub record: ContractRecord,
    pub days_remaining: Option<i64>,
    pub urgency: Urgency,
    /// 1-based position in the sorted listing
    pub display_index: usize,
}

impl DecoratedContract {
    pub fn decorate(record: ContractRecord, now: DateTime<Utc>) -> Self {
        let days_remaining = record.expires_at.map(|at| dates::days_until(at, now));
        Self {
            record,
            days_remaining,
            urgency: Urgency::from_days(days_remaining),
            display_index: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn is_expired(&self) -> bool {
        self.urgency == Urgency::Expired
    }

    pub fn remaining_label(&self) -> String {
        match self.days_remaining {
            None => "Invalid date".to_string(),
            Some(days) if days < 0 => "Expired".to_string(),
            Some(0) => "Expires today".to_string(),
            Some(1) => "1 day left".to_string(),
            Some(days) => format!("{} days left", days),
        }
    }

    /// `#<index> - <name> (<contact>)`
    pub fn alert_identifier(&self) -> String {
        format!(
            "#{} - {} ({})",
            self.display_index,
            self.record.name,
            self.record.contact.as_deref().unwrap_or("-")
        )
    }

    pub fn display_expiration(&self) -> String {
        self.record
            .expires_at
            .map(dates::format_display_date)
            .unwrap_or_else(|| "Invalid date".to_string())
    }
}

// Serialized with its display strings so clients need no date logic
impl Serialize for DecoratedContract {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct View<'a> {
            #[serde(flatten)]
            record: &'a ContractRecord,
            days_remaining: Option<i64>,
            urgency: Urgency,
            display_index: usize,
            remaining_label: String,
            display_expiration: String,
            alert_identifier: String,
        }

        View {
            record: &self.record,
            days_remaining: self.days_remaining,
            urgency: self.urgency,
            display_index: self.display_index,
            remaining_label: self.remaining_label(),
            display_expiration: self.display_expiration(),
            alert_identifier: self.alert_identifier(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(expires_at: Option<DateTime<Utc>>) -> ContractRecord {
        ContractRecord {
            id: "c1".into(),
            owner_id: "owner".into(),
            name: "João Silva".into(),
            contact: Some("912345678".into()),
            category: Category::PoolService,
            expires_at,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn urgency_partitions_days() {
        assert_eq!(Urgency::from_days(None), Urgency::Unknown);
        assert_eq!(Urgency::from_days(Some(-30)), Urgency::Expired);
        assert_eq!(Urgency::from_days(Some(-1)), Urgency::Expired);
        assert_eq!(Urgency::from_days(Some(0)), Urgency::Critical);
        assert_eq!(Urgency::from_days(Some(2)), Urgency::Critical);
        assert_eq!(Urgency::from_days(Some(3)), Urgency::Warning);
        assert_eq!(Urgency::from_days(Some(5)), Urgency::Warning);
        assert_eq!(Urgency::from_days(Some(6)), Urgency::Normal);
        assert_eq!(Urgency::from_days(Some(400)), Urgency::Normal);
    }

    #[test]
    fn category_round_trips_through_wire_names() {
        assert_eq!("Piscinas".parse::<Category>().unwrap(), Category::PoolService);
        assert_eq!("Jardins".parse::<Category>().unwrap(), Category::GardenService);
        assert!("Limpezas".parse::<Category>().is_err());
        assert_eq!(
            serde_json::to_string(&Category::GardenService).unwrap(),
            "\"Jardins\""
        );
    }

    #[test]
    fn labels_follow_remaining_days() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut decorated = DecoratedContract::decorate(record(None), now);
        assert_eq!(decorated.remaining_label(), "Invalid date");
        assert_eq!(decorated.display_expiration(), "Invalid date");

        for (days, label) in [(-2, "Expired"), (0, "Expires today"), (1, "1 day left"), (7, "7 days left")] {
            decorated.days_remaining = Some(days);
            assert_eq!(decorated.remaining_label(), label);
        }
    }

    #[test]
    fn alert_identifier_shows_missing_contact() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut rec = record(Some(Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap()));
        rec.contact = None;
        let mut decorated = DecoratedContract::decorate(rec, now);
        decorated.display_index = 2;
        assert_eq!(decorated.alert_identifier(), "#2 - João Silva (-)");
        assert_eq!(decorated.display_expiration(), "04/06/2024");
        assert_eq!(decorated.days_remaining, Some(3));
        assert_eq!(decorated.urgency, Urgency::Warning);
    }

    #[test]
    fn patch_keeps_identity_fields() {
        let mut rec = record(None);
        let patch = ContractPatch {
            name: Some("Ana".into()),
            contact: Some(None),
            category: Some(Category::GardenService),
            expires_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
        };
        patch.apply_to(&mut rec);
        assert_eq!(rec.id, "c1");
        assert_eq!(rec.owner_id, "owner");
        assert_eq!(rec.name, "Ana");
        assert_eq!(rec.contact, None);
        assert_eq!(rec.category, Category::GardenService);
    }

    #[test]
    fn serializes_with_display_fields() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let rec = record(Some(Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap()));
        let mut decorated = DecoratedContract::decorate(rec, now);
        decorated.display_index = 1;

        let json = serde_json::to_value(&decorated).unwrap();
        assert_eq!(json["id"], "c1");
        assert_eq!(json["category"], "Piscinas");
        assert_eq!(json["days_remaining"], 3);
        assert_eq!(json["urgency"], "warning");
        assert_eq!(json["remaining_label"], "3 days left");
        assert_eq!(json["display_expiration"], "04/06/2024");
        assert_eq!(json["alert_identifier"], "#1 - João Silva (912345678)");
    }
}
