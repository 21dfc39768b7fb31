//! Field rules applied before any contract is written.
//!
//! Every check short-circuits: the first rule that fails is the one
//! reported. Nothing here touches the store.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::dates;
use crate::models::contract::Category;

pub const NAME_MAX_LEN: usize = 50;
pub const NAME_MIN_LEN_ON_EDIT: usize = 3;
pub const CONTACT_DIGITS: usize = 9;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z\x{00C0}-\x{017F}\s]*$").expect("name pattern"));
static CONTACT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{9}$").expect("contact pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    ExpirationDate,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name => f.write_str("name"),
            Field::ExpirationDate => f.write_str("expiration date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields (missing {0})")]
    EmptyRequiredField(Field),
    #[error("The name may only contain letters and spaces")]
    InvalidNameCharacters,
    #[error("The name must be at most 50 characters")]
    NameTooLong,
    #[error("The name must be at least 3 characters")]
    NameTooShort,
    #[error("The contact must be exactly 9 digits")]
    InvalidContactFormat,
    #[error("The expiration date is not a valid date")]
    InvalidDateFormat,
    #[error("The date must be at least tomorrow ({0})")]
    DateBeforeMinimum(NaiveDate),
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::EmptyRequiredField(_) => "empty-required-field",
            ValidationError::InvalidNameCharacters => "invalid-name-characters",
            ValidationError::NameTooLong => "name-too-long",
            ValidationError::NameTooShort => "name-too-short",
            ValidationError::InvalidContactFormat => "invalid-contact-format",
            ValidationError::InvalidDateFormat => "invalid-date-format",
            ValidationError::DateBeforeMinimum(_) => "date-before-minimum",
            ValidationError::UnknownCategory(_) => "unknown-category",
        }
    }
}

/// Which form the input came from. Edits also enforce a minimum name length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit,
}

/// Raw form fields as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContractInput {
    pub name: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub expires_at: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedContract {
    pub name: String,
    pub contact: Option<String>,
    pub category: Category,
    pub expires_at: DateTime<Utc>,
}

pub fn validate_contract(
    input: &ContractInput,
    mode: Mode,
    default_category: Category,
    today: NaiveDate,
) -> Result<ValidatedContract, ValidationError> {
    if input.name.trim().is_empty() {
        return Err(ValidationError::EmptyRequiredField(Field::Name));
    }
    if input.expires_at.trim().is_empty() {
        return Err(ValidationError::EmptyRequiredField(Field::ExpirationDate));
    }

    let name = validate_name(&input.name, mode)?;
    let contact = validate_contact(input.contact.as_deref())?;
    let expires_at = validate_expiration(&input.expires_at, today)?;
    let category = validate_category(input.category.as_deref(), default_category)?;

    Ok(ValidatedContract {
        name,
        contact,
        category,
        expires_at,
    })
}

/// Returns the trimmed name
pub fn validate_name(raw: &str, mode: Mode) -> Result<String, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::EmptyRequiredField(Field::Name));
    }
    if !NAME_PATTERN.is_match(raw) {
        return Err(ValidationError::InvalidNameCharacters);
    }
    if raw.chars().count() > NAME_MAX_LEN {
        return Err(ValidationError::NameTooLong);
    }
    let trimmed = raw.trim();
    if mode == Mode::Edit && trimmed.chars().count() < NAME_MIN_LEN_ON_EDIT {
        return Err(ValidationError::NameTooShort);
    }
    Ok(trimmed.to_string())
}

/// Empty or missing contact means "no contact"
pub fn validate_contact(raw: Option<&str>) -> Result<Option<String>, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(contact) if CONTACT_PATTERN.is_match(contact) => Ok(Some(contact.to_string())),
        Some(_) => Err(ValidationError::InvalidContactFormat),
    }
}

/// Parses a `YYYY-MM-DD` input and checks it is no earlier than tomorrow
pub fn validate_expiration(raw: &str, today: NaiveDate) -> Result<DateTime<Utc>, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::EmptyRequiredField(Field::ExpirationDate));
    }
    let date = dates::parse_date_input(raw).ok_or(ValidationError::InvalidDateFormat)?;
    let minimum = dates::minimum_allowed_date(today);
    if date < minimum {
        return Err(ValidationError::DateBeforeMinimum(minimum));
    }
    Ok(dates::start_of_day(date))
}

pub fn validate_category(
    raw: Option<&str>,
    default_category: Category,
) -> Result<Category, ValidationError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default_category),
        Some(value) => value
            .parse()
            .map_err(|_| ValidationError::UnknownCategory(value.to_string())),
    }
}

/// Keeps only digits, at most nine of them, the way the contact field
/// accepts keystrokes
pub fn normalize_contact_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(CONTACT_DIGITS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn input(name: &str, contact: Option<&str>, expires_at: &str) -> ContractInput {
        ContractInput {
            name: name.to_string(),
            contact: contact.map(str::to_string),
            expires_at: expires_at.to_string(),
            category: None,
        }
    }

    #[test]
    fn accepts_a_complete_contract() {
        let validated = validate_contract(
            &input("João Silva", Some("912345678"), "2024-06-14"),
            Mode::Create,
            Category::GardenService,
            today(),
        )
        .unwrap();
        assert_eq!(validated.name, "João Silva");
        assert_eq!(validated.contact.as_deref(), Some("912345678"));
        assert_eq!(validated.category, Category::GardenService);
        assert_eq!(validated.expires_at.to_rfc3339(), "2024-06-14T00:00:00+00:00");
    }

    #[test]
    fn required_fields_come_first() {
        let err = validate_contract(&input("", Some("12"), ""), Mode::Create, Category::default(), today())
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyRequiredField(Field::Name));
        assert_eq!(err.code(), "empty-required-field");

        let err = validate_contract(&input("Rui#", None, ""), Mode::Create, Category::default(), today())
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyRequiredField(Field::ExpirationDate));
    }

    #[test]
    fn rejects_names_outside_letters_and_spaces() {
        for name in ["Rui2", "Ana-Maria", "O'Neil", "Zoë 🙂"] {
            assert_eq!(
                validate_name(name, Mode::Create),
                Err(ValidationError::InvalidNameCharacters),
                "{name}"
            );
        }
        assert!(validate_name("Ângela Conceição", Mode::Create).is_ok());
    }

    #[test]
    fn rejects_long_names() {
        let long = "a".repeat(51);
        assert_eq!(validate_name(&long, Mode::Create), Err(ValidationError::NameTooLong));
        assert!(validate_name(&"a".repeat(50), Mode::Create).is_ok());
    }

    #[test]
    fn edit_requires_three_characters() {
        assert_eq!(validate_name(" Al ", Mode::Edit), Err(ValidationError::NameTooShort));
        assert_eq!(validate_name(" Al ", Mode::Create).unwrap(), "Al");
        assert_eq!(validate_name("Ana", Mode::Edit).unwrap(), "Ana");
    }

    #[test]
    fn create_and_edit_share_the_character_rule() {
        for name in ["Bé", "Rui 3", "Ana_", "Luís Filipe", "x"] {
            let create = validate_name(name, Mode::Create);
            let edit = validate_name(name, Mode::Edit);
            let create_chars = create == Err(ValidationError::InvalidNameCharacters);
            let edit_chars = edit == Err(ValidationError::InvalidNameCharacters);
            assert_eq!(create_chars, edit_chars, "{name}");
        }
    }

    #[test]
    fn contact_is_optional_but_exact() {
        assert_eq!(validate_contact(None), Ok(None));
        assert_eq!(validate_contact(Some("  ")), Ok(None));
        assert_eq!(validate_contact(Some("912345678")), Ok(Some("912345678".into())));
        for bad in ["91234567", "9123456789", "91234567a", "+35191234"] {
            assert_eq!(validate_contact(Some(bad)), Err(ValidationError::InvalidContactFormat));
        }
    }

    #[test]
    fn expiration_must_be_tomorrow_or_later() {
        assert_eq!(
            validate_expiration("2024-06-10", today()),
            Err(ValidationError::DateBeforeMinimum(NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()))
        );
        assert_eq!(
            validate_expiration("2024-06-10", today()).unwrap_err().code(),
            "date-before-minimum"
        );
        assert!(validate_expiration("2024-06-11", today()).is_ok());
        assert_eq!(
            validate_expiration("11/06/2024", today()),
            Err(ValidationError::InvalidDateFormat)
        );
    }

    #[test]
    fn category_falls_back_to_default() {
        assert_eq!(validate_category(None, Category::GardenService), Ok(Category::GardenService));
        assert_eq!(validate_category(Some("Piscinas"), Category::GardenService), Ok(Category::PoolService));
        assert_eq!(
            validate_category(Some("Limpezas"), Category::PoolService),
            Err(ValidationError::UnknownCategory("Limpezas".into()))
        );
    }

    #[test]
    fn contact_input_keeps_nine_digits() {
        assert_eq!(normalize_contact_input("91 234-5678 99"), "912345678");
        assert_eq!(normalize_contact_input("abc"), "");
    }
}
