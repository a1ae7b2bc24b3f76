//! Users and delivery addresses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mistore_core::validation::{FieldErrors, PHONE_PATTERN, UK_POSTCODE_PATTERN, Validator};
use mistore_core::{AddressId, Email, UserId, UserRole};

use crate::RepositoryError;

/// A registered account. The password hash never leaves the repository.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row of the admin user table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub order_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Admin user table filters.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub q: Option<String>,
    pub role: Option<UserRole>,
}

/// A saved delivery address.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub county: Option<String>,
    pub postcode: String,
    pub country: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// New address form.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub full_name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub county: Option<String>,
    pub postcode: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressInput {
    /// Validate the form.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut v = Validator::new();
        v.required("full_name", &self.full_name)
            .max_len("full_name", &self.full_name, 100)
            .required("phone", &self.phone)
            .pattern("phone", &self.phone, &PHONE_PATTERN, "is not a valid phone number")
            .required("line1", &self.line1)
            .max_len("line1", &self.line1, 200)
            .required("city", &self.city)
            .max_len("city", &self.city, 100)
            .required("postcode", &self.postcode)
            .pattern(
                "postcode",
                &self.postcode,
                &UK_POSTCODE_PATTERN,
                "is not a valid UK postcode",
            );
        if let Some(country) = self.country.as_deref() {
            v.check(
                "country",
                country.trim().len() == 2,
                "must be a two-letter country code",
            );
        }
        v.finish()
    }

    /// Upper-cased postcode with a single space before the inward code.
    #[must_use]
    pub fn normalized_postcode(&self) -> String {
        let compact: String = self
            .postcode
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        if compact.len() > 3 {
            let (outward, inward) = compact.split_at(compact.len() - 3);
            format!("{outward} {inward}")
        } else {
            compact
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> AddressInput {
        AddressInput {
            full_name: "Ada Lovelace".to_owned(),
            phone: "+44 20 7946 0958".to_owned(),
            line1: "1 King's Road".to_owned(),
            line2: None,
            city: "London".to_owned(),
            county: None,
            postcode: "sw3 4ny".to_owned(),
            country: None,
            is_default: false,
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn test_invalid_address_reports_each_field() {
        let bad = AddressInput {
            full_name: String::new(),
            postcode: "90210".to_owned(),
            phone: "call me".to_owned(),
            ..input()
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.get("full_name").is_some());
        assert!(errors.get("postcode").is_some());
        assert!(errors.get("phone").is_some());
    }

    #[test]
    fn test_postcode_normalisation() {
        assert_eq!(input().normalized_postcode(), "SW3 4NY");
        let compact = AddressInput {
            postcode: "m11ae".to_owned(),
            ..input()
        };
        assert_eq!(compact.normalized_postcode(), "M1 1AE");
    }

    #[test]
    fn test_user_row_rejects_corrupt_email() {
        let row = UserRow {
            id: UserId::new(1),
            email: "not-an-email".to_owned(),
            name: "Bad".to_owned(),
            role: UserRole::Customer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            User::try_from(row),
            Err(RepositoryError::DataCorruption(_))
        ));
    }
}
