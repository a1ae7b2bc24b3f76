//! Field-level form validation.
//!
//! A [`Validator`] collects every failing rule instead of stopping at the
//! first one, so a form can highlight all bad fields at once. The result is a
//! [`FieldErrors`] map of field name to messages, serialized as
//!
//! ```json
//! { "name": ["is required"], "price": ["must be at least 0.01"] }
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::types::Email;

/// URL slug: lowercase letters, digits and single dashes.
pub static SLUG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid regex")
});

/// UK postcode, loosely (`SW1A 1AA`, `m1 1ae`).
pub static UK_POSTCODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z]{1,2}[0-9][a-z0-9]?\s*[0-9][a-z]{2}$").expect("valid regex")
});

/// Phone number: optional `+`, then digits, spaces and dashes.
pub static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9][0-9 \-]{6,18}[0-9]$").expect("valid regex")
});

/// Coupon code: uppercase letters and digits.
pub static COUPON_CODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{3,32}$").expect("valid regex"));

/// Validation failures keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// No errors recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with at least one error.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Record a message for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// A single-field error, for checks that only the database can make.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field} {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Accumulates rule failures for one form submission.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    /// Start a fresh validation pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value must be non-blank.
    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.add(field, "is required");
        }
        self
    }

    /// Optional value must be present and non-blank.
    pub fn required_opt(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        self.required(field, value.unwrap_or_default())
    }

    /// At least `min` characters (skipped when blank; pair with `required`).
    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        let len = value.trim().chars().count();
        if len > 0 && len < min {
            self.errors
                .add(field, format!("must be at least {min} characters"));
        }
        self
    }

    /// At most `max` characters.
    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.trim().chars().count() > max {
            self.errors
                .add(field, format!("must be at most {max} characters"));
        }
        self
    }

    /// Inclusive numeric range; either bound may be open.
    pub fn range<T>(&mut self, field: &str, value: T, min: Option<T>, max: Option<T>) -> &mut Self
    where
        T: PartialOrd + Display + Copy,
    {
        if let Some(min) = min
            && value < min
        {
            self.errors.add(field, format!("must be at least {min}"));
        }
        if let Some(max) = max
            && value > max
        {
            self.errors.add(field, format!("must be at most {max}"));
        }
        self
    }

    /// Value must match `pattern` (skipped when blank).
    pub fn pattern(&mut self, field: &str, value: &str, pattern: &Regex, message: &str) -> &mut Self {
        let value = value.trim();
        if !value.is_empty() && !pattern.is_match(value) {
            self.errors.add(field, message);
        }
        self
    }

    /// Value must parse as an [`Email`] (skipped when blank).
    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.trim().is_empty()
            && let Err(e) = Email::parse(value)
        {
            self.errors.add(field, e.to_string());
        }
        self
    }

    /// Arbitrary rule: records `message` when `ok` is false.
    pub fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors.add(field, message);
        }
        self
    }

    /// Finish the pass.
    ///
    /// # Errors
    ///
    /// Returns the collected [`FieldErrors`] if any rule failed.
    pub fn finish(&mut self) -> Result<(), FieldErrors> {
        let errors = std::mem::take(&mut self.errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
