//! Field-level validation helpers shared by the services.
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Money columns are `NUMERIC(14, 2)`, so amounts must stay below 10^12.
pub fn money_ceiling() -> Decimal {
    Decimal::from(1_000_000_000_000i64)
}

pub fn money_fits(value: Decimal) -> bool {
    value < money_ceiling()
}

/// Collects every problem with a request so clients can fix them in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    message: String,
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            errors: BTreeMap::new(),
        }
    }

    /// Record a problem. The first message for a field wins.
    pub fn add(&mut self, field: impl Into<String>, problem: impl Into<String>) {
        self.errors.entry(field.into()).or_insert_with(|| problem.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn into_parts(self) -> (String, BTreeMap<String, String>) {
        (self.message, self.errors)
    }

    pub fn required_text(&mut self, field: &str, value: &str, max_len: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "is required");
        } else if trimmed.chars().count() > max_len {
            self.add(field, format!("must be at most {} characters", max_len));
        }
    }

    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        if let Some(v) = value {
            if v.trim().chars().count() > max_len {
                self.add(field, format!("must be at most {} characters", max_len));
            }
        }
    }

    pub fn money(&mut self, field: &str, value: Decimal, allow_zero: bool) {
        if value.is_sign_negative() || (!allow_zero && value.is_zero()) {
            let bound = if allow_zero { "zero or more" } else { "greater than zero" };
            self.add(field, format!("must be {}", bound));
        } else if value.normalize().scale() > 2 {
            self.add(field, "must have at most 2 decimal places");
        } else if !money_fits(value) {
            self.add(field, "must be less than 1000000000000");
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        let valid = match value.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !value.contains(char::is_whitespace)
                    && !domain.contains('@')
            }
            None => false,
        };
        if !valid {
            self.add(field, "must be a valid email address");
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        for (field, problem) in &self.errors {
            write!(f, "; {} {}", field, problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Lower-case and trim an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Treat blank optional strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
