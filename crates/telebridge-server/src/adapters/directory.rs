//! JSON-file customer directory
//!
//! Loads a list of [`CustomerRecord`]s once at startup. Phone numbers are
//! compared on their trailing ten digits so `+57 300 111 2233` and
//! `3001112233` match.

use async_trait::async_trait;
use std::path::Path;

use telebridge::ports::CustomerDirectory;
use telebridge::{CustomerRecord, DomainError};

const SIGNIFICANT_DIGITS: usize = 10;

#[derive(Debug, Default)]
pub struct JsonCustomerDirectory {
    records: Vec<CustomerRecord>,
}

impl JsonCustomerDirectory {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<CustomerRecord>) -> Self {
        Self { records }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Validation(format!("cannot read {}: {e}", path.display()))
        })?;
        let records: Vec<CustomerRecord> = serde_json::from_str(&raw).map_err(|e| {
            DomainError::Validation(format!("invalid customer directory {}: {e}", path.display()))
        })?;
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

fn significant_digits(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(char::is_ascii_digit).collect();
    let start = digits.len().saturating_sub(SIGNIFICANT_DIGITS);
    digits[start..].iter().collect()
}

pub fn phone_matches(a: &str, b: &str) -> bool {
    let (a, b) = (significant_digits(a), significant_digits(b));
    !a.is_empty() && a == b
}

#[async_trait]
impl CustomerDirectory for JsonCustomerDirectory {
    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<CustomerRecord>, DomainError> {
        Ok(self
            .records
            .iter()
            .find(|record| phone_matches(&record.phone_number, phone_number))
            .cloned())
    }

    async fn find_by_policy(
        &self,
        policy_number: &str,
    ) -> Result<Option<CustomerRecord>, DomainError> {
        let wanted = policy_number.trim();
        Ok(self
            .records
            .iter()
            .find(|record| {
                record
                    .policies
                    .iter()
                    .any(|policy| policy.policy_number.eq_ignore_ascii_case(wanted))
            })
            .cloned())
    }
}
