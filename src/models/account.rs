use serde::{Deserialize, Serialize};

use super::reading::AccountId;

/// Customer account as loaded from the seed file
///
/// The ingestion pipeline only ever asks whether an account exists; the
/// names are carried for lookups and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
    #[serde(rename = "AccountId")]
    pub account_id: AccountId,
    #[serde(rename = "FirstName", default)]
    pub first_name: String,
    #[serde(rename = "LastName", default)]
    pub last_name: String,
}

impl Account {
    /// Create a new account record
    pub fn new(
        account_id: AccountId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// "First Last", trimmed when either part is missing
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
