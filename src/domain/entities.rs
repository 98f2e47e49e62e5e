//! Chart of accounts entities
//!
//! Wire shapes of the two entity kinds. Field names follow the upper-camel
//! spelling clients already use; the lower-case spellings are accepted on
//! input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named collection of accounts owned by one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChartOfAccounts {
    #[serde(default, alias = "id")]
    pub id: String,

    #[serde(default, alias = "name")]
    pub name: String,

    #[serde(
        default,
        alias = "retainedEarningsAccount",
        alias = "retained_earnings_account",
        skip_serializing_if = "Option::is_none"
    )]
    pub retained_earnings_account: Option<String>,

    /// Owner identity, always stamped by the server
    #[serde(default, alias = "user")]
    pub user: String,

    #[serde(default, alias = "asOf", alias = "as_of", skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl ChartOfAccounts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// An entry within a chart of accounts. The id is unique within its chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Account {
    #[serde(default, alias = "id")]
    pub id: String,

    #[serde(default, alias = "number")]
    pub number: String,

    #[serde(default, alias = "name")]
    pub name: String,

    #[serde(default, alias = "tags")]
    pub tags: Vec<String>,

    #[serde(default, alias = "parent", skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, alias = "user")]
    pub user: String,

    #[serde(default, alias = "asOf", alias = "as_of", skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chart_decodes_lowercase_fields() {
        let chart: ChartOfAccounts =
            serde_json::from_value(json!({"id": "other", "name": "Main2"})).unwrap();
        assert_eq!(chart.id, "other");
        assert_eq!(chart.name, "Main2");
        assert!(chart.user.is_empty());
    }

    #[test]
    fn test_chart_encodes_pascal_case() {
        let mut chart = ChartOfAccounts::new("Main");
        chart.id = "c1".into();
        chart.user = "alice@example.com".into();

        let value = serde_json::to_value(&chart).unwrap();
        assert_eq!(value["Id"], "c1");
        assert_eq!(value["Name"], "Main");
        assert_eq!(value["User"], "alice@example.com");
        assert!(value.get("AsOf").is_none());
    }

    #[test]
    fn test_account_defaults_missing_fields() {
        let account: Account =
            serde_json::from_value(json!({"Number": "1.1", "Tags": ["asset"], "extra": 1}))
                .unwrap();
        assert_eq!(account.number, "1.1");
        assert_eq!(account.tags, vec!["asset".to_string()]);
        assert!(account.id.is_empty());
        assert!(account.parent.is_none());
    }

    #[test]
    fn test_both_spellings_of_a_field_are_rejected() {
        let err = serde_json::from_value::<ChartOfAccounts>(json!({"Id": "a", "id": "b"}))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate field `Id`"));
    }
}
