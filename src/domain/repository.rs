//! Chart of accounts repository
//!
//! Stores JSON-encoded entities in a [`KeyValueStore`]. Charts live under
//! `charts/{id}` and accounts under `accounts/{coa}/{id}`.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::store::KeyValueStore;

use super::{Account, ChartOfAccounts, DomainError};

const CHARTS_PREFIX: &str = "charts/";
const ACCOUNTS_PREFIX: &str = "accounts/";

pub struct CoaRepository {
    store: Box<dyn KeyValueStore>,
}

impl CoaRepository {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn list_charts(&self) -> Result<Vec<ChartOfAccounts>, DomainError> {
        self.list(CHARTS_PREFIX).await
    }

    pub async fn get_chart(&self, id: &str) -> Result<Option<ChartOfAccounts>, DomainError> {
        check_id(id)?;
        self.get(&chart_key(id)).await
    }

    /// Insert or replace a chart. An empty id is replaced with a fresh one.
    pub async fn save_chart(
        &self,
        mut chart: ChartOfAccounts,
    ) -> Result<ChartOfAccounts, DomainError> {
        if chart.id.is_empty() {
            chart.id = new_id();
        }
        check_id(&chart.id)?;
        chart.as_of = Some(Utc::now());

        self.put(&chart_key(&chart.id), &chart).await?;
        tracing::debug!(coa_id = %chart.id, "Saved chart of accounts");
        Ok(chart)
    }

    pub async fn list_accounts(&self, coa_id: &str) -> Result<Vec<Account>, DomainError> {
        check_id(coa_id)?;
        self.list(&accounts_prefix(coa_id)).await
    }

    pub async fn get_account(
        &self,
        coa_id: &str,
        id: &str,
    ) -> Result<Option<Account>, DomainError> {
        check_id(coa_id)?;
        check_id(id)?;
        self.get(&account_key(coa_id, id)).await
    }

    /// Insert or replace an account inside an existing chart.
    pub async fn save_account(
        &self,
        coa_id: &str,
        mut account: Account,
    ) -> Result<Account, DomainError> {
        check_id(coa_id)?;
        if self.store.get(&chart_key(coa_id)).await?.is_none() {
            return Err(DomainError::ChartNotFound(coa_id.to_string()));
        }

        if account.id.is_empty() {
            account.id = new_id();
        }
        check_id(&account.id)?;
        account.as_of = Some(Utc::now());

        self.put(&account_key(coa_id, &account.id), &account).await?;
        tracing::debug!(coa_id = %coa_id, account_id = %account.id, "Saved account");
        Ok(account)
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DomainError> {
        match self.store.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec(value)?;
        self.store.put(key, bytes).await?;
        Ok(())
    }

    async fn list<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, DomainError> {
        self.store
            .list(prefix)
            .await?
            .into_iter()
            .map(|(_, bytes)| serde_json::from_slice(&bytes).map_err(DomainError::from))
            .collect()
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn check_id(id: &str) -> Result<(), DomainError> {
    if id.is_empty() || id.contains('/') {
        return Err(DomainError::InvalidId(id.to_string()));
    }
    Ok(())
}

fn chart_key(id: &str) -> String {
    format!("{}{}", CHARTS_PREFIX, id)
}

fn accounts_prefix(coa_id: &str) -> String {
    format!("{}{}/", ACCOUNTS_PREFIX, coa_id)
}

fn account_key(coa_id: &str, id: &str) -> String {
    format!("{}{}", accounts_prefix(coa_id), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CallerIdentity, IdentitySlot};
    use crate::store::{BackendSettings, MemoryStoreFactory, StoreFactory};

    async fn repository(user: &str) -> CoaRepository {
        let slot = IdentitySlot::new();
        slot.bind(CallerIdentity::new(user));
        let store = MemoryStoreFactory::new()
            .create(&BackendSettings::new(), slot)
            .await
            .unwrap();
        CoaRepository::new(store)
    }

    #[tokio::test]
    async fn test_save_chart_generates_id() {
        let repo = repository("alice@example.com").await;

        let saved = repo.save_chart(ChartOfAccounts::new("Main")).await.unwrap();
        assert!(!saved.id.is_empty());
        assert!(saved.as_of.is_some());

        let loaded = repo.get_chart(&saved.id).await.unwrap();
        assert_eq!(loaded, Some(saved));
    }

    #[tokio::test]
    async fn test_save_chart_keeps_given_id() {
        let repo = repository("alice@example.com").await;

        let mut chart = ChartOfAccounts::new("Main");
        chart.id = "main".into();
        repo.save_chart(chart).await.unwrap();

        let charts = repo.list_charts().await.unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].id, "main");
    }

    #[tokio::test]
    async fn test_accounts_are_listed_per_chart() {
        let repo = repository("alice@example.com").await;
        let a = repo.save_chart(ChartOfAccounts::new("A")).await.unwrap();
        let b = repo.save_chart(ChartOfAccounts::new("B")).await.unwrap();

        repo.save_account(&a.id, Account::new("1", "Assets")).await.unwrap();
        repo.save_account(&a.id, Account::new("2", "Liabilities")).await.unwrap();
        let cash = repo.save_account(&b.id, Account::new("1.1", "Cash")).await.unwrap();

        assert_eq!(repo.list_accounts(&a.id).await.unwrap().len(), 2);
        assert_eq!(repo.list_accounts(&b.id).await.unwrap(), vec![cash.clone()]);
        assert_eq!(repo.get_account(&b.id, &cash.id).await.unwrap(), Some(cash));

        // Accounts never show up as charts
        assert_eq!(repo.list_charts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_account_requires_chart() {
        let repo = repository("alice@example.com").await;

        let err = repo
            .save_account("missing", Account::new("1", "Assets"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ChartNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_rejects_ids_with_separator() {
        let repo = repository("alice@example.com").await;

        let mut chart = ChartOfAccounts::new("Main");
        chart.id = "a/b".into();
        assert!(matches!(
            repo.save_chart(chart).await,
            Err(DomainError::InvalidId(_))
        ));
        assert!(matches!(
            repo.get_account("a", "b/c").await,
            Err(DomainError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_entities_are_none() {
        let repo = repository("alice@example.com").await;
        assert!(repo.get_chart("nope").await.unwrap().is_none());
        assert!(repo.get_account("nope", "nope").await.unwrap().is_none());
        assert!(repo.list_accounts("nope").await.unwrap().is_empty());
    }
}
