use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};

use crate::account::{AccountId, AccountRecord};

use super::{AccountRepository, RepositoryError};

#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: DashMap<AccountId, Arc<AccountRecord>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountRepository for InMemoryAccountRepository {
    fn create(&self, record: AccountRecord) -> Result<Arc<AccountRecord>, RepositoryError> {
        match self.accounts.entry(record.id().to_owned()) {
            Entry::Occupied(entry) => Err(RepositoryError::DuplicateId {
                id: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                let record = Arc::new(record);
                entry.insert(Arc::clone(&record));
                Ok(record)
            }
        }
    }

    fn get(&self, id: &str) -> Result<Arc<AccountRecord>, RepositoryError> {
        self.accounts
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_owned() })
    }

    fn accounts(&self) -> Vec<Arc<AccountRecord>> {
        self.accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::{Decimal, prelude::FromPrimitive};

    use super::*;

    #[test]
    fn create_and_get() {
        let repo = InMemoryAccountRepository::new();
        assert!(repo.accounts().is_empty());

        let created = repo
            .create(AccountRecord::new("Id-123", Decimal::from_u32(1000).unwrap()).unwrap())
            .unwrap();
        assert_eq!(repo.accounts().len(), 1);

        let fetched = repo.get("Id-123").unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
        assert_eq!(fetched.balance(), Decimal::from_u32(1000).unwrap());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let repo = InMemoryAccountRepository::new();
        repo.create(AccountRecord::new("Id-1", Decimal::from_u32(5).unwrap()).unwrap())
            .unwrap();

        let err = repo
            .create(AccountRecord::new("Id-1", Decimal::from_u32(9).unwrap()).unwrap())
            .unwrap_err();
        assert_eq!(err.to_string(), "Account id Id-1 already exists!");
        // first record survives
        assert_eq!(
            repo.get("Id-1").unwrap().balance(),
            Decimal::from_u32(5).unwrap()
        );
    }

    #[test]
    fn missing_account() {
        let repo = InMemoryAccountRepository::new();
        let err = repo.get("nope").unwrap_err();
        assert_eq!(
            err,
            RepositoryError::NotFound {
                id: "nope".to_owned()
            }
        );
    }

    #[test]
    fn lists_accounts() {
        let repo = InMemoryAccountRepository::new();
        for id in ["a", "b", "c"] {
            repo.create(AccountRecord::new(id, Decimal::ZERO).unwrap())
                .unwrap();
        }
        let mut ids: Vec<String> = repo
            .accounts()
            .iter()
            .map(|acc| acc.id().to_owned())
            .collect();
        ids.sort();
        assert_eq!(ids, ["a", "b", "c"]);
    }
}
