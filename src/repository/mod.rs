use std::sync::Arc;

use thiserror::Error;

use crate::account::{AccountId, AccountRecord};

pub mod in_memory;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Account id {id} already exists!")]
    DuplicateId { id: AccountId },
    #[error("Account id {id} not found")]
    NotFound { id: AccountId },
}

/// Keyed store owning every [`AccountRecord`].
///
/// Records are handed out as `Arc`s so callers can hold one for the length of
/// an operation. Implementations never remove a record once created.
pub trait AccountRepository: Send + Sync {
    fn create(&self, record: AccountRecord) -> Result<Arc<AccountRecord>, RepositoryError>;

    fn get(&self, id: &str) -> Result<Arc<AccountRecord>, RepositoryError>;

    /// Point-in-time list of all records, in no particular order.
    fn accounts(&self) -> Vec<Arc<AccountRecord>>;
}
