use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy, prelude::Zero};
use thiserror::Error;
use tracing::debug;

use crate::{
    account::{AccountError, AccountId, AccountRecord, BalanceCommand},
    command::LedgerCommand,
    config::LedgerConfig,
    repository::{AccountRepository, RepositoryError, in_memory::InMemoryAccountRepository},
};

mod transfer;

pub use transfer::TransferReceipt;

/// Fractional digits reported by [`LedgerService::check_balance`].
pub const BALANCE_SCALE: u32 = 2;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Amount should be greater than zero, got {amount}")]
    InvalidAmount { amount: Decimal },
    #[error("Account id must not be empty")]
    MissingAccountId,
    #[error("FromAccount id and ToAccount id should not be same, got `{id}`")]
    SameAccount { id: AccountId },
    #[error("Timed out acquiring transfer locks for `{from}` -> `{to}` after {attempts} attempts")]
    TransferTimeout {
        from: AccountId,
        to: AccountId,
        attempts: u32,
    },
    #[error(
        "Transfer of {amount} from `{from}` to `{to}` failed after the debit, `{from}` was re-credited: {source}"
    )]
    InternalInconsistency {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        source: AccountError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Account(#[from] AccountError),
}

/// Deposit, withdraw, balance query and transfer over a shared
/// [`AccountRepository`].
///
/// Every method takes `&self` so a single service can be shared between
/// threads. All synchronization lives in the account records themselves.
pub struct LedgerService<R = InMemoryAccountRepository> {
    repository: R,
    config: LedgerConfig,
}

impl Default for LedgerService {
    fn default() -> Self {
        Self::new(InMemoryAccountRepository::new(), LedgerConfig::default())
    }
}

impl<R> LedgerService<R>
where
    R: AccountRepository,
{
    pub fn new(repository: R, config: LedgerConfig) -> Self {
        Self { repository, config }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn open_account(
        &self,
        account_id: &str,
        opening_balance: Decimal,
    ) -> Result<Arc<AccountRecord>, LedgerError> {
        ensure_account_id(account_id)?;
        let record = AccountRecord::new(account_id, opening_balance)?;
        let record = self.repository.create(record)?;
        debug!(account = account_id, %opening_balance, "account opened");
        Ok(record)
    }

    pub fn get_account(&self, account_id: &str) -> Result<Arc<AccountRecord>, LedgerError> {
        Ok(self.repository.get(account_id)?)
    }

    /// Returns the full precision balance after the deposit.
    pub fn deposit(&self, account_id: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
        ensure_positive(amount)?;
        let account = self.repository.get(account_id)?;
        let balance = {
            let mut state = account.write_state();
            state.execute(BalanceCommand::Credit(amount))?;
            state.balance()
        };
        debug!(account = account_id, %amount, %balance, "deposited");
        Ok(balance)
    }

    /// Returns the full precision balance after the withdrawal.
    pub fn withdraw(&self, account_id: &str, amount: Decimal) -> Result<Decimal, LedgerError> {
        ensure_positive(amount)?;
        let account = self.repository.get(account_id)?;
        let balance = {
            let mut state = account.write_state();
            // check and debit under one guard
            state.execute(BalanceCommand::Debit(amount))?;
            state.balance()
        };
        debug!(account = account_id, %amount, %balance, "withdrawn");
        Ok(balance)
    }

    /// Balance rounded half-to-even to [`BALANCE_SCALE`] digits.
    pub fn check_balance(&self, account_id: &str) -> Result<Decimal, LedgerError> {
        let account = self.repository.get(account_id)?;
        let snapshot = account.balance();
        Ok(round_balance(snapshot))
    }

    pub fn execute(&self, command: LedgerCommand) -> Result<(), LedgerError> {
        match command {
            LedgerCommand::Open { account, balance } => {
                self.open_account(&account, balance)?;
            }
            LedgerCommand::Deposit { account, amount } => {
                self.deposit(&account, amount)?;
            }
            LedgerCommand::Withdraw { account, amount } => {
                self.withdraw(&account, amount)?;
            }
            LedgerCommand::Transfer { from, to, amount } => {
                self.transfer(&from, &to, amount)?;
            }
        }
        Ok(())
    }
}

pub fn round_balance(balance: Decimal) -> Decimal {
    let mut rounded =
        balance.round_dp_with_strategy(BALANCE_SCALE, RoundingStrategy::MidpointNearestEven);
    // only ever widens here, so no further rounding happens
    rounded.rescale(BALANCE_SCALE);
    rounded
}

fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount > Decimal::zero() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount { amount })
    }
}

fn ensure_account_id(account_id: &str) -> Result<(), LedgerError> {
    if account_id.is_empty() {
        Err(LedgerError::MissingAccountId)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn service_with(accounts: &[(&str, Decimal)]) -> LedgerService {
        let service = LedgerService::default();
        for (id, balance) in accounts {
            service.open_account(id, *balance).unwrap();
        }
        service
    }

    #[test]
    fn deposit_adds_to_balance() {
        let service = service_with(&[("Id-125", dec!(1000))]);
        assert_eq!(service.deposit("Id-125", dec!(1000)).unwrap(), dec!(2000));
        assert_eq!(service.check_balance("Id-125").unwrap(), dec!(2000));
    }

    #[test]
    fn deposit_rejects_non_positive_amount() {
        let service = service_with(&[("Id-124", dec!(0))]);
        for amount in [dec!(0), dec!(-5)] {
            let err = service.deposit("Id-124", amount).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount { amount: a } if a == amount));
        }
        assert_eq!(service.check_balance("Id-124").unwrap(), dec!(0));
    }

    #[test]
    fn invalid_amount_is_reported_before_lookup() {
        let service = service_with(&[]);
        let err = service.deposit("missing", dec!(-1)).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
    }

    #[test]
    fn deposit_overflow_leaves_balance() {
        let service = service_with(&[("max", Decimal::MAX)]);
        let err = service.deposit("max", dec!(1)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Account(AccountError::BalanceOverflow)
        ));
        assert_eq!(service.get_account("max").unwrap().balance(), Decimal::MAX);
    }

    #[test]
    fn deposit_that_would_round_is_rejected() {
        let service = service_with(&[("big", dec!(100000000000000000000))]);
        let err = service.deposit("big", dec!(0.0000000000000000000000000001)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Account(AccountError::PrecisionLoss { .. })
        ));
        assert_eq!(
            service.get_account("big").unwrap().balance(),
            dec!(100000000000000000000)
        );
    }

    #[test]
    fn withdraw_subtracts_from_balance() {
        let service = service_with(&[("Id-127", dec!(1000))]);
        assert_eq!(service.withdraw("Id-127", dec!(1000)).unwrap(), dec!(0));
    }

    #[test]
    fn withdraw_fails_when_insufficient_funds() {
        let service = service_with(&[("Id-126", dec!(10))]);
        let err = service.withdraw("Id-126", dec!(10.01)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Account(AccountError::InsufficientFunds {
                available,
                requested,
            }) if available == dec!(10) && requested == dec!(10.01)
        ));
        assert_eq!(service.check_balance("Id-126").unwrap(), dec!(10));
    }

    #[test]
    fn withdraw_rejects_zero_amount() {
        let service = service_with(&[("Id-126", dec!(0))]);
        let err = service.withdraw("Id-126", dec!(0)).unwrap_err();
        assert_eq!(err.to_string(), "Amount should be greater than zero, got 0");
    }

    #[test]
    fn unknown_account_is_reported() {
        let service = service_with(&[]);
        for err in [
            service.deposit("ghost", dec!(1)).unwrap_err(),
            service.withdraw("ghost", dec!(1)).unwrap_err(),
            service.check_balance("ghost").unwrap_err(),
        ] {
            assert!(matches!(
                err,
                LedgerError::Repository(RepositoryError::NotFound { ref id }) if id == "ghost"
            ));
        }
    }

    #[test]
    fn check_balance_rounds_half_to_even() {
        let service = service_with(&[
            ("a", dec!(1000)),
            ("b", dec!(0.125)),
            ("c", dec!(0.135)),
            ("d", dec!(2.5551)),
        ]);
        let a = service.check_balance("a").unwrap();
        assert_eq!(a.to_string(), "1000.00");
        assert_eq!(service.check_balance("b").unwrap(), dec!(0.12));
        assert_eq!(service.check_balance("c").unwrap(), dec!(0.14));
        assert_eq!(service.check_balance("d").unwrap(), dec!(2.56));
        // stored balance keeps full precision
        assert_eq!(service.get_account("d").unwrap().balance(), dec!(2.5551));
    }

    #[test]
    fn check_balance_is_idempotent() {
        let service = service_with(&[("a", dec!(10.005))]);
        let first = service.check_balance("a").unwrap();
        let second = service.check_balance("a").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn open_account_validation() {
        let service = service_with(&[("Id-1", dec!(1))]);
        assert!(matches!(
            service.open_account("Id-1", dec!(2)).unwrap_err(),
            LedgerError::Repository(RepositoryError::DuplicateId { .. })
        ));
        assert!(matches!(
            service.open_account("", dec!(2)).unwrap_err(),
            LedgerError::MissingAccountId
        ));
        assert!(matches!(
            service.open_account("Id-2", dec!(-2)).unwrap_err(),
            LedgerError::Account(AccountError::NegativeOpeningBalance { .. })
        ));
    }

    #[test]
    fn execute_dispatches_commands() {
        let service = service_with(&[]);
        service
            .execute(LedgerCommand::Open {
                account: "a".into(),
                balance: dec!(5),
            })
            .unwrap();
        service
            .execute(LedgerCommand::Open {
                account: "b".into(),
                balance: dec!(0),
            })
            .unwrap();
        service
            .execute(LedgerCommand::Deposit {
                account: "a".into(),
                amount: dec!(5),
            })
            .unwrap();
        service
            .execute(LedgerCommand::Withdraw {
                account: "a".into(),
                amount: dec!(3),
            })
            .unwrap();
        service
            .execute(LedgerCommand::Transfer {
                from: "a".into(),
                to: "b".into(),
                amount: dec!(4),
            })
            .unwrap();
        assert_eq!(service.check_balance("a").unwrap(), dec!(3));
        assert_eq!(service.check_balance("b").unwrap(), dec!(4));
    }
}
