use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};
use rust_decimal::{Decimal, prelude::Zero};
use thiserror::Error;

pub type AccountId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceCommand {
    Credit(Decimal),
    Debit(Decimal),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEventKind {
    Credited,
    Debited,
}

/// Outcome of a handled command: the amount moved and the exact balance on
/// either side of it.
#[derive(Debug, Clone, Copy)]
pub struct BalanceEvent {
    amount: Decimal,
    kind: BalanceEventKind,
    previous: Decimal,
    balance: Decimal,
}

impl BalanceEvent {
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn kind(&self) -> BalanceEventKind {
        self.kind
    }

    /// Event that undoes this one when applied right after it.
    pub fn reversal(&self) -> BalanceEvent {
        let kind = match self.kind {
            BalanceEventKind::Credited => BalanceEventKind::Debited,
            BalanceEventKind::Debited => BalanceEventKind::Credited,
        };
        BalanceEvent {
            amount: self.amount,
            kind,
            previous: self.balance,
            balance: self.previous,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },
    #[error("Balance would overflow")]
    BalanceOverflow,
    #[error("{amount} cannot be applied to balance {balance} without rounding")]
    PrecisionLoss { balance: Decimal, amount: Decimal },
    #[error("Opening balance must not be negative, got {balance}")]
    NegativeOpeningBalance { balance: Decimal },
}

/// Balance guarded by the record's state lock.
///
/// Mutation is split in two: [`BalanceState::handle`] validates a command
/// against the current value and produces an event, [`BalanceState::apply`]
/// mutates. Both must run under the same write guard.
#[derive(Debug, Default)]
pub struct BalanceState {
    balance: Decimal,
}

impl BalanceState {
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn apply(&mut self, event: &BalanceEvent) {
        debug_assert_eq!(self.balance, event.previous);
        self.balance = event.balance;
    }

    /// Every accepted command moves the balance by exactly `amount`.
    /// `Decimal` rounds when the two scales don't fit one mantissa, so a
    /// result that doesn't differ by `amount` is rejected.
    pub fn handle(&self, command: BalanceCommand) -> Result<BalanceEvent, AccountError> {
        match command {
            BalanceCommand::Credit(amount) => {
                let Some(balance) = self.balance.checked_add(amount) else {
                    return Err(AccountError::BalanceOverflow);
                };
                if balance.checked_sub(self.balance) != Some(amount) {
                    return Err(AccountError::PrecisionLoss {
                        balance: self.balance,
                        amount,
                    });
                }
                Ok(BalanceEvent {
                    amount,
                    kind: BalanceEventKind::Credited,
                    previous: self.balance,
                    balance,
                })
            }
            BalanceCommand::Debit(amount) => {
                if self.balance < amount {
                    return Err(AccountError::InsufficientFunds {
                        available: self.balance,
                        requested: amount,
                    });
                }
                match self.balance.checked_sub(amount) {
                    Some(balance)
                        if balance >= Decimal::zero()
                            && self.balance.checked_sub(balance) == Some(amount) =>
                    {
                        Ok(BalanceEvent {
                            amount,
                            kind: BalanceEventKind::Debited,
                            previous: self.balance,
                            balance,
                        })
                    }
                    _ => Err(AccountError::PrecisionLoss {
                        balance: self.balance,
                        amount,
                    }),
                }
            }
        }
    }

    /// Handles the command and applies the resulting event.
    pub fn execute(&mut self, command: BalanceCommand) -> Result<BalanceEvent, AccountError> {
        let event = self.handle(command)?;
        self.apply(&event);
        Ok(event)
    }
}

/// A single account: its id, its balance and the two locks around it.
///
/// `state` is the reader/writer lock for the balance. `transfer` only
/// serializes participation in transfers, so a transfer can negotiate with
/// its peer without holding the balance lock.
#[derive(Debug)]
pub struct AccountRecord {
    id: AccountId,
    state: RwLock<BalanceState>,
    transfer: Mutex<()>,
}

impl AccountRecord {
    pub fn new(id: impl Into<AccountId>, balance: Decimal) -> Result<Self, AccountError> {
        if balance < Decimal::zero() {
            return Err(AccountError::NegativeOpeningBalance { balance });
        }
        Ok(Self {
            id: id.into(),
            state: RwLock::new(BalanceState { balance }),
            transfer: Mutex::new(()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn write_state(&self) -> RwLockWriteGuard<'_, BalanceState> {
        self.state.write()
    }

    /// Full precision snapshot, taken under the read lock.
    pub fn balance(&self) -> Decimal {
        self.state.read().balance()
    }

    pub(crate) fn try_lock_transfer(&self, wait: Duration) -> Option<MutexGuard<'_, ()>> {
        self.transfer.try_lock_for(wait)
    }
}
