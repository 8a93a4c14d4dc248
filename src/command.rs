use rust_decimal::{Decimal, prelude::Zero};
use serde::Deserialize;
use thiserror::Error;

use crate::account::AccountId;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Open,
    Deposit,
    Withdraw,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    Open {
        account: AccountId,
        balance: Decimal,
    },
    Deposit {
        account: AccountId,
        amount: Decimal,
    },
    Withdraw {
        account: AccountId,
        amount: Decimal,
    },
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    },
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Amount is required for {kind:?}")]
    AmountRequired { kind: CommandKind },
    #[error("Counterparty is required for Transfer")]
    CounterpartyRequired,
    #[error("Counterparty is not expected for {kind:?}")]
    UnexpectedCounterparty { kind: CommandKind },
}

impl LedgerCommand {
    /// Shapes a raw row into a command. Amount signs are left to the ledger.
    pub fn parse_command(
        kind: CommandKind,
        account: AccountId,
        counterparty: Option<AccountId>,
        amount: Option<Decimal>,
    ) -> Result<Self, CommandError> {
        if kind != CommandKind::Transfer && counterparty.is_some() {
            return Err(CommandError::UnexpectedCounterparty { kind });
        }
        match kind {
            CommandKind::Open => Ok(Self::Open {
                account,
                balance: amount.unwrap_or_else(Decimal::zero),
            }),
            CommandKind::Deposit => Ok(Self::Deposit {
                account,
                amount: Self::require_amount(kind, amount)?,
            }),
            CommandKind::Withdraw => Ok(Self::Withdraw {
                account,
                amount: Self::require_amount(kind, amount)?,
            }),
            CommandKind::Transfer => {
                let Some(to) = counterparty else {
                    return Err(CommandError::CounterpartyRequired);
                };
                Ok(Self::Transfer {
                    from: account,
                    to,
                    amount: Self::require_amount(kind, amount)?,
                })
            }
        }
    }

    fn require_amount(kind: CommandKind, amount: Option<Decimal>) -> Result<Decimal, CommandError> {
        amount.ok_or(CommandError::AmountRequired { kind })
    }
}
