//! Two-party transfer.
//!
//! Both transfer locks are taken with try-and-backoff: a bounded wait on the
//! debtor's lock, then a bounded wait on the creditor's. If the second one is
//! not obtained, the first is released before sleeping, so no thread ever
//! holds one transfer lock while waiting unboundedly for the other. Once both
//! are held, both balance write locks are taken for the debit/credit step.

use std::{
    thread,
    time::{Duration, Instant},
};

use parking_lot::MutexGuard;
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

use crate::{
    account::{AccountRecord, BalanceCommand},
    repository::AccountRepository,
};

use super::{LedgerError, LedgerService, ensure_account_id, ensure_positive};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub amount: Decimal,
    /// Lock-pair attempts it took, at least 1
    pub attempts: u32,
}

/// Both transfer locks, released together on drop.
struct TransferLocks<'a> {
    _from: MutexGuard<'a, ()>,
    _to: MutexGuard<'a, ()>,
}

impl<R> LedgerService<R>
where
    R: AccountRepository,
{
    pub fn transfer(
        &self,
        from_id: &str,
        to_id: &str,
        amount: Decimal,
    ) -> Result<TransferReceipt, LedgerError> {
        ensure_account_id(from_id)?;
        ensure_account_id(to_id)?;
        if from_id == to_id {
            return Err(LedgerError::SameAccount {
                id: from_id.to_owned(),
            });
        }
        ensure_positive(amount)?;

        let from = self.repository.get(from_id)?;
        let to = self.repository.get(to_id)?;

        let (_locks, attempts) = self.lock_pair(&from, &to)?;
        move_funds(&from, &to, amount)?;

        debug!(from = from_id, to = to_id, %amount, attempts, "transferred");
        Ok(TransferReceipt { amount, attempts })
    }

    fn lock_pair<'a>(
        &self,
        from: &'a AccountRecord,
        to: &'a AccountRecord,
    ) -> Result<(TransferLocks<'a>, u32), LedgerError> {
        let config = &self.config;
        let deadline = Instant::now() + config.timeout;
        let mut attempt = 0;

        loop {
            attempt += 1;
            if let Some(from_guard) = from.try_lock_transfer(config.lock_wait) {
                if let Some(to_guard) = to.try_lock_transfer(config.lock_wait) {
                    return Ok((
                        TransferLocks {
                            _from: from_guard,
                            _to: to_guard,
                        },
                        attempt,
                    ));
                }
                drop(from_guard);
            }

            let now = Instant::now();
            if attempt >= config.max_attempts || now >= deadline {
                warn!(
                    from = from.id(),
                    to = to.id(),
                    attempts = attempt,
                    "gave up acquiring transfer locks"
                );
                return Err(LedgerError::TransferTimeout {
                    from: from.id().to_owned(),
                    to: to.id().to_owned(),
                    attempts: attempt,
                });
            }

            let delay = config.backoff(attempt).min(deadline - now);
            debug!(
                from = from.id(),
                to = to.id(),
                attempt,
                ?delay,
                "transfer locks busy, backing off"
            );
            if delay > Duration::ZERO {
                thread::sleep(delay);
            }
        }
    }
}

/// Debit then credit with both balance write locks held.
///
/// Callers must hold both transfer locks. That makes the order of the two
/// write locks irrelevant: any other holder is either a single-account
/// operation, which waits on nothing else, or a transfer, which cannot get
/// here without one of our transfer locks.
fn move_funds(
    from: &AccountRecord,
    to: &AccountRecord,
    amount: Decimal,
) -> Result<(), LedgerError> {
    let mut from_state = from.write_state();
    let mut to_state = to.write_state();

    let debit = from_state.execute(BalanceCommand::Debit(amount))?;
    if let Err(source) = to_state.execute(BalanceCommand::Credit(amount)) {
        from_state.apply(&debit.reversal());
        error!(
            from = from.id(),
            to = to.id(),
            %amount,
            %source,
            "credit failed after debit, source re-credited"
        );
        return Err(LedgerError::InternalInconsistency {
            from: from.id().to_owned(),
            to: to.id().to_owned(),
            amount,
            source,
        });
    }
    Ok(())
}
