use std::io::Write;

use anyhow::Context;
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{repository::AccountRepository, service::LedgerService};

#[derive(Debug, Serialize)]
struct BalanceRow<'a> {
    account: &'a str,
    balance: Decimal,
}

/// Writes `account,balance` for every account, sorted by id.
///
/// Each balance is read through [`LedgerService::check_balance`], so it is
/// the same rounded figure a caller would see. Accounts are read one at a
/// time, so the report is not a consistent cut while transfers run.
pub fn print_balances<W, A>(output: &mut W, ledger: &LedgerService<A>) -> anyhow::Result<()>
where
    W: Write,
    A: AccountRepository,
{
    let mut accounts = ledger.repository().accounts();
    accounts.sort_unstable_by(|a, b| a.id().cmp(b.id()));

    let mut writer = Writer::from_writer(output);
    for acc in &accounts {
        let balance = ledger.check_balance(acc.id())?;
        writer
            .serialize(BalanceRow {
                account: acc.id(),
                balance,
            })
            .with_context(|| format!("Failed to write balance of `{}`", acc.id()))?;
    }
    writer.flush().context("Failed to flush CSV writer")
}
