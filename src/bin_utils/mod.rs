//! CSV batch driver around [`LedgerService`](crate::service::LedgerService).
//! It lives in the library so integration tests can drive it the same way
//! the binary does.

use std::io::{Read, Write};

use anyhow::Result;
use csv_parser::CsvCommandParser;
use csv_printer::print_balances;
use thiserror::Error;

use crate::{
    command::{CommandError, LedgerCommand},
    repository::AccountRepository,
    service::{LedgerError, LedgerService},
};

pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Malformed row: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    CommandErr(#[from] CommandError),
    #[error(transparent)]
    LedgerErr(#[from] LedgerError),
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub ledger: LedgerService,
    pub error_printer: Box<dyn FnMut(u64, ProcessError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvCommandParser::new(self.input);

        for (line, row) in parser {
            if let Err(err) = process_row(&self.ledger, row) {
                (self.error_printer)(line, err);
            }
        }

        print_balances(self.output, &self.ledger)
    }
}

fn process_row<A>(
    ledger: &LedgerService<A>,
    row: csv::Result<csv_parser::LedgerRow>,
) -> Result<(), ProcessError>
where
    A: AccountRepository,
{
    let row = row?;
    let cmd = LedgerCommand::parse_command(row.kind, row.account, row.counterparty, row.amount)?;
    ledger.execute(cmd)?;
    Ok(())
}
