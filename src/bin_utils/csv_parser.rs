use std::io::Read;

use crate::command::CommandKind;
use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "type")]
    pub kind: CommandKind,
    pub account: String,
    pub counterparty: Option<String>,
    pub amount: Option<Decimal>,
}

/// Parses ledger commands in CSV format, one row per command.
///
/// Malformed rows are yielded as errors together with their line number.
pub struct CsvCommandParser<R> {
    iter: DeserializeRecordsIntoIter<R, LedgerRow>,
}

impl<R> CsvCommandParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvCommandParser<R>
where
    R: Read,
{
    type Item = (u64, csv::Result<LedgerRow>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows() {
        let input = "type,account,counterparty,amount\n\
                     open, a ,,10.5\n\
                     transfer,a,b,1\n\
                     bogus,a,,1\n";
        let rows: Vec<_> = CsvCommandParser::new(input.as_bytes()).collect();
        assert_eq!(rows.len(), 3);

        let (_, first) = &rows[0];
        let first = first.as_ref().unwrap();
        assert_eq!(first.kind, CommandKind::Open);
        assert_eq!(first.account, "a");
        assert_eq!(first.counterparty, None);
        assert_eq!(first.amount, Some(Decimal::new(105, 1)));

        let (_, second) = &rows[1];
        assert_eq!(second.as_ref().unwrap().counterparty.as_deref(), Some("b"));

        let (_, third) = &rows[2];
        assert!(third.is_err());
    }
}
