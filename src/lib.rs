/// Account records: balance state behind a reader/writer lock, plus the
/// per-account lock that serializes transfers.
/// Balance changes go through commands that produce events.
pub mod account;

/// Typed ledger commands built from raw input rows.
pub mod command;

/// Transfer retry policy, read from the environment.
pub mod config;

/// Keyed store of account records, plus an "in memory" implementation.
///
/// NOTE: the service only depends on the trait, so another store can be
/// dropped in without touching the locking logic.
pub mod repository;

/// Deposit, withdraw, balance query and the two-party transfer protocol.
pub mod service;

/// CSV batch driver. It belongs to the binary, but integration tests use it
/// too, so it lives here.
pub mod bin_utils;
