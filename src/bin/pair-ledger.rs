use std::fs::File;

use anyhow::{Context, Result};
use pair_ledger::{
    bin_utils::{ProcessError, Service},
    config::LedgerConfig,
    repository::in_memory::InMemoryAccountRepository,
    service::LedgerService,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pair_ledger=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let filename = std::env::args()
        .nth(1)
        .context("Expected a file name as the first argument")?;
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    let config = LedgerConfig::from_env();
    info!(
        max_attempts = config.max_attempts,
        timeout = ?config.timeout,
        "processing `{filename}`"
    );

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        ledger: LedgerService::new(InMemoryAccountRepository::new(), config),
        error_printer: Box::new(|line, err| match err {
            ProcessError::LedgerErr(err) => {
                // business failures, the row is simply rejected
                warn!(line, "{err}")
            }
            err => error!(line, "{err}"),
        }),
    };
    service.run()
}
