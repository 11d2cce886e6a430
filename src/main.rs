use clap::Parser;
use gigpay::application::engine::EscrowEngine;
use gigpay::domain::ports::EscrowStore;
use gigpay::infrastructure::gateway::HmacGateway;
use gigpay::infrastructure::in_memory::InMemoryStore;
#[cfg(feature = "storage-rocksdb")]
use gigpay::infrastructure::rocksdb::RocksDbStore;
use gigpay::interfaces::csv::balance_writer::BalanceWriter;
use gigpay::interfaces::csv::op_reader::OpReader;
use gigpay::interfaces::replay::Replayer;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operation-log CSV file
    input: PathBuf,

    /// Path to persistent database (requires the storage-rocksdb feature)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Secret used to verify (and, for replayed events, produce) webhook
    /// signatures
    #[arg(long, default_value = "whsec_dev")]
    webhook_secret: String,

    /// Platform commission rate applied to new orders
    #[arg(long, default_value = "0.05")]
    commission_rate: Decimal,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();

    #[cfg(feature = "storage-rocksdb")]
    if let Some(path) = &cli.db_path {
        let store = RocksDbStore::open(path).into_diagnostic()?;
        return run(store, &cli).await;
    }
    #[cfg(not(feature = "storage-rocksdb"))]
    if cli.db_path.is_some() {
        eprintln!("--db-path requires the storage-rocksdb feature; using in-memory storage");
    }

    run(InMemoryStore::new(), &cli).await
}

async fn run<S: EscrowStore + Clone + 'static>(store: S, cli: &Cli) -> Result<()> {
    let signer = HmacGateway::new(cli.webhook_secret.clone());
    let engine = EscrowEngine::with_commission_rate(
        Box::new(store.clone()),
        Box::new(HmacGateway::new(cli.webhook_secret.clone())),
        cli.commission_rate,
    );
    let replayer = Replayer::new(&engine, &store, &signer);

    let file = File::open(&cli.input).into_diagnostic()?;
    for record in OpReader::new(file).records() {
        match record {
            Ok(record) => {
                if let Err(e) = replayer.apply(record).await {
                    eprintln!("Error applying operation: {e}");
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {e}");
            }
        }
    }

    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer
        .write_users(store.users().await.into_diagnostic()?)
        .into_diagnostic()?;
    Ok(())
}
