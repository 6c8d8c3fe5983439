use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payorch::application::core::Core;
use payorch::domain::ports::TransactionLedgerBox;
use payorch::infrastructure::fixture::{Fixture, FixtureTransport};
use payorch::infrastructure::in_memory::{InMemoryLedger, InMemoryPlatform};
use payorch::interfaces::csv::order_writer::{OrderSummary, OrderWriter};
use payorch::interfaces::csv::transaction_reader::TransactionReader;
use payorch::logging;
use std::fs::File;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Transaction notifications CSV file
    input: PathBuf,

    /// Scenario file: configuration, order and scripted remote replies
    #[arg(long)]
    fixture: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<TransactionLedgerBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let ledger = payorch::infrastructure::rocksdb::RocksDbLedger::open(path).into_diagnostic()?;
            Ok(Box::new(ledger))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryLedger::new()))
        }
        None => Ok(Box::new(InMemoryLedger::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    let cli = Cli::parse();

    let fixture = Fixture::from_path(&cli.fixture).into_diagnostic()?;
    let order_id = fixture.order.order_id.clone();

    let platform = InMemoryPlatform::with_ledger(open_ledger(cli.db_path)?);
    platform.insert_order(fixture.order).await;

    let core = Core::new(
        fixture.configuration,
        Box::new(platform.clone()),
        Box::new(FixtureTransport::from_routes(fixture.routes)),
    );

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = TransactionReader::new(file);
    for tx_result in reader.transactions() {
        match tx_result {
            Ok(tx) => {
                if let Err(e) = core.process_financial_transaction(&order_id, &tx).await {
                    eprintln!("Error processing transaction: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading transaction: {}", e);
            }
        }
    }

    let order = platform
        .order(&order_id)
        .await
        .ok_or_else(|| miette::miette!("Order #{order_id} disappeared during replay"))?;
    let summary = OrderSummary {
        credited: platform.credited_total(&order_id).await.into_diagnostic()?,
        notes: platform.notes(&order_id).await,
        order,
    };

    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders([&summary]).into_diagnostic()?;

    Ok(())
}
