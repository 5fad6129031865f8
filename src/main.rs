use dotenvy::dotenv;
use receipt_splitter::{
    config::{database, settings},
    core::{allocation, receipt, report},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load settings from config.toml (defaults if absent)
    let settings = settings::load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!(item_base = ?settings.split.item_base, "Settings loaded");

    // 4. Connect and make sure tables exist
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;

    // 5. Without an argument list receipts, otherwise print one receipt's split
    let Some(arg) = std::env::args().nth(1) else {
        let receipts = receipt::list_receipts(&db).await?;
        if receipts.is_empty() {
            println!("No receipts yet.");
        }
        for r in receipts {
            println!(
                "{:>5}  {:<30} {}",
                r.id,
                r.name,
                report::format_currency(r.total, &settings.display.currency_symbol)
            );
        }
        return Ok(());
    };

    let receipt_id: i64 = arg.parse()?;
    let snapshot = receipt::load_snapshot(&db, receipt_id)
        .await
        .inspect_err(|e| error!("Could not load receipt {}: {}", receipt_id, e))?;
    let costs = allocation::calculate_friend_costs(&snapshot, settings.split.item_base);
    print!(
        "{}",
        report::format_split_report(&snapshot, &costs, &settings.display.currency_symbol)?
    );

    Ok(())
}
