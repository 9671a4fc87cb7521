use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, Command};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use asset_ledger::verify::verify_chain;
use asset_ledger::{LedgerConfig, LedgerStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("verify-ledger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Verify the hash-chain integrity of recorded asset histories")
        .arg(
            Arg::new("database-url")
                .short('d')
                .long("database-url")
                .value_name("URL")
                .help("SQLite database URL, e.g. sqlite://ledger.db")
                .required(true),
        )
        .arg(
            Arg::new("subject")
                .short('s')
                .long("subject")
                .value_name("UUID")
                .help("Verify a single subject instead of every ledger"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Emit verification reports as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress output except errors")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let database_url = matches.get_one::<String>("database-url").unwrap();
    let json = matches.get_flag("json");
    let quiet = matches.get_flag("quiet");

    // Initialize tracing
    let default_filter = if quiet {
        "error"
    } else {
        "asset_ledger=info,verify_ledger=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = LedgerConfig::from_env()?;
    let store = LedgerStore::connect(database_url, config).await?;

    let subjects = match matches.get_one::<String>("subject") {
        Some(raw) => vec![Uuid::parse_str(raw)
            .map_err(|e| anyhow!("Invalid subject id {:?}: {}", raw, e))?],
        None => store.subjects().await?,
    };

    if subjects.is_empty() {
        if !quiet {
            println!("No ledgers recorded yet");
        }
        return Ok(());
    }

    info!("Verifying {} ledger(s) in {}", subjects.len(), database_url);

    let mut reports = Vec::new();
    let mut broken = 0usize;

    for subject in &subjects {
        let result = verify_chain(&store, *subject).await?;
        if !result.is_valid() {
            broken += 1;
        }
        if json {
            reports.push(serde_json::json!({
                "subject_id": subject,
                "verification": result,
            }));
        } else if !quiet {
            let marker = if result.is_valid() { "✓" } else { "✗" };
            println!("{} {}: {}", marker, subject, result.summary());
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if broken > 0 {
        error!("{} of {} ledger(s) failed verification", broken, subjects.len());
        std::process::exit(1);
    }

    if !quiet {
        println!("✓ {} ledger(s) verified", subjects.len());
    }

    Ok(())
}
