//! Rebuild balances tool
//!
//! Admin-only tool that re-runs the balance recalculator over party
//! ledgers, treating the ledger entries as the source of truth and the
//! cached balances as a materialized view to restore.
//!
//! # Usage
//! ```bash
//! rebuild_balances --party PARTY_UUID
//! rebuild_balances --all
//! ```
//!
//! # Safety
//! - One party per transaction; a failure on one party leaves the others
//!   rebuilt and is reported at the end
//! - Deterministic: the same entries always produce the same balances

use std::env;
use uuid::Uuid;

use ledger_rs::config::Config;
use ledger_rs::db;
use ledger_rs::repos::party_repo;
use ledger_rs::services::party_ledger_service;

enum Target {
    Party(Uuid),
    All,
}

fn parse_args() -> Result<Target, String> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("--all") => Ok(Target::All),
        Some("--party") => {
            let raw = args
                .get(2)
                .ok_or_else(|| "--party requires a value".to_string())?;
            let id = Uuid::parse_str(raw).map_err(|e| format!("Invalid party id: {}", e))?;
            Ok(Target::Party(id))
        }
        _ => Err(format!(
            "Usage: {} --party PARTY_UUID | --all",
            args.first().map(|s| s.as_str()).unwrap_or("rebuild_balances")
        )),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let target = match parse_args() {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = Config::from_env().expect("Failed to load configuration from environment");

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let party_ids = match target {
        Target::Party(id) => vec![id],
        Target::All => party_repo::list_ids(&pool)
            .await
            .expect("Failed to list parties"),
    };

    tracing::info!(parties = party_ids.len(), "Starting balance rebuild");

    let mut failed = 0u64;
    for party_id in &party_ids {
        let mut tx = pool.begin().await.expect("Failed to begin transaction");
        match party_ledger_service::recalculate_paged(&mut tx, *party_id, config.recalc_page_size)
            .await
        {
            Ok(balance) => {
                tx.commit().await.expect("Failed to commit rebuild");
                tracing::info!(party_id = %party_id, balance_minor = balance, "Rebuilt party balance");
            }
            Err(e) => {
                failed += 1;
                tracing::error!(party_id = %party_id, error = %e, "Rebuild failed for party");
            }
        }
    }

    tracing::info!(
        rebuilt = party_ids.len() as u64 - failed,
        failed = failed,
        "Balance rebuild complete"
    );

    if failed > 0 {
        std::process::exit(1);
    }
}
