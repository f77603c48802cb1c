//! Orphan purge tool
//!
//! Runs the orphan auditor once: ledger rows whose referenced source
//! document can no longer be resolved are deleted and the affected party
//! balances recalculated. Reference types without a registered resolver
//! are reported and left untouched.
//!
//! Resolvers are registered for the document tables the deployment owns;
//! pass `--dry-run` to scan without purging.

use ledger_rs::config::Config;
use ledger_rs::contracts::posting_event_v1::DocKind;
use ledger_rs::db;
use ledger_rs::repos::party_ledger_repo;
use ledger_rs::resolver::{ResolverRegistry, TableResolver};
use ledger_rs::services::orphan_auditor;

fn build_registry() -> ResolverRegistry {
    let mut registry = ResolverRegistry::new();
    registry
        .register(DocKind::SalesInvoice, Box::new(TableResolver::new("sales_invoices")))
        .register(DocKind::PurchaseInvoice, Box::new(TableResolver::new("purchase_invoices")))
        .register(DocKind::SalesReturn, Box::new(TableResolver::new("sales_returns")))
        .register(DocKind::PurchaseReturn, Box::new(TableResolver::new("purchase_returns")))
        .register(DocKind::Payment, Box::new(TableResolver::new("payments")))
        .register(DocKind::Receipt, Box::new(TableResolver::new("receipts")));
    registry
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let dry_run = std::env::args().any(|a| a == "--dry-run");

    let config = Config::from_env().expect("Failed to load configuration from environment");

    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let registry = build_registry();

    if dry_run {
        let references = party_ledger_repo::list_distinct_references(&pool)
            .await
            .expect("Failed to list references");
        tracing::info!(references = references.len(), "Dry run: scanning only");
        for reference in references {
            match registry
                .resolve(&pool, &reference.reference_type, &reference.reference_id)
                .await
            {
                Ok(resolution) => tracing::info!(
                    reference_type = %reference.reference_type,
                    reference_id = %reference.reference_id,
                    resolution = ?resolution,
                    "Scanned reference"
                ),
                Err(e) => tracing::warn!(
                    reference_type = %reference.reference_type,
                    reference_id = %reference.reference_id,
                    error = %e,
                    "Resolution failed"
                ),
            }
        }
        return;
    }

    let report = orphan_auditor::find_and_purge_orphans(&pool, &registry, &config.default_actor)
        .await
        .expect("Orphan audit failed");

    println!(
        "scanned={} purged_references={} purged_rows={} skipped_unknown={} failed={}",
        report.scanned,
        report.purged_references,
        report.purged_rows,
        report.skipped_unknown,
        report.failed
    );
}
