//! Operator-driven import worker.
//!
//! Reads a JSON array of raw rows from a file and runs one import against
//! the configured database:
//!
//! ```text
//! ledgerly-worker <tenant-uuid> <entity-kind> <rows.json>
//! ```
//!
//! The result summary is printed to stdout as JSON.

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use ledgerly_core::config::ImportConfig;
use ledgerly_core::normalize::RawRow;
use ledgerly_import::{run_import, EntityKind, ImportContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerly_worker=info,ledgerly_import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [tenant, kind, rows_path] = args.as_slice() else {
        bail!("usage: ledgerly-worker <tenant-uuid> <entity-kind> <rows.json>");
    };

    let tenant_id = Uuid::parse_str(tenant).context("tenant must be a UUID")?;
    let kind = EntityKind::from_str(kind).with_context(|| {
        format!(
            "unknown entity kind '{kind}'; expected one of: {}",
            EntityKind::ALL.join(", ")
        )
    })?;

    let raw = std::fs::read_to_string(rows_path)
        .with_context(|| format!("failed to read {rows_path}"))?;
    let values: Vec<serde_json::Value> =
        serde_json::from_str(&raw).context("rows file must be a JSON array of objects")?;
    let rows: Vec<RawRow> = values
        .into_iter()
        .map(|value| RawRow::from_json(value).context("every row must be a JSON object"))
        .collect::<anyhow::Result<_>>()?;
    tracing::info!(count = rows.len(), tenant = %tenant_id, kind = %kind, "Loaded import batch");

    let config = ImportConfig::from_env();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = ledgerly_db::create_pool(&database_url)
        .await
        .context("failed to connect to database")?;
    ledgerly_db::health_check(&pool)
        .await
        .context("database health check failed")?;
    ledgerly_db::run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;
    tracing::info!("Database ready");

    let ctx = ImportContext::new(pool, config);
    let result = run_import(&ctx, tenant_id, kind, rows).await?;

    tracing::info!(
        count = result.count,
        failed = result.failed,
        "Import finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
