//! Assign display codes to orders, refunds and users created without one.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::ffi::OsString;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use storefront::domain::{DisplayCodeBackfillService, DisplayCodeKind};
use storefront::outbound::persistence::{DbPool, DieselDisplayCodeRepository, PoolConfig};
use storefront::settings::DisplayCodeSettings;
use tokio::runtime::Builder;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Entity kinds selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Order,
    Refund,
    User,
}

impl From<KindArg> for DisplayCodeKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Order => Self::Order,
            KindArg::Refund => Self::Refund,
            KindArg::User => Self::User,
        }
    }
}

/// `backfill-display-codes` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "backfill-display-codes",
    about = "Assign unique display codes to rows that have none",
    version
)]
struct CliArgs {
    /// Kinds to backfill; repeat the flag for several. Defaults to all kinds.
    #[arg(long = "kind", value_enum, value_name = "kind")]
    kinds: Vec<KindArg>,
    /// Rows fetched per page; overrides `DISPLAY_CODE_BACKFILL_PAGE_SIZE`.
    #[arg(long = "page-size", value_name = "rows")]
    page_size: Option<usize>,
    /// Database connection URL. Falls back to `DATABASE_URL` when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

impl CliArgs {
    fn selected_kinds(&self) -> Vec<DisplayCodeKind> {
        if self.kinds.is_empty() {
            return DisplayCodeKind::ALL.to_vec();
        }
        let mut kinds: Vec<DisplayCodeKind> = self.kinds.iter().copied().map(Into::into).collect();
        kinds.sort_unstable();
        kinds.dedup();
        kinds
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main(CliArgs::parse()))
}

async fn async_main(args: CliArgs) -> Result<()> {
    let settings = DisplayCodeSettings::load_from_iter([OsString::from("backfill-display-codes")])
        .map_err(|error| eyre!("load display code settings: {error}"))?;
    settings.validate().wrap_err("invalid display code settings")?;
    let page_size = args.page_size.unwrap_or_else(|| settings.backfill_page_size());
    if page_size == 0 {
        return Err(eyre!("--page-size must be at least 1"));
    }

    let database_url = resolve_database_url(args.database_url.clone())?;
    let pool = DbPool::new(PoolConfig::new(database_url).with_max_size(2))
        .await
        .wrap_err("create database pool")?;
    let repository = Arc::new(DieselDisplayCodeRepository::new(pool));
    let assigner = settings.backfill_assigner(Arc::clone(&repository), Arc::new(DefaultClock));
    let service = DisplayCodeBackfillService::new(repository, assigner).with_page_size(page_size);

    let report = service
        .run(&args.selected_kinds())
        .await
        .map_err(|error| eyre!("backfill failed: {error}"))?;

    for entry in &report.kinds {
        info!(kind = %entry.kind, assigned = entry.assigned, skipped = entry.skipped, "backfill summary");
        println!("{}: assigned={} skipped={}", entry.kind, entry.assigned, entry.skipped);
    }
    Ok(())
}

fn resolve_database_url(explicit: Option<String>) -> Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            return Err(eyre!("--database-url must not be empty when provided"));
        }
        return Ok(value);
    }

    let from_env = env::var("DATABASE_URL")
        .map_err(|_| eyre!("database URL missing: set --database-url or DATABASE_URL"))?;
    if from_env.trim().is_empty() {
        return Err(eyre!("DATABASE_URL must not be empty"));
    }
    Ok(from_env)
}
