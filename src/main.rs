mod assets;
mod convert;
mod db;
mod export;
mod migrate;
mod model;

use clap::Parser;
use tracing::info;

/// One-time batch migration of legacy design templates into the Design
/// schema: convert, copy assets, upsert, then export JSON files plus a
/// manifest.
#[derive(Debug, Parser)]
#[command(name = "designconv", version)]
struct Args {
    /// Convert at most this many templates (ascending id order).
    limit: Option<u32>,
}

const EXPORT_DIR: &str = "exported_designs";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let workspace = std::env::current_dir()?;

    let conn = db::open_db(&workspace)?;
    let resolver = assets::AssetResolver::new(&workspace);

    let summary = migrate::run_migration(&conn, &resolver, args.limit)?;
    let export = export::export_designs(&conn, &workspace.join(EXPORT_DIR))?;

    info!(
        converted = summary.converted,
        errors = summary.errors,
        exported = export.exported,
        export_failed = export.failed,
        manifest = %export.manifest_path.to_string_lossy(),
        "migration finished"
    );
    Ok(())
}
