use rusqlite::Connection;
use tracing::{error, info};

use crate::assets::AssetResolver;
use crate::convert;
use crate::db;

/// Outcome of one batch run, accumulated by the driver and handed back to
/// the caller instead of living in process-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    pub converted: usize,
    pub errors: usize,
}

impl MigrationSummary {
    pub fn total(&self) -> usize {
        self.converted + self.errors
    }
}

/// Runs the conversion stage: fetch legacy rows, convert each, upsert the
/// result. Per-record conversion failures are counted and logged; only
/// store failures (fetch/upsert) abort the run. Rows already written stay
/// written.
pub fn run_migration(
    conn: &Connection,
    resolver: &AssetResolver,
    limit: Option<u32>,
) -> anyhow::Result<MigrationSummary> {
    db::ensure_schema(conn)?;

    let templates = db::fetch_templates(conn, limit)?;
    info!(count = templates.len(), "starting template conversion");

    let mut summary = MigrationSummary::default();
    for template in &templates {
        match convert::convert_template(template, resolver) {
            Ok(design) => {
                db::upsert_design(conn, &design, template)?;
                summary.converted += 1;
                info!(template = template.id, design = %design.id, "converted template");
            }
            Err(e) => {
                summary.errors += 1;
                error!(template = template.id, error = %e, "failed to convert template");
            }
        }
    }

    info!(
        converted = summary.converted,
        errors = summary.errors,
        total = summary.total(),
        "conversion completed"
    );
    Ok(summary)
}
