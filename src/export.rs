use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use serde_json::json;
use tracing::{error, info};

use crate::db::{self, StoredDesign};

pub const MANIFEST_FILE: &str = "designs_manifest.json";
pub const MANIFEST_VERSION: &str = "1.0.0";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub exported: usize,
    pub failed: usize,
    pub manifest_path: PathBuf,
}

/// Writes every stored design to `<id>.json` plus an aggregate manifest.
///
/// A design whose stored JSON fails to re-parse (or whose file cannot be
/// written) is logged and counted; the export keeps going and the broken
/// design is simply absent from the manifest.
pub fn export_designs(conn: &Connection, export_dir: &Path) -> anyhow::Result<ExportSummary> {
    std::fs::create_dir_all(export_dir).with_context(|| {
        format!(
            "failed to create export directory {}",
            export_dir.to_string_lossy()
        )
    })?;

    let rows = db::list_designs(conn)?;
    info!(count = rows.len(), "exporting designs");

    let mut manifest_entries: Vec<serde_json::Value> = Vec::with_capacity(rows.len());
    let mut exported = 0usize;
    let mut failed = 0usize;

    for row in &rows {
        match write_design_file(row, export_dir) {
            Ok(()) => {
                manifest_entries.push(manifest_entry(row));
                exported += 1;
            }
            Err(e) => {
                error!(design = %row.id, error = %e, "failed to export design");
                failed += 1;
            }
        }
    }

    let manifest = json!({
        "version": MANIFEST_VERSION,
        "exportDate": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "totalDesigns": manifest_entries.len(),
        "designs": manifest_entries,
    });
    let manifest_path = export_dir.join(MANIFEST_FILE);
    std::fs::write(
        &manifest_path,
        serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?,
    )
    .with_context(|| {
        format!(
            "failed to write manifest {}",
            manifest_path.to_string_lossy()
        )
    })?;

    Ok(ExportSummary {
        exported,
        failed,
        manifest_path,
    })
}

fn write_design_file(row: &StoredDesign, export_dir: &Path) -> anyhow::Result<()> {
    let data: serde_json::Value = serde_json::from_str(&row.data)
        .with_context(|| format!("stored data for {} is not valid JSON", row.id))?;
    let layers: serde_json::Value = serde_json::from_str(&row.layers)
        .with_context(|| format!("stored layers for {} is not valid JSON", row.id))?;

    let doc = json!({
        "id": row.id,
        "name": row.name,
        "title": row.title,
        "description": row.description,
        "data": data,
        "layers": layers,
        "thumbnail": row.thumbnail,
        "width": row.width,
        "height": row.height,
        "userId": row.user_id,
        "projectId": row.project_id,
        "isPublic": row.is_public,
        "createdAt": row.created_at,
        "updatedAt": row.updated_at,
        "originalId": row.original_id,
    });

    let path = export_dir.join(format!("{}.json", row.id));
    std::fs::write(
        &path,
        serde_json::to_string_pretty(&doc).context("failed to serialize design")?,
    )
    .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
    Ok(())
}

fn manifest_entry(row: &StoredDesign) -> serde_json::Value {
    json!({
        "id": row.id,
        "name": row.name,
        "title": row.title,
        "category": row.category,
        "tags": row.tags,
        "width": row.width,
        "height": row.height,
        "thumbnail": row.thumbnail,
        "isPublic": row.is_public,
        "file": format!("{}.json", row.id),
    })
}
