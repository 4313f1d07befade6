use std::path::Path;

use anyhow::Context;
use rusqlite::Connection;

use crate::model::{Design, LegacyTemplate};

pub const DB_FILE: &str = "design_templates.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    ensure_schema(&conn)?;
    Ok(conn)
}

/// Idempotent create-if-absent for the destination table. The legacy `tpl`
/// table is read-only input and is never created here.
pub fn ensure_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS designs_converted(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            data TEXT NOT NULL,
            layers TEXT NOT NULL,
            thumbnail TEXT,
            width INTEGER NOT NULL,
            height INTEGER NOT NULL,
            user_id TEXT NOT NULL,
            project_id TEXT,
            is_public INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            original_id INTEGER,
            category TEXT,
            tags TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_designs_user ON designs_converted(user_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_designs_created ON designs_converted(created_at)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_designs_public ON designs_converted(is_public)",
        [],
    )?;
    Ok(())
}

/// Fetches legacy rows in ascending id order, optionally bounded.
pub fn fetch_templates(
    conn: &Connection,
    limit: Option<u32>,
) -> anyhow::Result<Vec<LegacyTemplate>> {
    let sql = match limit {
        Some(_) => {
            "SELECT id, title, hash, size, cat, tags, src, created, modified, public
             FROM tpl ORDER BY id LIMIT ?"
        }
        None => {
            "SELECT id, title, hash, size, cat, tags, src, created, modified, public
             FROM tpl ORDER BY id"
        }
    };
    let mut stmt = conn.prepare(sql).context("failed to prepare tpl query")?;

    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<LegacyTemplate> {
        Ok(LegacyTemplate {
            id: row.get(0)?,
            title: row.get(1)?,
            hash: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            size: row.get(3)?,
            category: row.get(4)?,
            tags: row.get(5)?,
            source_json: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            created_at: row.get(7)?,
            modified_at: row.get(8)?,
            is_public: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        })
    };

    let rows = match limit {
        Some(n) => stmt
            .query_map([n as i64], map_row)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
    };
    Ok(rows)
}

/// Insert or, on id conflict, overwrite everything except identity,
/// ownership and the creation timestamp. Re-running the migration is a
/// no-op apart from updated content.
pub fn upsert_design(
    conn: &Connection,
    design: &Design,
    record: &LegacyTemplate,
) -> anyhow::Result<()> {
    let data = serde_json::to_string(&design.data).context("failed to serialize design data")?;
    let layers =
        serde_json::to_string(&design.layers).context("failed to serialize design layers")?;

    conn.execute(
        "INSERT INTO designs_converted(
            id, name, title, description, data, layers, thumbnail,
            width, height, user_id, project_id, is_public,
            created_at, updated_at, original_id, category, tags
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            title = excluded.title,
            description = excluded.description,
            data = excluded.data,
            layers = excluded.layers,
            thumbnail = excluded.thumbnail,
            width = excluded.width,
            height = excluded.height,
            updated_at = excluded.updated_at,
            category = excluded.category,
            tags = excluded.tags",
        rusqlite::params![
            &design.id,
            &design.name,
            &design.title,
            &design.description,
            &data,
            &layers,
            &design.thumbnail,
            design.width,
            design.height,
            &design.user_id,
            &design.project_id,
            if design.is_public { 1i64 } else { 0i64 },
            &design.created_at,
            &design.updated_at,
            record.id,
            &record.category,
            &record.tags,
        ],
    )
    .with_context(|| format!("failed to upsert design {}", design.id))?;
    Ok(())
}

/// One stored row of the destination table, as the exporter reads it back.
/// `data` and `layers` stay as JSON text until export time.
#[derive(Debug)]
pub struct StoredDesign {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub data: String,
    pub layers: String,
    pub thumbnail: Option<String>,
    pub width: i64,
    pub height: i64,
    pub user_id: String,
    pub project_id: Option<String>,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
    pub original_id: Option<i64>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

pub fn list_designs(conn: &Connection) -> anyhow::Result<Vec<StoredDesign>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, title, description, data, layers, thumbnail,
                width, height, user_id, project_id, is_public,
                created_at, updated_at, original_id, category, tags
         FROM designs_converted ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(StoredDesign {
                id: row.get(0)?,
                name: row.get(1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                data: row.get(4)?,
                layers: row.get(5)?,
                thumbnail: row.get(6)?,
                width: row.get(7)?,
                height: row.get(8)?,
                user_id: row.get(9)?,
                project_id: row.get(10)?,
                is_public: row.get::<_, i64>(11)? != 0,
                created_at: row.get(12)?,
                updated_at: row.get(13)?,
                original_id: row.get(14)?,
                category: row.get(15)?,
                tags: row.get(16)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BackgroundType, DesignBackground, DesignData, GridSettings, ViewportSettings,
    };

    fn sample_design(id: &str) -> Design {
        Design {
            id: id.to_string(),
            name: "Sample".to_string(),
            title: "Sample".to_string(),
            description: None,
            data: DesignData {
                background_color: "#ffffff".to_string(),
                background: DesignBackground {
                    kind: BackgroundType::Solid,
                    color: Some("#ffffff".to_string()),
                    gradient: None,
                },
                grid_settings: GridSettings::default(),
                viewport_settings: ViewportSettings::default(),
            },
            layers: Vec::new(),
            thumbnail: None,
            width: 1920,
            height: 1080,
            user_id: "legacy_import".to_string(),
            project_id: None,
            is_public: true,
            created_at: "2020-01-01T00:00:00Z".to_string(),
            updated_at: "2020-01-01T00:00:00Z".to_string(),
        }
    }

    fn sample_record(id: i64) -> LegacyTemplate {
        LegacyTemplate {
            id,
            title: None,
            hash: String::new(),
            size: None,
            category: Some("biz".to_string()),
            tags: None,
            source_json: String::new(),
            created_at: None,
            modified_at: None,
            is_public: "1".to_string(),
        }
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        ensure_schema(&conn).expect("first");
        ensure_schema(&conn).expect("second");
    }

    #[test]
    fn upsert_overwrites_content_but_keeps_creation() {
        let conn = Connection::open_in_memory().expect("open");
        ensure_schema(&conn).expect("schema");

        let design = sample_design("abc");
        upsert_design(&conn, &design, &sample_record(1)).expect("insert");

        let mut updated = sample_design("abc");
        updated.name = "Renamed".to_string();
        updated.created_at = "2024-06-01T00:00:00Z".to_string();
        updated.updated_at = "2024-06-01T00:00:00Z".to_string();
        upsert_design(&conn, &updated, &sample_record(1)).expect("upsert");

        let rows = list_designs(&conn).expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Renamed");
        assert_eq!(rows[0].created_at, "2020-01-01T00:00:00Z");
        assert_eq!(rows[0].updated_at, "2024-06-01T00:00:00Z");
        assert_eq!(rows[0].original_id, Some(1));
        assert_eq!(rows[0].category.as_deref(), Some("biz"));
    }

    #[test]
    fn list_orders_by_id() {
        let conn = Connection::open_in_memory().expect("open");
        ensure_schema(&conn).expect("schema");
        upsert_design(&conn, &sample_design("zz"), &sample_record(1)).expect("insert");
        upsert_design(&conn, &sample_design("aa"), &sample_record(2)).expect("insert");
        let rows = list_designs(&conn).expect("list");
        assert_eq!(rows[0].id, "aa");
        assert_eq!(rows[1].id, "zz");
    }
}
