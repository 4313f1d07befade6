#[path = "../src/model.rs"]
mod model;
#[path = "../src/assets.rs"]
mod assets;
#[path = "../src/convert.rs"]
mod convert;
#[path = "../src/db.rs"]
mod db;
#[path = "../src/migrate.rs"]
mod migrate;

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;

fn temp_workspace(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn create_tpl_table(conn: &Connection) {
    conn.execute(
        "CREATE TABLE tpl(
            id INTEGER PRIMARY KEY,
            title TEXT,
            hash TEXT,
            size TEXT,
            cat TEXT,
            tags TEXT,
            src TEXT NOT NULL,
            created TEXT,
            modified TEXT,
            public TEXT NOT NULL DEFAULT '0'
        )",
        [],
    )
    .expect("create tpl table");
}

fn insert_tpl(
    conn: &Connection,
    id: i64,
    title: &str,
    hash: &str,
    tags: Option<&str>,
    src: &str,
    public: &str,
) {
    conn.execute(
        "INSERT INTO tpl(id, title, hash, size, cat, tags, src, created, modified, public)
         VALUES(?, ?, ?, NULL, NULL, ?, ?, '2020-01-01T00:00:00Z', NULL, ?)",
        rusqlite::params![id, title, hash, tags, src, public],
    )
    .expect("insert tpl row");
}

const TEXT_TEMPLATE_JSON: &str = r##"{"sz":["800","600"],"s":[{"bg":{"color":"#0000"},"e":[{"alias":"shape","prop":{"left":10,"top":10,"w":50,"h":20,"sym":"text","text":"Hi"}}]}]}"##;

#[test]
fn batch_converts_counts_errors_and_continues() {
    let workspace = temp_workspace("designconv-e2e");
    let conn = db::open_db(&workspace).expect("open db");
    create_tpl_table(&conn);

    insert_tpl(&conn, 1, "Test", "abc123", Some("biz"), TEXT_TEMPLATE_JSON, "1");
    insert_tpl(&conn, 2, "Broken", "bad1", None, "{invalid", "0");
    insert_tpl(
        &conn,
        3,
        "WithImage",
        "img1",
        None,
        r#"{"s":[{"e":[{"alias":"images","name":"Hero","prop":{"src":"pic.png"}}]}]}"#,
        "0",
    );

    // The image template's asset lives in the template's own folder.
    let img_dir = workspace.join("templates").join("all").join("img1");
    std::fs::create_dir_all(&img_dir).expect("mkdir");
    std::fs::write(img_dir.join("pic.png"), b"png-bytes").expect("write asset");

    let resolver = assets::AssetResolver::new(&workspace);
    let summary = migrate::run_migration(&conn, &resolver, None).expect("run migration");
    assert_eq!(summary.converted, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.total(), 3);

    let rows = db::list_designs(&conn).expect("list designs");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.id == "abc123"));
    assert!(rows.iter().any(|r| r.id == "img1"));

    let text_row = rows.iter().find(|r| r.id == "abc123").expect("text row");
    let layers: serde_json::Value =
        serde_json::from_str(&text_row.layers).expect("layers JSON");
    assert_eq!(layers[0]["type"], "text");
    assert_eq!(layers[0]["properties"]["text"], "Hi");
    assert_eq!(layers[0]["transform"]["x"], 80);
    assert_eq!(layers[0]["transform"]["y"], 60);
    assert_eq!(layers[0]["transform"]["width"], 400);
    assert_eq!(layers[0]["transform"]["height"], 120);
    let data: serde_json::Value = serde_json::from_str(&text_row.data).expect("data JSON");
    assert_eq!(data["background"]["type"], "solid");
    assert_eq!(data["background"]["color"], "transparent");

    let img_row = rows.iter().find(|r| r.id == "img1").expect("image row");
    let layers: serde_json::Value = serde_json::from_str(&img_row.layers).expect("layers JSON");
    assert_eq!(layers[0]["properties"]["src"], "/converted_assets/img1_pic.png");
    assert!(workspace
        .join("converted_assets")
        .join("img1_pic.png")
        .is_file());

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn rerunning_the_migration_is_idempotent() {
    let workspace = temp_workspace("designconv-rerun");
    let conn = db::open_db(&workspace).expect("open db");
    create_tpl_table(&conn);
    insert_tpl(&conn, 1, "Test", "abc123", None, TEXT_TEMPLATE_JSON, "1");

    let img_dir = workspace.join("templates").join("all").join("abc123");
    std::fs::create_dir_all(&img_dir).expect("mkdir");
    std::fs::write(img_dir.join("pic.png"), b"v1").expect("write asset");
    conn.execute(
        "UPDATE tpl SET src = ? WHERE id = 1",
        [r#"{"s":[{"e":[{"alias":"images","prop":{"src":"pic.png"}}]}]}"#],
    )
    .expect("update row");

    let resolver = assets::AssetResolver::new(&workspace);
    let first = migrate::run_migration(&conn, &resolver, None).expect("first run");
    assert_eq!(first.converted, 1);

    // Mutate the source asset; the second run must not re-copy it.
    std::fs::write(img_dir.join("pic.png"), b"v2").expect("rewrite asset");
    let second = migrate::run_migration(&conn, &resolver, None).expect("second run");
    assert_eq!(second.converted, 1);

    let rows = db::list_designs(&conn).expect("list designs");
    assert_eq!(rows.len(), 1);
    let stored = std::fs::read(workspace.join("converted_assets").join("abc123_pic.png"))
        .expect("read stored asset");
    assert_eq!(stored, b"v1");

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn limit_bounds_the_batch() {
    let workspace = temp_workspace("designconv-limit");
    let conn = db::open_db(&workspace).expect("open db");
    create_tpl_table(&conn);
    insert_tpl(&conn, 1, "A", "h1", None, r#"{"s":[]}"#, "0");
    insert_tpl(&conn, 2, "B", "h2", None, r#"{"s":[]}"#, "0");
    insert_tpl(&conn, 3, "C", "h3", None, r#"{"s":[]}"#, "0");

    let resolver = assets::AssetResolver::new(&workspace);
    let summary = migrate::run_migration(&conn, &resolver, Some(2)).expect("run");
    assert_eq!(summary.converted, 2);

    let rows = db::list_designs(&conn).expect("list");
    let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["h1", "h2"]);

    let _ = std::fs::remove_dir_all(workspace);
}
