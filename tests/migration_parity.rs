//! Migration Parity Tests
//!
//! Verifies that the cetane migrations produce the tables, columns and
//! indexes that the Diesel schema in `corporatica::schema` expects.

use std::collections::{BTreeMap, BTreeSet};

use diesel::Column;
use rusqlite::{Connection, Result as SqliteResult};

use corporatica::schema::{artifacts, users};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnInfo {
    name: String,
    col_type: String,
    not_null: bool,
    primary_key: bool,
}

/// Extract column info per table from a SQLite connection
fn extract_tables(conn: &Connection) -> SqliteResult<BTreeMap<String, BTreeMap<String, ColumnInfo>>> {
    let mut tables = BTreeMap::new();

    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let table_names: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<SqliteResult<Vec<_>>>()?;

    for table_name in table_names {
        let mut pragma = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table_name))?;
        let columns = pragma
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    col_type: row.get::<_, String>(2)?.to_uppercase(),
                    not_null: row.get(3)?,
                    primary_key: row.get::<_, i32>(5)? > 0,
                })
            })?
            .map(|col| col.map(|c| (c.name.clone(), c)))
            .collect::<SqliteResult<BTreeMap<_, _>>>()?;
        tables.insert(table_name, columns);
    }

    Ok(tables)
}

/// (table, columns, unique) for every explicit index
fn extract_indexes(conn: &Connection) -> SqliteResult<BTreeSet<(String, Vec<String>, bool)>> {
    let mut stmt = conn.prepare(
        "SELECT name, tbl_name, sql FROM sqlite_master WHERE type='index' AND sql IS NOT NULL ORDER BY name",
    )?;
    let rows: Vec<(String, String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<SqliteResult<Vec<_>>>()?;

    let mut indexes = BTreeSet::new();
    for (name, table, sql) in rows {
        let mut pragma = conn.prepare(&format!("PRAGMA index_info(\"{}\")", name))?;
        let columns: Vec<String> = pragma
            .query_map([], |row| {
                row.get::<_, Option<String>>(2)
                    .map(|opt| opt.unwrap_or_else(|| "<expr>".to_string()))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        indexes.insert((table, columns, sql.to_uppercase().contains("UNIQUE")));
    }
    Ok(indexes)
}

/// Run cetane migrations (generates SQL for SQLite backend)
fn run_cetane_migrations(conn: &Connection) -> SqliteResult<()> {
    use cetane::backend::Sqlite;

    let registry = corporatica::migrations::registry();
    let ordered_names = registry
        .resolve_order()
        .expect("Failed to resolve migration order");

    for name in ordered_names {
        let migration = registry
            .get(name)
            .expect("Migration not found after resolve");
        for stmt in migration.forward_sql(&Sqlite) {
            if stmt.trim().is_empty() {
                continue;
            }
            conn.execute_batch(&stmt)?;
        }
    }

    Ok(())
}

/// Normalize type names for comparison (SQLite is flexible with types)
fn normalize_type(t: &str) -> String {
    let t = t.to_uppercase();
    if t.contains("INT") {
        return "INTEGER".to_string();
    }
    if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
        return "TEXT".to_string();
    }
    t
}

/// Columns declared in `schema.rs`, with the SQLite affinity each maps to.
fn expected_tables() -> BTreeMap<&'static str, Vec<(&'static str, &'static str)>> {
    BTreeMap::from([
        (
            "users",
            vec![
                (users::id::NAME, "INTEGER"),
                (users::username::NAME, "TEXT"),
                (users::password_hash::NAME, "TEXT"),
                (users::created_at::NAME, "TEXT"),
                (users::updated_at::NAME, "TEXT"),
            ],
        ),
        (
            "artifacts",
            vec![
                (artifacts::id::NAME, "INTEGER"),
                (artifacts::kind::NAME, "TEXT"),
                (artifacts::name::NAME, "TEXT"),
                (artifacts::file_path::NAME, "TEXT"),
                (artifacts::content_hash::NAME, "TEXT"),
                (artifacts::content_type::NAME, "TEXT"),
                (artifacts::file_size::NAME, "INTEGER"),
                (artifacts::created_at::NAME, "TEXT"),
                (artifacts::updated_at::NAME, "TEXT"),
            ],
        ),
    ])
}

#[test]
fn test_schema_parity() {
    let conn = Connection::open_in_memory().expect("Failed to open DB");
    run_cetane_migrations(&conn).expect("Failed to run cetane migrations");
    let tables = extract_tables(&conn).expect("Failed to extract tables");

    let mut diffs = Vec::new();
    for (table, columns) in expected_tables() {
        let Some(actual) = tables.get(table) else {
            diffs.push(format!("Missing table: {}", table));
            continue;
        };
        for (name, sql_type) in &columns {
            match actual.get(*name) {
                Some(col) => {
                    if normalize_type(&col.col_type) != *sql_type {
                        diffs.push(format!(
                            "Type mismatch in {}.{}: schema={}, migrated={}",
                            table, name, sql_type, col.col_type
                        ));
                    }
                    if !col.not_null {
                        diffs.push(format!("{}.{} should be NOT NULL", table, name));
                    }
                    if col.primary_key != (*name == "id") {
                        diffs.push(format!("PRIMARY KEY mismatch in {}.{}", table, name));
                    }
                }
                None => diffs.push(format!("Missing column: {}.{}", table, name)),
            }
        }
        for name in actual.keys() {
            if !columns.iter().any(|(c, _)| c == name) {
                diffs.push(format!("Extra column not in schema.rs: {}.{}", table, name));
            }
        }
    }

    for diff in &diffs {
        eprintln!("  - {}", diff);
    }
    assert!(diffs.is_empty(), "Schema parity failed with {} differences", diffs.len());
}

#[test]
fn test_expected_indexes() {
    let conn = Connection::open_in_memory().expect("Failed to open DB");
    run_cetane_migrations(&conn).expect("Failed to run cetane migrations");
    let indexes = extract_indexes(&conn).expect("Failed to extract indexes");

    assert!(indexes.contains(&("artifacts".to_string(), vec!["kind".to_string()], false)));
    assert!(indexes.contains(&(
        "artifacts".to_string(),
        vec!["content_hash".to_string()],
        false
    )));
}

#[test]
fn test_username_is_unique() {
    let conn = Connection::open_in_memory().expect("Failed to open DB");
    run_cetane_migrations(&conn).expect("Failed to run cetane migrations");

    let insert = "INSERT INTO users (username, password_hash, created_at, updated_at) \
                  VALUES ('alice', 'x', '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')";
    conn.execute_batch(insert).unwrap();
    assert!(conn.execute_batch(insert).is_err());
}

#[test]
fn test_individual_migrations_generate_valid_sql() {
    use cetane::backend::Sqlite;

    let registry = corporatica::migrations::registry();
    let ordered_names = registry
        .resolve_order()
        .expect("Failed to resolve migration order");

    // For each migration, run all preceding migrations in order
    for i in 0..ordered_names.len() {
        let conn = Connection::open_in_memory().expect("Failed to open DB");
        for prior_name in &ordered_names[..=i] {
            let migration = registry.get(prior_name).expect("Migration not found");
            for stmt in &migration.forward_sql(&Sqlite) {
                if stmt.trim().is_empty() {
                    continue;
                }
                conn.execute_batch(stmt).unwrap_or_else(|e| {
                    panic!("Migration {} failed: {}\nSQL: {}", migration.name, e, stmt)
                });
            }
        }
    }
}
