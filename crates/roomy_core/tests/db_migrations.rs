use roomy_core::db::migrations::latest_version;
use roomy_core::db::{open_db, open_db_in_memory, DbError};
use roomy_core::{SqliteCoStore, StoreError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().expect("open in-memory db");

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "co_groups",
        "co_group_members",
        "co_values",
        "co_list_items",
        "co_record_entries",
        "last_read_entries",
        "inbox_items",
        "profiles",
        "roots",
        "accounts",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn reopening_file_database_keeps_schema_and_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("roomy.sqlite3");

    let first = open_db(&path).expect("first open");
    assert_eq!(schema_version(&first), latest_version());
    first
        .execute(
            "INSERT INTO co_groups (id, created_at) VALUES ('co_zkeep', 0);",
            [],
        )
        .expect("seed group");
    drop(first);

    let second = open_db(&path).expect("second open");
    assert_eq!(schema_version(&second), latest_version());
    let groups: i64 = second
        .query_row("SELECT COUNT(*) FROM co_groups;", [], |row| row.get(0))
        .expect("count groups");
    assert_eq!(groups, 1);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).expect("raw open");
    conn.execute_batch("PRAGMA user_version = 999;")
        .expect("bump version");
    drop(conn);

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema should be rejected"),
    }
}

#[test]
fn store_rejects_connection_without_schema() {
    let conn = Connection::open_in_memory().expect("raw open");

    match SqliteCoStore::try_new(&conn) {
        Err(StoreError::UninitializedConnection { actual_version, .. }) => {
            assert_eq!(actual_version, 0);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("raw connection should be rejected"),
    }
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .expect("read user_version")
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .expect("query sqlite_master");
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
