//! SQLite Integration Tests
//!
//! End-to-end facade behavior against the embedded backend

use db_facade::{
    ColumnDef, DatabaseClient, DatabaseConfig, DatabaseError, DatabaseType, TableSchema, Value,
};
use chrono::{TimeZone, Utc};
use tempfile::TempDir;

async fn memory_client() -> DatabaseClient {
    DatabaseClient::connect(&DatabaseConfig::sqlite_memory())
        .await
        .unwrap()
}

async fn file_client(dir: &TempDir) -> DatabaseClient {
    let path = dir.path().join("facade.db");
    DatabaseClient::connect(&DatabaseConfig::sqlite(path.to_str().unwrap()))
        .await
        .unwrap()
}

async fn create_items(client: &mut DatabaseClient) {
    client
        .create_table(
            "items",
            &[
                ("id", "INTEGER PRIMARY KEY"),
                ("name", "TEXT NOT NULL"),
                ("qty", "INT"),
                ("price", "REAL"),
            ],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_example_scenario() {
    let mut client = memory_client().await;
    client
        .create_table("t", &[("id", "INT PRIMARY KEY"), ("v", "INT")])
        .await
        .unwrap();
    client
        .insert("t", &["id", "v"], &[Value::Int(1), Value::Int(10)])
        .await
        .unwrap();

    let rows = client
        .fetch("t", &["v"], Some("id = ?"), &[Value::Int(1)])
        .await
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Int(10)]]);
    client.close().await.unwrap();
}

#[tokio::test]
async fn test_insert_then_fetch_returns_inserted_row() {
    let mut client = memory_client().await;
    create_items(&mut client).await;

    let cases = vec![
        vec![Value::Int(1), Value::from("bolt"), Value::Int(40), Value::Float(0.15)],
        vec![Value::Int(2), Value::from(""), Value::Int(0), Value::Float(-3.5)],
        vec![Value::Int(3), Value::from("ナット"), Value::Null, Value::Null],
        vec![Value::Int(4), Value::from("it's \"quoted\""), Value::Int(i64::MAX), Value::Float(1e10)],
    ];

    for values in &cases {
        client
            .insert("items", &["id", "name", "qty", "price"], values)
            .await
            .unwrap();
        let rows = client
            .fetch("items", &["id", "name", "qty", "price"], Some("id = ?"), &values[..1])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0], values);
    }
}

#[tokio::test]
async fn test_insert_then_fetch_boolean_and_datetime() {
    let mut client = memory_client().await;
    client
        .create_table(
            "flags",
            &[("id", "INT"), ("flag", "BOOLEAN"), ("seen_at", "DATETIME")],
        )
        .await
        .unwrap();

    let seen_at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 39).unwrap()
        + chrono::Duration::milliseconds(250);
    let cases = vec![
        vec![Value::Int(1), Value::Bool(true), Value::DateTime(seen_at)],
        vec![Value::Int(2), Value::Bool(false), Value::Null],
    ];

    for values in &cases {
        client
            .insert("flags", &["id", "flag", "seen_at"], values)
            .await
            .unwrap();
        let rows = client
            .fetch("flags", &["id", "flag", "seen_at"], Some("id = ?"), &values[..1])
            .await
            .unwrap();
        assert_eq!(rows, vec![values.clone()]);
    }
}

#[tokio::test]
async fn test_insert_count_mismatch_is_validation_error() {
    let mut client = memory_client().await;

    // No table exists: a backend round trip would report a query error instead
    let err = client
        .insert("missing", &["a", "b"], &[Value::Int(1)])
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = client
        .insert("missing", &["a"], &[Value::Int(1), Value::Int(2)])
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_constraint_violation_is_query_error() {
    let mut client = memory_client().await;
    create_items(&mut client).await;
    client
        .insert("items", &["id", "name"], &[Value::Int(1), Value::from("a")])
        .await
        .unwrap();

    let err = client
        .insert("items", &["id", "name"], &[Value::Int(1), Value::from("b")])
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::QueryFailed(_)));

    let err = client
        .insert("items", &["id", "name"], &[Value::Int(2), Value::Null])
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::QueryFailed(_)));
}

#[tokio::test]
async fn test_schema_errors() {
    let mut client = memory_client().await;
    create_items(&mut client).await;

    let err = client
        .alter_table("items", "ADD COLUMN")
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::SchemaError(_)));

    let err = client
        .create_index("idx_items_missing", "items", &["no_such_column"])
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::SchemaError(_)));

    let err = client
        .create_table("t", &[("id", "INT); DROP TABLE items; --")])
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert!(client.table_exists("items").await.unwrap());

    // Both statements are idempotent
    client.create_table("items", &[("id", "INT")]).await.unwrap();
    client.drop_table("never_created").await.unwrap();
}

#[tokio::test]
async fn test_structured_schema_and_introspection() {
    let mut client = memory_client().await;
    let schema = TableSchema::new()
        .column(ColumnDef::new("id", "INTEGER").constraints("PRIMARY KEY"))
        .column(ColumnDef::new("email", "TEXT").constraints("NOT NULL"))
        .column(ColumnDef::new("score", "REAL"));
    client
        .create_table_with_schema("accounts", &schema)
        .await
        .unwrap();

    assert_eq!(
        client.list_columns("accounts").await.unwrap(),
        vec!["id", "email", "score"]
    );
    let columns = client.table_columns("accounts").await.unwrap();
    assert!(!columns[1].nullable);
    assert!(columns[2].nullable);

    client
        .alter_table_add_column("accounts", "nickname", "TEXT")
        .await
        .unwrap();
    assert!(client.column_exists("accounts", "nickname").await.unwrap());

    client
        .create_index("idx_accounts_email", "accounts", &["email"])
        .await
        .unwrap();
    client
        .drop_index("idx_accounts_email", "accounts")
        .await
        .unwrap();

    assert_eq!(client.list_tables().await.unwrap(), vec!["accounts"]);
    client.drop_table("accounts").await.unwrap();
    assert!(!client.table_exists("accounts").await.unwrap());
}

#[tokio::test]
async fn test_update_delete_and_counters() {
    let mut client = memory_client().await;
    create_items(&mut client).await;
    let rows: Vec<_> = (1..=5)
        .map(|i| vec![Value::Int(i), Value::from(format!("item-{}", i)), Value::Int(i * 10)])
        .collect();
    assert_eq!(
        client
            .batch_insert("items", &["id", "name", "qty"], &rows)
            .await
            .unwrap(),
        5
    );

    let updated = client
        .update("items", "name = ?", "id > ?", &[Value::from("bulk"), Value::Int(3)])
        .await
        .unwrap();
    assert_eq!(updated, 2);

    client
        .add_value("items", "qty", 5, "id = ?", &[Value::Int(1)])
        .await
        .unwrap();
    client
        .subtract_value("items", "qty", 20, "id = ?", &[Value::Int(2)])
        .await
        .unwrap();
    let qty = client
        .fetch("items", &["qty"], Some("id IN (?, ?) ORDER BY id"), &[Value::Int(1), Value::Int(2)])
        .await
        .unwrap();
    assert_eq!(qty, vec![vec![Value::Int(15)], vec![Value::Int(0)]]);

    assert!(client
        .is_field_empty("items", "price", "id = ?", &[Value::Int(1)])
        .await
        .unwrap());

    let err = client.delete("items", "  ", &[]).await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(
        client.delete("items", "name = ?", &[Value::from("bulk")]).await.unwrap(),
        2
    );
    assert_eq!(client.count_rows("items", None, &[]).await.unwrap(), 3);
    assert_eq!(client.clear_table("items").await.unwrap(), 3);
    assert_eq!(client.count_rows("items", None, &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_placeholder_count_checked() {
    let mut client = memory_client().await;
    create_items(&mut client).await;

    let err = client
        .fetch("items", &["id"], Some("id = ? AND qty = ?"), &[Value::Int(1)])
        .await
        .unwrap_err();
    assert!(err.is_validation());

    // A literal question mark is not a placeholder
    let rows = client
        .fetch("items", &["id"], Some("name = '?' AND id = ?"), &[Value::Int(1)])
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_rollback_restores_prior_state() {
    let mut client = memory_client().await;
    create_items(&mut client).await;
    client
        .insert("items", &["id", "name", "qty"], &[Value::Int(1), Value::from("keep"), Value::Int(1)])
        .await
        .unwrap();
    let before = client
        .fetch("items", &["id", "name", "qty"], None, &[])
        .await
        .unwrap();

    client.begin_transaction().await.unwrap();
    assert!(client.in_transaction());
    client
        .insert("items", &["id", "name"], &[Value::Int(2), Value::from("temp")])
        .await
        .unwrap();
    client
        .update("items", "qty = ?", "id = ?", &[Value::Int(99), Value::Int(1)])
        .await
        .unwrap();
    client.delete("items", "id = ?", &[Value::Int(1)]).await.unwrap();
    client.rollback_transaction().await.unwrap();
    assert!(!client.in_transaction());

    let after = client
        .fetch("items", &["id", "name", "qty"], None, &[])
        .await
        .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_commit_persists_across_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let mut client = file_client(&dir).await;
    create_items(&mut client).await;

    client.begin_transaction().await.unwrap();
    client
        .insert("items", &["id", "name"], &[Value::Int(7), Value::from("durable")])
        .await
        .unwrap();
    client.commit_transaction().await.unwrap();
    client.close().await.unwrap();

    let mut reopened = file_client(&dir).await;
    assert_eq!(reopened.database_type(), DatabaseType::SQLite);
    let rows = reopened.fetch("items", &["name"], None, &[]).await.unwrap();
    assert_eq!(rows, vec![vec![Value::from("durable")]]);
}

#[tokio::test]
async fn test_batch_insert_inside_transaction_is_atomic() {
    let mut client = memory_client().await;
    create_items(&mut client).await;

    let mut rows: Vec<_> = (1..=700)
        .map(|i| vec![Value::Int(i), Value::from("x")])
        .collect();
    rows[650][1] = Value::Null;

    client.begin_transaction().await.unwrap();
    let err = client
        .batch_insert("items", &["id", "name"], &rows)
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::QueryFailed(_)));
    client.rollback_transaction().await.unwrap();

    assert_eq!(client.count_rows("items", None, &[]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("items.csv");
    let mut client = memory_client().await;
    create_items(&mut client).await;

    let rows: Vec<_> = (1..=25)
        .map(|i| {
            vec![
                Value::Int(i),
                if i % 5 == 0 {
                    Value::from("")
                } else {
                    Value::from(format!("name {}", i))
                },
                Value::Int(i * 3),
                Value::Float(i as f64 / 4.0),
            ]
        })
        .collect();
    client
        .batch_insert("items", &["id", "name", "qty", "price"], &rows)
        .await
        .unwrap();

    assert_eq!(client.export_to_csv("items", &csv_path).await.unwrap(), 25);
    client.clear_table("items").await.unwrap();
    assert_eq!(client.import_from_csv("items", &csv_path).await.unwrap(), 25);

    let restored = client
        .fetch("items", &["id", "name", "qty", "price"], Some("1 = 1 ORDER BY id"), &[])
        .await
        .unwrap();
    assert_eq!(restored, rows);
}

#[tokio::test]
async fn test_users_and_permissions() {
    let mut client = memory_client().await;
    client
        .create_table(
            "users",
            &[("username", "TEXT PRIMARY KEY"), ("password", "TEXT NOT NULL"), ("role", "TEXT")],
        )
        .await
        .unwrap();
    client
        .create_table("permissions", &[("username", "TEXT"), ("permission", "TEXT")])
        .await
        .unwrap();

    client.create_user("users", "alice", "s3cret", "admin").await.unwrap();
    assert!(client.verify_password("users", "alice", "s3cret").await.unwrap());
    for wrong in ["", "S3CRET", "s3cret ", "s3cre"] {
        assert!(!client.verify_password("users", "alice", wrong).await.unwrap());
    }

    client.set_password("users", "alice", "rotated").await.unwrap();
    assert!(client.verify_password("users", "alice", "rotated").await.unwrap());
    assert!(!client.verify_password("users", "alice", "s3cret").await.unwrap());

    client.grant_permission("permissions", "alice", "read").await.unwrap();
    client.grant_permission("permissions", "alice", "write").await.unwrap();
    assert!(client
        .get_permissions("permissions", "alice")
        .await
        .unwrap()
        .contains(&"write".to_string()));

    client.revoke_permission("permissions", "alice", "write").await.unwrap();
    let permissions = client.get_permissions("permissions", "alice").await.unwrap();
    assert!(!permissions.contains(&"write".to_string()));
    assert_eq!(permissions, vec!["read"]);
}

#[tokio::test]
async fn test_backup_restore_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let backup = dir.path().join("facade.bak");
    let mut client = file_client(&dir).await;
    create_items(&mut client).await;
    client
        .insert("items", &["id", "name"], &[Value::Int(1), Value::from("before")])
        .await
        .unwrap();

    client.backup_database(&backup).await.unwrap();
    client.clear_table("items").await.unwrap();
    client
        .insert("items", &["id", "name"], &[Value::Int(2), Value::from("after")])
        .await
        .unwrap();

    client.restore_database(&backup).await.unwrap();
    let rows = client.fetch("items", &["name"], None, &[]).await.unwrap();
    assert_eq!(rows, vec![vec![Value::from("before")]]);
}

#[tokio::test]
async fn test_restore_into_memory_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let backup = dir.path().join("mem.bak");
    let mut client = memory_client().await;
    create_items(&mut client).await;
    client.backup_database(&backup).await.unwrap();

    let err = client.restore_database(&backup).await.unwrap_err();
    assert!(matches!(err, DatabaseError::BackupFailed(_)));
}

#[tokio::test]
async fn test_audit_log() {
    let mut client = memory_client().await;
    client
        .create_table(
            "audit_log",
            &[
                ("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
                ("action", "TEXT NOT NULL"),
                ("details", "TEXT"),
                ("timestamp", "DATETIME DEFAULT CURRENT_TIMESTAMP"),
            ],
        )
        .await
        .unwrap();

    client.log_action("audit_log", "login", "alice").await.unwrap();
    client.log_action("audit_log", "export", "items.csv").await.unwrap();

    let log = client.get_audit_log("audit_log").await.unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|entry| entry.timestamp.is_some()));
    let actions: Vec<_> = log.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&"login"));
    assert!(actions.contains(&"export"));
}

#[tokio::test]
async fn test_audit_log_orders_default_and_explicit_timestamps() {
    let mut client = memory_client().await;
    client
        .create_table(
            "audit_log",
            &[
                ("action", "TEXT NOT NULL"),
                ("details", "TEXT"),
                ("timestamp", "DATETIME DEFAULT CURRENT_TIMESTAMP"),
            ],
        )
        .await
        .unwrap();

    let now = Utc::now();
    client
        .log_action_at("audit_log", "later", "", now + chrono::Duration::hours(1))
        .await
        .unwrap();
    client.log_action("audit_log", "now", "").await.unwrap();
    client
        .log_action_at("audit_log", "earlier", "", now - chrono::Duration::seconds(30))
        .await
        .unwrap();
    client
        .log_action_at("audit_log", "old", "", Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();

    let log = client.get_audit_log("audit_log").await.unwrap();
    let actions: Vec<_> = log.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["old", "earlier", "now", "later"]);
}

#[tokio::test]
async fn test_connect_rejects_invalid_config() {
    let err = DatabaseClient::connect(&DatabaseConfig::sqlite("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ConfigurationError(_)));

    let err = DatabaseClient::connect(&DatabaseConfig::sqlite("/nonexistent-dir/sub/app.db"))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::ConnectionFailed(_)));
}
