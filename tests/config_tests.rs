//! Configuration loading tests

use db_facade::{ConfigLoader, DatabaseClient, DatabaseType, PasswordScheme};

#[test]
fn test_load_from_toml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("facade.toml");
    std::fs::write(
        &path,
        r#"
database_type = "mariadb"
password_scheme = "argon2"

[connection]
host = "maria.internal"
port = 3307
database = "shop"
username = "shop_app"
password = "pw"
connect_timeout_seconds = 5

[backup]
dump_command = "/opt/mariadb/bin/mariadb-dump"
"#,
    )
    .unwrap();

    let config = ConfigLoader::new()
        .load_from_file(path.to_str())
        .build()
        .unwrap();

    assert_eq!(config.database_type, DatabaseType::MariaDB);
    assert_eq!(config.password_scheme, PasswordScheme::Argon2);
    assert_eq!(config.connection.host, "maria.internal");
    assert_eq!(config.connection.port, 3307);
    assert_eq!(config.connection.connect_timeout_seconds, 5);
    assert_eq!(
        config.backup.dump_command.as_deref(),
        Some("/opt/mariadb/bin/mariadb-dump")
    );
    assert!(config.backup.restore_command.is_none());
}

#[test]
fn test_environment_overrides_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("facade.toml");
    std::fs::write(
        &path,
        r#"
database_type = "sqlite"

[connection]
path = "from-file.db"
"#,
    )
    .unwrap();

    std::env::set_var("DBFACADE_CONNECTION__PATH", "from-env.db");
    let config = ConfigLoader::new()
        .load_from_file(path.to_str())
        .load_from_env()
        .build();
    std::env::remove_var("DBFACADE_CONNECTION__PATH");

    let config = config.unwrap();
    assert_eq!(config.database_type, DatabaseType::SQLite);
    assert_eq!(config.connection.path.as_deref(), Some("from-env.db"));
}

#[test]
fn test_unknown_backend_rejected() {
    let result = ConfigLoader::new()
        .load_from_toml_str("database_type = \"oracle\"")
        .build();
    assert!(result.is_err());
}

#[tokio::test]
async fn test_loaded_config_connects() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("loaded.db");
    let config = ConfigLoader::new()
        .load_from_toml_str(&format!(
            "database_type = \"sqlite\"\n[connection]\npath = {:?}\n",
            db_path.to_str().unwrap()
        ))
        .build()
        .unwrap();

    let mut client = DatabaseClient::connect(&config).await.unwrap();
    client.ping().await.unwrap();
    client.close().await.unwrap();
    assert!(db_path.exists());
}
