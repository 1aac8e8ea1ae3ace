use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

/// Schema bootstrap, executed statement by statement on every start
const SCHEMA: &[(&str, &str)] = &[
    (
        "a001_customer",
        r#"
        CREATE TABLE IF NOT EXISTS a001_customer (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            stage TEXT NOT NULL DEFAULT 'new',
            total_revenue REAL NOT NULL DEFAULT 0,
            touchpoints INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 0
        );
        "#,
    ),
    (
        "a002_note",
        r#"
        CREATE TABLE IF NOT EXISTS a002_note (
            id TEXT PRIMARY KEY NOT NULL,
            customer_id TEXT NOT NULL,
            note_type TEXT NOT NULL DEFAULT 'call',
            content TEXT NOT NULL,
            sales_agent TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL,
            is_pinned INTEGER NOT NULL DEFAULT 0,
            is_highlighted INTEGER NOT NULL DEFAULT 0,
            idempotency_key TEXT,
            FOREIGN KEY (customer_id) REFERENCES a001_customer(id)
        );
        "#,
    ),
    (
        "a002_note index",
        "CREATE INDEX IF NOT EXISTS idx_a002_note_customer ON a002_note(customer_id);",
    ),
    (
        "a002_note idempotency key",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_a002_note_idempotency ON a002_note(customer_id, idempotency_key)
         WHERE idempotency_key IS NOT NULL;",
    ),
    (
        "a003_order",
        r#"
        CREATE TABLE IF NOT EXISTS a003_order (
            id TEXT PRIMARY KEY NOT NULL,
            customer_id TEXT NOT NULL,
            amount REAL NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL,
            idempotency_key TEXT,
            FOREIGN KEY (customer_id) REFERENCES a001_customer(id)
        );
        "#,
    ),
    (
        "a003_order index",
        "CREATE INDEX IF NOT EXISTS idx_a003_order_customer ON a003_order(customer_id);",
    ),
    (
        "a003_order idempotency key",
        "CREATE UNIQUE INDEX IF NOT EXISTS uq_a003_order_idempotency ON a003_order(customer_id, idempotency_key)
         WHERE idempotency_key IS NOT NULL;",
    ),
    (
        "sys_users",
        r#"
        CREATE TABLE IF NOT EXISTS sys_users (
            id TEXT PRIMARY KEY NOT NULL,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_admin INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_login_at TEXT,
            created_by TEXT
        );
        "#,
    ),
    (
        "sys_refresh_tokens",
        r#"
        CREATE TABLE IF NOT EXISTS sys_refresh_tokens (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            token_hash TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            revoked_at TEXT,
            FOREIGN KEY (user_id) REFERENCES sys_users(id)
        );
        "#,
    ),
    (
        "sys_settings",
        r#"
        CREATE TABLE IF NOT EXISTS sys_settings (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            description TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ),
];

pub async fn initialize_database(db_path: Option<&str>) -> anyhow::Result<()> {
    let db_file = db_path.unwrap_or("target/db/crm.db");
    if let Some(parent) = std::path::Path::new(db_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_file).is_absolute() {
        std::path::PathBuf::from(db_file)
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;

    bootstrap_schema(&conn).await?;

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Database connection has already been initialized"))?;
    Ok(())
}

/// Create missing tables and indexes
pub async fn bootstrap_schema<C: ConnectionTrait>(conn: &C) -> anyhow::Result<()> {
    for (name, sql) in SCHEMA {
        tracing::debug!("Ensuring schema object {}", name);
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            sql.to_string(),
        ))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", name, e))?;
    }
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}
