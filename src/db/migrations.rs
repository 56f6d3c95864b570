use crate::db::Database;
use crate::error::Result;

const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    CREATE TABLE IF NOT EXISTS telemetry (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        crop_type TEXT NOT NULL,
        moisture REAL,
        nitrogen REAL,
        phosphorus REAL,
        potassium REAL,
        soil_type TEXT NOT NULL DEFAULT '',
        temperature REAL,
        humidity REAL,
        fertilizer_name TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(crop_type, timestamp)
    );

    CREATE TABLE IF NOT EXISTS crop_profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        moisture_min REAL NOT NULL,
        moisture_max REAL NOT NULL,
        nitrogen_min REAL,
        nitrogen_max REAL,
        phosphorus_min REAL,
        phosphorus_max REAL,
        potassium_min REAL,
        potassium_max REAL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS alerts (
        id TEXT PRIMARY KEY,
        alert_type TEXT NOT NULL,
        severity TEXT NOT NULL,
        confidence INTEGER NOT NULL,
        message TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'Active',
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS recommendation_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        crop_type TEXT NOT NULL,
        action TEXT NOT NULL,
        priority TEXT NOT NULL,
        reason TEXT NOT NULL,
        amount REAL,
        duration_minutes INTEGER,
        recommended_time TEXT,
        hours_until_next INTEGER,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(crop_type, timestamp)
    );

    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    // Migration 2: Add indexes
    r#"
    CREATE INDEX IF NOT EXISTS idx_telemetry_timestamp
        ON telemetry(timestamp);
    CREATE INDEX IF NOT EXISTS idx_telemetry_crop_timestamp
        ON telemetry(crop_type, timestamp);
    CREATE INDEX IF NOT EXISTS idx_alerts_status_timestamp
        ON alerts(status, timestamp);
    CREATE INDEX IF NOT EXISTS idx_recommendation_log_timestamp
        ON recommendation_log(timestamp);
    "#,
];

pub fn run(db: &Database) -> Result<()> {
    db.with_conn_mut(|conn| {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                tracing::info!("Applying migration {}", version);
                let tx = conn.transaction()?;
                tx.execute_batch(migration)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version) VALUES (?1)",
                    [version],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    })
}
